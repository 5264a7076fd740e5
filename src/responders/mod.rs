//! Generative responders behind the message router

pub mod images;
pub mod text;

pub use images::{ImageOutcome, ImagePipeline};
pub use text::TextResponder;
