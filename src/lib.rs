//! chatrelay - chat relay backend for FAQ answers and generative models
//!
//! Each incoming message is matched against a fuzzy FAQ knowledge base. Strong
//! matches are answered directly, weak ones are referred to support, and the
//! rest go to a hosted image or text model under a credential-rotation and
//! retry policy.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod knowledge;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod responders;
pub mod router;
pub mod session;
pub mod shared;
pub mod storage;
pub mod telemetry;
pub mod transcode;
