//! Generative backends and their credentials
//!
//! Defines the backend traits the router depends on, the credential
//! rotator shared by both backend chains, and the HTTP client that talks to
//! the hosted models.

pub mod auth;
pub mod backend;
pub mod client;
pub mod credentials;
pub mod reply;

pub use auth::{ServiceAccountTokens, StaticToken, TokenSource};
pub use backend::{BackendError, ChatTurn, ImageBackend, Role, TextBackend};
pub use client::VertexClient;
pub use credentials::{CredentialProfile, CredentialRotator};
pub use reply::BackendReply;
