//! Backend traits and error types
//!
//! The generative models are opaque external services. The core only knows
//! these traits, which lets tests inject scripted backends and lets the
//! production build talk to the hosted models through `VertexClient`.

use crate::models::credentials::CredentialProfile;
use crate::models::reply::BackendReply;
use crate::transcode::TranscodeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of the conversation sent to the text backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Errors raised while calling a generative backend
///
/// Every variant is retried by the caller's retry policy; there is no
/// terminal/transient split.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Key file of the selected credential profile does not exist
    #[error("Key file not found: {path}")]
    MissingKeyFile { path: String },

    /// Key file exists but no access token could be obtained from it
    #[error("Failed to authenticate project {project}: {reason}")]
    Auth { project: String, reason: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("Request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// Backend answered with a non-success status
    #[error("Backend {endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Reply could not be interpreted
    #[error("Invalid reply from {endpoint}: {reason}")]
    InvalidReply { endpoint: String, reason: String },

    /// Image backend answered successfully but returned no images
    #[error("No images were created by {endpoint}")]
    NoImages { endpoint: String },

    /// Generated image could not be re-encoded
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Text generation backend
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Generate a reply for `conversation` using the credentials in `profile`
    ///
    /// The last turn of `conversation` is the current user message.
    async fn generate_text(
        &self,
        profile: &CredentialProfile,
        conversation: &[ChatTurn],
    ) -> Result<BackendReply, BackendError>;
}

/// Image generation backend
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate exactly one square image for `prompt` and return its raw bytes
    async fn generate_image(
        &self,
        profile: &CredentialProfile,
        prompt: &str,
    ) -> Result<Vec<u8>, BackendError>;
}
