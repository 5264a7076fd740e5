//! Image generation pipeline
//!
//! Prompt → image backend (under retry and credential rotation) → JPEG
//! re-encode → upload. When the upload fails the image is re-encoded more
//! aggressively and returned inline as a data URL; that fallback does not
//! consume the retry budget.

use crate::metrics::{BackendKind, Metrics};
use crate::models::{BackendError, CredentialRotator, ImageBackend};
use crate::router::intent::strip_image_triggers;
use crate::shared::RetryExecutor;
use crate::storage::ObjectStore;
use crate::transcode::{self, EncodeSettings, JPEG_EXTENSION};
use std::sync::Arc;

/// Where a generated image can be found
///
/// At most one field is populated. Both absent means generation failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOutcome {
    pub url: Option<String>,
    pub inline_data: Option<String>,
}

impl ImageOutcome {
    pub fn hosted(url: String) -> Self {
        Self {
            url: Some(url),
            inline_data: None,
        }
    }

    pub fn inline(data_url: String) -> Self {
        Self {
            url: None,
            inline_data: Some(data_url),
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_failure(&self) -> bool {
        self.url.is_none() && self.inline_data.is_none()
    }
}

/// Object name for a newly generated image
pub fn new_object_key() -> String {
    format!("image_{}.{}", uuid::Uuid::new_v4(), JPEG_EXTENSION)
}

pub struct ImagePipeline {
    backend: Arc<dyn ImageBackend>,
    store: Arc<dyn ObjectStore>,
    rotator: Arc<CredentialRotator>,
    retry: RetryExecutor,
    metrics: Arc<Metrics>,
}

impl ImagePipeline {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        store: Arc<dyn ObjectStore>,
        rotator: Arc<CredentialRotator>,
        retry: RetryExecutor,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            backend,
            store,
            rotator,
            retry,
            metrics,
        }
    }

    /// Generate one image for `prompt`
    ///
    /// Never fails; exhaustion of the retry budget yields
    /// `ImageOutcome::failed()`.
    pub async fn generate(&self, prompt: &str) -> ImageOutcome {
        let prompt = strip_image_triggers(prompt);
        let prompt = prompt.as_str();

        let result = self
            .retry
            .execute(
                "image_generation",
                move || self.attempt(prompt),
                |_: &BackendError| {
                    self.metrics.record_backend_failure(BackendKind::Image);
                    self.rotator.advance();
                    self.metrics.record_credential_rotation();
                },
            )
            .await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_backend_exhausted(BackendKind::Image);
                tracing::error!(error = %e, "All image generation attempts failed");
                ImageOutcome::failed()
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<ImageOutcome, BackendError> {
        let profile = self.rotator.current().clone();
        let raw = self.backend.generate_image(&profile, prompt).await?;

        let primary = transcode::compress(&raw, EncodeSettings::PRIMARY)?;
        let key = new_object_key();

        match self
            .store
            .put(&key, primary.bytes, primary.mime_type)
            .await
        {
            Ok(url) => {
                tracing::info!(
                    project_id = %profile.project_id(),
                    key = %key,
                    "Generated image uploaded"
                );
                Ok(ImageOutcome::hosted(url))
            }
            Err(storage_error) => {
                tracing::warn!(
                    error = %storage_error,
                    key = %key,
                    "Upload failed, delivering image inline"
                );
                self.metrics.record_storage_fallback();
                let fallback = transcode::compress(&raw, EncodeSettings::FALLBACK)?;
                Ok(ImageOutcome::inline(fallback.to_data_url()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_shape() {
        let key = new_object_key();
        assert!(key.starts_with("image_"));
        assert!(key.ends_with(".jpg"));
        assert_ne!(key, new_object_key());
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(ImageOutcome::failed().is_failure());
        assert!(!ImageOutcome::hosted("u".into()).is_failure());
        let inline = ImageOutcome::inline("data:image/jpeg;base64,AA".into());
        assert!(inline.url.is_none());
        assert!(!inline.is_failure());
    }
}
