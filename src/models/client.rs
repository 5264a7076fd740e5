//! HTTP client for the hosted generative models
//!
//! `VertexClient` implements both backend traits over the Vertex AI REST
//! API. The project and region of every call come from the credential
//! profile selected for that attempt, so one client serves all profiles.

use crate::config::{ImageBackendConfig, TextBackendConfig};
use crate::models::auth::TokenSource;
use crate::models::backend::{BackendError, ChatTurn, ImageBackend, Role, TextBackend};
use crate::models::credentials::CredentialProfile;
use crate::models::reply::BackendReply;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Harm categories sent with every text request, each at `BLOCK_NONE`
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

/// Longest error body kept in `BackendError::Status`
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: Role,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

/// REST client for the text and image models
pub struct VertexClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    text: TextBackendConfig,
    image: ImageBackendConfig,
}

impl VertexClient {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        text: TextBackendConfig,
        image: ImageBackendConfig,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            text,
            image,
        }
    }

    /// Build the model endpoint URL for `profile`
    ///
    /// `verb` is `generateContent` or `predict`.
    pub fn endpoint_url(
        base_url: Option<&str>,
        profile: &CredentialProfile,
        model: &str,
        verb: &str,
    ) -> String {
        let base = match base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", profile.location()),
        };
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            base,
            profile.project_id(),
            profile.location(),
            model,
            verb
        )
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        profile: &CredentialProfile,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<serde_json::Value, BackendError> {
        let token = self.tokens.access_token(profile).await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            tracing::debug!(
                url = %url,
                status = %status,
                project_id = %profile.project_id(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| BackendError::InvalidReply {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl TextBackend for VertexClient {
    async fn generate_text(
        &self,
        profile: &CredentialProfile,
        conversation: &[ChatTurn],
    ) -> Result<BackendReply, BackendError> {
        let url = Self::endpoint_url(
            self.text.api_base_url.as_deref(),
            profile,
            &self.text.model,
            "generateContent",
        );

        let request = GenerateContentRequest {
            contents: conversation
                .iter()
                .map(|turn| Content {
                    role: turn.role,
                    parts: [Part { text: &turn.text }],
                })
                .collect(),
            system_instruction: SystemInstruction {
                parts: [Part {
                    text: &self.text.system_instruction,
                }],
            },
            generation_config: GenerationConfig {
                max_output_tokens: self.text.max_output_tokens,
                temperature: self.text.temperature,
                top_p: self.text.top_p,
            },
            safety_settings: HARM_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        tracing::debug!(
            project_id = %profile.project_id(),
            model = %self.text.model,
            turns = conversation.len(),
            "Sending text generation request"
        );

        let body = self
            .post_json(
                profile,
                &url,
                &request,
                Duration::from_secs(self.text.request_timeout_seconds),
            )
            .await?;

        Ok(BackendReply::from_generate_content(body))
    }
}

#[async_trait]
impl ImageBackend for VertexClient {
    async fn generate_image(
        &self,
        profile: &CredentialProfile,
        prompt: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let url = Self::endpoint_url(
            self.image.api_base_url.as_deref(),
            profile,
            &self.image.model,
            "predict",
        );

        let request = PredictRequest {
            instances: [PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: &self.image.aspect_ratio,
            },
        };

        tracing::debug!(
            project_id = %profile.project_id(),
            model = %self.image.model,
            prompt_chars = prompt.chars().count(),
            "Sending image generation request"
        );

        let body = self
            .post_json(
                profile,
                &url,
                &request,
                Duration::from_secs(self.image.request_timeout_seconds),
            )
            .await?;

        let parsed: PredictResponse =
            serde_json::from_value(body).map_err(|e| BackendError::InvalidReply {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        let encoded = parsed
            .predictions
            .into_iter()
            .next()
            .and_then(|p| p.bytes_base64_encoded)
            .ok_or_else(|| BackendError::NoImages {
                endpoint: url.clone(),
            })?;

        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| BackendError::InvalidReply {
                endpoint: url,
                reason: format!("image payload is not valid base64: {}", e),
            })
    }
}
