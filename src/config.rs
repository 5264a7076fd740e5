//! Configuration management for chatrelay
//!
//! Parses TOML configuration files, applies environment overrides and
//! provides typed access to settings.

use crate::error::{AppError, AppResult};
use crate::models::credentials::CredentialProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Hosted spreadsheet the knowledge base is loaded from by default
pub const DEFAULT_KNOWLEDGE_BASE_SOURCE: &str =
    "https://questions-answers-baboon.s3.eu-north-1.amazonaws.com/questions_and_answers.xlsx";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub credentials: Vec<CredentialProfile>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub text_backend: TextBackendConfig,
    #[serde(default)]
    pub image_backend: ImageBackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API with credentials
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "https://lilotest.com".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

/// Retry policy settings shared by both backend chains
///
/// # Custom Deserialization
///
/// Deserialization goes through `RetryConfig::new`, so a parsed value always
/// has at least one attempt and a base delay no larger than the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawRetryConfig")]
pub struct RetryConfig {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter: bool,
}

#[derive(Deserialize)]
struct RawRetryConfig {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    jitter: bool,
}

impl TryFrom<RawRetryConfig> for RetryConfig {
    type Error = AppError;

    fn try_from(raw: RawRetryConfig) -> Result<Self, Self::Error> {
        Self::new(
            raw.max_attempts,
            raw.base_delay_ms,
            raw.max_delay_ms,
            raw.jitter,
        )
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_jitter() -> bool {
    true
}

impl RetryConfig {
    /// Create a validated retry configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `max_attempts` is zero or
    /// `base_delay_ms` exceeds `max_delay_ms`.
    pub fn new(
        max_attempts: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
        jitter: bool,
    ) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if base_delay_ms > max_delay_ms {
            return Err(AppError::Config(format!(
                "retry.base_delay_ms ({}) cannot exceed retry.max_delay_ms ({})",
                base_delay_ms, max_delay_ms
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            jitter,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Knowledge base source and support contact details
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeBaseConfig {
    /// https URL or local path of a `.xlsx` or `.json` question/answer table
    #[serde(default = "default_kb_source")]
    pub source: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_support_phone")]
    pub support_phone: String,
    #[serde(default = "default_support_email")]
    pub support_email: String,
}

fn default_kb_source() -> String {
    DEFAULT_KNOWLEDGE_BASE_SOURCE.to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_support_phone() -> String {
    "+355676038187".to_string()
}

fn default_support_email() -> String {
    "support@baboon.al".to_string()
}

impl KnowledgeBaseConfig {
    /// True when `source` is fetched over HTTP rather than read from disk
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            source: default_kb_source(),
            fetch_timeout_seconds: default_fetch_timeout(),
            support_phone: default_support_phone(),
            support_email: default_support_email(),
        }
    }
}

/// Text generation backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextBackendConfig {
    #[serde(default = "default_text_model")]
    pub model: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_sampling")]
    pub temperature: f64,
    #[serde(default = "default_sampling")]
    pub top_p: f64,
    #[serde(default = "default_text_timeout")]
    pub request_timeout_seconds: u64,
    /// Overrides `https://{location}-aiplatform.googleapis.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

fn default_text_model() -> String {
    "gemini-1.5-flash-002".to_string()
}

fn default_system_instruction() -> String {
    "Helpful and assisting ai.".to_string()
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_sampling() -> f64 {
    0.9
}

fn default_text_timeout() -> u64 {
    60
}

impl Default for TextBackendConfig {
    fn default() -> Self {
        Self {
            model: default_text_model(),
            system_instruction: default_system_instruction(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_sampling(),
            top_p: default_sampling(),
            request_timeout_seconds: default_text_timeout(),
            api_base_url: None,
        }
    }
}

/// Image generation backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageBackendConfig {
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

fn default_image_model() -> String {
    "imagen-3.0-generate-002".to_string()
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

fn default_image_timeout() -> u64 {
    120
}

impl Default for ImageBackendConfig {
    fn default() -> Self {
        Self {
            model: default_image_model(),
            aspect_ratio: default_aspect_ratio(),
            request_timeout_seconds: default_image_timeout(),
            api_base_url: None,
        }
    }
}

/// Object storage settings for generated images
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_file: Option<PathBuf>,
}

fn default_bucket() -> String {
    "lilotest-images".to_string()
}

fn default_region() -> String {
    "eu-north-1".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            access_key_file: None,
            secret_key_file: None,
        }
    }
}

/// Session store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Redis connection URL; sessions are kept in-process when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    #[serde(default = "default_session_expiry")]
    pub expiry_seconds: u64,
}

fn default_session_expiry() -> u64 {
    86_400
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            expiry_seconds: default_session_expiry(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Environment overrides are applied between parsing and validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML
        let mut config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config.apply_env_overrides();

        // Phase 3: Validate
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to read variables
    ///
    /// Recognized variables: `S3_BUCKET_NAME`, `S3_REGION`, `REDIS_URL` and
    /// `GCP_KEY_PATH_<n>` (1-based, replaces the key path of the n-th profile).
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bucket) = lookup("S3_BUCKET_NAME") {
            tracing::debug!(bucket = %bucket, "S3_BUCKET_NAME overrides storage.bucket");
            self.storage.bucket = bucket;
        }
        if let Some(region) = lookup("S3_REGION") {
            tracing::debug!(region = %region, "S3_REGION overrides storage.region");
            self.storage.region = region;
        }
        if let Some(url) = lookup("REDIS_URL") {
            tracing::debug!("REDIS_URL overrides session.redis_url");
            self.session.redis_url = Some(url);
        }
        for (i, profile) in self.credentials.iter_mut().enumerate() {
            let var = format!("GCP_KEY_PATH_{}", i + 1);
            if let Some(path) = lookup(&var) {
                tracing::debug!(
                    variable = %var,
                    project_id = %profile.project_id(),
                    "Environment overrides credential key path"
                );
                profile.set_key_path(PathBuf::from(path));
            }
        }
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when a
    /// `Config` is built by other means.
    pub fn validate(&self) -> AppResult<()> {
        if self.credentials.is_empty() {
            return Err(AppError::Config(
                "Configuration error: no [[credentials]] profiles configured. \
                At least one profile is required.\n\n\
                Example fix - add to config.toml:\n\
                [[credentials]]\n\
                project_id = \"my-project\"\n\
                location = \"us-central1\"\n\
                key_path = \"/run/secrets/my_project_key\""
                    .to_string(),
            ));
        }

        for (i, profile) in self.credentials.iter().enumerate() {
            if profile.project_id().trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Configuration error: credentials[{}] has an empty project_id",
                    i
                )));
            }
            if profile.location().trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Configuration error: credentials[{}] ({}) has an empty location",
                    i,
                    profile.project_id()
                )));
            }
        }

        let text = &self.text_backend;
        if !text.temperature.is_finite() || !(0.0..=2.0).contains(&text.temperature) {
            return Err(AppError::Config(format!(
                "Configuration error: text_backend.temperature must be a finite number \
                between 0.0 and 2.0, got {}",
                text.temperature
            )));
        }
        if !text.top_p.is_finite() || text.top_p <= 0.0 || text.top_p > 1.0 {
            return Err(AppError::Config(format!(
                "Configuration error: text_backend.top_p must be in (0.0, 1.0], got {}",
                text.top_p
            )));
        }
        if text.max_output_tokens == 0 {
            return Err(AppError::Config(
                "Configuration error: text_backend.max_output_tokens must be greater than 0"
                    .to_string(),
            ));
        }

        for (name, timeout) in [
            ("text_backend", text.request_timeout_seconds),
            ("image_backend", self.image_backend.request_timeout_seconds),
            ("knowledge_base", self.knowledge_base.fetch_timeout_seconds),
        ] {
            if timeout == 0 || timeout > 300 {
                return Err(AppError::Config(format!(
                    "Configuration error: {} timeout must be in (0, 300] seconds, got {}",
                    name, timeout
                )));
            }
        }

        for (name, url) in [
            ("text_backend.api_base_url", text.api_base_url.as_deref()),
            (
                "image_backend.api_base_url",
                self.image_backend.api_base_url.as_deref(),
            ),
            ("storage.endpoint_url", self.storage.endpoint_url.as_deref()),
        ] {
            if let Some(url) = url
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                return Err(AppError::Config(format!(
                    "Configuration error: {} '{}' must start with 'http://' or 'https://'",
                    name, url
                )));
            }
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(AppError::Config(
                "Configuration error: storage.bucket cannot be empty".to_string(),
            ));
        }
        if self.storage.access_key_file.is_some() != self.storage.secret_key_file.is_some() {
            return Err(AppError::Config(
                "Configuration error: storage.access_key_file and storage.secret_key_file \
                must be set together"
                    .to_string(),
            ));
        }

        if self.session.expiry_seconds == 0 {
            return Err(AppError::Config(
                "Configuration error: session.expiry_seconds must be greater than 0".to_string(),
            ));
        }

        if self.knowledge_base.source.trim().is_empty() {
            return Err(AppError::Config(
                "Configuration error: knowledge_base.source cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
