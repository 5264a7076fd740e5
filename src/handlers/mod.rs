//! HTTP request handlers for the chatrelay API

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::knowledge;
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::models::{CredentialRotator, ServiceAccountTokens, VertexClient};
use crate::responders::{ImagePipeline, TextResponder};
use crate::router::MessageRouter;
use crate::session::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::shared::RetryExecutor;
use crate::storage::S3ObjectStore;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod chat;
pub mod extractor;
pub mod health;
pub mod metrics;
pub mod sessions;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    router: Arc<MessageRouter>,
    sessions: Arc<dyn SessionStore>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Assemble state from already-built components
    pub fn new(
        config: Arc<Config>,
        router: Arc<MessageRouter>,
        sessions: Arc<dyn SessionStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            router,
            sessions,
            metrics,
        }
    }

    /// Build every component from configuration
    ///
    /// The knowledge base load never fails (an empty base is used instead);
    /// the object store and a configured Redis store must be reachable.
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            AppError::Internal(format!("Failed to initialize metrics registry: {}", e))
        })?);

        let knowledge = Arc::new(knowledge::load(&config.knowledge_base).await);
        metrics.set_knowledge_base_entries(knowledge.len());

        let rotator = Arc::new(CredentialRotator::new(config.credentials.clone())?);
        let retry = RetryExecutor::from_config(&config.retry);

        let client = Arc::new(VertexClient::new(
            Arc::new(ServiceAccountTokens::new()),
            config.text_backend.clone(),
            config.image_backend.clone(),
        ));

        let store = S3ObjectStore::from_config(&config.storage)
            .await
            .map_err(|e| AppError::Config(format!("Object store setup failed: {}", e)))?;

        let images = Arc::new(ImagePipeline::new(
            client.clone(),
            Arc::new(store),
            rotator.clone(),
            retry,
            metrics.clone(),
        ));
        let text = Arc::new(TextResponder::new(
            client,
            rotator,
            retry,
            metrics.clone(),
        ));
        let router = Arc::new(MessageRouter::new(
            knowledge,
            images,
            text,
            metrics.clone(),
        ));

        let sessions: Arc<dyn SessionStore> = match &config.session.redis_url {
            Some(url) => {
                Arc::new(RedisSessionStore::connect(url, config.session.expiry_seconds).await?)
            }
            None => {
                tracing::warn!(
                    "No Redis URL configured, sessions are kept in process memory only"
                );
                Arc::new(InMemorySessionStore::new(Duration::from_secs(
                    config.session.expiry_seconds,
                )))
            }
        };

        Ok(Self::new(Arc::new(config), router, sessions, metrics))
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the message router
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// CORS policy for the configured origins, with credentials allowed
pub fn cors_layer(origins: &[String]) -> AppResult<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| {
                AppError::Config(format!(
                    "Invalid CORS origin '{}' in [server].cors_origins",
                    origin
                ))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true))
}

/// Build the HTTP application
pub fn app(state: AppState) -> AppResult<Router> {
    let cors = cors_layer(&state.config().server.cors_origins)?;

    Ok(Router::new()
        .route("/send-message", post(chat::handler))
        .route("/cleanup-sessions", get(sessions::cleanup_handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
