//! Logging setup
//!
//! Structured logging with tracing and tracing-subscriber. `RUST_LOG`
//! overrides the configured level.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter directives used when `RUST_LOG` is not set
pub fn default_directives(level: &str) -> String {
    format!("chatrelay={},tower_http=debug", level)
}

/// Initialize the tracing subscriber
///
/// Only the first call per process takes effect.
///
/// # Examples
///
/// ```no_run
/// chatrelay::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
