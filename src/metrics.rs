//! Prometheus metrics collection for chatrelay
//!
//! This module provides metrics instrumentation for tracking:
//! - Routed messages by route kind
//! - Backend attempt failures, exhausted retry chains and credential rotations
//! - Storage fallbacks to inline image delivery
//! - Knowledge base size and message processing latency
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Route taken for a message, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    KnowledgeBase,
    SupportContact,
    Image,
    Text,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::KnowledgeBase => "knowledge_base",
            RouteKind::SupportContact => "support_contact",
            RouteKind::Image => "image",
            RouteKind::Text => "text",
        }
    }
}

/// Generative backend, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Image,
    Text,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Image => "image",
            BackendKind::Text => "text",
        }
    }
}

/// Metrics collector for chatrelay
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    messages_total: IntCounterVec,
    backend_failures: IntCounterVec,
    backend_exhausted: IntCounterVec,
    credential_rotations: IntCounter,
    storage_fallbacks: IntCounter,
    knowledge_base_entries: IntGauge,
    processing_duration: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 4 route kinds
        let messages_total = IntCounterVec::new(
            Opts::new(
                "chatrelay_messages_total",
                "Total number of processed messages by route kind",
            ),
            &["route"],
        )?;

        let backend_failures = IntCounterVec::new(
            Opts::new(
                "chatrelay_backend_failures_total",
                "Total number of failed generative backend attempts by backend",
            ),
            &["backend"],
        )?;

        let backend_exhausted = IntCounterVec::new(
            Opts::new(
                "chatrelay_backend_exhausted_total",
                "Total number of backend retry chains that ran out of attempts, by backend",
            ),
            &["backend"],
        )?;

        let credential_rotations = IntCounter::with_opts(Opts::new(
            "chatrelay_credential_rotations_total",
            "Total number of credential profile rotations",
        ))?;

        let storage_fallbacks = IntCounter::with_opts(Opts::new(
            "chatrelay_storage_fallbacks_total",
            "Total number of generated images delivered inline because the upload failed",
        ))?;

        let knowledge_base_entries = IntGauge::with_opts(Opts::new(
            "chatrelay_knowledge_base_entries",
            "Number of question/answer pairs currently loaded",
        ))?;

        let processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "chatrelay_message_processing_duration_ms",
                "Message processing latency in milliseconds",
            )
            .buckets(vec![
                1.0, 10.0, 100.0, 500.0, 1000.0, 5000.0, 15000.0, 60000.0, 180000.0,
            ]),
        )?;

        registry.register(Box::new(messages_total.clone()))?;
        registry.register(Box::new(backend_failures.clone()))?;
        registry.register(Box::new(backend_exhausted.clone()))?;
        registry.register(Box::new(credential_rotations.clone()))?;
        registry.register(Box::new(storage_fallbacks.clone()))?;
        registry.register(Box::new(knowledge_base_entries.clone()))?;
        registry.register(Box::new(processing_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            messages_total,
            backend_failures,
            backend_exhausted,
            credential_rotations,
            storage_fallbacks,
            knowledge_base_entries,
            processing_duration,
        })
    }

    pub fn record_message(&self, route: RouteKind) {
        self.messages_total.with_label_values(&[route.as_str()]).inc();
    }

    pub fn record_backend_failure(&self, backend: BackendKind) {
        self.backend_failures
            .with_label_values(&[backend.as_str()])
            .inc();
    }

    pub fn record_backend_exhausted(&self, backend: BackendKind) {
        self.backend_exhausted
            .with_label_values(&[backend.as_str()])
            .inc();
    }

    pub fn record_credential_rotation(&self) {
        self.credential_rotations.inc();
    }

    pub fn record_storage_fallback(&self) {
        self.storage_fallbacks.inc();
    }

    pub fn set_knowledge_base_entries(&self, count: usize) {
        self.knowledge_base_entries
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record message processing latency
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite and negative durations, which would corrupt
    /// histogram percentiles.
    pub fn record_processing_duration(&self, duration_ms: f64) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }
        self.processing_duration.observe(duration_ms);
        Ok(())
    }

    pub fn messages_count(&self, route: RouteKind) -> u64 {
        self.messages_total.with_label_values(&[route.as_str()]).get()
    }

    pub fn backend_failures_count(&self, backend: BackendKind) -> u64 {
        self.backend_failures
            .with_label_values(&[backend.as_str()])
            .get()
    }

    pub fn backend_exhausted_count(&self, backend: BackendKind) -> u64 {
        self.backend_exhausted
            .with_label_values(&[backend.as_str()])
            .get()
    }

    pub fn credential_rotations_count(&self) -> u64 {
        self.credential_rotations.get()
    }

    pub fn storage_fallbacks_count(&self) -> u64 {
        self.storage_fallbacks.get()
    }

    pub fn knowledge_base_entries(&self) -> i64 {
        self.knowledge_base_entries.get()
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_count,
                    "Prometheus text encoder failed"
                );
                prometheus::Error::Msg(format!(
                    "Failed to encode {} metric families: {}",
                    metric_count, e
                ))
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
