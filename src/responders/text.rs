//! Text generation responder

use crate::metrics::{BackendKind, Metrics};
use crate::models::{BackendError, ChatTurn, CredentialRotator, TextBackend};
use crate::router::HistoryEntry;
use crate::shared::RetryExecutor;
use std::fmt::Display;
use std::sync::Arc;

/// Reply used when every text generation attempt failed
pub fn fallback_message(error: &impl Display) -> String {
    format!(
        "I'm sorry, I'm having trouble processing your request right now. \
         Please try again later. (Error: {})",
        error
    )
}

/// Turn `history` plus the current message into alternating turns
///
/// Entries without a recorded bot message contribute only their user turn.
pub fn build_conversation(message: &str, history: &[HistoryEntry]) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len() * 2 + 1);
    for entry in history {
        turns.push(ChatTurn::user(entry.user_message.as_str()));
        if let Some(bot) = &entry.bot_message {
            turns.push(ChatTurn::model(bot.as_str()));
        }
    }
    turns.push(ChatTurn::user(message));
    turns
}

pub struct TextResponder {
    backend: Arc<dyn TextBackend>,
    rotator: Arc<CredentialRotator>,
    retry: RetryExecutor,
    metrics: Arc<Metrics>,
}

impl TextResponder {
    pub fn new(
        backend: Arc<dyn TextBackend>,
        rotator: Arc<CredentialRotator>,
        retry: RetryExecutor,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            backend,
            rotator,
            retry,
            metrics,
        }
    }

    /// Generate a reply to `message` in the context of `history`
    ///
    /// Never fails; exhaustion of the retry budget yields `fallback_message`
    /// carrying the last error.
    pub async fn generate(&self, message: &str, history: &[HistoryEntry]) -> String {
        let conversation = build_conversation(message, history);
        let conversation = conversation.as_slice();

        let result = self
            .retry
            .execute(
                "text_generation",
                || async move {
                    let profile = self.rotator.current().clone();
                    self.backend.generate_text(&profile, conversation).await
                },
                |_: &BackendError| {
                    self.metrics.record_backend_failure(BackendKind::Text);
                    self.rotator.advance();
                    self.metrics.record_credential_rotation();
                },
            )
            .await;

        match result {
            Ok(reply) => reply.into_text(),
            Err(e) => {
                self.metrics.record_backend_exhausted(BackendKind::Text);
                tracing::error!(error = %e, "All text generation attempts failed");
                fallback_message(&e)
            }
        }
    }
}
