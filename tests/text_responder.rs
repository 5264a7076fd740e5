//! Integration tests for the text responder's retry and rotation behaviour
//!
//! All tests run on a paused clock so backoff sleeps complete instantly
//! while elapsed virtual time stays observable.

mod common;

use chatrelay::{
    metrics::BackendKind,
    models::BackendReply,
    responders::TextResponder,
    router::HistoryEntry,
};
use common::{ScriptedTextBackend, metrics, retry, rotator, status_error};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_recovers_after_failures_rotating_credentials() {
    let backend = Arc::new(ScriptedTextBackend::new(vec![
        Err(status_error(429)),
        Err(status_error(503)),
        Ok(BackendReply::Text("third time lucky".to_string())),
    ]));
    let rotator = rotator(2);
    let metrics = metrics();
    let responder = TextResponder::new(backend.clone(), rotator.clone(), retry(3), metrics.clone());

    let reply = responder.generate("hello", &[]).await;

    assert_eq!(reply, "third time lucky");
    assert_eq!(
        backend.projects(),
        vec!["project-1", "project-2", "project-1"]
    );
    assert_eq!(metrics.credential_rotations_count(), 2);
    assert_eq!(metrics.backend_failures_count(BackendKind::Text), 2);
    assert_eq!(metrics.backend_exhausted_count(BackendKind::Text), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_fallback_with_last_error() {
    let backend = Arc::new(ScriptedTextBackend::new(vec![
        Err(status_error(500)),
        Err(status_error(502)),
        Err(status_error(503)),
    ]));
    let rotator = rotator(2);
    let metrics = metrics();
    let responder = TextResponder::new(backend.clone(), rotator.clone(), retry(3), metrics.clone());

    let reply = responder.generate("hello", &[]).await;

    assert!(reply.starts_with(
        "I'm sorry, I'm having trouble processing your request right now. Please try again later. (Error: "
    ));
    assert!(reply.contains("HTTP 503"));
    assert!(!reply.contains("HTTP 500"));
    assert_eq!(backend.projects().len(), 3);
    // Rotation follows every failure, the last one included
    assert_eq!(metrics.credential_rotations_count(), 3);
    assert_eq!(rotator.current_index(), 1);
    assert_eq!(metrics.backend_exhausted_count(BackendKind::Text), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_and_skips_final_sleep() {
    let backend = Arc::new(ScriptedTextBackend::new(vec![
        Err(status_error(500)),
        Err(status_error(500)),
        Err(status_error(500)),
    ]));
    let responder = TextResponder::new(backend, rotator(1), retry(3), metrics());

    let start = Instant::now();
    responder.generate("hello", &[]).await;

    // 1s after the first failure, 2s after the second, nothing after the third
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_single_profile_reuses_same_project() {
    let backend = Arc::new(ScriptedTextBackend::new(vec![Err(status_error(500))]));
    let responder = TextResponder::new(backend.clone(), rotator(1), retry(3), metrics());

    let reply = responder.generate("hello", &[]).await;

    assert_eq!(reply, "scripted reply");
    assert_eq!(backend.projects(), vec!["project-1", "project-1"]);
}

#[tokio::test]
async fn test_fragment_reply_is_flattened() {
    let backend = Arc::new(ScriptedTextBackend::new(vec![Ok(BackendReply::Fragments(
        vec![Some("Hello".to_string()), None, Some("world".to_string())],
    ))]));
    let responder = TextResponder::new(backend, rotator(1), retry(1), metrics());

    assert_eq!(responder.generate("hi", &[]).await, "Hello world");
}

#[tokio::test]
async fn test_history_without_bot_message_adds_only_user_turn() {
    let backend = Arc::new(ScriptedTextBackend::always("ok"));
    let responder = TextResponder::new(backend.clone(), rotator(1), retry(1), metrics());
    let history = vec![
        HistoryEntry::new("first", None),
        HistoryEntry::new("second", Some("reply".to_string())),
    ];

    responder.generate("third", &history).await;

    let texts: Vec<String> = backend.conversations()[0]
        .iter()
        .map(|t| t.text.clone())
        .collect();
    assert_eq!(texts, vec!["first", "second", "reply", "third"]);
}
