//! Integration tests for the HTTP surface
//!
//! Drives the full Axum application with `oneshot`, over scripted backends
//! and the in-process session store.

mod common;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chatrelay::{
    handlers::{self, AppState},
    metrics::RouteKind,
    router::HistoryEntry,
    session::{InMemorySessionStore, SessionError, SessionStore},
};
use common::{
    MemoryObjectStore, RouterFixture, ScriptedImageBackend, ScriptedTextBackend,
    small_knowledge_base, test_config,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    fixture: RouterFixture,
}

fn test_app_with_sessions(sessions: Arc<dyn SessionStore>) -> TestApp {
    let fixture = RouterFixture::new(
        small_knowledge_base(),
        ScriptedTextBackend::always("model says hi"),
        ScriptedImageBackend::new(Vec::new()),
        MemoryObjectStore::working(),
    );
    let state = AppState::new(
        Arc::new(test_config()),
        fixture.router.clone(),
        sessions,
        fixture.metrics.clone(),
    );
    let app = handlers::app(state).expect("app should build");
    TestApp { app, fixture }
}

fn test_app() -> TestApp {
    test_app_with_sessions(Arc::new(InMemorySessionStore::new(Duration::from_secs(3600))))
}

fn message_request(message: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/send-message")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(json!({ "message": message }).to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_send_message_answers_and_issues_cookie() {
    let t = test_app();

    let response = t
        .app
        .oneshot(message_request("How do I track my order?", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();

    let body = body_json(response).await;
    let session_id = body["session_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(session_id).is_ok());
    assert_eq!(
        cookie,
        format!(
            "session_id={}; HttpOnly; Secure; SameSite=Lax; Max-Age=3600; Path=/",
            session_id
        )
    );
    assert_eq!(
        body["response"],
        json!({
            "type": "text",
            "text": "Use the tracking page in the app.",
            "source": "qa_system"
        })
    );
    assert_eq!(t.fixture.metrics.messages_count(RouteKind::KnowledgeBase), 1);
}

#[tokio::test]
async fn test_cookie_session_carries_history_to_text_backend() {
    let t = test_app();

    let first = t
        .app
        .clone()
        .oneshot(message_request("How do I track my order?", None))
        .await
        .unwrap();
    let session_id = body_json(first).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let second = t
        .app
        .oneshot(message_request(
            "write a haiku about rain",
            Some(&format!("session_id={}", session_id)),
        ))
        .await
        .unwrap();
    let body = body_json(second).await;

    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["response"]["type"], "text");
    assert_eq!(body["response"]["text"], "model says hi");
    assert!(body["response"].get("source").is_none());

    let conversations = t.fixture.text.conversations();
    let texts: Vec<&str> = conversations[0].iter().map(|turn| turn.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "How do I track my order?",
            "Use the tracking page in the app.",
            "write a haiku about rain"
        ]
    );
}

#[tokio::test]
async fn test_weak_match_returns_support_contact() {
    let t = test_app();

    let response = t
        .app
        .oneshot(message_request("track order", None))
        .await
        .unwrap();
    let body = body_json(response).await;

    assert_eq!(body["response"]["type"], "support_contact");
    assert_eq!(body["response"]["show_representative_button"], true);
    assert_eq!(
        body["response"]["support_info"],
        json!({"phone": "+355676038187", "email": "support@baboon.al"})
    );
}

#[tokio::test]
async fn test_empty_message_is_bad_request() {
    let t = test_app();

    let response = t.app.oneshot(message_request("   ", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let t = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/send-message")
        .body(Body::from(r#"{"message": "hello"}"#))
        .unwrap();

    let response = t.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("application/json"));
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_removes_expired_sessions() {
    let t = test_app();

    t.app
        .clone()
        .oneshot(message_request("How do I track my order?", None))
        .await
        .unwrap();

    let response = t.app.clone().oneshot(get("/cleanup-sessions")).await.unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"status": "success", "cleaned_sessions": 0})
    );

    tokio::time::advance(Duration::from_secs(3601)).await;

    let response = t.app.oneshot(get("/cleanup-sessions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "success", "cleaned_sessions": 1})
    );
}

#[tokio::test]
async fn test_health_reports_counts() {
    let t = test_app();

    let response = t.app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "OK", "knowledge_base_entries": 2, "credential_profiles": 2})
    );
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_routed_messages() {
    let t = test_app();

    t.app
        .clone()
        .oneshot(message_request("How do I track my order?", None))
        .await
        .unwrap();
    let response = t.app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"chatrelay_messages_total{route="knowledge_base"} 1"#));
    assert!(text.contains("chatrelay_message_processing_duration_ms"));
}

struct UnavailableSessions;

#[async_trait]
impl SessionStore for UnavailableSessions {
    async fn resolve(&self, _session_id: Option<&str>) -> Result<String, SessionError> {
        Err(SessionError::Corrupt {
            key: "session:unknown".to_string(),
            reason: "store offline".to_string(),
        })
    }

    async fn history(&self, _session_id: &str) -> Result<Vec<HistoryEntry>, SessionError> {
        Ok(Vec::new())
    }

    async fn append(&self, _session_id: &str, _entry: HistoryEntry) -> Result<(), SessionError> {
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, SessionError> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_session_store_failure_is_service_unavailable() {
    let t = test_app_with_sessions(Arc::new(UnavailableSessions));

    let response = t
        .app
        .oneshot(message_request("How do I track my order?", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(t.fixture.metrics.messages_count(RouteKind::KnowledgeBase), 0);
}
