//! Message endpoint handler
//!
//! Handles POST /send-message: resolves the caller's session from the
//! `session_id` cookie, routes the message and records the exchange.

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::handlers::extractor::ValidJson;
use crate::middleware::RequestId;
use crate::router::RouterResponse;
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum allowed message length in characters (100K chars)
const MAX_MESSAGE_LENGTH: usize = 100_000;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_id";

/// Message request from client
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    message: String,
}

impl MessageRequest {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<'de> Deserialize<'de> for MessageRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawMessageRequest {
            message: String,
        }

        let raw = RawMessageRequest::deserialize(deserializer)?;

        if raw.message.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "message cannot be empty or contain only whitespace",
            ));
        }

        // Count Unicode characters, not bytes
        let char_count = raw.message.chars().count();
        if char_count > MAX_MESSAGE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "message exceeds maximum length of {} characters (got {})",
                MAX_MESSAGE_LENGTH, char_count
            )));
        }

        Ok(MessageRequest {
            message: raw.message,
        })
    }
}

/// Message response to client
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub response: RouterResponse,
    pub session_id: String,
}

/// Value of the session cookie, if the request carries one
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value issuing `session_id`
pub fn session_cookie(session_id: &str, max_age_seconds: u64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Max-Age={}; Path=/",
        SESSION_COOKIE, session_id, max_age_seconds
    )
}

/// Message handler
///
/// Session store failures surface as 503; routing itself never fails.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<MessageRequest>,
) -> AppResult<Response> {
    let cookie_session = session_id_from_headers(&headers);

    tracing::debug!(
        request_id = %request_id,
        message_length = request.message().len(),
        has_session_cookie = cookie_session.is_some(),
        "Received message"
    );

    let sessions = state.sessions();
    let session_id = sessions.resolve(cookie_session.as_deref()).await?;
    let history = sessions.history(&session_id).await?;

    let outcome = state.router().process(request.message(), &history).await;

    sessions.append(&session_id, outcome.history_entry).await?;

    tracing::info!(
        request_id = %request_id,
        session_id = %session_id,
        history_len = history.len() + 1,
        "Message handled"
    );

    let cookie = session_cookie(&session_id, state.config().session.expiry_seconds);
    let mut response = Json(MessageResponse {
        response: outcome.response,
        session_id,
    })
    .into_response();

    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                "Session cookie is not a valid header value, response sent without it"
            );
        }
    }

    Ok(response)
}
