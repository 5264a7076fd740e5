//! Text backend reply shapes
//!
//! Replies come back in one of three shapes: a direct text field, a list of
//! content fragments, or something else entirely. `BackendReply` names the
//! shape explicitly and `into_text` applies a fixed precedence:
//! direct text, then non-empty fragments joined by single spaces, then the
//! JSON rendering of the whole reply.

use serde_json::Value;

/// Reply from a text generation backend, tagged by shape
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    /// Reply carried a direct text field
    Text(String),
    /// Reply carried content fragments; entries without text are `None`
    Fragments(Vec<Option<String>>),
    /// Reply had no recognizable text
    Opaque(Value),
}

impl BackendReply {
    /// Classify a `generateContent` response body
    ///
    /// A top-level `text` string wins. Otherwise the parts of the first
    /// candidate become fragments, provided at least one of them carries
    /// non-empty text. Anything else is kept opaque.
    pub fn from_generate_content(body: Value) -> Self {
        if let Some(text) = body.get("text").and_then(Value::as_str) {
            return Self::Text(text.to_string());
        }

        let parts = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array);

        if let Some(parts) = parts {
            let fragments: Vec<Option<String>> = parts
                .iter()
                .map(|part| part.get("text").and_then(Value::as_str).map(str::to_string))
                .collect();

            if fragments
                .iter()
                .any(|f| f.as_deref().is_some_and(|t| !t.is_empty()))
            {
                return Self::Fragments(fragments);
            }
        }

        Self::Opaque(body)
    }

    /// Flatten the reply into plain text
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Fragments(fragments) => fragments
                .into_iter()
                .flatten()
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Opaque(value) => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_text_wins() {
        let reply = BackendReply::from_generate_content(json!({
            "text": "direct",
            "candidates": [{"content": {"parts": [{"text": "fragment"}]}}]
        }));
        assert_eq!(reply, BackendReply::Text("direct".to_string()));
        assert_eq!(reply.into_text(), "direct");
    }

    #[test]
    fn test_fragments_joined_with_single_space() {
        let reply = BackendReply::from_generate_content(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "Hello"},
                {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                {"text": ""},
                {"text": "world"}
            ]}}]
        }));
        assert!(matches!(reply, BackendReply::Fragments(_)));
        assert_eq!(reply.into_text(), "Hello world");
    }

    #[test]
    fn test_only_first_candidate_used() {
        let reply = BackendReply::from_generate_content(json!({
            "candidates": [
                {"content": {"parts": [{"text": "first"}]}},
                {"content": {"parts": [{"text": "second"}]}}
            ]
        }));
        assert_eq!(reply.into_text(), "first");
    }

    #[test]
    fn test_empty_fragments_fall_back_to_rendering() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}, "finishReason": "SAFETY"}]
        });
        let reply = BackendReply::from_generate_content(body.clone());
        assert_eq!(reply, BackendReply::Opaque(body.clone()));
        assert_eq!(reply.into_text(), body.to_string());
    }

    #[test]
    fn test_unrecognized_shape_is_opaque() {
        let body = json!({"promptFeedback": {"blockReason": "OTHER"}});
        let reply = BackendReply::from_generate_content(body.clone());
        assert!(matches!(reply, BackendReply::Opaque(_)));
        assert!(reply.into_text().contains("blockReason"));
    }
}
