//! Top-level message router

use crate::knowledge::{Classification, KnowledgeBase};
use crate::metrics::{Metrics, RouteKind};
use crate::responders::{ImageOutcome, ImagePipeline, TextResponder};
use crate::router::intent::{extract_current_message, is_image_request};
use crate::router::{
    HistoryEntry, IMAGE_DATA_TAG, IMAGE_FAILURE_TEXT, IMAGE_HISTORY_MARKER, IMAGE_SUCCESS_TEXT,
    IMAGE_URL_TAG, ResponseSource, RouterOutcome, RouterResponse,
};
use std::sync::Arc;
use std::time::Instant;

/// Routes messages between the knowledge base and the generative responders
///
/// Holds no per-conversation state; the caller supplies the history.
pub struct MessageRouter {
    knowledge: Arc<KnowledgeBase>,
    images: Arc<ImagePipeline>,
    text: Arc<TextResponder>,
    metrics: Arc<Metrics>,
}

impl MessageRouter {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        images: Arc<ImagePipeline>,
        text: Arc<TextResponder>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            knowledge,
            images,
            text,
            metrics,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Process one message
    ///
    /// FAQ matching, intent detection and the stored history entry all use
    /// the current message extracted from `message`; text generation gets
    /// the full raw `message` so any inline context reaches the model.
    pub async fn process(&self, message: &str, history: &[HistoryEntry]) -> RouterOutcome {
        let start = Instant::now();
        let current = extract_current_message(message);

        let (route, outcome) = match self.knowledge.classify(current) {
            Classification::Answer { answer, score } => {
                tracing::info!(score = score, "Answering from knowledge base");
                (
                    RouteKind::KnowledgeBase,
                    RouterOutcome {
                        response: RouterResponse::Text {
                            text: answer.clone(),
                            source: Some(ResponseSource::QaSystem),
                        },
                        history_entry: HistoryEntry::new(current, Some(answer)),
                    },
                )
            }
            Classification::Escalate {
                message: support_message,
                support,
                score,
            } => {
                tracing::info!(score = score, "Weak knowledge base match, offering support");
                (
                    RouteKind::SupportContact,
                    RouterOutcome {
                        response: RouterResponse::SupportContact {
                            text: support_message.clone(),
                            support_info: support,
                            show_representative_button: true,
                        },
                        history_entry: HistoryEntry::new(current, Some(support_message)),
                    },
                )
            }
            Classification::NoMatch { score } if is_image_request(current) => {
                tracing::info!(score = score, "Processing image generation request");
                let image = self.images.generate(current).await;
                (
                    RouteKind::Image,
                    RouterOutcome {
                        response: image_response(image),
                        history_entry: HistoryEntry::new(
                            current,
                            Some(IMAGE_HISTORY_MARKER.to_string()),
                        ),
                    },
                )
            }
            Classification::NoMatch { score } => {
                tracing::info!(score = score, "Processing text request");
                let reply = self.text.generate(message, history).await;
                (
                    RouteKind::Text,
                    RouterOutcome {
                        response: RouterResponse::Text {
                            text: reply.clone(),
                            source: None,
                        },
                        history_entry: HistoryEntry::new(current, Some(reply)),
                    },
                )
            }
        };

        self.metrics.record_message(route);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if let Err(e) = self.metrics.record_processing_duration(elapsed_ms) {
            tracing::error!(
                error = %e,
                "Metrics recording failed. Observability degraded but request continues."
            );
        }

        tracing::debug!(
            route = route.as_str(),
            elapsed_ms = elapsed_ms,
            "Message processed"
        );

        outcome
    }
}

/// Build the image response, tagging the display text with the reference
pub fn image_response(image: ImageOutcome) -> RouterResponse {
    let text = match (&image.url, &image.inline_data) {
        (Some(url), _) => format!("{}\n{}{}", IMAGE_SUCCESS_TEXT, IMAGE_URL_TAG, url),
        (None, Some(data)) => format!("{}\n{}{}", IMAGE_SUCCESS_TEXT, IMAGE_DATA_TAG, data),
        (None, None) => IMAGE_FAILURE_TEXT.to_string(),
    };

    RouterResponse::Image {
        text,
        url: image.url,
        base64: image.inline_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_image_text_carries_url_tag() {
        let response = image_response(ImageOutcome::hosted("https://b/x.jpg".to_string()));
        assert_eq!(response.text(), "Generated image\n!IMAGEURL!https://b/x.jpg");
        assert!(matches!(
            response,
            RouterResponse::Image { url: Some(_), base64: None, .. }
        ));
    }

    #[test]
    fn test_inline_image_text_carries_data_tag() {
        let data = "data:image/jpeg;base64,AAAA".to_string();
        let response = image_response(ImageOutcome::inline(data.clone()));
        assert_eq!(response.text(), format!("Generated image\n!IMAGEDATA!{}", data));
    }

    #[test]
    fn test_failed_image_is_apology_without_tags() {
        let response = image_response(ImageOutcome::failed());
        assert_eq!(response.text(), IMAGE_FAILURE_TEXT);
        assert!(!response.text().contains('!'));
        assert!(matches!(
            response,
            RouterResponse::Image { url: None, base64: None, .. }
        ));
    }
}
