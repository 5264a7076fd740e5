//! Message routing for chatrelay
//!
//! Classifies each incoming message and dispatches it to the knowledge base,
//! the image pipeline or the text responder, then assembles the response and
//! the history entry to persist.

pub mod intent;
pub mod message;

pub use intent::{CURRENT_MESSAGE_MARKER, extract_current_message, is_image_request};
pub use message::MessageRouter;

use crate::knowledge::SupportInfo;
use serde::{Deserialize, Serialize};

/// Bot message stored for image turns in place of the response text
pub const IMAGE_HISTORY_MARKER: &str = "image";
/// Display-text prefix of a hosted image URL
pub const IMAGE_URL_TAG: &str = "!IMAGEURL!";
/// Display-text prefix of an inline image data URL
pub const IMAGE_DATA_TAG: &str = "!IMAGEDATA!";
/// Display text of a successful image response
pub const IMAGE_SUCCESS_TEXT: &str = "Generated image";
/// Display text when no image could be generated
pub const IMAGE_FAILURE_TEXT: &str =
    "I'm sorry, I couldn't generate that image right now. Please try again later.";

/// One stored exchange of a session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub user_message: String,
    /// Absent when the exchange produced no reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_message: Option<String>,
}

impl HistoryEntry {
    pub fn new(user_message: impl Into<String>, bot_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            bot_message,
        }
    }
}

/// Origin tag of a text response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    QaSystem,
}

/// Externally visible response, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouterResponse {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<ResponseSource>,
    },
    Image {
        text: String,
        url: Option<String>,
        base64: Option<String>,
    },
    SupportContact {
        text: String,
        support_info: SupportInfo,
        show_representative_button: bool,
    },
}

impl RouterResponse {
    /// Display text of the response
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text, .. } | Self::Image { text, .. } | Self::SupportContact { text, .. } => {
                text
            }
        }
    }
}

/// Result of processing one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterOutcome {
    pub response: RouterResponse,
    /// The current exchange only; accumulation belongs to the session store
    pub history_entry: HistoryEntry,
}
