//! Message intent detection
//!
//! Some callers send a composed prompt with the prior context inline and the
//! user's literal utterance after a marker line. Intent checks work on that
//! trailing segment only.

use regex::Regex;
use std::sync::LazyLock;

/// Marker line preceding the user's literal message in a composed prompt
pub const CURRENT_MESSAGE_MARKER: &str = "=== CURRENT USER MESSAGE ===";

static IMAGE_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\.image|image:)").expect("image trigger pattern is valid")
});

/// Text after the last marker occurrence, or the whole input, trimmed
pub fn extract_current_message(full_prompt: &str) -> &str {
    match full_prompt.rsplit_once(CURRENT_MESSAGE_MARKER) {
        Some((_, current)) => current.trim(),
        None => full_prompt.trim(),
    }
}

/// True when `message` contains `.image` or `image:` in any case
pub fn is_image_request(message: &str) -> bool {
    IMAGE_TRIGGER.is_match(message)
}

/// Remove every image trigger from `prompt` and trim the remainder
pub fn strip_image_triggers(prompt: &str) -> String {
    IMAGE_TRIGGER.replace_all(prompt, "").trim().to_string()
}
