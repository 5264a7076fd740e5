//! Knowledge base loading
//!
//! The table is read once at startup from a local file or an HTTP(S) URL.
//! `.json` sources hold an array of `{"Question", "Answer"}` records; any
//! other source is read as an `.xlsx` workbook whose first sheet has
//! `Question` and `Answer` header cells. A failed load is logged and yields an
//! empty knowledge base.

use crate::config::KnowledgeBaseConfig;
use crate::knowledge::{KnowledgeBase, KnowledgeEntry, SupportInfo};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

const QUESTION_COLUMN: &str = "Question";
const ANSWER_COLUMN: &str = "Answer";

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("Failed to fetch knowledge base from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to read knowledge base file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid knowledge base spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Invalid knowledge base JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Knowledge base is missing the '{0}' column")]
    MissingColumn(&'static str),
}

/// Load the knowledge base described by `config`
///
/// Never fails; load errors produce an empty table.
pub async fn load(config: &KnowledgeBaseConfig) -> KnowledgeBase {
    let support = SupportInfo::new(&config.support_phone, &config.support_email);

    match try_load(config).await {
        Ok(entries) => {
            tracing::info!(
                source = %config.source,
                entries = entries.len(),
                "Knowledge base loaded"
            );
            KnowledgeBase::new(entries, support)
        }
        Err(e) => {
            tracing::error!(
                source = %config.source,
                error = %e,
                "Failed to load knowledge base, continuing with an empty table"
            );
            KnowledgeBase::empty(support)
        }
    }
}

/// Load and parse the configured source, surfacing any error
pub async fn try_load(
    config: &KnowledgeBaseConfig,
) -> Result<Vec<KnowledgeEntry>, KnowledgeBaseError> {
    let bytes = if config.is_remote() {
        fetch(&config.source, Duration::from_secs(config.fetch_timeout_seconds)).await?
    } else {
        tokio::fs::read(&config.source)
            .await
            .map_err(|source| KnowledgeBaseError::Read {
                path: config.source.clone(),
                source,
            })?
    };

    if is_json_source(&config.source) {
        parse_json(&bytes)
    } else {
        parse_xlsx(bytes)
    }
}

fn is_json_source(source: &str) -> bool {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    path.to_ascii_lowercase().ends_with(".json")
}

async fn fetch(url: &str, timeout: Duration) -> Result<Vec<u8>, KnowledgeBaseError> {
    let fetch_error = |reason: String| KnowledgeBaseError::Fetch {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Parse a JSON array of question/answer records
pub fn parse_json(bytes: &[u8]) -> Result<Vec<KnowledgeEntry>, KnowledgeBaseError> {
    let entries: Vec<KnowledgeEntry> = serde_json::from_slice(bytes)?;
    Ok(entries
        .into_iter()
        .filter(|e| !e.question.trim().is_empty())
        .collect())
}

/// Parse the first sheet of an `.xlsx` workbook
///
/// Rows with an empty question cell are skipped.
pub fn parse_xlsx(bytes: Vec<u8>) -> Result<Vec<KnowledgeEntry>, KnowledgeBaseError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| KnowledgeBaseError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| KnowledgeBaseError::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| KnowledgeBaseError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or(KnowledgeBaseError::MissingColumn(QUESTION_COLUMN))?;
    let column = |name: &'static str| {
        header
            .iter()
            .position(|cell| cell_text(cell).trim() == name)
            .ok_or(KnowledgeBaseError::MissingColumn(name))
    };
    let question_col = column(QUESTION_COLUMN)?;
    let answer_col = column(ANSWER_COLUMN)?;

    let entries = rows
        .filter_map(|row| {
            let question = row.get(question_col).map(cell_text).unwrap_or_default();
            if question.trim().is_empty() {
                return None;
            }
            let answer = row.get(answer_col).map(cell_text).unwrap_or_default();
            Some(KnowledgeEntry::new(question, answer))
        })
        .collect();

    Ok(entries)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_source_detection() {
        assert!(is_json_source("data/questions_and_answers.json"));
        assert!(is_json_source("https://host/kb.JSON?version=2"));
        assert!(!is_json_source("https://host/questions_and_answers.xlsx"));
    }

    #[test]
    fn test_parse_json_skips_blank_questions() {
        let bytes = br#"[
            {"Question": "How do I track my order?", "Answer": "Tracking link."},
            {"Question": "   ", "Answer": "orphan"}
        ]"#;
        let entries = parse_json(bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].answer, "Tracking link.");
    }

    #[test]
    fn test_parse_json_rejects_wrong_shape() {
        let result = parse_json(br#"{"Question": "not an array"}"#);
        assert!(matches!(result, Err(KnowledgeBaseError::Json(_))));
    }

    #[test]
    fn test_parse_xlsx_rejects_non_workbook() {
        let result = parse_xlsx(b"plain text".to_vec());
        assert!(matches!(result, Err(KnowledgeBaseError::Spreadsheet(_))));
    }
}
