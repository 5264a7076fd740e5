//! Knowledge base matching
//!
//! A flat table of question/answer pairs scored against each query with a
//! token-order-insensitive fuzzy ratio. The best score is sorted into three
//! confidence tiers: answer directly, escalate to support, or no match.

pub mod fuzzy;
pub mod loader;

use serde::{Deserialize, Serialize};

pub use loader::{KnowledgeBaseError, load};

/// Scores at or above this return the stored answer
pub const GOOD_MATCH_THRESHOLD: u8 = 85;
/// Scores at or above this (and below `GOOD_MATCH_THRESHOLD`) escalate to support
pub const POOR_MATCH_THRESHOLD: u8 = 40;

/// One question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KnowledgeEntry {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Best match for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub answer: Option<String>,
    pub score: u8,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            answer: None,
            score: 0,
        }
    }
}

/// Confidence tier of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    High,
    Escalate,
    NoMatch,
}

impl MatchTier {
    pub fn from_score(score: u8) -> Self {
        if score >= GOOD_MATCH_THRESHOLD {
            Self::High
        } else if score >= POOR_MATCH_THRESHOLD {
            Self::Escalate
        } else {
            Self::NoMatch
        }
    }
}

/// Support contact channels offered on escalation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SupportInfo {
    pub phone: String,
    pub email: String,
}

impl SupportInfo {
    pub fn new(phone: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            email: email.into(),
        }
    }
}

/// Outcome of classifying a query against the knowledge base
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// High confidence; the stored answer verbatim
    Answer { answer: String, score: u8 },
    /// Low confidence; point the user at support
    Escalate {
        message: String,
        support: SupportInfo,
        score: u8,
    },
    /// Nothing close enough; fall through to the generative responders
    NoMatch { score: u8 },
}

/// Read-only question/answer table
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
    support: SupportInfo,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<KnowledgeEntry>, support: SupportInfo) -> Self {
        Self { entries, support }
    }

    /// Knowledge base with no entries; every query is a no-match
    pub fn empty(support: SupportInfo) -> Self {
        Self::new(Vec::new(), support)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn support(&self) -> &SupportInfo {
        &self.support
    }

    /// Highest-scoring entry for `query`; ties go to the earliest entry
    ///
    /// Entries whose length alone caps their score at or below the current
    /// best are not compared, which keeps very long queries linear in the
    /// table size.
    pub fn find_best_match(&self, query: &str) -> MatchResult {
        let query = fuzzy::SortedTokens::new(query);
        let mut best: Option<(&KnowledgeEntry, u8)> = None;

        for entry in &self.entries {
            let question = fuzzy::SortedTokens::new(&entry.question);
            let bound = fuzzy::ratio_upper_bound(query.len(), question.len());
            if best.is_some_and(|(_, s)| bound <= s) {
                continue;
            }
            let score = if bound == 0 {
                0
            } else {
                fuzzy::ratio(&query, &question)
            };
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((entry, score));
            }
        }

        match best {
            Some((entry, score)) => MatchResult {
                answer: Some(entry.answer.clone()),
                score,
            },
            None => MatchResult::none(),
        }
    }

    /// Apply the three-tier policy to the best match for `query`
    pub fn classify(&self, query: &str) -> Classification {
        let result = self.find_best_match(query);
        let tier = MatchTier::from_score(result.score);

        tracing::debug!(score = result.score, tier = ?tier, "Knowledge base match scored");

        match (tier, result.answer) {
            (MatchTier::High, Some(answer)) => Classification::Answer {
                answer,
                score: result.score,
            },
            (MatchTier::Escalate, Some(_)) => Classification::Escalate {
                message: self.support_message(),
                support: self.support.clone(),
                score: result.score,
            },
            _ => Classification::NoMatch {
                score: result.score,
            },
        }
    }

    /// Message shown when a match is too weak to answer directly
    pub fn support_message(&self) -> String {
        format!(
            "I'm not quite sure about that. You can contact our support team at {} or email {}. \
             Would you like to speak with a representative?",
            self.support.phone, self.support.email
        )
    }
}
