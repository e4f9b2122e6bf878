//! Domain constants shared across the workflow.
//!
//! Centralizing priority levels, file names, and iteration ceilings keeps the
//! steps and routers free of magic values and makes the validation rules easy
//! to audit in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ceiling for the parse -> validate retry loop.
pub const MAX_PARSE_ITERATIONS: u32 = 3;

/// Ceiling for the analyze -> review -> reject loop.
pub const MAX_ANALYSIS_ITERATIONS: u32 = 3;

/// Mandatory rules file inside the session directory.
pub const RULES_FILE: &str = "rules.csv";

/// Optional client keywords file.
pub const KEYWORDS_FILE: &str = "client_keywords.csv";

/// Optional custom synonyms file.
pub const SYNONYMS_FILE: &str = "custom_synonyms.csv";

/// Folder for parsed-rules output, relative to the session directory.
pub const OUTPUT_DIR: &str = "output";

/// Folder for analysis reports, relative to the session directory.
pub const REPORTS_DIR: &str = "analysis_reports";

/// Folder for workflow checkpoints, relative to the session directory.
pub const SESSIONS_DIR: &str = "sessions";

/// Gateway endpoint environment variable.
pub const LLM_ENDPOINT_ENV: &str = "RULEFLOW_LLM_ENDPOINT";

/// Gateway API key environment variable.
pub const LLM_API_KEY_ENV: &str = "RULEFLOW_LLM_API_KEY";

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Mandatory headers for `rules.csv` (matched case-insensitively).
pub const RULES_HEADERS: &[&str] = &["priority", "rule"];

/// Mandatory headers for `client_keywords.csv`.
pub const KEYWORDS_HEADERS: &[&str] = &["keyword"];

/// Extra headers tolerated in `client_keywords.csv`.
pub const KEYWORDS_OPTIONAL_HEADERS: &[&str] = &["label", "category", "priority"];

/// Mandatory headers for `custom_synonyms.csv`.
pub const SYNONYMS_HEADERS: &[&str] = &["id", "term", "root", "synonym"];

/// The recognized priority tiers, in their canonical display order.
///
/// `Relevance` is not a priority in the business sense: it gates whether
/// content is considered at all, and the rules file must carry exactly one
/// such row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityLevel {
    Relevance,
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Internal,
    Medium,
    Low,
    #[serde(rename = "Not Relevant")]
    NotRelevant,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 7] = [
        PriorityLevel::Relevance,
        PriorityLevel::VeryHigh,
        PriorityLevel::High,
        PriorityLevel::Internal,
        PriorityLevel::Medium,
        PriorityLevel::Low,
        PriorityLevel::NotRelevant,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PriorityLevel::Relevance => "Relevance",
            PriorityLevel::VeryHigh => "Very High",
            PriorityLevel::High => "High",
            PriorityLevel::Internal => "Internal",
            PriorityLevel::Medium => "Medium",
            PriorityLevel::Low => "Low",
            PriorityLevel::NotRelevant => "Not Relevant",
        }
    }

    /// Match a raw cell value against the recognized levels.
    ///
    /// Values may carry trailing annotations ("High Priority (comments)"), so
    /// matching is a case-insensitive prefix check. Longer labels are tried
    /// first so "Very High" is never claimed by "High".
    pub fn match_prefix(value: &str) -> Option<PriorityLevel> {
        let lowered = value.trim().to_lowercase();
        let mut by_length: Vec<PriorityLevel> = Self::ALL.to_vec();
        by_length.sort_by_key(|level| std::cmp::Reverse(level.label().len()));
        by_length
            .into_iter()
            .find(|level| lowered.starts_with(&level.label().to_lowercase()))
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_prefix_prefers_longer_label() {
        assert_eq!(
            PriorityLevel::match_prefix("Very High"),
            Some(PriorityLevel::VeryHigh)
        );
        assert_eq!(PriorityLevel::match_prefix("High"), Some(PriorityLevel::High));
        assert_eq!(
            PriorityLevel::match_prefix("Not Relevant (archive)"),
            Some(PriorityLevel::NotRelevant)
        );
    }

    #[test]
    fn match_prefix_tolerates_suffix_and_case() {
        assert_eq!(
            PriorityLevel::match_prefix("high Priority (comments)"),
            Some(PriorityLevel::High)
        );
        assert_eq!(PriorityLevel::match_prefix("Unknown"), None);
        assert_eq!(PriorityLevel::match_prefix(""), None);
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&PriorityLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"Very High\"");
        let parsed: PriorityLevel = serde_json::from_str("\"Not Relevant\"").unwrap();
        assert_eq!(parsed, PriorityLevel::NotRelevant);
    }
}
