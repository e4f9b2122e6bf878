//! Input CSV loading and validation.
//!
//! The rules file is the contract with the client: headers are checked as an
//! exact (case-insensitive) set and each recognized priority level may appear
//! at most once, with `Relevance` required exactly once. Validation collects
//! every violation into an ordered, human-readable list so the caller sees
//! the whole problem at once instead of fixing rows one by one.

use crate::config::{
    self, PriorityLevel, KEYWORDS_HEADERS, KEYWORDS_OPTIONAL_HEADERS, RULES_HEADERS,
    SYNONYMS_HEADERS,
};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Which input file a blob of CSV content claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Rules,
    Keywords,
    Synonyms,
}

impl InputKind {
    pub fn file_name(self) -> &'static str {
        match self {
            InputKind::Rules => config::RULES_FILE,
            InputKind::Keywords => config::KEYWORDS_FILE,
            InputKind::Synonyms => config::SYNONYMS_FILE,
        }
    }

    fn mandatory_headers(self) -> &'static [&'static str] {
        match self {
            InputKind::Rules => RULES_HEADERS,
            InputKind::Keywords => KEYWORDS_HEADERS,
            InputKind::Synonyms => SYNONYMS_HEADERS,
        }
    }

    fn optional_headers(self) -> &'static [&'static str] {
        match self {
            InputKind::Keywords => KEYWORDS_OPTIONAL_HEADERS,
            InputKind::Rules | InputKind::Synonyms => &[],
        }
    }
}

/// Read and validate a mandatory input file.
pub fn load_required(directory: &Path, kind: InputKind) -> Result<String> {
    let path = directory.join(kind.file_name());
    if !path.is_file() {
        return Err(anyhow!("required file {} is missing", path.display()));
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    check_valid(&content, kind, &path)?;
    Ok(content)
}

/// Read and validate an optional input file; absent files are `None`.
pub fn load_optional(directory: &Path, kind: InputKind) -> Result<Option<String>> {
    let path = directory.join(kind.file_name());
    if !path.is_file() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    check_valid(&content, kind, &path)?;
    Ok(Some(content))
}

fn check_valid(content: &str, kind: InputKind, path: &Path) -> Result<()> {
    let errors = validate_csv_content(content, kind);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!(
        "validation failed for {}: {}",
        path.display(),
        errors.join("; ")
    ))
}

/// Validate CSV content for the given input kind.
///
/// Returns an ordered list of violations; empty means valid. Row checks only
/// run for the rules file, and only once its headers are correct.
pub fn validate_csv_content(content: &str, kind: InputKind) -> Vec<String> {
    // Tolerate a UTF-8 BOM from spreadsheet exports.
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return vec![format!("file {} is empty", kind.file_name())];
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.trim().to_lowercase()).collect(),
        Err(err) => return vec![format!("CSV parsing error: {err}")],
    };

    if let Some(error) = header_error(&headers, kind) {
        return vec![error];
    }

    if kind != InputKind::Rules {
        return Vec::new();
    }

    validate_rules_rows(&mut reader, &headers)
}

fn header_error(found: &[String], kind: InputKind) -> Option<String> {
    let mandatory = kind.mandatory_headers();
    let optional = kind.optional_headers();

    let missing: Vec<&str> = mandatory
        .iter()
        .filter(|h| !found.iter().any(|f| f == *h))
        .copied()
        .collect();
    let extra: Vec<&String> = found
        .iter()
        .filter(|f| !mandatory.contains(&f.as_str()) && !optional.contains(&f.as_str()))
        .collect();

    if missing.is_empty() && extra.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing headers: {missing:?}"));
    }
    if !extra.is_empty() {
        parts.push(format!("unexpected headers: {extra:?}"));
    }
    Some(format!(
        "invalid headers in '{}': {}",
        kind.file_name(),
        parts.join("; ")
    ))
}

fn validate_rules_rows<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    headers: &[String],
) -> Vec<String> {
    let mut errors = Vec::new();

    // Header validation already guarantees both columns exist.
    let priority_col = headers.iter().position(|h| h == "priority");
    let rule_col = headers.iter().position(|h| h == "rule");
    let (Some(priority_col), Some(rule_col)) = (priority_col, rule_col) else {
        return vec!["invalid headers in 'rules.csv': missing priority/rule columns".into()];
    };

    let mut counts: BTreeMap<PriorityLevel, usize> = BTreeMap::new();

    for (index, record) in reader.records().enumerate() {
        let line_number = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                errors.push(format!("row {line_number}: CSV parsing error: {err}"));
                continue;
            }
        };

        let priority_value = record.get(priority_col).unwrap_or("").trim();
        let rule_value = record.get(rule_col).unwrap_or("").trim();

        if priority_value.is_empty() {
            errors.push(format!("row {line_number}: missing value for 'priority'"));
        } else {
            match PriorityLevel::match_prefix(priority_value) {
                Some(level) => *counts.entry(level).or_insert(0) += 1,
                None => errors.push(format!(
                    "row {line_number}: invalid priority {priority_value:?}; must start with one of: {}",
                    PriorityLevel::ALL.map(PriorityLevel::label).join(", ")
                )),
            }
        }

        if rule_value.is_empty() {
            errors.push(format!("row {line_number}: missing or empty value for 'rule'"));
        }
    }

    for (level, count) in &counts {
        if *count > 1 {
            errors.push(format!(
                "priority '{level}' appears {count} times; each priority may appear at most once"
            ));
        }
    }

    if counts.get(&PriorityLevel::Relevance).copied().unwrap_or(0) != 1 {
        errors.push(
            "a 'Relevance' row is required and must appear exactly once".to_string(),
        );
    }

    let non_relevance: usize = counts
        .iter()
        .filter(|(level, _)| **level != PriorityLevel::Relevance)
        .map(|(_, count)| count)
        .sum();
    if non_relevance == 0 {
        errors.push("at least one non-Relevance priority row is required".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RULES: &str = "priority,rule\n\
        Relevance,\"mentions of renal trials\"\n\
        High,\"competitor product launches\"\n";

    #[test]
    fn valid_rules_file_passes() {
        assert!(validate_csv_content(VALID_RULES, InputKind::Rules).is_empty());
    }

    #[test]
    fn bom_and_header_case_are_tolerated() {
        let content = "\u{feff}Priority,Rule\nRelevance,a\nLow,b\n";
        assert!(validate_csv_content(content, InputKind::Rules).is_empty());
    }

    #[test]
    fn duplicate_priority_is_reported_with_count() {
        let content = "priority,rule\nRelevance,a\nHigh,b\nHigh,c\n";
        let errors = validate_csv_content(content, InputKind::Rules);
        assert!(
            errors.iter().any(|e| e.contains("'High' appears 2 times")),
            "errors: {errors:?}"
        );
    }

    #[test]
    fn missing_relevance_is_reported() {
        let content = "priority,rule\nHigh,b\nLow,c\n";
        let errors = validate_csv_content(content, InputKind::Rules);
        assert!(
            errors
                .iter()
                .any(|e| e.contains("required and must appear exactly once")),
            "errors: {errors:?}"
        );
    }

    #[test]
    fn relevance_alone_is_not_enough() {
        let content = "priority,rule\nRelevance,a\n";
        let errors = validate_csv_content(content, InputKind::Rules);
        assert!(
            errors
                .iter()
                .any(|e| e.contains("at least one non-Relevance")),
            "errors: {errors:?}"
        );
    }

    #[test]
    fn priority_suffixes_still_match() {
        let content = "priority,rule\nRelevance,a\nHigh Priority (comments),b\n";
        assert!(validate_csv_content(content, InputKind::Rules).is_empty());
    }

    #[test]
    fn unknown_priority_and_empty_rule_are_reported_by_row() {
        let content = "priority,rule\nRelevance,a\nUrgent,b\nHigh,\n";
        let errors = validate_csv_content(content, InputKind::Rules);
        assert!(errors.iter().any(|e| e.starts_with("row 3: invalid priority")));
        assert!(errors
            .iter()
            .any(|e| e.starts_with("row 4: missing or empty value for 'rule'")));
    }

    #[test]
    fn header_mismatch_is_one_error() {
        let content = "prio,rule\nRelevance,a\n";
        let errors = validate_csv_content(content, InputKind::Rules);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("invalid headers"));
    }

    #[test]
    fn keywords_optional_columns_are_allowed() {
        let content = "keyword,label,category\nnephritis,clinical,disease\n";
        assert!(validate_csv_content(content, InputKind::Keywords).is_empty());

        let content = "keyword,weight\nnephritis,3\n";
        let errors = validate_csv_content(content, InputKind::Keywords);
        assert!(errors[0].contains("unexpected headers"));
    }

    #[test]
    fn synonyms_headers_are_exact() {
        let content = "id,term,root,synonym\n1,kidney,kidney,renal\n";
        assert!(validate_csv_content(content, InputKind::Synonyms).is_empty());
    }

    #[test]
    fn empty_content_is_reported() {
        let errors = validate_csv_content("  \n ", InputKind::Rules);
        assert_eq!(errors, vec!["file rules.csv is empty".to_string()]);
    }

    #[test]
    fn load_required_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_required(dir.path(), InputKind::Rules).unwrap_err();
        assert!(err.to_string().contains("is missing"));
    }

    #[test]
    fn load_round_trips_file_content_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(config::RULES_FILE), VALID_RULES).unwrap();
        let loaded = load_required(dir.path(), InputKind::Rules).unwrap();
        assert_eq!(loaded, VALID_RULES);
        assert_eq!(load_optional(dir.path(), InputKind::Synonyms).unwrap(), None);
    }
}
