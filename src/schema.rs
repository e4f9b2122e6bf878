//! JSON schemas sent with JSON-mode gateway requests.
//!
//! Schema-level strictness lives here, at the LLM call boundary; the
//! validation step only re-checks the top-level shape (see
//! `workflow::steps::validate_rules`).

use crate::config::PriorityLevel;
use serde_json::{json, Value};

fn priority_labels() -> Vec<&'static str> {
    PriorityLevel::ALL.iter().map(|level| level.label()).collect()
}

/// Schema for the analysis report: flagged issues plus per-level
/// optimization suggestions.
pub fn analysis_report_schema() -> Value {
    let labels = priority_labels();
    json!({
        "type": "object",
        "properties": {
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "issue": {"type": "string"},
                        "priority_levels": {
                            "type": "array",
                            "items": {"type": "string", "enum": labels},
                        },
                        "severity": {"type": "string", "enum": ["Critical", "Warning"]},
                        "impact": {"type": "string"},
                    },
                    "required": ["issue", "priority_levels", "severity", "impact"],
                    "additionalProperties": false,
                },
            },
            "optimizations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "priority_level": {"type": "string", "enum": labels},
                        "original_text": {"type": "string"},
                        "suggested_text": {"type": "string"},
                        "rationale": {"type": "string"},
                    },
                    "required": [
                        "priority_level",
                        "original_text",
                        "suggested_text",
                        "rationale",
                    ],
                    "additionalProperties": false,
                },
            },
        },
        "required": ["issues", "optimizations"],
        "additionalProperties": false,
    })
}

/// Schema for the parsed rules: a relevance block plus a priorities block
/// keyed by the fixed non-Relevance level names.
pub fn parsed_rules_schema() -> Value {
    let rule = json!({
        "type": "object",
        "properties": {
            "rule_id": {"type": "string"},
            "rule_text": {"type": "string"},
            "processing_type": {
                "type": "string",
                "enum": ["keyword_filtering", "context_filtering", "hybrid_filtering", "none"],
            },
            "reasoning": {"type": "string"},
            "include_logic": logic_block_schema(),
            "exclude_logic": logic_block_schema(),
        },
        "required": ["rule_id", "rule_text", "processing_type", "reasoning", "include_logic"],
    });
    let rule_list = json!({
        "type": "object",
        "properties": {"rules": {"type": "array", "items": rule}},
        "required": ["rules"],
    });

    let mut priorities = serde_json::Map::new();
    let mut required = Vec::new();
    for level in PriorityLevel::ALL {
        if level == PriorityLevel::Relevance {
            continue;
        }
        priorities.insert(level.label().to_string(), rule_list.clone());
        required.push(level.label());
    }

    json!({
        "type": "object",
        "properties": {
            "relevance": rule_list,
            "priorities": {
                "type": "object",
                "properties": Value::Object(priorities),
                "required": required,
            },
        },
        "required": ["relevance", "priorities"],
    })
}

fn logic_block_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "all_of": {"type": "array", "items": condition_schema()},
            "any_of": {"type": "array", "items": condition_schema()},
        },
    })
}

fn condition_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "string",
                "enum": ["concepts", "keywords", "contextual-keywords", "columns"],
            },
            "values": {"type": "array", "items": {"type": "string"}},
        },
        "required": ["entities", "values"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_schema_names_every_priority() {
        let schema = analysis_report_schema();
        let levels = &schema["properties"]["optimizations"]["items"]["properties"]
            ["priority_level"]["enum"];
        assert_eq!(levels.as_array().unwrap().len(), 7);
    }

    #[test]
    fn parsed_schema_keys_priorities_by_level_name() {
        let schema = parsed_rules_schema();
        let priorities = schema["properties"]["priorities"]["properties"]
            .as_object()
            .unwrap();
        assert_eq!(priorities.len(), 6);
        assert!(priorities.contains_key("Very High"));
        assert!(!priorities.contains_key("Relevance"));
    }
}
