//! Model response cleanup and parsing.
//!
//! Responses arrive as free text: usually a JSON object, sometimes wrapped in
//! markdown fences, and occasionally a Python-literal rendition (single
//! quotes, `True`/`False`/`None`) from providers that ignore the requested
//! format. Everything funnels through one strict `serde_json` parse; the
//! Python dialect is handled by a normalization pass before that parse, never
//! by a second parser, and a warning is logged when it fires so format drift
//! stays visible.

use anyhow::{anyhow, Result};
use serde_json::Value;

/// Extract the JSON payload from text that may carry markdown code fences.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        // Skip a language identifier if present
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    text
}

/// Parse a model response into a JSON value.
///
/// Strips fences, tries strict JSON, then retries once after Python-literal
/// normalization. The original parse error is reported when both fail.
pub fn parse_llm_json(text: &str) -> Result<Value> {
    let json_text = extract_json(text);
    match serde_json::from_str(json_text) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let normalized = normalize_python_literal(json_text);
            match serde_json::from_str(&normalized) {
                Ok(value) => {
                    tracing::warn!(
                        "response parsed only after Python-literal normalization; \
                         the model is not honoring the requested JSON format"
                    );
                    Ok(value)
                }
                Err(_) => Err(anyhow!(
                    "parse LLM response as JSON: {first_error}; response starts with: {}",
                    preview(text, 200)
                )),
            }
        }
    }
}

/// Rewrite a Python-literal structure as JSON.
///
/// String literals (single- or double-quoted) are decoded and re-emitted as
/// JSON strings; bare `True`/`False`/`None` become `true`/`false`/`null`.
/// Everything else passes through untouched.
fn normalize_python_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let mut body = String::new();
                while let Some(inner) = chars.next() {
                    if inner == c {
                        break;
                    }
                    if inner != '\\' {
                        body.push(inner);
                        continue;
                    }
                    match chars.next() {
                        Some('n') => body.push('\n'),
                        Some('t') => body.push('\t'),
                        Some('r') => body.push('\r'),
                        Some('\'') => body.push('\''),
                        Some('"') => body.push('"'),
                        Some('\\') => body.push('\\'),
                        Some('u') => {
                            let digits: String = chars.by_ref().take(4).collect();
                            match u32::from_str_radix(&digits, 16)
                                .ok()
                                .and_then(char::from_u32)
                            {
                                Some(decoded) => body.push(decoded),
                                None => {
                                    body.push_str("\\u");
                                    body.push_str(&digits);
                                }
                            }
                        }
                        Some(other) => {
                            body.push('\\');
                            body.push(other);
                        }
                        None => body.push('\\'),
                    }
                }
                // serde_json handles all JSON string escaping on the way out.
                out.push_str(
                    &serde_json::to_string(&body).expect("serialize string literal"),
                );
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                word.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    _ => out.push_str(&word),
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// First `max_chars` characters of a response, for error messages.
fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn extract_json_with_json_fence() {
        let text = "Here is the analysis:\n```json\n{\"a\": 1}\n```\n";
        assert_eq!(extract_json(text), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_with_plain_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), "{\"a\": 1}");
    }

    #[test]
    fn parse_strict_json() {
        let value = parse_llm_json("{\"relevance\": {}, \"priorities\": {}}").unwrap();
        assert!(value["relevance"].is_object());
    }

    #[test]
    fn parse_python_literal_fallback() {
        let value =
            parse_llm_json("{'relevance': {'enabled': True}, 'priorities': None}").unwrap();
        assert_eq!(value, json!({"relevance": {"enabled": true}, "priorities": null}));
    }

    #[test]
    fn python_literal_preserves_apostrophes_and_escapes() {
        let value = parse_llm_json(r#"{'note': 'client\'s "top" rules\n'}"#).unwrap();
        assert_eq!(value["note"], "client's \"top\" rules\n");
    }

    #[test]
    fn python_literal_keeps_true_inside_strings() {
        let value = parse_llm_json("{'text': 'True North'}").unwrap();
        assert_eq!(value["text"], "True North");
    }

    #[test]
    fn unparseable_text_reports_original_error() {
        let err = parse_llm_json("I could not produce the output, sorry.").unwrap_err();
        assert!(err.to_string().contains("parse LLM response as JSON"));
    }

    #[test]
    fn multibyte_preview_does_not_panic() {
        let err = parse_llm_json("é".repeat(300).as_str()).unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
