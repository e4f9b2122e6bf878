//! LLM gateway client and prompt assembly.
//!
//! The workflow talks to an OpenAI-compatible chat-completions gateway. The
//! client is deliberately thin: one blocking request, temperature pinned to
//! 0.0, optional JSON response format with an optional schema. There is no
//! retry or backoff here — a transient failure surfaces as a failed step and
//! the bounded workflow loops decide whether to try again.
//!
//! Prompts are compile-time templates with `{placeholder}` substitution so
//! the text lives next to the repo instead of inside format strings.

pub mod response;

use crate::config::{LLM_API_KEY_ENV, LLM_ENDPOINT_ENV};
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::time::Instant;

const RULE_ANALYSIS_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/rule_analysis.md"
));
const RULE_PARSING_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/rule_parsing.md"
));

/// One request to the model.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: String,
    pub want_json: bool,
    /// JSON schema enforced at the gateway when JSON output is requested.
    pub schema: Option<Value>,
}

/// The seam between the workflow and the hosted model.
///
/// Steps depend on this trait so tests can script responses without a
/// network; the orchestrator wires in [`HttpLlmClient`].
pub trait LlmClient {
    fn send(&self, request: &LlmRequest) -> Result<String>;
}

/// Blocking HTTP client for the gateway configured via environment.
pub struct HttpLlmClient {
    endpoint: String,
    api_key: String,
    agent: ureq::Agent,
}

impl HttpLlmClient {
    /// Build a client from `RULEFLOW_LLM_ENDPOINT` / `RULEFLOW_LLM_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var(LLM_ENDPOINT_ENV)
            .with_context(|| format!("missing required environment variable {LLM_ENDPOINT_ENV}"))?;
        let api_key = std::env::var(LLM_API_KEY_ENV)
            .with_context(|| format!("missing required environment variable {LLM_API_KEY_ENV}"))?;
        Ok(HttpLlmClient {
            endpoint,
            api_key,
            agent: ureq::Agent::new_with_defaults(),
        })
    }
}

impl LlmClient for HttpLlmClient {
    fn send(&self, request: &LlmRequest) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.endpoint.trim_end_matches('/')
        );

        let mut payload = json!({
            "model": request.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": 0.0,
        });
        if let Some(schema) = &request.schema {
            payload["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {"name": "workflow_output", "strict": true, "schema": schema},
            });
        } else if request.want_json {
            payload["response_format"] = json!({"type": "json_object"});
        }

        let start = Instant::now();
        let body: Value = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&payload)
            .with_context(|| format!("call LLM gateway at {url}"))?
            .body_mut()
            .read_json()
            .context("decode LLM gateway response")?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("gateway response has no message content"))?
            .to_string();

        tracing::info!(
            model = %request.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = request.prompt.len(),
            response_bytes = content.len(),
            "llm call complete"
        );

        Ok(content)
    }
}

/// Assemble the rule-analysis prompt.
pub fn build_analysis_prompt(
    rules: &str,
    keywords: Option<&str>,
    user_feedback: Option<&str>,
) -> String {
    let feedback_section = match user_feedback.filter(|f| !f.trim().is_empty()) {
        Some(feedback) => format!(
            "## Reviewer Feedback\n\nA human reviewer rejected the previous analysis. \
             Address this feedback in the new analysis:\n{feedback}\n\n"
        ),
        None => String::new(),
    };

    RULE_ANALYSIS_TEMPLATE
        .replace("{rules}", rules)
        .replace("{client_keywords}", keywords.unwrap_or("None provided"))
        .replace("{user_feedback}", &feedback_section)
}

/// Assemble the rule-parsing prompt.
pub fn build_parsing_prompt(
    rules: &str,
    keywords: Option<&str>,
    synonyms: Option<&str>,
    instructions: &str,
) -> String {
    RULE_PARSING_TEMPLATE
        .replace("{rules}", rules)
        .replace("{client_keywords}", keywords.unwrap_or("None provided"))
        .replace("{custom_synonyms}", synonyms.unwrap_or("None provided"))
        .replace("{user_instructions}", instructions)
}
