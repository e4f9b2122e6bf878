//! Shared test infrastructure for integration tests.

use anyhow::{anyhow, Result};
use ruleflow::llm::{LlmClient, LlmRequest};
use ruleflow::state::WorkflowState;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const VALID_RULES_CSV: &str = "priority,rule\n\
    Relevance,\"Content must mention a tracked product or trial\"\n\
    Very High,\"Safety signals or regulatory actions\"\n\
    High,\"High Risk Patients studies and competitor launches\"\n\
    Medium,\"Conference presence without new data\"\n";

pub const KEYWORDS_CSV: &str = "keyword,label\nnephritis,clinical\nbudesonide,product\n";

/// A scripted response: what the fake model returns for one call.
pub enum Scripted {
    Ok(&'static str),
    Err(&'static str),
}

/// Scripted stand-in for the gateway client.
///
/// Responses are consumed in order; running past the script is a test bug
/// and fails loudly.
pub struct ScriptedLlm {
    responses: RefCell<VecDeque<Scripted>>,
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Scripted>) -> Self {
        ScriptedLlm {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl LlmClient for ScriptedLlm {
    fn send(&self, request: &LlmRequest) -> Result<String> {
        self.calls.borrow_mut().push(request.prompt.clone());
        match self.responses.borrow_mut().pop_front() {
            Some(Scripted::Ok(text)) => Ok(text.to_string()),
            Some(Scripted::Err(message)) => Err(anyhow!("{message}")),
            None => panic!("scripted LLM ran out of responses"),
        }
    }
}

/// A valid analysis response with one issue and one applicable optimization.
pub const ANALYSIS_RESPONSE: &str = r#"{
  "issues": [
    {
      "issue": "High and Medium both claim conference coverage",
      "priority_levels": ["High", "Medium"],
      "severity": "Warning",
      "impact": "Conference items can land in two tiers."
    }
  ],
  "optimizations": [
    {
      "priority_level": "High",
      "original_text": "High Risk Patients studies and competitor launches",
      "suggested_text": "High Risk Patient cohort studies; competitor product launches",
      "rationale": "Separates the two concerns so Medium cannot claim either."
    }
  ]
}"#;

/// A parsing response satisfying the shallow validation.
pub const PARSED_RESPONSE: &str =
    r#"{"relevance": {"rules": []}, "priorities": {"High": {"rules": []}}}"#;

/// A structurally valid JSON response missing the mandatory keys.
pub const INVALID_PARSED_RESPONSE: &str = r#"{"unexpected": true}"#;

/// A session directory seeded with valid input files.
pub struct SessionFixture {
    pub dir: TempDir,
}

impl Default for SessionFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp session dir");
        fs::write(dir.path().join("rules.csv"), VALID_RULES_CSV).expect("write rules.csv");
        fs::write(dir.path().join("client_keywords.csv"), KEYWORDS_CSV)
            .expect("write client_keywords.csv");
        SessionFixture { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn initial_state(&self) -> WorkflowState {
        WorkflowState::new(self.path().to_path_buf(), "gpt-4.1".to_string(), None)
    }
}
