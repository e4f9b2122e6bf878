//! The shared workflow state threaded through every step.
//!
//! One `WorkflowState` exists per session. Steps mutate it in place and the
//! engine checkpoints it after every step, so every field must round-trip
//! through serde.

use crate::config::PriorityLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Progress of the step currently (or last) executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

/// The reviewer's verdict on an analysis report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Apply the suggested optimizations and continue to parsing.
    Approve,
    /// Re-read the rules (from a supplied file, or after manual edits).
    Edit,
    /// Re-run the analysis with feedback for the model.
    Reject,
    /// Save the report and terminate without parsing.
    Quit,
    /// Continue to parsing with the rules unmodified.
    Skip,
}

impl ReviewDecision {
    pub const ALL: [ReviewDecision; 5] = [
        ReviewDecision::Approve,
        ReviewDecision::Edit,
        ReviewDecision::Reject,
        ReviewDecision::Quit,
        ReviewDecision::Skip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Edit => "edit",
            ReviewDecision::Reject => "reject",
            ReviewDecision::Quit => "quit",
            ReviewDecision::Skip => "skip",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReviewDecision {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|decision| decision.label() == normalized)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unrecognized decision {input:?} (expected one of: approve, edit, reject, quit, skip)"
                )
            })
    }
}

/// Severity of an issue flagged by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    Critical,
    Warning,
}

/// A logical conflict, overlap, or ambiguity found in the rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub issue: String,
    #[serde(default)]
    pub priority_levels: Vec<PriorityLevel>,
    pub severity: IssueSeverity,
    pub impact: String,
}

/// A suggested rewrite of one priority level's rule text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationEntry {
    pub priority_level: PriorityLevel,
    pub original_text: String,
    pub suggested_text: String,
    #[serde(default)]
    pub rationale: String,
}

/// The structured result of the rule-analysis step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub optimizations: Vec<OptimizationEntry>,
    /// Set instead of the other fields when the model response was unusable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One reviewer-feedback round, recorded when the analysis is re-run.
///
/// Entries are append-only: existing entries are never edited or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewHistoryEntry {
    /// The analysis attempt this feedback fed into (1-based).
    pub iteration: u32,
    pub feedback: String,
    pub recorded_at: String,
}

/// The mutable state carried across every step of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    // Identity and configuration
    pub directory: PathBuf,
    pub model: String,
    #[serde(default)]
    pub user_instructions: Option<String>,

    // Raw inputs, loaded once per session
    #[serde(default)]
    pub rules_raw: Option<String>,
    #[serde(default)]
    pub keywords_raw: Option<String>,
    #[serde(default)]
    pub synonyms_raw: Option<String>,

    // Derived working data
    #[serde(default)]
    pub transformed_rules: Option<String>,
    #[serde(default)]
    pub parsed_rules: Option<serde_json::Value>,
    #[serde(default)]
    pub analysis_report: Option<AnalysisReport>,

    // Control fields
    #[serde(default)]
    pub current_main_step: String,
    #[serde(default)]
    pub current_sub_step: String,
    pub step_status: StepStatus,
    #[serde(default)]
    pub step_error: Option<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub review_decision: Option<ReviewDecision>,
    #[serde(default)]
    pub user_feedback: Option<String>,
    #[serde(default)]
    pub review_history: Vec<ReviewHistoryEntry>,
    #[serde(default)]
    pub analysis_iteration_count: u32,
    #[serde(default)]
    pub parsing_iteration_count: u32,

    // Outputs, set only on success
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl WorkflowState {
    pub fn new(directory: PathBuf, model: String, user_instructions: Option<String>) -> Self {
        WorkflowState {
            directory,
            model,
            user_instructions,
            rules_raw: None,
            keywords_raw: None,
            synonyms_raw: None,
            transformed_rules: None,
            parsed_rules: None,
            analysis_report: None,
            current_main_step: String::new(),
            current_sub_step: String::new(),
            step_status: StepStatus::Pending,
            step_error: None,
            validation_errors: Vec::new(),
            review_decision: None,
            user_feedback: None,
            review_history: Vec::new(),
            analysis_iteration_count: 0,
            parsing_iteration_count: 0,
            output_file: None,
            report_path: None,
        }
    }

    /// Mark the current step failed. Downstream steps and routers treat this
    /// as a short-circuit to the terminal state.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(step = %self.current_sub_step, error = %message, "step failed");
        self.step_status = StepStatus::Failed;
        self.step_error = Some(message);
    }

    pub fn is_failed(&self) -> bool {
        self.step_status == StepStatus::Failed
    }

    /// The rules text parsing should operate on: optimized when available,
    /// otherwise the raw input.
    pub fn effective_rules(&self) -> Option<&str> {
        self.transformed_rules
            .as_deref()
            .or(self.rules_raw.as_deref())
    }

    /// Short model tag for artifact names (the final `/`-segment of the id).
    pub fn model_tag(&self) -> &str {
        match self.model.rsplit('/').next() {
            Some(tag) if !tag.is_empty() => tag,
            _ => "unknown",
        }
    }
}
