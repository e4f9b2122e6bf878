//! Interrupt and resume payloads for the human-review gate.
//!
//! When the workflow reaches the review node it suspends and surfaces an
//! [`InterruptRequest`] to whoever drives the session; execution continues
//! only when a [`ReviewResponse`] comes back. Both shapes are serde types so
//! they can cross a process boundary unchanged (CLI today, a queue or HTTP
//! surface tomorrow).

use crate::state::{AnalysisReport, ReviewDecision};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the workflow asks the reviewer to look at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptRequest {
    pub action_requests: Vec<ActionRequest>,
    pub review_configs: Vec<ReviewConfig>,
}

/// One reviewable action with its full payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub payload: AnalysisReport,
}

/// The decisions the reviewer may answer with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub allowed_decisions: Vec<ReviewDecision>,
}

/// The reviewer's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub decisions: Vec<Decision>,
}

/// A single decision, optionally carrying feedback or an edited artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "type")]
    pub kind: ReviewDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_action: Option<EditedAction>,
}

/// Reviewer-supplied replacement inputs for an `edit` decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditedAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
}

impl InterruptRequest {
    /// Build the review payload for an analysis report.
    ///
    /// The payload must carry the full report and the complete decision
    /// vocabulary; the reviewer sees everything the router will act on.
    pub(crate) fn for_review(report: Option<&AnalysisReport>) -> Self {
        InterruptRequest {
            action_requests: vec![ActionRequest {
                action: "review_rule_analysis".to_string(),
                payload: report.cloned().unwrap_or_default(),
            }],
            review_configs: vec![ReviewConfig {
                allowed_decisions: ReviewDecision::ALL.to_vec(),
            }],
        }
    }
}

impl ReviewResponse {
    /// Convenience constructor for a single decision.
    pub fn single(
        kind: ReviewDecision,
        message: Option<String>,
        rules_file: Option<PathBuf>,
    ) -> Self {
        ReviewResponse {
            decisions: vec![Decision {
                kind,
                message,
                edited_action: rules_file.map(|path| EditedAction {
                    rules_file: Some(path),
                }),
            }],
        }
    }
}
