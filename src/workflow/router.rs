//! Pure transition logic for the workflow graph.
//!
//! Routers only read state; they never mutate it. Keeping them pure makes the
//! whole graph's control flow unit-testable without touching disk or the
//! model.

use super::Node;
use crate::config::{MAX_ANALYSIS_ITERATIONS, MAX_PARSE_ITERATIONS};
use crate::state::{ReviewDecision, WorkflowState};

/// Decide the node that follows `current`.
///
/// A failed status short-circuits everything to `End`, matching the step
/// functions' own no-op guard.
pub(crate) fn next_node(current: Node, state: &WorkflowState) -> Node {
    if state.is_failed() {
        return Node::End;
    }

    match current {
        Node::Load => Node::Analyze,
        Node::Analyze => Node::HumanReview,
        Node::HumanReview => route_review(state),
        Node::ApplyOptimizations | Node::SkipOptimizations => Node::SaveReport,
        Node::SaveReport => route_after_report(state),
        Node::Parse => Node::Validate,
        Node::Validate => route_validation(state),
        Node::SaveOutput | Node::End => Node::End,
    }
}

/// Route out of the human-review gate based on the recorded decision.
///
/// An absent decision defaults to saving the report; the enum leaves no
/// unrecognized case to handle.
fn route_review(state: &WorkflowState) -> Node {
    match state.review_decision {
        Some(ReviewDecision::Approve) => Node::ApplyOptimizations,
        Some(ReviewDecision::Edit) => Node::Load,
        Some(ReviewDecision::Reject) => {
            if state.analysis_iteration_count < MAX_ANALYSIS_ITERATIONS {
                Node::Analyze
            } else {
                // Ceiling reached: the rejection is recorded but the session
                // moves on instead of looping forever.
                tracing::warn!(
                    iterations = state.analysis_iteration_count,
                    "analysis retry ceiling reached; proceeding to report"
                );
                Node::SaveReport
            }
        }
        Some(ReviewDecision::Quit) => Node::SaveReport,
        Some(ReviewDecision::Skip) => Node::SkipOptimizations,
        None => Node::SaveReport,
    }
}

fn route_after_report(state: &WorkflowState) -> Node {
    if state.review_decision == Some(ReviewDecision::Quit) {
        tracing::info!("reviewer requested termination; skipping parsing");
        return Node::End;
    }
    Node::Parse
}

/// Retry parsing while errors remain and the ceiling allows; otherwise exit
/// best-effort to save-output, outstanding errors included.
fn route_validation(state: &WorkflowState) -> Node {
    if !state.validation_errors.is_empty() {
        if state.parsing_iteration_count < MAX_PARSE_ITERATIONS {
            tracing::info!(
                attempt = state.parsing_iteration_count + 1,
                max = MAX_PARSE_ITERATIONS,
                "validation failed; retrying parse"
            );
            return Node::Parse;
        }
        tracing::warn!(
            errors = state.validation_errors.len(),
            "parse retry ceiling reached; saving best-effort output"
        );
    }
    Node::SaveOutput
}
