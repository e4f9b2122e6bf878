//! Workflow orchestration for the rule prioritization pipeline.
//!
//! The pipeline is an explicit state machine: [`Node`] names the graph's
//! states, `steps` holds one function per unit of work, `router` holds the
//! pure transition logic, and `engine` drives execute-route-checkpoint
//! cycles, suspending at the human-review interrupt and resuming with a
//! reviewer decision.

mod engine;
mod interrupt;
mod router;
mod steps;

pub use engine::{Engine, RunOutcome};
pub use interrupt::{
    ActionRequest, Decision, EditedAction, InterruptRequest, ReviewConfig, ReviewResponse,
};

use serde::{Deserialize, Serialize};

/// The states of the workflow graph.
///
/// `End` is terminal; it is reached from `SaveOutput`, from an early `quit`
/// exit after `SaveReport`, or from any step that observed a failed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Load,
    Analyze,
    HumanReview,
    ApplyOptimizations,
    SkipOptimizations,
    SaveReport,
    Parse,
    Validate,
    SaveOutput,
    End,
}

impl Node {
    pub fn label(self) -> &'static str {
        match self {
            Node::Load => "load",
            Node::Analyze => "analyze",
            Node::HumanReview => "human_review",
            Node::ApplyOptimizations => "apply_optimizations",
            Node::SkipOptimizations => "skip_optimizations",
            Node::SaveReport => "save_report",
            Node::Parse => "parse",
            Node::Validate => "validate",
            Node::SaveOutput => "save_output",
            Node::End => "end",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
