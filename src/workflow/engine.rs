//! The engine driving execute-route-checkpoint cycles.
//!
//! One cycle executes the current node's step, asks the router for the next
//! node, and persists a checkpoint. The human-review node never executes: the
//! engine suspends there, returns the review payload to the caller, and picks
//! up again when [`Engine::resume`] supplies a decision. Because every cycle
//! is checkpointed, a killed process resumes from the exact node it was
//! about to run.

use super::interrupt::{Decision, InterruptRequest, ReviewResponse};
use super::{router, steps, Node};
use crate::llm::LlmClient;
use crate::session::{Checkpoint, CheckpointStore, SessionPaths};
use crate::state::{ReviewDecision, WorkflowState};
use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

/// What a drive cycle ended with.
#[derive(Debug)]
pub enum RunOutcome {
    /// The workflow is suspended on the human-review gate.
    AwaitingReview(InterruptRequest),
    /// The workflow reached the terminal node.
    Finished(Box<WorkflowState>),
}

/// Drives one session's workflow graph against a checkpoint store.
pub struct Engine<'a> {
    llm: &'a dyn LlmClient,
    store: CheckpointStore,
    paths: SessionPaths,
}

impl<'a> Engine<'a> {
    pub fn new(directory: &Path, llm: &'a dyn LlmClient) -> Self {
        Engine {
            llm,
            store: CheckpointStore::new(directory),
            paths: SessionPaths::new(directory.to_path_buf()),
        }
    }

    /// Start a session, or continue one from its last checkpoint.
    ///
    /// `initial` is only used when no checkpoint exists yet. A session that
    /// was suspended on review re-surfaces its payload without re-running
    /// any step.
    pub fn run(&self, session_id: &str, initial: WorkflowState) -> Result<RunOutcome> {
        let checkpoint = match self.store.get(session_id)? {
            Some(checkpoint) => {
                tracing::info!(session_id, node = %checkpoint.node, "resuming from checkpoint");
                checkpoint
            }
            None => Checkpoint {
                node: Node::Load,
                state: initial,
            },
        };
        self.drive(session_id, checkpoint)
    }

    /// Resume a session suspended on review with the reviewer's decision.
    pub fn resume(&self, session_id: &str, response: &ReviewResponse) -> Result<RunOutcome> {
        let Some(mut checkpoint) = self.store.get(session_id)? else {
            return Err(anyhow!("no checkpoint found for session {session_id}"));
        };
        if checkpoint.node != Node::HumanReview {
            return Err(anyhow!(
                "session {session_id} is not awaiting review (next step: {})",
                checkpoint.node
            ));
        }
        let decision = response
            .decisions
            .first()
            .ok_or_else(|| anyhow!("resume payload carries no decision"))?;

        apply_decision(&mut checkpoint.state, decision);
        checkpoint.node = router::next_node(Node::HumanReview, &checkpoint.state);
        self.store.put(session_id, &checkpoint)?;
        self.drive(session_id, checkpoint)
    }

    /// The persisted checkpoint for a session, if any.
    pub fn checkpoint(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        self.store.get(session_id)
    }

    fn drive(&self, session_id: &str, mut checkpoint: Checkpoint) -> Result<RunOutcome> {
        loop {
            match checkpoint.node {
                Node::End => {
                    self.store.put(session_id, &checkpoint)?;
                    tracing::info!(session_id, "workflow finished");
                    return Ok(RunOutcome::Finished(Box::new(checkpoint.state)));
                }
                Node::HumanReview => {
                    let request =
                        InterruptRequest::for_review(checkpoint.state.analysis_report.as_ref());
                    self.store.put(session_id, &checkpoint)?;
                    tracing::info!(session_id, "awaiting human review");
                    return Ok(RunOutcome::AwaitingReview(request));
                }
                node => {
                    tracing::info!(session_id, step = %node, "executing step");
                    self.execute(node, &mut checkpoint.state);
                    checkpoint.node = router::next_node(node, &checkpoint.state);
                    self.store.put(session_id, &checkpoint)?;
                }
            }
        }
    }

    fn execute(&self, node: Node, state: &mut WorkflowState) {
        match node {
            Node::Load => steps::load_data(state, &self.paths),
            Node::Analyze => steps::analyze_rules(state, self.llm),
            Node::ApplyOptimizations => steps::apply_optimizations(state),
            Node::SkipOptimizations => steps::skip_optimizations(state),
            Node::SaveReport => steps::save_report(state, &self.paths),
            Node::Parse => steps::parse_rules(state, self.llm),
            Node::Validate => steps::validate_rules(state),
            Node::SaveOutput => steps::save_output(state, &self.paths),
            // Handled by `drive`; listed so a new node cannot be forgotten.
            Node::HumanReview | Node::End => {}
        }
    }
}

/// Fold a reviewer decision into the state before routing.
fn apply_decision(state: &mut WorkflowState, decision: &Decision) {
    state.review_decision = Some(decision.kind);

    match decision.kind {
        ReviewDecision::Edit => {
            let edited_file = decision
                .edited_action
                .as_ref()
                .and_then(|action| action.rules_file.as_ref());
            if let Some(path) = edited_file {
                match fs::read_to_string(path) {
                    Ok(content) => {
                        tracing::info!(path = %path.display(), "loaded edited rules file");
                        state.rules_raw = Some(content);
                    }
                    Err(err) => {
                        // The unreadable path becomes feedback; the session
                        // continues instead of dying on a reviewer typo.
                        state.user_feedback = Some(format!(
                            "could not read edited rules file {}: {err}",
                            path.display()
                        ));
                    }
                }
            } else if let Some(message) = &decision.message {
                state.user_feedback = Some(message.clone());
            }
        }
        ReviewDecision::Reject => {
            state.user_feedback.clone_from(&decision.message);
        }
        ReviewDecision::Approve | ReviewDecision::Quit | ReviewDecision::Skip => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::interrupt::EditedAction;
    use std::path::PathBuf;

    fn state() -> WorkflowState {
        WorkflowState::new(PathBuf::from("/tmp/s"), "gpt-4.1".into(), None)
    }

    fn decision(kind: ReviewDecision) -> Decision {
        Decision {
            kind,
            message: None,
            edited_action: None,
        }
    }

    #[test]
    fn reject_stashes_message_as_feedback() {
        let mut s = state();
        let mut d = decision(ReviewDecision::Reject);
        d.message = Some("the Medium tier is wrong".into());
        apply_decision(&mut s, &d);
        assert_eq!(s.review_decision, Some(ReviewDecision::Reject));
        assert_eq!(s.user_feedback.as_deref(), Some("the Medium tier is wrong"));
    }

    #[test]
    fn edit_with_readable_file_replaces_rules() {
        let dir = tempfile::tempdir().unwrap();
        let edited = dir.path().join("edited_rules.csv");
        fs::write(&edited, "priority,rule\nRelevance,a\nHigh,b\n").unwrap();

        let mut s = state();
        let mut d = decision(ReviewDecision::Edit);
        d.edited_action = Some(EditedAction {
            rules_file: Some(edited),
        });
        apply_decision(&mut s, &d);

        assert!(s.rules_raw.as_deref().unwrap().contains("High,b"));
        assert!(s.user_feedback.is_none());
    }

    #[test]
    fn edit_with_unreadable_file_becomes_feedback() {
        let mut s = state();
        s.rules_raw = Some("original".into());
        let mut d = decision(ReviewDecision::Edit);
        d.edited_action = Some(EditedAction {
            rules_file: Some(PathBuf::from("/nonexistent/edited.csv")),
        });
        apply_decision(&mut s, &d);

        assert_eq!(s.rules_raw.as_deref(), Some("original"));
        assert!(s
            .user_feedback
            .as_deref()
            .unwrap()
            .contains("could not read edited rules file"));
    }

    #[test]
    fn edit_without_path_replaces_feedback_text() {
        let mut s = state();
        let mut d = decision(ReviewDecision::Edit);
        d.message = Some("merge the Low tier into Medium".into());
        apply_decision(&mut s, &d);
        assert_eq!(
            s.user_feedback.as_deref(),
            Some("merge the Low tier into Medium")
        );
    }
}
