//! Rule prioritization workflow: analyze client rules with an LLM, gate the
//! results behind a human review, then parse the (possibly optimized) rules
//! into a structured filtering configuration.
//!
//! The crate is organized around an explicit, resumable state machine: each
//! step is a plain function over [`state::WorkflowState`], routing between
//! steps is pure, and the engine checkpoints the full state after every step
//! so a session can suspend on a human-review interrupt and resume later,
//! even across process restarts.

pub mod cli;
pub mod config;
pub mod inputs;
pub mod llm;
pub mod report;
pub mod schema;
pub mod session;
pub mod spend;
pub mod state;
pub mod workflow;
