//! CLI argument parsing for the prioritization workflow.
//!
//! The CLI stays thin: it wires sessions, decisions, and directories into the
//! engine without embedding any routing or policy, so the same core can be
//! driven from another surface later.

use crate::config::DEFAULT_MODEL;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the prioritization workflow.
#[derive(Parser, Debug)]
#[command(
    name = "ruleflow",
    version,
    about = "LLM-driven rule prioritization workflow with human-in-the-loop review",
    after_help = "Commands:\n  run --directory <dir>                           Start or continue a session\n  resume --directory <dir> --session <id> ...     Answer a pending review non-interactively\n  status --directory <dir> [--session <id>]       Inspect checkpoints\n\nExamples:\n  ruleflow run --directory data/client_a\n  ruleflow run --directory data/client_a --model gemini/gemini-2.5-pro\n  ruleflow resume --directory data/client_a --session 4f1c... --decision approve\n  ruleflow resume --directory data/client_a --session 4f1c... --decision reject --message \"merge Low into Medium\"\n  ruleflow status --directory data/client_a --session 4f1c... --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Resume(ResumeArgs),
    Status(StatusArgs),
}

/// Run command inputs for starting or continuing a session.
#[derive(Parser, Debug)]
#[command(about = "Start or continue a workflow session (interactive review)")]
pub struct RunArgs {
    /// Session directory containing rules.csv and optional keyword/synonym files
    #[arg(long, value_name = "DIR")]
    pub directory: PathBuf,

    /// Model identifier forwarded to the LLM gateway
    #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Free-text guidance included in the parsing prompt
    #[arg(long, value_name = "TEXT")]
    pub instructions: Option<String>,

    /// Session id to create or continue (defaults to a fresh id)
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,
}

/// Resume command inputs answering a pending review in one shot.
#[derive(Parser, Debug)]
#[command(about = "Answer a pending human review without the interactive prompt")]
pub struct ResumeArgs {
    /// Session directory containing rules.csv and optional keyword/synonym files
    #[arg(long, value_name = "DIR")]
    pub directory: PathBuf,

    /// Session id awaiting review
    #[arg(long, value_name = "ID")]
    pub session: String,

    /// Review decision: approve, edit, reject, quit, or skip
    #[arg(long, value_name = "DECISION")]
    pub decision: String,

    /// Feedback message (used by reject, or by edit without a file)
    #[arg(long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Replacement rules file for an edit decision
    #[arg(long, value_name = "PATH")]
    pub rules_file: Option<PathBuf>,
}

/// Status command inputs for inspecting checkpoints.
#[derive(Parser, Debug)]
#[command(about = "Show a session checkpoint, or list sessions")]
pub struct StatusArgs {
    /// Session directory containing rules.csv and optional keyword/synonym files
    #[arg(long, value_name = "DIR")]
    pub directory: PathBuf,

    /// Session id to inspect; omit to list all sessions
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
