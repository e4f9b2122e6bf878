//! Orchestrator entrypoint: drives the workflow engine across suspend/resume
//! cycles and translates human input into resume commands.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use ruleflow::cli::{Command, ResumeArgs, RootArgs, RunArgs, StatusArgs};
use ruleflow::llm::HttpLlmClient;
use ruleflow::session::{self, CheckpointStore};
use ruleflow::spend::SpendTracker;
use ruleflow::state::{ReviewDecision, WorkflowState};
use ruleflow::workflow::{Engine, InterruptRequest, ReviewResponse, RunOutcome};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ruleflow=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = RootArgs::parse();
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Resume(args) => cmd_resume(args),
        Command::Status(args) => cmd_status(args),
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let llm = HttpLlmClient::from_env()?;
    let engine = Engine::new(&args.directory, &llm);
    let session_id = args.session.unwrap_or_else(session::new_session_id);
    eprintln!("session: {session_id}");

    let mut tracker = SpendTracker::from_env();
    if let Some(tracker) = tracker.as_mut() {
        tracker.initiate();
    }

    let initial = WorkflowState::new(args.directory.clone(), args.model, args.instructions);
    let mut outcome = engine.run(&session_id, initial)?;

    let final_state = loop {
        match outcome {
            RunOutcome::AwaitingReview(request) => {
                let response = collect_review_response(&request)?;
                outcome = engine.resume(&session_id, &response)?;
            }
            RunOutcome::Finished(state) => break state,
        }
    };

    if let Some(metrics) = tracker.as_mut().and_then(SpendTracker::close) {
        tracing::info!(
            spent = metrics.spent,
            total_spent = metrics.total_spent,
            "gateway spend"
        );
    }

    report_final_state(&final_state)
}

fn cmd_resume(args: ResumeArgs) -> Result<()> {
    let decision: ReviewDecision = args.decision.parse()?;
    let llm = HttpLlmClient::from_env()?;
    let engine = Engine::new(&args.directory, &llm);

    let response = ReviewResponse::single(decision, args.message, args.rules_file);
    match engine.resume(&args.session, &response)? {
        RunOutcome::AwaitingReview(request) => {
            // The reject/edit loop came back around; surface the new payload
            // so the caller can resume again.
            println!("{}", serde_json::to_string_pretty(&request)?);
            eprintln!(
                "session {} is awaiting review again; answer with another `resume`",
                args.session
            );
            Ok(())
        }
        RunOutcome::Finished(state) => report_final_state(&state),
    }
}

fn cmd_status(args: StatusArgs) -> Result<()> {
    let store = CheckpointStore::new(&args.directory);
    let Some(session_id) = args.session else {
        for id in store.list()? {
            println!("{id}");
        }
        return Ok(());
    };

    let checkpoint = store
        .get(&session_id)?
        .ok_or_else(|| anyhow!("no checkpoint found for session {session_id}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        return Ok(());
    }

    let state = &checkpoint.state;
    println!("next step: {}", checkpoint.node);
    println!(
        "progress: {} / {}",
        state.current_main_step, state.current_sub_step
    );
    println!("status: {:?}", state.step_status);
    if let Some(error) = &state.step_error {
        println!("error: {error}");
    }
    println!(
        "iterations: analysis={} parsing={}",
        state.analysis_iteration_count, state.parsing_iteration_count
    );
    if let Some(path) = &state.report_path {
        println!("report: {}", path.display());
    }
    if let Some(path) = &state.output_file {
        println!("output: {}", path.display());
    }
    Ok(())
}

/// Render the review payload and collect a decision from the terminal.
///
/// Unrecognized input never advances the session; the prompt just repeats.
fn collect_review_response(request: &InterruptRequest) -> Result<ReviewResponse> {
    let rendered = serde_json::to_string_pretty(request)?;
    eprintln!("\n=== Human review required ===\n{rendered}\n");

    loop {
        let input = prompt_line("decision [approve/edit/reject/quit/skip]: ")?;
        let Ok(kind) = input.parse::<ReviewDecision>() else {
            eprintln!("unrecognized decision {input:?}; expected approve, edit, reject, quit, or skip");
            continue;
        };

        let (message, rules_file) = match kind {
            ReviewDecision::Edit => {
                let path =
                    prompt_line("path to edited rules file (blank to give feedback instead): ")?;
                if path.is_empty() {
                    (
                        Some(prompt_line("feedback for the next analysis: ")?),
                        None,
                    )
                } else {
                    (None, Some(PathBuf::from(path)))
                }
            }
            ReviewDecision::Reject => (
                Some(prompt_line("feedback for the next analysis: ")?),
                None,
            ),
            ReviewDecision::Approve | ReviewDecision::Quit | ReviewDecision::Skip => (None, None),
        };

        return Ok(ReviewResponse::single(kind, message, rules_file));
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush().context("flush prompt")?;
    let mut line = String::new();
    let bytes = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read decision from stdin")?;
    if bytes == 0 {
        bail!("stdin closed while awaiting a review decision");
    }
    Ok(line.trim().to_string())
}

fn report_final_state(state: &WorkflowState) -> Result<()> {
    if let Some(path) = &state.report_path {
        println!("analysis report: {}", path.display());
    }
    if let Some(path) = &state.output_file {
        println!("parsed rules: {}", path.display());
    }
    if !state.validation_errors.is_empty() {
        eprintln!(
            "warning: output saved with outstanding validation errors: {}",
            state.validation_errors.join("; ")
        );
    }
    if state.is_failed() {
        bail!(
            "workflow failed during {}: {}",
            state.current_sub_step,
            state.step_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
