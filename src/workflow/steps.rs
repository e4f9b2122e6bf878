//! The workflow's step functions.
//!
//! Every step is a plain mutation of [`WorkflowState`]: domain errors are
//! captured into the state (`fail`) instead of propagating, so the engine and
//! routers stay in control of what happens next. Each step starts with the
//! same guard — a failed session makes every remaining step a no-op.

use crate::inputs::{self, InputKind};
use crate::llm::{self, response, LlmClient, LlmRequest};
use crate::report;
use crate::schema;
use crate::session::SessionPaths;
use crate::state::{AnalysisReport, ReviewHistoryEntry, StepStatus, WorkflowState};
use chrono::Local;
use std::cmp::Reverse;
use std::fs;

/// Load input CSVs into the state.
///
/// Idempotent: fields already populated (after an `edit` decision, for
/// example) are kept instead of re-reading the disk.
pub(crate) fn load_data(state: &mut WorkflowState, paths: &SessionPaths) {
    if state.is_failed() {
        return;
    }
    state.current_main_step = "Rule Analysis".to_string();
    state.current_sub_step = "Data Loading".to_string();
    state.step_status = StepStatus::InProgress;

    if state.rules_raw.is_none() {
        match inputs::load_required(paths.root(), InputKind::Rules) {
            Ok(content) => {
                tracing::info!("loaded rules.csv from disk");
                state.rules_raw = Some(content);
            }
            Err(err) => {
                state.fail(err.to_string());
                return;
            }
        }
    } else {
        tracing::info!("using pre-populated rules from state");
    }

    if state.keywords_raw.is_none() {
        match inputs::load_optional(paths.root(), InputKind::Keywords) {
            Ok(content) => {
                if content.is_some() {
                    tracing::info!("loaded client_keywords.csv from disk");
                }
                state.keywords_raw = content;
            }
            Err(err) => {
                state.fail(err.to_string());
                return;
            }
        }
    }

    if state.synonyms_raw.is_none() {
        match inputs::load_optional(paths.root(), InputKind::Synonyms) {
            Ok(content) => {
                if content.is_some() {
                    tracing::info!("loaded custom_synonyms.csv from disk");
                }
                state.synonyms_raw = content;
            }
            Err(err) => state.fail(err.to_string()),
        }
    }
}

/// Analyze the rules with the model and store the structured report.
///
/// Reviewer feedback present on this attempt is consumed into the prompt and
/// recorded as an immutable review-history entry. The iteration counter
/// advances on every attempt, including failures.
pub(crate) fn analyze_rules(state: &mut WorkflowState, llm: &dyn LlmClient) {
    if state.is_failed() {
        return;
    }
    state.current_sub_step = "Rule Analysis".to_string();
    let attempt = state.analysis_iteration_count + 1;
    tracing::info!(attempt, "analyzing rules");

    let Some(rules) = state.rules_raw.clone() else {
        state.fail("rules are not loaded");
        state.analysis_iteration_count += 1;
        return;
    };

    let feedback = state.user_feedback.take();
    if let Some(text) = feedback.as_deref().filter(|f| !f.trim().is_empty()) {
        state.review_history.push(ReviewHistoryEntry {
            iteration: attempt,
            feedback: text.to_string(),
            recorded_at: Local::now().to_rfc3339(),
        });
    }

    let request = LlmRequest {
        prompt: llm::build_analysis_prompt(
            &rules,
            state.keywords_raw.as_deref(),
            feedback.as_deref(),
        ),
        model: state.model.clone(),
        want_json: true,
        schema: Some(schema::analysis_report_schema()),
    };

    let outcome = llm
        .send(&request)
        .and_then(|text| response::parse_llm_json(&text))
        .and_then(|value| {
            serde_json::from_value::<AnalysisReport>(value)
                .map_err(|err| anyhow::anyhow!("analysis report has unexpected shape: {err}"))
        });

    match outcome {
        Ok(analysis) => {
            tracing::info!(
                issues = analysis.issues.len(),
                optimizations = analysis.optimizations.len(),
                "rule analysis complete"
            );
            state.analysis_report = Some(analysis);
        }
        Err(err) => {
            state.analysis_report = Some(AnalysisReport {
                issues: Vec::new(),
                optimizations: Vec::new(),
                error: Some(err.to_string()),
            });
            state.fail(format!("rule analysis failed: {err}"));
        }
    }
    state.analysis_iteration_count += 1;
}

/// Apply approved optimizations to the raw rules text.
///
/// Replacements run in descending `original_text` length order so an
/// overlapping shorter text cannot corrupt a longer match first.
pub(crate) fn apply_optimizations(state: &mut WorkflowState) {
    if state.is_failed() {
        return;
    }
    state.current_sub_step = "Applying Optimizations".to_string();

    let Some(rules) = state.rules_raw.clone() else {
        state.fail("rules are not loaded");
        return;
    };

    let mut entries: Vec<(String, String)> = state
        .analysis_report
        .as_ref()
        .map(|analysis| {
            analysis
                .optimizations
                .iter()
                .filter(|entry| {
                    !entry.original_text.is_empty() && !entry.suggested_text.is_empty()
                })
                .map(|entry| (entry.original_text.clone(), entry.suggested_text.clone()))
                .collect()
        })
        .unwrap_or_default();
    entries.sort_by_key(|(original, _)| Reverse(original.len()));

    let mut transformed = rules;
    for (original, suggested) in &entries {
        transformed = transformed.replace(original, suggested);
    }

    tracing::info!(applied = entries.len(), "optimizations applied");
    state.transformed_rules = Some(transformed);
}

/// Skip variant: carry the rules forward unchanged.
pub(crate) fn skip_optimizations(state: &mut WorkflowState) {
    if state.is_failed() {
        return;
    }
    state.current_sub_step = "Skipping Optimizations".to_string();
    tracing::info!("optimizations skipped by reviewer");
    state.transformed_rules.clone_from(&state.rules_raw);
}

/// Persist the analysis report workbook and record its path.
pub(crate) fn save_report(state: &mut WorkflowState, paths: &SessionPaths) {
    if state.is_failed() {
        return;
    }
    state.current_sub_step = "Saving Report".to_string();

    let analysis = state.analysis_report.clone().unwrap_or_default();
    match report::write_analysis_report(paths, &analysis, &state.review_history) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "analysis report saved");
            state.report_path = Some(path);
        }
        Err(err) => state.fail(format!("save analysis report: {err}")),
    }
}

/// Parse the (possibly optimized) rules into the structured output.
///
/// Outstanding validation errors from a prior attempt are fed back as
/// refinement instructions. The iteration counter advances on every attempt.
pub(crate) fn parse_rules(state: &mut WorkflowState, llm: &dyn LlmClient) {
    if state.is_failed() {
        return;
    }
    state.current_main_step = "Rule Parsing".to_string();
    state.current_sub_step = "AI Parsing".to_string();
    let attempt = state.parsing_iteration_count + 1;
    tracing::info!(attempt, "parsing rules");

    let Some(rules) = state.effective_rules().map(str::to_string) else {
        state.fail("rules are not loaded");
        state.parsing_iteration_count += 1;
        return;
    };

    let base = state.user_instructions.clone().unwrap_or_default();
    let refinement = if state.validation_errors.is_empty() {
        String::new()
    } else {
        format!(
            "\nRefinement required. Correct the following errors from your previous output: {}",
            state.validation_errors.join(", ")
        )
    };
    let instructions = format!("{base}{refinement}").trim().to_string();

    let request = LlmRequest {
        prompt: llm::build_parsing_prompt(
            &rules,
            state.keywords_raw.as_deref(),
            state.synonyms_raw.as_deref(),
            &instructions,
        ),
        model: state.model.clone(),
        want_json: true,
        schema: Some(schema::parsed_rules_schema()),
    };

    match llm
        .send(&request)
        .and_then(|text| response::parse_llm_json(&text))
    {
        Ok(value) => {
            tracing::info!("rule parsing complete");
            state.parsed_rules = Some(value);
        }
        Err(err) => state.fail(format!("rule parsing failed: {err}")),
    }
    state.parsing_iteration_count += 1;
}

/// Shallow structural validation of the parsed output.
///
/// Deliberately not schema conformance — that is enforced at the gateway via
/// the request schema. This only guards the two keys downstream consumers
/// index into.
pub(crate) fn validate_rules(state: &mut WorkflowState) {
    if state.is_failed() {
        return;
    }
    state.current_sub_step = "Validation".to_string();

    let mut errors = Vec::new();
    match &state.parsed_rules {
        Some(serde_json::Value::Object(map)) => {
            if !map.contains_key("relevance") {
                errors.push("Missing mandatory 'relevance' key.".to_string());
            }
            if !map.contains_key("priorities") {
                errors.push("Missing mandatory 'priorities' key.".to_string());
            }
        }
        _ => errors.push("Output is not a valid JSON dictionary.".to_string()),
    }

    if errors.is_empty() {
        tracing::info!("validation successful");
    } else {
        tracing::warn!(?errors, "validation failed");
    }
    state.validation_errors = errors;
}

/// Write the parsed rules as indented JSON and mark the session successful.
pub(crate) fn save_output(state: &mut WorkflowState, paths: &SessionPaths) {
    if state.is_failed() {
        return;
    }
    state.current_sub_step = "Saving Output".to_string();

    let Some(parsed) = state.parsed_rules.clone() else {
        state.fail("no parsed rules to save");
        return;
    };

    let path = paths.output_file_path(state.model_tag());
    let result = fs::create_dir_all(paths.output_dir())
        .map_err(anyhow::Error::from)
        .and_then(|()| serde_json::to_string_pretty(&parsed).map_err(anyhow::Error::from))
        .and_then(|text| fs::write(&path, text.as_bytes()).map_err(anyhow::Error::from));

    match result {
        Ok(()) => {
            tracing::info!(path = %path.display(), "parsed rules saved");
            state.output_file = Some(path);
            state.step_status = StepStatus::Success;
        }
        Err(err) => state.fail(format!("save parsed rules to {}: {err}", path.display())),
    }
}
