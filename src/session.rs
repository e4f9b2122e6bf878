//! Session paths and the checkpoint store.
//!
//! Each session owns one directory of inputs and artifacts plus one
//! checkpoint file keyed by its session id. The checkpoint snapshots the full
//! workflow state and the node to execute next, so a suspended or interrupted
//! session resumes from the exact point it left off.

use crate::config::{OUTPUT_DIR, REPORTS_DIR, SESSIONS_DIR};
use crate::state::WorkflowState;
use crate::workflow::Node;
use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Path helpers anchored at the session directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    root: PathBuf,
}

impl SessionPaths {
    pub fn new(root: PathBuf) -> Self {
        SessionPaths { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    pub fn checkpoint_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir().join(format!("{session_id}.json"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join(REPORTS_DIR)
    }

    /// Timestamped, model-tagged path for the parsed-rules artifact.
    pub fn output_file_path(&self, model_tag: &str) -> PathBuf {
        self.output_dir()
            .join(format!("parsed_rules_{}_{model_tag}.json", artifact_timestamp()))
    }

    /// Timestamped path for the analysis report artifact.
    pub fn report_file_path(&self) -> PathBuf {
        self.reports_dir()
            .join(format!("rule_analysis_{}.xlsx", artifact_timestamp()))
    }
}

fn artifact_timestamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Generate a fresh session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A resumable snapshot: the node to execute next plus the full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub node: Node,
    pub state: WorkflowState,
}

/// JSON-file checkpoint store, one file per session id.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    paths: SessionPaths,
}

impl CheckpointStore {
    pub fn new(directory: &Path) -> Self {
        CheckpointStore {
            paths: SessionPaths::new(directory.to_path_buf()),
        }
    }

    pub fn get(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.paths.checkpoint_path(session_id);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let checkpoint: Checkpoint =
            serde_json::from_slice(&bytes).context("parse checkpoint JSON")?;
        Ok(Some(checkpoint))
    }

    pub fn put(&self, session_id: &str, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.paths.checkpoint_path(session_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create sessions dir")?;
        }
        let text = serde_json::to_string_pretty(checkpoint).context("serialize checkpoint")?;
        fs::write(&path, text.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Session ids with a persisted checkpoint, sorted for stable listings.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.paths.sessions_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
