//! Gateway spend tracking.
//!
//! Snapshots the key's cumulative spend before and after a run so the
//! per-session cost can be logged. The tracker shares the gateway credentials
//! with the LLM client, and it is strictly best-effort: any failure is a
//! warning, never a failed run.

use crate::config::{LLM_API_KEY_ENV, LLM_ENDPOINT_ENV};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Spend observed across one run.
#[derive(Debug, Clone, Copy)]
pub struct SpendMetrics {
    pub spent: f64,
    pub total_spent: f64,
}

pub struct SpendTracker {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
    start_spend: Option<f64>,
}

impl SpendTracker {
    /// Build a tracker from the gateway environment, if configured.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(LLM_ENDPOINT_ENV).ok()?;
        let api_key = std::env::var(LLM_API_KEY_ENV).ok()?;
        Some(SpendTracker {
            base_url,
            api_key,
            agent: ureq::Agent::new_with_defaults(),
            start_spend: None,
        })
    }

    /// Record the spend baseline at run start.
    pub fn initiate(&mut self) {
        match self.current_spend() {
            Ok(spend) => self.start_spend = Some(spend),
            Err(err) => tracing::warn!(%err, "spend tracker unavailable"),
        }
    }

    /// Snapshot spend at run end and return the delta, if a baseline exists.
    pub fn close(&mut self) -> Option<SpendMetrics> {
        let start = self.start_spend.take()?;
        match self.current_spend() {
            Ok(end) => Some(SpendMetrics {
                spent: end - start,
                total_spent: end,
            }),
            Err(err) => {
                tracing::warn!(%err, "spend tracker unavailable at close");
                None
            }
        }
    }

    fn current_spend(&self) -> Result<f64> {
        let url = format!("{}/key/info", self.base_url.trim_end_matches('/'));
        let body: Value = self
            .agent
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .call()
            .with_context(|| format!("query gateway spend at {url}"))?
            .body_mut()
            .read_json()
            .context("decode gateway spend response")?;
        body["info"]["spend"]
            .as_f64()
            .ok_or_else(|| anyhow!("gateway spend response has no info.spend field"))
    }
}
