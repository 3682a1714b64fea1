//! `kb sync`: flush queued placements to the remote now.

use anyhow::Result;
use clap::Args;
use kanban_core::sync::FlushOutcome;
use serde::Serialize;

use crate::context::CliSession;
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug, Default)]
pub struct SyncArgs {}

/// Serializable summary of one flush attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// `synced`, `empty`, `dropped` or `failed`.
    pub result: &'static str,
    pub synced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub consecutive_failures: u32,
}

impl SyncReport {
    pub fn from_outcome(outcome: &FlushOutcome) -> Self {
        let base = Self {
            result: "empty",
            synced: 0,
            error: None,
            error_code: None,
            consecutive_failures: 0,
        };
        match outcome {
            FlushOutcome::Empty => base,
            FlushOutcome::Dropped => Self {
                result: "dropped",
                ..base
            },
            FlushOutcome::Synced { count } => Self {
                result: "synced",
                synced: *count,
                ..base
            },
            FlushOutcome::Failed {
                error, consecutive, ..
            } => Self {
                result: "failed",
                error: Some(error.to_string()),
                error_code: Some(error.code().code()),
                consecutive_failures: *consecutive,
                ..base
            },
        }
    }

    pub fn failed(&self) -> bool {
        self.result == "failed"
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self.result {
            "synced" => format!("{} update(s) confirmed", self.synced),
            "empty" => "nothing to sync".to_string(),
            "dropped" => "a flush is already in flight".to_string(),
            _ => format!(
                "failed ({}): {}",
                self.error_code.unwrap_or("?"),
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncOutput {
    #[serde(flatten)]
    report: SyncReport,
    pending: usize,
}

/// Execute `kb sync`.
///
/// # Errors
///
/// Returns the remote error when the flush fails. The queue is kept and the
/// next sync retries it.
pub fn run_sync(_args: &SyncArgs, session: &mut CliSession, output: OutputMode) -> Result<()> {
    let outcome = session.force_sync();
    let pending = session.pending().len();

    if let FlushOutcome::Failed { error, .. } = outcome {
        tracing::warn!(pending, code = %error.code(), "sync failed: {error}");
        return Err(anyhow::Error::new(error));
    }

    let report = SyncOutput {
        report: SyncReport::from_outcome(&outcome),
        pending,
    };
    render(output, &report, |r, w| {
        writeln!(w, "✓ {}", r.report.summary())?;
        pretty_kv(w, "pending", r.pending.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_core::remote::RemoteError;

    #[test]
    fn failed_outcome_carries_code() {
        let report = SyncReport::from_outcome(&FlushOutcome::Failed {
            error: RemoteError::Transport("connection refused".into()),
            consecutive: 2,
            escalated: false,
        });
        assert!(report.failed());
        assert_eq!(report.error_code, Some("E4001"));
        assert_eq!(report.consecutive_failures, 2);
        assert!(report.summary().starts_with("failed (E4001)"));
    }

    #[test]
    fn synced_outcome_serializes_count() {
        let report = SyncReport::from_outcome(&FlushOutcome::Synced { count: 3 });
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["result"], "synced");
        assert_eq!(json["synced"], 3);
        assert!(json.get("error").is_none());
    }
}
