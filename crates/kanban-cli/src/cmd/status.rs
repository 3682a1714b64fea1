//! `kb status`: sync state and the pending placement queue.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use kanban_core::model::PendingUpdate;
use kanban_core::sync::SyncStatus;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::context::CliSession;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    workspace: String,
    #[serde(flatten)]
    status: SyncStatus,
    remote: Option<String>,
    cache_dir: PathBuf,
    queue: Vec<PendingUpdate>,
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |at| at.to_rfc3339())
}

/// Execute `kb status`.
///
/// # Errors
///
/// Returns an error only if writing to stdout fails.
pub fn run_status(
    _args: &StatusArgs,
    session: &CliSession,
    output: OutputMode,
    cache_dir: &Path,
) -> Result<()> {
    let report = StatusReport {
        workspace: session.workspace().to_string(),
        status: session.status(),
        remote: session.remote().base_url().map(str::to_string),
        cache_dir: cache_dir.to_path_buf(),
        queue: session.pending().as_slice().to_vec(),
    };

    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(w, "workspace\t{}", r.workspace)?;
            writeln!(w, "pending\t{}", r.status.pending)?;
            writeln!(w, "remote\t{}", r.remote.as_deref().unwrap_or("-"))?;
            for u in &r.queue {
                writeln!(w, "queued\t{}\t{}\t{}\t{}", u.task_id, u.column_id, u.position, u.timestamp)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("Workspace {}", r.workspace))?;
            pretty_kv(w, "remote", r.remote.as_deref().unwrap_or("(not configured)"))?;
            pretty_kv(w, "cache", r.cache_dir.display().to_string())?;
            pretty_kv(w, "pending", r.status.pending.to_string())?;
            if let Some(at) = r.status.last_synced_at {
                pretty_kv(w, "last sync", format_millis(at))?;
            }
            if !r.queue.is_empty() {
                writeln!(w)?;
                pretty_section(w, "Queued placements")?;
                for u in &r.queue {
                    writeln!(
                        w,
                        "  {:<16} → {:<12} @ {:<3} ({})",
                        u.task_id.as_str(),
                        u.column_id.as_str(),
                        u.position,
                        format_millis(u.timestamp)
                    )?;
                }
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_render_as_rfc3339() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
    }
}
