//! `kb move`: reposition a task, optimistically, and queue it for sync.

use anyhow::Result;
use clap::Args;
use kanban_core::error::ErrorCode;
use kanban_core::model::{ColumnId, PendingUpdate, TaskId};
use serde::Serialize;

use crate::cmd::sync::SyncReport;
use crate::context::{CliSession, coded, require_board};
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Task ID to move.
    pub task: String,

    /// Target column ID.
    #[arg(long = "to", value_name = "COLUMN")]
    pub column: String,

    /// Zero-based position in the target column. Defaults to the end.
    #[arg(long)]
    pub position: Option<usize>,

    /// Flush the queue right after the move.
    #[arg(long)]
    pub sync: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveReport {
    placement: PendingUpdate,
    pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<SyncReport>,
}

/// Execute `kb move`.
///
/// A position past the end of the target column appends. The move lands in
/// the local cache immediately; the remote only hears about it on the next
/// flush (`--sync`, `kb sync` or `kb watch`).
///
/// # Errors
///
/// Returns an error if no board is cached or the task or column is unknown.
/// With `--sync`, a failed flush is reported but the move itself stands.
pub fn run_move(args: &MoveArgs, session: &mut CliSession, output: OutputMode) -> Result<()> {
    let board = require_board(session)?;
    let task_id = TaskId::new(args.task.as_str());
    let column_id = ColumnId::new(args.column.as_str());

    if board.task(&task_id).is_none() {
        return Err(coded(
            ErrorCode::TaskNotFound,
            format!("task not found: {task_id}"),
        ));
    }
    if board.column(&column_id).is_none() {
        return Err(coded(
            ErrorCode::ColumnNotFound,
            format!("column not found: {column_id}"),
        ));
    }

    let position = args.position.unwrap_or(usize::MAX);
    if !session.move_task(&task_id, &column_id, position) {
        return Err(coded(
            ErrorCode::InternalUnexpected,
            format!("move of {task_id} was not applied"),
        ));
    }
    let placement = session.pending().get(&task_id).cloned().ok_or_else(|| {
        coded(
            ErrorCode::InternalUnexpected,
            format!("move of {task_id} was not queued"),
        )
    })?;

    let sync = args.sync.then(|| SyncReport::from_outcome(&session.force_sync()));
    let report = MoveReport {
        placement,
        pending: session.pending().len(),
        sync,
    };

    render(output, &report, |r, w| {
        writeln!(
            w,
            "✓ {} → {} @ {}",
            r.placement.task_id, r.placement.column_id, r.placement.position
        )?;
        pretty_kv(w, "pending", r.pending.to_string())?;
        if let Some(sync) = &r.sync {
            pretty_kv(w, "sync", sync.summary())?;
        }
        Ok(())
    })?;

    if report.sync.as_ref().is_some_and(SyncReport::failed) {
        tracing::warn!(pending = report.pending, "move kept locally; remote sync failed");
    }
    Ok(())
}
