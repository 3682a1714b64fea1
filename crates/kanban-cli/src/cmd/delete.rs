//! `kb delete`: remove a task on the remote and locally.

use anyhow::Result;
use clap::Args;
use kanban_core::error::ErrorCode;
use kanban_core::model::TaskId;
use serde_json::json;

use crate::context::{CliSession, coded, require_board};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Task ID to delete.
    pub task: String,
}

/// Execute `kb delete`.
///
/// A placement still queued for the task is left in the queue; the remote
/// skips unknown tasks.
///
/// # Errors
///
/// Returns an error if no board is cached, the task is unknown, or the
/// remote call fails.
pub fn run_delete(args: &DeleteArgs, session: &mut CliSession, output: OutputMode) -> Result<()> {
    let board = require_board(session)?;
    let task_id = TaskId::new(args.task.as_str());
    if board.task(&task_id).is_none() {
        return Err(coded(
            ErrorCode::TaskNotFound,
            format!("task not found: {task_id}"),
        ));
    }

    session.delete_task(&task_id)?;
    let report = json!({ "id": task_id, "deleted": true });
    render(output, &report, |_, w| writeln!(w, "deleted {task_id}"))
}
