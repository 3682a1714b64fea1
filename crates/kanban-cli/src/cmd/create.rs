//! `kb create-task` and `kb create-column`.

use anyhow::Result;
use clap::Args;
use kanban_core::error::ErrorCode;
use kanban_core::model::ColumnId;

use crate::context::{CliSession, coded, require_board};
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct CreateTaskArgs {
    /// Column the task is created in.
    #[arg(long)]
    pub column: String,

    /// Task title.
    #[arg(long)]
    pub title: String,

    /// Optional task description.
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateColumnArgs {
    /// Column name.
    pub name: String,
}

/// Execute `kb create-task`.
///
/// The remote assigns the id and position; the task is added locally only
/// once the remote confirms it.
///
/// # Errors
///
/// Returns an error if no board is cached, the column is unknown, or the
/// remote call fails.
pub fn run_create_task(
    args: &CreateTaskArgs,
    session: &mut CliSession,
    output: OutputMode,
) -> Result<()> {
    let board = require_board(session)?;
    let column_id = ColumnId::new(args.column.as_str());
    if board.column(&column_id).is_none() {
        return Err(coded(
            ErrorCode::ColumnNotFound,
            format!("column not found: {column_id}"),
        ));
    }
    if args.title.trim().is_empty() {
        anyhow::bail!("task title must not be empty");
    }

    let task = session.create_task(&column_id, &args.title, args.description.as_deref())?;
    render(output, &task, |t, w| {
        writeln!(w, "{}", t.id)?;
        pretty_kv(w, "title", &t.title)?;
        pretty_kv(w, "column", t.column_id.as_str())?;
        pretty_kv(w, "position", t.position.to_string())
    })
}

/// Execute `kb create-column`. The column is appended after the last one.
///
/// # Errors
///
/// Returns an error if no board is cached or the remote call fails.
pub fn run_create_column(
    args: &CreateColumnArgs,
    session: &mut CliSession,
    output: OutputMode,
) -> Result<()> {
    if args.name.trim().is_empty() {
        anyhow::bail!("column name must not be empty");
    }
    let column = session.create_column(&args.name)?;
    render(output, &column, |c, w| {
        writeln!(w, "{}", c.id)?;
        pretty_kv(w, "name", &c.name)?;
        pretty_kv(w, "position", c.position.to_string())
    })
}
