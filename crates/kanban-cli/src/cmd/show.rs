use anyhow::Result;
use clap::Args;
use kanban_core::error::ErrorCode;
use kanban_core::model::{Board, ColumnId, Task};
use std::collections::HashSet;

use crate::context::{CliSession, coded, require_board};
use crate::output::{OutputMode, pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Only show this column.
    #[arg(long)]
    pub column: Option<String>,
}

fn pending_marker(pending: &HashSet<String>, task: &Task) -> &'static str {
    if pending.contains(task.id.as_str()) {
        " *"
    } else {
        ""
    }
}

/// Execute `kb show`: print the cached board, column by column.
///
/// Tasks with a placement not yet confirmed by the remote are marked `*`.
///
/// # Errors
///
/// Returns an error if no board is cached or the column doesn't exist.
pub fn run_show(args: &ShowArgs, session: &CliSession, output: OutputMode) -> Result<()> {
    let board = require_board(session)?;

    let view: Board = match &args.column {
        Some(column) => {
            let id = ColumnId::new(column.as_str());
            let Some(found) = board.column(&id) else {
                return Err(coded(
                    ErrorCode::ColumnNotFound,
                    format!("column not found: {column}"),
                ));
            };
            Board {
                columns: vec![found.clone()],
                ..Board::clone(&board)
            }
        }
        None => Board::clone(&board),
    };

    let pending: HashSet<String> = session
        .pending()
        .iter()
        .map(|u| u.task_id.to_string())
        .collect();

    render_mode(
        output,
        &view,
        |board, w| {
            for column in &board.columns {
                for task in &column.tasks {
                    writeln!(
                        w,
                        "{}\t{}\t{}\t{}{}",
                        column.id,
                        task.position,
                        task.id,
                        task.title,
                        pending_marker(&pending, task)
                    )?;
                }
            }
            Ok(())
        },
        |board, w| {
            writeln!(w, "{} ({})", board.name, board.workspace_id)?;
            for column in &board.columns {
                writeln!(w)?;
                writeln!(w, "{} [{}] ({})", column.name, column.id, column.tasks.len())?;
                pretty_rule(w)?;
                if column.tasks.is_empty() {
                    writeln!(w, "  (empty)")?;
                }
                for task in &column.tasks {
                    writeln!(
                        w,
                        "  {:>2}. {}  {}{}",
                        task.position,
                        task.id,
                        task.title,
                        pending_marker(&pending, task)
                    )?;
                    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
                        writeln!(w, "      {description}")?;
                    }
                }
            }
            Ok(())
        },
    )
}
