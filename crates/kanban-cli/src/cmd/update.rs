//! `kb update`: edit a task's title or description.

use anyhow::Result;
use clap::Args;
use kanban_core::error::ErrorCode;
use kanban_core::model::{Task, TaskId, TaskPatch};

use crate::context::{CliSession, coded, require_board};
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Task ID to update.
    pub task: String,

    /// New title.
    #[arg(long)]
    pub title: Option<String>,

    /// New description.
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Remove the description.
    #[arg(long)]
    pub clear_description: bool,
}

impl UpdateArgs {
    fn patch(&self) -> TaskPatch {
        let description = if self.clear_description {
            Some(None)
        } else {
            self.description.clone().map(Some)
        };
        TaskPatch {
            title: self.title.clone(),
            description,
        }
    }
}

/// Execute `kb update`. The task keeps its local column and position.
///
/// # Errors
///
/// Returns an error if nothing would change, no board is cached, the task
/// is unknown, or the remote call fails.
pub fn run_update(args: &UpdateArgs, session: &mut CliSession, output: OutputMode) -> Result<()> {
    let patch = args.patch();
    if patch.is_empty() {
        anyhow::bail!("nothing to update: pass --title, --description or --clear-description");
    }

    let board = require_board(session)?;
    let task_id = TaskId::new(args.task.as_str());
    if board.task(&task_id).is_none() {
        return Err(coded(
            ErrorCode::TaskNotFound,
            format!("task not found: {task_id}"),
        ));
    }

    session.update_task(&task_id, &patch)?;
    let updated = session
        .board()
        .and_then(|board| board.task(&task_id).map(|task| Task::clone(task)))
        .ok_or_else(|| coded(ErrorCode::TaskNotFound, format!("task not found: {task_id}")))?;

    render(output, &updated, |t, w| {
        writeln!(w, "{}", t.id)?;
        pretty_kv(w, "title", &t.title)?;
        pretty_kv(w, "column", t.column_id.as_str())?;
        pretty_kv(w, "position", t.position.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(title: Option<&str>, description: Option<&str>, clear: bool) -> UpdateArgs {
        UpdateArgs {
            task: "t1".into(),
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            clear_description: clear,
        }
    }

    #[test]
    fn clear_description_sends_null() {
        let patch = args(None, None, true).patch();
        assert_eq!(patch.description, Some(None));
        assert!(!patch.is_empty());
    }

    #[test]
    fn no_flags_is_empty_patch() {
        assert!(args(None, None, false).patch().is_empty());
    }

    #[test]
    fn description_is_set() {
        let patch = args(Some("T"), Some("D"), false).patch();
        assert_eq!(patch.title.as_deref(), Some("T"));
        assert_eq!(patch.description, Some(Some("D".to_string())));
    }
}
