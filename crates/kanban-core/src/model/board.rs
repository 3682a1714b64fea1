//! Board, column and task records.
//!
//! # Sharing
//!
//! Boards are replaced wholesale on every mutation and never edited in place.
//! To keep that cheap, a [`Board`] holds its columns as `Arc<Column>` and a
//! [`Column`] holds its tasks as `Arc<Task>`. A mutation clones the outer
//! vectors (pointer copies) and uses `Arc::make_mut` on the records it
//! actually changes, so untouched columns and tasks keep their identity and
//! observers can detect change with `Arc::ptr_eq`.
//!
//! # Invariants
//!
//! - Columns are ordered by `position`; tasks within a column likewise.
//! - Task positions within a column are dense: exactly `0..n` after every
//!   completed mutation (see [`crate::reducer::check_density`]).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BoardId, ColumnId, TaskId, WorkspaceId};

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Owning column.
    pub column_id: ColumnId,
    /// Zero-based rank within the owning column.
    pub position: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A column (lane) and its ordered tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    /// Rank within the board.
    pub position: usize,
    pub board_id: BoardId,
    /// Tasks ordered by position. Absent in create-column responses.
    #[serde(default)]
    pub tasks: Vec<Arc<Task>>,
}

impl Column {
    /// Find a task in this column by id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Positions of the tasks in list order.
    #[must_use]
    pub fn positions(&self) -> Vec<usize> {
        self.tasks.iter().map(|t| t.position).collect()
    }
}

/// The active board of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub columns: Vec<Arc<Column>>,
}

impl Board {
    /// Find a column by id.
    #[must_use]
    pub fn column(&self, id: &ColumnId) -> Option<&Arc<Column>> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Index of a column in `columns`.
    #[must_use]
    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    /// Locate a task as `(column index, task index)`.
    #[must_use]
    pub fn locate_task(&self, id: &TaskId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, column)| {
            column
                .tasks
                .iter()
                .position(|t| &t.id == id)
                .map(|ti| (ci, ti))
        })
    }

    /// Find a task anywhere on the board.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.locate_task(id)
            .map(|(ci, ti)| &self.columns[ci].tasks[ti])
    }

    /// Iterate over every task, column by column.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.columns.iter().flat_map(|c| c.tasks.iter())
    }

    /// Total number of tasks on the board.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}
