use serde::{Deserialize, Serialize};

use super::ids::{ColumnId, TaskId};

/// The last known intended placement of a task, awaiting remote confirmation.
///
/// This is not a change log entry: only the final `(column_id, position)` of a
/// task matters, so a newer update for the same task replaces the older one
/// (see [`crate::queue::MutationQueue::enqueue`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub task_id: TaskId,
    pub column_id: ColumnId,
    pub position: usize,
    /// Wall-clock time of the move in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl PendingUpdate {
    pub fn new(task_id: TaskId, column_id: ColumnId, position: usize, timestamp: i64) -> Self {
        Self {
            task_id,
            column_id,
            position,
            timestamp,
        }
    }

    /// Whether `other` records the very same placement write.
    ///
    /// Every field takes part: two moves of one task within the same
    /// millisecond (or across a clock step backwards) share a timestamp but
    /// not a placement, and must not confirm each other.
    #[must_use]
    pub fn same_entry(&self, other: &Self) -> bool {
        self == other
    }
}
