//! In-process remote store.
//!
//! [`MemoryRemote`] keeps authoritative state the way a relational backend
//! would: column rows and a flat table of task rows, each task carrying its
//! own `column_id` and `position`. Applying a placement just overwrites those
//! two fields, which makes batches idempotent by construction.
//!
//! Failure injection ([`MemoryRemote::fail_next`], [`MemoryRemote::set_offline`])
//! lets tests drive the scheduler's retry and escalation paths.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{BatchReceipt, RemoteError, RemoteStore};
use crate::clock::{Clock, SystemClock};
use crate::model::{
    Board, BoardId, Column, ColumnId, NewColumn, NewTask, PendingUpdate, Task, TaskId, TaskPatch,
    WorkspaceId,
};

#[derive(Debug)]
struct State {
    board_id: BoardId,
    board_name: String,
    workspace_id: WorkspaceId,
    columns: Vec<Column>,
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
    fail_next: u32,
    offline: bool,
    batch_calls: usize,
    beacons: Vec<Vec<PendingUpdate>>,
}

/// Thread-safe, in-memory implementation of [`RemoteStore`].
pub struct MemoryRemote {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRemote")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MemoryRemote {
    /// Seed the remote with a board, using the system clock for timestamps.
    #[must_use]
    pub fn new(board: &Board) -> Self {
        Self::with_clock(board, Arc::new(SystemClock))
    }

    /// Seed the remote with a board and an explicit clock.
    #[must_use]
    pub fn with_clock(board: &Board, clock: Arc<dyn Clock>) -> Self {
        let mut tasks = BTreeMap::new();
        let columns = board
            .columns
            .iter()
            .map(|column| {
                for task in &column.tasks {
                    tasks.insert(task.id.clone(), Task::clone(task));
                }
                let mut row = Column::clone(column);
                row.tasks.clear();
                row
            })
            .collect();

        Self {
            state: Mutex::new(State {
                board_id: board.id.clone(),
                board_name: board.name.clone(),
                workspace_id: board.workspace_id.clone(),
                columns,
                tasks,
                next_id: 1,
                fail_next: 0,
                offline: false,
                batch_calls: 0,
                beacons: Vec::new(),
            }),
            clock,
        }
    }

    /// Make the next `n` requests fail with a transport error.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    /// While offline, every request fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of `apply_batch` calls received, including failed ones.
    #[must_use]
    pub fn batch_calls(&self) -> usize {
        self.lock().batch_calls
    }

    /// Batches received through [`RemoteStore::send_beacon`].
    #[must_use]
    pub fn beacons(&self) -> Vec<Vec<PendingUpdate>> {
        self.lock().beacons.clone()
    }

    /// The remote's current view of the board.
    ///
    /// Columns are ordered by position and tasks by `(position, id)`. Task
    /// positions are reported as stored; the remote does not repair gaps.
    #[must_use]
    pub fn snapshot(&self) -> Board {
        let state = self.lock();
        let mut columns: Vec<Column> = state.columns.clone();
        columns.sort_by_key(|c| c.position);

        let columns = columns
            .into_iter()
            .map(|mut column| {
                let mut tasks: Vec<&Task> = state
                    .tasks
                    .values()
                    .filter(|t| t.column_id == column.id)
                    .collect();
                tasks.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
                column.tasks = tasks.into_iter().map(|t| Arc::new(t.clone())).collect();
                Arc::new(column)
            })
            .collect();

        Board {
            id: state.board_id.clone(),
            name: state.board_name.clone(),
            workspace_id: state.workspace_id.clone(),
            columns,
        }
    }

    /// The stored row for a task.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.lock().tasks.get(task_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(state: &mut State) -> Result<(), RemoteError> {
        if state.offline {
            return Err(RemoteError::Transport("remote is offline".into()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(RemoteError::Transport("injected failure".into()));
        }
        Ok(())
    }

    /// Apply placements to a copy of the task table; commit only if every
    /// update is valid.
    fn apply_placements(&self, state: &mut State, updates: &[PendingUpdate]) -> Result<usize, RemoteError> {
        let now = self.clock.now();
        let mut staged = state.tasks.clone();

        for update in updates {
            if !state.columns.iter().any(|c| c.id == update.column_id) {
                return Err(RemoteError::Rejected(format!(
                    "unknown column {} for task {}",
                    update.column_id, update.task_id
                )));
            }
            // Unknown tasks (deleted since the move) are skipped, not fatal.
            if let Some(task) = staged.get_mut(&update.task_id) {
                task.column_id = update.column_id.clone();
                task.position = update.position;
                task.updated_at = now;
            }
        }

        state.tasks = staged;
        Ok(updates.len())
    }
}

impl RemoteStore for MemoryRemote {
    fn apply_batch(&self, updates: &[PendingUpdate]) -> Result<BatchReceipt, RemoteError> {
        let mut state = self.lock();
        state.batch_calls += 1;
        Self::check_available(&mut state)?;

        if updates.is_empty() {
            return Err(RemoteError::Status {
                status: 400,
                body: "Invalid updates array".into(),
            });
        }

        let updated = self.apply_placements(&mut state, updates)?;
        Ok(BatchReceipt {
            success: true,
            updated,
        })
    }

    fn send_beacon(&self, updates: &[PendingUpdate]) -> bool {
        let mut state = self.lock();
        state.beacons.push(updates.to_vec());
        if !state.offline {
            // Delivery is best-effort; the sender never learns the outcome.
            let _ = self.apply_placements(&mut state, updates);
        }
        true
    }

    fn create_task(&self, request: &NewTask) -> Result<Task, RemoteError> {
        let mut state = self.lock();
        Self::check_available(&mut state)?;

        if !state.columns.iter().any(|c| c.id == request.column_id) {
            return Err(RemoteError::Status {
                status: 404,
                body: "Column not found".into(),
            });
        }

        let position = state
            .tasks
            .values()
            .filter(|t| t.column_id == request.column_id)
            .count();
        let id = TaskId::new(format!("task-{}", state.next_id));
        state.next_id += 1;

        let now = self.clock.now();
        let task = Task {
            id: id.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            column_id: request.column_id.clone(),
            position,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    fn create_column(&self, request: &NewColumn) -> Result<Column, RemoteError> {
        let mut state = self.lock();
        Self::check_available(&mut state)?;

        if request.board_id != state.board_id {
            return Err(RemoteError::Status {
                status: 404,
                body: "Board not found".into(),
            });
        }

        let column = Column {
            id: ColumnId::new(format!("column-{}", state.next_id)),
            name: request.name.clone(),
            position: state.columns.len(),
            board_id: state.board_id.clone(),
            tasks: Vec::new(),
        };
        state.next_id += 1;
        state.columns.push(column.clone());
        Ok(column)
    }

    fn delete_task(&self, task_id: &TaskId) -> Result<(), RemoteError> {
        let mut state = self.lock();
        Self::check_available(&mut state)?;

        match state.tasks.remove(task_id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::Status {
                status: 404,
                body: "Task not found".into(),
            }),
        }
    }

    fn update_task(&self, task_id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        let mut state = self.lock();
        Self::check_available(&mut state)?;

        let now = self.clock.now();
        let Some(task) = state.tasks.get_mut(task_id) else {
            return Err(RemoteError::Status {
                status: 404,
                body: "Task not found".into(),
            });
        };

        if let Some(title) = &patch.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            task.description.clone_from(description);
        }
        task.updated_at = now;
        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn seed() -> Board {
        let now = ManualClock::default().now();
        let task = |id: &str, column: &str, position| {
            Arc::new(Task {
                id: TaskId::new(id),
                title: id.to_uppercase(),
                description: None,
                column_id: ColumnId::new(column),
                position,
                created_at: now,
                updated_at: now,
            })
        };
        let column = |id: &str, position, tasks| {
            Arc::new(Column {
                id: ColumnId::new(id),
                name: id.to_uppercase(),
                position,
                board_id: BoardId::new("b1"),
                tasks,
            })
        };

        Board {
            id: BoardId::new("b1"),
            name: "Main".into(),
            workspace_id: WorkspaceId::new("ws"),
            columns: vec![
                column("a", 0, vec![task("t1", "a", 0), task("t2", "a", 1)]),
                column("b", 1, vec![]),
            ],
        }
    }

    fn remote() -> MemoryRemote {
        MemoryRemote::with_clock(&seed(), Arc::new(ManualClock::default()))
    }

    fn placement(task: &str, column: &str, position: usize) -> PendingUpdate {
        PendingUpdate::new(TaskId::new(task), ColumnId::new(column), position, 1)
    }

    #[test]
    fn snapshot_reflects_seed() {
        assert_eq!(remote().snapshot(), seed());
    }

    #[test]
    fn batch_overwrites_placement() {
        let remote = remote();
        let receipt = remote
            .apply_batch(&[placement("t1", "b", 0)])
            .expect("batch applies");
        assert_eq!(receipt.updated, 1);

        let t1 = remote.task(&TaskId::new("t1")).expect("t1 exists");
        assert_eq!(t1.column_id, ColumnId::new("b"));
        assert_eq!(t1.position, 0);
    }

    #[test]
    fn batch_with_unknown_column_applies_nothing() {
        let remote = remote();
        let err = remote
            .apply_batch(&[placement("t1", "b", 0), placement("t2", "zz", 0)])
            .expect_err("rejected");
        assert!(matches!(err, RemoteError::Rejected(_)));
        assert_eq!(remote.snapshot(), seed());
    }

    #[test]
    fn unknown_tasks_are_skipped() {
        let remote = remote();
        remote
            .apply_batch(&[placement("gone", "b", 0), placement("t2", "b", 0)])
            .expect("batch applies");
        assert_eq!(
            remote.task(&TaskId::new("t2")).expect("t2").column_id,
            ColumnId::new("b")
        );
    }

    #[test]
    fn injected_failures_are_consumed() {
        let remote = remote();
        remote.fail_next(2);
        assert!(remote.apply_batch(&[placement("t1", "b", 0)]).is_err());
        assert!(remote.apply_batch(&[placement("t1", "b", 0)]).is_err());
        assert!(remote.apply_batch(&[placement("t1", "b", 0)]).is_ok());
        assert_eq!(remote.batch_calls(), 3);
    }

    #[test]
    fn create_task_appends_to_column() {
        let remote = remote();
        let task = remote
            .create_task(&NewTask {
                column_id: ColumnId::new("a"),
                title: "New".into(),
                description: None,
                workspace_id: WorkspaceId::new("ws"),
            })
            .expect("created");
        assert_eq!(task.position, 2);
        assert_eq!(task.id, TaskId::new("task-1"));
    }

    #[test]
    fn delete_missing_task_is_404() {
        let remote = remote();
        remote.delete_task(&TaskId::new("t1")).expect("deleted");
        let err = remote.delete_task(&TaskId::new("t1")).expect_err("already gone");
        assert!(matches!(err, RemoteError::Status { status: 404, .. }));
    }

    #[test]
    fn offline_beacon_is_recorded_but_not_applied() {
        let remote = remote();
        remote.set_offline(true);
        assert!(remote.send_beacon(&[placement("t1", "b", 0)]));
        assert_eq!(remote.beacons().len(), 1);
        assert_eq!(
            remote.task(&TaskId::new("t1")).expect("t1").column_id,
            ColumnId::new("a")
        );
    }
}
