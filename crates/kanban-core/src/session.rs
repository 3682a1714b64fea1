//! The per-workspace session: board snapshot, queue, scheduler and cache.
//!
//! A [`KanbanSession`] is the single logical owner of one workspace's state.
//! Every state transition follows the same shape:
//!
//! 1. compute the next board with a pure [`crate::reducer`] function,
//! 2. swap it in (no-ops keep the same `Arc`),
//! 3. persist board and queue to the [`DurableCache`].
//!
//! Persistence failures are logged and never undo a transition; the worst
//! case is that a restart resumes from an older snapshot.
//!
//! Moves go through the [`MutationQueue`] and reach the remote on the next
//! flush. Create/delete/update are direct round trips: the board only changes
//! once the remote has answered.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, DurableCache, LocalStore};
use crate::clock::{Clock, SystemClock};
use crate::error::ErrorCode;
use crate::model::{
    Board, Column, ColumnId, NewColumn, NewTask, PendingUpdate, Task, TaskId, TaskPatch,
    WorkspaceId,
};
use crate::notify::{LogNotifier, Notice, Notifier, SYNC_FAILED_MESSAGE};
use crate::queue::MutationQueue;
use crate::reducer;
use crate::remote::{BatchReceipt, RemoteError, RemoteStore};
use crate::sync::{
    BeginFlush, DEFAULT_MAX_FAILURES, DEFAULT_SYNC_INTERVAL, FlushOutcome, FlushTicket,
    SchedulerState, SyncScheduler, SyncStatus,
};

// ---------------------------------------------------------------------------
// Options & errors
// ---------------------------------------------------------------------------

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Period of the automatic flush.
    pub sync_interval: Duration,
    /// Consecutive flush failures before the user is notified.
    pub max_failures: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

/// Failure of a direct (non-queued) board operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrudError {
    /// The session has no board to operate on.
    #[error("no board loaded")]
    NoBoard,

    /// The remote round trip failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl CrudError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoBoard => ErrorCode::NoBoardLoaded,
            Self::Remote(err) => err.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// KanbanSession
// ---------------------------------------------------------------------------

/// Owner of one workspace's board, pending queue and sync timer.
pub struct KanbanSession<S, R> {
    workspace: WorkspaceId,
    cache: DurableCache<S>,
    remote: R,
    board: Option<Arc<Board>>,
    queue: MutationQueue,
    scheduler: SyncScheduler,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    loading: bool,
    closed: bool,
}

impl<S: LocalStore, R: RemoteStore> KanbanSession<S, R> {
    /// Restore a session for `workspace`.
    ///
    /// A cached board takes precedence over `initial`; the cached pending
    /// queue is restored as-is. A board whose task positions aren't dense is
    /// renumbered before use. The timer is not started.
    pub fn mount(
        workspace: WorkspaceId,
        initial: Option<Board>,
        store: S,
        remote: R,
        options: SessionOptions,
    ) -> Self {
        let cache = DurableCache::new(store, &workspace);
        let snapshot = cache.load();

        let from_cache = snapshot.board.is_some();
        let board = snapshot.board.or(initial).map(|board| {
            let board = Arc::new(board);
            if let Err(violation) = reducer::check_density(&board) {
                tracing::warn!(
                    workspace = %workspace,
                    from_cache,
                    "board positions not dense, renumbering: {violation}"
                );
                reducer::normalize(&board).unwrap_or(board)
            } else {
                board
            }
        });

        let queue = MutationQueue::from_entries(snapshot.pending);
        tracing::info!(
            workspace = %workspace,
            from_cache,
            has_board = board.is_some(),
            pending = queue.len(),
            "mounted kanban session"
        );

        let mut session = Self {
            workspace,
            cache,
            remote,
            board,
            queue,
            scheduler: SyncScheduler::new(options.sync_interval, options.max_failures),
            notifier: Box::new(LogNotifier),
            clock: Arc::new(SystemClock),
            loading: false,
            closed: false,
        };
        session.persist_board();
        session
    }

    /// Replace the notifier (defaults to [`LogNotifier`]).
    #[must_use]
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Replace the clock (defaults to [`SystemClock`]).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // -- Accessors ---------------------------------------------------------

    /// Current board snapshot. Compare with `Arc::ptr_eq` to detect change.
    #[must_use]
    pub fn board(&self) -> Option<Arc<Board>> {
        self.board.clone()
    }

    #[must_use]
    pub const fn pending(&self) -> &MutationQueue {
        &self.queue
    }

    #[must_use]
    pub const fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    #[must_use]
    pub const fn cache(&self) -> &DurableCache<S> {
        &self.cache
    }

    #[must_use]
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            pending: self.queue.len(),
            syncing: self.scheduler.state() == SchedulerState::Flushing,
            loading: self.loading,
            consecutive_failures: self.scheduler.consecutive_failures(),
            timer_running: self.scheduler.is_running(),
            last_synced_at: self.scheduler.last_synced_at(),
        }
    }

    /// Re-read board and queue from the cache, picking up writes made by
    /// another handle on the same workspace. Sync state is kept.
    ///
    /// A missing or unreadable cached board leaves the current one in place.
    pub fn reload(&mut self) {
        let snapshot = self.cache.load();
        if let Some(board) = snapshot.board {
            let board = Arc::new(board);
            self.board = Some(reducer::normalize(&board).unwrap_or(board));
        }
        self.queue = MutationQueue::from_entries(snapshot.pending);
        tracing::debug!(pending = self.queue.len(), "reloaded session from cache");
    }

    // -- Moves -------------------------------------------------------------

    /// Move a task optimistically and queue the placement for sync.
    ///
    /// Returns `false` (and changes nothing) if there is no board, or the
    /// task or target column is unknown.
    pub fn move_task(
        &mut self,
        task_id: &TaskId,
        column_id: &ColumnId,
        position: usize,
    ) -> bool {
        let Some(board) = &self.board else {
            tracing::debug!(task = %task_id, "move ignored: no board loaded");
            return false;
        };
        let Some(moved) = reducer::move_task(board, task_id, column_id, position) else {
            tracing::debug!(task = %task_id, column = %column_id, "move ignored: unknown task or column");
            return false;
        };

        let update = PendingUpdate::new(
            moved.task.id.clone(),
            moved.task.column_id.clone(),
            moved.task.position,
            self.clock.now_millis(),
        );
        tracing::debug!(
            task = %update.task_id,
            column = %update.column_id,
            position = update.position,
            "task moved"
        );

        self.board = Some(moved.board);
        self.queue.enqueue(update);
        self.persist_board();
        self.persist_pending();
        true
    }

    // -- Sync --------------------------------------------------------------

    /// Arm the periodic flush timer.
    pub fn start(&mut self) {
        self.scheduler.start(self.clock.now_millis());
    }

    /// Disarm the periodic flush timer.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Whether the periodic tick is due; arms the next one if so.
    ///
    /// Drivers that run the round trip themselves call this, then
    /// [`Self::begin_flush`].
    pub fn due(&mut self) -> bool {
        self.scheduler.poll(self.clock.now_millis())
    }

    /// Flush if the periodic tick is due. `None` when it isn't.
    pub fn tick(&mut self) -> Option<FlushOutcome> {
        if self.due() { Some(self.force_sync()) } else { None }
    }

    /// Flush now, regardless of the timer.
    pub fn force_sync(&mut self) -> FlushOutcome {
        let now = self.clock.now_millis();
        let outcome = self.scheduler.flush(&mut self.queue, &self.remote, now);
        self.after_flush(&outcome);
        outcome
    }

    /// Start a flush whose round trip the caller performs.
    ///
    /// Pair with [`Self::complete_flush`]. Moves may continue in between.
    pub fn begin_flush(&mut self) -> BeginFlush {
        self.scheduler.begin(&self.queue, self.clock.now_millis())
    }

    /// Finish a flush started with [`Self::begin_flush`].
    pub fn complete_flush(
        &mut self,
        ticket: FlushTicket,
        result: Result<BatchReceipt, RemoteError>,
    ) -> FlushOutcome {
        let now = self.clock.now_millis();
        let outcome = self.scheduler.complete(ticket, result, &mut self.queue, now);
        self.after_flush(&outcome);
        outcome
    }

    fn after_flush(&mut self, outcome: &FlushOutcome) {
        match outcome {
            FlushOutcome::Synced { .. } => self.persist_pending(),
            FlushOutcome::Failed {
                escalated: true, ..
            } => {
                tracing::error!(
                    workspace = %self.workspace,
                    code = %ErrorCode::SyncExhausted,
                    pending = self.queue.len(),
                    "sync keeps failing"
                );
                self.notifier.notify(Notice::error(SYNC_FAILED_MESSAGE));
            }
            _ => {}
        }
    }

    /// Shut the session down.
    ///
    /// Stops the timer and, if placements are still queued, hands them to
    /// the remote's fire-and-forget channel exactly once. The queue stays in
    /// the cache so the next mount retries anything the beacon didn't
    /// deliver. Later calls do nothing.
    ///
    /// Returns `true` if a beacon was sent.
    pub fn teardown(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.scheduler.stop();

        if self.queue.is_empty() {
            return false;
        }
        let queued = self.remote.send_beacon(self.queue.as_slice());
        tracing::info!(
            pending = self.queue.len(),
            queued,
            "exit flush handed off"
        );
        self.persist_pending();
        queued
    }

    // -- Direct operations -------------------------------------------------

    /// Create a task in `column_id` on the remote, then add it locally.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoBoard`] without a board; [`CrudError::Remote`] if the
    /// remote call fails, in which case the board is unchanged.
    pub fn create_task(
        &mut self,
        column_id: &ColumnId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, CrudError> {
        self.require_board()?;
        let request = NewTask {
            column_id: column_id.clone(),
            title: title.to_string(),
            description: description.map(str::to_string),
            workspace_id: self.workspace.clone(),
        };

        let task = self.round_trip("create task", |remote| remote.create_task(&request))?;
        if self.apply(|board| reducer::insert_task(board, task.clone())) {
            self.notifier.notify(Notice::success("Task created successfully"));
        } else {
            tracing::warn!(
                task = %task.id,
                column = %task.column_id,
                "created task's column is not on the local board; not shown until reload"
            );
        }
        Ok(task)
    }

    /// Create a column at the end of the board.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoBoard`] without a board; [`CrudError::Remote`] if the
    /// remote call fails, in which case the board is unchanged.
    pub fn create_column(&mut self, name: &str) -> Result<Column, CrudError> {
        let board = self.require_board()?;
        let request = NewColumn {
            board_id: board.id.clone(),
            name: name.to_string(),
            position: board.columns.len(),
            workspace_id: self.workspace.clone(),
        };

        let column = self.round_trip("create column", |remote| remote.create_column(&request))?;
        self.apply(|board| Some(reducer::append_column(board, column.clone())));
        self.notifier.notify(Notice::success("Column created successfully"));
        Ok(column)
    }

    /// Delete a task on the remote, then drop it locally.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoBoard`] without a board; [`CrudError::Remote`] if the
    /// remote call fails, in which case the board is unchanged.
    pub fn delete_task(&mut self, task_id: &TaskId) -> Result<(), CrudError> {
        self.require_board()?;
        self.round_trip("delete task", |remote| remote.delete_task(task_id))?;
        self.apply(|board| reducer::remove_task(board, task_id));
        self.notifier.notify(Notice::success("Task deleted successfully"));
        Ok(())
    }

    /// Update a task's content on the remote, then merge the result locally.
    ///
    /// Local placement is kept: while a move is queued the local column and
    /// position are newer than the remote's.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoBoard`] without a board; [`CrudError::Remote`] if the
    /// remote call fails, in which case the board is unchanged.
    pub fn update_task(&mut self, task_id: &TaskId, patch: &TaskPatch) -> Result<Task, CrudError> {
        self.require_board()?;
        let task = self.round_trip("update task", |remote| remote.update_task(task_id, patch))?;
        self.apply(|board| reducer::merge_task(board, &task));
        self.notifier.notify(Notice::success("Task updated successfully"));
        Ok(task)
    }

    // -- Internals ---------------------------------------------------------

    fn require_board(&self) -> Result<Arc<Board>, CrudError> {
        self.board.clone().ok_or(CrudError::NoBoard)
    }

    /// Run one remote call with the loading flag raised; report failures.
    fn round_trip<T>(
        &mut self,
        action: &'static str,
        call: impl FnOnce(&R) -> Result<T, RemoteError>,
    ) -> Result<T, CrudError> {
        self.loading = true;
        let result = call(&self.remote);
        self.loading = false;

        result.map_err(|err| {
            tracing::warn!(code = %err.code(), "failed to {action}: {err}");
            self.notifier.notify(Notice::error(format!("Failed to {action}")));
            CrudError::Remote(err)
        })
    }

    /// Swap in the reducer's result (if any) and persist it.
    ///
    /// Returns `false` when the reducer had nothing to apply.
    fn apply(&mut self, reduce: impl FnOnce(&Arc<Board>) -> Option<Arc<Board>>) -> bool {
        let Some(board) = &self.board else {
            return false;
        };
        match reduce(board) {
            Some(next) => {
                self.board = Some(next);
                self.persist_board();
                true
            }
            None => {
                tracing::debug!("remote result did not change the local board");
                false
            }
        }
    }

    fn persist_board(&mut self) {
        if let Some(board) = &self.board {
            let result = self.cache.save_board(board);
            log_cache_error("board", result);
        }
    }

    fn persist_pending(&mut self) {
        let result = self.cache.save_pending(self.queue.as_slice());
        log_cache_error("pending updates", result);
    }
}

fn log_cache_error(what: &str, result: Result<(), CacheError>) {
    if let Err(err) = result {
        tracing::warn!(code = %err.code(), "failed to persist {what}: {err}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
