//! Contract of the remote store the sync engine talks to.
//!
//! The remote store is an external collaborator: this crate consumes it and
//! never implements the server side. [`memory::MemoryRemote`] is an in-process
//! stand-in that honours the same contract, for tests and local tooling.
//!
//! # Batch semantics
//!
//! [`RemoteStore::apply_batch`] must be all-or-nothing from the caller's point
//! of view: on `Err` the whole batch is treated as unapplied and will be sent
//! again. Implementations must therefore be idempotent per task; applying the
//! same final `(column_id, position)` twice is harmless.

pub mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::{Column, NewColumn, NewTask, PendingUpdate, Task, TaskId, TaskPatch};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a remote round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never got a response (connection refused, DNS, timeout).
    #[error("remote transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The remote refused the request for a domain reason.
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// The response body didn't match the expected shape.
    #[error("remote response could not be decoded: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::RemoteUnreachable,
            Self::Status { .. } | Self::Rejected(_) => ErrorCode::RemoteRejected,
            Self::Decode(_) => ErrorCode::RemoteDecodeFailed,
        }
    }
}

/// Acknowledgement of an applied batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
    #[serde(default)]
    pub success: bool,
    /// Number of updates the remote processed.
    #[serde(default)]
    pub updated: usize,
}

// ---------------------------------------------------------------------------
// RemoteStore
// ---------------------------------------------------------------------------

/// Operations the sync engine needs from the remote store.
pub trait RemoteStore {
    /// Apply task placements atomically.
    ///
    /// # Errors
    ///
    /// Any error means none of the batch should be considered applied.
    fn apply_batch(&self, updates: &[PendingUpdate]) -> Result<BatchReceipt, RemoteError>;

    /// Hand a batch to a fire-and-forget delivery channel.
    ///
    /// Must return promptly without waiting for the remote. Returns `true`
    /// if the batch was queued for delivery, `false` if it could not even be
    /// queued. Delivery itself is not confirmed.
    fn send_beacon(&self, updates: &[PendingUpdate]) -> bool;

    /// Create a task; returns the canonical record with server-assigned fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote refuses or can't be reached.
    fn create_task(&self, request: &NewTask) -> Result<Task, RemoteError>;

    /// Create a column; returns the canonical record.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote refuses or can't be reached.
    fn create_column(&self, request: &NewColumn) -> Result<Column, RemoteError>;

    /// Delete a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote refuses or can't be reached.
    fn delete_task(&self, task_id: &TaskId) -> Result<(), RemoteError>;

    /// Update content fields of a task; returns the canonical record.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote refuses or can't be reached.
    fn update_task(&self, task_id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for Arc<R> {
    fn apply_batch(&self, updates: &[PendingUpdate]) -> Result<BatchReceipt, RemoteError> {
        (**self).apply_batch(updates)
    }

    fn send_beacon(&self, updates: &[PendingUpdate]) -> bool {
        (**self).send_beacon(updates)
    }

    fn create_task(&self, request: &NewTask) -> Result<Task, RemoteError> {
        (**self).create_task(request)
    }

    fn create_column(&self, request: &NewColumn) -> Result<Column, RemoteError> {
        (**self).create_column(request)
    }

    fn delete_task(&self, task_id: &TaskId) -> Result<(), RemoteError> {
        (**self).delete_task(task_id)
    }

    fn update_task(&self, task_id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        (**self).update_task(task_id, patch)
    }
}
