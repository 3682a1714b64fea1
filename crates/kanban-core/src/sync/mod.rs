//! Background reconciliation of queued task placements.
//!
//! [`scheduler::SyncScheduler`] decides *when* to flush and tracks the
//! failure streak; the [`crate::remote::RemoteStore`] does the round trip.
//! [`SyncStatus`] is the read-only summary surfaced to callers.

pub mod scheduler;

pub use scheduler::{
    BeginFlush, DEFAULT_MAX_FAILURES, DEFAULT_SYNC_INTERVAL, FlushOutcome, FlushTicket,
    SchedulerState, SyncScheduler,
};

use serde::Serialize;

/// Snapshot of a session's sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Number of placements waiting for remote confirmation.
    pub pending: usize,
    /// A flush is on the wire.
    pub syncing: bool,
    /// A CRUD round trip is in progress.
    pub loading: bool,
    pub consecutive_failures: u32,
    pub timer_running: bool,
    /// Epoch milliseconds of the last confirmed flush in this session.
    pub last_synced_at: Option<i64>,
}
