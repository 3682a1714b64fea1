//! Periodic flush scheduler for the mutation queue.
//!
//! # State machine
//!
//! ```text
//!            begin (queue non-empty)
//!   Idle ───────────────────────────▶ Flushing
//!    ▲                                   │
//!    └──────── complete (ok | err) ──────┘
//! ```
//!
//! There is no `Flushing → Flushing` edge: a flush requested while one is in
//! flight is dropped ([`BeginFlush::InFlight`]). The next periodic tick picks
//! up whatever was queued in the meantime.
//!
//! # Failure policy
//!
//! - Success: the confirmed entries leave the queue and the failure streak
//!   resets to zero.
//! - Failure: the queue is left untouched and the streak grows. When it reaches
//!   `max_failures` the outcome is flagged `escalated` (the caller shows one
//!   notice) and the streak resets, so the user isn't notified on every tick.
//!   The queue is never dropped because of failures.
//!
//! There is no backoff: retries happen on the regular timer.
//!
//! # Timer
//!
//! The scheduler owns its timer state. [`SyncScheduler::start`] arms it and
//! [`SyncScheduler::poll`] reports when a tick is due; the caller drives
//! time (an event loop, a `watch` command, or a test clock).

use std::time::Duration;

use crate::model::PendingUpdate;
use crate::queue::MutationQueue;
use crate::remote::{BatchReceipt, RemoteError, RemoteStore};

/// Default period between automatic flushes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of consecutive failures before the user is notified.
pub const DEFAULT_MAX_FAILURES: u32 = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether a flush is currently on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Flushing,
}

/// Proof that a flush was started; must be handed back to
/// [`SyncScheduler::complete`].
#[derive(Debug)]
#[must_use = "an unfinished flush keeps the scheduler in the Flushing state"]
pub struct FlushTicket {
    batch: Vec<PendingUpdate>,
    started_at: i64,
}

impl FlushTicket {
    /// The updates to send.
    #[must_use]
    pub fn batch(&self) -> &[PendingUpdate] {
        &self.batch
    }

    /// When the flush started (epoch milliseconds).
    #[must_use]
    pub const fn started_at(&self) -> i64 {
        self.started_at
    }
}

/// Result of asking the scheduler to start a flush.
#[derive(Debug)]
pub enum BeginFlush {
    /// Nothing queued; trivially successful.
    Empty,
    /// Another flush is in flight; this request is dropped.
    InFlight,
    /// A flush was started.
    Started(FlushTicket),
}

/// What a flush attempt amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to send.
    Empty,
    /// Dropped by the re-entrancy guard.
    Dropped,
    /// The remote confirmed `count` updates.
    Synced { count: usize },
    /// The remote call failed; the queue was kept.
    Failed {
        error: RemoteError,
        /// Length of the failure streak including this one (before any reset).
        consecutive: u32,
        /// The streak hit the limit; the user should be told once.
        escalated: bool,
    },
}

impl FlushOutcome {
    /// `true` for [`Self::Empty`] and [`Self::Synced`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Empty | Self::Synced { .. })
    }

    /// `true` if this outcome should surface a notification.
    #[must_use]
    pub const fn is_escalated(&self) -> bool {
        matches!(self, Self::Failed { escalated: true, .. })
    }
}

// ---------------------------------------------------------------------------
// SyncScheduler
// ---------------------------------------------------------------------------

/// Owns the sync timer, the in-flight guard and the failure streak.
#[derive(Debug, Clone)]
pub struct SyncScheduler {
    interval_ms: i64,
    max_failures: u32,
    state: SchedulerState,
    running: bool,
    next_tick_at: Option<i64>,
    consecutive_failures: u32,
    last_synced_at: Option<i64>,
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL, DEFAULT_MAX_FAILURES)
    }
}

impl SyncScheduler {
    /// Create a stopped scheduler.
    ///
    /// `max_failures` is clamped to at least 1.
    #[must_use]
    pub fn new(interval: Duration, max_failures: u32) -> Self {
        Self {
            interval_ms: i64::try_from(interval.as_millis()).unwrap_or(i64::MAX),
            max_failures: max_failures.max(1),
            state: SchedulerState::Idle,
            running: false,
            next_tick_at: None,
            consecutive_failures: 0,
            last_synced_at: None,
        }
    }

    /// Arm the periodic timer; the first tick is due one interval from `now`.
    /// Calling `start` on a running scheduler re-arms it.
    pub fn start(&mut self, now: i64) {
        self.running = true;
        self.next_tick_at = Some(now.saturating_add(self.interval_ms));
        tracing::debug!(interval_ms = self.interval_ms, "sync timer started");
    }

    /// Disarm the timer. An in-flight flush is not cancelled.
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("sync timer stopped");
        }
        self.running = false;
        self.next_tick_at = None;
    }

    /// Returns `true` once per elapsed interval while running.
    ///
    /// Missed ticks are not replayed: after a long pause a single tick fires
    /// and the next one is scheduled a full interval after `now`.
    pub fn poll(&mut self, now: i64) -> bool {
        match self.next_tick_at {
            Some(due) if self.running && now >= due => {
                self.next_tick_at = Some(now.saturating_add(self.interval_ms));
                true
            }
            _ => false,
        }
    }

    /// Try to start a flush of `queue`.
    pub fn begin(&mut self, queue: &MutationQueue, now: i64) -> BeginFlush {
        if self.state == SchedulerState::Flushing {
            tracing::debug!("flush already in flight; request dropped");
            return BeginFlush::InFlight;
        }
        if queue.is_empty() {
            return BeginFlush::Empty;
        }

        self.state = SchedulerState::Flushing;
        BeginFlush::Started(FlushTicket {
            batch: queue.batch(),
            started_at: now,
        })
    }

    /// Finish a flush started with [`Self::begin`].
    ///
    /// On success the ticket's entries are acknowledged on `queue`; entries
    /// re-queued while the flush was in flight stay.
    pub fn complete(
        &mut self,
        ticket: FlushTicket,
        result: Result<BatchReceipt, RemoteError>,
        queue: &mut MutationQueue,
        now: i64,
    ) -> FlushOutcome {
        self.state = SchedulerState::Idle;

        match result {
            Ok(_receipt) => {
                let count = queue.acknowledge(&ticket.batch);
                self.consecutive_failures = 0;
                self.last_synced_at = Some(now);
                tracing::info!(
                    count,
                    remaining = queue.len(),
                    elapsed_ms = now.saturating_sub(ticket.started_at),
                    "synced task updates"
                );
                FlushOutcome::Synced { count }
            }
            Err(error) => {
                self.consecutive_failures += 1;
                let consecutive = self.consecutive_failures;
                let escalated = consecutive >= self.max_failures;
                tracing::warn!(
                    attempt = consecutive,
                    max = self.max_failures,
                    pending = queue.len(),
                    "sync failed: {error}"
                );
                if escalated {
                    self.consecutive_failures = 0;
                }
                FlushOutcome::Failed {
                    error,
                    consecutive,
                    escalated,
                }
            }
        }
    }

    /// Flush synchronously: begin, call the remote, complete.
    pub fn flush<R: RemoteStore + ?Sized>(
        &mut self,
        queue: &mut MutationQueue,
        remote: &R,
        now: i64,
    ) -> FlushOutcome {
        match self.begin(queue, now) {
            BeginFlush::Empty => FlushOutcome::Empty,
            BeginFlush::InFlight => FlushOutcome::Dropped,
            BeginFlush::Started(ticket) => {
                let result = remote.apply_batch(ticket.batch());
                self.complete(ticket, result, queue, now)
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    #[must_use]
    pub const fn next_tick_at(&self) -> Option<i64> {
        self.next_tick_at
    }

    #[must_use]
    pub const fn last_synced_at(&self) -> Option<i64> {
        self.last_synced_at
    }

    #[must_use]
    pub const fn interval_ms(&self) -> i64 {
        self.interval_ms
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
