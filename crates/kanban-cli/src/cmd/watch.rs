//! `kb watch`: keep the sync timer running in the foreground.
//!
//! The session stays on this thread. Batches travel to a worker thread that
//! owns a clone of the HTTP client, so moves made by other `kb` invocations
//! (picked up via the shared cache) keep landing while a request is on the
//! wire. On a normal exit the remaining queue is handed to the beacon.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use clap::Args;
use kanban_core::config::EffectiveConfig;
use kanban_core::model::PendingUpdate;
use kanban_core::remote::{BatchReceipt, RemoteError, RemoteStore};
use kanban_core::sync::{BeginFlush, FlushOutcome, FlushTicket};
use serde::Serialize;

use crate::cmd::sync::SyncReport;
use crate::context::{CliSession, open_session};
use crate::output::{OutputMode, pretty_kv, render};

const POLL_STEP: Duration = Duration::from_millis(250);
const BEACON_GRACE: Duration = Duration::from_secs(2);

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Override the configured sync interval.
    #[arg(long, value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Stop after this many seconds. Runs until killed when absent.
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchReport {
    flushes: usize,
    synced: usize,
    failures: usize,
    pending: usize,
    beacon_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<SyncReport>,
}

impl WatchReport {
    fn record(&mut self, outcome: &FlushOutcome) {
        self.flushes += 1;
        match outcome {
            FlushOutcome::Synced { count } => self.synced += count,
            FlushOutcome::Failed { .. } => self.failures += 1,
            FlushOutcome::Empty | FlushOutcome::Dropped => {}
        }
        self.last = Some(SyncReport::from_outcome(outcome));
    }
}

type BatchResult = Result<BatchReceipt, RemoteError>;

/// Execute `kb watch`.
///
/// # Errors
///
/// Returns an error if the session can't be opened or the sync worker
/// can't be started.
pub fn run_watch(
    args: &WatchArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(secs) = args.interval_secs {
        config.project.sync.interval_secs = secs.max(1);
    }
    let mut session = open_session(project_root, &config, output)?;

    let (batch_tx, batch_rx) = mpsc::channel::<Vec<PendingUpdate>>();
    let (result_tx, result_rx) = mpsc::channel::<BatchResult>();
    let remote = session.remote().clone();
    let worker = std::thread::Builder::new()
        .name("kanban-sync".into())
        .spawn(move || {
            for batch in batch_rx {
                if result_tx.send(remote.apply_batch(&batch)).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start sync worker")?;

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let step = POLL_STEP.min(Duration::from_secs(config.project.sync.interval_secs.max(1)));

    tracing::info!(
        workspace = %session.workspace(),
        interval_secs = config.project.sync.interval_secs,
        pending = session.pending().len(),
        "watching"
    );
    session.start();

    let mut report = WatchReport::default();
    let mut in_flight: Option<FlushTicket> = None;

    while deadline.is_none_or(|at| Instant::now() < at) {
        session.reload();

        if session.due() {
            match session.begin_flush() {
                BeginFlush::Started(ticket) => {
                    if batch_tx.send(ticket.batch().to_vec()).is_err() {
                        anyhow::bail!("sync worker stopped unexpectedly");
                    }
                    in_flight = Some(ticket);
                }
                BeginFlush::InFlight => tracing::debug!("tick skipped: flush in flight"),
                BeginFlush::Empty => tracing::trace!("tick: nothing queued"),
            }
        }

        match result_rx.recv_timeout(step) {
            Ok(result) => {
                if let Some(ticket) = in_flight.take() {
                    // Moves made elsewhere during the round trip must survive
                    // the queue write that follows.
                    session.reload();
                    finish(&mut session, ticket, result, &mut report);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("sync worker stopped unexpectedly");
            }
        }
    }

    drop(batch_tx);
    if let Some(ticket) = in_flight.take() {
        let wait = Duration::from_secs(config.project.remote.timeout_secs.max(1));
        match result_rx.recv_timeout(wait) {
            Ok(result) => finish(&mut session, ticket, result, &mut report),
            Err(err) => tracing::warn!("last flush did not finish: {err}"),
        }
    }
    if worker.join().is_err() {
        tracing::warn!("sync worker panicked");
    }

    report.beacon_sent = session.teardown();
    report.pending = session.pending().len();
    let unsettled = session.remote().settle_beacons(BEACON_GRACE);
    if unsettled > 0 {
        tracing::warn!(unsettled, "exit beacon still in flight");
    }

    render(output, &report, |r, w| {
        writeln!(w, "watch stopped")?;
        pretty_kv(w, "flushes", r.flushes.to_string())?;
        pretty_kv(w, "synced", r.synced.to_string())?;
        pretty_kv(w, "failures", r.failures.to_string())?;
        pretty_kv(w, "pending", r.pending.to_string())?;
        if r.beacon_sent {
            pretty_kv(w, "beacon", "sent")?;
        }
        Ok(())
    })
}

fn finish(
    session: &mut CliSession,
    ticket: FlushTicket,
    result: BatchResult,
    report: &mut WatchReport,
) {
    let outcome = session.complete_flush(ticket, result);
    match &outcome {
        FlushOutcome::Synced { count } => {
            tracing::info!(count, pending = session.pending().len(), "synced");
        }
        FlushOutcome::Failed {
            error, consecutive, ..
        } => {
            tracing::warn!(consecutive, code = %error.code(), "sync failed: {error}");
        }
        FlushOutcome::Empty | FlushOutcome::Dropped => {}
    }
    report.record(&outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_tallies_outcomes() {
        let mut report = WatchReport::default();
        report.record(&FlushOutcome::Synced { count: 2 });
        report.record(&FlushOutcome::Failed {
            error: RemoteError::Transport("down".into()),
            consecutive: 1,
            escalated: false,
        });
        report.record(&FlushOutcome::Synced { count: 1 });
        assert_eq!(report.flushes, 3);
        assert_eq!(report.synced, 3);
        assert_eq!(report.failures, 1);
        assert_eq!(report.last.map(|l| l.result), Some("synced"));
    }
}
