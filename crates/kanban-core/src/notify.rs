//! User-facing, non-blocking notifications ("toasts").
//!
//! The session reports outcomes the user should see (CRUD success/failure,
//! repeated sync failure) through a [`Notifier`]. Notifications are transient
//! and never block the caller.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

/// A single user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// Message shown once the sync scheduler gives up on a streak of failures.
pub const SYNC_FAILED_MESSAGE: &str = "Failed to sync changes. Please refresh the page.";

/// Sink for user-visible notices.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            Level::Success => tracing::info!(notice = %notice.message),
            Level::Error => tracing::error!(notice = %notice.message),
        }
    }
}

/// Collects notices in a shared buffer.
///
/// Clones share the buffer: hand one to the session, keep one to inspect.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded notices of one level.
    #[must_use]
    pub fn with_level(&self, level: Level) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_shares_buffer_between_clones() {
        let recorder = RecordingNotifier::new();
        let handle = recorder.clone();

        handle.notify(Notice::success("Task created successfully"));
        handle.notify(Notice::error("Failed to delete task"));

        assert_eq!(recorder.notices().len(), 2);
        assert_eq!(recorder.with_level(Level::Error)[0].message, "Failed to delete task");
        assert_eq!(recorder.take().len(), 2);
        assert!(handle.notices().is_empty());
    }
}
