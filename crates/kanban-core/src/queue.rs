//! Coalescing queue of task placements awaiting remote confirmation.
//!
//! The queue holds at most one [`PendingUpdate`] per task. Dragging the same
//! task ten times before a sync leaves exactly one entry, carrying the final
//! placement, so queue length is bounded by the number of distinct tasks
//! touched since the last successful flush.
//!
//! Entries are kept in the order their latest write happened. Reading a batch
//! does not consume it: entries leave the queue only once the remote store has
//! confirmed them ([`MutationQueue::acknowledge`]) or on an explicit
//! [`MutationQueue::clear`].

use crate::model::{PendingUpdate, TaskId};

/// Ordered, deduplicating set of pending task placements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationQueue {
    entries: Vec<PendingUpdate>,
}

impl MutationQueue {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rebuild a queue from persisted entries.
    ///
    /// Duplicates in the input (possible only if the persisted value was
    /// hand-edited or written by an older client) are coalesced, keeping the
    /// last one.
    #[must_use]
    pub fn from_entries(entries: Vec<PendingUpdate>) -> Self {
        let mut queue = Self::new();
        for entry in entries {
            queue.enqueue(entry);
        }
        queue
    }

    /// Add an update, replacing any queued entry for the same task.
    pub fn enqueue(&mut self, update: PendingUpdate) {
        self.entries.retain(|u| u.task_id != update.task_id);
        self.entries.push(update);
    }

    /// Copy of the current entries, in queue order. The queue is unchanged.
    #[must_use]
    pub fn batch(&self) -> Vec<PendingUpdate> {
        self.entries.clone()
    }

    /// Remove exactly the entries of a confirmed batch.
    ///
    /// An entry that was replaced after the batch was taken is not part of
    /// the confirmation and stays queued, even if its timestamp matches.
    ///
    /// Returns the number of entries removed.
    pub fn acknowledge(&mut self, confirmed: &[PendingUpdate]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|queued| !confirmed.iter().any(|c| c.same_entry(queued)));
        before - self.entries.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Queued entry for a task, if any.
    #[must_use]
    pub fn get(&self, task_id: &TaskId) -> Option<&PendingUpdate> {
        self.entries.iter().find(|u| &u.task_id == task_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in queue order.
    #[must_use]
    pub fn as_slice(&self) -> &[PendingUpdate] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingUpdate> {
        self.entries.iter()
    }
}
