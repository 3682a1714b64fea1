//! Durable, workspace-scoped cache of the board snapshot and pending queue.
//!
//! The cache sits on top of any [`LocalStore`] (a string key/value store) and
//! keeps exactly two values per workspace:
//!
//! | key                                   | value                        |
//! |---------------------------------------|------------------------------|
//! | `kanban-board-{workspace}`            | JSON [`Board`]               |
//! | `kanban-pending-updates-{workspace}`  | JSON array of [`PendingUpdate`] |
//!
//! Reads happen once, at mount. Writes happen synchronously after every
//! state transition.
//!
//! # Corruption
//!
//! A value that can't be read or parsed is logged and treated as absent.
//! [`DurableCache::load`] never fails: the worst case is an empty snapshot,
//! after which the session falls back to server-provided initial data.

pub mod store;

use std::io;

use crate::error::ErrorCode;
use crate::lock::LockError;
use crate::model::{Board, PendingUpdate, WorkspaceId};

pub use store::{FileStore, MemoryStore};

const BOARD_KEY_PREFIX: &str = "kanban-board-";
const PENDING_KEY_PREFIX: &str = "kanban-pending-updates-";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`LocalStore`] or while encoding cache values.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error in the backing store.
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    /// Lock acquisition failed.
    #[error("cache lock error: {0}")]
    Lock(#[from] LockError),

    /// A value could not be serialized.
    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CacheError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Lock(err) => err.code(),
            Self::Io(_) | Self::Encode(_) => ErrorCode::CacheWriteFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

/// Client-local string key/value storage.
///
/// Implementations are expected to be durable across process restarts
/// ([`FileStore`]) or at least across the lifetime of the owner
/// ([`MemoryStore`]).
pub trait LocalStore {
    /// Read a value. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage can't be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the value can't be stored.
    fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Delete a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage can't be modified.
    fn remove(&mut self, key: &str) -> Result<(), CacheError>;
}

// ---------------------------------------------------------------------------
// DurableCache
// ---------------------------------------------------------------------------

/// What was recovered from the cache at mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// The cached board, if present and readable.
    pub board: Option<Board>,
    /// The cached pending queue; empty if absent or unreadable.
    pub pending: Vec<PendingUpdate>,
}

/// Board + pending queue persistence for one workspace scope.
#[derive(Debug)]
pub struct DurableCache<S> {
    store: S,
    board_key: String,
    pending_key: String,
}

impl<S: LocalStore> DurableCache<S> {
    /// Scope a store to a workspace.
    pub fn new(store: S, workspace: &WorkspaceId) -> Self {
        Self {
            store,
            board_key: board_key(workspace),
            pending_key: pending_key(workspace),
        }
    }

    /// Read the board and pending queue.
    ///
    /// Never fails; unreadable or malformed values are logged and skipped.
    #[must_use]
    pub fn load(&self) -> CacheSnapshot {
        let board = self.read_json::<Board>(&self.board_key);
        let pending = self
            .read_json::<Vec<PendingUpdate>>(&self.pending_key)
            .unwrap_or_default();

        tracing::debug!(
            board = board.is_some(),
            pending = pending.len(),
            key = %self.board_key,
            "loaded local cache"
        );

        CacheSnapshot { board, pending }
    }

    /// Persist the board snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store write fails.
    pub fn save_board(&mut self, board: &Board) -> Result<(), CacheError> {
        let json = serde_json::to_string(board)?;
        self.store.set(&self.board_key, &json)
    }

    /// Persist the pending queue.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store write fails.
    pub fn save_pending(&mut self, pending: &[PendingUpdate]) -> Result<(), CacheError> {
        let json = serde_json::to_string(pending)?;
        self.store.set(&self.pending_key, &json)
    }

    /// Forget both values for this workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the store can't delete a key.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.store.remove(&self.board_key)?;
        self.store.remove(&self.pending_key)
    }

    /// Borrow the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrow the underlying store.
    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Key under which the board is stored.
    #[must_use]
    pub fn board_key(&self) -> &str {
        &self.board_key
    }

    /// Key under which the pending queue is stored.
    #[must_use]
    pub fn pending_key(&self) -> &str {
        &self.pending_key
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, "cache read failed, treating as absent: {e}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "malformed cache value, treating as absent: {e}");
                None
            }
        }
    }
}

/// Store key for a workspace's board snapshot.
#[must_use]
pub fn board_key(workspace: &WorkspaceId) -> String {
    format!("{BOARD_KEY_PREFIX}{workspace}")
}

/// Store key for a workspace's pending queue.
#[must_use]
pub fn pending_key(workspace: &WorkspaceId) -> String {
    format!("{PENDING_KEY_PREFIX}{workspace}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoardId, ColumnId, TaskId};

    fn workspace() -> WorkspaceId {
        WorkspaceId::new("ws-1")
    }

    fn empty_board() -> Board {
        Board {
            id: BoardId::new("b1"),
            name: "Main".into(),
            workspace_id: workspace(),
            columns: Vec::new(),
        }
    }

    #[test]
    fn keys_are_scoped_by_workspace() {
        let cache = DurableCache::new(MemoryStore::new(), &workspace());
        assert_eq!(cache.board_key(), "kanban-board-ws-1");
        assert_eq!(cache.pending_key(), "kanban-pending-updates-ws-1");
    }

    #[test]
    fn empty_store_loads_empty_snapshot() {
        let cache = DurableCache::new(MemoryStore::new(), &workspace());
        assert_eq!(cache.load(), CacheSnapshot::default());
    }

    #[test]
    fn saved_values_load_back() {
        let mut cache = DurableCache::new(MemoryStore::new(), &workspace());
        let pending = vec![PendingUpdate::new(
            TaskId::new("t1"),
            ColumnId::new("c2"),
            0,
            1_700_000_000_000,
        )];

        cache.save_board(&empty_board()).expect("save board");
        cache.save_pending(&pending).expect("save pending");

        let snapshot = cache.load();
        assert_eq!(snapshot.board, Some(empty_board()));
        assert_eq!(snapshot.pending, pending);
    }

    #[test]
    fn malformed_values_are_treated_as_absent() {
        let mut store = MemoryStore::new();
        store
            .set(&board_key(&workspace()), "{not json")
            .expect("set");
        store
            .set(&pending_key(&workspace()), "[{\"taskId\": 3}]")
            .expect("set");

        let cache = DurableCache::new(store, &workspace());
        assert_eq!(cache.load(), CacheSnapshot::default());
    }

    #[test]
    fn other_workspaces_are_invisible() {
        let mut cache = DurableCache::new(MemoryStore::new(), &workspace());
        cache.save_board(&empty_board()).expect("save board");

        let store = std::mem::take(cache.store_mut());
        let other = DurableCache::new(store, &WorkspaceId::new("ws-2"));
        assert!(other.load().board.is_none());
    }

    #[test]
    fn clear_removes_both_keys() {
        let mut cache = DurableCache::new(MemoryStore::new(), &workspace());
        cache.save_board(&empty_board()).expect("save board");
        cache.save_pending(&[]).expect("save pending");
        cache.clear().expect("clear");

        assert!(cache.store().is_empty());
    }
}
