//! Cross-process write lock for a cache directory.
//!
//! Several `kb` processes may share one `.kanban/cache/`. Each value write
//! takes the directory's lock file for the span of its temp-file rename.
//! The lock serializes renames; it does not order writers, so the last one
//! still wins.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::ErrorCode;

/// Name of the lock file inside a cache directory.
pub const LOCK_FILE_NAME: &str = "lock";

const RETRY_EVERY: Duration = Duration::from_millis(10);

/// Failure to take a cache directory's write lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another process kept the cache locked past the timeout.
    #[error("{code}: cache {path} still locked after {waited:?}", code = ErrorCode::LockContention.code(), path = .dir.display())]
    Contended { dir: PathBuf, waited: Duration },

    /// The cache directory or its lock file couldn't be opened.
    #[error("{code}: cannot open lock in {path}: {source}", code = ErrorCode::CacheWriteFailed.code(), path = .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Contended { .. } => ErrorCode::LockContention,
            Self::Io { .. } => ErrorCode::CacheWriteFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Cache directory the lock belongs to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        match self {
            Self::Contended { dir, .. } | Self::Io { dir, .. } => dir,
        }
    }
}

/// Exclusive hold on a cache directory. Unlocked on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    dir: PathBuf,
}

impl StoreLock {
    /// Lock `dir` for writing, creating the directory if needed.
    ///
    /// Retries every 10 ms until `timeout` has passed.
    ///
    /// # Errors
    ///
    /// [`LockError::Contended`] when another holder outlasts `timeout`,
    /// [`LockError::Io`] when the directory or lock file can't be opened.
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            dir: dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE_NAME))
            .map_err(io_err)?;

        let started = Instant::now();
        while file.try_lock_exclusive().is_err() {
            let waited = started.elapsed();
            if waited >= timeout {
                tracing::debug!(dir = %dir.display(), ?waited, "cache lock contended");
                return Err(LockError::Contended {
                    dir: dir.to_path_buf(),
                    waited,
                });
            }
            thread::sleep(RETRY_EVERY);
        }

        Ok(Self {
            file,
            dir: dir.to_path_buf(),
        })
    }

    /// Cache directory this lock guards.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(dir = %self.dir.display(), "failed to unlock cache: {err}");
        }
    }
}
