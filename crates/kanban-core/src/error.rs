use std::fmt;

/// Machine-readable error codes shared by the core and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    NoBoardLoaded,
    TaskNotFound,
    ColumnNotFound,
    CacheWriteFailed,
    LockContention,
    RemoteUnreachable,
    RemoteRejected,
    RemoteDecodeFailed,
    SyncExhausted,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::NoBoardLoaded => "E2001",
            Self::TaskNotFound => "E2002",
            Self::ColumnNotFound => "E2003",
            Self::CacheWriteFailed => "E3001",
            Self::LockContention => "E3002",
            Self::RemoteUnreachable => "E4001",
            Self::RemoteRejected => "E4002",
            Self::RemoteDecodeFailed => "E4003",
            Self::SyncExhausted => "E4004",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Workspace not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::NoBoardLoaded => "No board loaded",
            Self::TaskNotFound => "Task not found",
            Self::ColumnNotFound => "Column not found",
            Self::CacheWriteFailed => "Local cache write failed",
            Self::LockContention => "Lock contention",
            Self::RemoteUnreachable => "Remote store unreachable",
            Self::RemoteRejected => "Remote store rejected the request",
            Self::RemoteDecodeFailed => "Remote response could not be decoded",
            Self::SyncExhausted => "Sync failed repeatedly",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `kb init` to set up this workspace."),
            Self::ConfigParseError => Some("Fix syntax in .kanban/config.toml and retry."),
            Self::NoBoardLoaded => Some("Seed the cache with `kb init --board <file>`."),
            Self::TaskNotFound | Self::ColumnNotFound => None,
            Self::CacheWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `kb` process releases its lock."),
            Self::RemoteUnreachable => Some("Check the remote URL and network, then run `kb sync`."),
            Self::RemoteRejected => Some("Refresh the board; the server state may have changed."),
            Self::RemoteDecodeFailed => Some("Verify the remote speaks the kanban JSON API."),
            Self::SyncExhausted => Some("Pending moves are kept locally. Refresh and retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
