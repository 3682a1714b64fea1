//! Opening the workspace session a command operates on.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kanban_core::cache::FileStore;
use kanban_core::config::{EffectiveConfig, project_config_path};
use kanban_core::error::ErrorCode;
use kanban_core::model::Board;
use kanban_core::remote::RemoteError;
use kanban_core::session::{CrudError, KanbanSession};

use crate::http::HttpRemote;
use crate::output::{CliError, OutputMode, TerminalNotifier};

pub type CliSession = KanbanSession<FileStore, HttpRemote>;

/// An error tagged with a stable code, rendered as `error[E####]`.
#[derive(Debug)]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CodedError {}

/// Build an `anyhow` error carrying `code`.
pub fn coded(code: ErrorCode, message: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(CodedError {
        code,
        message: message.into(),
    })
}

/// Map a command failure to its terminal representation.
pub fn to_cli_error(err: &anyhow::Error) -> CliError {
    if let Some(coded) = err.downcast_ref::<CodedError>() {
        return CliError::with_code(&coded.message, coded.code);
    }
    if let Some(crud) = err.downcast_ref::<CrudError>() {
        return CliError::with_code(crud.to_string(), crud.code());
    }
    if let Some(remote) = err.downcast_ref::<RemoteError>() {
        return CliError::with_code(remote.to_string(), remote.code());
    }
    CliError::new(format!("{err:#}"))
}

/// Mount the session for the project at `project_root`.
///
/// # Errors
///
/// Fails if the project hasn't been initialized with `kb init`.
pub fn open_session(
    project_root: &Path,
    config: &EffectiveConfig,
    output: OutputMode,
) -> anyhow::Result<CliSession> {
    if !project_config_path(project_root).exists() {
        return Err(coded(
            ErrorCode::NotInitialized,
            format!("no kanban workspace at {}", project_root.display()),
        ));
    }

    let project = &config.project;
    let store = FileStore::new(project.cache_dir(project_root));
    let remote = HttpRemote::new(
        config.remote_url.clone(),
        Duration::from_secs(project.remote.timeout_secs),
    );

    Ok(KanbanSession::mount(
        project.workspace_id(),
        None,
        store,
        remote,
        project.sync.session_options(),
    )
    .with_notifier(TerminalNotifier::new(output)))
}

/// The session's board, or a coded error if none was ever loaded.
///
/// # Errors
///
/// Returns [`ErrorCode::NoBoardLoaded`] when the cache holds no board.
pub fn require_board(session: &CliSession) -> anyhow::Result<Arc<Board>> {
    session.board().ok_or_else(|| {
        coded(
            ErrorCode::NoBoardLoaded,
            format!("no board cached for workspace {}", session.workspace()),
        )
    })
}
