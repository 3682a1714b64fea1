use anyhow::{Context as _, Result};
use clap::Args;
use kanban_core::cache::{DurableCache, FileStore};
use kanban_core::config::{
    KANBAN_DIR, ProjectConfig, RemoteConfig, load_project_config, project_config_path,
    save_project_config,
};
use kanban_core::model::{Board, WorkspaceId};
use kanban_core::reducer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Workspace id the cache is scoped to. Defaults to the board's workspace.
    #[arg(long)]
    pub workspace: Option<String>,

    /// Seed the local cache with a board exported as JSON.
    #[arg(long, value_name = "FILE")]
    pub board: Option<PathBuf>,

    /// Base URL of the kanban API.
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Overwrite an existing `.kanban/config.toml`.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "cache/\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config: PathBuf,
    workspace: String,
    cache_dir: PathBuf,
    seeded_tasks: Option<usize>,
}

fn read_board(path: &Path) -> Result<Board> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read board file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse board file {}", path.display()))
}

/// Execute `kb init`. Creates the project skeleton:
///
/// ```text
/// .kanban/
///   config.toml   (workspace, sync, remote, cache settings)
///   .gitignore    (cache/)
///   cache/        (board + pending queue, when seeded)
/// ```
///
/// # Errors
///
/// Returns an error if the workspace is already initialized and `--force` is
/// not set, if the board file can't be read, or if any write fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config_path = project_config_path(project_root);
    if config_path.exists() && !args.force {
        anyhow::bail!(".kanban/ already exists. Use `kb init --force` to reinitialize.");
    }

    let mut board = args.board.as_deref().map(read_board).transpose()?;

    let workspace = args
        .workspace
        .clone()
        .or_else(|| board.as_ref().map(|b| b.workspace_id.to_string()))
        .unwrap_or_else(|| "default".to_string());

    if let Some(board) = board.as_mut().filter(|b| b.workspace_id.as_str() != workspace) {
        tracing::warn!(
            board_workspace = %board.workspace_id,
            workspace = %workspace,
            "board belongs to another workspace; rescoping"
        );
        board.workspace_id = WorkspaceId::new(workspace.as_str());
    }

    // Keep tunables from an existing config when forcing.
    let mut config = if config_path.exists() {
        load_project_config(project_root).unwrap_or_default()
    } else {
        ProjectConfig::default()
    };
    config.workspace = Some(workspace.clone());
    if let Some(url) = &args.remote {
        config.remote = RemoteConfig {
            base_url: Some(url.trim_end_matches('/').to_string()),
            ..config.remote
        };
    }

    let config_path = save_project_config(project_root, &config)?;
    let gitignore_path = project_root.join(KANBAN_DIR).join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let cache_dir = config.cache_dir(project_root);
    let seeded_tasks = match board {
        Some(board) => {
            let board = Arc::new(board);
            let board = reducer::normalize(&board).unwrap_or(board);
            let mut cache =
                DurableCache::new(FileStore::new(&cache_dir), &config.workspace_id());
            cache.save_board(&board).context("Failed to seed board cache")?;
            Some(board.task_count())
        }
        None => None,
    };

    tracing::info!(workspace = %workspace, seeded = seeded_tasks.is_some(), "initialized workspace");

    let report = InitReport {
        config: config_path,
        workspace,
        cache_dir,
        seeded_tasks,
    };
    render(output, &report, |r, w| {
        writeln!(w, "✓ Initialized .kanban/ for workspace {}", r.workspace)?;
        pretty_kv(w, "config", r.config.display().to_string())?;
        pretty_kv(w, "cache", r.cache_dir.display().to_string())?;
        match r.seeded_tasks {
            Some(n) => pretty_kv(w, "seeded", format!("{n} tasks")),
            None => {
                writeln!(w)?;
                writeln!(w, "No board seeded. Run `kb init --force --board <file>` to add one.")
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_core::cache::LocalStore;

    const BOARD: &str = r#"{
        "id": "b1", "name": "Board", "workspaceId": "ws-json",
        "columns": [{
            "id": "todo", "name": "Todo", "position": 0, "boardId": "b1",
            "tasks": [
                {"id": "t1", "title": "A", "columnId": "todo", "position": 4,
                 "createdAt": "2024-02-15T15:50:00Z", "updatedAt": "2024-02-15T15:50:00Z"}
            ]
        }]
    }"#;

    #[test]
    fn init_seeds_cache_and_takes_board_workspace() {
        let root = tempfile::tempdir().expect("temp dir");
        let board_path = root.path().join("board.json");
        std::fs::write(&board_path, BOARD).expect("write board");

        let args = InitArgs {
            workspace: None,
            board: Some(board_path),
            remote: Some("http://localhost:3000/".into()),
            force: false,
        };
        run_init(&args, OutputMode::Json, root.path()).expect("init");

        let config = load_project_config(root.path()).expect("config");
        assert_eq!(config.workspace.as_deref(), Some("ws-json"));
        assert_eq!(config.remote.base_url.as_deref(), Some("http://localhost:3000"));

        let store = FileStore::new(config.cache_dir(root.path()));
        let raw = store
            .get("kanban-board-ws-json")
            .expect("read")
            .expect("seeded");
        let board: Board = serde_json::from_str(&raw).expect("board json");
        assert_eq!(board.columns[0].tasks[0].position, 0, "renumbered on seed");
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let root = tempfile::tempdir().expect("temp dir");
        let args = InitArgs {
            workspace: Some("ws".into()),
            board: None,
            remote: None,
            force: false,
        };
        run_init(&args, OutputMode::Json, root.path()).expect("first init");
        assert!(run_init(&args, OutputMode::Json, root.path()).is_err());

        let forced = InitArgs { force: true, ..args };
        run_init(&forced, OutputMode::Json, root.path()).expect("forced init");
    }
}
