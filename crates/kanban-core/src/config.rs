use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::WorkspaceId;
use crate::session::SessionOptions;
use crate::sync::DEFAULT_MAX_FAILURES;

/// Directory holding a project's kanban state.
pub const KANBAN_DIR: &str = ".kanban";

/// Environment variable overriding the remote base URL.
pub const REMOTE_ENV: &str = "KANBAN_REMOTE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Workspace scope for the cache keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_failures: default_max_failures(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            sync_interval: Duration::from_secs(self.interval_secs),
            max_failures: self.max_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory; relative paths are resolved against the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl ProjectConfig {
    /// Workspace id, falling back to `default`.
    #[must_use]
    pub fn workspace_id(&self) -> WorkspaceId {
        WorkspaceId::new(self.workspace.as_deref().unwrap_or("default"))
    }

    /// Absolute cache directory for a project rooted at `project_root`.
    #[must_use]
    pub fn cache_dir(&self, project_root: &Path) -> PathBuf {
        match &self.cache.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.join(KANBAN_DIR).join("cache"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Remote base URL used when the project doesn't name one.
    #[serde(default)]
    pub remote: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
    pub remote_url: Option<String>,
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(KANBAN_DIR).join("config.toml")
}

/// Load `.kanban/config.toml`; defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but can't be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `.kanban/config.toml`, creating the directory.
///
/// # Errors
///
/// Returns an error if the directory or file can't be written.
pub fn save_project_config(project_root: &Path, config: &ProjectConfig) -> Result<PathBuf> {
    let path = project_config_path(project_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to encode project config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Load the per-user config; defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but can't be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("kanban/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config and environment.
///
/// # Errors
///
/// Propagates config load failures.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);
    let remote_url = resolve_remote(
        env::var(REMOTE_ENV).ok(),
        project.remote.base_url.clone(),
        user.remote.clone(),
    );

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
        remote_url,
    })
}

/// Environment beats project config beats user config. Blank values are
/// ignored; trailing slashes are trimmed.
fn resolve_remote(
    env_remote: Option<String>,
    project_remote: Option<String>,
    user_remote: Option<String>,
) -> Option<String> {
    [env_remote, project_remote, user_remote]
        .into_iter()
        .flatten()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .find(|url| !url.is_empty())
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_interval_secs() -> u64 {
    30
}

const fn default_max_failures() -> u32 {
    DEFAULT_MAX_FAILURES
}

const fn default_timeout_secs() -> u64 {
    10
}
