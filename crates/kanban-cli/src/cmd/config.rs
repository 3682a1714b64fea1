use anyhow::Result;
use clap::Args;
use kanban_core::config::{EffectiveConfig, project_config_path};
use std::path::Path;

use crate::output::{OutputMode, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print only the path of the project config file.
    #[arg(long)]
    pub path: bool,
}

/// Execute `kb config`: show the effective configuration.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn run_config(
    args: &ConfigArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    if args.path {
        let path = project_config_path(project_root);
        return render(output, &serde_json::json!({ "path": path }), |_, w| {
            writeln!(w, "{}", path.display())
        });
    }

    render(output, config, |c, w| {
        pretty_section(w, "Project")?;
        pretty_kv(w, "workspace", c.project.workspace_id().as_str())?;
        pretty_kv(w, "interval", format!("{}s", c.project.sync.interval_secs))?;
        pretty_kv(w, "max fails", c.project.sync.max_failures.to_string())?;
        pretty_kv(w, "timeout", format!("{}s", c.project.remote.timeout_secs))?;
        pretty_kv(w, "cache", c.project.cache_dir(project_root).display().to_string())?;
        writeln!(w)?;
        pretty_section(w, "Resolved")?;
        pretty_kv(w, "remote", c.remote_url.as_deref().unwrap_or("(not configured)"))?;
        pretty_kv(w, "output", &c.resolved_output)
    })
}
