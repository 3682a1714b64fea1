#![forbid(unsafe_code)]

mod cmd;
mod context;
mod http;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use kanban_core::config::resolve_config;
use output::{OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "kb: offline-first kanban board with background sync",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json, FORMAT and the user config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a kanban workspace",
        long_about = "Create .kanban/ in the current directory, optionally seeding the local cache with a board.",
        after_help = "EXAMPLES:\n    # Initialize with a board export\n    kb init --board board.json --remote http://localhost:3000\n\n    # Emit machine-readable output\n    kb init --workspace team-a --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the board",
        long_about = "Show the locally cached board. Tasks with unsynced placements are marked with *.",
        after_help = "EXAMPLES:\n    # Show every column\n    kb show\n\n    # Show one column as JSON\n    kb show --column todo --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Board",
        about = "Move a task",
        long_about = "Move a task to a column and position. Applied locally at once and queued for sync.",
        after_help = "EXAMPLES:\n    # Move to the top of a column\n    kb move task-1 --to done --position 0\n\n    # Append and sync immediately\n    kb move task-1 --to doing --sync"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Board",
        about = "Create a task",
        after_help = "EXAMPLES:\n    kb create-task --column todo --title \"Write release notes\""
    )]
    CreateTask(cmd::create::CreateTaskArgs),

    #[command(
        next_help_heading = "Board",
        about = "Create a column",
        after_help = "EXAMPLES:\n    kb create-column \"Review\""
    )]
    CreateColumn(cmd::create::CreateColumnArgs),

    #[command(
        next_help_heading = "Board",
        about = "Delete a task",
        after_help = "EXAMPLES:\n    kb delete task-7"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Board",
        about = "Edit a task's title or description",
        after_help = "EXAMPLES:\n    kb update task-7 --title \"Ship it\"\n\n    kb update task-7 --clear-description"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Flush queued moves now",
        after_help = "EXAMPLES:\n    kb sync\n\n    KANBAN_REMOTE=http://localhost:3000 kb sync --json"
    )]
    Sync(cmd::sync::SyncArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Show sync status and the pending queue",
        after_help = "EXAMPLES:\n    kb status\n\n    kb status --json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Run the periodic sync in the foreground",
        long_about = "Flush the pending queue on the configured interval until stopped. Moves made by other kb invocations are picked up from the cache.",
        after_help = "EXAMPLES:\n    # Sync every 5 seconds for one minute\n    kb watch --interval-secs 5 --duration 60"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Show the effective configuration",
        after_help = "EXAMPLES:\n    kb config\n\n    kb config --path"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    kb completions bash > ~/.local/share/bash-completion/completions/kb"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KANBAN_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "kanban=debug,kb=debug,info"
        } else {
            "kanban=info,kb=info,warn"
        })
    });

    let format = env::var("KANBAN_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, project_root: &Path) -> anyhow::Result<()> {
    let config = resolve_config(project_root, cli.json)?;
    let output = resolve_output_mode(cli.format, cli.json, config.user.output.as_deref());

    let open = || context::open_session(project_root, &config, output);

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, output, project_root),
        Commands::Show(args) => cmd::show::run_show(&args, &open()?, output),
        Commands::Move(args) => cmd::move_cmd::run_move(&args, &mut open()?, output),
        Commands::CreateTask(args) => {
            cmd::create::run_create_task(&args, &mut open()?, output)
        }
        Commands::CreateColumn(args) => {
            cmd::create::run_create_column(&args, &mut open()?, output)
        }
        Commands::Delete(args) => cmd::delete::run_delete(&args, &mut open()?, output),
        Commands::Update(args) => cmd::update::run_update(&args, &mut open()?, output),
        Commands::Sync(args) => cmd::sync::run_sync(&args, &mut open()?, output),
        Commands::Status(args) => cmd::status::run_status(
            &args,
            &open()?,
            output,
            &config.project.cache_dir(project_root),
        ),
        Commands::Watch(args) => cmd::watch::run_watch(&args, &config, output, project_root),
        Commands::Config(args) => cmd::config::run_config(&args, &config, output, project_root),
        Commands::Completions(args) => {
            cmd::completions::run_completions(&args, &mut Cli::command())
        }
    }
}

/// Best-effort output mode for errors raised before config is resolved.
fn error_mode(cli: &Cli) -> OutputMode {
    resolve_output_mode(cli.format, cli.json, None)
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let mode = error_mode(&cli);

    if let Err(err) = run(cli, &project_root) {
        let rendered = context::to_cli_error(&err);
        if render_error(mode, &rendered).is_err() {
            eprintln!("error: {err:#}");
        }
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["kb", "status", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn format_flag_parses_value_enum() {
        let cli = Cli::parse_from(["kb", "--format", "text", "show"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn move_defaults_to_append() {
        let cli = Cli::parse_from(["kb", "move", "task-1", "--to", "done"]);
        let Commands::Move(args) = cli.command else {
            panic!("expected move");
        };
        assert_eq!(args.task, "task-1");
        assert_eq!(args.column, "done");
        assert!(args.position.is_none());
        assert!(!args.sync);
    }

    #[test]
    fn update_description_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "kb",
            "update",
            "t1",
            "--description",
            "x",
            "--clear-description",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn watch_accepts_overrides() {
        let cli = Cli::parse_from(["kb", "watch", "--interval-secs", "5", "--duration", "10"]);
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.interval_secs, Some(5));
        assert_eq!(args.duration, Some(10));
    }
}
