// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, set up logging, load the
//   configuration once and hand a session opener to the menu loop.
// - Returns `anyhow::Result` so fatal errors print with context.

use anyhow::Context;
use clap::Parser;
use drivefolder_cli::actions::ActionLoop;
use drivefolder_cli::config::{Config, ConfigLayer};
use drivefolder_cli::session::DriveConnector;
use drivefolder_cli::ui::ConsolePrompter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Upload, list, download and delete files in a Drive folder")]
struct Cli {
    /// Credential file (service account key or authorized user)
    #[arg(long, env = "DRIVEFOLDER_CREDENTIALS")]
    credentials: Option<PathBuf>,
    /// Id of the folder to operate on
    #[arg(long, env = "DRIVEFOLDER_FOLDER_ID")]
    folder_id: Option<String>,
    /// Request timeout in seconds; unset or 0 means no timeout
    #[arg(long, env = "DRIVEFOLDER_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    /// Config file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Type paths at the prompt instead of using file dialogs
    #[arg(long)]
    no_dialogs: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides = ConfigLayer {
        credentials_path: cli.credentials,
        folder_id: cli.folder_id,
        timeout_secs: cli.timeout_secs,
        ..Default::default()
    };
    let config = Config::load(cli.config.as_deref(), overrides)
        .context("Failed to load configuration")?;

    let folder_id = config.folder_id.clone();
    let mut actions = ActionLoop::new(
        DriveConnector::new(config),
        ConsolePrompter::new(!cli.no_dialogs),
        folder_id,
    );

    // Blocks until the user exits or a fatal error occurs.
    actions.run().context("Stopped after an unrecoverable error")?;
    Ok(())
}
