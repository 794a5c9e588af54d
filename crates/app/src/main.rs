//! `pantry` command-line entry point.

use anyhow::Context;
use clap::Parser;

use pantry_app::cli::Cli;
use pantry_app::config::{self, AppConfig};
use pantry_app::{AppState, commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `--db` wins over PANTRY_DB_PATH.
    let db_override = cli.db.as_ref().map(|path| path.display().to_string());
    let config = AppConfig::from_lookup(|var| match (var, &db_override) {
        (config::ENV_DB_PATH, Some(path)) => Some(path.clone()),
        _ => std::env::var(var).ok(),
    })
    .context("invalid configuration")?;

    pantry_observability::init(config.log_format);
    tracing::debug!(db = %config.db_path.display(), "starting pantry");

    let state = AppState::open(&config).await?;
    let mut stdout = std::io::stdout();
    commands::execute(&state, cli.command, &mut stdout).await
}
