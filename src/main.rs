//! Entry point: parse CLI and dispatch to command handlers.

use anyhow::Context;
use clap::Parser;
use sleeper_sync::{
    cli::{Commands, SleeperSync},
    commands::{
        crawl_leagues::handle_crawl, import_league::handle_import_league,
        league_chain::handle_league_chain, retry_imports::handle_retry_imports,
        update_players::handle_update_players, CommandContext,
    },
    core::{logging, Settings},
};

/// Run the CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = SleeperSync::parse();

    let mut settings = Settings::from_env().context("Invalid environment configuration")?;
    if let Some(db) = app.db {
        settings.db_path = db;
    }

    let default_level = if app.verbose { "debug" } else { "info" };
    logging::init(settings.log_format, default_level);

    let mut ctx = CommandContext::new(&settings, app.verbose).with_context(|| {
        format!(
            "Failed to open league database at {}",
            settings.db_path.display()
        )
    })?;

    match app.command {
        Commands::UpdatePlayers => handle_update_players(&mut ctx).await?,
        Commands::ImportLeague { league_id } => handle_import_league(&mut ctx, &league_id).await?,
        Commands::Crawl { num_users } => handle_crawl(&mut ctx, num_users).await?,
        Commands::RetryImports => handle_retry_imports(&mut ctx).await?,
        Commands::LeagueChain { league_id } => handle_league_chain(&ctx, league_id.as_ref())?,
    }

    Ok(())
}
