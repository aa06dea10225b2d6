//! CLI argument definitions and parsing.

pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use types::LeagueId;

/// Default number of users visited by one crawl pass.
pub const DEFAULT_CRAWL_USERS: usize = 10;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download the NFL player directory into the database.
    ///
    /// Run this before importing leagues: rosters, matchups and picks
    /// reference players by id.
    UpdatePlayers,

    /// Import a league and every earlier season of it, oldest first.
    ImportLeague {
        /// Sleeper league ID (any season of the league).
        league_id: LeagueId,
    },

    /// Visit the least recently crawled users and import their new dynasty leagues.
    Crawl {
        /// How many users to visit.
        #[clap(long, short = 'n', default_value_t = DEFAULT_CRAWL_USERS)]
        num_users: usize,
    },

    /// Re-run imports for every league whose last import was incomplete.
    RetryImports,

    /// Show the stored seasons of a league, or every stored league.
    LeagueChain {
        /// League ID; omit to list the newest season of each stored league.
        league_id: Option<LeagueId>,
    },
}

#[derive(Debug, Parser)]
#[clap(
    name = "sleeper-sync",
    about = "Import Sleeper fantasy football leagues into SQLite"
)]
pub struct SleeperSync {
    /// Database file (or set `SLEEPER_DB_PATH`).
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    /// Show debug logging and progress details.
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}
