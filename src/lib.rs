//! Sleeper League Importer Library
//!
//! Pulls fantasy football leagues from the Sleeper API and normalizes them into
//! a local SQLite database: leagues and their season-to-season chains, users,
//! rosters, transactions, weekly matchups, drafts and picks.
//!
//! ## Features
//!
//! - **Resilient API client**: Bounded retry with backoff, call accounting, and
//!   "no data" results instead of hard failures
//! - **Pure formatting**: Raw payloads become typed records with namespaced keys
//! - **League history import**: Whole league chains imported oldest season first
//! - **Crawling**: Round-robin discovery of dynasty leagues through known users
//! - **Retry tracking**: Every league carries a `last_import_successful` flag
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sleeper_sync::{
//!     commands::import_league_history, sleeper::SleeperClient, storage::LeagueDatabase,
//!     LeagueId,
//! };
//!
//! # async fn example() -> sleeper_sync::Result<()> {
//! let mut db = LeagueDatabase::new_in_memory()?;
//! let api = SleeperClient::new(sleeper_sync::sleeper::SLEEPER_BASE_URL)?;
//!
//! let reports = import_league_history(&mut db, &api, &LeagueId::new("784462448436404224")).await?;
//! println!("imported {} seasons in {} API calls", reports.len(), api.call_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Configuration
//!
//! ```bash
//! export SLEEPER_DB_PATH=/var/lib/sleeper/leagues.db
//! export SLEEPER_MAX_ATTEMPTS=5
//! ```

pub mod cli;
pub mod commands;
pub mod core;
pub mod error;
pub mod format;
pub mod jobs;
pub mod sleeper;
pub mod storage;

// Re-export commonly used types
pub use cli::types::{DraftId, LeagueId, PlayerId, Season, UserId, Week};
pub use error::{Result, SleeperError};
