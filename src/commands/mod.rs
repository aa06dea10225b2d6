//! Command implementations for the Sleeper importer

pub mod common;
pub mod crawl_leagues;
pub mod import_league;
pub mod league_chain;
pub mod retry_imports;
pub mod update_players;

pub use common::{persist_records, CommandContext, PersistSummary};
pub use crawl_leagues::{crawl_leagues, CrawlReport};
pub use import_league::{import_league, import_league_history, ImportReport, ImportState};
pub use retry_imports::{retry_league_import, RetrySummary};
pub use update_players::update_players;
