//! Storage layer for imported Sleeper leagues
//!
//! A SQLite database with foreign keys enforced, organized into:
//! - `models`: Normalized records and the `Record` write unit
//! - `schema`: Database connection and schema management
//! - `queries`: Per-record upserts, crawl watermarks and chain lookups

pub mod models;
pub mod queries;
pub mod schema;

#[cfg(test)]
mod tests;

// Re-export the main types and database struct for easy access
pub use models::*;
pub use schema::{LeagueDatabase, SENTINEL_PLAYERS};
