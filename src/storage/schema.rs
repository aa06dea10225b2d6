//! Database schema and connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

/// Player ids every roster may reference before the player directory is loaded:
/// `0` marks an empty slot, `OAK` is the pre-relocation Raiders defence.
pub const SENTINEL_PLAYERS: [(&str, &str); 2] = [("0", "Empty Slot"), ("OAK", "Oakland Raiders")];

/// Database connection manager for imported league data
pub struct LeagueDatabase {
    pub(crate) conn: Connection,
}

impl LeagueDatabase {
    /// Open (or create) the database at `path` and ensure tables exist
    pub fn new(path: &Path) -> Result<Self> {
        // Ensure the cache directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let mut db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Fresh in-memory database, used by tests and dry runs
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    pub(crate) fn initialize_schema(&mut self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS players (
                player_id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                search_full_name TEXT NOT NULL DEFAULT '',
                search_last_name TEXT NOT NULL DEFAULT '',
                position TEXT,
                fantasy_positions TEXT NOT NULL DEFAULT '[]',
                status TEXT,
                team TEXT,
                depth_chart_position TEXT,
                depth_chart_order INTEGER,
                injury_status TEXT,
                injury_body_part TEXT,
                injury_notes TEXT,
                years_exp INTEGER,
                birth_date TEXT,
                weight TEXT,
                height TEXT,
                college TEXT
            );

            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                avatar TEXT,
                last_crawled INTEGER NOT NULL DEFAULT 0,
                all_seasons_crawled INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS leagues (
                league_id TEXT PRIMARY KEY,
                previous_league_id TEXT,
                name TEXT NOT NULL,
                season INTEGER NOT NULL,
                sport TEXT NOT NULL,
                status TEXT NOT NULL,
                total_rosters INTEGER NOT NULL,
                season_type TEXT NOT NULL,
                league_type INTEGER,
                settings TEXT NOT NULL,
                scoring_settings TEXT NOT NULL,
                roster_positions TEXT NOT NULL,
                metadata TEXT,
                draft_id TEXT,
                bracket_id INTEGER,
                loser_bracket_id INTEGER,
                avatar TEXT,
                last_import_successful INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS league_members (
                league_id TEXT NOT NULL REFERENCES leagues(league_id),
                user_id TEXT NOT NULL REFERENCES users(user_id),
                PRIMARY KEY (league_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS rosters (
                roster_key TEXT PRIMARY KEY,
                league_id TEXT NOT NULL REFERENCES leagues(league_id),
                roster_id INTEGER NOT NULL,
                owner_id TEXT REFERENCES users(user_id),
                team_name TEXT NOT NULL,
                settings TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS roster_players (
                roster_key TEXT NOT NULL REFERENCES rosters(roster_key),
                player_id TEXT NOT NULL REFERENCES players(player_id),
                slot TEXT NOT NULL,
                PRIMARY KEY (roster_key, player_id, slot)
            );

            CREATE TABLE IF NOT EXISTS roster_co_owners (
                roster_key TEXT NOT NULL REFERENCES rosters(roster_key),
                user_id TEXT NOT NULL REFERENCES users(user_id),
                PRIMARY KEY (roster_key, user_id)
            );

            CREATE TABLE IF NOT EXISTS transactions (
                transaction_id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL REFERENCES leagues(league_id),
                kind TEXT NOT NULL,
                leg INTEGER NOT NULL,
                status TEXT NOT NULL,
                creator TEXT NOT NULL REFERENCES users(user_id),
                consenter_ids TEXT,
                draft_picks TEXT,
                waiver_budget TEXT,
                metadata TEXT,
                settings TEXT,
                trade_adds TEXT,
                trade_drops TEXT,
                created INTEGER NOT NULL,
                status_updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transaction_rosters (
                transaction_id TEXT NOT NULL REFERENCES transactions(transaction_id),
                roster_key TEXT NOT NULL REFERENCES rosters(roster_key),
                PRIMARY KEY (transaction_id, roster_key)
            );

            CREATE TABLE IF NOT EXISTS transaction_players (
                transaction_id TEXT NOT NULL REFERENCES transactions(transaction_id),
                player_id TEXT NOT NULL REFERENCES players(player_id),
                role TEXT NOT NULL,
                PRIMARY KEY (transaction_id, player_id, role)
            );

            CREATE TABLE IF NOT EXISTS matchups (
                matchup_key TEXT PRIMARY KEY,
                opponent_matchup_key TEXT,
                league_id TEXT NOT NULL REFERENCES leagues(league_id),
                week INTEGER NOT NULL,
                roster_key TEXT NOT NULL REFERENCES rosters(roster_key),
                players_points TEXT NOT NULL,
                starters_points TEXT NOT NULL,
                points REAL NOT NULL,
                custom_points REAL
            );

            CREATE TABLE IF NOT EXISTS matchup_players (
                matchup_key TEXT NOT NULL REFERENCES matchups(matchup_key),
                player_id TEXT NOT NULL REFERENCES players(player_id),
                slot TEXT NOT NULL,
                PRIMARY KEY (matchup_key, player_id, slot)
            );

            CREATE TABLE IF NOT EXISTS drafts (
                draft_id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL REFERENCES leagues(league_id),
                draft_type TEXT NOT NULL,
                status TEXT NOT NULL,
                start_time INTEGER,
                slot_to_roster_id TEXT NOT NULL,
                draft_order TEXT NOT NULL,
                settings TEXT NOT NULL,
                season_type TEXT NOT NULL,
                season INTEGER,
                metadata TEXT
            );

            CREATE TABLE IF NOT EXISTS picks (
                pick_id TEXT PRIMARY KEY,
                draft_id TEXT NOT NULL REFERENCES drafts(draft_id),
                round INTEGER NOT NULL,
                draft_slot INTEGER NOT NULL,
                pick_no INTEGER NOT NULL,
                roster_key TEXT REFERENCES rosters(roster_key),
                player_id TEXT NOT NULL REFERENCES players(player_id),
                picked_by TEXT REFERENCES users(user_id),
                metadata TEXT
            );",
        )?;

        // Indexes for the crawl and chain queries
        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_users_last_crawled ON users(last_crawled, user_id);
             CREATE INDEX IF NOT EXISTS idx_leagues_previous ON leagues(previous_league_id);
             CREATE INDEX IF NOT EXISTS idx_leagues_import ON leagues(last_import_successful);
             CREATE INDEX IF NOT EXISTS idx_matchups_league_week ON matchups(league_id, week);
             CREATE INDEX IF NOT EXISTS idx_transactions_league ON transactions(league_id);",
        )?;

        for (player_id, full_name) in SENTINEL_PLAYERS {
            self.conn.execute(
                "INSERT OR IGNORE INTO players (player_id, full_name) VALUES (?1, ?2)",
                (player_id, full_name),
            )?;
        }

        Ok(())
    }
}
