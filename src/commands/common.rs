//! Common utilities and helper functions shared across commands.
//!
//! Every command works against the same pair of services: a league database
//! and a Sleeper client. Both are built once from [`Settings`] and passed in,
//! so tests can swap in an in-memory database and a mock server.

use tracing::{debug, error};

use crate::{
    core::Settings,
    sleeper::SleeperClient,
    storage::{LeagueDatabase, Record},
    Result,
};

/// Context containing common resources needed by most commands
pub struct CommandContext {
    pub db: LeagueDatabase,
    pub api: SleeperClient,
}

impl CommandContext {
    /// Open the configured database and build the API client
    pub fn new(settings: &Settings, verbose: bool) -> Result<Self> {
        if verbose {
            println!("Connecting to database at {}...", settings.db_path.display());
        }
        let db = LeagueDatabase::new(&settings.db_path)?;
        let api = SleeperClient::from_settings(settings)?;

        Ok(Self { db, api })
    }
}

/// Outcome of persisting a batch of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub saved: usize,
    pub conflicts: usize,
}

/// Save records one by one, in the order given.
///
/// A constraint violation skips that record: it is logged with the record
/// dumped as JSON and counted in `conflicts`. Any other database error aborts
/// the batch.
pub fn persist_records<'a, I>(db: &mut LeagueDatabase, records: I) -> Result<PersistSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut summary = PersistSummary::default();

    for record in records {
        match db.save(record) {
            Ok(()) => {
                summary.saved += 1;
                debug!(entity = %record.kind(), key = %record.primary_key(), "Saved record");
            }
            Err(err) if err.is_persistence_conflict() => {
                let dump = serde_json::to_string(record)
                    .unwrap_or_else(|json_err| format!("<unserializable: {json_err}>"));
                error!(
                    entity = %record.kind(),
                    key = %record.primary_key(),
                    error = %err,
                    record = %dump,
                    "Failed to save record"
                );
                summary.conflicts += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(summary)
}
