//! Import one league season, or a whole league chain, into the database.
//!
//! An import pass fetches everything Sleeper has for a league season, formats
//! it, and writes it record by record. The league's `last_import_successful`
//! flag is cleared before the first dependent write and only set again after a
//! pass with no API, formatting or persistence errors, so an interrupted or
//! partial pass always leaves the league eligible for retry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{error, info, warn};

use super::common::{persist_records, CommandContext};
use crate::{
    cli::types::{LeagueId, Season, UserId},
    format,
    sleeper::{RawLeague, RawRoster, RawUser, SleeperClient},
    storage::{LeagueDatabase, Record, UserRecord},
    Result, SleeperError,
};

/// Where a league stands with respect to import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    NotImported,
    Importing,
    Succeeded,
    PartiallyFailed,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportState::NotImported => "not imported",
            ImportState::Importing => "importing",
            ImportState::Succeeded => "succeeded",
            ImportState::PartiallyFailed => "partially failed",
        };
        f.write_str(label)
    }
}

/// What one `import_league` pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub league_id: LeagueId,
    pub season: Season,
    pub state: ImportState,
    pub records_saved: usize,
    pub conflicts: usize,
    pub format_errors: usize,
    pub api_errors: usize,
}

impl ImportReport {
    pub fn succeeded(&self) -> bool {
        self.state == ImportState::Succeeded
    }
}

/// Records of one league pass, grouped in foreign-key write order.
#[derive(Default)]
struct WriteSet {
    users: BTreeMap<UserId, Record>,
    rosters: Vec<Record>,
    transactions: Vec<Record>,
    matchups: Vec<Record>,
    drafts: Vec<Record>,
    picks: Vec<Record>,
    format_errors: usize,
}

impl WriteSet {
    fn format_failed(&mut self, league_id: &LeagueId, what: &str, err: SleeperError) {
        error!(%league_id, entity = what, error = %err, "Failed to format record");
        self.format_errors += 1;
    }
}

/// Users referenced by a league, fetched lazily when the league user list
/// does not include them.
struct KnownUsers<'a> {
    api: &'a SleeperClient,
    league_id: &'a LeagueId,
    users: BTreeMap<UserId, RawUser>,
    unresolved: BTreeSet<UserId>,
}

impl<'a> KnownUsers<'a> {
    fn new(api: &'a SleeperClient, league_id: &'a LeagueId, members: Vec<RawUser>) -> Self {
        Self {
            api,
            league_id,
            users: members
                .into_iter()
                .map(|user| (user.user_id.clone(), user))
                .collect(),
            unresolved: BTreeSet::new(),
        }
    }

    /// Make sure `user_id` is known, fetching it if needed.
    async fn ensure(&mut self, user_id: &UserId, role: &str) {
        if self.users.contains_key(user_id) || self.unresolved.contains(user_id) {
            return;
        }

        info!(league_id = %self.league_id, %user_id, role, "Fetching user missing from league");
        match self.api.get_user(user_id).await {
            Some(user) if &user.user_id == user_id => {
                self.users.insert(user_id.clone(), user);
            }
            Some(user) => {
                warn!(
                    league_id = %self.league_id,
                    requested = %user_id,
                    received = %user.user_id,
                    "User response does not match requested id"
                );
                self.unresolved.insert(user_id.clone());
            }
            None => {
                warn!(league_id = %self.league_id, %user_id, role, "Referenced user not found");
                self.unresolved.insert(user_id.clone());
            }
        }
    }

    /// Drop references to users Sleeper could not return.
    ///
    /// Roster owners, co-owners and pickers become absent. A transaction
    /// creator is required, so an unresolved creator is stored as a user with
    /// no display name.
    fn detach_unresolved(&self, write: &mut WriteSet) {
        if self.unresolved.is_empty() {
            return;
        }
        let unresolved = |user_id: &UserId| self.unresolved.contains(user_id);

        for record in &mut write.rosters {
            if let Record::Roster(roster) = record {
                if roster.owner_id.as_ref().is_some_and(unresolved) {
                    roster.owner_id = None;
                }
                roster.co_owners.retain(|user_id| !unresolved(user_id));
            }
        }

        for record in &mut write.picks {
            if let Record::Pick(pick) = record {
                if pick.picked_by.as_ref().is_some_and(unresolved) {
                    pick.picked_by = None;
                }
            }
        }

        for record in &write.transactions {
            if let Record::Transaction(transaction) = record {
                if unresolved(&transaction.creator) {
                    write
                        .users
                        .entry(transaction.creator.clone())
                        .or_insert_with(|| {
                            Record::User(UserRecord {
                                user_id: transaction.creator.clone(),
                                display_name: String::new(),
                                avatar: None,
                            })
                        });
                }
            }
        }
    }
}

/// Split rosters into the first roster per owner, later rosters claiming
/// the same owner (orphans), and rosters with no owner.
fn partition_rosters(rosters: &[RawRoster]) -> (Vec<&RawRoster>, Vec<&RawRoster>, Vec<&RawRoster>) {
    let mut owners = BTreeSet::new();
    let mut owned = Vec::new();
    let mut orphans = Vec::new();
    let mut ownerless = Vec::new();

    for roster in rosters {
        match &roster.owner_id {
            Some(owner) if owners.insert(owner.clone()) => owned.push(roster),
            Some(_) => orphans.push(roster),
            None => ownerless.push(roster),
        }
    }

    (owned, orphans, ownerless)
}

/// Fetch, format and persist one league season.
pub async fn import_league(
    db: &mut LeagueDatabase,
    api: &SleeperClient,
    league: &RawLeague,
) -> Result<ImportReport> {
    let league_id = &league.league_id;
    api.reset_error_flag();
    let api_errors_before = api.errors().len();
    info!(%league_id, season = %league.season, state = %ImportState::Importing, "Importing league");

    let members = api.get_users(league_id).await;
    let member_ids: Vec<UserId> = members.iter().map(|u| u.user_id.clone()).collect();
    let league_record = Record::League(format::league(league, member_ids));

    let mut users = KnownUsers::new(api, league_id, members);
    let mut write = WriteSet::default();

    for transaction in api.get_season_transactions(league_id, league.season).await {
        users.ensure(&transaction.creator, "creator").await;
        match format::transaction(&transaction, league_id) {
            Ok(record) => write.transactions.push(Record::Transaction(record)),
            Err(err) => write.format_failed(league_id, "transaction", err),
        }
    }

    for (week, matchups) in api.get_season_matchups(league_id, league.season).await {
        write.matchups.extend(
            format::matchups(&matchups, league_id, week)
                .into_iter()
                .map(Record::Matchup),
        );
    }

    for listed in api.get_drafts(league_id).await {
        let draft = match api.get_draft(&listed.draft_id).await {
            Some(detail) => detail,
            None => {
                warn!(%league_id, draft_id = %listed.draft_id, "Draft detail unavailable, using league listing");
                listed
            }
        };
        match format::draft(&draft, league_id) {
            Ok(record) => write.drafts.push(Record::Draft(record)),
            Err(err) => write.format_failed(league_id, "draft", err),
        }

        for pick in api.get_draft_picks(&draft.draft_id).await {
            if let Some(picker) = format::picked_by(&pick) {
                users.ensure(&picker, "picker").await;
            }
            write.picks.push(Record::Pick(format::pick(&pick, league_id)));
        }
    }

    let rosters = api.get_rosters(league_id).await;
    for roster in &rosters {
        if let Some(owner) = &roster.owner_id {
            users.ensure(owner, "owner").await;
        }
        for co_owner in roster.co_owners.iter().flatten() {
            users.ensure(co_owner, "co-owner").await;
        }
    }

    let (owned, orphans, ownerless) = partition_rosters(&rosters);
    for roster in owned {
        let owner = roster
            .owner_id
            .as_ref()
            .and_then(|owner_id| users.users.get(owner_id));
        match owner {
            Some(owner) => match format::roster_and_user(roster, owner, league_id) {
                Ok((roster_record, user_record)) => {
                    write
                        .users
                        .insert(user_record.user_id.clone(), Record::User(user_record));
                    write.rosters.push(Record::Roster(roster_record));
                }
                Err(err) => write.format_failed(league_id, "roster", err),
            },
            None => write
                .rosters
                .push(Record::Roster(format::roster(roster, league_id))),
        }
    }
    for roster in orphans {
        warn!(
            %league_id,
            roster_id = roster.roster_id,
            owner_id = ?roster.owner_id,
            "Roster owner already owns another roster, storing as orphan"
        );
        write
            .rosters
            .push(Record::Roster(format::roster(roster, league_id)));
    }
    for roster in ownerless {
        write
            .rosters
            .push(Record::Roster(format::roster(roster, league_id)));
    }

    for (user_id, user) in &users.users {
        write
            .users
            .entry(user_id.clone())
            .or_insert_with(|| Record::User(format::user(user)));
    }
    users.detach_unresolved(&mut write);

    // Users first so the league's member rows resolve, then the league, whose
    // flag is cleared before anything that depends on it is written.
    let mut summary = persist_records(db, write.users.values())?;
    let league_saved = persist_records(db, [&league_record])?;
    summary.saved += league_saved.saved;
    summary.conflicts += league_saved.conflicts;
    db.mark_league_import(league_id, false)?;

    for batch in [
        &write.rosters,
        &write.transactions,
        &write.matchups,
        &write.drafts,
        &write.picks,
    ] {
        let batch_summary = persist_records(db, batch.iter())?;
        summary.saved += batch_summary.saved;
        summary.conflicts += batch_summary.conflicts;
    }

    let api_errors = api.errors().len().saturating_sub(api_errors_before);
    let clean = summary.conflicts == 0 && write.format_errors == 0 && !api.error_flag();
    let state = if clean {
        ImportState::Succeeded
    } else {
        ImportState::PartiallyFailed
    };
    db.mark_league_import(league_id, clean)?;

    let report = ImportReport {
        league_id: league_id.clone(),
        season: league.season,
        state,
        records_saved: summary.saved,
        conflicts: summary.conflicts,
        format_errors: write.format_errors,
        api_errors,
    };

    if clean {
        info!(%league_id, records = report.records_saved, %state, "League import finished");
    } else {
        warn!(
            %league_id,
            records = report.records_saved,
            conflicts = report.conflicts,
            format_errors = report.format_errors,
            api_errors = report.api_errors,
            %state,
            "League import left gaps, marked for retry"
        );
    }

    Ok(report)
}

/// Import every season of the chain ending at `league_id`, oldest first.
///
/// Seasons already imported successfully are skipped.
pub async fn import_league_history(
    db: &mut LeagueDatabase,
    api: &SleeperClient,
    league_id: &LeagueId,
) -> Result<Vec<ImportReport>> {
    let chain = api.get_league_history(league_id).await;
    if chain.is_empty() {
        warn!(%league_id, "League not found, nothing to import");
        return Ok(Vec::new());
    }
    info!(%league_id, seasons = chain.len(), "Resolved league chain");

    let mut reports = Vec::new();
    for league in chain.iter().rev() {
        if db.league_import_successful(&league.league_id)? == Some(true) {
            info!(league_id = %league.league_id, season = %league.season, "Already imported, skipping");
            continue;
        }
        reports.push(import_league(db, api, league).await?);
    }

    Ok(reports)
}

/// Handle the import-league command
pub async fn handle_import_league(ctx: &mut CommandContext, league_id: &LeagueId) -> Result<()> {
    if !ctx.api.league_exists(league_id).await {
        println!("League {league_id} was not found on Sleeper.");
        return Ok(());
    }

    let reports = import_league_history(&mut ctx.db, &ctx.api, league_id).await?;
    if reports.is_empty() {
        println!("✓ League {league_id} and its history are already imported");
        return Ok(());
    }

    for report in &reports {
        let marker = if report.succeeded() { "✓" } else { "✗" };
        println!(
            "{marker} {} ({}): {} records, {}",
            report.league_id, report.season, report.records_saved, report.state
        );
        if !report.succeeded() {
            println!(
                "    conflicts: {}, format errors: {}, API errors: {}",
                report.conflicts, report.format_errors, report.api_errors
            );
        }
    }

    let failed = reports.iter().filter(|r| !r.succeeded()).count();
    println!(
        "\nImported {} season(s), {} need a retry. API calls: {}",
        reports.len(),
        failed,
        ctx.api.call_count()
    );
    Ok(())
}
