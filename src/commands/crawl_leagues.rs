//! Discover new dynasty leagues through the users already in the database.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::common::{persist_records, CommandContext};
use super::import_league::import_league_history;
use crate::{
    cli::types::LeagueId,
    format,
    sleeper::{RawLeague, SleeperClient},
    storage::{LeagueDatabase, Record},
    Result,
};

/// Totals for one crawl pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub users_crawled: usize,
    /// Users whose league lookup failed outright; their watermark is untouched.
    pub users_skipped: usize,
    pub leagues_checked: usize,
    /// Non-dynasty leagues whose users were registered without an import.
    pub leagues_registered: usize,
    pub leagues_already_stored: usize,
    pub seasons_imported: usize,
    pub seasons_failed: usize,
}

/// Save the users of a league we are not going to import.
async fn register_league_users(
    db: &mut LeagueDatabase,
    api: &SleeperClient,
    league: &RawLeague,
) -> Result<()> {
    let users: Vec<Record> = api
        .get_users(&league.league_id)
        .await
        .iter()
        .map(|user| Record::User(format::user(user)))
        .collect();
    let summary = persist_records(db, &users)?;
    info!(
        league_id = %league.league_id,
        users = summary.saved,
        "Registered users of non-dynasty league"
    );
    Ok(())
}

/// Crawl the `num_users` least recently crawled users.
///
/// Each league is considered once per pass even when several crawled users
/// share it.
pub async fn crawl_leagues(
    db: &mut LeagueDatabase,
    api: &SleeperClient,
    num_users: usize,
    now: DateTime<Utc>,
) -> Result<CrawlReport> {
    let mut report = CrawlReport::default();
    let mut checked: HashSet<LeagueId> = HashSet::new();

    for candidate in db.least_recently_crawled_users(num_users)? {
        let user_id = candidate.user_id;
        api.reset_error_flag();
        let leagues = api.get_all_user_leagues(&user_id).await;
        let lookup_failed = api.error_flag();

        if leagues.is_empty() && lookup_failed {
            warn!(%user_id, "Could not fetch any leagues for user, leaving watermark");
            report.users_skipped += 1;
            continue;
        }
        info!(
            %user_id,
            leagues = leagues.len(),
            last_crawled = %candidate.last_crawled,
            "Crawling user"
        );

        for league in &leagues {
            if !checked.insert(league.league_id.clone()) {
                continue;
            }
            report.leagues_checked += 1;

            if !league.is_dynasty() {
                register_league_users(db, api, league).await?;
                report.leagues_registered += 1;
            } else if db.league_exists(&league.league_id)? {
                report.leagues_already_stored += 1;
            } else {
                for import in import_league_history(db, api, &league.league_id).await? {
                    if import.succeeded() {
                        report.seasons_imported += 1;
                    } else {
                        report.seasons_failed += 1;
                    }
                }
            }
        }

        db.touch_user_crawled(&user_id, now, !lookup_failed)?;
        report.users_crawled += 1;
    }

    info!(
        users = report.users_crawled,
        skipped = report.users_skipped,
        leagues = report.leagues_checked,
        imported = report.seasons_imported,
        failed = report.seasons_failed,
        "Crawl finished"
    );
    Ok(report)
}

/// Handle the crawl command
pub async fn handle_crawl(ctx: &mut CommandContext, num_users: usize) -> Result<()> {
    let report = crawl_leagues(&mut ctx.db, &ctx.api, num_users, Utc::now()).await?;

    println!("✓ Crawl complete");
    println!(
        "  Users crawled: {} (skipped: {})",
        report.users_crawled, report.users_skipped
    );
    println!("  Leagues checked: {}", report.leagues_checked);
    println!(
        "  Dynasty seasons imported: {} (needing retry: {})",
        report.seasons_imported, report.seasons_failed
    );
    println!(
        "  Non-dynasty leagues registered: {}, already stored: {}",
        report.leagues_registered, report.leagues_already_stored
    );
    println!("  API calls: {}", ctx.api.call_count());
    Ok(())
}
