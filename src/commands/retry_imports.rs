//! Re-run imports for leagues whose last pass left gaps.

use tracing::{info, warn};

use super::common::CommandContext;
use super::import_league::import_league_history;
use crate::{cli::types::LeagueId, sleeper::SleeperClient, storage::LeagueDatabase, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub succeeded: usize,
    pub still_failing: Vec<LeagueId>,
}

/// Retry every league with `last_import_successful = false`, in league id order.
pub async fn retry_league_import(
    db: &mut LeagueDatabase,
    api: &SleeperClient,
) -> Result<RetrySummary> {
    let failed = db.failed_league_ids()?;
    info!(leagues = failed.len(), "Retrying failed league imports");

    let mut summary = RetrySummary::default();
    for league_id in failed {
        // An earlier chain in this pass may already have fixed it.
        if db.league_import_successful(&league_id)? != Some(true) {
            import_league_history(db, api, &league_id).await?;
        }

        if db.league_import_successful(&league_id)? == Some(true) {
            summary.succeeded += 1;
        } else {
            warn!(%league_id, "League import still failing");
            summary.still_failing.push(league_id);
        }
    }

    Ok(summary)
}

/// Handle the retry-imports command
pub async fn handle_retry_imports(ctx: &mut CommandContext) -> Result<()> {
    let summary = retry_league_import(&mut ctx.db, &ctx.api).await?;

    if summary.succeeded == 0 && summary.still_failing.is_empty() {
        println!("✓ No failed imports to retry");
        return Ok(());
    }

    println!("✓ Retried imports: {} succeeded", summary.succeeded);
    if !summary.still_failing.is_empty() {
        println!("✗ Still failing ({}):", summary.still_failing.len());
        for league_id in &summary.still_failing {
            println!("    {league_id}");
        }
    }
    Ok(())
}
