//! Show stored league chains.

use super::common::CommandContext;
use crate::{cli::types::LeagueId, storage::LeagueSummary, Result};

fn print_league(league: &LeagueSummary, highlight: bool) {
    let marker = if highlight { "*" } else { " " };
    let status = if league.last_import_successful {
        "imported"
    } else {
        "needs retry"
    };
    println!(
        "{marker} {} {} {} [{status}]",
        league.season, league.league_id, league.name
    );
}

/// Handle the league-chain command
///
/// With a league id, lists every stored season of that league's chain.
/// Without one, lists the newest season of every stored chain.
pub fn handle_league_chain(ctx: &CommandContext, league_id: Option<&LeagueId>) -> Result<()> {
    match league_id {
        Some(league_id) => {
            let chain = ctx.db.related_leagues(league_id)?;
            if chain.is_empty() {
                println!("League {league_id} is not stored. Import it first.");
                return Ok(());
            }
            println!("Seasons of league {league_id} (oldest first):");
            for league in &chain {
                print_league(league, &league.league_id == league_id);
            }
        }
        None => {
            let leagues = ctx.db.top_level_leagues()?;
            if leagues.is_empty() {
                println!("No leagues stored yet.");
                return Ok(());
            }
            println!("Stored leagues ({}):", leagues.len());
            for league in &leagues {
                print_league(league, false);
            }
        }
    }
    Ok(())
}
