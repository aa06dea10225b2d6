//! Refresh the shared NFL player directory.

use tracing::{info, warn};

use super::common::CommandContext;
use crate::{
    format, sleeper::SleeperClient, storage::LeagueDatabase, storage::PlayerRecord, Result,
};

/// Fetch every player and upsert them. Returns the number of players saved.
pub async fn update_players(db: &mut LeagueDatabase, api: &SleeperClient) -> Result<usize> {
    api.reset_error_flag();
    let players = api.get_players().await;
    if players.is_empty() {
        if api.error_flag() {
            warn!("Player directory unavailable, keeping stored players");
        } else {
            warn!("Player directory is empty");
        }
        return Ok(0);
    }

    let records: Vec<PlayerRecord> = players.values().map(format::player).collect();
    let saved = db.save_players(&records)?;
    info!(players = saved, "Player directory updated");
    Ok(saved)
}

/// Handle the update-players command
pub async fn handle_update_players(ctx: &mut CommandContext) -> Result<()> {
    let saved = update_players(&mut ctx.db, &ctx.api).await?;
    if saved == 0 {
        println!("✗ No players were updated");
    } else {
        println!("✓ Updated {saved} players");
    }
    Ok(())
}
