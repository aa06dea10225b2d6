//! Pure transforms from raw Sleeper payloads to normalized records.
//!
//! Nothing in here touches the network or the database. Each function takes
//! one payload shape plus the context it cannot know on its own (league id,
//! week) and returns a record ready for [`LeagueDatabase::save`].
//!
//! [`LeagueDatabase::save`]: crate::storage::LeagueDatabase::save

use crate::cli::types::{LeagueId, PlayerId, UserId, Week};
use crate::error::{Result, SleeperError};
use crate::sleeper::types::{
    RawDraft, RawLeague, RawMatchup, RawPick, RawPlayer, RawRoster, RawTransaction, RawUser,
};
use crate::storage::models::{
    DraftRecord, LeagueRecord, MatchupRecord, PickRecord, PlayerRecord, RosterRecord,
    TransactionDetail, TransactionKind, TransactionRecord, UserRecord,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;


/// `{league_id}-{roster_id}`, the stored key of a roster.
pub fn roster_key(league_id: &LeagueId, roster_id: u32) -> String {
    format!("{league_id}-{roster_id}")
}

/// `{league_id}-{roster_id}-{week}`, the stored key of one side of a matchup.
pub fn matchup_key(league_id: &LeagueId, roster_id: u32, week: Week) -> String {
    format!("{league_id}-{roster_id}-{week}")
}

/// `{draft_id}-{round}-{draft_slot}`; picks are addressed by board position.
pub fn pick_key(raw: &RawPick) -> String {
    format!("{}-{}-{}", raw.draft_id, raw.round, raw.draft_slot)
}

fn timestamp(field: &'static str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(SleeperError::InvalidTimestamp { field, millis })
}

fn id_set<T: Ord + Clone>(ids: &Option<Vec<T>>) -> BTreeSet<T> {
    ids.iter().flatten().cloned().collect()
}

fn default_team_name(roster_id: u32) -> String {
    format!("Team {roster_id}")
}

pub fn league(raw: &RawLeague, member_ids: Vec<UserId>) -> LeagueRecord {
    LeagueRecord {
        league_id: raw.league_id.clone(),
        previous_league_id: raw.predecessor().cloned(),
        name: raw.name.clone(),
        season: raw.season,
        sport: raw.sport.clone(),
        status: raw.status.clone(),
        total_rosters: raw.total_rosters,
        season_type: raw.season_type.clone(),
        league_type: raw.league_type(),
        settings: raw.settings.clone(),
        scoring_settings: raw.scoring_settings.clone(),
        roster_positions: raw.roster_positions.clone(),
        metadata: raw.metadata.clone(),
        draft_id: raw.draft_id.clone(),
        bracket_id: raw.bracket_id,
        loser_bracket_id: raw.loser_bracket_id,
        avatar: raw.avatar.clone(),
        member_ids,
    }
}

pub fn transaction(raw: &RawTransaction, league_id: &LeagueId) -> Result<TransactionRecord> {
    let kind =
        TransactionKind::from_type(&raw.kind).ok_or_else(|| SleeperError::UnknownTransactionType {
            transaction_id: raw.transaction_id.clone(),
            kind: raw.kind.clone(),
        })?;

    let keys = |map: &Option<BTreeMap<PlayerId, Value>>| -> Vec<PlayerId> {
        map.iter().flat_map(|m| m.keys().cloned()).collect()
    };
    let as_value = |map: &Option<BTreeMap<PlayerId, Value>>| -> Result<Option<Value>> {
        map.as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(SleeperError::from)
    };

    let detail = match kind {
        TransactionKind::Trade => TransactionDetail::Trade {
            players: keys(&raw.adds).into_iter().collect(),
            adds: as_value(&raw.adds)?,
            drops: as_value(&raw.drops)?,
        },
        TransactionKind::Waiver => TransactionDetail::Waiver {
            adds: keys(&raw.adds),
            drops: keys(&raw.drops),
        },
        TransactionKind::FreeAgent => TransactionDetail::FreeAgent {
            adds: keys(&raw.adds),
            drops: keys(&raw.drops),
        },
        TransactionKind::Commissioner => TransactionDetail::Commissioner {
            adds: keys(&raw.adds),
            drops: keys(&raw.drops),
        },
    };

    Ok(TransactionRecord {
        transaction_id: raw.transaction_id.clone(),
        league_id: league_id.clone(),
        leg: raw.leg,
        status: raw.status.clone(),
        creator: raw.creator.clone(),
        roster_ids: raw
            .roster_ids
            .iter()
            .map(|id| roster_key(league_id, *id))
            .collect(),
        consenter_ids: raw.consenter_ids.clone(),
        draft_picks: raw.draft_picks.clone(),
        waiver_budget: raw.waiver_budget.clone(),
        metadata: raw.metadata.clone(),
        settings: raw.settings.clone(),
        created: timestamp("created", raw.created)?,
        status_updated: timestamp("status_updated", raw.status_updated)?,
        detail,
    })
}

pub fn user(raw: &RawUser) -> UserRecord {
    UserRecord {
        user_id: raw.user_id.clone(),
        display_name: raw.display_name.clone(),
        avatar: raw.avatar.clone(),
    }
}

fn roster_with_name(raw: &RawRoster, league_id: &LeagueId, team_name: String) -> RosterRecord {
    RosterRecord {
        roster_key: roster_key(league_id, raw.roster_id),
        league_id: league_id.clone(),
        roster_id: raw.roster_id,
        owner_id: raw.owner_id.clone(),
        team_name,
        players: id_set(&raw.players),
        starters: id_set(&raw.starters),
        taxi: id_set(&raw.taxi),
        reserve: id_set(&raw.reserve),
        co_owners: id_set(&raw.co_owners),
        settings: raw.settings.clone(),
    }
}

/// A roster with no paired user: ownerless, orphaned, or owner unresolved.
pub fn roster(raw: &RawRoster, league_id: &LeagueId) -> RosterRecord {
    roster_with_name(raw, league_id, default_team_name(raw.roster_id))
}

/// A roster joined with the user that owns it.
pub fn roster_and_user(
    raw: &RawRoster,
    owner: &RawUser,
    league_id: &LeagueId,
) -> Result<(RosterRecord, UserRecord)> {
    if raw.owner_id.as_ref() != Some(&owner.user_id) {
        return Err(SleeperError::OwnerMismatch {
            roster_id: roster_key(league_id, raw.roster_id),
            owner_id: raw.owner_id.as_ref().map(ToString::to_string),
            user_id: owner.user_id.to_string(),
        });
    }

    let team_name = match owner.team_name() {
        Some(name) => name.to_string(),
        None if !owner.display_name.is_empty() => format!("{}'s Team", owner.display_name),
        None => default_team_name(raw.roster_id),
    };

    Ok((roster_with_name(raw, league_id, team_name), user(owner)))
}

fn matchup(raw: &RawMatchup, league_id: &LeagueId, week: Week) -> MatchupRecord {
    MatchupRecord {
        matchup_key: matchup_key(league_id, raw.roster_id, week),
        opponent_matchup_key: None,
        league_id: league_id.clone(),
        week,
        roster_key: roster_key(league_id, raw.roster_id),
        players: id_set(&raw.players),
        starters: id_set(&raw.starters),
        players_points: raw
            .players_points
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or(Value::Null),
        starters_points: raw
            .starters_points
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or(Value::Null),
        points: raw.points.unwrap_or_default(),
        custom_points: raw.custom_points,
    }
}

/// Pair one week's matchups by their raw `matchup_id`.
///
/// Rows without a `matchup_id` are emitted unpaired as they are seen. A pair
/// is emitted when its second side arrives, second side first. A side whose
/// opponent never shows up is not emitted.
pub fn matchups(raw: &[RawMatchup], league_id: &LeagueId, week: Week) -> Vec<MatchupRecord> {
    let mut formatted = Vec::with_capacity(raw.len());
    let mut pending: HashMap<u32, MatchupRecord> = HashMap::new();

    for entry in raw {
        let mut side = matchup(entry, league_id, week);
        let Some(raw_id) = entry.matchup_id else {
            formatted.push(side);
            continue;
        };

        match pending.remove(&raw_id) {
            Some(mut opponent) => {
                side.opponent_matchup_key = Some(opponent.matchup_key.clone());
                opponent.opponent_matchup_key = Some(side.matchup_key.clone());
                formatted.push(side);
                formatted.push(opponent);
            }
            None => {
                pending.insert(raw_id, side);
            }
        }
    }

    let mut dropped: Vec<(u32, MatchupRecord)> = pending.into_iter().collect();
    dropped.sort_by_key(|(raw_id, _)| *raw_id);
    for (raw_id, side) in dropped {
        warn!(
            %league_id,
            %week,
            matchup_id = raw_id,
            matchup = %side.matchup_key,
            "Matchup has no opponent, skipping"
        );
    }

    formatted
}

pub fn draft(raw: &RawDraft, league_id: &LeagueId) -> Result<DraftRecord> {
    let start_time = raw
        .start_time
        .map(|millis| timestamp("start_time", millis))
        .transpose()?;

    Ok(DraftRecord {
        draft_id: raw.draft_id.clone(),
        league_id: league_id.clone(),
        draft_type: raw.kind.clone(),
        status: raw.status.clone(),
        start_time,
        slot_to_roster_id: serde_json::to_value(&raw.slot_to_roster_id)?,
        draft_order: serde_json::to_value(&raw.draft_order)?,
        settings: raw.settings.clone(),
        season_type: raw.season_type.clone(),
        season: raw.season,
        metadata: raw.metadata.clone(),
    })
}

pub fn pick(raw: &RawPick, league_id: &LeagueId) -> PickRecord {
    PickRecord {
        pick_id: pick_key(raw),
        draft_id: raw.draft_id.clone(),
        round: raw.round,
        draft_slot: raw.draft_slot,
        pick_no: raw.pick_no,
        roster_key: raw.roster_id.map(|id| roster_key(league_id, id)),
        player_id: raw.player_id.clone(),
        picked_by: picked_by(raw),
        metadata: raw.metadata.clone(),
    }
}

/// The user who made a pick. Sleeper marks "nobody" with `""`.
pub fn picked_by(raw: &RawPick) -> Option<UserId> {
    raw.picked_by
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(UserId::from)
}

pub fn player(raw: &RawPlayer) -> PlayerRecord {
    let full_name = raw
        .full_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            [raw.first_name.as_deref(), raw.last_name.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });

    PlayerRecord {
        player_id: raw.player_id.clone(),
        full_name,
        search_full_name: raw.search_full_name.clone().unwrap_or_default(),
        search_last_name: raw.search_last_name.clone().unwrap_or_default(),
        position: raw.position.clone(),
        fantasy_positions: raw.fantasy_positions.clone().unwrap_or_default(),
        status: raw.status.clone(),
        team: raw.team.clone(),
        depth_chart_position: raw.depth_chart_position.clone(),
        depth_chart_order: raw.depth_chart_order,
        injury_status: raw.injury_status.clone(),
        injury_body_part: raw.injury_body_part.clone(),
        injury_notes: raw.injury_notes.clone(),
        years_exp: raw.years_exp,
        birth_date: raw.birth_date.clone(),
        weight: raw.weight.clone(),
        height: raw.height.clone(),
        college: raw.college.clone(),
    }
}
