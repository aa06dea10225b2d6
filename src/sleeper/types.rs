//! Raw payload shapes returned by the Sleeper API.
//!
//! Fields Sleeper sometimes omits and sometimes sends as `null` are `Option`
//! with `#[serde(default)]`; normalising them is the formatter's job.
//! Free-form JSON blobs (settings, metadata) stay as [`Value`].

use crate::cli::types::{DraftId, LeagueId, PlayerId, Season, UserId, Week};
use serde::{de::Error, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;


/// `settings.type` value of a dynasty league.
pub const DYNASTY_LEAGUE_TYPE: i64 = 2;

/// Accept player-keyed maps whose values may be any JSON (Sleeper sends roster ids).
fn de_opt_key_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<PlayerId, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Deserialize::deserialize(deserializer)?;
    raw.map(|m| {
        m.into_iter()
            .map(|(k, v)| {
                if k.is_empty() {
                    Err(D::Error::custom("empty player id key"))
                } else {
                    Ok((PlayerId(k), v))
                }
            })
            .collect()
    })
    .transpose()
}

/// Sleeper mixes strings and numbers for some player attributes (`weight`).
fn de_opt_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Deserialize::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawLeague {
    pub league_id: LeagueId,
    #[serde(default)]
    pub previous_league_id: Option<LeagueId>,
    #[serde(default)]
    pub name: String,
    pub season: Season,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_rosters: u32,
    #[serde(default)]
    pub season_type: String,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub scoring_settings: Value,
    #[serde(default)]
    pub roster_positions: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub draft_id: Option<DraftId>,
    #[serde(default)]
    pub bracket_id: Option<i64>,
    #[serde(default)]
    pub loser_bracket_id: Option<i64>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl RawLeague {
    /// The predecessor league, with the `'0'` marker mapped to `None`.
    pub fn predecessor(&self) -> Option<&LeagueId> {
        self.previous_league_id
            .as_ref()
            .filter(|id| !id.is_chain_terminator())
    }

    /// League format from `settings.type` (0 redraft, 1 keeper, 2 dynasty).
    pub fn league_type(&self) -> Option<i64> {
        self.settings.get("type").and_then(Value::as_i64)
    }

    pub fn is_dynasty(&self) -> bool {
        self.league_type() == Some(DYNASTY_LEAGUE_TYPE)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawUser {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl RawUser {
    /// Team name the owner configured for this league, if any.
    pub fn team_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get("team_name")?
            .as_str()
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawRoster {
    pub roster_id: u32,
    #[serde(default)]
    pub league_id: Option<LeagueId>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub players: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub starters: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub taxi: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub reserve: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub co_owners: Option<Vec<UserId>>,
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawTransaction {
    pub transaction_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub leg: u16,
    pub created: i64,
    pub status_updated: i64,
    pub creator: UserId,
    #[serde(default)]
    pub roster_ids: Vec<u32>,
    #[serde(default)]
    pub consenter_ids: Option<Vec<u32>>,
    #[serde(default, deserialize_with = "de_opt_key_map")]
    pub adds: Option<BTreeMap<PlayerId, Value>>,
    #[serde(default, deserialize_with = "de_opt_key_map")]
    pub drops: Option<BTreeMap<PlayerId, Value>>,
    #[serde(default)]
    pub draft_picks: Option<Value>,
    #[serde(default)]
    pub waiver_budget: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawMatchup {
    pub roster_id: u32,
    #[serde(default)]
    pub matchup_id: Option<u32>,
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub custom_points: Option<f64>,
    #[serde(default)]
    pub players: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub starters: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub players_points: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub starters_points: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawDraft {
    pub draft_id: DraftId,
    #[serde(default)]
    pub league_id: Option<LeagueId>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub slot_to_roster_id: Option<BTreeMap<String, Option<u32>>>,
    #[serde(default)]
    pub draft_order: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub season_type: String,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawPick {
    pub draft_id: DraftId,
    pub round: u16,
    pub draft_slot: u16,
    #[serde(default)]
    pub pick_no: u16,
    pub player_id: PlayerId,
    #[serde(default)]
    pub roster_id: Option<u32>,
    #[serde(default)]
    pub picked_by: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawPlayer {
    pub player_id: PlayerId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub search_full_name: Option<String>,
    #[serde(default)]
    pub search_last_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub fantasy_positions: Option<Vec<String>>,
    #[serde(default)]
    pub depth_chart_position: Option<String>,
    #[serde(default)]
    pub depth_chart_order: Option<u16>,
    #[serde(default)]
    pub injury_status: Option<String>,
    #[serde(default)]
    pub injury_body_part: Option<String>,
    #[serde(default)]
    pub injury_notes: Option<String>,
    #[serde(default)]
    pub years_exp: Option<u16>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub height: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
}

/// Phase of the NFL calendar reported by `/state/nfl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonType {
    Pre,
    Regular,
    Post,
    Off,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NflState {
    pub season: Season,
    pub season_type: SeasonType,
    #[serde(default)]
    pub week: Week,
    /// Week in progress for the current season type.
    #[serde(default)]
    pub leg: Week,
}
