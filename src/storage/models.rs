//! Normalized records written to the league database
//!
//! Each record carries its own primary key. Composite keys are built by the
//! formatter (`{league_id}-{roster_id}` and friends) so the same remote entity
//! always maps to the same row.

use crate::cli::types::{DraftId, LeagueId, PlayerId, Season, UserId, Week};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Player information shared by every league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub full_name: String,
    pub search_full_name: String,
    pub search_last_name: String,
    pub position: Option<String>,
    pub fantasy_positions: Vec<String>,
    pub status: Option<String>,
    pub team: Option<String>,
    pub depth_chart_position: Option<String>,
    pub depth_chart_order: Option<u16>,
    pub injury_status: Option<String>,
    pub injury_body_part: Option<String>,
    pub injury_notes: Option<String>,
    pub years_exp: Option<u16>,
    pub birth_date: Option<String>,
    pub weight: Option<String>,
    pub height: Option<String>,
    pub college: Option<String>,
}

/// A Sleeper account. Crawl bookkeeping lives in the table, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueRecord {
    pub league_id: LeagueId,
    /// `None` for the first season of a chain.
    pub previous_league_id: Option<LeagueId>,
    pub name: String,
    pub season: Season,
    pub sport: String,
    pub status: String,
    pub total_rosters: u32,
    pub season_type: String,
    pub league_type: Option<i64>,
    pub settings: Value,
    pub scoring_settings: Value,
    pub roster_positions: Vec<String>,
    pub metadata: Option<Value>,
    pub draft_id: Option<DraftId>,
    pub bracket_id: Option<i64>,
    pub loser_bracket_id: Option<i64>,
    pub avatar: Option<String>,
    pub member_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRecord {
    /// `{league_id}-{roster_id}`
    pub roster_key: String,
    pub league_id: LeagueId,
    pub roster_id: u32,
    pub owner_id: Option<UserId>,
    pub team_name: String,
    pub players: BTreeSet<PlayerId>,
    pub starters: BTreeSet<PlayerId>,
    pub taxi: BTreeSet<PlayerId>,
    pub reserve: BTreeSet<PlayerId>,
    pub co_owners: BTreeSet<UserId>,
    pub settings: Value,
}

/// Transaction subtype with its variant-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransactionDetail {
    /// Trade legs mirror each other, so `players` is the key set of `adds`.
    /// The raw per-roster maps are kept as-is.
    Trade {
        players: BTreeSet<PlayerId>,
        adds: Option<Value>,
        drops: Option<Value>,
    },
    Waiver {
        adds: Vec<PlayerId>,
        drops: Vec<PlayerId>,
    },
    FreeAgent {
        adds: Vec<PlayerId>,
        drops: Vec<PlayerId>,
    },
    Commissioner {
        adds: Vec<PlayerId>,
        drops: Vec<PlayerId>,
    },
}

/// Tag routing a transaction to its subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Trade,
    Waiver,
    FreeAgent,
    Commissioner,
}

impl TransactionKind {
    /// Match Sleeper's `type` with underscores stripped (`free_agent` -> `freeagent`).
    pub fn from_type(raw: &str) -> Option<Self> {
        match raw.replace('_', "").as_str() {
            "trade" => Some(Self::Trade),
            "waiver" => Some(Self::Waiver),
            "freeagent" => Some(Self::FreeAgent),
            "commissioner" => Some(Self::Commissioner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Waiver => "waiver",
            Self::FreeAgent => "freeagent",
            Self::Commissioner => "commissioner",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransactionDetail {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Trade { .. } => TransactionKind::Trade,
            Self::Waiver { .. } => TransactionKind::Waiver,
            Self::FreeAgent { .. } => TransactionKind::FreeAgent,
            Self::Commissioner { .. } => TransactionKind::Commissioner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub league_id: LeagueId,
    pub leg: u16,
    pub status: String,
    pub creator: UserId,
    /// Namespaced roster keys.
    pub roster_ids: BTreeSet<String>,
    pub consenter_ids: Option<Vec<u32>>,
    pub draft_picks: Option<Value>,
    pub waiver_budget: Option<Value>,
    pub metadata: Option<Value>,
    pub settings: Option<Value>,
    pub created: DateTime<Utc>,
    pub status_updated: DateTime<Utc>,
    pub detail: TransactionDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRecord {
    /// `{league_id}-{roster_id}-{week}`
    pub matchup_key: String,
    pub opponent_matchup_key: Option<String>,
    pub league_id: LeagueId,
    pub week: Week,
    pub roster_key: String,
    pub players: BTreeSet<PlayerId>,
    pub starters: BTreeSet<PlayerId>,
    pub players_points: Value,
    pub starters_points: Value,
    pub points: f64,
    pub custom_points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub draft_id: DraftId,
    pub league_id: LeagueId,
    pub draft_type: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub slot_to_roster_id: Value,
    pub draft_order: Value,
    pub settings: Value,
    pub season_type: String,
    pub season: Option<Season>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    /// `{draft_id}-{round}-{draft_slot}`
    pub pick_id: String,
    pub draft_id: DraftId,
    pub round: u16,
    pub draft_slot: u16,
    pub pick_no: u16,
    pub roster_key: Option<String>,
    pub player_id: PlayerId,
    pub picked_by: Option<UserId>,
    pub metadata: Option<Value>,
}

/// Target table of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Player,
    User,
    League,
    Roster,
    Transaction(TransactionKind),
    Matchup,
    Draft,
    Pick,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::User => f.write_str("user"),
            Self::League => f.write_str("league"),
            Self::Roster => f.write_str("roster"),
            Self::Transaction(kind) => write!(f, "transaction.{kind}"),
            Self::Matchup => f.write_str("matchup"),
            Self::Draft => f.write_str("draft"),
            Self::Pick => f.write_str("pick"),
        }
    }
}

/// One normalized record ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "fields", rename_all = "lowercase")]
pub enum Record {
    Player(PlayerRecord),
    User(UserRecord),
    League(LeagueRecord),
    Roster(RosterRecord),
    Transaction(TransactionRecord),
    Matchup(MatchupRecord),
    Draft(DraftRecord),
    Pick(PickRecord),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Player(_) => EntityKind::Player,
            Record::User(_) => EntityKind::User,
            Record::League(_) => EntityKind::League,
            Record::Roster(_) => EntityKind::Roster,
            Record::Transaction(t) => EntityKind::Transaction(t.detail.kind()),
            Record::Matchup(_) => EntityKind::Matchup,
            Record::Draft(_) => EntityKind::Draft,
            Record::Pick(_) => EntityKind::Pick,
        }
    }

    pub fn primary_key(&self) -> String {
        match self {
            Record::Player(p) => p.player_id.to_string(),
            Record::User(u) => u.user_id.to_string(),
            Record::League(l) => l.league_id.to_string(),
            Record::Roster(r) => r.roster_key.clone(),
            Record::Transaction(t) => t.transaction_id.clone(),
            Record::Matchup(m) => m.matchup_key.clone(),
            Record::Draft(d) => d.draft_id.to_string(),
            Record::Pick(p) => p.pick_id.clone(),
        }
    }
}

/// Crawl bookkeeping for a stored user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCandidate {
    pub user_id: UserId,
    pub last_crawled: DateTime<Utc>,
    pub all_seasons_crawled: bool,
}

/// A stored league as shown in chain listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueSummary {
    pub league_id: LeagueId,
    pub previous_league_id: Option<LeagueId>,
    pub name: String,
    pub season: Season,
    pub last_import_successful: bool,
}
