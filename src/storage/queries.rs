//! Upserts and bookkeeping queries

use super::{models::*, schema::LeagueDatabase};
use crate::cli::types::{LeagueId, Season, UserId};
use crate::error::Result;
use crate::sleeper::http::MAX_CHAIN_LENGTH;
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Tables in foreign-key order, with the columns that order their rows.
const SNAPSHOT_TABLES: [(&str, &str); 14] = [
    ("players", "player_id"),
    ("users", "user_id"),
    ("leagues", "league_id"),
    ("league_members", "league_id, user_id"),
    ("rosters", "roster_key"),
    ("roster_players", "roster_key, slot, player_id"),
    ("roster_co_owners", "roster_key, user_id"),
    ("transactions", "transaction_id"),
    ("transaction_rosters", "transaction_id, roster_key"),
    ("transaction_players", "transaction_id, role, player_id"),
    ("matchups", "matchup_key"),
    ("matchup_players", "matchup_key, slot, player_id"),
    ("drafts", "draft_id"),
    ("picks", "pick_id"),
];

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn opt_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value.as_ref().map(to_json).transpose()
}

fn upsert_player(conn: &Connection, player: &PlayerRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO players (player_id, full_name, search_full_name, search_last_name,
                              position, fantasy_positions, status, team, depth_chart_position,
                              depth_chart_order, injury_status, injury_body_part, injury_notes,
                              years_exp, birth_date, weight, height, college)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(player_id) DO UPDATE SET
            full_name = excluded.full_name,
            search_full_name = excluded.search_full_name,
            search_last_name = excluded.search_last_name,
            position = excluded.position,
            fantasy_positions = excluded.fantasy_positions,
            status = excluded.status,
            team = excluded.team,
            depth_chart_position = excluded.depth_chart_position,
            depth_chart_order = excluded.depth_chart_order,
            injury_status = excluded.injury_status,
            injury_body_part = excluded.injury_body_part,
            injury_notes = excluded.injury_notes,
            years_exp = excluded.years_exp,
            birth_date = excluded.birth_date,
            weight = excluded.weight,
            height = excluded.height,
            college = excluded.college",
        params![
            player.player_id.as_str(),
            player.full_name,
            player.search_full_name,
            player.search_last_name,
            player.position,
            to_json(&player.fantasy_positions)?,
            player.status,
            player.team,
            player.depth_chart_position,
            player.depth_chart_order,
            player.injury_status,
            player.injury_body_part,
            player.injury_notes,
            player.years_exp,
            player.birth_date,
            player.weight,
            player.height,
            player.college,
        ],
    )?;
    Ok(())
}

// Crawl bookkeeping columns are left alone on update.
fn upsert_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, display_name, avatar) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            display_name = excluded.display_name,
            avatar = excluded.avatar",
        params![user.user_id.as_str(), user.display_name, user.avatar],
    )?;
    Ok(())
}

// `last_import_successful` is only changed through `mark_league_import`.
fn upsert_league(conn: &Connection, league: &LeagueRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO leagues (league_id, previous_league_id, name, season, sport, status,
                              total_rosters, season_type, league_type, settings,
                              scoring_settings, roster_positions, metadata, draft_id,
                              bracket_id, loser_bracket_id, avatar)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
         ON CONFLICT(league_id) DO UPDATE SET
            previous_league_id = excluded.previous_league_id,
            name = excluded.name,
            season = excluded.season,
            sport = excluded.sport,
            status = excluded.status,
            total_rosters = excluded.total_rosters,
            season_type = excluded.season_type,
            league_type = excluded.league_type,
            settings = excluded.settings,
            scoring_settings = excluded.scoring_settings,
            roster_positions = excluded.roster_positions,
            metadata = excluded.metadata,
            draft_id = excluded.draft_id,
            bracket_id = excluded.bracket_id,
            loser_bracket_id = excluded.loser_bracket_id,
            avatar = excluded.avatar",
        params![
            league.league_id.as_str(),
            league.previous_league_id.as_ref().map(LeagueId::as_str),
            league.name,
            league.season.as_u16(),
            league.sport,
            league.status,
            league.total_rosters,
            league.season_type,
            league.league_type,
            to_json(&league.settings)?,
            to_json(&league.scoring_settings)?,
            to_json(&league.roster_positions)?,
            opt_json(&league.metadata)?,
            league.draft_id.as_ref().map(|id| id.as_str()),
            league.bracket_id,
            league.loser_bracket_id,
            league.avatar,
        ],
    )?;

    conn.execute(
        "DELETE FROM league_members WHERE league_id = ?1",
        [league.league_id.as_str()],
    )?;
    for member in &league.member_ids {
        conn.execute(
            "INSERT OR IGNORE INTO league_members (league_id, user_id) VALUES (?1, ?2)",
            params![league.league_id.as_str(), member.as_str()],
        )?;
    }
    Ok(())
}

fn upsert_roster(conn: &Connection, roster: &RosterRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO rosters (roster_key, league_id, roster_id, owner_id, team_name, settings)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(roster_key) DO UPDATE SET
            league_id = excluded.league_id,
            roster_id = excluded.roster_id,
            owner_id = excluded.owner_id,
            team_name = excluded.team_name,
            settings = excluded.settings",
        params![
            roster.roster_key,
            roster.league_id.as_str(),
            roster.roster_id,
            roster.owner_id.as_ref().map(UserId::as_str),
            roster.team_name,
            to_json(&roster.settings)?,
        ],
    )?;

    conn.execute(
        "DELETE FROM roster_players WHERE roster_key = ?1",
        [&roster.roster_key],
    )?;
    let slots = [
        ("players", &roster.players),
        ("starters", &roster.starters),
        ("taxi", &roster.taxi),
        ("reserve", &roster.reserve),
    ];
    for (slot, players) in slots {
        for player_id in players {
            conn.execute(
                "INSERT INTO roster_players (roster_key, player_id, slot) VALUES (?1, ?2, ?3)",
                params![roster.roster_key, player_id.as_str(), slot],
            )?;
        }
    }

    conn.execute(
        "DELETE FROM roster_co_owners WHERE roster_key = ?1",
        [&roster.roster_key],
    )?;
    for user_id in &roster.co_owners {
        conn.execute(
            "INSERT INTO roster_co_owners (roster_key, user_id) VALUES (?1, ?2)",
            params![roster.roster_key, user_id.as_str()],
        )?;
    }
    Ok(())
}

fn upsert_transaction(conn: &Connection, transaction: &TransactionRecord) -> Result<()> {
    let (trade_adds, trade_drops) = match &transaction.detail {
        TransactionDetail::Trade { adds, drops, .. } => (opt_json(adds)?, opt_json(drops)?),
        _ => (None, None),
    };

    conn.execute(
        "INSERT INTO transactions (transaction_id, league_id, kind, leg, status, creator,
                                   consenter_ids, draft_picks, waiver_budget, metadata, settings,
                                   trade_adds, trade_drops, created, status_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
         ON CONFLICT(transaction_id) DO UPDATE SET
            league_id = excluded.league_id,
            kind = excluded.kind,
            leg = excluded.leg,
            status = excluded.status,
            creator = excluded.creator,
            consenter_ids = excluded.consenter_ids,
            draft_picks = excluded.draft_picks,
            waiver_budget = excluded.waiver_budget,
            metadata = excluded.metadata,
            settings = excluded.settings,
            trade_adds = excluded.trade_adds,
            trade_drops = excluded.trade_drops,
            created = excluded.created,
            status_updated = excluded.status_updated",
        params![
            transaction.transaction_id,
            transaction.league_id.as_str(),
            transaction.detail.kind().as_str(),
            transaction.leg,
            transaction.status,
            transaction.creator.as_str(),
            opt_json(&transaction.consenter_ids)?,
            opt_json(&transaction.draft_picks)?,
            opt_json(&transaction.waiver_budget)?,
            opt_json(&transaction.metadata)?,
            opt_json(&transaction.settings)?,
            trade_adds,
            trade_drops,
            transaction.created.timestamp_millis(),
            transaction.status_updated.timestamp_millis(),
        ],
    )?;

    conn.execute(
        "DELETE FROM transaction_rosters WHERE transaction_id = ?1",
        [&transaction.transaction_id],
    )?;
    for roster_key in &transaction.roster_ids {
        conn.execute(
            "INSERT INTO transaction_rosters (transaction_id, roster_key) VALUES (?1, ?2)",
            params![transaction.transaction_id, roster_key],
        )?;
    }

    conn.execute(
        "DELETE FROM transaction_players WHERE transaction_id = ?1",
        [&transaction.transaction_id],
    )?;
    let insert_player = |player_id: &str, role: &str| -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO transaction_players (transaction_id, player_id, role)
             VALUES (?1, ?2, ?3)",
            params![transaction.transaction_id, player_id, role],
        )?;
        Ok(())
    };
    match &transaction.detail {
        TransactionDetail::Trade { players, .. } => {
            for player_id in players {
                insert_player(player_id.as_str(), "player")?;
            }
        }
        TransactionDetail::Waiver { adds, drops }
        | TransactionDetail::FreeAgent { adds, drops }
        | TransactionDetail::Commissioner { adds, drops } => {
            for player_id in adds {
                insert_player(player_id.as_str(), "add")?;
            }
            for player_id in drops {
                insert_player(player_id.as_str(), "drop")?;
            }
        }
    }
    Ok(())
}

fn upsert_matchup(conn: &Connection, matchup: &MatchupRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO matchups (matchup_key, opponent_matchup_key, league_id, week, roster_key,
                               players_points, starters_points, points, custom_points)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(matchup_key) DO UPDATE SET
            opponent_matchup_key = excluded.opponent_matchup_key,
            league_id = excluded.league_id,
            week = excluded.week,
            roster_key = excluded.roster_key,
            players_points = excluded.players_points,
            starters_points = excluded.starters_points,
            points = excluded.points,
            custom_points = excluded.custom_points",
        params![
            matchup.matchup_key,
            matchup.opponent_matchup_key,
            matchup.league_id.as_str(),
            matchup.week.as_u16(),
            matchup.roster_key,
            to_json(&matchup.players_points)?,
            to_json(&matchup.starters_points)?,
            matchup.points,
            matchup.custom_points,
        ],
    )?;

    conn.execute(
        "DELETE FROM matchup_players WHERE matchup_key = ?1",
        [&matchup.matchup_key],
    )?;
    for (slot, players) in [("players", &matchup.players), ("starters", &matchup.starters)] {
        for player_id in players {
            conn.execute(
                "INSERT INTO matchup_players (matchup_key, player_id, slot) VALUES (?1, ?2, ?3)",
                params![matchup.matchup_key, player_id.as_str(), slot],
            )?;
        }
    }
    Ok(())
}

fn upsert_draft(conn: &Connection, draft: &DraftRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO drafts (draft_id, league_id, draft_type, status, start_time,
                             slot_to_roster_id, draft_order, settings, season_type, season,
                             metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(draft_id) DO UPDATE SET
            league_id = excluded.league_id,
            draft_type = excluded.draft_type,
            status = excluded.status,
            start_time = excluded.start_time,
            slot_to_roster_id = excluded.slot_to_roster_id,
            draft_order = excluded.draft_order,
            settings = excluded.settings,
            season_type = excluded.season_type,
            season = excluded.season,
            metadata = excluded.metadata",
        params![
            draft.draft_id.as_str(),
            draft.league_id.as_str(),
            draft.draft_type,
            draft.status,
            draft.start_time.map(|t| t.timestamp_millis()),
            to_json(&draft.slot_to_roster_id)?,
            to_json(&draft.draft_order)?,
            to_json(&draft.settings)?,
            draft.season_type,
            draft.season.map(|s| s.as_u16()),
            opt_json(&draft.metadata)?,
        ],
    )?;
    Ok(())
}

fn upsert_pick(conn: &Connection, pick: &PickRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO picks (pick_id, draft_id, round, draft_slot, pick_no, roster_key,
                            player_id, picked_by, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(pick_id) DO UPDATE SET
            draft_id = excluded.draft_id,
            round = excluded.round,
            draft_slot = excluded.draft_slot,
            pick_no = excluded.pick_no,
            roster_key = excluded.roster_key,
            player_id = excluded.player_id,
            picked_by = excluded.picked_by,
            metadata = excluded.metadata",
        params![
            pick.pick_id,
            pick.draft_id.as_str(),
            pick.round,
            pick.draft_slot,
            pick.pick_no,
            pick.roster_key,
            pick.player_id.as_str(),
            pick.picked_by.as_ref().map(UserId::as_str),
            opt_json(&pick.metadata)?,
        ],
    )?;
    Ok(())
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => format!("<{} bytes>", blob.len()),
    }
}

fn row_to_league_summary(row: &Row) -> rusqlite::Result<LeagueSummary> {
    Ok(LeagueSummary {
        league_id: LeagueId(row.get(0)?),
        previous_league_id: row.get::<_, Option<String>>(1)?.map(LeagueId),
        name: row.get(2)?,
        season: Season::new(row.get(3)?),
        last_import_successful: row.get(4)?,
    })
}

const LEAGUE_SUMMARY_COLUMNS: &str =
    "league_id, previous_league_id, name, season, last_import_successful";

impl LeagueDatabase {
    /// Upsert one record and its join rows in a single transaction.
    ///
    /// A constraint violation rolls back this record only; see
    /// [`SleeperError::is_persistence_conflict`](crate::error::SleeperError::is_persistence_conflict).
    pub fn save(&mut self, record: &Record) -> Result<()> {
        let tx = self.conn.transaction()?;
        match record {
            Record::Player(player) => upsert_player(&tx, player)?,
            Record::User(user) => upsert_user(&tx, user)?,
            Record::League(league) => upsert_league(&tx, league)?,
            Record::Roster(roster) => upsert_roster(&tx, roster)?,
            Record::Transaction(transaction) => upsert_transaction(&tx, transaction)?,
            Record::Matchup(matchup) => upsert_matchup(&tx, matchup)?,
            Record::Draft(draft) => upsert_draft(&tx, draft)?,
            Record::Pick(pick) => upsert_pick(&tx, pick)?,
        }
        tx.commit()?;
        Ok(())
    }

    /// Upsert the whole player directory in one transaction
    pub fn save_players(&mut self, players: &[PlayerRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for player in players {
            upsert_player(&tx, player)?;
        }
        tx.commit()?;
        Ok(players.len())
    }

    pub fn mark_league_import(&mut self, league_id: &LeagueId, successful: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE leagues SET last_import_successful = ?1 WHERE league_id = ?2",
            params![successful, league_id.as_str()],
        )?;
        Ok(())
    }

    pub fn league_exists(&self, league_id: &LeagueId) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM leagues WHERE league_id = ?1",
                [league_id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// `None` when the league has never been stored.
    pub fn league_import_successful(&self, league_id: &LeagueId) -> Result<Option<bool>> {
        Ok(self
            .conn
            .query_row(
                "SELECT last_import_successful FROM leagues WHERE league_id = ?1",
                [league_id.as_str()],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Leagues whose last import left data behind, ordered by id
    pub fn failed_league_ids(&self) -> Result<Vec<LeagueId>> {
        let mut stmt = self.conn.prepare(
            "SELECT league_id FROM leagues WHERE last_import_successful = 0 ORDER BY league_id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|id| id.map(LeagueId))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn user_exists(&self, user_id: &UserId) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                [user_id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// The `limit` users with the oldest crawl watermark, ties broken by id
    pub fn least_recently_crawled_users(&self, limit: usize) -> Result<Vec<CrawlCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, last_crawled, all_seasons_crawled FROM users
             ORDER BY last_crawled ASC, user_id ASC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let users = stmt
            .query_map([limit], |row| {
                let millis: i64 = row.get(1)?;
                Ok(CrawlCandidate {
                    user_id: UserId(row.get(0)?),
                    last_crawled: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
                    all_seasons_crawled: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Advance a user's crawl watermark. `all_seasons_crawled` only ever turns on.
    pub fn touch_user_crawled(
        &mut self,
        user_id: &UserId,
        now: DateTime<Utc>,
        all_seasons_crawled: bool,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET last_crawled = ?1,
                              all_seasons_crawled = MAX(all_seasons_crawled, ?2)
             WHERE user_id = ?3",
            params![now.timestamp_millis(), all_seasons_crawled, user_id.as_str()],
        )?;
        Ok(())
    }

    pub fn get_league_summary(&self, league_id: &LeagueId) -> Result<Option<LeagueSummary>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {LEAGUE_SUMMARY_COLUMNS} FROM leagues WHERE league_id = ?1"),
                [league_id.as_str()],
                row_to_league_summary,
            )
            .optional()?)
    }

    fn successor_of(&self, league_id: &LeagueId) -> Result<Option<LeagueSummary>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {LEAGUE_SUMMARY_COLUMNS} FROM leagues
                     WHERE previous_league_id = ?1 ORDER BY league_id LIMIT 1"
                ),
                [league_id.as_str()],
                row_to_league_summary,
            )
            .optional()?)
    }

    /// Every stored season of the chain containing `league_id`, oldest first.
    pub fn related_leagues(&self, league_id: &LeagueId) -> Result<Vec<LeagueSummary>> {
        let Some(start) = self.get_league_summary(league_id)? else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::from([start.league_id.clone()]);
        let mut older = Vec::new();
        let mut cursor = start.previous_league_id.clone();
        while let Some(id) = cursor.take() {
            if older.len() >= MAX_CHAIN_LENGTH || !seen.insert(id.clone()) {
                break;
            }
            if let Some(league) = self.get_league_summary(&id)? {
                cursor = league.previous_league_id.clone();
                older.push(league);
            }
        }

        let mut newer = Vec::new();
        let mut cursor = start.league_id.clone();
        while newer.len() < MAX_CHAIN_LENGTH {
            let Some(league) = self.successor_of(&cursor)? else {
                break;
            };
            if !seen.insert(league.league_id.clone()) {
                break;
            }
            cursor = league.league_id.clone();
            newer.push(league);
        }

        older.reverse();
        older.push(start);
        older.extend(newer);
        Ok(older)
    }

    /// The newest season of every stored chain.
    pub fn top_level_leagues(&self) -> Result<Vec<LeagueSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEAGUE_SUMMARY_COLUMNS} FROM leagues l
             WHERE NOT EXISTS (
                SELECT 1 FROM leagues s WHERE s.previous_league_id = l.league_id
             )
             ORDER BY season DESC, league_id"
        ))?;
        let leagues = stmt
            .query_map([], row_to_league_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leagues)
    }

    /// Every row of every table in key order, rendered as text.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut snapshot = BTreeMap::new();
        for (table, order) in SNAPSHOT_TABLES {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT * FROM {table} ORDER BY {order}"))?;
            let columns = stmt.column_count();
            let rows = stmt
                .query_map([], |row| {
                    (0..columns)
                        .map(|i| row.get_ref(i).map(render_value))
                        .collect::<rusqlite::Result<Vec<_>>>()
                        .map(|values| values.join("|"))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            snapshot.insert(table.to_string(), rows);
        }
        Ok(snapshot)
    }

    /// Row count of one table, for summaries and tests
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
