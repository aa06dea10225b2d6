//! Unit tests for storage functionality

use super::*;
use crate::cli::types::{LeagueId, PlayerId, Season, UserId, Week};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::collections::BTreeSet;

fn create_test_db() -> LeagueDatabase {
    LeagueDatabase::new_in_memory().unwrap()
}

fn test_user(id: &str) -> UserRecord {
    UserRecord {
        user_id: UserId::new(id),
        display_name: format!("user{id}"),
        avatar: None,
    }
}

fn test_player(id: &str) -> PlayerRecord {
    PlayerRecord {
        player_id: PlayerId::new(id),
        full_name: format!("Player {id}"),
        search_full_name: format!("player{id}"),
        search_last_name: id.to_string(),
        position: Some("WR".to_string()),
        fantasy_positions: vec!["WR".to_string()],
        status: Some("Active".to_string()),
        team: Some("KC".to_string()),
        depth_chart_position: None,
        depth_chart_order: None,
        injury_status: None,
        injury_body_part: None,
        injury_notes: None,
        years_exp: Some(3),
        birth_date: None,
        weight: Some("200".to_string()),
        height: None,
        college: None,
    }
}

fn test_league(id: &str, previous: Option<&str>, season: u16) -> LeagueRecord {
    LeagueRecord {
        league_id: LeagueId::new(id),
        previous_league_id: previous.map(LeagueId::new),
        name: "Test League".to_string(),
        season: Season::new(season),
        sport: "nfl".to_string(),
        status: "complete".to_string(),
        total_rosters: 2,
        season_type: "regular".to_string(),
        league_type: Some(2),
        settings: json!({"type": 2}),
        scoring_settings: json!({"rec": 1.0}),
        roster_positions: vec!["QB".to_string()],
        metadata: None,
        draft_id: None,
        bracket_id: None,
        loser_bracket_id: None,
        avatar: None,
        member_ids: vec![UserId::new("1")],
    }
}

fn test_roster(league_id: &str, roster_id: u32, owner: Option<&str>) -> RosterRecord {
    RosterRecord {
        roster_key: format!("{league_id}-{roster_id}"),
        league_id: LeagueId::new(league_id),
        roster_id,
        owner_id: owner.map(UserId::new),
        team_name: "Team".to_string(),
        players: BTreeSet::from([PlayerId::new("101"), PlayerId::new("0")]),
        starters: BTreeSet::from([PlayerId::new("101")]),
        taxi: BTreeSet::new(),
        reserve: BTreeSet::new(),
        co_owners: BTreeSet::new(),
        settings: json!({}),
    }
}

/// Database holding user 1, player 101 and league 1000 (no predecessor)
fn create_seeded_db() -> LeagueDatabase {
    let mut db = create_test_db();
    db.save(&Record::User(test_user("1"))).unwrap();
    db.save(&Record::Player(test_player("101"))).unwrap();
    db.save(&Record::League(test_league("1000", None, 2023)))
        .unwrap();
    db
}

#[test]
fn test_database_creation_seeds_sentinel_players() {
    let db = create_test_db();

    let players = db.snapshot().unwrap().remove("players").unwrap();
    assert_eq!(players.len(), SENTINEL_PLAYERS.len());
    assert!(players.iter().any(|row| row.contains("OAK")));
}

#[test]
fn test_file_database_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("leagues.db");

    {
        let mut db = LeagueDatabase::new(&path).unwrap();
        db.save(&Record::User(test_user("1"))).unwrap();
    }

    // Schema creation is idempotent and data survives
    let db = LeagueDatabase::new(&path).unwrap();
    assert!(db.user_exists(&UserId::new("1")).unwrap());
    assert_eq!(db.count_rows("players").unwrap(), 2);
}

#[test]
fn test_upsert_user_keeps_crawl_watermark() {
    let mut db = create_test_db();
    db.save(&Record::User(test_user("1"))).unwrap();

    let now = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
    db.touch_user_crawled(&UserId::new("1"), now, true).unwrap();

    let mut renamed = test_user("1");
    renamed.display_name = "renamed".to_string();
    db.save(&Record::User(renamed)).unwrap();

    let users = db.least_recently_crawled_users(10).unwrap();
    assert_eq!(users[0].last_crawled, now);
    assert!(users[0].all_seasons_crawled);
}

#[test]
fn test_least_recently_crawled_users_order() {
    let mut db = create_test_db();
    for id in ["3", "1", "2"] {
        db.save(&Record::User(test_user(id))).unwrap();
    }
    let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    db.touch_user_crawled(&UserId::new("1"), later, false)
        .unwrap();

    let users = db.least_recently_crawled_users(2).unwrap();
    let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3"]);
    assert_eq!(users[0].last_crawled, DateTime::<Utc>::default());
}

#[test]
fn test_all_seasons_crawled_never_resets() {
    let mut db = create_test_db();
    db.save(&Record::User(test_user("1"))).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    db.touch_user_crawled(&UserId::new("1"), now, true).unwrap();
    db.touch_user_crawled(&UserId::new("1"), now, false).unwrap();

    assert!(db.least_recently_crawled_users(1).unwrap()[0].all_seasons_crawled);
}

#[test]
fn test_league_import_flag() {
    let mut db = create_seeded_db();
    let id = LeagueId::new("1000");

    assert_eq!(db.league_import_successful(&id).unwrap(), Some(false));
    assert_eq!(db.failed_league_ids().unwrap(), vec![id.clone()]);

    db.mark_league_import(&id, true).unwrap();
    assert_eq!(db.league_import_successful(&id).unwrap(), Some(true));
    assert!(db.failed_league_ids().unwrap().is_empty());

    // Re-saving the league does not reset the flag
    db.save(&Record::League(test_league("1000", None, 2023)))
        .unwrap();
    assert_eq!(db.league_import_successful(&id).unwrap(), Some(true));

    assert_eq!(
        db.league_import_successful(&LeagueId::new("404")).unwrap(),
        None
    );
}

#[test]
fn test_failed_league_ids_are_ordered() {
    let mut db = create_seeded_db();
    db.save(&Record::League(test_league("30", None, 2022)))
        .unwrap();
    db.save(&Record::League(test_league("200", None, 2022)))
        .unwrap();

    let ids: Vec<String> = db
        .failed_league_ids()
        .unwrap()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, vec!["1000", "200", "30"]);
}

#[test]
fn test_league_member_must_exist() {
    let mut db = create_test_db();

    let err = db
        .save(&Record::League(test_league("1000", None, 2023)))
        .unwrap_err();
    assert!(err.is_persistence_conflict());

    // The whole record rolled back, not just the member row
    assert!(!db.league_exists(&LeagueId::new("1000")).unwrap());
}

#[test]
fn test_roster_with_unknown_player_is_a_conflict() {
    let mut db = create_seeded_db();
    let mut roster = test_roster("1000", 1, Some("1"));
    roster.players.insert(PlayerId::new("999"));

    let err = db.save(&Record::Roster(roster)).unwrap_err();
    assert!(err.is_persistence_conflict());
    assert_eq!(db.count_rows("rosters").unwrap(), 0);
}

#[test]
fn test_roster_resave_replaces_slots() {
    let mut db = create_seeded_db();
    db.save(&Record::Roster(test_roster("1000", 1, Some("1"))))
        .unwrap();
    assert_eq!(db.count_rows("roster_players").unwrap(), 3);

    let mut roster = test_roster("1000", 1, Some("1"));
    roster.starters.clear();
    db.save(&Record::Roster(roster)).unwrap();

    assert_eq!(db.count_rows("rosters").unwrap(), 1);
    assert_eq!(db.count_rows("roster_players").unwrap(), 2);
}

#[test]
fn test_orphan_and_ownerless_rosters() {
    let mut db = create_seeded_db();

    db.save(&Record::Roster(test_roster("1000", 1, Some("1"))))
        .unwrap();
    db.save(&Record::Roster(test_roster("1000", 2, Some("1"))))
        .unwrap();
    db.save(&Record::Roster(test_roster("1000", 3, None)))
        .unwrap();

    assert_eq!(db.count_rows("rosters").unwrap(), 3);
}

fn test_transaction(detail: TransactionDetail) -> TransactionRecord {
    let at = Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap();
    TransactionRecord {
        transaction_id: "555".to_string(),
        league_id: LeagueId::new("1000"),
        leg: 4,
        status: "complete".to_string(),
        creator: UserId::new("1"),
        roster_ids: BTreeSet::from(["1000-1".to_string()]),
        consenter_ids: Some(vec![1]),
        draft_picks: None,
        waiver_budget: None,
        metadata: None,
        settings: None,
        created: at,
        status_updated: at,
        detail,
    }
}

#[test]
fn test_transaction_players_by_role() {
    let mut db = create_seeded_db();
    db.save(&Record::Roster(test_roster("1000", 1, Some("1"))))
        .unwrap();

    let waiver = test_transaction(TransactionDetail::Waiver {
        adds: vec![PlayerId::new("101")],
        drops: vec![PlayerId::new("0")],
    });
    db.save(&Record::Transaction(waiver)).unwrap();

    let rows = db.snapshot().unwrap().remove("transaction_players").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].contains("add"));
    assert!(rows[1].contains("drop"));

    // Re-saving as a trade swaps the player rows
    let trade = test_transaction(TransactionDetail::Trade {
        players: BTreeSet::from([PlayerId::new("101")]),
        adds: Some(json!({"101": 1})),
        drops: None,
    });
    db.save(&Record::Transaction(trade)).unwrap();

    let rows = db.snapshot().unwrap().remove("transaction_players").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains("player"));
    assert_eq!(db.count_rows("transactions").unwrap(), 1);
}

#[test]
fn test_transaction_with_unknown_creator_is_a_conflict() {
    let mut db = create_seeded_db();
    let mut transaction = test_transaction(TransactionDetail::FreeAgent {
        adds: Vec::new(),
        drops: Vec::new(),
    });
    transaction.roster_ids.clear();
    transaction.creator = UserId::new("404");

    let err = db.save(&Record::Transaction(transaction)).unwrap_err();
    assert!(err.is_persistence_conflict());
}

#[test]
fn test_matchup_opponent_may_be_saved_first() {
    let mut db = create_seeded_db();
    db.save(&Record::Roster(test_roster("1000", 1, Some("1"))))
        .unwrap();

    let matchup = MatchupRecord {
        matchup_key: "1000-1-1".to_string(),
        opponent_matchup_key: Some("1000-2-1".to_string()),
        league_id: LeagueId::new("1000"),
        week: Week::new(1),
        roster_key: "1000-1".to_string(),
        players: BTreeSet::from([PlayerId::new("101")]),
        starters: BTreeSet::new(),
        players_points: json!({"101": 12.5}),
        starters_points: json!([]),
        points: 12.5,
        custom_points: None,
    };

    db.save(&Record::Matchup(matchup)).unwrap();
    assert_eq!(db.count_rows("matchup_players").unwrap(), 1);
}

#[test]
fn test_picks_allow_missing_roster_and_picker() {
    let mut db = create_seeded_db();
    db.save(&Record::Draft(DraftRecord {
        draft_id: "77".into(),
        league_id: LeagueId::new("1000"),
        draft_type: "snake".to_string(),
        status: "complete".to_string(),
        start_time: None,
        slot_to_roster_id: json!({"1": 1}),
        draft_order: json!(null),
        settings: json!({}),
        season_type: "regular".to_string(),
        season: Some(Season::new(2023)),
        metadata: None,
    }))
    .unwrap();

    db.save(&Record::Pick(PickRecord {
        pick_id: "77-1-1".to_string(),
        draft_id: "77".into(),
        round: 1,
        draft_slot: 1,
        pick_no: 1,
        roster_key: None,
        player_id: PlayerId::new("101"),
        picked_by: None,
        metadata: None,
    }))
    .unwrap();

    assert_eq!(db.count_rows("picks").unwrap(), 1);
}

#[test]
fn test_related_and_top_level_leagues() {
    let mut db = create_seeded_db();
    db.save(&Record::League(test_league("1001", Some("1000"), 2024)))
        .unwrap();
    db.save(&Record::League(test_league("1002", Some("1001"), 2025)))
        .unwrap();
    db.save(&Record::League(test_league("500", None, 2024)))
        .unwrap();

    let chain: Vec<String> = db
        .related_leagues(&LeagueId::new("1001"))
        .unwrap()
        .into_iter()
        .map(|l| l.league_id.to_string())
        .collect();
    assert_eq!(chain, vec!["1000", "1001", "1002"]);

    let top: Vec<String> = db
        .top_level_leagues()
        .unwrap()
        .into_iter()
        .map(|l| l.league_id.to_string())
        .collect();
    assert_eq!(top, vec!["1002", "500"]);

    assert!(db
        .related_leagues(&LeagueId::new("404"))
        .unwrap()
        .is_empty());
}

#[test]
fn test_related_leagues_with_missing_predecessor() {
    let mut db = create_seeded_db();
    db.save(&Record::League(test_league("2000", Some("1999"), 2024)))
        .unwrap();

    let chain = db.related_leagues(&LeagueId::new("2000")).unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].previous_league_id, Some(LeagueId::new("1999")));
}

#[test]
fn test_snapshot_is_stable_across_resaves() {
    let mut db = create_seeded_db();
    db.save(&Record::Roster(test_roster("1000", 1, Some("1"))))
        .unwrap();
    let before = db.snapshot().unwrap();

    db.save(&Record::Roster(test_roster("1000", 1, Some("1"))))
        .unwrap();
    db.save(&Record::League(test_league("1000", None, 2023)))
        .unwrap();

    assert_eq!(before, db.snapshot().unwrap());
}

#[test]
fn test_record_kind_and_key() {
    let record = Record::Transaction(test_transaction(TransactionDetail::Commissioner {
        adds: Vec::new(),
        drops: Vec::new(),
    }));

    assert_eq!(
        record.kind(),
        EntityKind::Transaction(TransactionKind::Commissioner)
    );
    assert_eq!(record.kind().to_string(), "transaction.commissioner");
    assert_eq!(record.primary_key(), "555");
}

#[test]
fn test_entity_kinds_sort_in_declaration_order() {
    let kinds: BTreeSet<EntityKind> = [
        EntityKind::Pick,
        EntityKind::Transaction(TransactionKind::Waiver),
        EntityKind::User,
        EntityKind::Transaction(TransactionKind::Trade),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        kinds.into_iter().collect::<Vec<_>>(),
        vec![
            EntityKind::User,
            EntityKind::Transaction(TransactionKind::Trade),
            EntityKind::Transaction(TransactionKind::Waiver),
            EntityKind::Pick,
        ]
    );
}

#[test]
fn test_save_players_batch() {
    let mut db = create_test_db();
    let players = vec![test_player("101"), test_player("102")];

    assert_eq!(db.save_players(&players).unwrap(), 2);
    assert_eq!(db.count_rows("players").unwrap(), 4);
}
