//! Mock Sleeper server fixtures shared by the integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use sleeper_sync::{
    commands::update_players,
    sleeper::{RetryPolicy, SleeperClient},
    storage::LeagueDatabase,
};
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

pub const CURRENT_SEASON: &str = "2023";

/// One league season as served by the mock API.
pub struct LeagueFixture {
    pub league_id: &'static str,
    pub previous: Value,
    pub season: &'static str,
    pub league_type: i64,
    pub users: Value,
    pub rosters: Value,
    pub transactions: Value,
}

impl LeagueFixture {
    /// A two-team dynasty league with one waiver, one trade and one matchup.
    pub fn dynasty(league_id: &'static str, season: &'static str, previous: Value) -> Self {
        Self {
            league_id,
            previous,
            season,
            league_type: 2,
            users: json!([
                {"user_id": "1", "display_name": "alice", "metadata": {"team_name": "Alpha"}},
                {"user_id": "2", "display_name": "bob", "metadata": {}}
            ]),
            rosters: json!([
                {
                    "roster_id": 1, "owner_id": "1",
                    "players": ["101", "102"], "starters": ["101"],
                    "taxi": null, "reserve": null, "co_owners": null,
                    "settings": {"wins": 1}
                },
                {
                    "roster_id": 2, "owner_id": "2",
                    "players": ["103", "0"], "starters": null,
                    "taxi": null, "reserve": null, "co_owners": null,
                    "settings": {"wins": 0}
                }
            ]),
            transactions: json!([
                {
                    "transaction_id": "9001", "type": "waiver", "status": "complete",
                    "leg": 1, "created": 1_690_000_000_000_i64, "status_updated": 1_690_000_100_000_i64,
                    "creator": "1", "roster_ids": [1],
                    "adds": {"104": 1}, "drops": {"102": 1}
                },
                {
                    "transaction_id": "9002", "type": "trade", "status": "complete",
                    "leg": 1, "created": 1_690_000_200_000_i64, "status_updated": 1_690_000_300_000_i64,
                    "creator": "2", "roster_ids": [1, 2], "consenter_ids": [1, 2],
                    "adds": {"101": 2, "103": 1}, "drops": {"101": 1, "103": 2}
                }
            ]),
        }
    }

    pub fn redraft(league_id: &'static str, season: &'static str) -> Self {
        let mut fixture = Self::dynasty(league_id, season, json!("0"));
        fixture.league_type = 0;
        fixture
    }

    pub fn draft_id(&self) -> String {
        format!("7{}", self.league_id)
    }

    pub fn league_json(&self) -> Value {
        json!({
            "league_id": self.league_id,
            "previous_league_id": self.previous,
            "name": format!("League {}", self.league_id),
            "season": self.season,
            "sport": "nfl",
            "status": "complete",
            "total_rosters": 2,
            "season_type": "regular",
            "settings": {"type": self.league_type},
            "scoring_settings": {"rec": 1.0},
            "roster_positions": ["QB", "WR", "BN"],
            "draft_id": self.draft_id()
        })
    }

    fn draft_json(&self) -> Value {
        json!({
            "draft_id": self.draft_id(),
            "league_id": self.league_id,
            "type": "snake",
            "status": "complete",
            "start_time": 1_689_000_000_000_i64,
            "season": self.season,
            "season_type": "regular",
            "settings": {"rounds": 1},
            "slot_to_roster_id": {"1": 1, "2": 2},
            "draft_order": {"1": 1, "2": 2}
        })
    }
}

pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve every route of one league season.
pub async fn mount_league(server: &MockServer, fixture: &LeagueFixture) {
    let id = fixture.league_id;
    let draft_id = fixture.draft_id();

    mount_json(server, &format!("/league/{id}"), fixture.league_json()).await;
    mount_json(server, &format!("/league/{id}/users"), fixture.users.clone()).await;
    mount_json(server, &format!("/league/{id}/rosters"), fixture.rosters.clone()).await;
    mount_json(
        server,
        &format!("/league/{id}/transactions/1"),
        fixture.transactions.clone(),
    )
    .await;
    mount_json(
        server,
        &format!("/league/{id}/matchups/1"),
        json!([
            {"roster_id": 1, "matchup_id": 1, "points": 101.5, "players": ["101"], "starters": ["101"],
             "players_points": {"101": 101.5}, "starters_points": [101.5]},
            {"roster_id": 2, "matchup_id": 1, "points": 88.0, "players": ["103"], "starters": ["103"],
             "players_points": {"103": 88.0}, "starters_points": [88.0]}
        ]),
    )
    .await;
    mount_json(
        server,
        &format!("/league/{id}/drafts"),
        json!([fixture.draft_json()]),
    )
    .await;
    mount_json(server, &format!("/draft/{draft_id}"), fixture.draft_json()).await;
    mount_json(
        server,
        &format!("/draft/{draft_id}/picks"),
        json!([
            {"draft_id": draft_id, "round": 1, "draft_slot": 1, "pick_no": 1,
             "player_id": "101", "roster_id": 1, "picked_by": "1"},
            {"draft_id": draft_id, "round": 1, "draft_slot": 2, "pick_no": 2,
             "player_id": "103", "roster_id": 2, "picked_by": ""}
        ]),
    )
    .await;
}

/// NFL state, the player directory, and empty weeks for every league.
pub async fn mount_defaults(server: &MockServer) {
    mount_json(
        server,
        "/state/nfl",
        json!({"season": CURRENT_SEASON, "season_type": "pre", "week": 1, "leg": 1}),
    )
    .await;

    mount_json(
        server,
        "/players/nfl",
        json!({
            "101": {"player_id": "101", "full_name": "Wide Receiver", "position": "WR"},
            "102": {"player_id": "102", "first_name": "Running", "last_name": "Back", "position": "RB"},
            "103": {"player_id": "103", "full_name": "Quarter Back", "position": "QB"},
            "104": {"player_id": "104", "full_name": "Tight End", "position": "TE", "weight": 250}
        }),
    )
    .await;

    for pattern in [
        r"^/league/\d+/transactions/\d+$",
        r"^/league/\d+/matchups/\d+$",
        r"^/user/\d+/leagues/nfl/\d+$",
    ] {
        Mock::given(method("GET"))
            .and(path_regex(pattern))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .with_priority(10)
            .mount(server)
            .await;
    }
}

pub fn client(server: &MockServer) -> SleeperClient {
    SleeperClient::with_retry_policy(server.uri(), RetryPolicy::immediate(2)).unwrap()
}

/// In-memory database with the mock player directory loaded.
pub async fn database_with_players(api: &SleeperClient) -> LeagueDatabase {
    let mut db = LeagueDatabase::new_in_memory().unwrap();
    let saved = update_players(&mut db, api).await.unwrap();
    assert_eq!(saved, 4);
    db
}
