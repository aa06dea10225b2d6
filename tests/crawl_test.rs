//! Integration tests for the user crawl against a mock Sleeper API

mod common;

use chrono::{DateTime, Utc};
use common::*;
use serde_json::json;
use sleeper_sync::{
    commands::{crawl_leagues, CrawlReport},
    storage::{LeagueDatabase, Record, UserRecord},
    LeagueId, UserId,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

fn seed_users(db: &mut LeagueDatabase, ids: &[&str]) {
    for id in ids {
        db.save(&Record::User(UserRecord {
            user_id: UserId::new(*id),
            display_name: format!("user{id}"),
            avatar: None,
        }))
        .unwrap();
    }
}

async fn mount_user_leagues(server: &MockServer, user_id: &str, leagues: &[&LeagueFixture]) {
    let body: Vec<_> = leagues.iter().map(|league| league.league_json()).collect();
    mount_json(
        server,
        &format!("/user/{user_id}/leagues/nfl/{CURRENT_SEASON}"),
        json!(body),
    )
    .await;
}

/// Users 1 and 2 share dynasty league 1000; user 1 also plays redraft 2000 with user 5.
async fn shared_league_server() -> MockServer {
    let dynasty = LeagueFixture::dynasty("1000", CURRENT_SEASON, json!("0"));
    let mut redraft = LeagueFixture::redraft("2000", CURRENT_SEASON);
    redraft.users = json!([{"user_id": "5", "display_name": "eve"}]);

    let server = MockServer::start().await;
    mount_league(&server, &dynasty).await;
    mount_json(&server, "/league/2000", redraft.league_json()).await;
    mount_json(&server, "/league/2000/users", redraft.users.clone()).await;
    mount_user_leagues(&server, "1", &[&dynasty, &redraft]).await;
    mount_user_leagues(&server, "2", &[&dynasty]).await;
    mount_defaults(&server).await;
    server
}

#[tokio::test]
async fn test_crawl_imports_new_dynasty_leagues() {
    let server = shared_league_server().await;
    let api = client(&server);
    let mut db = database_with_players(&api).await;
    seed_users(&mut db, &["1", "2"]);
    let now = at(1_700_000_000_000);

    let report = crawl_leagues(&mut db, &api, 10, now).await.unwrap();

    assert_eq!(
        report,
        CrawlReport {
            users_crawled: 2,
            users_skipped: 0,
            leagues_checked: 2,
            leagues_registered: 1,
            leagues_already_stored: 0,
            seasons_imported: 1,
            seasons_failed: 0,
        }
    );

    assert_eq!(
        db.league_import_successful(&LeagueId::new("1000")).unwrap(),
        Some(true)
    );
    // Redraft leagues only contribute their users
    assert!(!db.league_exists(&LeagueId::new("2000")).unwrap());
    assert!(db.user_exists(&UserId::new("5")).unwrap());

    let candidates = db.least_recently_crawled_users(10).unwrap();
    let order: Vec<&str> = candidates.iter().map(|c| c.user_id.as_str()).collect();
    assert_eq!(order, vec!["5", "1", "2"]);
    assert_eq!(candidates[1].last_crawled, now);
    assert!(candidates[1].all_seasons_crawled);
    assert!(!candidates[0].all_seasons_crawled);
}

#[tokio::test]
async fn test_second_crawl_skips_stored_leagues() {
    let server = shared_league_server().await;
    let api = client(&server);
    let mut db = database_with_players(&api).await;
    seed_users(&mut db, &["1", "2"]);

    crawl_leagues(&mut db, &api, 10, at(1_700_000_000_000))
        .await
        .unwrap();
    let report = crawl_leagues(&mut db, &api, 3, at(1_700_000_600_000))
        .await
        .unwrap();

    assert_eq!(report.users_crawled, 3);
    assert_eq!(report.leagues_already_stored, 1);
    assert_eq!(report.leagues_registered, 1);
    assert_eq!(report.seasons_imported, 0);
    assert_eq!(db.count_rows("leagues").unwrap(), 1);
}

#[tokio::test]
async fn test_failed_lookup_leaves_watermark() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/user/1/leagues/nfl/{CURRENT_SEASON}")))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_defaults(&server).await;

    let api = client(&server);
    let mut db = database_with_players(&api).await;
    seed_users(&mut db, &["1"]);
    let now = at(1_700_000_000_000);

    let report = crawl_leagues(&mut db, &api, 10, now).await.unwrap();

    assert_eq!(report.users_crawled, 0);
    assert_eq!(report.users_skipped, 1);
    let candidates = db.least_recently_crawled_users(1).unwrap();
    assert_ne!(candidates[0].last_crawled, now);
    assert!(!candidates[0].all_seasons_crawled);
}

#[tokio::test]
async fn test_crawl_visits_at_most_num_users() {
    let server = MockServer::start().await;
    mount_defaults(&server).await;
    let api = client(&server);
    let mut db = database_with_players(&api).await;
    seed_users(&mut db, &["1", "2", "3"]);

    let report = crawl_leagues(&mut db, &api, 2, at(1_700_000_000_000))
        .await
        .unwrap();

    assert_eq!(report.users_crawled, 2);
    assert_eq!(report.leagues_checked, 0);
    let next = db.least_recently_crawled_users(1).unwrap();
    assert_eq!(next[0].user_id, UserId::new("3"));
}
