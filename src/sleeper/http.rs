//! Sleeper REST client with bounded retry and call accounting.
//!
//! Every call returns data or a "no data" value (`None` / empty collection).
//! Transient failures (429/500/503/522, network errors, malformed bodies) are
//! retried with doubling backoff. When the attempt budget runs out the failure
//! is recorded as an [`ApiCallError`], the client's error flag is raised and the
//! caller gets "no data". Nothing here returns `Err` for a remote failure.

use chrono::Datelike;
use lru::LruCache;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::season::{full_season_weeks, seasons_through};
use super::types::{
    NflState, RawDraft, RawLeague, RawMatchup, RawPick, RawPlayer, RawRoster, RawTransaction,
    RawUser,
};
use crate::cli::types::{DraftId, LeagueId, PlayerId, Season, UserId, Week};
use crate::core::{build_client, Settings};


/// Base path for the Sleeper v1 API.
pub const SLEEPER_BASE_URL: &str = "https://api.sleeper.app/v1";

/// Longest league chain `get_league_history` will follow.
pub const MAX_CHAIN_LENGTH: usize = 64;

/// HTTP statuses worth retrying.
pub const TRANSIENT_STATUSES: [u16; 4] = [429, 500, 503, 522];

const LEAGUE_CACHE_SIZE: usize = 512;

/// Remote resources, one variant per endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    League(LeagueId),
    User(UserId),
    UserLeagues { user_id: UserId, season: Season },
    LeagueUsers(LeagueId),
    Rosters(LeagueId),
    Transactions { league_id: LeagueId, week: Week },
    Matchups { league_id: LeagueId, week: Week },
    LeagueDrafts(LeagueId),
    Draft(DraftId),
    DraftPicks(DraftId),
    Players,
    NflState,
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::League(id) => format!("/league/{id}"),
            Endpoint::User(id) => format!("/user/{id}"),
            Endpoint::UserLeagues { user_id, season } => {
                format!("/user/{user_id}/leagues/nfl/{season}")
            }
            Endpoint::LeagueUsers(id) => format!("/league/{id}/users"),
            Endpoint::Rosters(id) => format!("/league/{id}/rosters"),
            Endpoint::Transactions { league_id, week } => {
                format!("/league/{league_id}/transactions/{week}")
            }
            Endpoint::Matchups { league_id, week } => {
                format!("/league/{league_id}/matchups/{week}")
            }
            Endpoint::LeagueDrafts(id) => format!("/league/{id}/drafts"),
            Endpoint::Draft(id) => format!("/draft/{id}"),
            Endpoint::DraftPicks(id) => format!("/draft/{id}/picks"),
            Endpoint::Players => "/players/nfl".to_string(),
            Endpoint::NflState => "/state/nfl".to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts; used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (1-based): doubles each time, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// A call that gave up and returned "no data".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCallError {
    pub endpoint: String,
    pub status: Option<u16>,
    pub attempts: u32,
    /// Value of the client's call counter on the final attempt.
    pub request_seq: u64,
    pub message: String,
}

impl fmt::Display for ApiCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} failed with HTTP {} after {} attempt(s): {}",
                self.endpoint, status, self.attempts, self.message
            ),
            None => write!(
                f,
                "{} failed after {} attempt(s): {}",
                self.endpoint, self.attempts, self.message
            ),
        }
    }
}

struct Failure {
    status: Option<u16>,
    transient: bool,
    message: String,
}

pub struct SleeperClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
    call_count: AtomicU64,
    error_flag: AtomicBool,
    errors: Mutex<Vec<ApiCallError>>,
    league_cache: Mutex<LruCache<LeagueId, RawLeague>>,
    nfl_state: Mutex<Option<NflState>>,
}

impl SleeperClient {
    /// Client for `base_url` with the default retry policy.
    pub fn new(base_url: impl Into<String>) -> crate::Result<Self> {
        Self::with_retry_policy(base_url, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        base_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> crate::Result<Self> {
        Ok(Self::build(
            build_client(Duration::from_secs(30))?,
            base_url.into(),
            retry,
        ))
    }

    pub fn from_settings(settings: &Settings) -> crate::Result<Self> {
        Ok(Self::build(
            build_client(settings.request_timeout)?,
            settings.base_url.clone(),
            settings.retry.clone(),
        ))
    }

    fn build(http: Client, base_url: String, retry: RetryPolicy) -> Self {
        let cache_size = NonZeroUsize::new(LEAGUE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            call_count: AtomicU64::new(0),
            error_flag: AtomicBool::new(false),
            errors: Mutex::new(Vec::new()),
            league_cache: Mutex::new(LruCache::new(cache_size)),
            nfl_state: Mutex::new(None),
        }
    }

    /// Total HTTP round-trips so far, retries included.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// True if any call gave up since the last reset.
    pub fn error_flag(&self) -> bool {
        self.error_flag.load(Ordering::Relaxed)
    }

    pub fn reset_error_flag(&self) {
        self.error_flag.store(false, Ordering::Relaxed);
    }

    /// Every recorded failure, oldest first.
    pub fn errors(&self) -> Vec<ApiCallError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded failures.
    pub fn take_errors(&self) -> Vec<ApiCallError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record_error(&self, err: ApiCallError) {
        error!(
            endpoint = %err.endpoint,
            status = ?err.status,
            attempts = err.attempts,
            request_seq = err.request_seq,
            message = %err.message,
            "Sleeper request gave up"
        );
        self.error_flag.store(true, Ordering::Relaxed);
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &str) -> Result<T, Failure> {
        let response = self.http.get(url).send().await.map_err(|err| Failure {
            status: None,
            transient: true,
            message: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure {
                status: Some(status.as_u16()),
                transient: TRANSIENT_STATUSES.contains(&status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.text().await.map_err(|err| Failure {
            status: Some(status.as_u16()),
            transient: true,
            message: err.to_string(),
        })?;

        serde_json::from_str(&body).map_err(|err| Failure {
            status: Some(status.as_u16()),
            transient: true,
            message: format!("malformed body: {err}"),
        })
    }

    /// GET an endpoint, retrying transient failures within the attempt budget.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Option<T> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request_seq = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(%endpoint, attempt, request_seq, "GET");

            let failure = match self.attempt::<T>(&url).await {
                Ok(value) => return Some(value),
                Err(failure) => failure,
            };

            if failure.transient && attempt < max_attempts {
                let delay = self.retry.delay(attempt);
                warn!(
                    %endpoint,
                    attempt,
                    max_attempts,
                    status = ?failure.status,
                    error = %failure.message,
                    delay_ms = delay.as_millis() as u64,
                    "Sleeper request failed, retrying"
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                continue;
            }

            self.record_error(ApiCallError {
                endpoint: endpoint.path(),
                status: failure.status,
                attempts: attempt,
                request_seq,
                message: failure.message,
            });
            return None;
        }
    }

    /// Fetch a list resource; `null`, `[]` and failures all become empty.
    async fn fetch_list<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Vec<T> {
        self.fetch::<Option<Vec<T>>>(endpoint)
            .await
            .flatten()
            .unwrap_or_default()
    }

    fn cache_league(&self, league: &RawLeague) {
        self.league_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(league.league_id.clone(), league.clone());
    }

    pub async fn get_league(&self, league_id: &LeagueId) -> Option<RawLeague> {
        if let Some(cached) = self
            .league_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(league_id)
        {
            return Some(cached.clone());
        }

        let league = self
            .fetch::<Option<RawLeague>>(&Endpoint::League(league_id.clone()))
            .await
            .flatten()?;
        self.cache_league(&league);
        Some(league)
    }

    /// Whether Sleeper knows this league id at all.
    pub async fn league_exists(&self, league_id: &LeagueId) -> bool {
        self.get_league(league_id).await.is_some()
    }

    pub async fn get_user(&self, user_id: &UserId) -> Option<RawUser> {
        self.fetch::<Option<RawUser>>(&Endpoint::User(user_id.clone()))
            .await
            .flatten()
    }

    pub async fn get_user_leagues(&self, user_id: &UserId, season: Season) -> Vec<RawLeague> {
        let leagues: Vec<RawLeague> = self
            .fetch_list(&Endpoint::UserLeagues {
                user_id: user_id.clone(),
                season,
            })
            .await;
        for league in &leagues {
            self.cache_league(league);
        }
        leagues
    }

    pub async fn get_users(&self, league_id: &LeagueId) -> Vec<RawUser> {
        self.fetch_list(&Endpoint::LeagueUsers(league_id.clone()))
            .await
    }

    pub async fn get_rosters(&self, league_id: &LeagueId) -> Vec<RawRoster> {
        self.fetch_list(&Endpoint::Rosters(league_id.clone())).await
    }

    pub async fn get_transactions(&self, league_id: &LeagueId, week: Week) -> Vec<RawTransaction> {
        self.fetch_list(&Endpoint::Transactions {
            league_id: league_id.clone(),
            week,
        })
        .await
    }

    pub async fn get_matchups(&self, league_id: &LeagueId, week: Week) -> Vec<RawMatchup> {
        self.fetch_list(&Endpoint::Matchups {
            league_id: league_id.clone(),
            week,
        })
        .await
    }

    pub async fn get_drafts(&self, league_id: &LeagueId) -> Vec<RawDraft> {
        self.fetch_list(&Endpoint::LeagueDrafts(league_id.clone()))
            .await
    }

    pub async fn get_draft(&self, draft_id: &DraftId) -> Option<RawDraft> {
        self.fetch::<Option<RawDraft>>(&Endpoint::Draft(draft_id.clone()))
            .await
            .flatten()
    }

    pub async fn get_draft_picks(&self, draft_id: &DraftId) -> Vec<RawPick> {
        self.fetch_list(&Endpoint::DraftPicks(draft_id.clone()))
            .await
    }

    /// The full NFL player directory keyed by player id.
    pub async fn get_players(&self) -> BTreeMap<PlayerId, RawPlayer> {
        self.fetch::<Option<BTreeMap<PlayerId, RawPlayer>>>(&Endpoint::Players)
            .await
            .flatten()
            .unwrap_or_default()
    }

    /// Current NFL calendar state, fetched once per client.
    pub async fn get_nfl_state(&self) -> Option<NflState> {
        if let Some(state) = self
            .nfl_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Some(state);
        }

        let state = self
            .fetch::<Option<NflState>>(&Endpoint::NflState)
            .await
            .flatten()?;
        *self.nfl_state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        Some(state)
    }

    async fn week_count(&self, season: Season) -> u16 {
        match self.get_nfl_state().await {
            Some(state) => super::season::active_weeks(season, &state),
            None => {
                warn!(%season, "NFL state unavailable, assuming a complete season");
                full_season_weeks(season)
            }
        }
    }

    /// Follow `previous_league_id` from `league_id`, newest first.
    ///
    /// Stops at the `'0'`/null terminator, at the first league that cannot be
    /// fetched, on a repeated id, or after [`MAX_CHAIN_LENGTH`] links.
    pub async fn get_league_history(&self, league_id: &LeagueId) -> Vec<RawLeague> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(league_id.clone());

        while let Some(id) = next.take() {
            if chain.len() >= MAX_CHAIN_LENGTH {
                warn!(root = %league_id, length = chain.len(), "League chain too long, truncating");
                break;
            }
            if !seen.insert(id.clone()) {
                warn!(root = %league_id, repeated = %id, "League chain loops back on itself, truncating");
                break;
            }

            let Some(league) = self.get_league(&id).await else {
                warn!(root = %league_id, missing = %id, "League chain truncated at unfetchable league");
                break;
            };
            if league.league_id != id {
                warn!(
                    requested = %id,
                    received = %league.league_id,
                    "League response does not match requested id, truncating chain"
                );
                break;
            }

            next = league.predecessor().cloned();
            chain.push(league);
        }

        chain
    }

    /// One transactions call per active week, concatenated in week order.
    pub async fn get_season_transactions(
        &self,
        league_id: &LeagueId,
        season: Season,
    ) -> Vec<RawTransaction> {
        let weeks = self.week_count(season).await;
        let mut transactions = Vec::new();
        for week in (1..=weeks).map(Week::new) {
            transactions.extend(self.get_transactions(league_id, week).await);
        }
        debug!(%league_id, weeks, count = transactions.len(), "Fetched season transactions");
        transactions
    }

    /// One matchups call per active week, keyed by week; empty weeks omitted.
    pub async fn get_season_matchups(
        &self,
        league_id: &LeagueId,
        season: Season,
    ) -> BTreeMap<Week, Vec<RawMatchup>> {
        let weeks = self.week_count(season).await;
        let mut by_week = BTreeMap::new();
        for week in (1..=weeks).map(Week::new) {
            let matchups = self.get_matchups(league_id, week).await;
            if !matchups.is_empty() {
                by_week.insert(week, matchups);
            }
        }
        by_week
    }

    /// A user's leagues across every season from 2017 through the current one.
    pub async fn get_all_user_leagues(&self, user_id: &UserId) -> Vec<RawLeague> {
        let current = match self.get_nfl_state().await {
            Some(state) => state.season,
            None => Season::new(chrono::Utc::now().year().clamp(0, u16::MAX as i32) as u16),
        };

        let mut leagues = Vec::new();
        for season in seasons_through(current) {
            leagues.extend(self.get_user_leagues(user_id, season).await);
        }

        if leagues.is_empty() {
            warn!(%user_id, "User has no leagues in any season");
        } else {
            info!(%user_id, count = leagues.len(), "Fetched user leagues");
        }
        leagues
    }
}
