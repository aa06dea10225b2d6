//! Sleeper API access: HTTP client, raw payload types and NFL calendar policy.

pub mod http;
pub mod season;
pub mod types;

pub use http::{ApiCallError, Endpoint, RetryPolicy, SleeperClient, SLEEPER_BASE_URL};
pub use types::{
    NflState, RawDraft, RawLeague, RawMatchup, RawPick, RawPlayer, RawRoster, RawTransaction,
    RawUser, SeasonType,
};
