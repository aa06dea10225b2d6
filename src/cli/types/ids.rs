//! ID types for Sleeper resources.
//!
//! Sleeper issues snowflake-style ids as decimal strings. They are kept as
//! strings end to end; the wrappers only guard against mixing one kind of id
//! with another and reject obviously malformed input at the CLI boundary.

use crate::error::{Result, SleeperError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Predecessor value Sleeper uses to terminate a league chain.
pub const NO_PREVIOUS_LEAGUE: &str = "0";

fn parse_numeric(kind: &'static str, s: &str) -> Result<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SleeperError::InvalidId {
            kind,
            value: s.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Type-safe wrapper for Sleeper league ids.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sleeper_sync::LeagueId;
    ///
    /// let league_id: LeagueId = "784462448236363776".parse().unwrap();
    /// assert_eq!(league_id.as_str(), "784462448236363776");
    /// assert!("not-a-league".parse::<LeagueId>().is_err());
    /// ```
    LeagueId
);

string_id!(
    /// Type-safe wrapper for Sleeper user ids
    UserId
);

string_id!(
    /// Type-safe wrapper for NFL player ids.
    ///
    /// Team defences use the team abbreviation (`"OAK"`), and `"0"` marks an
    /// empty lineup slot, so any non-empty string is accepted.
    PlayerId
);

string_id!(
    /// Type-safe wrapper for draft ids
    DraftId
);

impl LeagueId {
    /// The `'0'` predecessor marker is not a real league.
    pub fn is_chain_terminator(&self) -> bool {
        self.0.is_empty() || self.0 == NO_PREVIOUS_LEAGUE
    }
}

impl FromStr for LeagueId {
    type Err = SleeperError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(parse_numeric("league", s)?))
    }
}

impl FromStr for UserId {
    type Err = SleeperError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(parse_numeric("user", s)?))
    }
}

impl FromStr for DraftId {
    type Err = SleeperError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(parse_numeric("draft", s)?))
    }
}

impl FromStr for PlayerId {
    type Err = SleeperError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SleeperError::InvalidId {
                kind: "player",
                value: s.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}
