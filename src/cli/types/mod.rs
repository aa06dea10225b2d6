//! Type-safe wrappers for Sleeper identifiers and NFL calendar values.

pub mod ids;
pub mod time;

pub use ids::{DraftId, LeagueId, PlayerId, UserId, NO_PREVIOUS_LEAGUE};
pub use time::{Season, Week};
