//! NFL calendar policy: how many weeks a league season has, and which seasons exist.

use super::types::{NflState, SeasonType};
use crate::cli::types::{Season, Week};

/// First season Sleeper hosted leagues.
pub const FIRST_SEASON: Season = Season(2017);

/// First season played with an 18-week fantasy schedule.
pub const EIGHTEEN_WEEK_SEASON: Season = Season(2021);

/// Number of weeks in a completed season.
pub fn full_season_weeks(season: Season) -> u16 {
    if season >= EIGHTEEN_WEEK_SEASON {
        18
    } else {
        17
    }
}

/// Number of weeks with data for a league played in `league_season`.
///
/// Past seasons are complete. For the current season the NFL state decides:
/// preseason has one week, the regular season runs through the week in
/// progress, and the postseason and offseason cover the whole schedule.
pub fn active_weeks(league_season: Season, state: &NflState) -> u16 {
    if league_season < state.season {
        return full_season_weeks(league_season);
    }

    match state.season_type {
        SeasonType::Pre => 1,
        SeasonType::Regular => state.leg.as_u16().max(1),
        SeasonType::Post | SeasonType::Off => full_season_weeks(league_season),
    }
}

/// Weeks `1..=active_weeks` as typed values.
pub fn weeks(league_season: Season, state: &NflState) -> impl Iterator<Item = Week> {
    (1..=active_weeks(league_season, state)).map(Week::new)
}

/// Every season from the platform's first through `current`, oldest first.
pub fn seasons_through(current: Season) -> impl Iterator<Item = Season> {
    (FIRST_SEASON.as_u16()..=current.as_u16()).map(Season::new)
}
