//! Schedulable units of work and the states a job runner reports for them.
//!
//! A job is one independent invocation of a pipeline entry point. Nothing here
//! queues or schedules; callers (the CLI, or an external runner) construct a
//! [`Job`], hand it to [`run_job`] and surface the resulting [`JobState`].

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    cli::types::LeagueId,
    commands::{
        crawl_leagues, import_league_history, retry_league_import, update_players, CrawlReport,
        ImportReport, RetrySummary,
    },
    sleeper::SleeperClient,
    storage::LeagueDatabase,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    UpdatePlayers,
    CrawlLeagues { num_users: usize },
    ImportLeagueHistory { league_id: LeagueId },
    RetryLeagueImport,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::UpdatePlayers => f.write_str("update_players"),
            Job::CrawlLeagues { num_users } => write!(f, "crawl_leagues({num_users})"),
            Job::ImportLeagueHistory { league_id } => {
                write!(f, "import_league_history({league_id})")
            }
            Job::RetryLeagueImport => f.write_str("retry_league_import"),
        }
    }
}

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Started,
    /// Finished, but left leagues flagged for another import pass.
    Retry,
    Failure,
    Success,
}

impl JobState {
    /// Message shown to someone polling an import.
    pub fn message(&self) -> &'static str {
        match self {
            JobState::Pending => "Your league is in the queue.",
            JobState::Started => "Your league is currently importing!",
            JobState::Retry => "Something went wrong, retrying...",
            JobState::Failure => "Import failed, please try again later.",
            JobState::Success => "League imported successfully!",
        }
    }

    /// Pollers stop once a job reaches a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "PENDING",
            JobState::Started => "STARTED",
            JobState::Retry => "RETRY",
            JobState::Failure => "FAILURE",
            JobState::Success => "SUCCESS",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    PlayersUpdated(usize),
    Crawled(CrawlReport),
    Imported(Vec<ImportReport>),
    Retried(RetrySummary),
}

impl JobOutput {
    /// True when the job left nothing for a later retry pass.
    fn is_complete(&self) -> bool {
        match self {
            JobOutput::PlayersUpdated(count) => *count > 0,
            JobOutput::Crawled(report) => report.seasons_failed == 0 && report.users_skipped == 0,
            JobOutput::Imported(reports) => reports.iter().all(ImportReport::succeeded),
            JobOutput::Retried(summary) => summary.still_failing.is_empty(),
        }
    }
}

#[derive(Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub state: JobState,
    pub output: Option<JobOutput>,
    pub error: Option<String>,
}

/// Run one job to completion and report its final state.
///
/// Fatal errors become [`JobState::Failure`] rather than propagating, so a
/// runner can record them and move on.
pub async fn run_job(
    job: Job,
    db: &mut LeagueDatabase,
    api: &SleeperClient,
    now: DateTime<Utc>,
) -> JobOutcome {
    info!(%job, state = %JobState::Started, "Job started");

    let result = match &job {
        Job::UpdatePlayers => update_players(db, api).await.map(JobOutput::PlayersUpdated),
        Job::CrawlLeagues { num_users } => crawl_leagues(db, api, *num_users, now)
            .await
            .map(JobOutput::Crawled),
        Job::ImportLeagueHistory { league_id } => import_league_history(db, api, league_id)
            .await
            .map(JobOutput::Imported),
        Job::RetryLeagueImport => retry_league_import(db, api).await.map(JobOutput::Retried),
    };

    match result {
        Ok(output) => {
            let state = if output.is_complete() {
                JobState::Success
            } else {
                JobState::Retry
            };
            info!(%job, %state, api_calls = api.call_count(), "Job finished");
            JobOutcome {
                job,
                state,
                output: Some(output),
                error: None,
            }
        }
        Err(err) => {
            error!(%job, error = %err, "Job failed");
            JobOutcome {
                job,
                state: JobState::Failure,
                output: None,
                error: Some(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Success.is_terminal());
        assert!(JobState::Failure.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Started.is_terminal());
        assert!(!JobState::Retry.is_terminal());
    }

    #[test]
    fn test_state_messages() {
        assert_eq!(JobState::Pending.message(), "Your league is in the queue.");
        assert_eq!(JobState::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn test_job_display() {
        let job = Job::ImportLeagueHistory {
            league_id: LeagueId::new("1000"),
        };
        assert_eq!(job.to_string(), "import_league_history(1000)");
        assert_eq!(
            Job::CrawlLeagues { num_users: 10 }.to_string(),
            "crawl_leagues(10)"
        );
    }

    #[test]
    fn test_output_completeness() {
        assert!(JobOutput::Imported(Vec::new()).is_complete());
        assert!(!JobOutput::PlayersUpdated(0).is_complete());
        assert!(!JobOutput::Retried(RetrySummary {
            succeeded: 1,
            still_failing: vec![LeagueId::new("9")],
        })
        .is_complete());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_a_retry_not_a_failure() {
        let mut db = LeagueDatabase::new_in_memory().unwrap();
        let api = SleeperClient::with_retry_policy(
            "http://127.0.0.1:9",
            crate::sleeper::RetryPolicy::immediate(1),
        )
        .unwrap();

        let outcome = run_job(Job::UpdatePlayers, &mut db, &api, Utc::now()).await;
        assert_eq!(outcome.state, JobState::Retry);
        assert!(outcome.error.is_none());
        assert!(api.error_flag());
    }
}
