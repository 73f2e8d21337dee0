//! Contribution statistics derived from commit records.
//!
//! Both modes divide by the requested window, never by the span of history
//! actually fetched, so averages are comparable across repositories.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

/// Local mode reads at most this many commits from the active branch.
pub const LOCAL_HISTORY_LIMIT: usize = 100;
/// Recent messages kept in a local snapshot.
pub const RECENT_MESSAGE_LIMIT: usize = 10;
/// Longest accepted stats window, roughly a century.
pub const MAX_WINDOW_DAYS: u32 = 36_600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("stats window of {days} days exceeds the maximum of {max}")]
    TooLarge { days: u32, max: u32 },
    #[error("stats window of {days} days starts before the earliest representable date")]
    OutOfRange { days: u32 },
}

/// Reject windows longer than [`MAX_WINDOW_DAYS`].
pub fn check_window(days: u32) -> Result<(), WindowError> {
    if days > MAX_WINDOW_DAYS {
        return Err(WindowError::TooLarge {
            days,
            max: MAX_WINDOW_DAYS,
        });
    }
    Ok(())
}

/// First instant of the trailing `days` window ending at `now`.
pub fn window_start(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, WindowError> {
    check_window(days)?;
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or(WindowError::OutOfRange { days })
}

/// A commit read from local history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub message: String,
}

/// Local-mode statistics over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub days: u32,
    pub total_commits: usize,
    pub active_days: usize,
    pub average_commits_per_day: f64,
    /// Newest first, trimmed.
    pub recent_messages: Vec<String>,
    /// Newest commit on the branch regardless of the window.
    pub last_commit: Option<DateTime<Utc>>,
}

/// Share of the remote total contributed by one repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoShare {
    pub name: String,
    pub commits: usize,
    pub percentage: f64,
}

/// Commit dates fetched for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCommits {
    pub repo: String,
    pub dates: Vec<NaiveDate>,
}

/// Remote-mode statistics aggregated across a user's repositories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteStats {
    pub days: u32,
    pub total_commits: usize,
    pub active_days: usize,
    pub average_commits_per_day: f64,
    pub most_active_day: Option<NaiveDate>,
    pub by_day: BTreeMap<NaiveDate, usize>,
    /// Sorted by commits descending, then name.
    pub repositories: Vec<RepoShare>,
    /// Repositories whose commits could not be fetched.
    pub failed_repositories: Vec<String>,
}

/// `total / days`, or 0 for an empty window.
pub fn average_per_day(total: usize, days: u32) -> f64 {
    if days == 0 {
        return 0.0;
    }
    total as f64 / f64::from(days)
}

/// True when `timestamp` lies in the trailing `days` window ending at `now`.
///
/// Age is counted in whole days, so a commit 30 days and 5 hours old still
/// belongs to a 30-day window. Commits dated after `now` (clock skew, rewritten
/// dates) are excluded rather than counted as zero days old.
pub fn within_window<Tz: TimeZone>(timestamp: DateTime<Utc>, days: u32, now: &DateTime<Tz>) -> bool {
    let age = now.clone().with_timezone(&Utc) - timestamp;
    age >= Duration::zero() && age.num_days() <= i64::from(days)
}

/// Summarize local history. `commits` must be ordered newest first.
///
/// Calendar days are taken in the timezone of `now`.
pub fn summarize_local<Tz: TimeZone>(
    commits: &[CommitRecord],
    days: u32,
    now: &DateTime<Tz>,
) -> StatsSnapshot {
    let tz = now.timezone();
    let recent: Vec<&CommitRecord> = commits
        .iter()
        .filter(|commit| within_window(commit.timestamp, days, now))
        .collect();
    let active: BTreeSet<NaiveDate> = recent
        .iter()
        .map(|commit| commit.timestamp.with_timezone(&tz).date_naive())
        .collect();

    StatsSnapshot {
        days,
        total_commits: recent.len(),
        active_days: active.len(),
        average_commits_per_day: average_per_day(recent.len(), days),
        recent_messages: recent
            .iter()
            .take(RECENT_MESSAGE_LIMIT)
            .map(|commit| commit.message.trim().to_string())
            .collect(),
        last_commit: commits.first().map(|commit| commit.timestamp),
    }
}

/// Aggregate per-repository commit dates into remote statistics.
///
/// Repositories without commits in the window do not appear in the
/// breakdown. Ties for the most active day go to the earliest date.
pub fn summarize_remote(results: &[RepoCommits], failed: Vec<String>, days: u32) -> RemoteStats {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut by_repo: BTreeMap<&str, usize> = BTreeMap::new();
    for result in results {
        for date in &result.dates {
            *by_day.entry(*date).or_default() += 1;
            *by_repo.entry(result.repo.as_str()).or_default() += 1;
        }
    }

    let total: usize = by_day.values().sum();
    let mut most_active: Option<(NaiveDate, usize)> = None;
    for (date, count) in &by_day {
        if most_active.is_none_or(|(_, best)| *count > best) {
            most_active = Some((*date, *count));
        }
    }

    let mut repositories: Vec<RepoShare> = by_repo
        .into_iter()
        .map(|(name, commits)| RepoShare {
            name: name.to_string(),
            commits,
            percentage: if total > 0 {
                commits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();
    repositories.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));

    RemoteStats {
        days,
        total_commits: total,
        active_days: by_day.len(),
        average_commits_per_day: average_per_day(total, days),
        most_active_day: most_active.map(|(date, _)| date),
        by_day,
        repositories,
        failed_repositories: failed,
    }
}
