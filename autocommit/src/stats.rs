//! Contribution statistics from local history or the GitHub API.
//!
//! The two sources are never mixed in one call. Both are read-only and
//! recomputed on every request.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, instrument, warn};

use crate::core::stats::{
    LOCAL_HISTORY_LIMIT, RemoteStats, RepoCommits, StatsSnapshot, check_window, summarize_local,
    summarize_remote, window_start,
};
use crate::io::git::Git;
use crate::io::github::HostingApi;
use crate::report::Reporter;

/// Stats over the last [`LOCAL_HISTORY_LIMIT`] commits of the active branch.
#[instrument(skip_all, fields(days))]
pub fn local_stats<Tz: TimeZone>(git: &Git, days: u32, now: &DateTime<Tz>) -> Result<StatsSnapshot> {
    check_window(days)?;
    let branch = git.current_branch()?;
    let commits = git
        .log(&branch, LOCAL_HISTORY_LIMIT)
        .with_context(|| format!("read history of {branch}"))?;
    debug!(branch = %branch, fetched = commits.len(), "history read");
    Ok(summarize_local(&commits, days, now))
}

/// Stats across every repository of `username` since `now - days`.
///
/// Repositories are scanned one at a time. A repository whose commits cannot
/// be fetched is reported as a warning and contributes nothing; only a
/// failure to list repositories aborts the scan.
#[instrument(skip_all, fields(username, days))]
pub fn remote_stats<A, R>(
    api: &A,
    username: &str,
    days: u32,
    now: DateTime<Utc>,
    reporter: &mut R,
) -> Result<RemoteStats>
where
    A: HostingApi + ?Sized,
    R: Reporter + ?Sized,
{
    let since = window_start(now, days)?;
    let repos = api
        .list_repositories(username)
        .with_context(|| format!("list repositories of {username}"))?;

    let mut results = Vec::with_capacity(repos.len());
    let mut failed = Vec::new();
    for (idx, repo) in repos.iter().enumerate() {
        match api.list_commit_dates(username, repo, since) {
            Ok(dates) => {
                debug!(repo = %repo, commits = dates.len(), "repository scanned");
                results.push(RepoCommits {
                    repo: repo.clone(),
                    dates,
                });
            }
            Err(err) => {
                warn!(repo = %repo, err = %format!("{err:#}"), "could not fetch commits");
                reporter.warning(&format!("could not fetch commits for {repo}: {err:#}"));
                failed.push(repo.clone());
            }
        }
        reporter.repository_scanned(idx + 1, repos.len(), repo);
    }
    Ok(summarize_remote(&results, failed, days))
}
