//! Git adapter for commit automation.
//!
//! Commits, pushes and history reads go through a small, explicit wrapper
//! around `git` subprocess calls. Pushes run under a deadline with terminal
//! prompts disabled so an unreachable remote fails instead of hanging.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::DateTime;
use tracing::{debug, instrument, warn};

use crate::core::stats::CommitRecord;
use crate::io::process::run_bounded;

/// Default deadline for a single `git push`.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(120);

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--format=%H%x1f%ct%x1f%an%x1f%B%x1e";

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    push_timeout: Duration,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    /// Open the repository containing `path`, rooted at its top level.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            bail!("repository path {} does not exist", path.display());
        }
        let top = Self::new(path)
            .run_capture(&["rev-parse", "--show-toplevel"])
            .with_context(|| format!("{} is not a git repository", path.display()))?;
        let top = top.trim();
        debug!(toplevel = top, "opened repository");
        Ok(Self::new(top))
    }

    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if the workdir is inside a git repository.
    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--git-dir"])
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    pub fn remotes(&self) -> Result<Vec<String>> {
        let out = self.run_capture(&["remote"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn has_remote(&self, name: &str) -> Result<bool> {
        Ok(self.remotes()?.iter().any(|remote| remote == name))
    }

    /// Return the current branch name (errors on detached HEAD).
    ///
    /// Works on an unborn branch, before the first commit.
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if !out.status.success() {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD (no active branch)"));
        }
        let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// True once HEAD points at a commit.
    pub fn has_commits(&self) -> Result<bool> {
        Ok(self
            .run(&["rev-parse", "--verify", "--quiet", "HEAD"])?
            .status
            .success())
    }

    /// Full object id for `rev`.
    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        Ok(self.run_capture(&["rev-parse", rev])?.trim().to_string())
    }

    /// Return the current HEAD short SHA.
    pub fn head_short_sha(&self, len: usize) -> Result<String> {
        let arg = format!("--short={len}");
        let out = self.run_capture(&["rev-parse", &arg, "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Stage a single path relative to the workdir.
    pub fn add(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run_checked(&["add", "--", path.as_ref()])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "--quiet", "-m", message])?;
        Ok(true)
    }

    /// `git push <remote> <branch>`.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.push_with(&["push", remote, branch])
    }

    /// `git push --set-upstream <remote> <branch>`.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn push_set_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        self.push_with(&["push", "--set-upstream", remote, branch])
    }

    /// Bind `branch` to the remote-tracking ref `<remote>/<branch>`.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn set_upstream_to(&self, remote: &str, branch: &str) -> Result<()> {
        let upstream = format!("--set-upstream-to={remote}/{branch}");
        self.run_checked(&["branch", &upstream, branch])?;
        Ok(())
    }

    /// `git push` using the configured upstream.
    #[instrument(skip_all)]
    pub fn push_default(&self) -> Result<()> {
        self.push_with(&["push"])
    }

    /// Up to `max_count` commits reachable from `rev`, newest first.
    ///
    /// An unborn branch yields an empty history.
    #[instrument(skip_all, fields(rev, max_count))]
    pub fn log(&self, rev: &str, max_count: usize) -> Result<Vec<CommitRecord>> {
        if !self.has_commits()? {
            debug!("no commits yet");
            return Ok(Vec::new());
        }
        let limit = format!("--max-count={max_count}");
        let raw = self.run_capture(&["log", &limit, LOG_FORMAT, rev, "--"])?;
        parse_log(&raw)
    }

    fn push_with(&self, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0");
        let output = run_bounded(cmd, self.push_timeout)
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if output.timed_out {
            return Err(anyhow!(
                "git {} timed out after {:?}",
                args.join(" "),
                self.push_timeout
            ));
        }
        if !output.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr_text()
            ));
        }
        Ok(())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

/// Parse `git log` output produced with [`LOG_FORMAT`].
fn parse_log(raw: &str) -> Result<Vec<CommitRecord>> {
    let mut commits = Vec::new();
    for record in raw.split(RECORD_SEP) {
        let record = record.trim_start_matches(['\n', '\r']);
        if record.trim().is_empty() {
            continue;
        }
        let mut fields = record.splitn(4, FIELD_SEP);
        let (Some(sha), Some(secs), Some(author), Some(message)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(anyhow!("unexpected git log record: {record:?}"));
        };
        let secs: i64 = secs
            .trim()
            .parse()
            .with_context(|| format!("parse commit time {secs:?}"))?;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| anyhow!("commit time out of range: {secs}"))?;
        commits.push(CommitRecord {
            sha: sha.trim().to_string(),
            timestamp,
            author: author.to_string(),
            message: message.to_string(),
        });
    }
    Ok(commits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_records() {
        let raw = "abc\u{1f}1700000000\u{1f}Ada\u{1f}Fix bug\n\nbody\n\u{1e}\n\
                   def\u{1f}1690000000\u{1f}Bob\u{1f}Add tests\n\u{1e}\n";
        let commits = parse_log(raw).expect("parse");
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "abc");
        assert_eq!(commits[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(commits[0].author, "Ada");
        assert_eq!(commits[0].message, "Fix bug\n\nbody\n");
        assert_eq!(commits[1].message.trim(), "Add tests");
    }

    #[test]
    fn empty_log_parses_to_nothing() {
        assert!(parse_log("").expect("parse").is_empty());
        assert!(parse_log("\n").expect("parse").is_empty());
    }

    #[test]
    fn malformed_record_is_an_error() {
        assert!(parse_log("abc\u{1f}notanumber\u{1f}x\u{1f}y\u{1e}").is_err());
        assert!(parse_log("only-a-sha\u{1e}").is_err());
    }

    #[test]
    fn log_is_not_confused_by_a_file_named_like_the_branch() {
        let repo = crate::test_support::TestRepo::new().expect("repo");
        std::fs::write(repo.root().join("main"), "x\n").expect("write");
        let commits = repo.git().log("main", 10).expect("log");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message.trim(), "Initial commit");
    }

    #[test]
    fn open_rejects_plain_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = Git::open(temp.path()).expect_err("not a repo");
        assert!(err.to_string().contains("is not a git repository"));
    }

    #[test]
    fn open_rejects_missing_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = Git::open(temp.path().join("nope")).expect_err("missing");
        assert!(err.to_string().contains("does not exist"));
    }
}
