//! Test-only helpers: throwaway repositories with a bare `origin`, recording
//! reporters and scripted API responses.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use crate::commit::{CommitSummary, ORIGIN, Sleeper};
use crate::io::config::Configuration;
use crate::io::git::Git;
use crate::io::github::HostingApi;
use crate::report::{CycleReport, Reporter};

/// Working repository on branch `main` with one commit, plus a bare remote.
///
/// The initial commit is dated 2020-01-01 so it never falls into a stats window.
pub struct TestRepo {
    _temp: TempDir,
    root: PathBuf,
    remote: PathBuf,
}

impl TestRepo {
    /// Repository with `origin` pointing at the bare remote.
    pub fn new() -> Result<Self> {
        let repo = Self::without_remote()?;
        let remote = repo.remote.to_string_lossy().to_string();
        repo.git_out(&["remote", "add", ORIGIN, &remote])?;
        Ok(repo)
    }

    /// Repository with no remotes configured (the bare repo still exists).
    pub fn without_remote() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let root = temp.path().join("work");
        let remote = temp.path().join("origin.git");
        fs::create_dir_all(&root).context("create work dir")?;

        run_git(temp.path(), &["init", "--quiet", "--bare", "origin.git"])?;
        run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        run_git(&root, &["init", "--quiet"])?;
        run_git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        run_git(&root, &["config", "user.name", "Test User"])?;
        run_git(&root, &["config", "user.email", "test@example.com"])?;
        run_git(&root, &["config", "commit.gpgsign", "false"])?;

        let repo = Self {
            _temp: temp,
            root,
            remote,
        };
        fs::write(repo.root.join("README.md"), "test repository\n").context("write readme")?;
        repo.git_out(&["add", "README.md"])?;
        repo.commit_at_with(
            "Initial commit",
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .ok_or_else(|| anyhow!("invalid initial date"))?,
            false,
        )?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn remote_path(&self) -> &Path {
        &self.remote
    }

    pub fn git(&self) -> Git {
        Git::new(&self.root)
    }

    /// Run git in the working repository and return stdout.
    pub fn git_out(&self, args: &[&str]) -> Result<String> {
        run_git(&self.root, args)
    }

    /// Point `origin` somewhere else (e.g. a path that does not exist).
    pub fn set_origin_url(&self, url: &str) -> Result<()> {
        self.git_out(&["remote", "set-url", ORIGIN, url])?;
        Ok(())
    }

    pub fn detach_head(&self) -> Result<()> {
        self.git_out(&["checkout", "--quiet", "--detach"])?;
        Ok(())
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> Result<usize> {
        let out = self.git_out(&["rev-list", "--count", "HEAD"])?;
        out.trim().parse().context("parse commit count")
    }

    pub fn local_tip(&self) -> Result<String> {
        Ok(self.git_out(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// Tip of `branch` in the bare remote, if the branch exists there.
    pub fn remote_tip(&self, branch: &str) -> Result<Option<String>> {
        let out = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.remote)
            .output()
            .context("spawn git rev-parse in remote")?;
        if !out.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&out.stdout).trim().to_string()))
    }

    /// Files touched by commit `rev`.
    pub fn files_changed(&self, rev: &str) -> Result<Vec<String>> {
        let out = self.git_out(&["diff-tree", "--no-commit-id", "--name-only", "-r", rev])?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Subject line of commit `rev`.
    pub fn subject(&self, rev: &str) -> Result<String> {
        Ok(self
            .git_out(&["log", "-1", "--format=%s", rev])?
            .trim()
            .to_string())
    }

    /// Create an empty commit with both author and committer dates set to `when`.
    pub fn commit_at(&self, message: &str, when: DateTime<Utc>) -> Result<()> {
        self.commit_at_with(message, when, true)
    }

    fn commit_at_with(&self, message: &str, when: DateTime<Utc>, allow_empty: bool) -> Result<()> {
        let date = when.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut cmd = Command::new("git");
        cmd.arg("commit").arg("--quiet").arg("-m").arg(message);
        if allow_empty {
            cmd.arg("--allow-empty");
        }
        let out = cmd
            .current_dir(&self.root)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .output()
            .context("spawn git commit")?;
        if !out.status.success() {
            return Err(anyhow!(
                "git commit failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// Run git in `dir`, failing on a non-zero exit.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !out.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

/// Default configuration with credentials filled in.
pub fn test_config() -> Configuration {
    Configuration {
        github_username: "test-user".to_string(),
        github_token: "test-token".to_string(),
        ..Configuration::default()
    }
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Reporter that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub cycles: Vec<CycleReport>,
    pub warnings: Vec<String>,
    pub finished: Vec<CommitSummary>,
    pub scanned: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn cycle(&mut self, report: &CycleReport) {
        self.cycles.push(report.clone());
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn finished(&mut self, summary: &CommitSummary) {
        self.finished.push(summary.clone());
    }

    fn repository_scanned(&mut self, _index: usize, _total: usize, repo: &str) {
        self.scanned.push(repo.to_string());
    }
}

/// Sleeper that returns immediately.
#[derive(Debug, Default)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Hosting API returning canned data per repository.
#[derive(Debug, Default)]
pub struct ScriptedHostingApi {
    repos: Vec<String>,
    commits: BTreeMap<String, Result<Vec<NaiveDate>, String>>,
    list_error: Option<String>,
    pub requests: RefCell<Vec<String>>,
}

impl ScriptedHostingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repo(mut self, name: &str, dates: Vec<NaiveDate>) -> Self {
        self.repos.push(name.to_string());
        self.commits.insert(name.to_string(), Ok(dates));
        self
    }

    pub fn failing_repo(mut self, name: &str, error: &str) -> Self {
        self.repos.push(name.to_string());
        self.commits.insert(name.to_string(), Err(error.to_string()));
        self
    }

    pub fn failing_listing(mut self, error: &str) -> Self {
        self.list_error = Some(error.to_string());
        self
    }
}

impl HostingApi for ScriptedHostingApi {
    fn list_repositories(&self, username: &str) -> Result<Vec<String>> {
        self.requests.borrow_mut().push(format!("repos:{username}"));
        match &self.list_error {
            Some(error) => Err(anyhow!("{error}")),
            None => Ok(self.repos.clone()),
        }
    }

    fn list_commit_dates(
        &self,
        username: &str,
        repo: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<NaiveDate>> {
        self.requests
            .borrow_mut()
            .push(format!("commits:{username}/{repo}"));
        match self.commits.get(repo) {
            Some(Ok(dates)) => Ok(dates.clone()),
            Some(Err(error)) => Err(anyhow!("{error}")),
            None => Err(anyhow!("unknown repository {repo}")),
        }
    }
}
