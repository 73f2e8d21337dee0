//! Commit-and-push orchestration for a [`CommitPlan`].
//!
//! Cycles run strictly in sequence: a cycle's push must succeed before the
//! next commit is created, so the remote always receives commits in ancestor
//! order. When every push strategy fails the plan aborts instead of stacking
//! more commits on unpushed history.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::plan::{CommitPlan, MARKER_FILE, PlanError, choose_message, marker_contents};
use crate::core::push::{LadderOutcome, PushFailures, PushStrategy, climb_ladder};
use crate::io::config::Configuration;
use crate::io::git::Git;
use crate::report::{CycleReport, Reporter};

/// The remote every plan pushes to.
pub const ORIGIN: &str = "origin";

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("invalid commit plan: {0}")]
    InvalidPlan(#[from] PlanError),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error(
        "push of {branch} failed in cycle {cycle}/{total}; commits exist locally and were not pushed, remaining cycles aborted:\n{failures}"
    )]
    PushExhausted {
        cycle: u32,
        total: u32,
        branch: String,
        failures: PushFailures,
    },
}

/// Pause between cycles.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Result of a completed plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub branch: String,
    pub cycles: u32,
    pub commits_created: u32,
    pub dry_run: bool,
    /// Short SHA of the pushed tip (`None` for dry runs).
    pub head: Option<String>,
}

/// Runs commit plans against one repository.
///
/// The orchestrator assumes exclusive use of the working tree and index for
/// the duration of a plan.
pub struct CommitOrchestrator<'a> {
    git: &'a Git,
}

impl<'a> CommitOrchestrator<'a> {
    pub fn new(git: &'a Git) -> Self {
        Self { git }
    }

    /// Validate everything a plan needs before any mutation.
    ///
    /// Returns the active branch.
    pub fn check_preconditions(
        &self,
        config: &Configuration,
        plan: &CommitPlan,
    ) -> Result<String, CommitError> {
        plan.validate()?;
        if !self.git.is_repository() {
            return Err(CommitError::Precondition(format!(
                "{} is not a git repository",
                self.git.workdir().display()
            )));
        }
        let has_origin = self
            .git
            .has_remote(ORIGIN)
            .map_err(|err| CommitError::Precondition(format!("{err:#}")))?;
        if !has_origin {
            return Err(CommitError::Precondition(format!(
                "no remote named '{ORIGIN}' configured"
            )));
        }
        let branch = self
            .git
            .current_branch()
            .map_err(|err| CommitError::Precondition(format!("{err:#}")))?;
        if config.credentials().is_none() {
            return Err(CommitError::Precondition(
                "GitHub username and token are not configured (run `autocommit setup`)"
                    .to_string(),
            ));
        }
        if plan.literal_message().is_none() && config.commit_messages.is_empty() {
            return Err(CommitError::Precondition(
                "no commit messages configured".to_string(),
            ));
        }
        Ok(branch)
    }

    /// Execute `plan`: choose a message, commit, push and report, `count` times.
    ///
    /// Dry runs only choose messages and report.
    #[instrument(skip_all, fields(count = plan.count, dry_run = plan.dry_run))]
    pub fn run<R, S, N>(
        &self,
        config: &Configuration,
        plan: &CommitPlan,
        reporter: &mut R,
        sleeper: &S,
        rng: &mut N,
    ) -> Result<CommitSummary>
    where
        R: Reporter + ?Sized,
        S: Sleeper + ?Sized,
        N: Rng + ?Sized,
    {
        let branch = self.check_preconditions(config, plan)?;
        info!(branch = %branch, "starting commit plan");

        let mut commits_created = 0u32;
        for index in 0..plan.count {
            let cycle = index + 1;
            let message = choose_message(plan, &config.commit_messages, &mut *rng)
                .ok_or_else(|| CommitError::Precondition("no commit message available".to_string()))?
                .to_string();

            let pushed_with = if plan.dry_run {
                debug!(cycle, message = %message, "dry run cycle");
                None
            } else {
                self.commit_cycle(cycle, &message)?;
                commits_created += 1;
                Some(self.push_cycle(&branch, cycle, plan.count)?)
            };

            reporter.cycle(&CycleReport {
                index: cycle,
                total: plan.count,
                message,
                dry_run: plan.dry_run,
                pushed_with,
            });

            if plan.delay_after(index) {
                debug!(delay_secs = plan.delay_secs, "waiting before next cycle");
                sleeper.sleep(Duration::from_secs(plan.delay_secs));
            }
        }

        let head = if plan.dry_run {
            None
        } else {
            Some(self.git.head_short_sha(7)?)
        };
        let summary = CommitSummary {
            branch,
            cycles: plan.count,
            commits_created,
            dry_run: plan.dry_run,
            head,
        };
        info!(commits_created, "commit plan completed");
        reporter.finished(&summary);
        Ok(summary)
    }

    /// Rewrite the marker file, stage it and commit.
    fn commit_cycle(&self, cycle: u32, message: &str) -> Result<()> {
        let marker = self.git.workdir().join(MARKER_FILE);
        fs::write(&marker, marker_contents(&Local::now(), cycle))
            .with_context(|| format!("write marker {}", marker.display()))?;
        self.git.add(Path::new(MARKER_FILE))?;
        if !self.git.commit_staged(message)? {
            bail!("marker file produced no change in cycle {cycle}");
        }
        debug!(cycle, "commit created");
        Ok(())
    }

    /// Push through the recovery ladder; exhaustion is fatal for the plan.
    fn push_cycle(&self, branch: &str, cycle: u32, total: u32) -> Result<PushStrategy> {
        match climb_ladder(|strategy| self.push_with(strategy, branch)) {
            LadderOutcome::Pushed { strategy, failures } => {
                if !failures.0.is_empty() {
                    info!(cycle, strategy = %strategy, recovered_from = failures.0.len(), "push recovered");
                }
                Ok(strategy)
            }
            LadderOutcome::Exhausted { failures } => {
                warn!(cycle, branch, "every push strategy failed");
                Err(CommitError::PushExhausted {
                    cycle,
                    total,
                    branch: branch.to_string(),
                    failures,
                }
                .into())
            }
        }
    }

    fn push_with(&self, strategy: PushStrategy, branch: &str) -> Result<()> {
        match strategy {
            PushStrategy::Plain => self.git.push(ORIGIN, branch),
            PushStrategy::SetUpstream => self.git.push_set_upstream(ORIGIN, branch),
            PushStrategy::BindTrackingThenPush => {
                self.git.set_upstream_to(ORIGIN, branch)?;
                self.git.push_default()
            }
        }
    }
}
