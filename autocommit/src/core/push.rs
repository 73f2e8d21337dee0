//! Push-recovery ladder.
//!
//! A push is attempted with an ordered list of strategies. Each strategy runs
//! at most once per cycle and the first success ends the ladder. The ladder is
//! plain data so the policy can be tested without a remote.

use std::fmt;

use anyhow::Result;

/// One rung of the push-recovery ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushStrategy {
    /// `git push <remote> <branch>`.
    Plain,
    /// `git push --set-upstream <remote> <branch>`.
    SetUpstream,
    /// Bind `<branch>` to `<remote>/<branch>`, then `git push`.
    BindTrackingThenPush,
}

impl PushStrategy {
    /// Strategies in the order they are tried.
    pub const LADDER: [PushStrategy; 3] = [
        PushStrategy::Plain,
        PushStrategy::SetUpstream,
        PushStrategy::BindTrackingThenPush,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PushStrategy::Plain => "plain push",
            PushStrategy::SetUpstream => "push with upstream tracking",
            PushStrategy::BindTrackingThenPush => "bind tracking branch then push",
        }
    }
}

impl fmt::Display for PushStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A strategy that was tried and failed, with the underlying error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    pub strategy: PushStrategy,
    pub detail: String,
}

/// Failures collected while climbing the ladder, rendered one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushFailures(pub Vec<PushFailure>);

impl fmt::Display for PushFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {}: {}", failure.strategy, failure.detail)?;
        }
        Ok(())
    }
}

/// How a ladder run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LadderOutcome {
    /// `strategy` succeeded after the strategies in `failures` failed.
    Pushed {
        strategy: PushStrategy,
        failures: PushFailures,
    },
    /// Every strategy failed.
    Exhausted { failures: PushFailures },
}

/// Try each strategy of [`PushStrategy::LADDER`] in order until one succeeds.
pub fn climb_ladder<F>(mut attempt: F) -> LadderOutcome
where
    F: FnMut(PushStrategy) -> Result<()>,
{
    let mut failures = Vec::new();
    for strategy in PushStrategy::LADDER {
        match attempt(strategy) {
            Ok(()) => {
                return LadderOutcome::Pushed {
                    strategy,
                    failures: PushFailures(failures),
                };
            }
            Err(err) => failures.push(PushFailure {
                strategy,
                detail: format!("{err:#}"),
            }),
        }
    }
    LadderOutcome::Exhausted {
        failures: PushFailures(failures),
    }
}
