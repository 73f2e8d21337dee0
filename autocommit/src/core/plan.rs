//! Commit plans: how many commits, how far apart, and which message.

use chrono::{DateTime, SecondsFormat, TimeZone};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// File rewritten on every cycle so each commit carries a diff.
pub const MARKER_FILE: &str = ".timestamp";

/// Rejected commit plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("commit count must be at least 1")]
    ZeroCount,
}

/// One invocation's worth of commits. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    /// Number of commit+push cycles (>= 1).
    pub count: u32,
    /// Pause between cycles in seconds. No pause after the last cycle.
    pub delay_secs: u64,
    /// Literal message for every cycle; random choice from config when absent.
    pub message: Option<String>,
    /// Plan and report only: no marker write, no commit, no push.
    pub dry_run: bool,
}

impl CommitPlan {
    pub fn new(count: u32) -> Self {
        Self {
            count,
            delay_secs: 0,
            message: None,
            dry_run: false,
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.count == 0 {
            return Err(PlanError::ZeroCount);
        }
        Ok(())
    }

    /// The literal message, if one was given and is not blank.
    pub fn literal_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }

    /// True when a delay must follow the cycle at `index` (0-based).
    pub fn delay_after(&self, index: u32) -> bool {
        self.delay_secs > 0 && index + 1 < self.count
    }
}

/// Pick the message for one cycle: the plan's literal message, else a uniform
/// choice from `pool`. Returns `None` only when both are unavailable.
pub fn choose_message<'a, R: Rng + ?Sized>(
    plan: &'a CommitPlan,
    pool: &'a [String],
    rng: &mut R,
) -> Option<&'a str> {
    if let Some(literal) = plan.literal_message() {
        return Some(literal);
    }
    pool.choose(rng).map(String::as_str)
}

/// Marker file contents for a cycle.
///
/// Nanosecond precision plus the cycle index keeps consecutive cycles distinct
/// even when the clock does not advance between them.
pub fn marker_contents<Tz: TimeZone>(now: &DateTime<Tz>, cycle: u32) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}\ncycle: {cycle}\n",
        now.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn zero_count_is_rejected() {
        assert_eq!(CommitPlan::new(0).validate(), Err(PlanError::ZeroCount));
        assert!(CommitPlan::new(1).validate().is_ok());
    }

    #[test]
    fn literal_message_wins_over_pool() {
        let plan = CommitPlan {
            message: Some("  ship it ".to_string()),
            ..CommitPlan::new(1)
        };
        let mut rng = StdRng::seed_from_u64(7);
        let pool = pool();
        assert_eq!(choose_message(&plan, &pool, &mut rng), Some("ship it"));
    }

    #[test]
    fn blank_literal_falls_back_to_pool() {
        let plan = CommitPlan {
            message: Some("   ".to_string()),
            ..CommitPlan::new(1)
        };
        let mut rng = StdRng::seed_from_u64(7);
        let pool = pool();
        let chosen = choose_message(&plan, &pool, &mut rng).expect("message");
        assert!(pool.iter().any(|m| m == chosen));
    }

    #[test]
    fn empty_pool_without_literal_yields_none() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(choose_message(&CommitPlan::new(1), &[], &mut rng), None);
    }

    #[test]
    fn random_choice_covers_the_pool() {
        let plan = CommitPlan::new(1);
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(choose_message(&plan, &pool, &mut rng).expect("message"));
        }
        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn no_delay_after_last_cycle() {
        let plan = CommitPlan {
            delay_secs: 5,
            ..CommitPlan::new(3)
        };
        assert!(plan.delay_after(0));
        assert!(plan.delay_after(1));
        assert!(!plan.delay_after(2));
        assert!(!CommitPlan::new(3).delay_after(0));
    }

    #[test]
    fn marker_contents_differ_per_cycle() {
        let now = Utc::now();
        assert_ne!(marker_contents(&now, 1), marker_contents(&now, 2));
        assert!(marker_contents(&now, 1).ends_with("cycle: 1\n"));
    }
}
