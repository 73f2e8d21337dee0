//! Schedule and bulk plan descriptions.
//!
//! These only describe what a scheduler would do (a cron expression, a
//! per-day commit distribution). Nothing here executes or persists a schedule.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Weekday;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("cron expression must have 5 fields, got {0:?}")]
    InvalidCron(String),
    #[error("commits per run must be at least 1")]
    ZeroCommits,
    #[error("bulk plan needs at least 1 day")]
    ZeroDays,
    #[error("bulk plan spans {days} days; the maximum is {max}")]
    TooManyDays { days: u32, max: u32 },
    #[error("bulk plan has {total} commits; the maximum is {max}")]
    TooManyCommits { total: u32, max: u32 },
    #[error("hour window must satisfy start < end <= 24 (got {start}-{end})")]
    InvalidWindow { start: u8, end: u8 },
    #[error("commit pattern {name:?} must satisfy 1 <= min <= max (got {min}..={max})")]
    InvalidPattern { name: String, min: u32, max: u32 },
}

/// Named commit count range stored in configuration (`commit_patterns`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPattern {
    pub min: u32,
    pub max: u32,
}

impl CommitPattern {
    pub fn validate(&self, name: &str) -> Result<(), ScheduleError> {
        if self.min == 0 || self.min > self.max {
            return Err(ScheduleError::InvalidPattern {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Uniform commit count within the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Hours and weekdays commits are allowed in (`schedule` in configuration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// First allowed hour (0-23).
    pub start_hour: u8,
    /// End hour, exclusive (1-24).
    pub end_hour: u8,
    pub weekdays: BTreeSet<WeekdayName>,
}

/// Serde-friendly weekday ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayName {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl WeekdayName {
    pub fn cron(self) -> &'static str {
        match self {
            WeekdayName::Mon => "MON",
            WeekdayName::Tue => "TUE",
            WeekdayName::Wed => "WED",
            WeekdayName::Thu => "THU",
            WeekdayName::Fri => "FRI",
            WeekdayName::Sat => "SAT",
            WeekdayName::Sun => "SUN",
        }
    }
}

impl From<Weekday> for WeekdayName {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => WeekdayName::Mon,
            Weekday::Tue => WeekdayName::Tue,
            Weekday::Wed => WeekdayName::Wed,
            Weekday::Thu => WeekdayName::Thu,
            Weekday::Fri => WeekdayName::Fri,
            Weekday::Sat => WeekdayName::Sat,
            Weekday::Sun => WeekdayName::Sun,
        }
    }
}

impl ScheduleWindow {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ScheduleError::InvalidWindow {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        Ok(())
    }

    fn cron_days(&self) -> String {
        if self.weekdays.is_empty() || self.weekdays.len() == 7 {
            return "*".to_string();
        }
        self.weekdays
            .iter()
            .map(|day| day.cron())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn first_day(&self) -> &'static str {
        self.weekdays
            .iter()
            .next()
            .map_or("MON", |day| day.cron())
    }
}

/// How often a scheduled run fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Custom(String),
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Hourly => f.write_str("hourly"),
            Frequency::Daily => f.write_str("daily"),
            Frequency::Weekly => f.write_str("weekly"),
            Frequency::Custom(_) => f.write_str("custom"),
        }
    }
}

/// Described schedule: what would run, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulePlan {
    pub frequency: String,
    pub cron: String,
    pub commits_per_run: u32,
}

/// Cron expression for `frequency`, narrowed to `window` when one is configured.
pub fn cron_expression(
    frequency: &Frequency,
    window: Option<&ScheduleWindow>,
) -> Result<String, ScheduleError> {
    if let Some(window) = window {
        window.validate()?;
    }
    let cron = match (frequency, window) {
        (Frequency::Custom(expr), _) => {
            let fields = expr.split_whitespace().count();
            if fields != 5 {
                return Err(ScheduleError::InvalidCron(expr.clone()));
            }
            expr.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        (Frequency::Hourly, None) => "0 * * * *".to_string(),
        (Frequency::Daily, None) => "0 9 * * *".to_string(),
        (Frequency::Weekly, None) => "0 9 * * MON".to_string(),
        (Frequency::Hourly, Some(w)) => {
            format!("0 {}-{} * * {}", w.start_hour, w.end_hour - 1, w.cron_days())
        }
        (Frequency::Daily, Some(w)) => format!("0 {} * * {}", w.start_hour, w.cron_days()),
        (Frequency::Weekly, Some(w)) => format!("0 {} * * {}", w.start_hour, w.first_day()),
    };
    Ok(cron)
}

pub fn plan_schedule(
    frequency: &Frequency,
    window: Option<&ScheduleWindow>,
    commits_per_run: u32,
) -> Result<SchedulePlan, ScheduleError> {
    if commits_per_run == 0 {
        return Err(ScheduleError::ZeroCommits);
    }
    Ok(SchedulePlan {
        frequency: frequency.to_string(),
        cron: cron_expression(frequency, window)?,
        commits_per_run,
    })
}

/// Longest bulk plan, about ten years.
pub const MAX_BULK_DAYS: u32 = 3_660;
/// Largest number of commits a bulk plan may spread.
pub const MAX_BULK_TOTAL: u32 = 100_000;

/// How bulk commits are spread across days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Distribution {
    Even,
    Random,
    FrontLoaded,
    BackLoaded,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Distribution::Even => "even",
            Distribution::Random => "random",
            Distribution::FrontLoaded => "front-loaded",
            Distribution::BackLoaded => "back-loaded",
        };
        f.write_str(label)
    }
}

/// Described bulk plan: commits per day, first day first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkPlan {
    pub total: u32,
    pub pattern: Distribution,
    pub per_day: Vec<u32>,
}

/// Spread `total` commits over `days` days. The result always sums to `total`.
///
/// Both inputs are bounded ([`MAX_BULK_DAYS`], [`MAX_BULK_TOTAL`]).
pub fn plan_bulk<R: Rng + ?Sized>(
    total: u32,
    days: u32,
    pattern: Distribution,
    rng: &mut R,
) -> Result<BulkPlan, ScheduleError> {
    if total == 0 {
        return Err(ScheduleError::ZeroCommits);
    }
    if days == 0 {
        return Err(ScheduleError::ZeroDays);
    }
    if days > MAX_BULK_DAYS {
        return Err(ScheduleError::TooManyDays {
            days,
            max: MAX_BULK_DAYS,
        });
    }
    if total > MAX_BULK_TOTAL {
        return Err(ScheduleError::TooManyCommits {
            total,
            max: MAX_BULK_TOTAL,
        });
    }
    let n = days as usize;
    let per_day = match pattern {
        Distribution::Even => {
            let base = total / days;
            let extra = (total % days) as usize;
            (0..n).map(|i| base + u32::from(i < extra)).collect()
        }
        Distribution::Random => {
            let mut per_day = vec![0u32; n];
            for _ in 0..total {
                per_day[rng.gen_range(0..n)] += 1;
            }
            per_day
        }
        Distribution::FrontLoaded => {
            let weights: Vec<u64> = (0..n).map(|i| (n - i) as u64).collect();
            apportion(total, &weights)
        }
        Distribution::BackLoaded => {
            let weights: Vec<u64> = (0..n).map(|i| (i + 1) as u64).collect();
            apportion(total, &weights)
        }
    };
    Ok(BulkPlan {
        total,
        pattern,
        per_day,
    })
}

/// Largest-remainder apportionment of `total` by `weights`.
///
/// Leftover units go to the largest remainders, then heavier weights, then
/// earlier days.
fn apportion(total: u32, weights: &[u64]) -> Vec<u32> {
    let sum: u64 = weights.iter().sum();
    let total = u64::from(total);
    let mut shares: Vec<u32> = weights.iter().map(|w| (total * w / sum) as u32).collect();
    let assigned: u64 = shares.iter().map(|s| u64::from(*s)).sum();
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = total * weights[a] % sum;
        let rb = total * weights[b] % sum;
        rb.cmp(&ra)
            .then_with(|| weights[b].cmp(&weights[a]))
            .then_with(|| a.cmp(&b))
    });
    for idx in order.into_iter().take((total - assigned) as usize) {
        shares[idx] += 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn window(start: u8, end: u8, days: &[WeekdayName]) -> ScheduleWindow {
        ScheduleWindow {
            start_hour: start,
            end_hour: end,
            weekdays: days.iter().copied().collect(),
        }
    }

    #[test]
    fn fixed_frequencies_map_to_known_cron() {
        assert_eq!(cron_expression(&Frequency::Hourly, None).expect("cron"), "0 * * * *");
        assert_eq!(cron_expression(&Frequency::Daily, None).expect("cron"), "0 9 * * *");
        assert_eq!(cron_expression(&Frequency::Weekly, None).expect("cron"), "0 9 * * MON");
    }

    #[test]
    fn custom_cron_needs_five_fields() {
        let ok = Frequency::Custom("30  8 * * 1-5".to_string());
        assert_eq!(cron_expression(&ok, None).expect("cron"), "30 8 * * 1-5");
        let bad = Frequency::Custom("* * *".to_string());
        assert!(matches!(
            cron_expression(&bad, None),
            Err(ScheduleError::InvalidCron(_))
        ));
    }

    #[test]
    fn window_narrows_cron() {
        let w = window(9, 18, &[WeekdayName::Fri, WeekdayName::Mon]);
        assert_eq!(
            cron_expression(&Frequency::Hourly, Some(&w)).expect("cron"),
            "0 9-17 * * MON,FRI"
        );
        assert_eq!(
            cron_expression(&Frequency::Weekly, Some(&w)).expect("cron"),
            "0 9 * * MON"
        );
        let bad = window(18, 9, &[]);
        assert!(matches!(
            cron_expression(&Frequency::Daily, Some(&bad)),
            Err(ScheduleError::InvalidWindow { start: 18, end: 9 })
        ));
    }

    #[test]
    fn schedule_rejects_zero_commits() {
        assert_eq!(
            plan_schedule(&Frequency::Daily, None, 0),
            Err(ScheduleError::ZeroCommits)
        );
        let plan = plan_schedule(&Frequency::Daily, None, 3).expect("plan");
        assert_eq!(plan.frequency, "daily");
        assert_eq!(plan.commits_per_run, 3);
    }

    #[test]
    fn every_distribution_sums_to_total() {
        let mut rng = StdRng::seed_from_u64(3);
        for pattern in [
            Distribution::Even,
            Distribution::Random,
            Distribution::FrontLoaded,
            Distribution::BackLoaded,
        ] {
            for (total, days) in [(1, 1), (7, 3), (10, 7), (3, 10), (100, 30)] {
                let plan = plan_bulk(total, days, pattern, &mut rng).expect("plan");
                assert_eq!(plan.per_day.len(), days as usize);
                assert_eq!(plan.per_day.iter().sum::<u32>(), total, "{pattern} {total}/{days}");
            }
        }
    }

    #[test]
    fn even_gives_remainder_to_first_days() {
        let mut rng = StdRng::seed_from_u64(0);
        let plan = plan_bulk(7, 3, Distribution::Even, &mut rng).expect("plan");
        assert_eq!(plan.per_day, vec![3, 2, 2]);
    }

    #[test]
    fn loaded_patterns_are_monotonic() {
        let mut rng = StdRng::seed_from_u64(0);
        let front = plan_bulk(20, 4, Distribution::FrontLoaded, &mut rng).expect("plan");
        assert_eq!(front.per_day, vec![8, 6, 4, 2]);
        let back = plan_bulk(20, 4, Distribution::BackLoaded, &mut rng).expect("plan");
        assert_eq!(back.per_day, vec![2, 4, 6, 8]);
    }

    #[test]
    fn zero_days_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            plan_bulk(5, 0, Distribution::Even, &mut rng),
            Err(ScheduleError::ZeroDays)
        );
    }

    #[test]
    fn oversized_bulk_plans_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            plan_bulk(1, 4_000_000_000, Distribution::Even, &mut rng),
            Err(ScheduleError::TooManyDays {
                days: 4_000_000_000,
                max: MAX_BULK_DAYS
            })
        );
        assert_eq!(
            plan_bulk(u32::MAX, 10, Distribution::Random, &mut rng),
            Err(ScheduleError::TooManyCommits {
                total: u32::MAX,
                max: MAX_BULK_TOTAL
            })
        );
        let widest = plan_bulk(MAX_BULK_TOTAL, MAX_BULK_DAYS, Distribution::BackLoaded, &mut rng)
            .expect("limits are inclusive");
        assert_eq!(widest.per_day.iter().sum::<u32>(), MAX_BULK_TOTAL);
    }

    #[test]
    fn pattern_range_is_validated_and_sampled() {
        let pattern = CommitPattern { min: 2, max: 4 };
        pattern.validate("light").expect("valid");
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let n = pattern.sample(&mut rng);
            assert!((2..=4).contains(&n));
        }
        assert!(CommitPattern { min: 0, max: 1 }.validate("zero").is_err());
        assert!(CommitPattern { min: 3, max: 2 }.validate("inverted").is_err());
    }
}
