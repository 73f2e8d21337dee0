//! Weekly activity grid for remote statistics.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::core::stats::MAX_WINDOW_DAYS;

/// Activity bucket for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    None,
    /// 1-2 commits.
    Low,
    /// 3-5 commits.
    Medium,
    /// More than 5 commits.
    High,
}

impl Intensity {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Intensity::None,
            1..=2 => Intensity::Low,
            3..=5 => Intensity::Medium,
            _ => Intensity::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatCell {
    pub date: NaiveDate,
    pub count: usize,
    pub intensity: Intensity,
}

/// Build week rows covering `today - days ..= today`.
///
/// A row ends after each Sunday; the first and last rows may be partial.
/// The span is capped at [`MAX_WINDOW_DAYS`] and at the earliest representable date.
pub fn heatmap(by_day: &BTreeMap<NaiveDate, usize>, days: u32, today: NaiveDate) -> Vec<Vec<HeatCell>> {
    let span = days.min(MAX_WINDOW_DAYS);
    let mut current = today
        .checked_sub_days(Days::new(u64::from(span)))
        .unwrap_or(NaiveDate::MIN);
    let mut weeks = Vec::new();
    let mut week = Vec::new();
    loop {
        let count = by_day.get(&current).copied().unwrap_or(0);
        week.push(HeatCell {
            date: current,
            count,
            intensity: Intensity::from_count(count),
        });
        if current.weekday() == Weekday::Sun {
            weeks.push(std::mem::take(&mut week));
        }
        match current.succ_opt() {
            Some(next) if next <= today => current = next,
            _ => break,
        }
    }
    if !week.is_empty() {
        weeks.push(week);
    }
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn buckets_follow_commit_counts() {
        assert_eq!(Intensity::from_count(0), Intensity::None);
        assert_eq!(Intensity::from_count(2), Intensity::Low);
        assert_eq!(Intensity::from_count(5), Intensity::Medium);
        assert_eq!(Intensity::from_count(6), Intensity::High);
    }

    #[test]
    fn rows_break_after_sunday() {
        // 2026-03-08 is a Sunday.
        let today = date(2026, 3, 10);
        let mut by_day = BTreeMap::new();
        by_day.insert(date(2026, 3, 9), 4);
        let weeks = heatmap(&by_day, 4, today);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].len(), 3);
        assert_eq!(weeks[0].last().map(|c| c.date), Some(date(2026, 3, 8)));
        assert_eq!(weeks[1][0].intensity, Intensity::Medium);
        let cells: usize = weeks.iter().map(Vec::len).sum();
        assert_eq!(cells, 5);
    }

    #[test]
    fn huge_window_is_capped_instead_of_overflowing() {
        let today = date(2026, 3, 10);
        let weeks = heatmap(&BTreeMap::new(), u32::MAX, today);
        let cells: usize = weeks.iter().map(Vec::len).sum();
        assert_eq!(cells, MAX_WINDOW_DAYS as usize + 1);
        assert_eq!(weeks.last().and_then(|w| w.last()).map(|c| c.date), Some(today));
    }

    #[test]
    fn window_reaching_the_earliest_date_starts_there() {
        let today = NaiveDate::MIN + Days::new(3);
        let weeks = heatmap(&BTreeMap::new(), 10, today);
        let first = weeks.first().and_then(|w| w.first()).map(|c| c.date);
        assert_eq!(first, Some(NaiveDate::MIN));
    }
}
