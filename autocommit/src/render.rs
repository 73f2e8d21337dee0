//! Plain-text rendering for CLI output.
//!
//! Everything here is a pure function of its inputs so the CLI stays a thin
//! dispatch layer and the output can be asserted on directly.

use std::path::PathBuf;

use chrono::{NaiveDate, SecondsFormat};

use crate::core::heatmap::{Intensity, heatmap};
use crate::core::schedule::{BulkPlan, SchedulePlan};
use crate::core::stats::{RemoteStats, StatsSnapshot};
use crate::io::config::Configuration;

const NOT_AVAILABLE: &str = "N/A";

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "(not set)".to_string();
    }
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

pub fn render_config(cfg: &Configuration) -> String {
    let username = if cfg.github_username.is_empty() {
        "(not set)"
    } else {
        cfg.github_username.as_str()
    };
    let mut out = format!(
        "github_username: {username}\ngithub_token: {}\ncommit_messages: {}\n",
        mask_secret(&cfg.github_token),
        cfg.commit_messages.len()
    );
    for (name, pattern) in &cfg.commit_patterns {
        out.push_str(&format!(
            "commit_pattern {name}: {}-{}\n",
            pattern.min, pattern.max
        ));
    }
    if let Some(window) = &cfg.schedule {
        let days: Vec<&str> = window.weekdays.iter().map(|day| day.cron()).collect();
        let days = if days.is_empty() {
            "every day".to_string()
        } else {
            days.join(",")
        };
        out.push_str(&format!(
            "schedule: {:02}:00-{:02}:00 on {days}\n",
            window.start_hour, window.end_hour
        ));
    }
    for key in cfg.extra.keys() {
        out.push_str(&format!("{key}: (unrecognized, kept)\n"));
    }
    out
}

/// Numbered list, 1-based to match `--edit` / `--remove` positions.
pub fn render_messages(messages: &[String]) -> String {
    let width = messages.len().to_string().len();
    messages
        .iter()
        .enumerate()
        .map(|(idx, message)| format!("{:>width$}. {message}\n", idx + 1))
        .collect()
}

pub fn render_backups(backups: &[PathBuf]) -> String {
    if backups.is_empty() {
        return "no backups found\n".to_string();
    }
    backups
        .iter()
        .map(|path| format!("{}\n", path.display()))
        .collect()
}

pub fn render_local_stats(stats: &StatsSnapshot) -> String {
    let last = stats.last_commit.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let mut out = format!(
        "Commit statistics (last {} days)\n  total commits:   {}\n  active days:     {}\n  average per day: {:.2}\n  last commit:     {last}\n",
        stats.days, stats.total_commits, stats.active_days, stats.average_commits_per_day
    );
    if !stats.recent_messages.is_empty() {
        out.push_str("Recent messages:\n");
        for message in &stats.recent_messages {
            let first_line = message.lines().next().unwrap_or_default();
            out.push_str(&format!("  - {first_line}\n"));
        }
    }
    out
}

/// Remote summary, per-repository breakdown and an activity grid ending at `today`.
pub fn render_remote_stats(stats: &RemoteStats, today: NaiveDate) -> String {
    let most_active = stats.most_active_day.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |day| {
            let count = stats.by_day.get(&day).copied().unwrap_or(0);
            format!("{day} ({count} commits)")
        },
    );
    let mut out = format!(
        "GitHub activity (last {} days)\n  total commits:   {}\n  active days:     {}\n  average per day: {:.2}\n  most active day: {most_active}\n",
        stats.days, stats.total_commits, stats.active_days, stats.average_commits_per_day
    );

    if !stats.repositories.is_empty() {
        out.push_str("Repositories:\n");
        let width = stats
            .repositories
            .iter()
            .map(|share| share.name.len())
            .max()
            .unwrap_or(0);
        for share in &stats.repositories {
            out.push_str(&format!(
                "  {:<width$}  {:>4}  {:>5.1}%\n",
                share.name, share.commits, share.percentage
            ));
        }
    }
    if !stats.failed_repositories.is_empty() {
        out.push_str(&format!(
            "Skipped (fetch failed): {}\n",
            stats.failed_repositories.join(", ")
        ));
    }

    out.push_str("Activity:\n");
    for week in heatmap(&stats.by_day, stats.days, today) {
        let cells: String = week.iter().map(|cell| intensity_glyph(cell.intensity)).collect();
        if let Some(first) = week.first() {
            out.push_str(&format!("  {}  {cells}\n", first.date));
        }
    }
    out.push_str("  legend: . none  - 1-2  + 3-5  # 6+\n");
    out
}

fn intensity_glyph(intensity: Intensity) -> char {
    match intensity {
        Intensity::None => '.',
        Intensity::Low => '-',
        Intensity::Medium => '+',
        Intensity::High => '#',
    }
}

pub fn render_schedule(plan: &SchedulePlan) -> String {
    format!(
        "frequency: {}\ncron: {}\ncommits per run: {}\n",
        plan.frequency, plan.cron, plan.commits_per_run
    )
}

/// Bulk plan as one line per day, day 1 first.
pub fn render_bulk(plan: &BulkPlan) -> String {
    let mut out = format!(
        "{} commits over {} days ({})\n",
        plan.total,
        plan.per_day.len(),
        plan.pattern
    );
    for (idx, count) in plan.per_day.iter().enumerate() {
        out.push_str(&format!("  day {:>3}: {count}\n", idx + 1));
    }
    out
}
