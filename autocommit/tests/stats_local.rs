//! Local-mode statistics read from real git history.

use autocommit::io::git::Git;
use autocommit::stats::local_stats;
use autocommit::test_support::{TestRepo, run_git};
use chrono::{DateTime, Duration, NaiveTime, Utc};

fn on_day(now: DateTime<Utc>, days_ago: i64, minute: u32) -> DateTime<Utc> {
    let day = (now - Duration::days(days_ago)).date_naive();
    let time = NaiveTime::from_hms_opt(10, minute, 0).expect("valid time");
    day.and_time(time).and_utc()
}

#[test]
fn two_active_days_seven_commits() {
    let repo = TestRepo::new().expect("repo");
    let now = Utc::now();
    repo.commit_at("old work", on_day(now, 40, 0)).expect("commit");
    for minute in 0..2 {
        repo.commit_at(&format!("first day {minute}"), on_day(now, 8, minute))
            .expect("commit");
    }
    for minute in 0..5 {
        repo.commit_at(&format!("third day {minute}"), on_day(now, 6, minute))
            .expect("commit");
    }

    let stats = local_stats(&repo.git(), 14, &now).expect("stats");
    assert_eq!(stats.total_commits, 7);
    assert_eq!(stats.active_days, 2);
    assert!((stats.average_commits_per_day - 0.5).abs() < 1e-9);
    assert_eq!(stats.recent_messages.len(), 7);
    assert_eq!(stats.recent_messages[0], "third day 4");
    assert_eq!(stats.last_commit, Some(on_day(now, 6, 4)));
}

#[test]
fn window_excludes_everything_old() {
    let repo = TestRepo::new().expect("repo");
    let stats = local_stats(&repo.git(), 30, &Utc::now()).expect("stats");
    assert_eq!(stats.total_commits, 0);
    assert_eq!(stats.active_days, 0);
    assert_eq!(stats.average_commits_per_day, 0.0);
    // The initial commit is outside the window but still the last commit.
    assert!(stats.last_commit.is_some());
}

#[test]
fn zero_day_window_averages_to_zero() {
    let repo = TestRepo::new().expect("repo");
    let now = Utc::now();
    repo.commit_at("just now", now - Duration::minutes(5))
        .expect("commit");
    let stats = local_stats(&repo.git(), 0, &now).expect("stats");
    assert_eq!(stats.total_commits, 1);
    assert_eq!(stats.average_commits_per_day, 0.0);
}

#[test]
fn oversized_window_is_rejected() {
    let repo = TestRepo::new().expect("repo");
    let err = local_stats(&repo.git(), u32::MAX, &Utc::now()).expect_err("too large");
    assert!(err.to_string().contains("exceeds the maximum"));
}

#[test]
fn branch_named_like_a_file_still_reads_history() {
    let repo = TestRepo::new().expect("repo");
    std::fs::write(repo.root().join("main"), "shadowing the branch name\n").expect("write");
    let now = Utc::now();
    repo.commit_at("recent", now - Duration::hours(1))
        .expect("commit");

    let stats = local_stats(&repo.git(), 7, &now).expect("stats");
    assert_eq!(stats.total_commits, 1);
}

#[test]
fn repository_without_commits_yields_zeros() {
    let temp = tempfile::tempdir().expect("tempdir");
    run_git(temp.path(), &["init", "--quiet"]).expect("init");
    run_git(temp.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]).expect("head");

    let stats = local_stats(&Git::new(temp.path()), 30, &Utc::now()).expect("stats");
    assert_eq!(stats.total_commits, 0);
    assert!(stats.recent_messages.is_empty());
    assert_eq!(stats.last_commit, None);
}
