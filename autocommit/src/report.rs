//! Progress and warning sink for orchestration.
//!
//! Orchestration never prints directly. The CLI passes a [`ConsoleReporter`];
//! tests pass a recording reporter and assert on what was reported.

use crate::commit::CommitSummary;
use crate::core::push::PushStrategy;

/// Progress for one finished commit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle index.
    pub index: u32,
    pub total: u32,
    pub message: String,
    pub dry_run: bool,
    /// Strategy that pushed this cycle's commit (`None` for dry runs).
    pub pushed_with: Option<PushStrategy>,
}

pub trait Reporter {
    /// Called after every completed cycle, dry run or not.
    fn cycle(&mut self, report: &CycleReport);

    /// A recovered error: the operation continues.
    fn warning(&mut self, message: &str);

    /// Called once when a commit plan completes.
    fn finished(&mut self, summary: &CommitSummary);

    /// Called after each repository of a remote stats scan.
    fn repository_scanned(&mut self, _index: usize, _total: usize, _repo: &str) {}
}

/// Reporter writing progress to stdout and warnings to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn cycle(&mut self, report: &CycleReport) {
        let suffix = match (report.dry_run, report.pushed_with) {
            (true, _) => " (dry run)".to_string(),
            (false, Some(PushStrategy::Plain)) | (false, None) => String::new(),
            (false, Some(strategy)) => format!(" (pushed via {strategy})"),
        };
        println!(
            "commit {}/{}: {}{}",
            report.index, report.total, report.message, suffix
        );
    }

    fn warning(&mut self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn finished(&mut self, summary: &CommitSummary) {
        if summary.dry_run {
            println!(
                "dry run completed, nothing pushed ({} cycles planned on {})",
                summary.cycles, summary.branch
            );
        } else {
            println!(
                "done: {} commits created and pushed to origin/{}",
                summary.commits_created, summary.branch
            );
        }
    }

    fn repository_scanned(&mut self, index: usize, total: usize, repo: &str) {
        eprintln!("scanned {index}/{total}: {repo}");
    }
}
