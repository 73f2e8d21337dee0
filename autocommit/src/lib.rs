//! Git commit automation with push recovery and contribution statistics.
//!
//! The crate keeps a strict separation between logic and side effects:
//!
//! - **[`core`]**: Pure, deterministic logic (commit plans, the push-recovery
//!   ladder, message editing rules, stats aggregation, schedule plans).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config file, `git` subprocesses,
//!   the GitHub REST API).
//!
//! Orchestration modules ([`commit`], [`stats`]) combine the two to implement
//! CLI commands. User-facing output flows through the [`report::Reporter`]
//! sink so the orchestration stays testable without capturing stdout.

pub mod commit;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
pub mod report;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
