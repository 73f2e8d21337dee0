//! Stable exit codes for autocommit CLI commands.

/// Command succeeded (including dry runs).
pub const OK: i32 = 0;
/// Command failed: precondition, push exhaustion, missing backup or any other error.
pub const FAILURE: i32 = 1;
