//! Deterministic, pure logic shared by the autocommit orchestration.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.
//! Randomness is always injected as an `Rng`.

pub mod heatmap;
pub mod messages;
pub mod plan;
pub mod push;
pub mod schedule;
pub mod stats;
