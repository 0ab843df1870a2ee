//! Pure utility functions.
//!
//! These are small helpers used across the codebase.

pub mod bootstrap;
pub mod inflight;
pub mod retry;
