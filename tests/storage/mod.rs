//! Shared storage integration tests.
//!
//! Tests the CountStatsStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod count_stats_store_tests;
