//! SQLite implementations of storage interfaces.

mod count_stats_store;

pub use count_stats_store::SqliteCountStatsStore;
