//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Counter table schema.
#[derive(Iden)]
pub enum CountStatsTable {
    #[iden = "count_stats"]
    Table,
    #[iden = "type"]
    Type,
    #[iden = "reference_id"]
    ReferenceId,
    #[iden = "count"]
    Count,
}

/// SQL for creating the counter table.
pub const CREATE_COUNT_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS count_stats (
    type TEXT NOT NULL,
    reference_id TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (type, reference_id)
);
"#;
