//! SQLite CountStatsStore implementation.

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use sea_query::{Expr, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

use crate::domain::{CountStats, CountStatsType};
use crate::storage::schema::{CountStatsTable, CREATE_COUNT_STATS_TABLE};
use crate::storage::{CountStatsStore, Result, StorageError};
use crate::utils::retry::connection_backoff;

/// SQLite implementation of CountStatsStore.
pub struct SqliteCountStatsStore {
    pool: SqlitePool,
}

impl SqliteCountStatsStore {
    /// Create a new SQLite counter store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path` and make sure
    /// the schema exists.
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path);
        let pool = (|| SqlitePool::connect(&url))
            .retry(connection_backoff())
            .notify(|err: &sqlx::Error, dur: Duration| {
                warn!(path = %path, error = %err, delay = ?dur, "SQLite connect failed, retrying");
            })
            .await?;

        let store = Self::new(pool);
        store.init().await?;
        info!(path = %path, "SQLite counter store ready");
        Ok(store)
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_COUNT_STATS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_stats(row: &sqlx::sqlite::SqliteRow) -> Result<CountStats> {
        let stats_type: String = row.get("type");
        Ok(CountStats {
            stats_type: stats_type.parse()?,
            reference_id: row.get("reference_id"),
            count: row.get("count"),
        })
    }
}

#[async_trait]
impl CountStatsStore for SqliteCountStatsStore {
    async fn create(&self, stats: &CountStats) -> Result<()> {
        let query = Query::insert()
            .into_table(CountStatsTable::Table)
            .columns([
                CountStatsTable::Type,
                CountStatsTable::ReferenceId,
                CountStatsTable::Count,
            ])
            .values_panic([
                stats.stats_type.as_str().into(),
                stats.reference_id.clone().into(),
                stats.count.into(),
            ])
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Duplicate {
                    entity: "count stats",
                    key: format!("{}/{}", stats.stats_type, stats.reference_id),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn adjust_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
        delta: i64,
    ) -> Result<u64> {
        if reference_ids.is_empty() {
            return Ok(0);
        }

        let query = Query::update()
            .table(CountStatsTable::Table)
            .value(
                CountStatsTable::Count,
                Expr::col(CountStatsTable::Count).add(delta),
            )
            .and_where(Expr::col(CountStatsTable::Type).eq(stats_type.as_str()))
            .and_where(Expr::col(CountStatsTable::ReferenceId).is_in(reference_ids.iter().cloned()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn get_by_reference_ids_and_type(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
    ) -> Result<Vec<CountStats>> {
        if reference_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::select()
            .columns([
                CountStatsTable::Type,
                CountStatsTable::ReferenceId,
                CountStatsTable::Count,
            ])
            .from(CountStatsTable::Table)
            .and_where(Expr::col(CountStatsTable::Type).eq(stats_type.as_str()))
            .and_where(Expr::col(CountStatsTable::ReferenceId).is_in(reference_ids.iter().cloned()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_stats).collect()
    }

    async fn get_by_types(&self, types: &[CountStatsType]) -> Result<Vec<CountStats>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::select()
            .columns([
                CountStatsTable::Type,
                CountStatsTable::ReferenceId,
                CountStatsTable::Count,
            ])
            .from(CountStatsTable::Table)
            .and_where(Expr::col(CountStatsTable::Type).is_in(types.iter().map(|t| t.as_str())))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_stats).collect()
    }

    async fn delete_by_reference_id(
        &self,
        reference_id: &str,
        stats_type: CountStatsType,
    ) -> Result<u64> {
        let query = Query::delete()
            .from_table(CountStatsTable::Table)
            .and_where(Expr::col(CountStatsTable::Type).eq(stats_type.as_str()))
            .and_where(Expr::col(CountStatsTable::ReferenceId).eq(reference_id))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
