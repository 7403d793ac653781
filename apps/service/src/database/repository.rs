use anyhow::{Result, anyhow};
use async_trait::async_trait;
use libsql::params;

use super::models::ResultRow;
use crate::monitoring::types::CheckResult;
use crate::pool::{LibsqlManager, LibsqlPool};

/// Append-only destination for check results
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Store a whole batch of results
    async fn insert(&self, records: &[CheckResult]) -> Result<()>;
}

/// libsql-backed result store
pub struct ResultStore {
    pool: LibsqlPool,
}

impl ResultStore {
    /// Create a store from a pool, running migrations first
    pub async fn new_from_pool(pool: LibsqlPool) -> Result<Self> {
        let store = Self { pool };
        let conn = store.get_conn().await?;
        super::initialize_database(&conn).await?;
        drop(conn);
        Ok(store)
    }

    /// Open the database file at `path`
    pub async fn open(path: &str) -> Result<Self> {
        Self::new_from_pool(crate::pool::open_pool(path).await?).await
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        self.pool.get().await.map_err(|e| anyhow!("failed to get database connection: {}", e))
    }

    /// Most recent rows first
    pub async fn recent_results(&self, limit: usize) -> Result<Vec<ResultRow>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare("SELECT id, target, status, success, response_time_ms, status_code, message, cause, expected, actual, observed_at, created_at FROM check_results ORDER BY id DESC LIMIT ?")
            .await?;

        let mut rows = stmt.query(params![limit as i64]).await?;
        let mut results = Vec::new();

        while let Some(row) = rows.next().await? {
            let status_str: String = row.get(2)?;

            results.push(ResultRow {
                id: Some(row.get(0)?),
                target: row.get(1)?,
                status: ResultRow::parse_status(&status_str)
                    .ok_or_else(|| anyhow!("unknown status in database: {}", status_str))?,
                success: row.get::<i64>(3)? != 0,
                response_time_ms: row.get::<Option<i64>>(4)?.map(|v| v as u64),
                status_code: row.get::<Option<i64>>(5)?.map(|v| v as u16),
                message: row.get(6)?,
                cause: row.get(7)?,
                expected: row.get(8)?,
                actual: row.get(9)?,
                observed_at: row.get(10)?,
                created_at: row.get(11)?,
            });
        }

        Ok(results)
    }

    pub async fn count_results(&self) -> Result<u64> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT COUNT(*) FROM check_results", ()).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count as u64)
    }
}

#[async_trait]
impl ResultSink for ResultStore {
    async fn insert(&self, records: &[CheckResult]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        for record in records {
            let row = ResultRow::from_check_result(record);
            tx.execute(
                "INSERT INTO check_results (target, status, success, response_time_ms, status_code, message, cause, expected, actual, observed_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    row.target,
                    row.status.to_string(),
                    if row.success { 1 } else { 0 },
                    row.response_time_ms.map(|v| v as i64),
                    row.status_code.map(|v| v as i64),
                    row.message,
                    row.cause,
                    row.expected,
                    row.actual,
                    row.observed_at,
                    row.created_at
                ],
            )
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Persisted {} results", records.len());
        Ok(())
    }
}
