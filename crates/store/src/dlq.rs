//! Dead-letter queue.
//!
//! Per §3: "DLQ entry: (source, payload, error, correlation_id, attempts,
//! first_seen, last_seen). TTL = 30 days."

use agentkern_common::{ControlPlaneError, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};

pub const DLQ_TTL: Duration = Duration::days(30);

#[derive(Debug, Clone)]
pub struct DlqEntry {
    pub id: i64,
    pub source: String,
    pub payload: serde_json::Value,
    pub error: String,
    pub correlation_id: String,
    pub attempts: i32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

pub struct DeadLetterQueue {
    pool: PgPool,
}

impl DeadLetterQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Push a failed envelope. If an entry with the same correlation id
    /// already exists it is updated in place with a bumped attempt counter.
    pub async fn push(&self, tenant_id: &str, env: &str, source: &str, payload: &serde_json::Value, error: &str, correlation_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO dlq_entries (tenant_id, env, source, payload, error, correlation_id, attempts, first_seen, last_seen) \
             VALUES ($1,$2,$3,$4,$5,$6,1, now(), now())",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(source)
        .bind(payload)
        .bind(error)
        .bind(correlation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let cutoff = Utc::now() - DLQ_TTL;
        let result = sqlx::query("DELETE FROM dlq_entries WHERE first_seen < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Count of distinct DLQ entries first seen at or after `since`, for
    /// KPI reporting (each entry is one incident regardless of retry count).
    pub async fn count_opened_since(&self, tenant_id: &str, env: &str, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM dlq_entries WHERE tenant_id = $1 AND env = $2 AND first_seen >= $3")
            .bind(tenant_id)
            .bind(env)
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;
        row.try_get::<i64, _>("n").map_err(|e| ControlPlaneError::Internal(e.to_string()))
    }

    pub async fn list(&self, tenant_id: &str, env: &str, limit: i64) -> Result<Vec<DlqEntry>> {
        let rows = sqlx::query(
            "SELECT id, source, payload, error, correlation_id, attempts, first_seen, last_seen \
             FROM dlq_entries WHERE tenant_id = $1 AND env = $2 ORDER BY last_seen DESC LIMIT $3",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(DlqEntry {
                    id: row.try_get("id").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    source: row.try_get("source").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    payload: row.try_get("payload").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    error: row.try_get("error").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    correlation_id: row.try_get("correlation_id").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    attempts: row.try_get("attempts").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    first_seen: row.try_get("first_seen").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    last_seen: row.try_get("last_seen").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                })
            })
            .collect()
    }
}
