//! Quarantine ledger.
//!
//! Per §3: "Quarantine entry: (resource_id, reason, opened_at); ends only via
//! explicit release." The release path is left open to the implementation:
//! release is the explicit `release` operation below, always attributed to
//! an operator and a reason, never time-based.

use agentkern_common::{ControlPlaneError, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct QuarantineEntry {
    pub resource_id: String,
    pub reason: String,
    pub opened_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub release_reason: Option<String>,
}

impl QuarantineEntry {
    pub fn is_active(&self) -> bool {
        self.released_at.is_none()
    }
}

pub struct QuarantineLedger {
    pool: PgPool,
}

impl QuarantineLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn open(&self, tenant_id: &str, env: &str, resource_id: &str, reason: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO quarantine_entries (tenant_id, env, resource_id, reason, opened_at) \
             VALUES ($1,$2,$3,$4, now()) \
             ON CONFLICT (tenant_id, env, resource_id) DO UPDATE SET \
               reason = EXCLUDED.reason, opened_at = now(), released_at = NULL, released_by = NULL, release_reason = NULL",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(resource_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;
        Ok(())
    }

    /// Explicit release operation. Requires an operator identity and a
    /// reason; there is no automatic/time-based expiry.
    pub async fn release(&self, tenant_id: &str, env: &str, resource_id: &str, operator: &str, reason: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE quarantine_entries SET released_at = now(), released_by = $4, release_reason = $5 \
             WHERE tenant_id = $1 AND env = $2 AND resource_id = $3 AND released_at IS NULL",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(resource_id)
        .bind(operator)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ControlPlaneError::NotFound(format!("no active quarantine for {resource_id}")));
        }
        Ok(())
    }

    /// Entries opened at or after `since`, for KPI/self-healing reporting.
    pub async fn list_opened_since(&self, tenant_id: &str, env: &str, since: DateTime<Utc>) -> Result<Vec<QuarantineEntry>> {
        let rows = sqlx::query(
            "SELECT resource_id, reason, opened_at, released_at, released_by, release_reason \
             FROM quarantine_entries WHERE tenant_id = $1 AND env = $2 AND opened_at >= $3",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(QuarantineEntry {
                    resource_id: row.try_get("resource_id").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    reason: row.try_get("reason").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    opened_at: row.try_get("opened_at").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    released_at: row.try_get("released_at").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    released_by: row.try_get("released_by").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                    release_reason: row.try_get("release_reason").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                })
            })
            .collect()
    }

    pub async fn get(&self, tenant_id: &str, env: &str, resource_id: &str) -> Result<Option<QuarantineEntry>> {
        let row = sqlx::query(
            "SELECT resource_id, reason, opened_at, released_at, released_by, release_reason \
             FROM quarantine_entries WHERE tenant_id = $1 AND env = $2 AND resource_id = $3",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(QuarantineEntry {
                resource_id: row.try_get("resource_id").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                reason: row.try_get("reason").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                opened_at: row.try_get("opened_at").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                released_at: row.try_get("released_at").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                released_by: row.try_get("released_by").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                release_reason: row.try_get("release_reason").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
            })),
        }
    }
}
