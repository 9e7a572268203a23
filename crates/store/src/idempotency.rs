//! Idempotency Service (C5).
//!
//! Per §4.5: "`checkIdempotency(key) -> record | null`,
//! `storeIdempotency(key, result, ttl)`. Keys are derived deterministically
//! from canonical request material... TTL defaults 24h (7 days for batch
//! jobs). A hit returns the stored result and MUST bypass side effects."

use agentkern_common::{ControlPlaneError, Result};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};

pub const DEFAULT_TTL: Duration = Duration::hours(24);
pub const BATCH_TTL: Duration = Duration::days(7);

#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub key: String,
    pub result: serde_json::Value,
    pub expires_at: DateTime<Utc>,
}

/// Derive an idempotency key deterministically from canonical request
/// material when the caller did not supply one (`x-idempotency-key` absent).
pub fn derive_key(source: &str, target_task_id: &str, execution_id: &str, payload: &serde_json::Value) -> Result<String> {
    let payload_bytes = serde_json::to_vec(payload).map_err(|e| ControlPlaneError::Internal(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(target_task_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(execution_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(&payload_bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct IdempotencyService {
    pool: PgPool,
}

impl IdempotencyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn check(&self, tenant_id: &str, env: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
        let row = sqlx::query(
            "SELECT key, result, expires_at FROM idempotency_records \
             WHERE tenant_id = $1 AND env = $2 AND key = $3 AND expires_at > now()",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(IdempotencyRecord {
                key: row.try_get("key").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                result: row.try_get("result").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
                expires_at: row.try_get("expires_at").map_err(|e| ControlPlaneError::Internal(e.to_string()))?,
            })),
        }
    }

    pub async fn store(&self, tenant_id: &str, env: &str, key: &str, result: &serde_json::Value, ttl: Duration) -> Result<()> {
        let expires_at = Utc::now() + ttl;
        sqlx::query(
            "INSERT INTO idempotency_records (tenant_id, env, key, result, expires_at) VALUES ($1,$2,$3,$4,$5) \
             ON CONFLICT (tenant_id, env, key) DO UPDATE SET result = EXCLUDED.result, expires_at = EXCLUDED.expires_at",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(key)
        .bind(result)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ControlPlaneError::Transient(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let payload = serde_json::json!({"a": 1});
        let k1 = derive_key("zapier", "task-1", "exec-1", &payload).unwrap();
        let k2 = derive_key("zapier", "task-1", "exec-1", &payload).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn derive_key_differs_on_payload() {
        let k1 = derive_key("zapier", "task-1", "exec-1", &serde_json::json!({"a": 1})).unwrap();
        let k2 = derive_key("zapier", "task-1", "exec-1", &serde_json::json!({"a": 2})).unwrap();
        assert_ne!(k1, k2);
    }
}
