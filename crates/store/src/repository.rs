//! Context store contract (C1).
//!
//! Per §4.1: "atomic read/write for entities in §3, with optimistic
//! concurrency on `updated_at`... typed errors distinguishing `NotFound`,
//! `Conflict`, `Transient`, `PolicyViolation`. Multi-tenant isolation is
//! enforced at the store boundary (every query composes `tenant_id` and
//! `env`)."

use agentkern_common::{Agent, Anomaly, Baseline, MetricSnapshot, Result, TelemetryRecord, Workflow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::rollup::RollupRow;

/// Single write operation subject to optimistic concurrency: the caller
/// supplies the `updated_at` it last observed; a store whose row has since
/// moved on returns `ControlPlaneError::Conflict`.
pub struct Expected {
    pub last_seen_updated_at: Option<DateTime<Utc>>,
}

impl Expected {
    pub fn none() -> Self {
        Self { last_seen_updated_at: None }
    }

    pub fn at(ts: DateTime<Utc>) -> Self {
        Self { last_seen_updated_at: Some(ts) }
    }
}

#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Cheap liveness check for the readiness probe (§4.12): a round trip
    /// to the backing store with no query planning cost.
    async fn ping(&self) -> Result<()>;

    async fn get_agent(&self, tenant_id: &str, env: &str, id: &str) -> Result<Agent>;
    async fn upsert_agent(&self, env: &str, agent: &Agent, expected: Expected) -> Result<Agent>;
    async fn list_agents(&self, tenant_id: &str, env: &str) -> Result<Vec<Agent>>;

    async fn get_workflow(&self, tenant_id: &str, env: &str, id: &str) -> Result<Workflow>;
    async fn upsert_workflow(&self, tenant_id: &str, env: &str, workflow: &Workflow, expected: Expected) -> Result<Workflow>;
    async fn list_workflows(&self, tenant_id: &str, env: &str) -> Result<Vec<Workflow>>;

    async fn append_telemetry(&self, tenant_id: &str, env: &str, record: &TelemetryRecord) -> Result<()>;
    async fn list_telemetry(&self, tenant_id: &str, env: &str, agent_id: &str, limit: i64) -> Result<Vec<TelemetryRecord>>;
    async fn list_telemetry_window(
        &self,
        tenant_id: &str,
        env: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>>;

    async fn upsert_hourly_rollup(&self, row: &RollupRow) -> Result<()>;
    async fn list_hourly_rollups(&self, tenant_id: &str, env: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<RollupRow>>;
    async fn upsert_daily_rollup(&self, row: &RollupRow) -> Result<()>;

    async fn upsert_baseline(&self, baseline: &Baseline) -> Result<()>;
    async fn get_baseline(&self, tenant_id: &str, env: &str, metric_name: &str) -> Result<Option<Baseline>>;

    async fn insert_metric_snapshot(&self, snapshot: &MetricSnapshot) -> Result<()>;
    async fn latest_metric_snapshot(&self, tenant_id: &str) -> Result<Option<MetricSnapshot>>;
    async fn refresh_kpi_view(&self) -> Result<()>;

    async fn append_anomaly(&self, anomaly: &Anomaly) -> Result<()>;
    async fn list_anomalies(&self, tenant_id: &str, env: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Anomaly>>;
}
