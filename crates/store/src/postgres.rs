//! Postgres-backed `ContextStore`.

use agentkern_common::{
    Agent, AgentStatus, Anomaly, Baseline, ControlPlaneError, MetricSnapshot, Result, TelemetryRecord,
    Workflow, WorkflowSource,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::repository::{ContextStore, Expected};
use crate::rollup::RollupRow;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Clone of the underlying pool, for the ancillary DLQ/quarantine/
    /// idempotency stores that share the same database but sit outside the
    /// `ContextStore` trait.
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| ControlPlaneError::Transient(format!("postgres connect failed: {e}")))?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ControlPlaneError::Internal(format!("migration failed: {e}")))
    }
}

fn map_sqlx_err(err: sqlx::Error) -> ControlPlaneError {
    match &err {
        sqlx::Error::RowNotFound => ControlPlaneError::NotFound("row not found".into()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            ControlPlaneError::Conflict(format!("unique violation: {db_err}"))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => ControlPlaneError::Transient(err.to_string()),
        other => ControlPlaneError::Internal(other.to_string()),
    }
}

fn agent_status_str(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Active => "active",
        AgentStatus::Suspended => "suspended",
        AgentStatus::Quarantined => "quarantined",
        AgentStatus::Deprecated => "deprecated",
    }
}

fn parse_agent_status(s: &str) -> Result<AgentStatus> {
    match s {
        "active" => Ok(AgentStatus::Active),
        "suspended" => Ok(AgentStatus::Suspended),
        "quarantined" => Ok(AgentStatus::Quarantined),
        "deprecated" => Ok(AgentStatus::Deprecated),
        other => Err(ControlPlaneError::Internal(format!("unknown agent status in store: {other}"))),
    }
}

fn row_to_agent(row: &sqlx::postgres::PgRow) -> Result<Agent> {
    let owners: serde_json::Value = row.try_get("owners").map_err(map_sqlx_err)?;
    let policies: serde_json::Value = row.try_get("policies").map_err(map_sqlx_err)?;
    let status: String = row.try_get("status").map_err(map_sqlx_err)?;
    Ok(Agent {
        id: row.try_get("id").map_err(map_sqlx_err)?,
        tenant_id: row.try_get("tenant_id").map_err(map_sqlx_err)?,
        agent_type: row.try_get("agent_type").map_err(map_sqlx_err)?,
        vendor: row.try_get("vendor").map_err(map_sqlx_err)?,
        model: row.try_get("model").map_err(map_sqlx_err)?,
        status: parse_agent_status(&status)?,
        compliance_tier: row.try_get("compliance_tier").map_err(map_sqlx_err)?,
        trust_level: row.try_get("trust_level").map_err(map_sqlx_err)?,
        owners: serde_json::from_value(owners).unwrap_or_default(),
        policies: serde_json::from_value(policies).unwrap_or_default(),
        updated_at: row.try_get("updated_at").map_err(map_sqlx_err)?,
    })
}

fn row_to_rollup(row: &sqlx::postgres::PgRow) -> Result<RollupRow> {
    Ok(RollupRow {
        tenant_id: row.try_get("tenant_id").map_err(map_sqlx_err)?,
        env: row.try_get("env").map_err(map_sqlx_err)?,
        service: row.try_get("service").map_err(map_sqlx_err)?,
        period_start: row.try_get("period_start").map_err(map_sqlx_err)?,
        request_count: row.try_get::<i64, _>("request_count").map_err(map_sqlx_err)? as u64,
        error_count: row.try_get::<i64, _>("error_count").map_err(map_sqlx_err)? as u64,
        avg_latency_ms: row.try_get("avg_latency_ms").map_err(map_sqlx_err)?,
        p50_latency_ms: row.try_get("p50_latency_ms").map_err(map_sqlx_err)?,
        p95_latency_ms: row.try_get("p95_latency_ms").map_err(map_sqlx_err)?,
        p99_latency_ms: row.try_get("p99_latency_ms").map_err(map_sqlx_err)?,
    })
}

/// Shared upsert for `hourly_rollups`/`daily_rollups`; both tables key on
/// `(tenant_id, env, service, period_start)` so re-running a job is a no-op
/// beyond overwriting the computed aggregates.
async fn upsert_rollup(pool: &PgPool, table: &str, row: &RollupRow) -> Result<()> {
    let sql = format!(
        "INSERT INTO {table} (tenant_id, env, service, period_start, request_count, error_count, avg_latency_ms, p50_latency_ms, p95_latency_ms, p99_latency_ms, computed_at) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10, now()) \
         ON CONFLICT (tenant_id, env, service, period_start) DO UPDATE SET \
           request_count = EXCLUDED.request_count, error_count = EXCLUDED.error_count, \
           avg_latency_ms = EXCLUDED.avg_latency_ms, p50_latency_ms = EXCLUDED.p50_latency_ms, \
           p95_latency_ms = EXCLUDED.p95_latency_ms, p99_latency_ms = EXCLUDED.p99_latency_ms, computed_at = now()"
    );
    sqlx::query(&sql)
        .bind(&row.tenant_id)
        .bind(&row.env)
        .bind(&row.service)
        .bind(row.period_start)
        .bind(row.request_count as i64)
        .bind(row.error_count as i64)
        .bind(row.avg_latency_ms)
        .bind(row.p50_latency_ms)
        .bind(row.p95_latency_ms)
        .bind(row.p99_latency_ms)
        .execute(pool)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

#[async_trait]
impl ContextStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn get_agent(&self, tenant_id: &str, env: &str, id: &str) -> Result<Agent> {
        let row = sqlx::query(
            "SELECT id, tenant_id, agent_type, vendor, model, status, compliance_tier, trust_level, owners, policies, updated_at \
             FROM agents WHERE tenant_id = $1 AND env = $2 AND id = $3",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or_else(|| ControlPlaneError::NotFound(format!("agent {id} not found")))?;
        row_to_agent(&row)
    }

    async fn upsert_agent(&self, env: &str, agent: &Agent, expected: Expected) -> Result<Agent> {
        let owners = serde_json::to_value(&agent.owners).map_err(|e| ControlPlaneError::Internal(e.to_string()))?;
        let policies = serde_json::to_value(&agent.policies).map_err(|e| ControlPlaneError::Internal(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO agents (id, tenant_id, env, agent_type, vendor, model, status, compliance_tier, trust_level, owners, policies, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11, now()) \
             ON CONFLICT (tenant_id, env, id) DO UPDATE SET \
               agent_type = EXCLUDED.agent_type, vendor = EXCLUDED.vendor, model = EXCLUDED.model, \
               status = EXCLUDED.status, compliance_tier = EXCLUDED.compliance_tier, trust_level = EXCLUDED.trust_level, \
               owners = EXCLUDED.owners, policies = EXCLUDED.policies, updated_at = now() \
             WHERE $12::timestamptz IS NULL OR agents.updated_at = $12",
        )
        .bind(&agent.id)
        .bind(&agent.tenant_id)
        .bind(env)
        .bind(&agent.agent_type)
        .bind(&agent.vendor)
        .bind(&agent.model)
        .bind(agent_status_str(agent.status))
        .bind(&agent.compliance_tier)
        .bind(agent.trust_level)
        .bind(owners)
        .bind(policies)
        .bind(expected.last_seen_updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(ControlPlaneError::Conflict(format!("agent {} updated concurrently", agent.id)));
        }

        self.get_agent(&agent.tenant_id, env, &agent.id).await
    }

    async fn list_agents(&self, tenant_id: &str, env: &str) -> Result<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, agent_type, vendor, model, status, compliance_tier, trust_level, owners, policies, updated_at \
             FROM agents WHERE tenant_id = $1 AND env = $2 ORDER BY id",
        )
        .bind(tenant_id)
        .bind(env)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.iter().map(row_to_agent).collect()
    }

    async fn get_workflow(&self, tenant_id: &str, env: &str, id: &str) -> Result<Workflow> {
        let row = sqlx::query("SELECT id, source, trigger, status, last_run_at FROM workflows WHERE tenant_id = $1 AND env = $2 AND id = $3")
            .bind(tenant_id)
            .bind(env)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| ControlPlaneError::NotFound(format!("workflow {id} not found")))?;

        let source: String = row.try_get("source").map_err(map_sqlx_err)?;
        Ok(Workflow {
            id: row.try_get("id").map_err(map_sqlx_err)?,
            source: WorkflowSource::from_str(&source).map_err(ControlPlaneError::Internal)?,
            trigger: row.try_get("trigger").map_err(map_sqlx_err)?,
            status: row.try_get("status").map_err(map_sqlx_err)?,
            last_run_at: row.try_get("last_run_at").map_err(map_sqlx_err)?,
        })
    }

    async fn upsert_workflow(&self, tenant_id: &str, env: &str, workflow: &Workflow, expected: Expected) -> Result<Workflow> {
        if let Some(existing) = self.get_workflow(tenant_id, env, &workflow.id).await.ok() {
            if workflow.last_run_at < existing.last_run_at {
                return Err(ControlPlaneError::Conflict("last_run_at must be monotonic".into()));
            }
        }

        let result = sqlx::query(
            "INSERT INTO workflows (id, tenant_id, env, source, trigger, status, last_run_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7, now()) \
             ON CONFLICT (tenant_id, env, id) DO UPDATE SET \
               source = EXCLUDED.source, trigger = EXCLUDED.trigger, status = EXCLUDED.status, \
               last_run_at = EXCLUDED.last_run_at, updated_at = now() \
             WHERE $8::timestamptz IS NULL OR workflows.updated_at = $8",
        )
        .bind(&workflow.id)
        .bind(tenant_id)
        .bind(env)
        .bind(workflow.source.to_string())
        .bind(&workflow.trigger)
        .bind(&workflow.status)
        .bind(workflow.last_run_at)
        .bind(expected.last_seen_updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(ControlPlaneError::Conflict(format!("workflow {} updated concurrently", workflow.id)));
        }
        self.get_workflow(tenant_id, env, &workflow.id).await
    }

    async fn list_workflows(&self, tenant_id: &str, env: &str) -> Result<Vec<Workflow>> {
        let rows = sqlx::query("SELECT id, source, trigger, status, last_run_at FROM workflows WHERE tenant_id = $1 AND env = $2")
            .bind(tenant_id)
            .bind(env)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        rows.iter()
            .map(|row| {
                let source: String = row.try_get("source").map_err(map_sqlx_err)?;
                Ok(Workflow {
                    id: row.try_get("id").map_err(map_sqlx_err)?,
                    source: WorkflowSource::from_str(&source).map_err(ControlPlaneError::Internal)?,
                    trigger: row.try_get("trigger").map_err(map_sqlx_err)?,
                    status: row.try_get("status").map_err(map_sqlx_err)?,
                    last_run_at: row.try_get("last_run_at").map_err(map_sqlx_err)?,
                })
            })
            .collect()
    }

    async fn append_telemetry(&self, tenant_id: &str, env: &str, record: &TelemetryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO telemetry_records (tenant_id, env, agent_id, ts, latency_ms, errors, policy_violations, success_count, uptime_pct) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(&record.agent_id)
        .bind(record.ts)
        .bind(record.latency_ms)
        .bind(record.errors as i64)
        .bind(record.policy_violations as i64)
        .bind(record.success_count as i64)
        .bind(record.uptime_pct)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_telemetry(&self, tenant_id: &str, env: &str, agent_id: &str, limit: i64) -> Result<Vec<TelemetryRecord>> {
        let rows = sqlx::query(
            "SELECT agent_id, ts, latency_ms, errors, policy_violations, success_count, uptime_pct \
             FROM telemetry_records WHERE tenant_id = $1 AND env = $2 AND agent_id = $3 \
             ORDER BY ts DESC LIMIT $4",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(TelemetryRecord {
                    agent_id: row.try_get("agent_id").map_err(map_sqlx_err)?,
                    ts: row.try_get("ts").map_err(map_sqlx_err)?,
                    latency_ms: row.try_get("latency_ms").map_err(map_sqlx_err)?,
                    errors: row.try_get::<i64, _>("errors").map_err(map_sqlx_err)? as u64,
                    policy_violations: row.try_get::<i64, _>("policy_violations").map_err(map_sqlx_err)? as u64,
                    success_count: row.try_get::<i64, _>("success_count").map_err(map_sqlx_err)? as u64,
                    uptime_pct: row.try_get("uptime_pct").map_err(map_sqlx_err)?,
                })
            })
            .collect()
    }

    async fn list_telemetry_window(&self, tenant_id: &str, env: &str, from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> Result<Vec<TelemetryRecord>> {
        let rows = sqlx::query(
            "SELECT agent_id, ts, latency_ms, errors, policy_violations, success_count, uptime_pct \
             FROM telemetry_records WHERE tenant_id = $1 AND env = $2 AND ts >= $3 AND ts < $4 \
             ORDER BY ts ASC",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(TelemetryRecord {
                    agent_id: row.try_get("agent_id").map_err(map_sqlx_err)?,
                    ts: row.try_get("ts").map_err(map_sqlx_err)?,
                    latency_ms: row.try_get("latency_ms").map_err(map_sqlx_err)?,
                    errors: row.try_get::<i64, _>("errors").map_err(map_sqlx_err)? as u64,
                    policy_violations: row.try_get::<i64, _>("policy_violations").map_err(map_sqlx_err)? as u64,
                    success_count: row.try_get::<i64, _>("success_count").map_err(map_sqlx_err)? as u64,
                    uptime_pct: row.try_get("uptime_pct").map_err(map_sqlx_err)?,
                })
            })
            .collect()
    }

    async fn upsert_hourly_rollup(&self, row: &RollupRow) -> Result<()> {
        upsert_rollup(&self.pool, "hourly_rollups", row).await
    }

    async fn list_hourly_rollups(&self, tenant_id: &str, env: &str, from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> Result<Vec<RollupRow>> {
        let rows = sqlx::query(
            "SELECT tenant_id, env, service, period_start, request_count, error_count, avg_latency_ms, p50_latency_ms, p95_latency_ms, p99_latency_ms \
             FROM hourly_rollups WHERE tenant_id = $1 AND env = $2 AND period_start >= $3 AND period_start < $4 \
             ORDER BY period_start ASC",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.iter().map(row_to_rollup).collect()
    }

    async fn upsert_daily_rollup(&self, row: &RollupRow) -> Result<()> {
        upsert_rollup(&self.pool, "daily_rollups", row).await
    }

    async fn upsert_baseline(&self, baseline: &Baseline) -> Result<()> {
        sqlx::query(
            "INSERT INTO baselines (tenant_id, env, metric_name, mean, stddev, p50, p95, p99, sample_count, refreshed_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9, now()) \
             ON CONFLICT (tenant_id, env, metric_name) DO UPDATE SET \
               mean = EXCLUDED.mean, stddev = EXCLUDED.stddev, p50 = EXCLUDED.p50, p95 = EXCLUDED.p95, \
               p99 = EXCLUDED.p99, sample_count = EXCLUDED.sample_count, refreshed_at = now()",
        )
        .bind(&baseline.tenant_id)
        .bind(&baseline.env)
        .bind(&baseline.metric_name)
        .bind(baseline.mean)
        .bind(baseline.stddev)
        .bind(baseline.p50)
        .bind(baseline.p95)
        .bind(baseline.p99)
        .bind(baseline.sample_count as i64)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn get_baseline(&self, tenant_id: &str, env: &str, metric_name: &str) -> Result<Option<Baseline>> {
        let row = sqlx::query(
            "SELECT tenant_id, env, metric_name, mean, stddev, p50, p95, p99, sample_count \
             FROM baselines WHERE tenant_id = $1 AND env = $2 AND metric_name = $3",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(metric_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(Baseline {
                tenant_id: row.try_get("tenant_id").map_err(map_sqlx_err)?,
                env: row.try_get("env").map_err(map_sqlx_err)?,
                metric_name: row.try_get("metric_name").map_err(map_sqlx_err)?,
                mean: row.try_get("mean").map_err(map_sqlx_err)?,
                stddev: row.try_get("stddev").map_err(map_sqlx_err)?,
                p50: row.try_get("p50").map_err(map_sqlx_err)?,
                p95: row.try_get("p95").map_err(map_sqlx_err)?,
                p99: row.try_get("p99").map_err(map_sqlx_err)?,
                sample_count: row.try_get::<i64, _>("sample_count").map_err(map_sqlx_err)? as u64,
            })),
        }
    }

    async fn insert_metric_snapshot(&self, snapshot: &MetricSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO metric_snapshots (ts, tenant_id, trust_score, risk_avoided_usd, sync_freshness_pct, drift_rate_pct, compliance_sla_pct, active_agents, active_workflows, total_events) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) \
             ON CONFLICT (tenant_id, ts) DO UPDATE SET \
               trust_score = EXCLUDED.trust_score, risk_avoided_usd = EXCLUDED.risk_avoided_usd, \
               sync_freshness_pct = EXCLUDED.sync_freshness_pct, drift_rate_pct = EXCLUDED.drift_rate_pct, \
               compliance_sla_pct = EXCLUDED.compliance_sla_pct, active_agents = EXCLUDED.active_agents, \
               active_workflows = EXCLUDED.active_workflows, total_events = EXCLUDED.total_events",
        )
        .bind(snapshot.ts)
        .bind(&snapshot.tenant_id)
        .bind(snapshot.trust_score)
        .bind(snapshot.risk_avoided_usd)
        .bind(snapshot.sync_freshness_pct)
        .bind(snapshot.drift_rate_pct)
        .bind(snapshot.compliance_sla_pct)
        .bind(snapshot.active_agents as i64)
        .bind(snapshot.active_workflows as i64)
        .bind(snapshot.total_events as i64)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn latest_metric_snapshot(&self, tenant_id: &str) -> Result<Option<MetricSnapshot>> {
        let row = sqlx::query(
            "SELECT ts, tenant_id, trust_score, risk_avoided_usd, sync_freshness_pct, drift_rate_pct, compliance_sla_pct, active_agents, active_workflows, total_events \
             FROM kpi_latest WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(MetricSnapshot {
                ts: row.try_get("ts").map_err(map_sqlx_err)?,
                tenant_id: row.try_get("tenant_id").map_err(map_sqlx_err)?,
                trust_score: row.try_get("trust_score").map_err(map_sqlx_err)?,
                risk_avoided_usd: row.try_get("risk_avoided_usd").map_err(map_sqlx_err)?,
                sync_freshness_pct: row.try_get("sync_freshness_pct").map_err(map_sqlx_err)?,
                drift_rate_pct: row.try_get("drift_rate_pct").map_err(map_sqlx_err)?,
                compliance_sla_pct: row.try_get("compliance_sla_pct").map_err(map_sqlx_err)?,
                active_agents: row.try_get::<i64, _>("active_agents").map_err(map_sqlx_err)? as u64,
                active_workflows: row.try_get::<i64, _>("active_workflows").map_err(map_sqlx_err)? as u64,
                total_events: row.try_get::<i64, _>("total_events").map_err(map_sqlx_err)? as u64,
            })),
        }
    }

    async fn refresh_kpi_view(&self) -> Result<()> {
        sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY kpi_latest")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn append_anomaly(&self, anomaly: &Anomaly) -> Result<()> {
        sqlx::query(
            "INSERT INTO anomalies (id, tenant_id, env, metric_name, anomaly_type, severity, observed_value, baseline_value, message, detected_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
        )
        .bind(anomaly.id)
        .bind(&anomaly.tenant_id)
        .bind(&anomaly.env)
        .bind(&anomaly.metric_name)
        .bind(anomaly.anomaly_type.to_string())
        .bind(anomaly.severity.to_string())
        .bind(anomaly.observed_value)
        .bind(anomaly.baseline_value)
        .bind(&anomaly.message)
        .bind(anomaly.detected_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_anomalies(&self, tenant_id: &str, env: &str, from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> Result<Vec<Anomaly>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, env, metric_name, anomaly_type, severity, observed_value, baseline_value, message, detected_at \
             FROM anomalies WHERE tenant_id = $1 AND env = $2 AND detected_at >= $3 AND detected_at < $4 \
             ORDER BY detected_at ASC",
        )
        .bind(tenant_id)
        .bind(env)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                let anomaly_type: String = row.try_get("anomaly_type").map_err(map_sqlx_err)?;
                let severity: String = row.try_get("severity").map_err(map_sqlx_err)?;
                Ok(Anomaly {
                    id: row.try_get("id").map_err(map_sqlx_err)?,
                    tenant_id: row.try_get("tenant_id").map_err(map_sqlx_err)?,
                    env: row.try_get("env").map_err(map_sqlx_err)?,
                    metric_name: row.try_get("metric_name").map_err(map_sqlx_err)?,
                    anomaly_type: anomaly_type.parse().map_err(ControlPlaneError::Internal)?,
                    severity: severity.parse().map_err(ControlPlaneError::Internal)?,
                    observed_value: row.try_get("observed_value").map_err(map_sqlx_err)?,
                    baseline_value: row.try_get("baseline_value").map_err(map_sqlx_err)?,
                    message: row.try_get("message").map_err(map_sqlx_err)?,
                    detected_at: row.try_get("detected_at").map_err(map_sqlx_err)?,
                })
            })
            .collect()
    }
}
