//! KPI bundle computation (§4.10).
//!
//! `TrustEngine::compute_kpi_bundle` is the single entry point that derives
//! the full KPI bundle for `[from, to]` from telemetry, anomalies, agents,
//! workflows, DLQ, and quarantine state — no caller assembles these numbers
//! by hand. Grounded on the aggregation shape of the telemetry crate's
//! rollup jobs (window query → reduce → typed row), generalized from one
//! metric to the tenant-level KPI bundle.

use agentkern_common::{AnomalyType, Result, SELFHEAL_OPERATOR};
use agentkern_store::{ContextStore, DeadLetterQueue, QuarantineLedger};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::weights::{compute_trust_score, TrustWeights};

pub const DEFAULT_SYNC_FRESHNESS_SLO_HOURS: i64 = 24;
pub const DEFAULT_INCIDENT_COST_USD: f64 = 10_000.0;
pub const DEFAULT_VIOLATION_COST_USD: f64 = 1_000.0;

const INCIDENT_COST_METRIC: &str = "risk.incident_cost_usd";
const VIOLATION_COST_METRIC: &str = "risk.violation_cost_usd";

#[derive(Debug, Clone, Copy)]
pub struct TrustConfig {
    pub weights: TrustWeights,
    pub sync_freshness_slo: Duration,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            sync_freshness_slo: Duration::hours(DEFAULT_SYNC_FRESHNESS_SLO_HOURS),
        }
    }
}

/// The KPI bundle: `(Trust Score, Risk Avoided $, Sync Freshness %, Drift
/// Rate %, Compliance SLA %, Self-Resolution Ratio, ROI)` over `[from, to]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiBundle {
    pub tenant_id: String,
    pub env: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub trust_score: f64,
    pub risk_avoided_usd: f64,
    pub sync_freshness_pct: f64,
    pub drift_rate_pct: f64,
    pub compliance_sla_pct: f64,
    pub self_resolution_ratio: f64,
    pub roi: f64,
    pub active_agents: u64,
    pub active_workflows: u64,
    pub total_events: u64,
}

pub struct TrustEngine {
    store: Arc<dyn ContextStore>,
    dlq: Arc<DeadLetterQueue>,
    quarantine: Arc<QuarantineLedger>,
    config: TrustConfig,
}

impl TrustEngine {
    pub fn new(store: Arc<dyn ContextStore>, dlq: Arc<DeadLetterQueue>, quarantine: Arc<QuarantineLedger>, config: TrustConfig) -> Result<Self> {
        config.weights.validate()?;
        Ok(Self { store, dlq, quarantine, config })
    }

    pub async fn compute_kpi_bundle(&self, tenant_id: &str, env: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<KpiBundle> {
        let agents = self.store.list_agents(tenant_id, env).await?;
        let active_agents = agents.iter().filter(|a| a.status == agentkern_common::AgentStatus::Active).count() as u64;

        let workflows = self.store.list_workflows(tenant_id, env).await?;
        let active_workflows = workflows.iter().filter(|w| w.status == "running").count() as u64;
        let fresh_workflows = workflows.iter().filter(|w| to - w.last_run_at <= self.config.sync_freshness_slo).count();
        let sync_freshness_pct = if workflows.is_empty() { 100.0 } else { 100.0 * fresh_workflows as f64 / workflows.len() as f64 };

        let telemetry = self.store.list_telemetry_window(tenant_id, env, from, to).await?;
        let total_events: u64 = telemetry.iter().map(|r| r.success_count + r.errors).sum();
        let total_errors: u64 = telemetry.iter().map(|r| r.errors).sum();
        let total_violations: u64 = telemetry.iter().map(|r| r.policy_violations).sum();
        let error_rate = if total_events > 0 { total_errors as f64 / total_events as f64 } else { 0.0 };
        let violation_rate = if total_events > 0 { total_violations as f64 / total_events as f64 } else { 0.0 };

        let anomalies = self.store.list_anomalies(tenant_id, env, from, to).await?;
        let drift_rate_pct = if total_events > 0 { 100.0 * anomalies.len() as f64 / total_events as f64 } else { 0.0 };
        let sla_breach_count = anomalies.iter().filter(|a| a.anomaly_type == AnomalyType::SlaBreach).count();
        let compliance_sla_pct = if total_events > 0 {
            (100.0 * (1.0 - sla_breach_count as f64 / total_events as f64)).clamp(0.0, 100.0)
        } else {
            100.0
        };

        let incident_cost = self.store.get_baseline(tenant_id, env, INCIDENT_COST_METRIC).await?.map(|b| b.mean).unwrap_or(DEFAULT_INCIDENT_COST_USD);
        let violation_cost = self.store.get_baseline(tenant_id, env, VIOLATION_COST_METRIC).await?.map(|b| b.mean).unwrap_or(DEFAULT_VIOLATION_COST_USD);
        let risk_avoided_usd = total_errors as f64 * incident_cost + total_violations as f64 * violation_cost;
        let operational_spend = (total_events as f64 * incident_cost).max(1.0);
        let roi = risk_avoided_usd / operational_spend;

        let dlq_opened = self.dlq.count_opened_since(tenant_id, env, from).await?;
        let quarantine_opened = self.quarantine.list_opened_since(tenant_id, env, from).await?;
        let total_incidents = dlq_opened as u64 + quarantine_opened.len() as u64;
        let auto_healed = quarantine_opened.iter().filter(|q| q.released_by.as_deref() == Some(SELFHEAL_OPERATOR)).count() as u64;
        let self_resolution_ratio = if total_incidents > 0 { auto_healed as f64 / total_incidents as f64 } else { 1.0 };

        let risk_exposure_inverse = (1.0 - (drift_rate_pct / 100.0)).clamp(0.0, 1.0);
        let trust_score = compute_trust_score(&self.config.weights, 1.0 - error_rate, 1.0 - violation_rate, sync_freshness_pct / 100.0, risk_exposure_inverse);

        Ok(KpiBundle {
            tenant_id: tenant_id.to_string(),
            env: env.to_string(),
            from,
            to,
            trust_score,
            risk_avoided_usd,
            sync_freshness_pct,
            drift_rate_pct,
            compliance_sla_pct,
            self_resolution_ratio,
            roi,
            active_agents,
            active_workflows,
            total_events,
        })
    }

    /// Persist the bundle as a `MetricSnapshot` for the `kpi_latest` view.
    pub async fn snapshot(&self, bundle: &KpiBundle) -> Result<()> {
        let snapshot = agentkern_common::MetricSnapshot {
            ts: bundle.to,
            tenant_id: bundle.tenant_id.clone(),
            trust_score: bundle.trust_score,
            risk_avoided_usd: bundle.risk_avoided_usd,
            sync_freshness_pct: bundle.sync_freshness_pct,
            drift_rate_pct: bundle.drift_rate_pct,
            compliance_sla_pct: bundle.compliance_sla_pct,
            active_agents: bundle.active_agents,
            active_workflows: bundle.active_workflows,
            total_events: bundle.total_events,
        };
        self.store.insert_metric_snapshot(&snapshot).await
    }
}
