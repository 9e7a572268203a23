//! Canonical domain types shared across the ingestion, policy, telemetry,
//! and trust-scoring subsystems.
//!
//! Per REDESIGN FLAGS: "Dynamic, untagged JSON payloads... replaced by
//! tagged variants for the canonical event and a schema-validated edge;
//! unknown fields preserved as opaque bytes." `data` below stays
//! `serde_json::Value` (the payload shape is genuinely adapter-specific)
//! but everything that wraps it is a typed, versioned envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Agent lifecycle status. `Quarantined` implies no new events accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Suspended,
    Quarantined,
    Deprecated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub tenant_id: String,
    pub agent_type: String,
    pub vendor: String,
    pub model: String,
    pub status: AgentStatus,
    pub compliance_tier: String,
    /// Bounded to [0, 1].
    pub trust_level: f64,
    pub owners: Vec<String>,
    pub policies: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Invariant: `status=quarantined` implies no new events accepted.
    pub fn accepts_events(&self) -> bool {
        self.status != AgentStatus::Quarantined
    }
}

/// Source platform of an inbound workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowSource {
    Zapier,
    N8n,
    Make,
    Airflow,
    Internal,
}

impl std::fmt::Display for WorkflowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Zapier => "zapier",
            Self::N8n => "n8n",
            Self::Make => "make",
            Self::Airflow => "airflow",
            Self::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for WorkflowSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zapier" => Ok(Self::Zapier),
            "n8n" => Ok(Self::N8n),
            "make" => Ok(Self::Make),
            "airflow" => Ok(Self::Airflow),
            "internal" => Ok(Self::Internal),
            other => Err(format!("unknown workflow source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub source: WorkflowSource,
    pub trigger: String,
    pub status: String,
    pub last_run_at: DateTime<Utc>,
}

/// Classification of a canonical event's sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

/// Provenance block of a canonical event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSourceInfo {
    pub adapter: String,
    pub agent_id: Option<String>,
    pub integration_type: Option<String>,
    pub region: Option<String>,
}

/// Tenant/session metadata block of a canonical event.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventMetadata {
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

/// Security block of a canonical event.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventSecurity {
    pub signature: Option<String>,
    pub signature_algorithm: Option<String>,
    pub classification: Option<Classification>,
    pub requires_encryption: Option<bool>,
}

/// Distributed-tracing linkage of a canonical event.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventTelemetryLinks {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
}

/// The canonical, normalized in-store representation of any inbound webhook.
///
/// §6 EXTERNAL INTERFACES fixes this shape; every adapter normalizer in
/// `agentkern-adapters` produces one of these regardless of source format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub event_id: Uuid,
    pub correlation_id: String,
    pub causation_id: Option<String>,
    pub event_type: String,
    pub source: EventSourceInfo,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
    pub data: serde_json::Value,
    pub metadata: EventMetadata,
    pub security: EventSecurity,
    pub error: Option<String>,
    pub telemetry: EventTelemetryLinks,
    /// Idempotency key this event was stored under; unique per `(tenant_id, env)`.
    pub idempotency_key: String,
    pub workflow_id: Option<String>,
}

impl CanonicalEvent {
    /// Payload size must be <= 1 MiB (§3 invariant).
    pub fn payload_within_limit(&self) -> bool {
        const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
        serde_json::to_vec(&self.data)
            .map(|bytes| bytes.len() <= MAX_PAYLOAD_BYTES)
            .unwrap_or(false)
    }
}

/// Per-agent telemetry sample. Finite, monotonically time-ordered per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub agent_id: String,
    pub ts: DateTime<Utc>,
    pub latency_ms: f64,
    pub errors: u64,
    pub policy_violations: u64,
    pub success_count: u64,
    pub uptime_pct: f64,
}

/// Category of anomaly the detector (C9) can raise against a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Drift,
    Regression,
    Spike,
    SlaBreach,
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Drift => "drift",
            Self::Regression => "regression",
            Self::Spike => "spike",
            Self::SlaBreach => "sla_breach",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AnomalyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drift" => Ok(Self::Drift),
            "regression" => Ok(Self::Regression),
            "spike" => Ok(Self::Spike),
            "sla_breach" => Ok(Self::SlaBreach),
            other => Err(format!("unknown anomaly type: {other}")),
        }
    }
}

/// Per §4.9: "Drift: z-score >= 3 -> medium; >= 4 -> high; >= 5 -> critical."
/// and similar tiered thresholds for regression/spike/SLA breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AnomalySeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown anomaly severity: {other}")),
        }
    }
}

/// A single detected anomaly, appended atomically to the ledger (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub tenant_id: String,
    pub env: String,
    pub metric_name: String,
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub observed_value: f64,
    pub baseline_value: f64,
    pub message: String,
    pub detected_at: DateTime<Utc>,
}

/// Statistical baseline for a metric, refreshed nightly from telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub tenant_id: String,
    pub env: String,
    pub metric_name: String,
    pub mean: f64,
    pub stddev: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub sample_count: u64,
}

/// Point-in-time KPI snapshot (one row per `(ts, tenant_id)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub ts: DateTime<Utc>,
    pub tenant_id: String,
    pub trust_score: f64,
    pub risk_avoided_usd: f64,
    pub sync_freshness_pct: f64,
    pub drift_rate_pct: f64,
    pub compliance_sla_pct: f64,
    pub active_agents: u64,
    pub active_workflows: u64,
    pub total_events: u64,
}

/// Outcome tag of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionTag {
    Allow,
    AllowWithModifications,
    Deny,
}

/// A single rule's contribution to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolationDetail {
    pub policy_id: String,
    pub rule_id: String,
    pub message: String,
}

/// Structured output of the Policy Enforcement Engine (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub request_id: String,
    pub decision: DecisionTag,
    pub policy_violations: Vec<PolicyViolationDetail>,
    pub modifications: HashMap<String, serde_json::Value>,
    pub warnings: Vec<String>,
    pub policies_evaluated: Vec<String>,
    pub execution_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarantined_agent_rejects_events() {
        let agent = Agent {
            id: "a1".into(),
            tenant_id: "acme".into(),
            agent_type: "llm".into(),
            vendor: "openai".into(),
            model: "gpt-4".into(),
            status: AgentStatus::Quarantined,
            compliance_tier: "standard".into(),
            trust_level: 0.5,
            owners: vec![],
            policies: vec![],
            updated_at: Utc::now(),
        };
        assert!(!agent.accepts_events());
    }

    #[test]
    fn workflow_source_round_trips_through_display_and_parse() {
        for s in [
            WorkflowSource::Zapier,
            WorkflowSource::N8n,
            WorkflowSource::Make,
            WorkflowSource::Airflow,
            WorkflowSource::Internal,
        ] {
            let rendered = s.to_string();
            let parsed: WorkflowSource = rendered.parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn payload_within_limit_rejects_oversized_data() {
        let big = serde_json::Value::String("x".repeat(2 * 1024 * 1024));
        let event = CanonicalEvent {
            event_id: Uuid::new_v4(),
            correlation_id: "corr-1".into(),
            causation_id: None,
            event_type: "test".into(),
            source: EventSourceInfo {
                adapter: "zapier".into(),
                agent_id: None,
                integration_type: None,
                region: None,
            },
            timestamp: Utc::now(),
            version: 1,
            data: big,
            metadata: EventMetadata::default(),
            security: EventSecurity::default(),
            error: None,
            telemetry: EventTelemetryLinks::default(),
            idempotency_key: "key".into(),
            workflow_id: None,
        };
        assert!(!event.payload_within_limit());
    }
}
