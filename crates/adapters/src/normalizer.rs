//! Per-source normalization into the canonical event.
//!
//! Per §2/§4.7: each adapter normalizes its source-specific webhook body into
//! the canonical event shape fixed by §6. `AdapterNormalizer` is the concrete
//! seam left abstract upstream; one implementation per named source plus a
//! generic `internal` fallback.

use agentkern_common::{
    CanonicalEvent, ControlPlaneError, Decision, EventMetadata, EventSecurity, EventSourceInfo, EventTelemetryLinks, Result,
    WorkflowSource,
};
use chrono::Utc;
use uuid::Uuid;

/// Raw inbound webhook material, already past signature/timestamp checks.
pub struct RawWebhook<'a> {
    pub source: WorkflowSource,
    pub tenant_id: &'a str,
    pub correlation_id: &'a str,
    pub idempotency_key: &'a str,
    pub body: &'a serde_json::Value,
}

pub trait AdapterNormalizer: Send + Sync {
    fn source(&self) -> WorkflowSource;

    fn normalize(&self, raw: &RawWebhook<'_>) -> Result<CanonicalEvent>;
}

fn base_event(raw: &RawWebhook<'_>, event_type: String, agent_id: Option<String>, workflow_id: Option<String>) -> CanonicalEvent {
    CanonicalEvent {
        event_id: Uuid::new_v4(),
        correlation_id: raw.correlation_id.to_string(),
        causation_id: None,
        event_type,
        source: EventSourceInfo { adapter: raw.source.to_string(), agent_id, integration_type: None, region: None },
        timestamp: Utc::now(),
        version: 1,
        data: raw.body.clone(),
        metadata: EventMetadata { tenant_id: raw.tenant_id.to_string(), ..Default::default() },
        security: EventSecurity::default(),
        error: None,
        telemetry: EventTelemetryLinks::default(),
        idempotency_key: raw.idempotency_key.to_string(),
        workflow_id,
    }
}

fn field_str<'a>(body: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(|v| v.as_str())
}

pub struct ZapierNormalizer;
impl AdapterNormalizer for ZapierNormalizer {
    fn source(&self) -> WorkflowSource {
        WorkflowSource::Zapier
    }

    fn normalize(&self, raw: &RawWebhook<'_>) -> Result<CanonicalEvent> {
        let event_type = field_str(raw.body, "event").unwrap_or("zap.triggered").to_string();
        let workflow_id = field_str(raw.body, "zap_id").map(str::to_string);
        Ok(base_event(raw, event_type, None, workflow_id))
    }
}

pub struct N8nNormalizer;
impl AdapterNormalizer for N8nNormalizer {
    fn source(&self) -> WorkflowSource {
        WorkflowSource::N8n
    }

    fn normalize(&self, raw: &RawWebhook<'_>) -> Result<CanonicalEvent> {
        let event_type = field_str(raw.body, "workflowEvent").unwrap_or("workflow.executed").to_string();
        let workflow_id = field_str(raw.body, "workflowId").map(str::to_string);
        Ok(base_event(raw, event_type, None, workflow_id))
    }
}

pub struct MakeNormalizer;
impl AdapterNormalizer for MakeNormalizer {
    fn source(&self) -> WorkflowSource {
        WorkflowSource::Make
    }

    fn normalize(&self, raw: &RawWebhook<'_>) -> Result<CanonicalEvent> {
        let event_type = field_str(raw.body, "scenarioEvent").unwrap_or("scenario.run").to_string();
        let workflow_id = field_str(raw.body, "scenarioId").map(str::to_string);
        Ok(base_event(raw, event_type, None, workflow_id))
    }
}

pub struct AirflowNormalizer;
impl AdapterNormalizer for AirflowNormalizer {
    fn source(&self) -> WorkflowSource {
        WorkflowSource::Airflow
    }

    fn normalize(&self, raw: &RawWebhook<'_>) -> Result<CanonicalEvent> {
        let event_type = field_str(raw.body, "task_state").map(|s| format!("dag.{s}")).unwrap_or_else(|| "dag.event".to_string());
        let workflow_id = field_str(raw.body, "dag_id").map(str::to_string);
        Ok(base_event(raw, event_type, None, workflow_id))
    }
}

pub struct InternalNormalizer;
impl AdapterNormalizer for InternalNormalizer {
    fn source(&self) -> WorkflowSource {
        WorkflowSource::Internal
    }

    fn normalize(&self, raw: &RawWebhook<'_>) -> Result<CanonicalEvent> {
        let event_type = field_str(raw.body, "event_type")
            .ok_or_else(|| ControlPlaneError::Validation("internal events require event_type".into()))?
            .to_string();
        let agent_id = field_str(raw.body, "agent_id").map(str::to_string);
        let workflow_id = field_str(raw.body, "workflow_id").map(str::to_string);
        Ok(base_event(raw, event_type, agent_id, workflow_id))
    }
}

pub fn normalizer_for(source: WorkflowSource) -> Box<dyn AdapterNormalizer> {
    match source {
        WorkflowSource::Zapier => Box::new(ZapierNormalizer),
        WorkflowSource::N8n => Box::new(N8nNormalizer),
        WorkflowSource::Make => Box::new(MakeNormalizer),
        WorkflowSource::Airflow => Box::new(AirflowNormalizer),
        WorkflowSource::Internal => Box::new(InternalNormalizer),
    }
}

/// Apply a policy decision's field modifications back onto the event's data
/// (e.g. a PII-redacted prompt), per §4.6/§4.7 interaction.
pub fn apply_decision_modifications(event: &mut CanonicalEvent, decision: &Decision) {
    if let serde_json::Value::Object(map) = &mut event.data {
        for (field, value) in &decision.modifications {
            map.insert(field.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zapier_normalizer_extracts_zap_id_as_workflow() {
        let body = serde_json::json!({"event": "zap.triggered", "zap_id": "zap-42"});
        let raw = RawWebhook { source: WorkflowSource::Zapier, tenant_id: "acme", correlation_id: "corr-1", idempotency_key: "key-1", body: &body };
        let event = ZapierNormalizer.normalize(&raw).unwrap();
        assert_eq!(event.workflow_id.as_deref(), Some("zap-42"));
        assert_eq!(event.source.adapter, "zapier");
    }

    #[test]
    fn internal_normalizer_requires_event_type() {
        let body = serde_json::json!({});
        let raw = RawWebhook { source: WorkflowSource::Internal, tenant_id: "acme", correlation_id: "corr-1", idempotency_key: "key-1", body: &body };
        assert!(InternalNormalizer.normalize(&raw).is_err());
    }
}
