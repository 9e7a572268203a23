//! HTTP surface (C12, §4.12).
//!
//! Route shapes and the `AppState`/`Json`/`StatusCode` handler style are
//! grounded on the teacher's `packages/gate/src/bin/server.rs` and
//! `packages/arbiter/src/bin/server.rs`; the webhook route additionally
//! drives `agentkern_adapters::AdapterPipeline::process` (C7).

use agentkern_adapters::WebhookEnvelope;
use agentkern_common::{ControlPlaneError, Env, TenantContext, WorkflowSource};
use agentkern_policy::PolicyRecord;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Per §4.12: readiness additionally proves the store is reachable, so a
/// load balancer stops routing traffic to an instance that can't serve it.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.store.ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(%err, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn parse_env(raw: &str) -> Result<Env, ApiError> {
    match raw {
        "prod" => Ok(Env::Prod),
        "staging" => Ok(Env::Staging),
        "dev" => Ok(Env::Dev),
        other => Err(ApiError(ControlPlaneError::Validation(format!("unknown env '{other}'")))),
    }
}

#[derive(Deserialize)]
pub struct TenantQuery {
    pub tenant_id: String,
    pub env: String,
}

pub async fn list_agents(State(state): State<Arc<AppState>>, Query(q): Query<TenantQuery>) -> ApiResult<Json<Vec<agentkern_common::Agent>>> {
    parse_env(&q.env)?;
    let agents = state.store.list_agents(&q.tenant_id, &q.env).await?;
    Ok(Json(agents))
}

#[derive(Deserialize)]
pub struct TelemetryQuery {
    pub tenant_id: String,
    pub env: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn agent_telemetry(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Query(q): Query<TelemetryQuery>,
) -> ApiResult<Json<Vec<agentkern_common::TelemetryRecord>>> {
    parse_env(&q.env)?;
    let records = state.store.list_telemetry(&q.tenant_id, &q.env, &agent_id, q.limit).await?;
    Ok(Json(records))
}

#[derive(Deserialize)]
pub struct TrustQuery {
    pub tenant_id: String,
    pub env: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub async fn trust(State(state): State<Arc<AppState>>, Query(q): Query<TrustQuery>) -> ApiResult<Json<agentkern_trust::KpiBundle>> {
    parse_env(&q.env)?;
    let bundle = state.trust_engine.compute_kpi_bundle(&q.tenant_id, &q.env, q.from, q.to).await?;
    Ok(Json(bundle))
}

#[derive(Deserialize)]
pub struct ExportRequest {
    pub tenant_id: String,
    pub env: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub previous_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub previous_to: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Csv,
}

pub async fn export_report(State(state): State<Arc<AppState>>, Json(req): Json<ExportRequest>) -> ApiResult<String> {
    parse_env(&req.env)?;
    let bundle = state.trust_engine.compute_kpi_bundle(&req.tenant_id, &req.env, req.from, req.to).await?;
    match req.format {
        ExportFormat::Csv => agentkern_trust::to_csv(&bundle).map_err(ApiError::from),
        ExportFormat::Markdown => {
            let previous = match (req.previous_from, req.previous_to) {
                (Some(from), Some(to)) => Some(state.trust_engine.compute_kpi_bundle(&req.tenant_id, &req.env, from, to).await?),
                _ => None,
            };
            Ok(agentkern_trust::to_markdown(&bundle, previous.as_ref()))
        }
    }
}

pub async fn list_policies(State(state): State<Arc<AppState>>) -> Json<Vec<PolicyRecord>> {
    Json(state.policies.read().clone())
}

pub async fn register_policy(State(state): State<Arc<AppState>>, Json(record): Json<PolicyRecord>) -> ApiResult<StatusCode> {
    let mut policies = state.policies.write();
    if let Some(existing) = policies.iter_mut().find(|p| p.id == record.id) {
        *existing = record;
    } else {
        policies.push(record);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ReleaseQuarantineRequest {
    pub tenant_id: String,
    pub env: String,
    pub operator: String,
    pub reason: String,
}

pub async fn release_quarantine(State(state): State<Arc<AppState>>, Path(resource_id): Path<String>, Json(req): Json<ReleaseQuarantineRequest>) -> ApiResult<StatusCode> {
    parse_env(&req.env)?;
    state.selfheal.release_quarantine(&req.tenant_id, &req.env, &resource_id, &req.operator, &req.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn metrics(State(state): State<Arc<AppState>>, Query(q): Query<TenantQuery>) -> ApiResult<Json<serde_json::Value>> {
    parse_env(&q.env)?;
    let snapshot = state.store.latest_metric_snapshot(&q.tenant_id).await?;
    let breakers: HashMap<String, &'static str> = state
        .breakers
        .targets()
        .into_iter()
        .map(|target| {
            let breaker_state = state.breakers.get_or_create(&target).state();
            (target, breaker_state_label(breaker_state))
        })
        .collect();
    Ok(Json(serde_json::json!({
        "latest_snapshot": snapshot,
        "breakers": breakers,
    })))
}

fn breaker_state_label(state: agentkern_resilience::BreakerState) -> &'static str {
    match state {
        agentkern_resilience::BreakerState::Closed => "closed",
        agentkern_resilience::BreakerState::Open => "open",
        agentkern_resilience::BreakerState::HalfOpen => "half_open",
    }
}

/// Routing/tenancy metadata for a webhook call. The request body itself is
/// the opaque, unparsed payload the source sends (§6) — it carries no
/// control-plane fields, so this metadata travels as query parameters
/// instead.
#[derive(Deserialize)]
pub struct WebhookMeta {
    pub tenant_id: String,
    pub env: String,
    pub task_id: String,
    pub execution_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

const SIGNATURE_HEADER: &str = "x-signature";
const TIMESTAMP_HEADER: &str = "x-timestamp";
const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

/// Reads a required header as a non-empty string. A missing or malformed
/// value fails the same way an invalid signature does: 401, no side effect.
fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> ApiResult<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError(ControlPlaneError::Authentication(format!("missing or malformed {name} header"))))
}

/// `POST /adapters/{source}/webhook` — runs the full C7 pipeline: verify
/// signature, freshness, idempotency, policy, execute under the breaker,
/// record or compensate.
///
/// Per §6, `x-signature`/`x-timestamp`/`x-idempotency-key` are HTTP headers
/// and the HMAC covers the raw request body exactly as received — so the
/// body is taken as `Bytes`, not deserialized, and signed before any JSON
/// parsing touches it.
pub async fn adapter_webhook(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(meta): Query<WebhookMeta>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let workflow_source = WorkflowSource::from_str(&source).map_err(|e| ApiError(ControlPlaneError::Validation(e)))?;
    let env = parse_env(&meta.env)?;

    let pipeline = state
        .adapter_pipelines
        .get(source.as_str())
        .ok_or_else(|| ApiError(ControlPlaneError::Validation(format!("unknown adapter source '{source}'"))))?
        .clone();

    let correlation_id = agentkern_observability::resolve_correlation_id(
        headers.get(agentkern_observability::CORRELATION_HEADER).and_then(|h| h.to_str().ok()),
    );

    let mut tenant = TenantContext::new(meta.tenant_id.clone(), env, correlation_id.clone());
    if let Some(user_id) = meta.user_id.clone() {
        tenant = tenant.with_user(user_id);
    }
    if let Some(role) = meta.role.clone() {
        tenant = tenant.with_role(role);
    }

    let secret_key = format!("webhook_secret_{source}");
    let secret = state.secrets.get(&secret_key, None).await?;

    let quarantined = state
        .quarantine
        .get(&meta.tenant_id, &meta.env, &meta.tenant_id)
        .await?
        .map(|entry| entry.is_active())
        .unwrap_or(false);

    let signature = required_header(&headers, SIGNATURE_HEADER)?.to_string();
    let timestamp: DateTime<Utc> = required_header(&headers, TIMESTAMP_HEADER)?
        .parse()
        .map_err(|e| ApiError(ControlPlaneError::Authentication(format!("invalid {TIMESTAMP_HEADER} header: {e}"))))?;
    let idempotency_key = headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|h| h.to_str().ok()).filter(|v| !v.is_empty()).map(str::to_string);

    let body_value: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| ApiError(ControlPlaneError::Validation(format!("invalid JSON body: {e}"))))?;

    let envelope = WebhookEnvelope {
        source: workflow_source,
        body_bytes: body.to_vec(),
        body: body_value,
        signature,
        timestamp,
        correlation_id: correlation_id.clone(),
        idempotency_key,
        task_id: meta.task_id,
        execution_id: meta.execution_id,
    };

    let policies = state.policies.read().clone();
    let result = pipeline
        .process(&tenant, envelope, &secret, &policies, || quarantined, |event| async move { Ok(serde_json::to_value(&event).unwrap_or_default()) })
        .await?;

    Ok(Json(serde_json::json!({"correlation_id": correlation_id, "result": result})))
}
