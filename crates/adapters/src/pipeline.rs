//! Adapter Runtime pipeline (C7).
//!
//! Per §4.7: the uniform middleware sequence every webhook endpoint runs:
//! verify signature -> freshness -> idempotency -> policy -> execute
//! (circuit breaker + retry) -> record or compensate.

use agentkern_common::{CanonicalEvent, ControlPlaneError, DecisionTag, Result, TenantContext};
use agentkern_policy::{PolicyContext, PolicyEngine, PolicyRecord, PolicyRequest};
use agentkern_resilience::{retry_with_backoff, CircuitBreaker, RetryConfig};
use agentkern_store::{derive_key, DeadLetterQueue, IdempotencyService};
use agentkern_telemetry::{BatchWriter, TelemetryItem};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

use crate::normalizer::{apply_decision_modifications, normalizer_for, RawWebhook};
use crate::saga::SagaRegistry;
use crate::signature::{verify, verify_freshness};
use crate::state_machine::{RequestLifecycle, RequestState};

pub struct WebhookEnvelope {
    pub source: agentkern_common::WorkflowSource,
    /// Raw request body exactly as received, unaltered. Per §6 the HMAC and
    /// the idempotency key derivation (when no key is supplied) both run
    /// over these bytes, never over a re-serialized form of `body`.
    pub body_bytes: Vec<u8>,
    pub body: serde_json::Value,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub idempotency_key: Option<String>,
    pub task_id: String,
    pub execution_id: String,
}

pub struct AdapterPipeline {
    idempotency: IdempotencyService,
    dlq: DeadLetterQueue,
    saga: SagaRegistry,
    policy_engine: PolicyEngine,
    breaker: Arc<CircuitBreaker>,
    retry_config: RetryConfig,
    telemetry: Arc<BatchWriter>,
}

impl AdapterPipeline {
    pub fn new(idempotency: IdempotencyService, dlq: DeadLetterQueue, breaker: Arc<CircuitBreaker>, telemetry: Arc<BatchWriter>) -> Self {
        Self {
            idempotency,
            dlq,
            saga: SagaRegistry::new(),
            policy_engine: PolicyEngine::new(),
            breaker,
            retry_config: RetryConfig::default(),
            telemetry,
        }
    }

    pub fn saga(&self) -> &SagaRegistry {
        &self.saga
    }

    /// Run the full pipeline for one inbound webhook. `execute` performs the
    /// adapter-specific side effect once policy has cleared the event;
    /// `is_quarantined` is consulted right before execution.
    #[allow(clippy::too_many_arguments)]
    pub async fn process<E, Fut>(
        &self,
        tenant: &TenantContext,
        envelope: WebhookEnvelope,
        secret: &str,
        policies: &[PolicyRecord],
        is_quarantined: impl Fn() -> bool,
        execute: E,
    ) -> Result<serde_json::Value>
    where
        E: Fn(CanonicalEvent) -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        let mut lifecycle = RequestLifecycle::default();

        verify(secret, &envelope.body_bytes, &envelope.signature)?;
        verify_freshness(envelope.timestamp, Utc::now())?;
        lifecycle.advance(RequestState::Verified).map_err(ControlPlaneError::Internal)?;

        let idempotency_key = match &envelope.idempotency_key {
            Some(key) => key.clone(),
            None => derive_key(&envelope.source.to_string(), &envelope.task_id, &envelope.execution_id, &envelope.body)?,
        };

        if let Some(existing) = self.idempotency.check(&tenant.tenant_id, &tenant.env.to_string(), &idempotency_key).await? {
            tracing::info!(correlation_id = %envelope.correlation_id, idempotency_key = %idempotency_key, "idempotent replay, bypassing side effects");
            return Ok(existing.result);
        }
        lifecycle.advance(RequestState::Deduplicated).map_err(ControlPlaneError::Internal)?;

        let raw = RawWebhook {
            source: envelope.source,
            tenant_id: &tenant.tenant_id,
            correlation_id: &envelope.correlation_id,
            idempotency_key: &idempotency_key,
            body: &envelope.body,
        };
        let mut event = normalizer_for(envelope.source).normalize(&raw)?;

        let policy_request = PolicyRequest {
            prompt: event.data.get("prompt").and_then(|v| v.as_str()).map(str::to_string),
            action: Some(event.event_type.clone()),
            fields: Default::default(),
        };
        let policy_context = PolicyContext {
            authenticated: true,
            user_id: tenant.user_id.clone().unwrap_or_else(|| "adapter".to_string()),
            role: tenant.role.clone().unwrap_or_else(|| "*".to_string()),
            tenant_id: tenant.tenant_id.clone(),
            env: tenant.env.to_string(),
        };
        let decision = self.policy_engine.evaluate(&envelope.correlation_id, &policy_request, &policy_context, policies)?;
        if decision.decision == DecisionTag::Deny {
            return Err(ControlPlaneError::PolicyViolation(
                decision.policy_violations.first().map(|v| v.message.clone()).unwrap_or_else(|| "policy denied request".to_string()),
            ));
        }
        apply_decision_modifications(&mut event, &decision);
        lifecycle.advance(RequestState::PolicyCleared).map_err(ControlPlaneError::Internal)?;

        lifecycle.advance(RequestState::Executing).map_err(ControlPlaneError::Internal)?;

        // Quarantine cancellation: the tenant entered quarantine mid-flight.
        // Per §4.7 this still transitions `executing` to a failed terminal,
        // still emits the `*_failed` telemetry record, but skips
        // compensation and carries a `Quarantined` error distinct from a
        // policy denial.
        let quarantined = is_quarantined();

        let started_at = std::time::Instant::now();
        let result = if quarantined {
            Err(ControlPlaneError::Quarantined(tenant.tenant_id.clone()))
        } else {
            let breaker = self.breaker.clone();
            let event = event.clone();
            retry_with_backoff(&self.retry_config, move || {
                let event = event.clone();
                let execute = &execute;
                let breaker = breaker.clone();
                async move {
                    if !breaker.allow_request() {
                        return Err(ControlPlaneError::Transient("circuit open".into()));
                    }
                    match execute(event).await {
                        Ok(value) => {
                            breaker.record_success();
                            Ok(value)
                        }
                        Err(err) => {
                            breaker.record_failure();
                            Err(err)
                        }
                    }
                }
            })
            .await
        };

        let latency_ms = started_at.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(value) => {
                lifecycle.advance(RequestState::Succeeded).map_err(ControlPlaneError::Internal)?;
                self.idempotency
                    .store(&tenant.tenant_id, &tenant.env.to_string(), &idempotency_key, &value, agentkern_store::DEFAULT_TTL)
                    .await?;
                self.saga.clear(&envelope.correlation_id);
                self.telemetry.enqueue(TelemetryItem::Trace {
                    tenant_id: tenant.tenant_id.clone(),
                    env: tenant.env.to_string(),
                    record: agentkern_common::TelemetryRecord {
                        agent_id: event.source.agent_id.clone().unwrap_or_else(|| event.source.adapter.clone()),
                        ts: Utc::now(),
                        latency_ms,
                        errors: 0,
                        policy_violations: 0,
                        success_count: 1,
                        uptime_pct: 100.0,
                    },
                });
                Ok(value)
            }
            Err(err) => {
                lifecycle.advance(RequestState::Failed).map_err(ControlPlaneError::Internal)?;
                self.telemetry.enqueue(TelemetryItem::Trace {
                    tenant_id: tenant.tenant_id.clone(),
                    env: tenant.env.to_string(),
                    record: agentkern_common::TelemetryRecord {
                        agent_id: event.source.agent_id.clone().unwrap_or_else(|| event.source.adapter.clone()),
                        ts: Utc::now(),
                        latency_ms,
                        errors: 1,
                        policy_violations: 0,
                        success_count: 0,
                        uptime_pct: 0.0,
                    },
                });
                if !quarantined && self.saga.has_steps(&envelope.correlation_id) {
                    lifecycle.advance(RequestState::Compensating).map_err(ControlPlaneError::Internal)?;
                    let failures = self.saga.compensate(&envelope.correlation_id).await;
                    for (task_id, compensate_err) in failures {
                        self.dlq
                            .push(&tenant.tenant_id, &tenant.env.to_string(), &envelope.source.to_string(), &envelope.body, &format!("compensation failed for {task_id}: {compensate_err}"), &envelope.correlation_id)
                            .await?;
                    }
                    lifecycle.advance(RequestState::Compensated).map_err(ControlPlaneError::Internal)?;
                }
                self.dlq
                    .push(&tenant.tenant_id, &tenant.env.to_string(), &envelope.source.to_string(), &envelope.body, &err.to_string(), &envelope.correlation_id)
                    .await?;
                Err(err)
            }
        }
    }
}
