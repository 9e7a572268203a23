//! Shared application state handed to every handler.

use agentkern_adapters::AdapterPipeline;
use agentkern_anomaly::AnomalySink;
use agentkern_policy::PolicyRecord;
use agentkern_resilience::CircuitBreakerManager;
use agentkern_secrets::SecretsBridge;
use agentkern_selfheal::SelfHealController;
use agentkern_store::{ContextStore, DeadLetterQueue, QuarantineLedger};
use agentkern_trust::TrustEngine;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<dyn ContextStore>,
    pub dlq: Arc<DeadLetterQueue>,
    pub quarantine: Arc<QuarantineLedger>,
    pub breakers: Arc<CircuitBreakerManager>,
    pub secrets: Arc<SecretsBridge>,
    /// One pipeline per webhook source (§4.7), each with its own breaker and
    /// idempotency/DLQ handle over the shared pool.
    pub adapter_pipelines: HashMap<&'static str, Arc<AdapterPipeline>>,
    pub trust_engine: Arc<TrustEngine>,
    pub selfheal: Arc<SelfHealController>,
    pub anomaly_sinks: Vec<Arc<dyn AnomalySink>>,
    /// Declarative policy set (§3 `PolicyRecord`). Held in memory, not in
    /// `ContextStore`: the store contract covers the entities in §3 that
    /// need optimistic-concurrency writes; policy records are admin-managed
    /// and reloaded whole, the way the teacher's `GateEngine` holds them.
    pub policies: RwLock<Vec<PolicyRecord>>,
    /// API keys authorized to call non-health routes. Loaded once at
    /// startup from `API_KEYS` (comma-separated); never logged.
    pub api_keys: Vec<String>,
}
