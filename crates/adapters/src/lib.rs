//! AgentKern Control Plane: Adapter Runtime (C7).
//!
//! Per §4.7: signature verification, per-source normalization, the SAGA
//! compensation registry, and the request state machine that together turn
//! an inbound webhook into either a stored canonical event or a DLQ entry.

pub mod normalizer;
pub mod pipeline;
pub mod saga;
pub mod signature;
pub mod state_machine;

pub use normalizer::{
    apply_decision_modifications, normalizer_for, AdapterNormalizer, AirflowNormalizer, InternalNormalizer, MakeNormalizer,
    N8nNormalizer, RawWebhook, ZapierNormalizer,
};
pub use pipeline::{AdapterPipeline, WebhookEnvelope};
pub use saga::{Compensation, SagaRegistry, SagaStep};
pub use signature::{sign, verify, verify_freshness, FRESHNESS_WINDOW};
pub use state_machine::{RequestLifecycle, RequestState};
