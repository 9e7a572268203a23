//! AgentKern Control Plane: Common
//!
//! Shared tenant context, canonical event model, and error taxonomy used by
//! every other component of the control plane (C1–C12). Kept dependency-light
//! and free of I/O so it can sit underneath the store, policy, adapter, and
//! telemetry crates without creating cycles.

pub mod error;
pub mod event;
pub mod tenant;

pub use error::{ControlPlaneError, Result};
pub use event::{
    Agent, AgentStatus, Anomaly, AnomalySeverity, AnomalyType, Baseline, CanonicalEvent,
    Classification, Decision, DecisionTag, EventMetadata, EventSecurity, EventSourceInfo,
    EventTelemetryLinks, MetricSnapshot, PolicyViolationDetail, TelemetryRecord, Workflow,
    WorkflowSource,
};
pub use tenant::{Env, TenantContext, TenantId, TenantScoped};

/// Operator identity the self-healing controller (C11) attributes its own
/// quarantine opens/releases to. Shared with the trust engine (C10), which
/// reads it back to compute the Self-Resolution Ratio KPI.
pub const SELFHEAL_OPERATOR: &str = "self-heal-controller";
