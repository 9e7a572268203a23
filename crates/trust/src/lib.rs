//! AgentKern Control Plane: Trust/KPI Engine (C10)
//!
//! Derives the per-tenant KPI bundle (§4.10) from telemetry, anomalies,
//! agents, workflows, DLQ, and quarantine state, and renders it as
//! Markdown/CSV for the reporting surface (C12 `/reports/export`).

pub mod export;
pub mod kpi;
pub mod weights;

pub use export::{to_csv, to_markdown, TrafficLight};
pub use kpi::{KpiBundle, TrustConfig, TrustEngine, DEFAULT_INCIDENT_COST_USD, DEFAULT_SYNC_FRESHNESS_SLO_HOURS, DEFAULT_VIOLATION_COST_USD};
pub use weights::{compute_trust_score, TrustWeights};
