//! AgentKern Control Plane: Self-Healing Controller (C11)
//!
//! Periodically scans for agents/workflows/breakers stuck beyond their SLO
//! and applies an escalating remediation (§4.11).

pub mod action;
pub mod scanner;

pub use action::{RemediationFinding, RemediationTier, ResourceKind};
pub use scanner::{spawn_scan_loop, SelfHealConfig, SelfHealController};
