//! AgentKern Control Plane: Secrets Bridge (C3)
//!
//! Uniform accessor over a provider chain (KMS/vault → environment) with a
//! TTL cache and in-memory access audit counters.

pub mod bridge;
pub mod provider;

pub use bridge::{AccessAudit, SecretsBridge};
pub use provider::{EnvProvider, SecretProvider, StaticProvider};
