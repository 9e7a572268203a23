//! AgentKern Control Plane: Policy Enforcement Engine (C6)

pub mod engine;
pub mod explain;
pub mod rate_limit;
pub mod types;

pub use engine::{PolicyContext, PolicyEngine, PolicyRequest};
pub use explain::explain;
pub use rate_limit::RateLimiter;
pub use types::{default_content_safety_categories, default_prompt_injection_patterns, Enforcement, PolicyRecord, RuleSpec};
