//! Declarative policy rule records.
//!
//! Per DESIGN NOTES: "Policy DSL as an object literal executed by the
//! engine: replaced by declarative rule records stored in C1 with a
//! versioned schema; rule evaluation is a pure function of
//! `(rule, request, context)`." Each rule carries a typed, structured
//! matcher instead of an expression string the engine would otherwise eval.

use serde::{Deserialize, Serialize};

/// Per §3: "Policy rule: (id, name, version, type, enabled,
/// enforcement ∈ {blocking, logging, advisory}, rules JSON)."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: String,
    pub name: String,
    pub version: u32,
    pub enabled: bool,
    pub enforcement: Enforcement,
    pub rules: Vec<RuleSpec>,
}

impl PolicyRecord {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    Blocking,
    Logging,
    Advisory,
}

/// A single declarative matcher. One `PolicyRecord` composes several; the
/// engine runs each kind in the fixed order §4.6 mandates, never all of
/// them against every rule set indiscriminately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// RBAC: `role` must contain `required_action` (`*` is wildcard).
    Rbac { required_action: String },
    /// Token-bucket / fixed-window rate limit, keyed by `(user_id, policy)`.
    RateLimit { capacity_per_minute: u32 },
    /// Pattern set match against free-text request fields.
    PromptInjection { patterns: Vec<String> },
    /// Category + lexical pattern content-safety filter.
    ContentSafety { categories: Vec<String>, patterns: Vec<String> },
    /// PII redaction; modifies the request rather than blocking it.
    PiiRedaction,
}

impl RuleSpec {
    pub fn rule_id(&self) -> &'static str {
        match self {
            Self::Rbac { .. } => "rbac",
            Self::RateLimit { .. } => "rate-limit-per-user",
            Self::PromptInjection { .. } => "prompt-injection-detection",
            Self::ContentSafety { .. } => "content-safety",
            Self::PiiRedaction => "pii-redaction",
        }
    }
}

/// Default prompt-injection pattern set (§4.6: "ignore previous",
/// "reveal system prompt", …).
pub fn default_prompt_injection_patterns() -> Vec<String> {
    vec![
        "ignore previous".to_string(),
        "ignore all previous".to_string(),
        "disregard previous instructions".to_string(),
        "reveal system prompt".to_string(),
        "reveal your instructions".to_string(),
        "you are now in developer mode".to_string(),
    ]
}

pub fn default_content_safety_categories() -> Vec<String> {
    vec!["violence".to_string(), "self_harm".to_string(), "weapons".to_string(), "csam".to_string()]
}
