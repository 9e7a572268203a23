//! Shared error taxonomy.
//!
//! Per ERROR HANDLING DESIGN: every component returns a value convertible
//! into this taxonomy so the HTTP boundary has one place to map errors to
//! the stable 4xx/5xx envelope. Never throws for a detected policy
//! violation — that is a structured `Decision`, not an `Err`.

use thiserror::Error;

/// The error taxonomy shared across every control-plane component.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("authorization denied: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("tenant quarantined: {0}")]
    Quarantined(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("external dependency error ({status}): {message}")]
    External { status: u16, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlPlaneError {
    /// Whether a caller may legitimately retry this error.
    ///
    /// Per §7: `Transient/Timeout/External(5xx)` are retryable;
    /// `Configuration` never is; everything else is a terminal 4xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient(_) | Self::Timeout(_) => true,
            Self::External { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Stable machine-readable error code for the 4xx/5xx envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Authentication(_) => "authentication_error",
            Self::Authorization(_) => "authorization_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::PolicyViolation(_) => "policy_violation",
            Self::Quarantined(_) => "quarantined",
            Self::RateLimit(_) => "rate_limit_exceeded",
            Self::Timeout(_) => "timeout",
            Self::Transient(_) => "transient_error",
            Self::External { .. } => "external_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status this error maps to. 5xx responses are redacted by the
    /// caller before being written to the wire (§7).
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Authentication(_) => 401,
            Self::Authorization(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::PolicyViolation(_) => 403,
            Self::Quarantined(_) => 403,
            Self::RateLimit(_) => 429,
            Self::Timeout(_) => 504,
            Self::Transient(_) => 503,
            Self::External { status, .. } => *status,
            Self::Configuration(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlPlaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_and_timeout_are_retryable() {
        assert!(ControlPlaneError::Transient("db gone".into()).is_retryable());
        assert!(ControlPlaneError::Timeout("db query".into()).is_retryable());
    }

    #[test]
    fn external_retryable_only_on_5xx() {
        assert!(ControlPlaneError::External { status: 503, message: "x".into() }.is_retryable());
        assert!(!ControlPlaneError::External { status: 404, message: "x".into() }.is_retryable());
    }

    #[test]
    fn configuration_never_retryable() {
        assert!(!ControlPlaneError::Configuration("missing DATABASE_URL".into()).is_retryable());
    }

    #[test]
    fn policy_violation_maps_to_403() {
        assert_eq!(ControlPlaneError::PolicyViolation("deny".into()).status_code(), 403);
    }

    #[test]
    fn quarantined_is_distinct_from_policy_violation() {
        let quarantined = ControlPlaneError::Quarantined("acme".into());
        assert_eq!(quarantined.code(), "quarantined");
        assert_ne!(quarantined.code(), ControlPlaneError::PolicyViolation("deny".into()).code());
        assert!(!quarantined.is_retryable());
    }
}
