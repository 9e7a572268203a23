//! Correlation identifier propagation.
//!
//! Per §4.2: "Each inbound request obtains a correlation identifier (from
//! header `x-correlation-id` if present and well-formed, else freshly
//! generated). The identifier MUST flow across all suspension points."

const MAX_LEN: usize = 128;

/// Header name the adapter runtime reads the correlation identifier from.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Well-formed: opaque ASCII, non-empty, at most 128 bytes, no control
/// characters (so it is safe to echo back into logs and response headers).
pub fn is_well_formed(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_LEN
        && value.is_ascii()
        && value.chars().all(|c| !c.is_control())
}

/// Resolve the correlation identifier for an inbound request: the header
/// value if well-formed, otherwise a freshly generated UUIDv4.
pub fn resolve(header_value: Option<&str>) -> String {
    match header_value {
        Some(v) if is_well_formed(v) => v.to_string(),
        _ => generate(),
    }
}

/// Generate a fresh correlation identifier.
pub fn generate() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wellformed_header_value() {
        let resolved = resolve(Some("abc-123"));
        assert_eq!(resolved, "abc-123");
    }

    #[test]
    fn generates_when_absent() {
        let resolved = resolve(None);
        assert!(uuid::Uuid::parse_str(&resolved).is_ok());
    }

    #[test]
    fn generates_when_malformed() {
        let too_long = "x".repeat(200);
        let resolved = resolve(Some(&too_long));
        assert_ne!(resolved, too_long);

        let with_control_char = "abc\ndef";
        let resolved = resolve(Some(with_control_char));
        assert_ne!(resolved, with_control_char);

        let resolved_empty = resolve(Some(""));
        assert!(!resolved_empty.is_empty());
    }
}
