//! PII redaction.
//!
//! Per §4.2: "A PII redactor runs before any record is emitted, matching (at
//! minimum) email, phone, SSN, card, IPv4, API key / bearer token, and
//! password assignment patterns, replacing them with a mode of
//! `mask|hash|remove`. Sensitive field names... are always redacted
//! regardless of content."

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// How a matched span is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionMode {
    /// Replace with a fixed placeholder token.
    Mask,
    /// Replace with a short, non-reversible digest (useful for correlating
    /// repeated occurrences of the same value without storing it).
    Hash,
    /// Drop the matched span entirely.
    Remove,
}

struct Pattern {
    name: &'static str,
    regex: Regex,
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        Pattern {
            name: "email",
            regex: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
        },
        Pattern {
            name: "ssn",
            regex: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
        },
        Pattern {
            name: "card",
            regex: Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap(),
        },
        Pattern {
            name: "phone",
            regex: Regex::new(r"\b(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").unwrap(),
        },
        Pattern {
            name: "ipv4",
            regex: Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b").unwrap(),
        },
        Pattern {
            name: "api_key",
            regex: Regex::new(r"(?i)\b(?:bearer\s+[a-z0-9._-]{10,}|sk-[a-z0-9]{10,}|[a-z0-9]{32,})\b").unwrap(),
        },
        Pattern {
            name: "password",
            regex: Regex::new(r#"(?i)(password|passwd|pwd)\s*[:=]\s*\S+"#).unwrap(),
        },
    ]
});

/// Field names that are always redacted, regardless of whether their value
/// matches a content pattern.
const SENSITIVE_FIELD_NAMES: &[&str] = &[
    "password", "passwd", "secret", "api_key", "apikey", "token", "access_token",
    "refresh_token", "private_key", "client_secret", "authorization",
];

pub struct Redactor {
    mode: RedactionMode,
}

impl Default for Redactor {
    fn default() -> Self {
        Self { mode: RedactionMode::Mask }
    }
}

impl Redactor {
    pub fn new(mode: RedactionMode) -> Self {
        Self { mode }
    }

    fn replacement(&self, matched: &str, kind: &str) -> String {
        match self.mode {
            RedactionMode::Mask => format!("[REDACTED-{}]", kind.to_uppercase()),
            RedactionMode::Hash => {
                let mut hasher = Sha256::new();
                hasher.update(matched.as_bytes());
                let digest = hasher.finalize();
                // Truncated digest: enough to correlate repeats, not enough to brute-force back.
                format!("[HASH-{}:{:x}]", kind, &digest[..8])
            }
            RedactionMode::Remove => String::new(),
        }
    }

    /// Redact all recognized PII patterns within free text.
    pub fn redact_text(&self, input: &str) -> String {
        let mut output = input.to_string();
        for pattern in PATTERNS.iter() {
            output = pattern
                .regex
                .replace_all(&output, |caps: &regex::Captures| {
                    self.replacement(&caps[0], pattern.name)
                })
                .into_owned();
        }
        output
    }

    /// Recursively redact a JSON value: sensitive field names are always
    /// scrubbed regardless of content; string leaves are scanned for PII
    /// patterns.
    pub fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    if is_sensitive_field(k) {
                        out.insert(k.clone(), Value::String(self.replacement(k, "field")));
                    } else {
                        out.insert(k.clone(), self.redact_value(v));
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact_value(v)).collect()),
            Value::String(s) => Value::String(self.redact_text(s)),
            other => other.clone(),
        }
    }
}

fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_FIELD_NAMES.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_and_ssn() {
        let redactor = Redactor::default();
        let text = "My SSN is 123-45-6789 and email is john.doe@example.com";
        let redacted = redactor.redact_text(text);
        assert!(redacted.contains("[REDACTED-SSN]"));
        assert!(redacted.contains("[REDACTED-EMAIL]"));
        assert!(!redacted.contains("123-45-6789"));
        assert!(!redacted.contains("john.doe@example.com"));
    }

    #[test]
    fn always_redacts_sensitive_field_names() {
        let redactor = Redactor::default();
        let value = serde_json::json!({ "api_key": "nonmatching-short", "note": "hello" });
        let redacted = redactor.redact_value(&value);
        assert_eq!(redacted["api_key"], serde_json::json!("[REDACTED-FIELD]"));
        assert_eq!(redacted["note"], serde_json::json!("hello"));
    }

    #[test]
    fn remove_mode_drops_matches() {
        let redactor = Redactor::new(RedactionMode::Remove);
        let redacted = redactor.redact_text("ssn 123-45-6789 end");
        assert_eq!(redacted, "ssn  end");
    }

    #[test]
    fn hash_mode_is_deterministic_and_nonreversible() {
        let redactor = Redactor::new(RedactionMode::Hash);
        let a = redactor.redact_text("123-45-6789");
        let b = redactor.redact_text("123-45-6789");
        assert_eq!(a, b);
        assert!(!a.contains("123-45-6789"));
    }
}
