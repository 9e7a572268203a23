//! Signature verification and replay defense.
//!
//! Per §4.7: "Signature verification: HMAC-SHA256 over the canonicalized
//! payload and headers using a shared secret from C3; constant-time
//! comparison. On failure: 401, no side effect." and "Timestamp freshness:
//! request timestamp must be within +/-5 minutes (replay defense)." Per §6,
//! `x-signature` is `base64url(HMAC-SHA256(secret, body))`, computed over
//! the raw request body bytes exactly as received.

use agentkern_common::{ControlPlaneError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const FRESHNESS_WINDOW: Duration = Duration::minutes(5);

/// Compute the expected signature over the raw `body` bytes with `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ControlPlaneError::Internal(format!("invalid hmac key: {e}")))?;
    mac.update(body);
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Verify `provided_signature` (base64url, no padding) against
/// `HMAC-SHA256(secret, body)` using a constant-time comparison to avoid
/// timing side channels.
pub fn verify(secret: &str, body: &[u8], provided_signature: &str) -> Result<()> {
    let expected = sign(secret, body)?;
    let expected_bytes = expected.as_bytes();
    let provided_bytes = provided_signature.as_bytes();

    if expected_bytes.len() != provided_bytes.len() || expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
        return Err(ControlPlaneError::Authentication("signature mismatch".into()));
    }
    Ok(())
}

/// Verify the request timestamp falls within the freshness window of `now`.
pub fn verify_freshness(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    let delta = (now - timestamp).abs();
    if delta > FRESHNESS_WINDOW {
        return Err(ControlPlaneError::Authentication(format!("timestamp outside freshness window: {delta}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_signature() {
        let secret = "shared-secret";
        let body = b"{\"hello\":\"world\"}";
        let signature = sign(secret, body).unwrap();
        assert!(verify(secret, body, &signature).is_ok());
    }

    #[test]
    fn verify_rejects_mutated_body() {
        let secret = "shared-secret";
        let body = b"{\"hello\":\"world\"}";
        let signature = sign(secret, body).unwrap();
        let mutated = b"{\"hello\":\"worle\"}";
        assert!(verify(secret, mutated, &signature).is_err());
    }

    #[test]
    fn freshness_rejects_stale_timestamp() {
        let now = Utc::now();
        let stale = now - Duration::minutes(10);
        assert!(verify_freshness(stale, now).is_err());
    }

    #[test]
    fn freshness_accepts_within_window() {
        let now = Utc::now();
        let recent = now - Duration::minutes(2);
        assert!(verify_freshness(recent, now).is_ok());
    }
}
