//! Structured logging initialization.
//!
//! Per §4.0/§6: logs are emitted as JSON with `RUST_LOG`-driven filtering and
//! a `LOG_FORMAT` switch (`json` default, `pretty` for local development).
//! Every log line carries `correlation_id` and `tenant_id` when available, via
//! `tracing`'s span fields rather than ambient globals.

use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output shape for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match env::var("LOG_FORMAT").as_deref() {
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Install the global `tracing` subscriber. Idempotent: safe to call once at
/// process start; a second call is a no-op (returns the already-set error
/// silently, matching `tracing`'s own guidance for test harnesses).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match LogFormat::from_env() {
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true).with_target(true)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_target(true)).try_init(),
    };

    if let Err(err) = result {
        eprintln!("logging already initialized: {err}");
    }
}

/// Span carrying the fields every log line in a request's lifetime should
/// inherit: correlation id, tenant scope, and the originating service name.
#[macro_export]
macro_rules! request_span {
    ($service:expr, $correlation_id:expr, $tenant_id:expr) => {
        tracing::info_span!(
            "request",
            service = $service,
            correlation_id = %$correlation_id,
            tenant_id = %$tenant_id,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_json() {
        // SAFETY: test-only, single-threaded within this test, no concurrent env access.
        unsafe {
            env::remove_var("LOG_FORMAT");
        }
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
    }

    #[test]
    fn log_format_honors_pretty_override() {
        unsafe {
            env::set_var("LOG_FORMAT", "pretty");
        }
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
        unsafe {
            env::remove_var("LOG_FORMAT");
        }
    }
}
