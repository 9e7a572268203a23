//! Secret providers.
//!
//! Per §4.3: "Lookup order: configured provider (KMS/vault) → environment."
//! `SecretProvider` is the seam a KMS/vault integration plugs into; only the
//! environment-variable provider ships here, matching the teacher's "no
//! fabricated vendor SDKs" convention (`mtls.rs` keeps CRL/OCSP as URLs, not
//! client libraries, for the same reason).

use async_trait::async_trait;
use std::env;

#[async_trait]
pub trait SecretProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, key: &str) -> Option<String>;
}

/// Reads secrets from process environment variables.
pub struct EnvProvider;

#[async_trait]
impl SecretProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn fetch(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// Placeholder seam for a KMS/vault-backed provider. Concrete deployments
/// supply their own implementation; this crate ships only the contract.
pub struct StaticProvider {
    name: &'static str,
    values: std::collections::HashMap<String, String>,
}

impl StaticProvider {
    pub fn new(name: &'static str, values: std::collections::HashMap<String, String>) -> Self {
        Self { name, values }
    }
}

#[async_trait]
impl SecretProvider for StaticProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
