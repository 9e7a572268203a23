//! Tenant isolation boundary.
//!
//! Per DATA MODEL: "Every row carries `(tenant_id, env)`; a query lacking
//! both is a programming error." `TenantContext` is the value threaded
//! through every store call and policy evaluation so that invariant is
//! enforced in the type system rather than by convention.

use serde::{Deserialize, Serialize};

/// Tenant identifier.
pub type TenantId = String;

/// Deployment environment. Part of every tenant-scoped key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Prod,
    Staging,
    Dev,
}

impl std::fmt::Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prod => write!(f, "prod"),
            Self::Staging => write!(f, "staging"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// Request-scoped tenant context, carried across every suspension point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub env: Env,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub correlation_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<TenantId>, env: Env, correlation_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            env,
            user_id: None,
            role: None,
            correlation_id: correlation_id.into(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// The `(tenant_id, env)` composite key every store query must compose.
    pub fn scope_key(&self) -> (TenantId, Env) {
        (self.tenant_id.clone(), self.env)
    }
}

/// A value scoped to a single tenant, preventing accidental cross-tenant use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantScoped<T> {
    pub tenant_id: TenantId,
    pub env: Env,
    pub data: T,
}

impl<T> TenantScoped<T> {
    pub fn new(tenant_id: impl Into<TenantId>, env: Env, data: T) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            env,
            data,
        }
    }

    pub fn belongs_to(&self, ctx: &TenantContext) -> bool {
        self.tenant_id == ctx.tenant_id && self.env == ctx.env
    }

    pub fn get_if_owner(&self, ctx: &TenantContext) -> Option<&T> {
        self.belongs_to(ctx).then_some(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_key_composes_tenant_and_env() {
        let ctx = TenantContext::new("acme", Env::Prod, "corr-1");
        assert_eq!(ctx.scope_key(), ("acme".to_string(), Env::Prod));
    }

    #[test]
    fn tenant_scoped_rejects_foreign_tenant() {
        let ctx = TenantContext::new("acme", Env::Prod, "corr-1");
        let other = TenantContext::new("globex", Env::Prod, "corr-2");
        let scoped = TenantScoped::new("acme", Env::Prod, 42u32);

        assert!(scoped.get_if_owner(&ctx).is_some());
        assert!(scoped.get_if_owner(&other).is_none());
    }
}
