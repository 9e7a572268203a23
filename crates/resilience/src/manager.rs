//! Registry of per-target circuit breakers, created lazily on first use.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};

pub struct CircuitBreakerManager {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerManager {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self { breakers: RwLock::new(HashMap::new()), default_config }
    }

    pub fn get_or_create(&self, target: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(target) {
            return Arc::clone(existing);
        }
        let mut breakers = self.breakers.write();
        breakers
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(target, self.default_config.clone())))
            .clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.breakers.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_breaker_for_same_target() {
        let manager = CircuitBreakerManager::default();
        let a = manager.get_or_create("downstream-a");
        let b = manager.get_or_create("downstream-a");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
