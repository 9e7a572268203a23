//! AgentKern Control Plane: Circuit Breaker & Retry (C4)
//!
//! Per-target breaker state machine plus exponential backoff retry, used by
//! the adapter runtime whenever it calls out to a downstream task executor.

pub mod breaker;
pub mod manager;
pub mod retry;

pub use breaker::{BreakerSnapshot, BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use manager::CircuitBreakerManager;
pub use retry::{RetryConfig, retry_with_backoff};
