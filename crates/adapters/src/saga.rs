//! SAGA compensation registry.
//!
//! Per §3: "SAGA registration: (correlation_id, steps[] = {task_id, result,
//! compensate}); ordered; rollback executes in reverse." Per §4.7: "on
//! failure: if SAGA steps exist for the correlation, execute compensations
//! in reverse; any compensation error is appended to DLQ."

use agentkern_common::{ControlPlaneError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Compensation: Send + Sync {
    async fn compensate(&self) -> Result<()>;
}

pub struct SagaStep {
    pub task_id: String,
    pub compensate: Arc<dyn Compensation>,
}

/// In-memory SAGA ledger, keyed by correlation id. Steps for a correlation
/// are dropped once the flow reaches a terminal state (§4.7 state machine).
#[derive(Default)]
pub struct SagaRegistry {
    steps: Mutex<HashMap<String, Vec<SagaStep>>>,
}

impl SagaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, correlation_id: &str, step: SagaStep) {
        self.steps.lock().entry(correlation_id.to_string()).or_default().push(step);
    }

    pub fn has_steps(&self, correlation_id: &str) -> bool {
        self.steps.lock().get(correlation_id).is_some_and(|s| !s.is_empty())
    }

    /// Execute compensations for `correlation_id` in reverse registration
    /// order. Returns the task ids whose compensation itself failed — the
    /// caller pushes those to the DLQ per §4.7.
    pub async fn compensate(&self, correlation_id: &str) -> Vec<(String, ControlPlaneError)> {
        let steps = self.steps.lock().remove(correlation_id).unwrap_or_default();
        let mut failures = Vec::new();
        for step in steps.into_iter().rev() {
            if let Err(err) = step.compensate.compensate().await {
                tracing::error!(task_id = %step.task_id, error = %err, "saga compensation failed");
                failures.push((step.task_id, err));
            }
        }
        failures
    }

    pub fn clear(&self, correlation_id: &str) {
        self.steps.lock().remove(correlation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingCompensation {
        order: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Compensation for RecordingCompensation {
        async fn compensate(&self) -> Result<()> {
            self.order.lock().push(self.name);
            if self.fail {
                return Err(ControlPlaneError::Transient("compensation failed".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn compensates_in_reverse_order() {
        let registry = SagaRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        registry.register("corr-1", SagaStep { task_id: "t1".into(), compensate: Arc::new(RecordingCompensation { order: order.clone(), name: "t1", fail: false }) });
        registry.register("corr-1", SagaStep { task_id: "t2".into(), compensate: Arc::new(RecordingCompensation { order: order.clone(), name: "t2", fail: false }) });

        let failures = registry.compensate("corr-1").await;
        assert!(failures.is_empty());
        assert_eq!(*order.lock(), vec!["t2", "t1"]);
    }

    #[tokio::test]
    async fn failed_compensation_is_reported() {
        let registry = SagaRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        registry.register("corr-2", SagaStep { task_id: "t1".into(), compensate: Arc::new(RecordingCompensation { order, name: "t1", fail: true }) });

        let failures = registry.compensate("corr-2").await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "t1");
    }

    #[test]
    fn has_steps_reports_presence() {
        let registry = SagaRegistry::new();
        assert!(!registry.has_steps("corr-3"));
        let counter = Arc::new(AtomicUsize::new(0));
        struct NoOp(Arc<AtomicUsize>);
        #[async_trait]
        impl Compensation for NoOp {
            async fn compensate(&self) -> Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
        registry.register("corr-3", SagaStep { task_id: "t1".into(), compensate: Arc::new(NoOp(counter)) });
        assert!(registry.has_steps("corr-3"));
    }
}
