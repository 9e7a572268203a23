//! Anomaly notification sinks.
//!
//! The detector persists every anomaly to the store regardless of sinks;
//! sinks are a best-effort fan-out for external notification, grounded on
//! the teacher's `DriftAlerter` (webhook/callback registration, bounded
//! history) but simplified to the two transports this control plane
//! actually needs: structured logs and an in-process broadcast channel that
//! other components (e.g. the self-healing scanner) can subscribe to.

use agentkern_common::Anomaly;
use tokio::sync::broadcast;

pub trait AnomalySink: Send + Sync {
    fn notify(&self, anomaly: &Anomaly);
}

/// Emits a structured tracing event per anomaly, leveled by severity.
pub struct LogSink;

impl AnomalySink for LogSink {
    fn notify(&self, anomaly: &Anomaly) {
        use agentkern_common::AnomalySeverity::*;
        match anomaly.severity {
            Critical => tracing::error!(
                tenant_id = %anomaly.tenant_id, env = %anomaly.env, metric = %anomaly.metric_name,
                anomaly_type = %anomaly.anomaly_type, "{}", anomaly.message
            ),
            High => tracing::warn!(
                tenant_id = %anomaly.tenant_id, env = %anomaly.env, metric = %anomaly.metric_name,
                anomaly_type = %anomaly.anomaly_type, "{}", anomaly.message
            ),
            Medium => tracing::info!(
                tenant_id = %anomaly.tenant_id, env = %anomaly.env, metric = %anomaly.metric_name,
                anomaly_type = %anomaly.anomaly_type, "{}", anomaly.message
            ),
        }
    }
}

/// Broadcasts anomalies on a channel; subscribers that lag behind simply
/// miss older messages rather than blocking the detector.
pub struct ChannelSink {
    sender: broadcast::Sender<Anomaly>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Anomaly> {
        self.sender.subscribe()
    }
}

impl AnomalySink for ChannelSink {
    fn notify(&self, anomaly: &Anomaly) {
        // No active subscribers is not an error; the detector must never
        // fail because nobody is listening.
        let _ = self.sender.send(anomaly.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_common::{AnomalySeverity, AnomalyType};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample() -> Anomaly {
        Anomaly {
            id: Uuid::new_v4(),
            tenant_id: "acme".into(),
            env: "prod".into(),
            metric_name: "latency_ms".into(),
            anomaly_type: AnomalyType::Drift,
            severity: AnomalySeverity::High,
            observed_value: 1.0,
            baseline_value: 0.5,
            message: "test".into(),
            detected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn channel_sink_delivers_to_subscriber() {
        let sink = ChannelSink::new(8);
        let mut rx = sink.subscribe();
        sink.notify(&sample());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.metric_name, "latency_ms");
    }

    #[test]
    fn log_sink_does_not_panic_without_subscriber() {
        LogSink.notify(&sample());
    }
}
