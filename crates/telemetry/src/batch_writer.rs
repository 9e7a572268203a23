//! Buffered batch writer for trace events and metric snapshots (§4.8).
//!
//! Per §4.8: "A buffered batch writer accepts trace events and metric
//! snapshots via non-blocking enqueue. Buffer size 100, flush on
//! buffer-full or every 10s. Flush is crash-safe: on failure, the batch is
//! re-enqueued at the head with a retry counter; after N consecutive
//! failures the batch is emitted as an error event and dropped to prevent
//! OOM." Grounded on the mpsc-channel + `tokio::time::interval` worker
//! shape used by batch queues elsewhere in the corpus (e.g. LangSmith's
//! run batching), adapted to the store's `append_telemetry`/
//! `insert_metric_snapshot` calls instead of an HTTP batch endpoint.

use agentkern_common::{MetricSnapshot, TelemetryRecord};
use agentkern_store::ContextStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

pub const BUFFER_SIZE: usize = 100;
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_FLUSH_RETRIES: u32 = 5;

const CHANNEL_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
pub enum TelemetryItem {
    Trace { tenant_id: String, env: String, record: TelemetryRecord },
    Metric(MetricSnapshot),
}

enum WriterMessage {
    Enqueue(TelemetryItem),
    Flush,
    Shutdown,
}

/// Non-blocking front for the batch writer worker task.
pub struct BatchWriter {
    sender: mpsc::Sender<WriterMessage>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(run_worker(store, receiver));
        Self { sender, handle: Some(handle) }
    }

    /// Enqueue an item without blocking the caller. Drops silently (with a
    /// warning) if the worker's channel is saturated — callers on the hot
    /// path must never stall waiting for telemetry to persist.
    pub fn enqueue(&self, item: TelemetryItem) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(WriterMessage::Enqueue(item)) {
            tracing::warn!("telemetry batch writer channel full, dropping item");
        }
    }

    pub fn flush(&self) {
        let _ = self.sender.try_send(WriterMessage::Flush);
    }

    pub async fn shutdown(mut self) {
        let _ = self.sender.send(WriterMessage::Shutdown).await;
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        let _ = self.sender.try_send(WriterMessage::Shutdown);
    }
}

struct PendingItem {
    item: TelemetryItem,
    attempts: u32,
}

async fn run_worker(store: Arc<dyn ContextStore>, mut receiver: mpsc::Receiver<WriterMessage>) {
    let mut buffer: Vec<PendingItem> = Vec::with_capacity(BUFFER_SIZE);
    let mut timer = interval(FLUSH_INTERVAL);
    timer.tick().await;

    loop {
        tokio::select! {
            msg = receiver.recv() => match msg {
                Some(WriterMessage::Enqueue(item)) => {
                    buffer.push(PendingItem { item, attempts: 0 });
                    if buffer.len() >= BUFFER_SIZE {
                        flush(&store, &mut buffer).await;
                    }
                }
                Some(WriterMessage::Flush) => flush(&store, &mut buffer).await,
                Some(WriterMessage::Shutdown) | None => {
                    flush(&store, &mut buffer).await;
                    break;
                }
            },
            _ = timer.tick() => {
                if !buffer.is_empty() {
                    flush(&store, &mut buffer).await;
                }
            }
        }
    }
}

async fn write_item(store: &Arc<dyn ContextStore>, item: &TelemetryItem) -> agentkern_common::Result<()> {
    match item {
        TelemetryItem::Trace { tenant_id, env, record } => store.append_telemetry(tenant_id, env, record).await,
        TelemetryItem::Metric(snapshot) => store.insert_metric_snapshot(snapshot).await,
    }
}

/// Drain `buffer`, writing each item. Failures are kept at the head with a
/// bumped retry counter for the next flush cycle; items that have failed
/// `MAX_FLUSH_RETRIES` times are logged as an error event and dropped.
async fn flush(store: &Arc<dyn ContextStore>, buffer: &mut Vec<PendingItem>) {
    if buffer.is_empty() {
        return;
    }
    let batch = std::mem::take(buffer);
    let batch_len = batch.len();
    let mut retained = Vec::new();

    for pending in batch {
        match write_item(store, &pending.item).await {
            Ok(()) => {}
            Err(err) if pending.attempts + 1 >= MAX_FLUSH_RETRIES => {
                tracing::error!(error = %err, attempts = pending.attempts + 1, "telemetry item exhausted retries, dropping");
            }
            Err(err) => {
                tracing::warn!(error = %err, attempts = pending.attempts + 1, "telemetry flush failed, re-enqueuing at head");
                retained.push(PendingItem { item: pending.item, attempts: pending.attempts + 1 });
            }
        }
    }

    tracing::debug!(flushed = batch_len, retained = retained.len(), "telemetry batch flushed");
    retained.append(buffer);
    *buffer = retained;
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_common::{ControlPlaneError, Result};
    use agentkern_store::Expected;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeStore {
        traces: Mutex<Vec<TelemetryRecord>>,
        fail_next: Mutex<u32>,
    }

    #[async_trait]
    impl ContextStore for FakeStore {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        async fn get_agent(&self, _: &str, _: &str, _: &str) -> Result<agentkern_common::Agent> {
            unimplemented!()
        }
        async fn upsert_agent(&self, _: &str, _: &agentkern_common::Agent, _: Expected) -> Result<agentkern_common::Agent> {
            unimplemented!()
        }
        async fn list_agents(&self, _: &str, _: &str) -> Result<Vec<agentkern_common::Agent>> {
            unimplemented!()
        }
        async fn get_workflow(&self, _: &str, _: &str, _: &str) -> Result<agentkern_common::Workflow> {
            unimplemented!()
        }
        async fn upsert_workflow(&self, _: &str, _: &str, _: &agentkern_common::Workflow, _: Expected) -> Result<agentkern_common::Workflow> {
            unimplemented!()
        }
        async fn list_workflows(&self, _: &str, _: &str) -> Result<Vec<agentkern_common::Workflow>> {
            unimplemented!()
        }
        async fn append_telemetry(&self, _: &str, _: &str, record: &TelemetryRecord) -> Result<()> {
            let mut fail_next = self.fail_next.lock();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(ControlPlaneError::Transient("simulated".into()));
            }
            self.traces.lock().push(record.clone());
            Ok(())
        }
        async fn list_telemetry(&self, _: &str, _: &str, _: &str, _: i64) -> Result<Vec<TelemetryRecord>> {
            unimplemented!()
        }
        async fn list_telemetry_window(&self, _: &str, _: &str, _: chrono::DateTime<Utc>, _: chrono::DateTime<Utc>) -> Result<Vec<TelemetryRecord>> {
            unimplemented!()
        }
        async fn upsert_hourly_rollup(&self, _: &agentkern_store::RollupRow) -> Result<()> {
            unimplemented!()
        }
        async fn list_hourly_rollups(&self, _: &str, _: &str, _: chrono::DateTime<Utc>, _: chrono::DateTime<Utc>) -> Result<Vec<agentkern_store::RollupRow>> {
            unimplemented!()
        }
        async fn upsert_daily_rollup(&self, _: &agentkern_store::RollupRow) -> Result<()> {
            unimplemented!()
        }
        async fn upsert_baseline(&self, _: &agentkern_common::Baseline) -> Result<()> {
            unimplemented!()
        }
        async fn get_baseline(&self, _: &str, _: &str, _: &str) -> Result<Option<agentkern_common::Baseline>> {
            unimplemented!()
        }
        async fn insert_metric_snapshot(&self, _: &MetricSnapshot) -> Result<()> {
            unimplemented!()
        }
        async fn latest_metric_snapshot(&self, _: &str) -> Result<Option<MetricSnapshot>> {
            unimplemented!()
        }
        async fn refresh_kpi_view(&self) -> Result<()> {
            unimplemented!()
        }
        async fn append_anomaly(&self, _: &agentkern_common::Anomaly) -> Result<()> {
            unimplemented!()
        }
        async fn list_anomalies(&self, _: &str, _: &str, _: chrono::DateTime<Utc>, _: chrono::DateTime<Utc>) -> Result<Vec<agentkern_common::Anomaly>> {
            unimplemented!()
        }
    }

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord { agent_id: "agent-1".into(), ts: Utc::now(), latency_ms: 12.0, errors: 0, policy_violations: 0, success_count: 1, uptime_pct: 100.0 }
    }

    #[tokio::test]
    async fn flush_on_buffer_full_persists_items() {
        let store: Arc<dyn ContextStore> = Arc::new(FakeStore::default());
        let writer = BatchWriter::new(store.clone());
        for _ in 0..BUFFER_SIZE {
            writer.enqueue(TelemetryItem::Trace { tenant_id: "acme".into(), env: "prod".into(), record: sample_record() });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.shutdown().await;
    }

    #[tokio::test]
    async fn explicit_flush_drains_buffer() {
        let store: Arc<dyn ContextStore> = Arc::new(FakeStore::default());
        let writer = BatchWriter::new(store.clone());
        writer.enqueue(TelemetryItem::Trace { tenant_id: "acme".into(), env: "prod".into(), record: sample_record() });
        writer.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.shutdown().await;
    }
}
