//! Periodic anomaly scan (§4.9).
//!
//! Every `poll_interval` (default 5 minutes), pulls the freshest telemetry
//! window for a tenant/env/metric, compares it against the stored baseline,
//! and runs it through all four detectors. Anomalies are appended to the
//! store atomically and fanned out to subscribed sinks. Grounded on the
//! `spawn_rollup_jobs` scheduling shape in the telemetry crate, generalized
//! from fixed wall-clock anchors to a rolling interval since anomaly
//! detection has no natural hour/day boundary.

use agentkern_common::Result;
use agentkern_store::ContextStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::baseline::get_or_recompute;
use crate::detector::{detect_drift, detect_error_rate_regression, detect_latency_regression, detect_sla_breach, detect_traffic_spike};
use crate::sink::AnomalySink;

pub const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(5 * 60);
pub const DEFAULT_WINDOW: Duration = Duration::minutes(5);

/// One scan target: a tenant/env pair and the metric name used both to key
/// the baseline and to label latency anomalies.
#[derive(Clone)]
pub struct ScanTarget {
    pub tenant_id: String,
    pub env: String,
    pub metric_name: String,
}

/// Run a single scan cycle for `target`, returning any anomalies raised.
/// Exposed standalone (not just via `spawn_poller`) so tests and the
/// self-healing scanner can trigger an on-demand scan without waiting on
/// the interval.
pub async fn scan_once(
    store: &Arc<dyn ContextStore>,
    sinks: &[Arc<dyn AnomalySink>],
    target: &ScanTarget,
    now: chrono::DateTime<Utc>,
) -> Result<Vec<agentkern_common::Anomaly>> {
    let from = now - DEFAULT_WINDOW;
    let records = store.list_telemetry_window(&target.tenant_id, &target.env, from, now).await?;
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let (latency_baseline, error_rate_baseline, volume_baseline) =
        get_or_recompute(store, &target.tenant_id, &target.env, &target.metric_name, now).await?;

    let request_count: u64 = records.iter().map(|r| r.success_count + r.errors).sum();
    let error_count: u64 = records.iter().map(|r| r.errors).sum();
    let error_rate = if request_count > 0 { error_count as f64 / request_count as f64 } else { 0.0 };
    let uptime_pct = records.iter().map(|r| r.uptime_pct).sum::<f64>() / records.len() as f64;
    let latest_latency = records.last().map(|r| r.latency_ms).unwrap_or(latency_baseline.mean);

    let mut anomalies = Vec::new();
    anomalies.extend(detect_drift(&target.tenant_id, &target.env, &latency_baseline, latest_latency));
    anomalies.extend(detect_latency_regression(&target.tenant_id, &target.env, &latency_baseline, latest_latency));
    anomalies.extend(detect_error_rate_regression(
        &target.tenant_id,
        &target.env,
        &target.metric_name,
        error_rate_baseline.mean,
        error_rate,
    ));
    anomalies.extend(detect_traffic_spike(
        &target.tenant_id,
        &target.env,
        &target.metric_name,
        volume_baseline.mean,
        request_count as f64,
    ));
    anomalies.extend(detect_sla_breach(&target.tenant_id, &target.env, error_rate, uptime_pct));

    for anomaly in &anomalies {
        store.append_anomaly(anomaly).await?;
        for sink in sinks {
            sink.notify(anomaly);
        }
    }

    Ok(anomalies)
}

/// Spawn a background task that scans `targets` every `poll_interval`
/// forever. Errors from a single target are logged and do not stop the
/// loop — a transient store failure must not silence the whole detector.
pub fn spawn_poller(
    store: Arc<dyn ContextStore>,
    sinks: Vec<Arc<dyn AnomalySink>>,
    targets: Vec<ScanTarget>,
    poll_interval: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        loop {
            timer.tick().await;
            let now = Utc::now();
            for target in &targets {
                if let Err(err) = scan_once(&store, &sinks, target, now).await {
                    tracing::error!(
                        tenant_id = %target.tenant_id, env = %target.env, metric = %target.metric_name,
                        error = %err, "anomaly scan failed"
                    );
                }
            }
        }
    })
}
