//! Per-metric baseline computation (§4.9).
//!
//! A baseline is the mean/stddev/p50/p95/p99 of a metric over a trailing
//! lookback window, recomputed periodically so the detector always compares
//! "now" against "recent normal" rather than a fixed threshold. Grounded on
//! the percentile helper already used by the rollup jobs, and on the
//! mean/stddev-over-a-window shape of the teacher's drift scoring.

use agentkern_common::{Baseline, Result};
use agentkern_store::ContextStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Suffix conventions for the three baseline series derived from telemetry.
/// Each is stored under its own `metric_name` key so drift/regression/spike
/// detection can each compare against the series that actually matters to
/// them, rather than overloading one baseline for three different shapes.
pub fn latency_metric_name(base: &str) -> String {
    base.to_string()
}
pub fn error_rate_metric_name(base: &str) -> String {
    format!("{base}.error_rate")
}
pub fn request_volume_metric_name(base: &str) -> String {
    format!("{base}.request_count")
}

/// Recompute a baseline for `metric_name` from `values` and persist it.
async fn recompute_from_values(
    store: &Arc<dyn ContextStore>,
    tenant_id: &str,
    env: &str,
    metric_name: &str,
    mut values: Vec<f64>,
) -> Result<Baseline> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let m = mean(&values);
    let baseline = Baseline {
        tenant_id: tenant_id.to_string(),
        env: env.to_string(),
        metric_name: metric_name.to_string(),
        mean: m,
        stddev: stddev(&values, m),
        p50: percentile(&values, 50.0),
        p95: percentile(&values, 95.0),
        p99: percentile(&values, 99.0),
        sample_count: values.len() as u64,
    };
    store.upsert_baseline(&baseline).await?;
    Ok(baseline)
}

/// Recompute the latency, error-rate, and request-volume baselines for
/// `base` over the trailing `lookback` window (default 7 days) and persist
/// all three.
pub async fn recompute_all(
    store: &Arc<dyn ContextStore>,
    tenant_id: &str,
    env: &str,
    base: &str,
    now: DateTime<Utc>,
    lookback: Duration,
) -> Result<(Baseline, Baseline, Baseline)> {
    let from = now - lookback;
    let records = store.list_telemetry_window(tenant_id, env, from, now).await?;

    let latencies: Vec<f64> = records.iter().map(|r| r.latency_ms).collect();
    let error_rates: Vec<f64> = records
        .iter()
        .map(|r| {
            let total = r.success_count + r.errors;
            if total > 0 {
                r.errors as f64 / total as f64
            } else {
                0.0
            }
        })
        .collect();
    let volumes: Vec<f64> = records.iter().map(|r| (r.success_count + r.errors) as f64).collect();

    let latency = recompute_from_values(store, tenant_id, env, &latency_metric_name(base), latencies).await?;
    let error_rate = recompute_from_values(store, tenant_id, env, &error_rate_metric_name(base), error_rates).await?;
    let volume = recompute_from_values(store, tenant_id, env, &request_volume_metric_name(base), volumes).await?;

    Ok((latency, error_rate, volume))
}

/// Fetch the current latency baseline, falling back to a full recompute of
/// all three series if none has been stored yet (e.g. first run for a new
/// tenant/metric pair).
pub async fn get_or_recompute(
    store: &Arc<dyn ContextStore>,
    tenant_id: &str,
    env: &str,
    base: &str,
    now: DateTime<Utc>,
) -> Result<(Baseline, Baseline, Baseline)> {
    let latency_name = latency_metric_name(base);
    if let (Some(latency), Some(error_rate), Some(volume)) = (
        store.get_baseline(tenant_id, env, &latency_name).await?,
        store.get_baseline(tenant_id, env, &error_rate_metric_name(base)).await?,
        store.get_baseline(tenant_id, env, &request_volume_metric_name(base)).await?,
    ) {
        return Ok((latency, error_rate, volume));
    }
    recompute_all(store, tenant_id, env, base, now, Duration::days(DEFAULT_LOOKBACK_DAYS)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_nearest_rank() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
    }

    #[test]
    fn stddev_of_single_sample_is_zero() {
        assert_eq!(stddev(&[5.0], 5.0), 0.0);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }
}
