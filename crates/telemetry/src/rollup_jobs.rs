//! Hourly/daily rollup jobs (§4.8).
//!
//! Per §4.8: "Hourly (runs at HH:05)... Daily (runs at 00:15)... Jobs are
//! idempotent over their period; re-running MUST produce the same output
//! (upsert on the period key)."

use agentkern_common::Result;
use agentkern_store::{ContextStore, RollupRow};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::sync::Arc;

/// Nearest-rank percentile over an already-sorted slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Aggregate raw telemetry for `[hour_start, hour_start + 1h)` into one
/// `hourly_rollups` row and upsert it. Re-running for the same `hour_start`
/// recomputes and overwrites — idempotent by construction.
pub async fn run_hourly_rollup(store: &Arc<dyn ContextStore>, tenant_id: &str, env: &str, service: &str, hour_start: DateTime<Utc>) -> Result<RollupRow> {
    let to = hour_start + Duration::hours(1);
    let records = store.list_telemetry_window(tenant_id, env, hour_start, to).await?;

    let mut latencies: Vec<f64> = records.iter().map(|r| r.latency_ms).collect();
    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let request_count = records.len() as u64;
    let error_count: u64 = records.iter().map(|r| r.errors).sum();
    let avg_latency_ms = if latencies.is_empty() { 0.0 } else { latencies.iter().sum::<f64>() / latencies.len() as f64 };

    let row = RollupRow {
        tenant_id: tenant_id.to_string(),
        env: env.to_string(),
        service: service.to_string(),
        period_start: hour_start,
        request_count,
        error_count,
        avg_latency_ms,
        p50_latency_ms: percentile(&latencies, 50.0),
        p95_latency_ms: percentile(&latencies, 95.0),
        p99_latency_ms: percentile(&latencies, 99.0),
    };
    store.upsert_hourly_rollup(&row).await?;
    Ok(row)
}

/// Aggregate the 24 hourly rows for `[day_start, day_start + 1d)` into one
/// `daily_rollups` row. Percentiles are request-count-weighted averages of
/// the hourly percentiles — an approximation, since raw samples are no
/// longer available once hourly rollups have run.
pub async fn run_daily_rollup(store: &Arc<dyn ContextStore>, tenant_id: &str, env: &str, service: &str, day_start: DateTime<Utc>) -> Result<RollupRow> {
    let to = day_start + Duration::days(1);
    let hours = store.list_hourly_rollups(tenant_id, env, day_start, to).await?;
    let hours: Vec<_> = hours.into_iter().filter(|h| h.service == service).collect();

    let request_count: u64 = hours.iter().map(|h| h.request_count).sum();
    let error_count: u64 = hours.iter().map(|h| h.error_count).sum();

    let weighted = |f: fn(&RollupRow) -> f64| -> f64 {
        if request_count == 0 {
            return 0.0;
        }
        hours.iter().map(|h| f(h) * h.request_count as f64).sum::<f64>() / request_count as f64
    };

    let row = RollupRow {
        tenant_id: tenant_id.to_string(),
        env: env.to_string(),
        service: service.to_string(),
        period_start: day_start,
        request_count,
        error_count,
        avg_latency_ms: weighted(|h| h.avg_latency_ms),
        p50_latency_ms: weighted(|h| h.p50_latency_ms),
        p95_latency_ms: weighted(|h| h.p95_latency_ms),
        p99_latency_ms: weighted(|h| h.p99_latency_ms),
    };
    store.upsert_daily_rollup(&row).await?;
    store.refresh_kpi_view().await?;
    Ok(row)
}

/// Truncate to the top of the hour.
pub fn hour_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0).unwrap().with_second(0).unwrap().with_nanosecond(0).unwrap()
}

/// Truncate to the start of the day (UTC).
pub fn day_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Seconds to sleep until the next `HH:05` boundary.
pub fn seconds_until_next_hourly(now: DateTime<Utc>) -> i64 {
    seconds_until(now, hour_floor(now) + Duration::minutes(5), Duration::hours(1))
}

/// Seconds to sleep until the next `00:15` boundary.
pub fn seconds_until_next_daily(now: DateTime<Utc>) -> i64 {
    seconds_until(now, day_floor(now) + Duration::minutes(15), Duration::days(1))
}

fn seconds_until(now: DateTime<Utc>, mut anchor: DateTime<Utc>, period: Duration) -> i64 {
    while anchor <= now {
        anchor += period;
    }
    (anchor - now).num_seconds().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_sorted_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn seconds_until_next_hourly_is_within_one_hour() {
        let now = Utc::now();
        let secs = seconds_until_next_hourly(now);
        assert!(secs > 0 && secs <= 3600);
    }

    #[test]
    fn seconds_until_next_daily_is_within_one_day() {
        let now = Utc::now();
        let secs = seconds_until_next_daily(now);
        assert!(secs > 0 && secs <= 86400);
    }
}
