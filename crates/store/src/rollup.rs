//! Hourly/daily rollup rows (§4.8).
//!
//! Per §4.8: "Hourly (runs at HH:05): aggregates per-service per-hour
//! request counts, error counts, average/percentile (p50/p95/p99) durations
//! from raw traces into a compact table. Daily (runs at 00:15): aggregates
//! hourly into daily KPI rows... Jobs are idempotent over their period;
//! re-running MUST produce the same output (upsert on the period key)."

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct RollupRow {
    pub tenant_id: String,
    pub env: String,
    pub service: String,
    pub period_start: DateTime<Utc>,
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
}
