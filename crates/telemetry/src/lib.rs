//! AgentKern Control Plane: Telemetry & Rollup Pipeline (C8).
//!
//! Per §4.8: a buffered batch writer for trace events and metric snapshots,
//! plus idempotent hourly/daily rollup jobs over the context store.

pub mod batch_writer;
pub mod rollup_jobs;
pub mod scheduler;

pub use batch_writer::{BatchWriter, TelemetryItem, BUFFER_SIZE, FLUSH_INTERVAL, MAX_FLUSH_RETRIES};
pub use rollup_jobs::{day_floor, hour_floor, run_daily_rollup, run_hourly_rollup};
pub use scheduler::spawn_rollup_jobs;
