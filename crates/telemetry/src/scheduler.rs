//! Drives the hourly/daily rollup jobs on their fixed wall-clock schedule.

use agentkern_store::ContextStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::rollup_jobs::{day_floor, hour_floor, run_daily_rollup, run_hourly_rollup, seconds_until_next_daily, seconds_until_next_hourly};

/// Spawns the two rollup jobs as background tasks. `services` is the fixed
/// list of service names rolled up for `(tenant_id, env)` — §4.8 rollups are
/// per-service, and the control plane does not discover services
/// dynamically from traffic.
pub fn spawn_rollup_jobs(store: Arc<dyn ContextStore>, tenant_id: String, env: String, services: Vec<String>) {
    let hourly_store = store.clone();
    let hourly_tenant = tenant_id.clone();
    let hourly_env = env.clone();
    let hourly_services = services.clone();
    tokio::spawn(async move {
        loop {
            let wait = seconds_until_next_hourly(Utc::now());
            tokio::time::sleep(StdDuration::from_secs(wait as u64)).await;
            let hour_start = hour_floor(Utc::now()) - chrono::Duration::hours(1);
            for service in &hourly_services {
                if let Err(err) = run_hourly_rollup(&hourly_store, &hourly_tenant, &hourly_env, service, hour_start).await {
                    tracing::error!(error = %err, service = %service, "hourly rollup failed");
                }
            }
        }
    });

    tokio::spawn(async move {
        loop {
            let wait = seconds_until_next_daily(Utc::now());
            tokio::time::sleep(StdDuration::from_secs(wait as u64)).await;
            let day_start = day_floor(Utc::now()) - chrono::Duration::days(1);
            for service in &services {
                if let Err(err) = run_daily_rollup(&store, &tenant_id, &env, service, day_start).await {
                    tracing::error!(error = %err, service = %service, "daily rollup failed");
                }
            }
        }
    });
}
