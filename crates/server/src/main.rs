//! AgentKern Control Plane server (C12).
//!
//! Wires the twelve components behind one Axum surface. Grounded on
//! `packages/gate/src/bin/server.rs` (tracing init, rate limiting via
//! `tower::limit::RateLimitLayer` + `BufferLayer`, auth middleware) and
//! `packages/arbiter/src/bin/server.rs` (router/route shape).

mod auth;
mod error;
mod routes;
mod state;

use agentkern_adapters::AdapterPipeline;
use agentkern_anomaly::{spawn_poller, AnomalySink, ChannelSink, LogSink, ScanTarget, DEFAULT_POLL_INTERVAL};
use agentkern_resilience::{CircuitBreakerConfig, CircuitBreakerManager};
use agentkern_secrets::SecretsBridge;
use agentkern_selfheal::{spawn_scan_loop, SelfHealConfig, SelfHealController};
use agentkern_store::{ContextStore, DeadLetterQueue, IdempotencyService, PostgresStore, QuarantineLedger};
use agentkern_telemetry::{scheduler::spawn_rollup_jobs, BatchWriter};
use agentkern_trust::{TrustConfig, TrustEngine};
use axum::{
    error_handling::HandleErrorLayer,
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

use state::AppState;

const WEBHOOK_SOURCES: &[&str] = &["zapier", "n8n", "make", "airflow", "internal"];

/// Per §4.12: default rate limit is 1000 requests / 15 minutes. Applied
/// process-wide via `tower::limit::RateLimitLayer`, the same mechanism the
/// teacher uses for its (global, not per-IP) 100 req/min limit — a true
/// per-IP limiter would need request-scoped state this layer doesn't carry.
const DEFAULT_RATE_LIMIT_REQUESTS: u64 = 1000;
const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// `tenant_id:env` pairs the background jobs (rollups, anomaly polling,
/// self-healing) run for, e.g. `MONITORED_TENANTS=acme:prod,acme:staging`.
fn monitored_tenants() -> Vec<(String, String)> {
    std::env::var("MONITORED_TENANTS")
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| pair.split_once(':').map(|(t, e)| (t.to_string(), e.to_string())))
        .collect()
}

fn api_keys() -> Vec<String> {
    std::env::var("API_KEYS").unwrap_or_default().split(',').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

#[tokio::main]
async fn main() {
    agentkern_observability::init_logging();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let postgres = PostgresStore::connect(&database_url).await.expect("failed to connect to postgres");
    postgres.run_migrations().await.expect("migrations failed");
    let pool = postgres.pool();
    let store: Arc<dyn ContextStore> = Arc::new(postgres);

    let dlq = Arc::new(DeadLetterQueue::new(pool.clone()));
    let quarantine = Arc::new(QuarantineLedger::new(pool.clone()));
    let breakers = Arc::new(CircuitBreakerManager::new(CircuitBreakerConfig::default()));
    let secrets = Arc::new(SecretsBridge::default());
    let batch_writer = Arc::new(BatchWriter::new(store.clone()));

    let mut adapter_pipelines = HashMap::new();
    for source in WEBHOOK_SOURCES {
        let pipeline = AdapterPipeline::new(
            IdempotencyService::new(pool.clone()),
            DeadLetterQueue::new(pool.clone()),
            breakers.get_or_create(source),
            batch_writer.clone(),
        );
        adapter_pipelines.insert(*source, Arc::new(pipeline));
    }

    let trust_engine = Arc::new(TrustEngine::new(store.clone(), dlq.clone(), quarantine.clone(), TrustConfig::default()).expect("trust engine weights invalid"));

    let selfheal = Arc::new(SelfHealController::new(store.clone(), dlq.clone(), quarantine.clone(), breakers.clone(), SelfHealConfig::default()));

    let anomaly_sinks: Vec<Arc<dyn AnomalySink>> = vec![Arc::new(LogSink), Arc::new(ChannelSink::new(1024))];

    let tenants = monitored_tenants();
    for (tenant_id, env) in &tenants {
        spawn_rollup_jobs(store.clone(), tenant_id.clone(), env.clone(), vec!["control-plane".to_string()]);
        spawn_poller(
            store.clone(),
            anomaly_sinks.clone(),
            vec![ScanTarget { tenant_id: tenant_id.clone(), env: env.clone(), metric_name: "request.latency_ms".to_string() }],
            DEFAULT_POLL_INTERVAL,
        );
        spawn_scan_loop(selfheal.clone(), tenant_id.clone(), env.clone(), SelfHealConfig::default().scan_interval);
    }
    if tenants.is_empty() {
        tracing::warn!("MONITORED_TENANTS unset: rollups, anomaly detection, and self-healing are idle");
    }

    let state = Arc::new(AppState {
        store,
        dlq,
        quarantine,
        breakers,
        secrets,
        adapter_pipelines,
        trust_engine,
        selfheal,
        anomaly_sinks,
        policies: parking_lot::RwLock::new(Vec::new()),
        api_keys: api_keys(),
    });

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/status/liveness", get(routes::liveness))
        .route("/status/readiness", get(routes::readiness))
        .route("/agents", get(routes::list_agents))
        .route("/agents/{id}/telemetry", get(routes::agent_telemetry))
        .route("/trust", get(routes::trust))
        .route("/reports/export", post(routes::export_report))
        .route("/policies", get(routes::list_policies).post(routes::register_policy))
        .route("/quarantine/{id}/release", post(routes::release_quarantine))
        .route("/metrics", get(routes::metrics))
        .route("/adapters/{source}/webhook", post(routes::adapter_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: BoxError| async move { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, format!("unhandled internal error: {err}")) }))
                .layer(BufferLayer::new(1024))
                .layer(RateLimitLayer::new(DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW)),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::auth_middleware))
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, "agentkern control plane server starting");

    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}
