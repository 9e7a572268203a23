//! AgentKern Control Plane: Anomaly Detector (C9)
//!
//! Statistical drift/regression/spike/SLA-breach detection against rolling
//! baselines (§4.9). Baselines are recomputed from telemetry windows stored
//! by C1; anomalies are persisted through the same store and fanned out to
//! subscribed sinks for downstream consumers (notifications, self-healing).

pub mod baseline;
pub mod detector;
pub mod poller;
pub mod sink;

pub use baseline::{error_rate_metric_name, get_or_recompute, latency_metric_name, recompute_all, request_volume_metric_name, DEFAULT_LOOKBACK_DAYS};
pub use detector::{detect_drift, detect_error_rate_regression, detect_latency_regression, detect_sla_breach, detect_traffic_spike};
pub use poller::{scan_once, spawn_poller, ScanTarget, DEFAULT_POLL_INTERVAL, DEFAULT_WINDOW};
pub use sink::{AnomalySink, ChannelSink, LogSink};
