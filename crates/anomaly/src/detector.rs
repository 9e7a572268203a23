//! Anomaly classification (§4.9): drift, regression, spike, SLA breach.
//!
//! These are pure functions over a `Baseline` and an observed aggregate —
//! no I/O, no store access — so they can be unit tested exhaustively against
//! the exact percentage thresholds in §4.9 without a database. Grounded on
//! the severity-tiering shape of the teacher's `AlertSeverity::from_score`,
//! generalized from a single drift score to the four anomaly kinds.

use agentkern_common::{Anomaly, AnomalySeverity, AnomalyType, Baseline};
use chrono::Utc;
use uuid::Uuid;

fn anomaly(
    tenant_id: &str,
    env: &str,
    metric_name: &str,
    anomaly_type: AnomalyType,
    severity: AnomalySeverity,
    observed_value: f64,
    baseline_value: f64,
    message: String,
) -> Anomaly {
    Anomaly {
        id: Uuid::new_v4(),
        tenant_id: tenant_id.to_string(),
        env: env.to_string(),
        metric_name: metric_name.to_string(),
        anomaly_type,
        severity,
        observed_value,
        baseline_value,
        message,
        detected_at: Utc::now(),
    }
}

/// Z-score drift: ≥3 medium, ≥4 high, ≥5 critical. `baseline.stddev == 0`
/// means the metric has never varied; treat any deviation as undetectable
/// rather than dividing by zero.
pub fn detect_drift(tenant_id: &str, env: &str, baseline: &Baseline, observed_value: f64) -> Option<Anomaly> {
    if baseline.stddev <= 0.0 {
        return None;
    }
    let z = (observed_value - baseline.mean).abs() / baseline.stddev;
    let severity = if z >= 5.0 {
        AnomalySeverity::Critical
    } else if z >= 4.0 {
        AnomalySeverity::High
    } else if z >= 3.0 {
        AnomalySeverity::Medium
    } else {
        return None;
    };
    Some(anomaly(
        tenant_id,
        env,
        &baseline.metric_name,
        AnomalyType::Drift,
        severity,
        observed_value,
        baseline.mean,
        format!("z-score {z:.2} against baseline mean {:.2} (stddev {:.2})", baseline.mean, baseline.stddev),
    ))
}

/// Regression: percentage increase of an observed latency against baseline
/// p95, or error rate against baseline mean. 20/30/50% for latency,
/// 20/50/100% for error rate.
pub fn detect_latency_regression(tenant_id: &str, env: &str, baseline: &Baseline, observed_p95: f64) -> Option<Anomaly> {
    let increase_pct = pct_increase(observed_p95, baseline.p95)?;
    let severity = tier(increase_pct, 20.0, 30.0, 50.0)?;
    Some(anomaly(
        tenant_id,
        env,
        &baseline.metric_name,
        AnomalyType::Regression,
        severity,
        observed_p95,
        baseline.p95,
        format!("latency p95 regressed {increase_pct:.1}% vs baseline p95 {:.2}ms", baseline.p95),
    ))
}

pub fn detect_error_rate_regression(tenant_id: &str, env: &str, metric_name: &str, baseline_error_rate: f64, observed_error_rate: f64) -> Option<Anomaly> {
    let increase_pct = pct_increase(observed_error_rate, baseline_error_rate)?;
    let severity = tier(increase_pct, 20.0, 50.0, 100.0)?;
    Some(anomaly(
        tenant_id,
        env,
        metric_name,
        AnomalyType::Regression,
        severity,
        observed_error_rate,
        baseline_error_rate,
        format!("error rate regressed {increase_pct:.1}% vs baseline {:.4}", baseline_error_rate),
    ))
}

/// Spike: traffic volume increase vs. baseline mean. 200/300/500%.
pub fn detect_traffic_spike(tenant_id: &str, env: &str, metric_name: &str, baseline_mean_volume: f64, observed_volume: f64) -> Option<Anomaly> {
    let increase_pct = pct_increase(observed_volume, baseline_mean_volume)?;
    let severity = tier(increase_pct, 200.0, 300.0, 500.0)?;
    Some(anomaly(
        tenant_id,
        env,
        metric_name,
        AnomalyType::Spike,
        severity,
        observed_volume,
        baseline_mean_volume,
        format!("traffic volume up {increase_pct:.1}% vs baseline mean {:.1}", baseline_mean_volume),
    ))
}

/// SLA breach: error rate > 1% or uptime < 99.9% → high; error rate > 5% or
/// uptime < 99% → critical. Evaluated directly against fixed thresholds,
/// not a baseline comparison.
pub fn detect_sla_breach(tenant_id: &str, env: &str, error_rate: f64, uptime_pct: f64) -> Option<Anomaly> {
    let severity = if error_rate > 0.05 || uptime_pct < 99.0 {
        AnomalySeverity::Critical
    } else if error_rate > 0.01 || uptime_pct < 99.9 {
        AnomalySeverity::High
    } else {
        return None;
    };
    Some(anomaly(
        tenant_id,
        env,
        "error_rate",
        AnomalyType::SlaBreach,
        severity,
        error_rate,
        uptime_pct,
        format!("error rate {:.2}% uptime {:.3}%", error_rate * 100.0, uptime_pct),
    ))
}

fn pct_increase(observed: f64, baseline: f64) -> Option<f64> {
    if baseline <= 0.0 {
        return None;
    }
    let increase = ((observed - baseline) / baseline) * 100.0;
    if increase <= 0.0 {
        None
    } else {
        Some(increase)
    }
}

fn tier(value: f64, medium: f64, high: f64, critical: f64) -> Option<AnomalySeverity> {
    if value >= critical {
        Some(AnomalySeverity::Critical)
    } else if value >= high {
        Some(AnomalySeverity::High)
    } else if value >= medium {
        Some(AnomalySeverity::Medium)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(metric_name: &str) -> Baseline {
        Baseline {
            tenant_id: "acme".into(),
            env: "prod".into(),
            metric_name: metric_name.into(),
            mean: 100.0,
            stddev: 10.0,
            p50: 95.0,
            p95: 150.0,
            p99: 200.0,
            sample_count: 1000,
        }
    }

    #[test]
    fn drift_below_threshold_is_none() {
        let b = baseline("latency_ms");
        assert!(detect_drift("acme", "prod", &b, 125.0).is_none());
    }

    #[test]
    fn drift_at_medium_threshold() {
        let b = baseline("latency_ms");
        let a = detect_drift("acme", "prod", &b, 130.0).unwrap();
        assert_eq!(a.severity, AnomalySeverity::Medium);
    }

    #[test]
    fn drift_at_critical_threshold() {
        let b = baseline("latency_ms");
        let a = detect_drift("acme", "prod", &b, 150.0).unwrap();
        assert_eq!(a.severity, AnomalySeverity::Critical);
    }

    #[test]
    fn drift_with_zero_stddev_never_fires() {
        let mut b = baseline("latency_ms");
        b.stddev = 0.0;
        assert!(detect_drift("acme", "prod", &b, 9999.0).is_none());
    }

    #[test]
    fn latency_regression_tiers() {
        let b = baseline("latency_ms");
        assert!(detect_latency_regression("acme", "prod", &b, 170.0).unwrap().severity == AnomalySeverity::Medium);
        assert!(detect_latency_regression("acme", "prod", &b, 195.0).unwrap().severity == AnomalySeverity::High);
        assert!(detect_latency_regression("acme", "prod", &b, 225.0).unwrap().severity == AnomalySeverity::Critical);
        assert!(detect_latency_regression("acme", "prod", &b, 150.0).is_none());
    }

    #[test]
    fn error_rate_regression_tiers() {
        let a = detect_error_rate_regression("acme", "prod", "error_rate", 0.01, 0.021).unwrap();
        assert_eq!(a.severity, AnomalySeverity::Medium);
        let a = detect_error_rate_regression("acme", "prod", "error_rate", 0.01, 0.04).unwrap();
        assert_eq!(a.severity, AnomalySeverity::High);
    }

    #[test]
    fn traffic_spike_tiers() {
        let a = detect_traffic_spike("acme", "prod", "request_count", 100.0, 650.0).unwrap();
        assert_eq!(a.severity, AnomalySeverity::Critical);
        assert!(detect_traffic_spike("acme", "prod", "request_count", 100.0, 150.0).is_none());
    }

    #[test]
    fn sla_breach_tiers() {
        assert_eq!(detect_sla_breach("acme", "prod", 0.02, 99.95).unwrap().severity, AnomalySeverity::High);
        assert_eq!(detect_sla_breach("acme", "prod", 0.06, 99.95).unwrap().severity, AnomalySeverity::Critical);
        assert!(detect_sla_breach("acme", "prod", 0.001, 99.99).is_none());
    }
}
