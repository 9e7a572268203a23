//! KPI bundle export (§4.10): Markdown and CSV renderings with traffic
//! lights and narrative commentary derived from deltas against a prior
//! bundle. Grounded on the `writeln!`-into-a-`String` report generation
//! pattern used elsewhere in the example pack's eval reporting, and on the
//! `csv` crate for the tabular rendering.

use agentkern_common::Result;
use std::fmt::Write as _;

use crate::kpi::KpiBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
}

impl TrafficLight {
    fn emoji(self) -> &'static str {
        match self {
            Self::Green => "🟢",
            Self::Yellow => "🟡",
            Self::Red => "🔴",
        }
    }
}

/// Traffic light for a "higher is better" percentage metric.
fn light_high_good(value: f64, yellow_at: f64, red_at: f64) -> TrafficLight {
    if value < red_at {
        TrafficLight::Red
    } else if value < yellow_at {
        TrafficLight::Yellow
    } else {
        TrafficLight::Green
    }
}

/// Traffic light for a "lower is better" percentage metric.
fn light_low_good(value: f64, yellow_at: f64, red_at: f64) -> TrafficLight {
    if value > red_at {
        TrafficLight::Red
    } else if value > yellow_at {
        TrafficLight::Yellow
    } else {
        TrafficLight::Green
    }
}

fn delta_commentary(label: &str, current: f64, previous: Option<f64>) -> String {
    match previous {
        None => format!("{label}: no prior period to compare against."),
        Some(prev) if (current - prev).abs() < 1e-9 => format!("{label} unchanged at {current:.1}."),
        Some(prev) if current > prev => format!("{label} improved from {prev:.1} to {current:.1} (+{:.1}).", current - prev),
        Some(prev) => format!("{label} declined from {prev:.1} to {current:.1} ({:.1}).", current - prev),
    }
}

/// Render the bundle as Markdown. `previous` is an optional prior-period
/// bundle used to derive the narrative commentary from deltas.
pub fn to_markdown(bundle: &KpiBundle, previous: Option<&KpiBundle>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Trust & KPI Report — {} / {}", bundle.tenant_id, bundle.env);
    let _ = writeln!(out, "\nPeriod: {} — {}\n", bundle.from.to_rfc3339(), bundle.to.to_rfc3339());
    let _ = writeln!(out, "| Metric | Value | |");
    let _ = writeln!(out, "|---|---|---|");
    let _ = writeln!(out, "| Trust Score | {:.1} | {} |", bundle.trust_score, light_high_good(bundle.trust_score, 60.0, 40.0).emoji());
    let _ = writeln!(out, "| Risk Avoided ($) | {:.2} | — |", bundle.risk_avoided_usd);
    let _ = writeln!(
        out,
        "| Sync Freshness (%) | {:.1} | {} |",
        bundle.sync_freshness_pct,
        light_high_good(bundle.sync_freshness_pct, 90.0, 75.0).emoji()
    );
    let _ = writeln!(
        out,
        "| Drift Rate (%) | {:.2} | {} |",
        bundle.drift_rate_pct,
        light_low_good(bundle.drift_rate_pct, 2.0, 5.0).emoji()
    );
    let _ = writeln!(
        out,
        "| Compliance SLA (%) | {:.1} | {} |",
        bundle.compliance_sla_pct,
        light_high_good(bundle.compliance_sla_pct, 99.0, 95.0).emoji()
    );
    let _ = writeln!(out, "| Self-Resolution Ratio | {:.2} | — |", bundle.self_resolution_ratio);
    let _ = writeln!(out, "| ROI | {:.2} | — |", bundle.roi);
    let _ = writeln!(out, "| Active Agents | {} | — |", bundle.active_agents);
    let _ = writeln!(out, "| Active Workflows | {} | — |", bundle.active_workflows);
    let _ = writeln!(out, "| Total Events | {} | — |", bundle.total_events);

    let _ = writeln!(out, "\n## Commentary\n");
    let _ = writeln!(out, "- {}", delta_commentary("Trust Score", bundle.trust_score, previous.map(|p| p.trust_score)));
    let _ = writeln!(out, "- {}", delta_commentary("Sync Freshness", bundle.sync_freshness_pct, previous.map(|p| p.sync_freshness_pct)));
    let _ = writeln!(out, "- {}", delta_commentary("Compliance SLA", bundle.compliance_sla_pct, previous.map(|p| p.compliance_sla_pct)));
    let _ = writeln!(out, "- {}", delta_commentary("Drift Rate", bundle.drift_rate_pct, previous.map(|p| p.drift_rate_pct)));

    out
}

/// Render the bundle as a single-row CSV (header + data row).
pub fn to_csv(bundle: &KpiBundle) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "tenant_id",
            "env",
            "from",
            "to",
            "trust_score",
            "risk_avoided_usd",
            "sync_freshness_pct",
            "drift_rate_pct",
            "compliance_sla_pct",
            "self_resolution_ratio",
            "roi",
            "active_agents",
            "active_workflows",
            "total_events",
        ])
        .map_err(|e| agentkern_common::ControlPlaneError::Internal(e.to_string()))?;

    writer
        .write_record([
            bundle.tenant_id.clone(),
            bundle.env.clone(),
            bundle.from.to_rfc3339(),
            bundle.to.to_rfc3339(),
            format!("{:.2}", bundle.trust_score),
            format!("{:.2}", bundle.risk_avoided_usd),
            format!("{:.2}", bundle.sync_freshness_pct),
            format!("{:.2}", bundle.drift_rate_pct),
            format!("{:.2}", bundle.compliance_sla_pct),
            format!("{:.4}", bundle.self_resolution_ratio),
            format!("{:.4}", bundle.roi),
            bundle.active_agents.to_string(),
            bundle.active_workflows.to_string(),
            bundle.total_events.to_string(),
        ])
        .map_err(|e| agentkern_common::ControlPlaneError::Internal(e.to_string()))?;

    let bytes = writer.into_inner().map_err(|e| agentkern_common::ControlPlaneError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| agentkern_common::ControlPlaneError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample() -> KpiBundle {
        KpiBundle {
            tenant_id: "acme".into(),
            env: "prod".into(),
            from: Utc::now(),
            to: Utc::now(),
            trust_score: 82.5,
            risk_avoided_usd: 25000.0,
            sync_freshness_pct: 97.0,
            drift_rate_pct: 1.2,
            compliance_sla_pct: 99.5,
            self_resolution_ratio: 0.6,
            roi: 3.1,
            active_agents: 12,
            active_workflows: 4,
            total_events: 5000,
        }
    }

    #[test]
    fn markdown_contains_all_metrics() {
        let md = to_markdown(&sample(), None);
        assert!(md.contains("Trust Score"));
        assert!(md.contains("82.5"));
        assert!(md.contains("no prior period"));
    }

    #[test]
    fn markdown_with_previous_shows_delta() {
        let mut previous = sample();
        previous.trust_score = 70.0;
        let md = to_markdown(&sample(), Some(&previous));
        assert!(md.contains("improved from 70.0"));
    }

    #[test]
    fn csv_has_header_and_one_data_row() {
        let csv = to_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("tenant_id"));
    }

    #[test]
    fn traffic_lights_tier_correctly() {
        assert_eq!(light_high_good(95.0, 90.0, 75.0), TrafficLight::Green);
        assert_eq!(light_high_good(80.0, 90.0, 75.0), TrafficLight::Yellow);
        assert_eq!(light_high_good(50.0, 90.0, 75.0), TrafficLight::Red);
        assert_eq!(light_low_good(1.0, 2.0, 5.0), TrafficLight::Green);
        assert_eq!(light_low_good(6.0, 2.0, 5.0), TrafficLight::Red);
    }
}
