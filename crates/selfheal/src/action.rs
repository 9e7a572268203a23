//! Remediation actions (§4.11), escalating by severity.
//!
//! Grounded on the teacher's `EscalationLevel` (Low/Medium/High/Critical)
//! tiering in `arbiter::escalation::triggers`, generalized from a single
//! trust-score threshold to four concrete remediations ordered by
//! severity: resubmit, DLQ ticket, suspend, quarantine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationTier {
    Resubmit,
    DlqTicket,
    Suspend,
    Quarantine,
}

impl std::fmt::Display for RemediationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Resubmit => "resubmit",
            Self::DlqTicket => "dlq_ticket",
            Self::Suspend => "suspend",
            Self::Quarantine => "quarantine",
        };
        write!(f, "{s}")
    }
}

impl RemediationTier {
    /// Escalation tier from how many multiples of the relevant SLO/timeout
    /// have elapsed. `ratio < 1.0` means within SLO (no finding); tiers
    /// widen geometrically (1x/2x/4x/8x) matching the teacher's
    /// `default_timeout_secs` halving pattern, generalized to a ratio scale
    /// that works for both telemetry staleness and workflow stuckness.
    pub fn from_overrun_ratio(ratio: f64) -> Option<Self> {
        if ratio < 1.0 {
            None
        } else if ratio < 2.0 {
            Some(Self::Resubmit)
        } else if ratio < 4.0 {
            Some(Self::DlqTicket)
        } else if ratio < 8.0 {
            Some(Self::Suspend)
        } else {
            Some(Self::Quarantine)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Agent,
    Workflow,
    Breaker,
}

/// One remediation the controller decided to take (or attempted) during a
/// scan. Recorded for audit regardless of whether `apply` actually ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationFinding {
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    pub tier: RemediationTier,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_slo_is_no_finding() {
        assert_eq!(RemediationTier::from_overrun_ratio(0.5), None);
        assert_eq!(RemediationTier::from_overrun_ratio(0.999), None);
    }

    #[test]
    fn tiers_escalate_at_geometric_thresholds() {
        assert_eq!(RemediationTier::from_overrun_ratio(1.0), Some(RemediationTier::Resubmit));
        assert_eq!(RemediationTier::from_overrun_ratio(1.9), Some(RemediationTier::Resubmit));
        assert_eq!(RemediationTier::from_overrun_ratio(2.0), Some(RemediationTier::DlqTicket));
        assert_eq!(RemediationTier::from_overrun_ratio(3.9), Some(RemediationTier::DlqTicket));
        assert_eq!(RemediationTier::from_overrun_ratio(4.0), Some(RemediationTier::Suspend));
        assert_eq!(RemediationTier::from_overrun_ratio(7.9), Some(RemediationTier::Suspend));
        assert_eq!(RemediationTier::from_overrun_ratio(8.0), Some(RemediationTier::Quarantine));
        assert_eq!(RemediationTier::from_overrun_ratio(100.0), Some(RemediationTier::Quarantine));
    }

    #[test]
    fn tiers_are_ordered_by_severity() {
        assert!(RemediationTier::Resubmit < RemediationTier::DlqTicket);
        assert!(RemediationTier::DlqTicket < RemediationTier::Suspend);
        assert!(RemediationTier::Suspend < RemediationTier::Quarantine);
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(RemediationTier::Resubmit.to_string(), "resubmit");
        assert_eq!(RemediationTier::Quarantine.to_string(), "quarantine");
    }
}
