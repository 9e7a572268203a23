//! Trust Score weighting (§4.10).
//!
//! Trust Score is a weighted combination of four [0,1] factors; weights are
//! configurable but must sum to 1. Default 0.3/0.3/0.2/0.2, fixed here as
//! per DESIGN.md's resolution of the weighting configuration.

use agentkern_common::{ControlPlaneError, Result};

#[derive(Debug, Clone, Copy)]
pub struct TrustWeights {
    pub reliability: f64,
    pub policy_adherence: f64,
    pub context_freshness: f64,
    pub risk_exposure: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            reliability: 0.3,
            policy_adherence: 0.3,
            context_freshness: 0.2,
            risk_exposure: 0.2,
        }
    }
}

impl TrustWeights {
    /// Validates weights sum to 1 within floating-point tolerance.
    pub fn validate(&self) -> Result<()> {
        let sum = self.reliability + self.policy_adherence + self.context_freshness + self.risk_exposure;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ControlPlaneError::Configuration(format!("trust weights must sum to 1.0, got {sum}")));
        }
        Ok(())
    }
}

/// Combines the four [0,1] factors into a Trust Score in [0,100].
/// `reliability` = 1 - error_rate, `policy_adherence` = 1 - policy_violation_rate,
/// `context_freshness` = fraction of workflows within the freshness SLO,
/// `risk_exposure_inverse` = 1 - normalized risk exposure (already inverted
/// by the caller so the weight always contributes positively).
pub fn compute_trust_score(weights: &TrustWeights, reliability: f64, policy_adherence: f64, context_freshness: f64, risk_exposure_inverse: f64) -> f64 {
    let score = weights.reliability * reliability.clamp(0.0, 1.0)
        + weights.policy_adherence * policy_adherence.clamp(0.0, 1.0)
        + weights.context_freshness * context_freshness.clamp(0.0, 1.0)
        + weights.risk_exposure * risk_exposure_inverse.clamp(0.0, 1.0);
    (score * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        TrustWeights::default().validate().unwrap();
    }

    #[test]
    fn unbalanced_weights_fail_validation() {
        let weights = TrustWeights { reliability: 0.5, policy_adherence: 0.5, context_freshness: 0.5, risk_exposure: 0.5 };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn perfect_factors_yield_max_score() {
        let score = compute_trust_score(&TrustWeights::default(), 1.0, 1.0, 1.0, 1.0);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn worst_factors_yield_zero_score() {
        let score = compute_trust_score(&TrustWeights::default(), 0.0, 0.0, 0.0, 0.0);
        assert!((score - 0.0).abs() < 1e-9);
    }
}
