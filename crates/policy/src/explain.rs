//! Human-readable decision explanations.
//!
//! Per §4.6: "the engine can emit a human-readable explanation including
//! per-factor impact and the list of policies evaluated (this serves GDPR
//! Article-22 disclosures)."

use agentkern_common::{Decision, DecisionTag};

pub fn explain(decision: &Decision) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Decision for request {}: {}", decision.request_id, decision_tag_str(decision.decision)));
    lines.push(format!("Policies evaluated: {}", decision.policies_evaluated.join(", ")));

    if decision.policy_violations.is_empty() {
        lines.push("No blocking violations.".to_string());
    } else {
        lines.push("Blocking violations:".to_string());
        for v in &decision.policy_violations {
            lines.push(format!("  - [{}/{}] {}", v.policy_id, v.rule_id, v.message));
        }
    }

    if !decision.modifications.is_empty() {
        lines.push(format!("Fields modified: {}", decision.modifications.keys().cloned().collect::<Vec<_>>().join(", ")));
    }

    if !decision.warnings.is_empty() {
        lines.push("Warnings:".to_string());
        for w in &decision.warnings {
            lines.push(format!("  - {w}"));
        }
    }

    lines.push(format!("Evaluated in {:.2}ms", decision.execution_time_ms));
    lines.join("\n")
}

fn decision_tag_str(tag: DecisionTag) -> &'static str {
    match tag {
        DecisionTag::Allow => "allow",
        DecisionTag::AllowWithModifications => "allow_with_modifications",
        DecisionTag::Deny => "deny",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_common::PolicyViolationDetail;
    use std::collections::HashMap;

    #[test]
    fn explanation_includes_violation_detail() {
        let decision = Decision {
            request_id: "r1".into(),
            decision: DecisionTag::Deny,
            policy_violations: vec![PolicyViolationDetail {
                policy_id: "p1".into(),
                rule_id: "prompt-injection-detection".into(),
                message: "matched pattern".into(),
            }],
            modifications: HashMap::new(),
            warnings: vec![],
            policies_evaluated: vec!["p1".into()],
            execution_time_ms: 1.2,
        };
        let text = explain(&decision);
        assert!(text.contains("deny"));
        assert!(text.contains("prompt-injection-detection"));
    }
}
