//! Self-healing scan (§4.11).
//!
//! Every `scan_interval` (default hourly), identifies stale agents, stuck
//! workflows, and breakers open beyond their expected recovery, and applies
//! the escalating remediation appropriate to how far each has overrun.
//! Grounded on the teacher's `DRScheduler` periodic-job shape (config +
//! `run_drill`-style single-pass entry point callable both on a timer and
//! ad hoc) and `EscalationTrigger` severity tiering.

use agentkern_common::{Agent, AgentStatus, Result, SELFHEAL_OPERATOR};
use agentkern_resilience::CircuitBreakerManager;
use agentkern_store::{ContextStore, DeadLetterQueue, QuarantineLedger};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::action::{RemediationFinding, RemediationTier, ResourceKind};

#[derive(Debug, Clone, Copy)]
pub struct SelfHealConfig {
    pub scan_interval: StdDuration,
    pub telemetry_staleness_slo: Duration,
    pub workflow_stuck_timeout: Duration,
    pub breaker_stuck_multiplier: i32,
}

impl Default for SelfHealConfig {
    fn default() -> Self {
        Self {
            scan_interval: StdDuration::from_secs(3600),
            telemetry_staleness_slo: Duration::hours(1),
            workflow_stuck_timeout: Duration::minutes(30),
            breaker_stuck_multiplier: 3,
        }
    }
}

pub struct SelfHealController {
    store: Arc<dyn ContextStore>,
    dlq: Arc<DeadLetterQueue>,
    quarantine: Arc<QuarantineLedger>,
    breakers: Arc<CircuitBreakerManager>,
    config: SelfHealConfig,
}

impl SelfHealController {
    pub fn new(store: Arc<dyn ContextStore>, dlq: Arc<DeadLetterQueue>, quarantine: Arc<QuarantineLedger>, breakers: Arc<CircuitBreakerManager>, config: SelfHealConfig) -> Self {
        Self { store, dlq, quarantine, breakers, config }
    }

    /// Run a single scan-and-remediate pass for `(tenant_id, env)`. Exposed
    /// standalone so it can be invoked ad hoc (e.g. from an admin endpoint)
    /// as well as on the periodic schedule.
    pub async fn scan_once(&self, tenant_id: &str, env: &str, now: DateTime<Utc>) -> Result<Vec<RemediationFinding>> {
        let mut findings = Vec::new();

        for agent in self.store.list_agents(tenant_id, env).await? {
            if let Some(finding) = self.check_stale_agent(tenant_id, env, &agent, now).await? {
                findings.push(finding);
            }
        }

        for workflow in self.store.list_workflows(tenant_id, env).await? {
            if workflow.status != "running" {
                continue;
            }
            let elapsed = now - workflow.last_run_at;
            let ratio = elapsed.num_seconds() as f64 / self.config.workflow_stuck_timeout.num_seconds().max(1) as f64;
            if let Some(tier) = RemediationTier::from_overrun_ratio(ratio) {
                let reason = format!("workflow stuck in running for {}s (timeout {}s)", elapsed.num_seconds(), self.config.workflow_stuck_timeout.num_seconds());
                self.apply_workflow_remediation(tenant_id, env, &workflow.id, tier, &reason).await?;
                findings.push(RemediationFinding { resource_kind: ResourceKind::Workflow, resource_id: workflow.id.clone(), tier, reason });
            }
        }

        for target in self.breakers.targets() {
            let breaker = self.breakers.get_or_create(&target);
            let snapshot = breaker.snapshot();
            if snapshot.state != "open" {
                continue;
            }
            let Some(opened_at) = snapshot.opened_at else { continue };
            let expected_recovery = Duration::seconds(60) * self.config.breaker_stuck_multiplier;
            let elapsed = now - opened_at;
            if elapsed >= expected_recovery {
                let reason = format!("breaker for {target} open for {}s, beyond expected recovery", elapsed.num_seconds());
                self.dlq
                    .push(tenant_id, env, &target, &serde_json::json!({"breaker_target": target}), &reason, &format!("selfheal-breaker-{target}"))
                    .await?;
                findings.push(RemediationFinding { resource_kind: ResourceKind::Breaker, resource_id: target, tier: RemediationTier::DlqTicket, reason });
            }
        }

        Ok(findings)
    }

    async fn check_stale_agent(&self, tenant_id: &str, env: &str, agent: &Agent, now: DateTime<Utc>) -> Result<Option<RemediationFinding>> {
        if agent.status == AgentStatus::Quarantined {
            return Ok(None);
        }
        let latest = self.store.list_telemetry(tenant_id, env, &agent.id, 1).await?;
        let last_seen = latest.first().map(|r| r.ts).unwrap_or(agent.updated_at);
        let elapsed = now - last_seen;
        let ratio = elapsed.num_seconds() as f64 / self.config.telemetry_staleness_slo.num_seconds().max(1) as f64;
        let Some(tier) = RemediationTier::from_overrun_ratio(ratio) else { return Ok(None) };

        let reason = format!("agent {} telemetry stale for {}s (SLO {}s)", agent.id, elapsed.num_seconds(), self.config.telemetry_staleness_slo.num_seconds());
        self.apply_agent_remediation(tenant_id, env, agent, tier, &reason).await?;
        Ok(Some(RemediationFinding { resource_kind: ResourceKind::Agent, resource_id: agent.id.clone(), tier, reason }))
    }

    async fn apply_agent_remediation(&self, tenant_id: &str, env: &str, agent: &Agent, tier: RemediationTier, reason: &str) -> Result<()> {
        match tier {
            RemediationTier::Resubmit => {
                tracing::info!(agent_id = %agent.id, "self-heal: marking agent for resubmission");
            }
            RemediationTier::DlqTicket => {
                self.dlq.push(tenant_id, env, "selfheal", &serde_json::json!({"agent_id": agent.id}), reason, &format!("selfheal-agent-{}", agent.id)).await?;
            }
            RemediationTier::Suspend => {
                let mut updated = agent.clone();
                updated.status = AgentStatus::Suspended;
                self.store.upsert_agent(env, &updated, agentkern_store::Expected::at(agent.updated_at)).await?;
                tracing::warn!(agent_id = %agent.id, %reason, "self-heal: suspended agent");
            }
            RemediationTier::Quarantine => {
                self.quarantine.open(tenant_id, env, &agent.id, reason).await?;
                let mut updated = agent.clone();
                updated.status = AgentStatus::Quarantined;
                self.store.upsert_agent(env, &updated, agentkern_store::Expected::at(agent.updated_at)).await?;
                tracing::error!(agent_id = %agent.id, %reason, "self-heal: quarantined agent");
            }
        }
        Ok(())
    }

    async fn apply_workflow_remediation(&self, tenant_id: &str, env: &str, workflow_id: &str, tier: RemediationTier, reason: &str) -> Result<()> {
        match tier {
            RemediationTier::Resubmit => {
                tracing::info!(%workflow_id, "self-heal: marking workflow for resubmission");
            }
            RemediationTier::DlqTicket | RemediationTier::Suspend => {
                self.dlq.push(tenant_id, env, "selfheal", &serde_json::json!({"workflow_id": workflow_id}), reason, &format!("selfheal-workflow-{workflow_id}")).await?;
            }
            RemediationTier::Quarantine => {
                self.quarantine.open(tenant_id, env, workflow_id, reason).await?;
                tracing::error!(%workflow_id, %reason, "self-heal: quarantined stuck workflow");
            }
        }
        Ok(())
    }

    /// Explicit quarantine release: requires the resource to currently be
    /// quarantined, always attributed to an operator.
    pub async fn release_quarantine(&self, tenant_id: &str, env: &str, resource_id: &str, operator: &str, reason: &str) -> Result<()> {
        self.quarantine.release(tenant_id, env, resource_id, operator, reason).await?;
        if let Ok(agent) = self.store.get_agent(tenant_id, env, resource_id).await {
            if agent.status == AgentStatus::Quarantined {
                let mut updated = agent.clone();
                updated.status = AgentStatus::Active;
                self.store.upsert_agent(env, &updated, agentkern_store::Expected::at(agent.updated_at)).await?;
            }
        }
        tracing::info!(%resource_id, %operator, %reason, "self-heal: quarantine released");
        Ok(())
    }

    /// Release on behalf of the controller itself (auto-remediated, not a
    /// human operator) — attributed to `SELFHEAL_OPERATOR` so the trust
    /// engine's Self-Resolution Ratio can count it.
    pub async fn auto_release_quarantine(&self, tenant_id: &str, env: &str, resource_id: &str, reason: &str) -> Result<()> {
        self.release_quarantine(tenant_id, env, resource_id, SELFHEAL_OPERATOR, reason).await
    }
}

/// Spawn a background task that scans `(tenant_id, env)` every
/// `config.scan_interval` forever.
pub fn spawn_scan_loop(controller: Arc<SelfHealController>, tenant_id: String, env: String, scan_interval: StdDuration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(scan_interval);
        loop {
            timer.tick().await;
            match controller.scan_once(&tenant_id, &env, Utc::now()).await {
                Ok(findings) if !findings.is_empty() => {
                    tracing::info!(tenant_id = %tenant_id, env = %env, count = findings.len(), "self-heal scan applied remediations");
                }
                Ok(_) => {}
                Err(err) => tracing::error!(tenant_id = %tenant_id, env = %env, error = %err, "self-heal scan failed"),
            }
        }
    })
}
