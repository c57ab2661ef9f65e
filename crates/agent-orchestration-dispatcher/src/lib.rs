#![forbid(unsafe_code)]

use std::time::Instant;

use agent_orchestration_domain::{
    hash_json, ExecutionRecord, ExecutionStatus, NewExecution, NewMessage, OrchestrationError,
    OrchestrationType, RunId, RunProvenance, RunStatus,
};
use agent_orchestration_plan::PlanEnvelope;
use agent_orchestration_provider::{AgentInvoker, InvocationOutcome, InvocationRequest, InvokerRegistry};
use agent_orchestration_store_core::OrchestrationStore;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Overrides the plan's `business_id` when set.
    pub business_id: Option<String>,
    pub cli_args_json: Value,
    pub engine_version: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            business_id: None,
            cli_args_json: Value::Object(Map::default()),
            engine_version: "agent-orchestration.v0".to_string(),
        }
    }
}

/// What a dispatch accomplished, for callers and operational tooling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchSummary {
    pub run_id: RunId,
    pub status: RunStatus,
    pub orchestration_type: OrchestrationType,
    pub agents_total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub consensus: Option<ConsensusDecision>,
}

/// Advisory reconciliation verdict over consensus participants.
///
/// Never alters recorded outcomes; divergent results stay in the ledger
/// exactly as each agent reported them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsensusDecision {
    pub reconciler: String,
    pub agreed: bool,
    pub successes: usize,
    pub failures: usize,
}

pub trait ConsensusReconciler {
    fn reconciler_name(&self) -> &'static str;

    #[allow(clippy::missing_errors_doc)]
    fn reconcile(&self, participants: &[ExecutionRecord]) -> Result<ConsensusDecision>;
}

/// Agreement requires a strict majority of successful participants.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityReconciler;

impl ConsensusReconciler for MajorityReconciler {
    fn reconciler_name(&self) -> &'static str {
        "majority"
    }

    fn reconcile(&self, participants: &[ExecutionRecord]) -> Result<ConsensusDecision> {
        let successes = participants
            .iter()
            .filter(|row| row.status == ExecutionStatus::Success)
            .count();
        let failures = participants.len() - successes;
        Ok(ConsensusDecision {
            reconciler: self.reconciler_name().to_string(),
            agreed: successes * 2 > participants.len(),
            successes,
            failures,
        })
    }
}

pub struct Dispatcher<'a> {
    store: &'a dyn OrchestrationStore,
    invokers: &'a InvokerRegistry,
    reconciler: &'a dyn ConsensusReconciler,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn OrchestrationStore,
        invokers: &'a InvokerRegistry,
        reconciler: &'a dyn ConsensusReconciler,
    ) -> Self {
        Self {
            store,
            invokers,
            reconciler,
        }
    }

    /// Fan a validated plan out to its agents and consolidate the results.
    ///
    /// Per-agent failures are normal operation and land in the ledger; only
    /// dispatch-level fatal conditions (an unresolvable invoker) finalize the
    /// run as Failed, and those produce no execution rows.
    ///
    /// # Errors
    /// Returns an error when store persistence itself fails.
    #[allow(clippy::needless_pass_by_value, clippy::too_many_lines)]
    pub fn dispatch(
        &self,
        envelope: &PlanEnvelope,
        config: DispatchConfig,
    ) -> Result<DispatchSummary> {
        self.store.migrate()?;

        let plan = &envelope.plan;
        let business_id = config
            .business_id
            .clone()
            .unwrap_or_else(|| plan.business_id.clone());
        let agents_total = plan.agents.len();
        let agent_count = u32::try_from(agents_total).unwrap_or(u32::MAX);

        let run_id = self
            .store
            .start_run(&business_id, plan.orchestration, agent_count)?;
        self.store.set_run_provenance(
            run_id,
            &RunProvenance {
                engine_version: config.engine_version.clone(),
                cli_args_json: config.cli_args_json.clone(),
                plan_hash: Some(envelope.plan_hash.clone()),
                source_yaml_hash: Some(envelope.source_yaml_hash.clone()),
            },
        )?;
        let started = Instant::now();
        let elapsed_ms =
            |started: Instant| u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if agents_total == 0 {
            self.store
                .finalize_run(run_id, RunStatus::Completed, 0, None)?;
            return Ok(DispatchSummary {
                run_id,
                status: RunStatus::Completed,
                orchestration_type: plan.orchestration,
                agents_total: 0,
                succeeded: 0,
                failed: 0,
                skipped: 0,
                consensus: None,
            });
        }

        // Resolve every invoker before touching any agent; a plan that
        // references an unknown invoker must not produce partial executions.
        let mut resolved: Vec<&dyn AgentInvoker> = Vec::with_capacity(agents_total);
        for agent in &plan.agents {
            match self.invokers.resolve(&agent.invoker) {
                Some(invoker) => resolved.push(invoker),
                None => {
                    let error = OrchestrationError::Dispatch(format!(
                        "UnknownInvoker: '{}' requested by agent '{}'",
                        agent.invoker, agent.agent_key
                    ))
                    .to_string();
                    self.store.finalize_run(
                        run_id,
                        RunStatus::Failed,
                        elapsed_ms(started),
                        Some(&error),
                    )?;
                    return Ok(DispatchSummary {
                        run_id,
                        status: RunStatus::Failed,
                        orchestration_type: plan.orchestration,
                        agents_total,
                        succeeded: 0,
                        failed: 0,
                        skipped: agents_total,
                        consensus: None,
                    });
                }
            }
        }

        let input_hash = hash_json(&plan.input)?;
        let mut succeeded = 0_usize;
        let mut failed = 0_usize;

        match plan.orchestration {
            OrchestrationType::Parallel | OrchestrationType::Consensus => {
                for (agent, invoker) in plan.agents.iter().zip(&resolved) {
                    let request = InvocationRequest {
                        run_id,
                        business_id: business_id.clone(),
                        agent_key: agent.agent_key.clone(),
                        model_id: agent.model_id.clone(),
                        params: agent.params.clone(),
                        input: plan.input.clone(),
                        input_hash: input_hash.clone(),
                    };
                    let outcome = invoke_agent(*invoker, &request);
                    self.record_outcome(run_id, &business_id, &agent.agent_key, &outcome)?;
                    match outcome.status {
                        ExecutionStatus::Success => succeeded += 1,
                        ExecutionStatus::Failed => failed += 1,
                    }
                }
            }
            OrchestrationType::Chain => {
                let mut current_input = plan.input.clone();
                let mut pending_handoff = None;
                for (index, (agent, invoker)) in plan.agents.iter().zip(&resolved).enumerate() {
                    let request = InvocationRequest {
                        run_id,
                        business_id: business_id.clone(),
                        agent_key: agent.agent_key.clone(),
                        model_id: agent.model_id.clone(),
                        params: agent.params.clone(),
                        input: current_input.clone(),
                        input_hash: hash_json(&current_input)?,
                    };
                    let outcome = invoke_agent(*invoker, &request);
                    self.record_outcome(run_id, &business_id, &agent.agent_key, &outcome)?;

                    match outcome.status {
                        ExecutionStatus::Success => {
                            succeeded += 1;
                            let result = outcome.result.clone().unwrap_or(Value::Null);
                            if let Some(message_id) = pending_handoff.take() {
                                self.store.complete(message_id, &result)?;
                            }
                            if let Some(next) = plan.agents.get(index + 1) {
                                let message_id = self.store.send(&NewMessage {
                                    business_id: business_id.clone(),
                                    from_agent_key: agent.agent_key.clone(),
                                    to_agent_key: next.agent_key.clone(),
                                    message: result.clone(),
                                    context: Some(json!({
                                        "run_id": run_id.to_string(),
                                        "chain_step": index,
                                    })),
                                })?;
                                pending_handoff = Some(message_id);
                            }
                            current_input = result;
                        }
                        ExecutionStatus::Failed => {
                            failed += 1;
                            let reason = outcome
                                .error
                                .clone()
                                .unwrap_or_else(|| "Unknown: agent reported no error".to_string());
                            if let Some(message_id) = pending_handoff.take() {
                                self.store.fail(message_id, &reason)?;
                            }
                            // Halt: remaining agents are never invoked and
                            // leave no execution rows.
                            break;
                        }
                    }
                }
            }
        }

        let consensus = if plan.orchestration == OrchestrationType::Consensus {
            let participants = self.store.list_executions_for_run(&business_id, run_id)?;
            Some(self.reconciler.reconcile(&participants)?)
        } else {
            None
        };

        self.store
            .finalize_run(run_id, RunStatus::Completed, elapsed_ms(started), None)?;

        Ok(DispatchSummary {
            run_id,
            status: RunStatus::Completed,
            orchestration_type: plan.orchestration,
            agents_total,
            succeeded,
            failed,
            skipped: agents_total - succeeded - failed,
            consensus,
        })
    }

    fn record_outcome(
        &self,
        run_id: RunId,
        business_id: &str,
        agent_key: &str,
        outcome: &InvocationOutcome,
    ) -> Result<()> {
        self.store.record_execution(&NewExecution {
            run_id,
            business_id: business_id.to_string(),
            agent_key: agent_key.to_string(),
            status: outcome.status,
            duration_ms: outcome.duration_ms,
            result: outcome.result.clone(),
            error: outcome.error.clone(),
        })?;
        self.store.record_agent_outcome(run_id, outcome.status)?;
        Ok(())
    }
}

/// Convert an invoker infrastructure error into a failed outcome so it still
/// lands in the ledger as a categorized execution row.
fn invoke_agent(invoker: &dyn AgentInvoker, request: &InvocationRequest) -> InvocationOutcome {
    match invoker.invoke(request) {
        Ok(outcome) => normalize_outcome(outcome),
        Err(err) => InvocationOutcome::failed(0, format!("InvokerError: {err}")),
    }
}

fn normalize_outcome(outcome: InvocationOutcome) -> InvocationOutcome {
    match outcome.status {
        ExecutionStatus::Failed
            if !outcome
                .error
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty()) =>
        {
            InvocationOutcome::failed(
                outcome.duration_ms,
                "Unknown: agent reported no error".to_string(),
            )
        }
        // A success carrying an error is a broken invoker contract; record it
        // as a failure so the contradiction stays visible in the ledger.
        ExecutionStatus::Success if outcome.error.is_some() => {
            let text = outcome.error.unwrap_or_default();
            InvocationOutcome::failed(
                outcome.duration_ms,
                format!("InvokerContract: success outcome carried error: {text}"),
            )
        }
        _ => outcome,
    }
}
