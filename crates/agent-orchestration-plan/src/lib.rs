#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use agent_orchestration_domain::{
    ensure_non_empty, hash_bytes, hash_json, AgentSpec, OrchestrationType,
};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declarative description of one dispatch: which agents, which
/// orchestration type, which tenant, and the shared input payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DispatchPlan {
    pub plan_name: String,
    pub orchestration: OrchestrationType,
    pub business_id: String,
    #[serde(default)]
    pub input: Value,
    pub agents: Vec<AgentSpec>,
}

/// A validated plan plus content hashes for provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEnvelope {
    pub source_yaml_hash: String,
    pub plan_hash: String,
    pub plan: DispatchPlan,
    pub plan_json: Value,
}

/// Load dispatch-plan YAML from disk and validate it.
///
/// # Errors
/// Returns an error when the file cannot be read, parsed, or validated.
pub fn load_plan_from_path(path: &Path) -> Result<PlanEnvelope> {
    let content = fs::read_to_string(path)?;
    parse_plan_yaml(&content)
}

/// Parse dispatch-plan YAML into a validated envelope with stable hashes.
///
/// # Errors
/// Returns an error when YAML parsing, validation, or serialization fails.
pub fn parse_plan_yaml(yaml: &str) -> Result<PlanEnvelope> {
    let source_yaml_hash = hash_bytes(yaml.as_bytes());
    let plan: DispatchPlan =
        serde_yaml::from_str(yaml).map_err(|err| anyhow!("invalid plan YAML structure: {err}"))?;

    validate_plan(&plan)?;

    let plan_json = serde_json::to_value(&plan)?;
    let plan_hash = hash_json(&plan_json)?;

    Ok(PlanEnvelope {
        source_yaml_hash,
        plan_hash,
        plan,
        plan_json,
    })
}

/// Check plan shape: non-empty identifiers and unique agent keys.
///
/// A plan with zero agents is valid; the dispatcher completes such a run
/// immediately.
///
/// # Errors
/// Returns an error describing the first violated constraint.
pub fn validate_plan(plan: &DispatchPlan) -> Result<()> {
    ensure_non_empty("plan_name", &plan.plan_name)?;
    ensure_non_empty("business_id", &plan.business_id)?;

    let mut agent_keys = BTreeSet::new();
    for agent in &plan.agents {
        ensure_non_empty("agent_key", &agent.agent_key)?;
        ensure_non_empty("invoker", &agent.invoker)?;
        ensure_non_empty("model_id", &agent.model_id)?;
        if !agent_keys.insert(agent.agent_key.clone()) {
            return Err(anyhow!("duplicate agent_key: {}", agent.agent_key));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_plan_yaml;
    use agent_orchestration_domain::OrchestrationType;

    const PLAN_YAML: &str = r#"
plan_name: triage
orchestration: parallel
business_id: acme
input:
  text: "inbound lead"
agents:
  - agent_key: classifier
    invoker: mock
    model_id: model-x
  - agent_key: scorer
    invoker: mock
    model_id: model-y
    params:
      fail: false
"#;

    #[test]
    fn plan_hash_is_stable() {
        let first = parse_plan_yaml(PLAN_YAML);
        let second = parse_plan_yaml(PLAN_YAML);
        assert!(first.is_ok());
        assert!(second.is_ok());
        match (first, second) {
            (Ok(first), Ok(second)) => {
                assert_eq!(first.plan_hash, second.plan_hash);
                assert_eq!(first.source_yaml_hash, second.source_yaml_hash);
                assert_eq!(first.plan.orchestration, OrchestrationType::Parallel);
                assert_eq!(first.plan.agents.len(), 2);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn duplicate_agent_key_rejected() {
        let yaml = r"
plan_name: dup
orchestration: chain
business_id: acme
agents:
  - agent_key: a
    invoker: mock
    model_id: m
  - agent_key: a
    invoker: mock
    model_id: m
";
        assert!(parse_plan_yaml(yaml).is_err());
    }

    #[test]
    fn unknown_field_rejected() {
        let yaml = r"
plan_name: extra
orchestration: parallel
business_id: acme
agents: []
surprise: true
";
        assert!(parse_plan_yaml(yaml).is_err());
    }

    #[test]
    fn empty_business_id_rejected() {
        let yaml = r#"
plan_name: blank
orchestration: parallel
business_id: "  "
agents: []
"#;
        assert!(parse_plan_yaml(yaml).is_err());
    }

    #[test]
    fn zero_agent_plan_is_valid() {
        let yaml = r"
plan_name: empty
orchestration: consensus
business_id: acme
agents: []
";
        let parsed = parse_plan_yaml(yaml);
        assert!(parsed.is_ok());
    }

    #[test]
    fn unknown_orchestration_rejected() {
        let yaml = r"
plan_name: bad
orchestration: tournament
business_id: acme
agents: []
";
        assert!(parse_plan_yaml(yaml).is_err());
    }
}
