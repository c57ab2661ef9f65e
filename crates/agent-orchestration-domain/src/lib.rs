#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use ulid::Ulid;

pub type DateTimeUtc = OffsetDateTime;

/// Caller-mistake taxonomy surfaced synchronously and never retried here.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum OrchestrationError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("dispatch error: {0}")]
    Dispatch(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RunId(pub Ulid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ExecutionId(pub Ulid);

impl ExecutionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MessageId(pub Ulid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Completed,
    Failed,
}

impl MessageStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationType {
    Parallel,
    Chain,
    Consensus,
}

impl OrchestrationType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Chain => "chain",
            Self::Consensus => "consensus",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "parallel" => Some(Self::Parallel),
            "chain" => Some(Self::Chain),
            "consensus" => Some(Self::Consensus),
            _ => None,
        }
    }
}

/// Invocable capability definition resolved from a dispatch plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgentSpec {
    pub agent_key: String,
    pub invoker: String,
    pub model_id: String,
    #[serde(default)]
    pub params: Value,
}

/// Input for one ledger append. The ledger validates before writing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewExecution {
    pub run_id: RunId,
    pub business_id: String,
    pub agent_key: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// One agent attempt inside one run. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRecord {
    pub execution_id: ExecutionId,
    pub run_id: RunId,
    pub business_id: String,
    pub agent_key: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTimeUtc,
}

/// One parallel/chain/consensus invocation, owning its execution rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: RunId,
    pub business_id: String,
    pub orchestration_type: OrchestrationType,
    pub agent_count: u32,
    pub status: RunStatus,
    pub duration_ms: Option<u64>,
    pub success_count: u32,
    pub failure_count: u32,
    pub error: Option<String>,
    pub engine_version: Option<String>,
    pub cli_args_json: Option<Value>,
    pub plan_hash: Option<String>,
    pub source_yaml_hash: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Where a run came from: engine build, invocation arguments, plan hashes.
///
/// Attached once by the dispatcher right after the run is started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunProvenance {
    pub engine_version: String,
    pub cli_args_json: Value,
    pub plan_hash: Option<String>,
    pub source_yaml_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMessage {
    pub business_id: String,
    pub from_agent_key: String,
    pub to_agent_key: String,
    pub message: Value,
    pub context: Option<Value>,
}

/// One directed hand-off between two agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub message_id: MessageId,
    pub business_id: String,
    pub from_agent_key: String,
    pub to_agent_key: String,
    pub message: Value,
    pub context: Option<Value>,
    pub status: MessageStatus,
    pub response: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Derived statistics over a window of executions for one agent. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightSummary {
    pub agent_key: String,
    pub total_executions: usize,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub error_patterns: BTreeMap<String, u64>,
    pub recommendations: Vec<String>,
}

#[must_use]
pub fn now_utc() -> DateTimeUtc {
    OffsetDateTime::now_utc()
}

#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a JSON value with stable `serde_json` serialization + SHA-256.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn hash_json(value: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hash_bytes(&bytes))
}

/// Ensure a string field is non-empty after trimming.
///
/// # Errors
/// Returns an error when the provided value is empty/whitespace.
pub fn ensure_non_empty(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{field_name} MUST be non-empty"));
    }
    Ok(())
}

/// Check the result/error shape of a ledger append before it is written.
///
/// `Failed` requires a non-empty error; `Success` must not carry one.
///
/// # Errors
/// Returns `OrchestrationError::Validation` when the shape is malformed.
pub fn validate_new_execution(new: &NewExecution) -> Result<(), OrchestrationError> {
    if new.business_id.trim().is_empty() {
        return Err(OrchestrationError::Validation(
            "business_id MUST be non-empty".to_string(),
        ));
    }
    if new.agent_key.trim().is_empty() {
        return Err(OrchestrationError::Validation(
            "agent_key MUST be non-empty".to_string(),
        ));
    }
    match new.status {
        ExecutionStatus::Failed => {
            let has_error = new
                .error
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty());
            if !has_error {
                return Err(OrchestrationError::Validation(
                    "failed execution requires a non-empty error".to_string(),
                ));
            }
        }
        ExecutionStatus::Success => {
            if new.error.is_some() {
                return Err(OrchestrationError::Validation(
                    "successful execution must not carry an error".to_string(),
                ));
            }
        }
    }
    Ok(())
}
