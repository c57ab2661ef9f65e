#![forbid(unsafe_code)]

use anyhow::Result;
use agent_orchestration_domain::{
    ExecutionId, ExecutionRecord, ExecutionStatus, MessageId, MessageRecord, MessageStatus,
    NewExecution, NewMessage, OrchestrationType, RunId, RunProvenance, RunRecord, RunStatus,
};
use serde_json::Value;

/// Default window for most-recent-first execution listings.
pub const DEFAULT_EXECUTION_WINDOW: usize = 100;

/// Append-only record of individual agent attempts.
///
/// Rows are immutable once written; every read is scoped to a tenant.
pub trait ExecutionLedger {
    #[allow(clippy::missing_errors_doc)]
    fn record_execution(&self, new: &NewExecution) -> Result<ExecutionId>;

    #[allow(clippy::missing_errors_doc)]
    fn list_executions(
        &self,
        business_id: &str,
        agent_key: &str,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>>;

    #[allow(clippy::missing_errors_doc)]
    fn list_executions_for_run(
        &self,
        business_id: &str,
        run_id: RunId,
    ) -> Result<Vec<ExecutionRecord>>;
}

/// Tracks one orchestration invocation: `running -> completed | failed`, once.
pub trait RunTracker {
    #[allow(clippy::missing_errors_doc)]
    fn start_run(
        &self,
        business_id: &str,
        orchestration_type: OrchestrationType,
        agent_count: u32,
    ) -> Result<RunId>;

    /// Attach engine/plan provenance to a run.
    ///
    /// # Errors
    /// Fails when the run is unknown.
    fn set_run_provenance(&self, run_id: RunId, provenance: &RunProvenance) -> Result<()>;

    /// Increment the success or failure counter for a running run.
    ///
    /// Field-level increment only; never a whole-record overwrite, so
    /// interleaved calls from concurrently-completing agents are safe.
    ///
    /// # Errors
    /// Fails when the run is unknown, already terminal, or the counters
    /// would exceed `agent_count`.
    fn record_agent_outcome(&self, run_id: RunId, outcome: ExecutionStatus) -> Result<()>;

    /// Move a run out of `running` exactly once.
    ///
    /// # Errors
    /// Finalizing twice, finalizing a non-running run, or finalizing back
    /// to `running` is an invalid-transition error; the first terminal
    /// state is left untouched.
    fn finalize_run(
        &self,
        run_id: RunId,
        status: RunStatus,
        duration_ms: u64,
        error: Option<&str>,
    ) -> Result<()>;

    #[allow(clippy::missing_errors_doc)]
    fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>>;

    #[allow(clippy::missing_errors_doc)]
    fn list_runs(&self, business_id: &str) -> Result<Vec<RunRecord>>;
}

/// Directed async hand-off between two agents: `pending -> completed | failed`.
///
/// No FIFO guarantee between a (from, to) pair; callers needing ordering
/// serialize through the chain orchestration type instead.
pub trait MessageChannel {
    #[allow(clippy::missing_errors_doc)]
    fn send(&self, new: &NewMessage) -> Result<MessageId>;

    /// # Errors
    /// Fails when the message is unknown or already terminal; the existing
    /// terminal state is left untouched.
    fn complete(&self, message_id: MessageId, response: &Value) -> Result<()>;

    /// # Errors
    /// Fails when the message is unknown or already terminal; the existing
    /// terminal state is left untouched.
    fn fail(&self, message_id: MessageId, error_reason: &str) -> Result<()>;

    #[allow(clippy::missing_errors_doc)]
    fn get_message(&self, message_id: MessageId) -> Result<Option<MessageRecord>>;

    #[allow(clippy::missing_errors_doc)]
    fn list_messages(
        &self,
        business_id: &str,
        status: Option<MessageStatus>,
    ) -> Result<Vec<MessageRecord>>;
}

/// Combined storage seam the dispatcher and CLI program against.
pub trait OrchestrationStore: ExecutionLedger + RunTracker + MessageChannel {
    #[allow(clippy::missing_errors_doc)]
    fn migrate(&self) -> Result<()>;
}
