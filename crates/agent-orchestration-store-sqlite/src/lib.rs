#![forbid(unsafe_code)]

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use agent_orchestration_domain::{
    now_utc, validate_new_execution, ExecutionId, ExecutionRecord, ExecutionStatus, MessageId,
    MessageRecord, MessageStatus, NewExecution, NewMessage, OrchestrationError, OrchestrationType,
    RunId, RunProvenance, RunRecord, RunStatus,
};
use agent_orchestration_store_core::{
    ExecutionLedger, MessageChannel, OrchestrationStore, RunTracker,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use time::OffsetDateTime;
use ulid::Ulid;

const STORE_SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
  run_id TEXT PRIMARY KEY,
  business_id TEXT NOT NULL,
  orchestration_type TEXT NOT NULL CHECK (orchestration_type IN ('parallel','chain','consensus')),
  agent_count INTEGER NOT NULL CHECK (agent_count >= 0),
  status TEXT NOT NULL CHECK (status IN ('running','completed','failed')),
  duration_ms INTEGER CHECK (duration_ms IS NULL OR duration_ms >= 0),
  success_count INTEGER NOT NULL DEFAULT 0 CHECK (success_count >= 0),
  failure_count INTEGER NOT NULL DEFAULT 0 CHECK (failure_count >= 0),
  error TEXT,
  engine_version TEXT,
  cli_args_json TEXT,
  plan_hash TEXT,
  source_yaml_hash TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  CHECK (success_count + failure_count <= agent_count)
);

CREATE TABLE IF NOT EXISTS executions (
  execution_id TEXT PRIMARY KEY,
  run_id TEXT NOT NULL,
  business_id TEXT NOT NULL,
  agent_key TEXT NOT NULL,
  status TEXT NOT NULL CHECK (status IN ('success','failed')),
  duration_ms INTEGER NOT NULL CHECK (duration_ms >= 0),
  result_json TEXT,
  error TEXT,
  created_at TEXT NOT NULL,
  CHECK (status <> 'failed' OR (error IS NOT NULL AND length(trim(error)) > 0)),
  CHECK (status <> 'success' OR error IS NULL),
  FOREIGN KEY (run_id) REFERENCES runs(run_id)
);

CREATE TABLE IF NOT EXISTS messages (
  message_id TEXT PRIMARY KEY,
  business_id TEXT NOT NULL,
  from_agent_key TEXT NOT NULL,
  to_agent_key TEXT NOT NULL,
  message_json TEXT NOT NULL,
  context_json TEXT,
  status TEXT NOT NULL CHECK (status IN ('pending','completed','failed')),
  response_json TEXT,
  error TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  CHECK (status <> 'completed' OR response_json IS NOT NULL),
  CHECK (status = 'completed' OR response_json IS NULL)
);

CREATE INDEX IF NOT EXISTS idx_runs_business_created ON runs(business_id, created_at);
CREATE INDEX IF NOT EXISTS idx_executions_agent_window ON executions(business_id, agent_key, created_at);
CREATE INDEX IF NOT EXISTS idx_executions_run ON executions(run_id);
CREATE INDEX IF NOT EXISTS idx_messages_business_status ON messages(business_id, status);

CREATE TRIGGER IF NOT EXISTS trg_executions_no_update
BEFORE UPDATE ON executions
BEGIN
  SELECT RAISE(FAIL, 'executions is append-only');
END;
CREATE TRIGGER IF NOT EXISTS trg_executions_no_delete
BEFORE DELETE ON executions
BEGIN
  SELECT RAISE(FAIL, 'executions is append-only');
END;
";

pub struct SqliteOrchestrationStore {
    conn: Connection,
}

impl SqliteOrchestrationStore {
    /// Open or create the orchestration database and configure local pragmas.
    ///
    /// # Errors
    /// Returns an error if opening the database or applying pragmas fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    fn get_run_row(&self, run_id: RunId) -> Result<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                run_id, business_id, orchestration_type, agent_count,
                status, duration_ms, success_count, failure_count, error,
                engine_version, cli_args_json, plan_hash, source_yaml_hash,
                created_at, updated_at
             FROM runs WHERE run_id = ?1",
        )?;

        let row = stmt
            .query_row(params![run_id.to_string()], run_row_tuple)
            .optional()?;
        row.map(run_record_from_tuple).transpose()
    }

    fn get_message_row(&self, message_id: MessageId) -> Result<Option<MessageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                message_id, business_id, from_agent_key, to_agent_key,
                message_json, context_json, status, response_json,
                error, created_at, updated_at
             FROM messages WHERE message_id = ?1",
        )?;

        let row = stmt
            .query_row(params![message_id.to_string()], message_row_tuple)
            .optional()?;
        row.map(message_record_from_tuple).transpose()
    }

    fn message_transition_error(&self, message_id: MessageId, attempted: &str) -> Result<()> {
        match self.get_message_row(message_id)? {
            None => Err(OrchestrationError::Validation(format!(
                "unknown message {message_id}"
            ))
            .into()),
            Some(message) => Err(OrchestrationError::InvalidTransition(format!(
                "cannot {attempted} message {message_id} in status {}",
                message.status.as_str()
            ))
            .into()),
        }
    }
}

impl ExecutionLedger for SqliteOrchestrationStore {
    fn record_execution(&self, new: &NewExecution) -> Result<ExecutionId> {
        validate_new_execution(new)?;

        let execution_id = ExecutionId::new();
        self.conn
            .execute(
                "INSERT INTO executions(
                    execution_id, run_id, business_id, agent_key,
                    status, duration_ms, result_json, error, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    execution_id.to_string(),
                    new.run_id.to_string(),
                    new.business_id,
                    new.agent_key,
                    new.status.as_str(),
                    i64::try_from(new.duration_ms)
                        .map_err(|_| anyhow!("duration_ms too large for sqlite"))?,
                    new.result.as_ref().map(serde_json::to_string).transpose()?,
                    new.error,
                    rfc3339(now_utc())?,
                ],
            )
            .context("failed to append execution")?;

        Ok(execution_id)
    }

    fn list_executions(
        &self,
        business_id: &str,
        agent_key: &str,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                execution_id, run_id, business_id, agent_key,
                status, duration_ms, result_json, error, created_at
             FROM executions
             WHERE business_id = ?1 AND agent_key = ?2
             ORDER BY rowid DESC
             LIMIT ?3",
        )?;

        let limit_i64 =
            i64::try_from(limit).map_err(|_| anyhow!("limit too large for sqlite: {limit}"))?;
        let mut rows = stmt.query(params![business_id, agent_key, limit_i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(execution_record_from_tuple(execution_row_tuple(row)?)?);
        }
        Ok(out)
    }

    fn list_executions_for_run(
        &self,
        business_id: &str,
        run_id: RunId,
    ) -> Result<Vec<ExecutionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                execution_id, run_id, business_id, agent_key,
                status, duration_ms, result_json, error, created_at
             FROM executions
             WHERE business_id = ?1 AND run_id = ?2
             ORDER BY rowid ASC",
        )?;

        let mut rows = stmt.query(params![business_id, run_id.to_string()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(execution_record_from_tuple(execution_row_tuple(row)?)?);
        }
        Ok(out)
    }
}

impl RunTracker for SqliteOrchestrationStore {
    fn start_run(
        &self,
        business_id: &str,
        orchestration_type: OrchestrationType,
        agent_count: u32,
    ) -> Result<RunId> {
        if business_id.trim().is_empty() {
            return Err(
                OrchestrationError::Validation("business_id MUST be non-empty".to_string()).into(),
            );
        }

        let run_id = RunId::new();
        let now = rfc3339(now_utc())?;
        self.conn
            .execute(
                "INSERT INTO runs(
                    run_id, business_id, orchestration_type, agent_count,
                    status, duration_ms, success_count, failure_count,
                    error, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, 'running', NULL, 0, 0, NULL, ?5, ?5)",
                params![
                    run_id.to_string(),
                    business_id,
                    orchestration_type.as_str(),
                    i64::from(agent_count),
                    now,
                ],
            )
            .context("failed to insert run")?;

        Ok(run_id)
    }

    fn set_run_provenance(&self, run_id: RunId, provenance: &RunProvenance) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE runs
                 SET engine_version = ?2, cli_args_json = ?3,
                     plan_hash = ?4, source_yaml_hash = ?5, updated_at = ?6
                 WHERE run_id = ?1",
                params![
                    run_id.to_string(),
                    provenance.engine_version,
                    serde_json::to_string(&provenance.cli_args_json)?,
                    provenance.plan_hash,
                    provenance.source_yaml_hash,
                    rfc3339(now_utc())?,
                ],
            )
            .context("failed to set run provenance")?;

        if updated == 1 {
            return Ok(());
        }
        Err(OrchestrationError::Validation(format!("unknown run {run_id}")).into())
    }

    fn record_agent_outcome(&self, run_id: RunId, outcome: ExecutionStatus) -> Result<()> {
        let column = match outcome {
            ExecutionStatus::Success => "success_count",
            ExecutionStatus::Failed => "failure_count",
        };

        // Guarded field-level increment; zero affected rows means the guard
        // failed and the precise reason is derived from the current record.
        let updated = self
            .conn
            .execute(
                &format!(
                    "UPDATE runs SET {column} = {column} + 1, updated_at = ?2
                     WHERE run_id = ?1
                       AND status = 'running'
                       AND success_count + failure_count < agent_count"
                ),
                params![run_id.to_string(), rfc3339(now_utc())?],
            )
            .context("failed to record agent outcome")?;

        if updated == 1 {
            return Ok(());
        }

        match self.get_run_row(run_id)? {
            None => {
                Err(OrchestrationError::Validation(format!("unknown run {run_id}")).into())
            }
            Some(run) if run.status != RunStatus::Running => {
                Err(OrchestrationError::InvalidTransition(format!(
                    "cannot record outcome for run {run_id} in status {}",
                    run.status.as_str()
                ))
                .into())
            }
            Some(run) => Err(OrchestrationError::Validation(format!(
                "run {run_id} already has {} outcomes for agent_count {}",
                run.success_count + run.failure_count,
                run.agent_count
            ))
            .into()),
        }
    }

    fn finalize_run(
        &self,
        run_id: RunId,
        status: RunStatus,
        duration_ms: u64,
        error: Option<&str>,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(OrchestrationError::InvalidTransition(format!(
                "cannot finalize run {run_id} back to {}",
                status.as_str()
            ))
            .into());
        }

        let updated = self
            .conn
            .execute(
                "UPDATE runs SET status = ?2, duration_ms = ?3, error = ?4, updated_at = ?5
                 WHERE run_id = ?1 AND status = 'running'",
                params![
                    run_id.to_string(),
                    status.as_str(),
                    i64::try_from(duration_ms)
                        .map_err(|_| anyhow!("duration_ms too large for sqlite"))?,
                    error,
                    rfc3339(now_utc())?,
                ],
            )
            .context("failed to finalize run")?;

        if updated == 1 {
            return Ok(());
        }

        match self.get_run_row(run_id)? {
            None => {
                Err(OrchestrationError::Validation(format!("unknown run {run_id}")).into())
            }
            Some(run) => Err(OrchestrationError::InvalidTransition(format!(
                "cannot finalize run {run_id} already in status {}",
                run.status.as_str()
            ))
            .into()),
        }
    }

    fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>> {
        self.get_run_row(run_id)
    }

    fn list_runs(&self, business_id: &str) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                run_id, business_id, orchestration_type, agent_count,
                status, duration_ms, success_count, failure_count, error,
                engine_version, cli_args_json, plan_hash, source_yaml_hash,
                created_at, updated_at
             FROM runs
             WHERE business_id = ?1
             ORDER BY rowid DESC",
        )?;

        let mut rows = stmt.query(params![business_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(run_record_from_tuple(run_row_tuple(row)?)?);
        }
        Ok(out)
    }
}

impl MessageChannel for SqliteOrchestrationStore {
    fn send(&self, new: &NewMessage) -> Result<MessageId> {
        if new.business_id.trim().is_empty() {
            return Err(
                OrchestrationError::Validation("business_id MUST be non-empty".to_string()).into(),
            );
        }
        if new.from_agent_key.trim().is_empty() || new.to_agent_key.trim().is_empty() {
            return Err(OrchestrationError::Validation(
                "from_agent_key and to_agent_key MUST be non-empty".to_string(),
            )
            .into());
        }

        let message_id = MessageId::new();
        let now = rfc3339(now_utc())?;
        self.conn
            .execute(
                "INSERT INTO messages(
                    message_id, business_id, from_agent_key, to_agent_key,
                    message_json, context_json, status, response_json,
                    error, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', NULL, NULL, ?7, ?7)",
                params![
                    message_id.to_string(),
                    new.business_id,
                    new.from_agent_key,
                    new.to_agent_key,
                    serde_json::to_string(&new.message)?,
                    new.context.as_ref().map(serde_json::to_string).transpose()?,
                    now,
                ],
            )
            .context("failed to send message")?;

        Ok(message_id)
    }

    fn complete(&self, message_id: MessageId, response: &Value) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE messages SET status = 'completed', response_json = ?2, updated_at = ?3
                 WHERE message_id = ?1 AND status = 'pending'",
                params![
                    message_id.to_string(),
                    serde_json::to_string(response)?,
                    rfc3339(now_utc())?,
                ],
            )
            .context("failed to complete message")?;

        if updated == 1 {
            return Ok(());
        }
        self.message_transition_error(message_id, "complete")
    }

    fn fail(&self, message_id: MessageId, error_reason: &str) -> Result<()> {
        if error_reason.trim().is_empty() {
            return Err(OrchestrationError::Validation(
                "error_reason MUST be non-empty".to_string(),
            )
            .into());
        }

        let updated = self
            .conn
            .execute(
                "UPDATE messages SET status = 'failed', error = ?2, updated_at = ?3
                 WHERE message_id = ?1 AND status = 'pending'",
                params![message_id.to_string(), error_reason, rfc3339(now_utc())?],
            )
            .context("failed to fail message")?;

        if updated == 1 {
            return Ok(());
        }
        self.message_transition_error(message_id, "fail")
    }

    fn get_message(&self, message_id: MessageId) -> Result<Option<MessageRecord>> {
        self.get_message_row(message_id)
    }

    fn list_messages(
        &self,
        business_id: &str,
        status: Option<MessageStatus>,
    ) -> Result<Vec<MessageRecord>> {
        let mut out = Vec::new();
        if let Some(status) = status {
            let mut stmt = self.conn.prepare(
                "SELECT
                    message_id, business_id, from_agent_key, to_agent_key,
                    message_json, context_json, status, response_json,
                    error, created_at, updated_at
                 FROM messages
                 WHERE business_id = ?1 AND status = ?2
                 ORDER BY rowid DESC",
            )?;
            let mut rows = stmt.query(params![business_id, status.as_str()])?;
            while let Some(row) = rows.next()? {
                out.push(message_record_from_tuple(message_row_tuple(row)?)?);
            }
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT
                    message_id, business_id, from_agent_key, to_agent_key,
                    message_json, context_json, status, response_json,
                    error, created_at, updated_at
                 FROM messages
                 WHERE business_id = ?1
                 ORDER BY rowid DESC",
            )?;
            let mut rows = stmt.query(params![business_id])?;
            while let Some(row) = rows.next()? {
                out.push(message_record_from_tuple(message_row_tuple(row)?)?);
            }
        }
        Ok(out)
    }
}

impl OrchestrationStore for SqliteOrchestrationStore {
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_V1)
            .context("failed to apply orchestration schema")?;

        let now = rfc3339(now_utc())?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                params![STORE_SCHEMA_VERSION, now],
            )
            .context("failed to record store migration")?;

        Ok(())
    }
}

type RunRowTuple = (
    String,
    String,
    String,
    i64,
    String,
    Option<i64>,
    i64,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn run_row_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRowTuple> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
        row.get(14)?,
    ))
}

fn run_record_from_tuple(tuple: RunRowTuple) -> Result<RunRecord> {
    let (
        run_id_raw,
        business_id,
        orchestration_type_raw,
        agent_count_raw,
        status_raw,
        duration_raw,
        success_raw,
        failure_raw,
        error,
        engine_version,
        cli_args_raw,
        plan_hash,
        source_yaml_hash,
        created_at,
        updated_at,
    ) = tuple;

    Ok(RunRecord {
        run_id: parse_run_id(&run_id_raw)?,
        business_id,
        orchestration_type: OrchestrationType::parse(&orchestration_type_raw)
            .ok_or_else(|| anyhow!("unknown orchestration_type: {orchestration_type_raw}"))?,
        agent_count: u32::try_from(agent_count_raw)
            .map_err(|_| anyhow!("invalid agent_count: {agent_count_raw}"))?,
        status: RunStatus::parse(&status_raw)
            .ok_or_else(|| anyhow!("unknown run status: {status_raw}"))?,
        duration_ms: duration_raw
            .map(|value| u64::try_from(value).map_err(|_| anyhow!("invalid duration_ms: {value}")))
            .transpose()?,
        success_count: u32::try_from(success_raw)
            .map_err(|_| anyhow!("invalid success_count: {success_raw}"))?,
        failure_count: u32::try_from(failure_raw)
            .map_err(|_| anyhow!("invalid failure_count: {failure_raw}"))?,
        error,
        engine_version,
        cli_args_json: cli_args_raw
            .map(|value| serde_json::from_str(&value).context("invalid cli_args_json"))
            .transpose()?,
        plan_hash,
        source_yaml_hash,
        created_at: parse_rfc3339(&created_at)?,
        updated_at: parse_rfc3339(&updated_at)?,
    })
}

type ExecutionRowTuple = (
    String,
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    String,
);

fn execution_row_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionRowTuple> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn execution_record_from_tuple(tuple: ExecutionRowTuple) -> Result<ExecutionRecord> {
    let (
        execution_id_raw,
        run_id_raw,
        business_id,
        agent_key,
        status_raw,
        duration_raw,
        result_raw,
        error,
        created_at,
    ) = tuple;

    Ok(ExecutionRecord {
        execution_id: parse_execution_id(&execution_id_raw)?,
        run_id: parse_run_id(&run_id_raw)?,
        business_id,
        agent_key,
        status: ExecutionStatus::parse(&status_raw)
            .ok_or_else(|| anyhow!("unknown execution status: {status_raw}"))?,
        duration_ms: u64::try_from(duration_raw)
            .map_err(|_| anyhow!("invalid duration_ms: {duration_raw}"))?,
        result: result_raw
            .map(|value| serde_json::from_str(&value).context("invalid result_json"))
            .transpose()?,
        error,
        created_at: parse_rfc3339(&created_at)?,
    })
}

type MessageRowTuple = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn message_row_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRowTuple> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn message_record_from_tuple(tuple: MessageRowTuple) -> Result<MessageRecord> {
    let (
        message_id_raw,
        business_id,
        from_agent_key,
        to_agent_key,
        message_raw,
        context_raw,
        status_raw,
        response_raw,
        error,
        created_at,
        updated_at,
    ) = tuple;

    Ok(MessageRecord {
        message_id: parse_message_id(&message_id_raw)?,
        business_id,
        from_agent_key,
        to_agent_key,
        message: serde_json::from_str(&message_raw).context("invalid message_json")?,
        context: context_raw
            .map(|value| serde_json::from_str(&value).context("invalid context_json"))
            .transpose()?,
        status: MessageStatus::parse(&status_raw)
            .ok_or_else(|| anyhow!("unknown message status: {status_raw}"))?,
        response: response_raw
            .map(|value| serde_json::from_str(&value).context("invalid response_json"))
            .transpose()?,
        error,
        created_at: parse_rfc3339(&created_at)?,
        updated_at: parse_rfc3339(&updated_at)?,
    })
}

fn parse_run_id(value: &str) -> Result<RunId> {
    let ulid = Ulid::from_str(value).map_err(|err| anyhow!("invalid run_id ULID: {err}"))?;
    Ok(RunId(ulid))
}

fn parse_execution_id(value: &str) -> Result<ExecutionId> {
    let ulid = Ulid::from_str(value).map_err(|err| anyhow!("invalid execution_id ULID: {err}"))?;
    Ok(ExecutionId(ulid))
}

fn parse_message_id(value: &str) -> Result<MessageId> {
    let ulid = Ulid::from_str(value).map_err(|err| anyhow!("invalid message_id ULID: {err}"))?;
    Ok(MessageId(ulid))
}

fn rfc3339(value: OffsetDateTime) -> Result<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| anyhow!("invalid datetime format: {err}"))
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .map_err(|err| anyhow!("invalid RFC3339 datetime: {err}"))
}
