use std::fs;
use std::path::PathBuf;
use std::process::Command;

use agent_orchestration_domain::{MessageStatus, RunId, RunStatus};
use agent_orchestration_store_core::{
    ExecutionLedger, MessageChannel, OrchestrationStore, RunTracker,
};
use agent_orchestration_store_sqlite::SqliteOrchestrationStore;
use ulid::Ulid;

fn temp_path(name: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ao-cli-test-{}-{}.{}", name, Ulid::new(), ext))
}

fn extract_run_id(stdout: &str) -> Option<RunId> {
    for token in stdout.split_whitespace() {
        if let Some(raw) = token.strip_prefix("run_id=") {
            let parsed = Ulid::from_string(raw).ok()?;
            return Some(RunId(parsed));
        }
    }
    None
}

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_agent-orchestration"))
}

#[test]
fn dispatch_chain_records_executions_and_handoffs() {
    let db = temp_path("chain", "sqlite");
    let plan_path = temp_path("chain-plan", "yaml");
    let plan_yaml = r#"
plan_name: pipeline
orchestration: chain
business_id: acme
input:
  text: "inbound lead"
agents:
  - agent_key: extractor
    invoker: mock
    model_id: model-x
  - agent_key: enricher
    invoker: mock
    model_id: model-y
    params:
      fail: true
      error: "TimeoutError: enrichment upstream"
  - agent_key: notifier
    invoker: mock
    model_id: model-z
"#;
    assert!(fs::write(&plan_path, plan_yaml).is_ok());

    let output = cli()
        .arg("dispatch")
        .arg("--plan")
        .arg(&plan_path)
        .arg("--db")
        .arg(&db)
        .output();
    assert!(output.is_ok());
    let output = output.unwrap_or_else(|_| unreachable!());
    assert!(
        output.status.success(),
        "stdout={}; stderr={}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(stdout.contains("status=completed"));
    assert!(stdout.contains("succeeded=1"));
    assert!(stdout.contains("failed=1"));
    assert!(stdout.contains("skipped=1"));

    let run_id = extract_run_id(&stdout);
    assert!(run_id.is_some());
    let run_id = run_id.unwrap_or_else(|| unreachable!());

    let store = SqliteOrchestrationStore::open(&db).unwrap_or_else(|_| unreachable!());
    let run = store
        .get_run(run_id)
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.success_count, 1);
    assert_eq!(run.failure_count, 1);

    let executions = store
        .list_executions_for_run("acme", run_id)
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(executions.len(), 2);

    let failed_handoffs = store
        .list_messages("acme", Some(MessageStatus::Failed))
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(failed_handoffs.len(), 1);
    assert_eq!(failed_handoffs[0].to_agent_key, "enricher");
}

#[test]
fn insights_command_prints_summary_json() {
    let db = temp_path("insights", "sqlite");
    let plan_path = temp_path("insights-plan", "yaml");
    let plan_yaml = r"
plan_name: solo
orchestration: parallel
business_id: acme
agents:
  - agent_key: classifier
    invoker: mock
    model_id: model-x
";
    assert!(fs::write(&plan_path, plan_yaml).is_ok());

    let dispatch = cli()
        .arg("dispatch")
        .arg("--plan")
        .arg(&plan_path)
        .arg("--db")
        .arg(&db)
        .output();
    assert!(dispatch.is_ok());
    assert!(dispatch.unwrap_or_else(|_| unreachable!()).status.success());

    let output = cli()
        .arg("insights")
        .arg("--db")
        .arg(&db)
        .arg("--business")
        .arg("acme")
        .arg("--agent")
        .arg("classifier")
        .output();
    assert!(output.is_ok());
    let output = output.unwrap_or_else(|_| unreachable!());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();

    let summary: serde_json::Value =
        serde_json::from_str(&stdout).unwrap_or_else(|_| unreachable!("summary is JSON"));
    assert_eq!(summary["agent_key"], "classifier");
    assert_eq!(summary["total_executions"], 1);
    assert_eq!(
        summary["recommendations"][0],
        "Agent performance is optimal"
    );
}

#[test]
fn export_command_bundles_run_artifacts() {
    let db = temp_path("export", "sqlite");
    let plan_path = temp_path("export-plan", "yaml");
    let out_path = temp_path("export-bundle", "json");
    let plan_yaml = r"
plan_name: pipeline
orchestration: chain
business_id: acme
agents:
  - agent_key: extractor
    invoker: mock
    model_id: model-x
  - agent_key: notifier
    invoker: mock
    model_id: model-y
";
    assert!(fs::write(&plan_path, plan_yaml).is_ok());

    let dispatch = cli()
        .arg("dispatch")
        .arg("--plan")
        .arg(&plan_path)
        .arg("--db")
        .arg(&db)
        .output();
    assert!(dispatch.is_ok());
    let dispatch = dispatch.unwrap_or_else(|_| unreachable!());
    assert!(dispatch.status.success());
    let run_id = extract_run_id(&String::from_utf8_lossy(&dispatch.stdout))
        .unwrap_or_else(|| unreachable!());

    let export = cli()
        .arg("export")
        .arg("--db")
        .arg(&db)
        .arg("--business")
        .arg("acme")
        .arg("--run-id")
        .arg(run_id.to_string())
        .arg("--out")
        .arg(&out_path)
        .output();
    assert!(export.is_ok());
    assert!(export.unwrap_or_else(|_| unreachable!()).status.success());

    let bundle_text = fs::read_to_string(&out_path).unwrap_or_else(|_| unreachable!());
    let bundle: serde_json::Value =
        serde_json::from_str(&bundle_text).unwrap_or_else(|_| unreachable!("bundle is JSON"));
    assert_eq!(bundle["schema"], "orchestration_run_bundle.v1");
    assert_eq!(bundle["run"]["business_id"], "acme");
    assert_eq!(
        bundle["executions"].as_array().map(std::vec::Vec::len),
        Some(2)
    );
    assert_eq!(
        bundle["messages"].as_array().map(std::vec::Vec::len),
        Some(1)
    );
}

#[test]
fn export_rejects_cross_tenant_run_id() {
    let db = temp_path("cross-tenant", "sqlite");
    let plan_path = temp_path("cross-plan", "yaml");
    let out_path = temp_path("cross-bundle", "json");
    let plan_yaml = r"
plan_name: scoped
orchestration: parallel
business_id: acme
agents:
  - agent_key: classifier
    invoker: mock
    model_id: model-x
";
    assert!(fs::write(&plan_path, plan_yaml).is_ok());

    let dispatch = cli()
        .arg("dispatch")
        .arg("--plan")
        .arg(&plan_path)
        .arg("--db")
        .arg(&db)
        .output();
    assert!(dispatch.is_ok());
    let dispatch = dispatch.unwrap_or_else(|_| unreachable!());
    let run_id = extract_run_id(&String::from_utf8_lossy(&dispatch.stdout))
        .unwrap_or_else(|| unreachable!());

    let export = cli()
        .arg("export")
        .arg("--db")
        .arg(&db)
        .arg("--business")
        .arg("globex")
        .arg("--run-id")
        .arg(run_id.to_string())
        .arg("--out")
        .arg(&out_path)
        .output();
    assert!(export.is_ok());
    assert!(!export.unwrap_or_else(|_| unreachable!()).status.success());
}

#[test]
fn migrate_on_open_allows_queries_against_fresh_db() {
    let db = temp_path("fresh", "sqlite");
    let store = SqliteOrchestrationStore::open(&db).unwrap_or_else(|_| unreachable!());
    store.migrate().unwrap_or_else(|_| unreachable!());
    let rows = store
        .list_executions("acme", "classifier", 10)
        .unwrap_or_else(|_| unreachable!());
    assert!(rows.is_empty());
}
