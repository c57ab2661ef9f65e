use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use agent_orchestration_dispatcher::{DispatchConfig, Dispatcher, MajorityReconciler};
use agent_orchestration_domain::{MessageStatus, RunId};
use agent_orchestration_insight::insights_for_agent;
use agent_orchestration_plan::load_plan_from_path;
use agent_orchestration_provider::InvokerRegistry;
use agent_orchestration_store_core::{
    ExecutionLedger, MessageChannel, OrchestrationStore, RunTracker, DEFAULT_EXECUTION_WINDOW,
};
use agent_orchestration_store_sqlite::SqliteOrchestrationStore;
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use ulid::Ulid;

#[derive(Debug, Parser)]
#[command(name = "agent-orchestration")]
#[command(about = "Multi-tenant agent orchestration with a SQLite execution ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Dispatch(DispatchArgs),
    Runs(RunsArgs),
    Executions(ExecutionsArgs),
    Messages(MessagesArgs),
    Insights(InsightsArgs),
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct DispatchArgs {
    #[arg(long)]
    plan: PathBuf,
    #[arg(long)]
    db: PathBuf,
    #[arg(long)]
    business: Option<String>,
}

#[derive(Debug, Args)]
struct RunsArgs {
    #[arg(long)]
    db: PathBuf,
    #[arg(long)]
    business: String,
}

#[derive(Debug, Args)]
struct ExecutionsArgs {
    #[arg(long)]
    db: PathBuf,
    #[arg(long)]
    business: String,
    #[arg(long)]
    agent: Option<String>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long, default_value_t = DEFAULT_EXECUTION_WINDOW)]
    limit: usize,
}

#[derive(Debug, Args)]
struct MessagesArgs {
    #[arg(long)]
    db: PathBuf,
    #[arg(long)]
    business: String,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Debug, Args)]
struct InsightsArgs {
    #[arg(long)]
    db: PathBuf,
    #[arg(long)]
    business: String,
    #[arg(long)]
    agent: String,
    #[arg(long, default_value_t = DEFAULT_EXECUTION_WINDOW)]
    window: usize,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[arg(long)]
    db: PathBuf,
    #[arg(long)]
    business: String,
    #[arg(long)]
    run_id: String,
    #[arg(long)]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dispatch(args) => dispatch_command(&args),
        Commands::Runs(args) => runs_command(&args),
        Commands::Executions(args) => executions_command(&args),
        Commands::Messages(args) => messages_command(&args),
        Commands::Insights(args) => insights_command(&args),
        Commands::Export(args) => export_command(&args),
    }
}

fn open_store(db: &Path) -> Result<SqliteOrchestrationStore> {
    let store = SqliteOrchestrationStore::open(db)?;
    store.migrate()?;
    Ok(store)
}

fn dispatch_command(args: &DispatchArgs) -> Result<()> {
    let envelope = load_plan_from_path(&args.plan)?;
    let store = open_store(&args.db)?;
    let registry = InvokerRegistry::new();
    let reconciler = MajorityReconciler;

    let config = DispatchConfig {
        business_id: args.business.clone(),
        cli_args_json: json!({
            "plan": args.plan,
            "db": args.db,
            "business": args.business,
        }),
        ..DispatchConfig::default()
    };

    let summary =
        Dispatcher::new(&store, &registry, &reconciler).dispatch(&envelope, config)?;

    println!(
        "run_id={} status={} orchestration={} agents_total={} succeeded={} failed={} skipped={}",
        summary.run_id,
        summary.status.as_str(),
        summary.orchestration_type.as_str(),
        summary.agents_total,
        summary.succeeded,
        summary.failed,
        summary.skipped
    );
    if let Some(decision) = &summary.consensus {
        println!("consensus={}", serde_json::to_string(decision)?);
    }
    Ok(())
}

fn runs_command(args: &RunsArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    for run in store.list_runs(&args.business)? {
        println!("{}", serde_json::to_string(&run)?);
    }
    Ok(())
}

fn executions_command(args: &ExecutionsArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let rows = match (&args.agent, &args.run_id) {
        (Some(agent), None) => store.list_executions(&args.business, agent, args.limit)?,
        (None, Some(run_id)) => {
            store.list_executions_for_run(&args.business, parse_run_id(run_id)?)?
        }
        _ => {
            return Err(anyhow!(
                "pass exactly one of --agent or --run-id to select executions"
            ))
        }
    };
    for row in rows {
        println!("{}", serde_json::to_string(&row)?);
    }
    Ok(())
}

fn messages_command(args: &MessagesArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let status = args
        .status
        .as_deref()
        .map(|value| {
            MessageStatus::parse(value).ok_or_else(|| {
                anyhow!("invalid message status '{value}'; use pending, completed, or failed")
            })
        })
        .transpose()?;
    for message in store.list_messages(&args.business, status)? {
        println!("{}", serde_json::to_string(&message)?);
    }
    Ok(())
}

fn insights_command(args: &InsightsArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let summary = insights_for_agent(&store, &args.business, &args.agent, args.window);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn export_command(args: &ExportArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let run_id = parse_run_id(&args.run_id)?;
    let run = store
        .get_run(run_id)?
        .ok_or_else(|| anyhow!("run_id {run_id} not found"))?;
    if run.business_id != args.business {
        return Err(anyhow!("run_id {run_id} not found"));
    }

    let executions = store.list_executions_for_run(&args.business, run_id)?;
    let run_id_text = run_id.to_string();
    let messages: Vec<_> = store
        .list_messages(&args.business, None)?
        .into_iter()
        .filter(|message| {
            message
                .context
                .as_ref()
                .and_then(|context| context.get("run_id"))
                .and_then(serde_json::Value::as_str)
                == Some(run_id_text.as_str())
        })
        .collect();

    let bundle = json!({
        "schema": "orchestration_run_bundle.v1",
        "run": run,
        "executions": executions,
        "messages": messages,
    });

    let output = File::create(&args.out)?;
    let mut writer = BufWriter::new(output);
    serde_json::to_writer_pretty(&mut writer, &bundle)?;
    writer.flush()?;

    println!(
        "exported run {} ({} executions, {} messages) to {}",
        run_id,
        bundle["executions"]
            .as_array()
            .map_or(0, std::vec::Vec::len),
        bundle["messages"].as_array().map_or(0, std::vec::Vec::len),
        args.out.display()
    );
    Ok(())
}

fn parse_run_id(input: &str) -> Result<RunId> {
    let value = Ulid::from_str(input).map_err(|err| anyhow!("invalid run_id ULID: {err}"))?;
    Ok(RunId(value))
}
