//! `north` command line
use crate::config::ServiceConfig;
use crate::handlers::EvaluateResponse;
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use north_audit::{collect, AuditDispatcher, FsAuditStore};
use north_core::EvaluationContext;
use north_policy::PolicyEngine;
use serde_json::{json, Map, Value};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "north", about = "Evaluate operational changes against a governance policy", version)]
pub struct Cli {
    /// YAML policy file (defaults to NORTH_POLICY_FILE, then the built-in policy)
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate one change request and print the decision
    Evaluate(EvaluateArgs),
    /// Aggregate decision metrics from an audit directory
    Metrics(MetricsArgs),
    /// Print the effective policy
    Policy(PolicyArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long)]
    pub addr: Option<String>,
    /// Root of the audit store
    #[arg(long)]
    pub audit_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct EvaluateArgs {
    /// JSON request file, or '-' for stdin
    #[arg(long, conflicts_with_all = ["env", "action", "blast_radius", "reversible", "irreversible", "missing"])]
    pub input: Option<String>,
    /// Target environment (dev, staging, prod)
    #[arg(long)]
    pub env: Option<String>,
    /// Action category (deploy, restart, delete, ...)
    #[arg(long)]
    pub action: Option<String>,
    /// Blast radius: 0..10, low|medium|high, or a description
    #[arg(long)]
    pub blast_radius: Option<String>,
    /// The change can be rolled back
    #[arg(long, conflicts_with = "irreversible")]
    pub reversible: bool,
    /// The change cannot be rolled back (assumed unless --reversible)
    #[arg(long)]
    pub irreversible: bool,
    /// Missing governance control (repeatable)
    #[arg(long)]
    pub missing: Vec<String>,
    /// Also write the audit record under this directory
    #[arg(long)]
    pub audit_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct MetricsArgs {
    /// Root of the audit store
    #[arg(long)]
    pub audit_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct PolicyArgs {
    /// Print JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ServiceConfig::from_env()?;
    if let Some(policy) = cli.policy {
        config.policy_file = Some(policy);
    }

    crate::telemetry::init(&config.log_level)?;

    match cli.command.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            if let Some(addr) = args.addr {
                config.addr = addr;
            }
            if let Some(dir) = args.audit_dir {
                config.audit_dir = dir;
            }
            crate::run(config).await
        }
        Command::Evaluate(args) => evaluate(&config, args).await,
        Command::Metrics(args) => {
            let store = FsAuditStore::new(args.audit_dir.unwrap_or(config.audit_dir));
            let metrics = collect(&store).await?;
            print_json(&json!({ "ok": true, "metrics": metrics }))
        }
        Command::Policy(args) => {
            let policy = PolicyEngine::new(config.load_policy()?)?;
            if args.json {
                print_json(&serde_json::to_value(policy.config())?)
            } else {
                print!("{}", policy.config().to_yaml()?);
                Ok(())
            }
        }
    }
}

async fn evaluate(config: &ServiceConfig, args: EvaluateArgs) -> anyhow::Result<()> {
    let engine = PolicyEngine::new(config.load_policy()?)?;
    let raw = match &args.input {
        Some(source) => read_input(source)?,
        None => raw_from_flags(&args)?,
    };

    let context = EvaluationContext::new("cli");
    let (request, evaluation) = engine.evaluate_raw(&raw);
    let record = engine.record(&context, &request, &evaluation);
    let response = EvaluateResponse::new(&context, &record);

    if let Some(dir) = args.audit_dir {
        let dispatcher = AuditDispatcher::spawn(Arc::new(FsAuditStore::new(dir)), 1);
        dispatcher.dispatch(record);
        dispatcher.shutdown().await;
    }

    print_json(&serde_json::to_value(&response)?)
}

fn read_input(source: &str) -> anyhow::Result<Value> {
    let text = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {}", source))?
    };
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", source))
}

fn raw_from_flags(args: &EvaluateArgs) -> anyhow::Result<Value> {
    if args.env.is_none() && args.action.is_none() {
        bail!("pass --input, or at least --env and --action");
    }

    let mut raw = Map::new();
    if let Some(env) = &args.env {
        raw.insert("environment".to_string(), json!(env));
    }
    if let Some(action) = &args.action {
        raw.insert("actionCategory".to_string(), json!(action));
    }
    if let Some(blast_radius) = &args.blast_radius {
        raw.insert("blastRadius".to_string(), json!(blast_radius));
    }
    if args.reversible || args.irreversible {
        raw.insert("reversible".to_string(), json!(args.reversible));
    }
    raw.insert("governanceMissing".to_string(), json!(args.missing));
    Ok(Value::Object(raw))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
