use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tollgate_api::{ApiClient, token_from_env};
use tollgate_engine::{HttpTransport, ToolDispatcher};
use tollgate_mcp::{McpHttpLogEntry, McpHttpServer, resolve_bind_address};
use tollgate_registry::{CatalogIndex, TollgateConfig, default_config_path};
use tollgate_types::{
    ActivityProposal, AnalyzeComplexityArgs, ExecuteOperationRequest, ExecuteWorkflowRequest, HttpMethod,
    ListEndpointsArgs, OperationDetailArgs, ResolveCategoriesArgs, ToolCall, WorkflowEvent, WorkflowOutcome,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Discover and safely invoke operations of an OpenAPI-described business API.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about)]
struct Cli {
    /// Configuration file; defaults to TOLLGATE_CONFIG_PATH or the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// OpenAPI catalog path or URL, overriding the configuration
    #[arg(long, global = true)]
    catalog: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the tools over MCP streamable HTTP at /mcp
    Serve {
        /// Loopback address to bind, e.g. 127.0.0.1:8787
        #[arg(long)]
        bind: Option<String>,
    },
    /// Resolve keywords to catalog categories
    Categories {
        keywords: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the operations of one category
    Endpoints {
        category: String,
        #[arg(long)]
        method: Option<HttpMethod>,
    },
    /// Show the full contract of one operation
    Detail { endpoint: String, method: HttpMethod },
    /// Execute one operation through the guarded executor
    Execute {
        endpoint: String,
        method: HttpMethod,
        /// Path or query value as key=value; the value is parsed as JSON when possible
        #[arg(long = "query", value_parser = parse_key_value)]
        query: Vec<(String, Value)>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Confirm a mutating call whose payload you have reviewed
        #[arg(long)]
        confirm: bool,
    },
    /// Score the complexity of a request
    Complexity {
        user_input: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Run the activity workflow; without --confirm it only drafts a proposal
    Workflow {
        user_input: String,
        /// Proposal JSON file from an earlier run, required with --confirm
        #[arg(long)]
        proposal: Option<PathBuf>,
        #[arg(long, requires = "proposal")]
        confirm: bool,
    },
    /// Run any tool by name with JSON arguments
    Call {
        name: String,
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => TollgateConfig::load_from(path),
        None => TollgateConfig::load(),
    };
    debug!(path = %cli.config.clone().unwrap_or_else(default_config_path).display(), "configuration loaded");
    let dispatcher = build_dispatcher(&config, cli.catalog.as_deref()).await?;

    match cli.command {
        Command::Serve { bind } => serve(dispatcher, bind.as_deref()).await,
        Command::Categories { keywords, limit } => {
            let resolution = dispatcher.resolve_categories(&ResolveCategoriesArgs { keywords, limit })?;
            print_json(&resolution)
        }
        Command::Endpoints { category, method } => {
            match dispatcher.list_endpoints(&ListEndpointsArgs { category, method }) {
                Ok(listing) => print_json(&listing),
                Err(miss) => print_json(&miss),
            }
        }
        Command::Detail { endpoint, method } => {
            match dispatcher.get_operation_detail(&OperationDetailArgs { endpoint, method }) {
                Ok(detail) => print_json(&detail),
                Err(miss) => print_json(&miss),
            }
        }
        Command::Execute {
            endpoint,
            method,
            query,
            body,
            confirm,
        } => {
            let body = body
                .map(|body| serde_json::from_str::<Value>(&body))
                .transpose()
                .context("--body is not valid JSON")?;
            let request = ExecuteOperationRequest {
                endpoint,
                method,
                query: query.into_iter().collect::<Map<String, Value>>(),
                body,
                confirmed: confirm,
            };
            print_json(&dispatcher.execute_operation(request).await?)
        }
        Command::Complexity { user_input, context } => {
            print_json(&dispatcher.analyze_task_complexity(&AnalyzeComplexityArgs { user_input, context }))
        }
        Command::Workflow {
            user_input,
            proposal,
            confirm,
        } => run_workflow(&dispatcher, user_input, proposal, confirm).await,
        Command::Call { name, arguments } => {
            let arguments: Value = serde_json::from_str(&arguments).context("tool arguments are not valid JSON")?;
            print_json(&dispatcher.dispatch(&ToolCall { name, arguments }).await?)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn build_dispatcher(config: &TollgateConfig, catalog_override: Option<&str>) -> Result<ToolDispatcher> {
    let source = catalog_override.or(config.catalog.as_deref());
    let catalog = CatalogIndex::load(source)
        .await
        .with_context(|| format!("failed to load catalog from {}", source.unwrap_or("the embedded catalog")))?;
    info!(operations = catalog.len(), categories = catalog.category_count(), "catalog loaded");

    let client = ApiClient::from_env(
        config.api_base_url.as_deref(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let transport = Arc::new(HttpTransport::new(client));
    Ok(ToolDispatcher::from_config(config, Arc::new(catalog), transport, token_from_env()))
}

async fn serve(dispatcher: ToolDispatcher, bind: Option<&str>) -> Result<()> {
    let bind_address = resolve_bind_address(bind)?;
    let (log_tx, log_rx) = unbounded_channel::<McpHttpLogEntry>();
    let log_task = tokio::spawn(forward_log_entries(log_rx));

    let server = McpHttpServer::new(bind_address, Arc::new(dispatcher))
        .with_log_sender(log_tx)
        .start()
        .await?;
    eprintln!("Tollgate MCP listening on http://{}/mcp", server.bound_address());

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    server.stop().await?;
    log_task.abort();
    Ok(())
}

/// Mirrors server log entries into tracing until every sender is gone.
async fn forward_log_entries(mut log_rx: UnboundedReceiver<McpHttpLogEntry>) -> usize {
    let mut forwarded = 0;
    while let Some(entry) = log_rx.recv().await {
        debug!(payload = ?entry.payload, "{}", entry.message);
        forwarded += 1;
    }
    forwarded
}

async fn run_workflow(
    dispatcher: &ToolDispatcher,
    user_input: String,
    proposal: Option<PathBuf>,
    confirm: bool,
) -> Result<()> {
    let proposal = match proposal {
        Some(path) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read proposal {}", path.display()))?;
            Some(read_proposal(&content).with_context(|| format!("{} is not a valid proposal", path.display()))?)
        }
        None => None,
    };
    let request = ExecuteWorkflowRequest {
        user_input,
        confirmed: confirm,
        proposal,
    };

    let (events_tx, mut events_rx) = unbounded_channel::<WorkflowEvent>();
    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let WorkflowEvent::WorkflowStepComplete {
                step_title,
                step_index,
                total_steps,
                degraded,
                ..
            } = event
            {
                let suffix = if degraded { " (placeholder)" } else { "" };
                eprintln!("[{}/{}] {}{}", step_index + 1, total_steps, step_title, suffix);
            }
        }
    });
    let outcome = dispatcher.execute_activity_workflow(request, Some(events_tx)).await;
    progress.await.context("workflow progress task failed")?;

    match &outcome {
        WorkflowOutcome::AwaitingConfirmation { markdown, proposal, .. } => {
            println!("{markdown}\n");
            println!("{}", serde_json::to_string_pretty(proposal)?);
            eprintln!("\nSave the proposal JSON above to a file and rerun with --proposal <file> --confirm to create it.");
            Ok(())
        }
        WorkflowOutcome::Completed { markdown, .. } => {
            println!("{markdown}");
            Ok(())
        }
        WorkflowOutcome::Failed { failed_step, error, .. } => Err(anyhow!("workflow failed at {}: {}", failed_step.id(), error)),
    }
}

/// Accepts a bare proposal or a full `confirm_request` object.
fn read_proposal(content: &str) -> Result<ActivityProposal> {
    let value: Value = serde_json::from_str(content)?;
    let value = match value.get("proposal") {
        Some(proposal) => proposal.clone(),
        None => value,
    };
    Ok(serde_json::from_value(value)?)
}

fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
