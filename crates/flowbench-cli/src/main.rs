//! CLI binary for validating, resolving, and running ML workflow graphs.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use flowbench_client::ApiClient;
use flowbench_graph::{
    builtin_templates, save_snapshot, GraphSnapshot, Resolver, Severity, WorkflowGraph,
    DEFAULT_MAX_HOPS,
};

#[derive(Parser)]
#[command(name = "flowbench", version, about = "Visual ML pipeline graphs from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend base URL (falls back to FLOWBENCH_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the autosave slot
    #[arg(long, global = true, default_value = ".flowbench")]
    store_root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a workflow file and report diagnostics
    Validate {
        /// Path to the workflow .json file
        workflow: PathBuf,
    },

    /// Resolve a workflow into per-result pipeline configs
    Resolve {
        /// Path to the workflow .json file
        workflow: PathBuf,

        /// Ancestor walk bound per result node
        #[arg(long, default_value_t = DEFAULT_MAX_HOPS)]
        max_hops: usize,
    },

    /// Resolve, submit one batch to the backend, and merge the results
    Run {
        /// Path to the workflow .json file
        workflow: PathBuf,

        /// Ancestor walk bound per result node
        #[arg(long, default_value_t = DEFAULT_MAX_HOPS)]
        max_hops: usize,
    },

    /// Write a built-in template to a file (or list them)
    Template {
        /// Template id (omit to list available templates)
        id: Option<String>,

        /// Output file path (default: <id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a CSV dataset
    Upload {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// List uploaded datasets
    Datasets,

    /// Show pipeline execution history
    History,

    /// Manage saved workflows on the backend
    Workflows {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Log in and print a token for FLOWBENCH_TOKEN
    Login {
        /// Account email or username
        username: String,

        /// Account password
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// List saved workflows
    List,

    /// Save a workflow file to the backend
    Save {
        /// Path to the workflow .json file
        workflow: PathBuf,

        /// Workflow name
        #[arg(long)]
        name: String,
    },

    /// Fetch a saved workflow by id
    Restore {
        /// Workflow id
        id: i64,

        /// Output file path (default: workflow-<id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a saved workflow
    Delete {
        /// Workflow id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = match cli.api_url {
        Some(url) => {
            let mut c = ApiClient::new(url);
            if let Ok(token) = std::env::var("FLOWBENCH_TOKEN") {
                c = c.with_token(token);
            }
            c
        }
        None => ApiClient::from_env(),
    };

    match cli.command {
        Commands::Validate { workflow } => {
            cmd_validate(&workflow)?;
        }
        Commands::Resolve { workflow, max_hops } => {
            cmd_resolve(&workflow, max_hops)?;
        }
        Commands::Run { workflow, max_hops } => {
            cmd_run(&client, &workflow, max_hops, &cli.store_root).await?;
        }
        Commands::Template { id, output } => {
            cmd_template(id.as_deref(), output.as_deref())?;
        }
        Commands::Upload { file } => {
            let uploaded = client.upload_dataset(&file).await?;
            println!("Uploaded dataset: {}", uploaded.dataset_id);
            if !uploaded.columns.is_empty() {
                println!("Columns: {}", uploaded.columns.join(", "));
            }
            if let Some((rows, cols)) = uploaded.shape {
                println!("Shape: {rows} x {cols}");
            }
        }
        Commands::Datasets => {
            let datasets = client.list_datasets().await?;
            if datasets.is_empty() {
                println!("No datasets uploaded");
            }
            for ds in datasets {
                match ds.uploaded_at {
                    Some(at) => println!("{}  {} ({at})", ds.id, ds.filename),
                    None => println!("{}  {}", ds.id, ds.filename),
                }
            }
        }
        Commands::History => {
            let entries = client.history().await?;
            if entries.is_empty() {
                println!("No runs recorded");
            }
            for entry in entries {
                let workflow = entry
                    .workflow_id
                    .map(|id| format!(" workflow={id}"))
                    .unwrap_or_default();
                println!("{}  {}{}", entry.id, entry.created_at, workflow);
            }
        }
        Commands::Workflows { action } => {
            cmd_workflows(&client, action).await?;
        }
        Commands::Login { username, password } => {
            let mut client = client;
            let token = client.login(&username, &password).await?;
            println!("{}", token.access_token);
            println!("\nExport it for later commands:");
            println!("  export FLOWBENCH_TOKEN={}", token.access_token);
        }
    }

    Ok(())
}

fn load_workflow(path: &Path) -> anyhow::Result<WorkflowGraph> {
    let source = std::fs::read_to_string(path)?;
    let snapshot: GraphSnapshot = serde_json::from_str(&source)?;
    Ok(snapshot.into_graph())
}

fn write_graph(graph: &WorkflowGraph, path: &Path) -> anyhow::Result<()> {
    let snapshot = GraphSnapshot::of(graph);
    std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
    Ok(())
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    let graph = load_workflow(path)?;
    let diagnostics = flowbench_graph::validate(&graph);

    if diagnostics.is_empty() {
        println!("Workflow is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_resolve(path: &Path, max_hops: usize) -> anyhow::Result<()> {
    let graph = load_workflow(path)?;
    let batch = Resolver::with_max_hops(max_hops).resolve(&graph)?;

    println!("Resolved {} pipeline(s):", batch.configs.len());
    for (result_id, config) in &batch.configs {
        println!("\n  result {result_id}");
        println!("    file_id: {}", config.file_id);
        println!("    target_column: {}", config.target_column);
        println!("    scaler_type: {}", config.scaler_type);
        println!("    imputer_strategy: {}", config.imputer_strategy);
        println!("    encoder_strategy: {}", config.encoder_strategy);
        println!("    test_size: {}", config.test_size);
        println!("    model_type: {}", config.model_type);
    }

    if !batch.skipped.is_empty() {
        println!("\nSkipped {} result node(s):", batch.skipped.len());
        for skip in &batch.skipped {
            println!("  {}: {}", skip.node_id, skip.reason);
        }
    }

    Ok(())
}

async fn cmd_run(
    client: &ApiClient,
    path: &Path,
    max_hops: usize,
    store_root: &Path,
) -> anyhow::Result<()> {
    let mut graph = load_workflow(path)?;
    let resolver = Resolver::with_max_hops(max_hops);

    let report = client.execute(&mut graph, &resolver).await?;

    println!("Batch complete: {} pipeline(s) succeeded", report.success_count);
    for err in &report.node_errors {
        println!("  ERROR in {}: {}", err.label, err.message);
    }

    // The merged metrics become the new session state.
    let saved = save_snapshot(&graph, store_root).await?;
    println!("Updated graph autosaved to {}", saved.display());

    Ok(())
}

fn cmd_template(id: Option<&str>, output: Option<&Path>) -> anyhow::Result<()> {
    let templates = builtin_templates();

    let Some(id) = id else {
        println!("Available templates:");
        for t in &templates {
            println!("  {:<20} {} — {}", t.id, t.name, t.description);
        }
        return Ok(());
    };

    let template = templates
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| anyhow::anyhow!("No template named '{id}'"))?;

    let default_output = PathBuf::from(format!("{id}.json"));
    let output_path = output.unwrap_or(&default_output);

    let graph = template.into_graph();
    write_graph(&graph, output_path)?;
    println!("Wrote template '{id}' to {}", output_path.display());

    Ok(())
}

async fn cmd_workflows(client: &ApiClient, action: WorkflowAction) -> anyhow::Result<()> {
    match action {
        WorkflowAction::List => {
            let records = client.list_workflows().await?;
            if records.is_empty() {
                println!("No saved workflows");
            }
            for record in records {
                println!(
                    "{}  {} ({} nodes, {} edges)",
                    record.id,
                    record.name,
                    record.nodes_json.len(),
                    record.edges_json.len()
                );
            }
        }
        WorkflowAction::Save { workflow, name } => {
            let graph = load_workflow(&workflow)?;
            let record = client.save_workflow(&name, &graph).await?;
            println!("Saved workflow '{}' as id {}", record.name, record.id);
        }
        WorkflowAction::Restore { id, output } => {
            let graph = client.restore_workflow(id).await?;
            let default_output = PathBuf::from(format!("workflow-{id}.json"));
            let output_path = output.unwrap_or(default_output);
            write_graph(&graph, &output_path)?;
            println!("Restored workflow {id} to {}", output_path.display());
        }
        WorkflowAction::Delete { id } => {
            client.delete_workflow(id).await?;
            println!("Deleted workflow {id}");
        }
    }
    Ok(())
}
