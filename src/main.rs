// Flow Studio - Automation flow editor core
//
// Command-line front end for the editor core: simulate a saved flow, ask the
// inference service to diagnose it, export it, or browse the node palette.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flow_studio::config::{ConfigManager, LogLevel};
use flow_studio::diagnosis::{
    DiagnosisError, DiagnosisOutcome, DiagnosisRequest, DiagnosisResult, GeminiClient, InferenceService,
};
use flow_studio::editor::EditorSession;
use flow_studio::graph::{GraphSnapshot, NodeCatalog, PaletteTab};
use flow_studio::repository::{InMemoryWorkflowRepository, UNTITLED_WORKFLOW};
use flow_studio::simulation::{RunOutcome, SimulationUpdate};

/// Flow Studio - automation flow editor core
#[derive(Parser)]
#[command(name = "flow-studio")]
#[command(about = "Simulate, diagnose and export automation flows")]
#[command(version)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a run of a flow file
    Run {
        /// Flow JSON (export document or plain nodes/edges)
        file: PathBuf,
    },

    /// Ask the inference service to diagnose a flow file
    Diagnose {
        /// Flow JSON (export document or plain nodes/edges)
        file: PathBuf,

        /// Runtime error to report; defaults to the failure of a simulated run
        #[arg(short, long)]
        error: Option<String>,

        /// Apply the proposed fix and export the fixed flow
        #[arg(long)]
        apply: bool,

        /// Directory the fixed flow is exported to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Export a flow file as an export document
    Export {
        /// Flow JSON (export document or plain nodes/edges)
        file: PathBuf,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// List palette entries
    Catalog {
        /// Palette tab to list
        #[arg(short, long, value_enum, default_value_t = Tab::Triggers)]
        tab: Tab,

        /// Case-insensitive name filter
        #[arg(short, long, default_value = "")]
        query: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Tab {
    Triggers,
    Actions,
}

impl From<Tab> for PaletteTab {
    fn from(tab: Tab) -> Self {
        match tab {
            Tab::Triggers => PaletteTab::Triggers,
            Tab::Actions => PaletteTab::Actions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ConfigManager::new().await?;

    // Initialize logging
    let log_level = if args.verbose { LogLevel::Debug } else { config.config().log_level };
    init_logging(log_level, args.log_json)?;

    tracing::info!("Starting Flow Studio");

    match args.command {
        Command::Run { file } => run_flow(&config, &file).await?,
        Command::Diagnose { file, error, apply, out } => diagnose_flow(&config, &file, error, apply, &out).await?,
        Command::Export { file, out } => export_flow(&config, &file, &out).await?,
        Command::Catalog { tab, query } => list_catalog(tab.into(), &query),
    }

    tracing::info!("Flow Studio shutdown complete");
    Ok(())
}

/// Read a flow file into its title and graph
async fn read_flow(path: &Path) -> Result<(String, GraphSnapshot)> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read flow file: {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let title = value
        .get("title")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().replace('_', " ")))
        .unwrap_or_else(|| UNTITLED_WORKFLOW.to_string());
    let snapshot: GraphSnapshot = serde_json::from_value(value).context("Flow file has no valid nodes/edges")?;

    Ok((title, snapshot))
}

/// Build an editor session holding the flow in `path`
async fn open_session(config: &ConfigManager, path: &Path) -> Result<EditorSession> {
    let validation = config.validate();
    for warning in &validation.warnings {
        tracing::warn!("{}", warning);
    }
    if !validation.is_valid() {
        bail!("Invalid configuration: {}", validation.errors.join("; "));
    }

    let service: Arc<dyn InferenceService> = match GeminiClient::new(&config.config().inference) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::debug!("Inference service unavailable: {}", e);
            Arc::new(Unconfigured)
        },
    };

    let session = EditorSession::new(config.config(), service, Arc::new(InMemoryWorkflowRepository::new()));
    let (title, snapshot) = read_flow(path).await?;
    session.load_snapshot(&title, snapshot).await?;
    Ok(session)
}

/// Simulate a run, printing node status changes as they happen
async fn run_flow(config: &ConfigManager, path: &Path) -> Result<()> {
    let mut session = open_session(config, path).await?;
    let mut receiver = session
        .take_update_receiver()
        .context("Run updates already taken")?;

    println!("Running: {}", session.info().await.title);

    let printer = tokio::spawn(async move {
        while let Some(update) = receiver.recv().await {
            match update {
                SimulationUpdate::Started { triggers, .. } => {
                    println!("  {} trigger(s)", triggers.len());
                },
                SimulationUpdate::NodeStatus { node_id, status, .. } => {
                    println!("  → {}: {}", node_id, status);
                },
                SimulationUpdate::Finished { .. } => break,
            }
        }
    });

    let report = session.run().await?;
    printer.await.ok();

    let elapsed = report.duration().num_milliseconds();
    match &report.outcome {
        RunOutcome::Success => println!("\n✓ Run completed ({} nodes, {}ms)", report.trace.len(), elapsed),
        RunOutcome::Failed { node_id, reason } => println!("\n✗ Run failed at {}: {}", node_id, reason),
        RunOutcome::Interrupted => println!("\n✗ Run interrupted"),
    }
    Ok(())
}

async fn diagnose_flow(
    config: &ConfigManager,
    path: &Path,
    error: Option<String>,
    apply: bool,
    out: &Path,
) -> Result<()> {
    let session = open_session(config, path).await?;

    if error.is_none() {
        session.run().await?;
    }
    if let Some(report) = session.last_run().await {
        match &report.outcome {
            RunOutcome::Success => println!("Simulated run succeeded; diagnosing without a runtime error"),
            RunOutcome::Failed { node_id, .. } => println!("Simulated run failed at {}", node_id),
            RunOutcome::Interrupted => println!("Simulated run was interrupted"),
        }
    }

    let outcome = session.diagnose(error).await;
    let result = match &outcome {
        DiagnosisOutcome::Ready(result) => result,
        DiagnosisOutcome::Unavailable { reason, .. } => bail!("Diagnosis unavailable: {}", reason),
        DiagnosisOutcome::Discarded => bail!("Diagnosis was superseded"),
    };

    for section in session.coordinator().sections().await {
        if !section.title.is_empty() {
            println!("\n# {}", section.title);
        }
        if !section.body.is_empty() {
            println!("{}", section.body);
        }
        for option in &section.alternatives {
            println!("\n  {}. {}", option.number, option.title);
            println!("     {}", option.body);
        }
    }
    if !result.predicted_outcome.is_empty() {
        println!("\nPredicted outcome: {}", result.predicted_outcome);
    }

    if apply {
        if !result.has_fix() {
            bail!("The diagnosis did not propose a fix");
        }
        let saved = session.apply_fix().await?;
        let path = session.export_to_dir(out).await?;
        println!("\n✓ Applied fix as '{}' ({})", saved.title, path.display());
    } else if result.has_fix() {
        println!("\nA fix is available; rerun with --apply to use it");
    }
    Ok(())
}

async fn export_flow(config: &ConfigManager, path: &Path, out: &Path) -> Result<()> {
    let session = open_session(config, path).await?;
    let written = session.export_to_dir(out).await?;
    println!("✓ Exported to {}", written.display());
    Ok(())
}

fn list_catalog(tab: PaletteTab, query: &str) {
    let catalog = NodeCatalog::standard();
    for (category, entries) in catalog.palette(tab, query) {
        println!("{}", category);
        for entry in entries {
            println!("  {} ({})", entry.descriptor.name, entry.default_kind);
        }
    }
}

/// Stand-in service used when no API key is configured
struct Unconfigured;

#[async_trait::async_trait]
impl InferenceService for Unconfigured {
    async fn diagnose(&self, _request: &DiagnosisRequest) -> Result<DiagnosisResult, DiagnosisError> {
        Err(DiagnosisError::MissingApiKey)
    }
}

/// Initialize logging at the configured level
fn init_logging(log_level: LogLevel, json: bool) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("flow_studio={}", log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
    }

    Ok(())
}
