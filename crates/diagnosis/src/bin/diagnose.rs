//! Diagnose CLI
//!
//! Runs the diagnosis core against an Alertmanager webhook payload saved to
//! a file: rule-based suggestions, prompt previews, and backend triage.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use diagnosis::{
    prompt, AlertInfo, AlertmanagerPayload, Analyzer, Category, DiagnosisConfig, RuleEngine,
    Suggestion,
};

const DEFAULT_LOG_FILTER: &str = "diagnose=info,diagnosis=info,llm=info";

/// Incident diagnosis from Alertmanager payloads
#[derive(Parser)]
#[command(name = "diagnose")]
#[command(about = "Incident diagnosis from Alertmanager payloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML config file (defaults to environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print rule-based remediation suggestions for each alert
    Suggest {
        /// Alertmanager webhook payload (JSON)
        #[arg(long)]
        alert: PathBuf,
    },

    /// Print the triage prompt for each alert without calling a backend
    Prompt {
        /// Alertmanager webhook payload (JSON)
        #[arg(long)]
        alert: PathBuf,
    },

    /// Run backend triage on each firing alert
    Triage {
        /// Alertmanager webhook payload (JSON)
        #[arg(long)]
        alert: PathBuf,
    },
}

#[derive(Serialize)]
struct SuggestOutput<'a> {
    alert: &'a str,
    service: &'a str,
    categories: Vec<Category>,
    suggestions: Vec<Suggestion>,
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_payload(path: &Path) -> Result<AlertmanagerPayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read alert payload {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse alert payload {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<DiagnosisConfig> {
    match path {
        Some(path) => DiagnosisConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => DiagnosisConfig::from_env().context("Failed to load config from environment"),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_suggest(payload: &AlertmanagerPayload) -> Result<()> {
    let engine = RuleEngine::new();
    let output: Vec<_> = payload
        .alerts
        .iter()
        .map(|alert| {
            let info = AlertInfo::from(alert);
            SuggestOutput {
                alert: alert.name(),
                service: alert.service_name(),
                categories: engine.categories(&info),
                suggestions: engine.suggestions(&info),
            }
        })
        .collect();
    print_json(&output)
}

fn run_prompt(payload: &AlertmanagerPayload) {
    for alert in &payload.alerts {
        println!("{}", prompt::triage_prompt(alert));
    }
}

async fn run_triage(payload: &AlertmanagerPayload, config: &DiagnosisConfig) -> Result<()> {
    let backend = llm::build_backend(&config.llm).context("Failed to build analysis backend")?;
    let analyzer = Analyzer::new(backend);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            on_signal.cancel();
        }
    });

    let mut results = Vec::new();
    for alert in payload.alerts.iter().filter(|a| a.is_firing()) {
        let result = analyzer
            .analyze(alert, &cancel)
            .await
            .with_context(|| format!("Triage failed for alert {}", alert.name()))?;
        results.push(result);
    }

    if results.is_empty() {
        info!("No firing alerts in payload");
    }
    print_json(&results)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match &cli.command {
        Commands::Suggest { alert } => run_suggest(&load_payload(alert)?),
        Commands::Prompt { alert } => {
            run_prompt(&load_payload(alert)?);
            Ok(())
        }
        Commands::Triage { alert } => {
            let payload = load_payload(alert)?;
            let config = load_config(cli.config.as_deref())?;
            run_triage(&payload, &config).await
        }
    }
}
