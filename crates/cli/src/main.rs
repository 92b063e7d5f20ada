use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nwp_fetch_core::{
    create_object_store, load_config, load_config_from_env, metrics, validate_config, AvailabilityChecker,
    AvailabilityOutcome, Config, DownloadOrchestrator, KeyScheme, OrchestratorError,
    PipelinePlan, PipelineResult, RunParameters, TimestepRequest,
};

/// Every requested timestep was downloaded / the run is available.
const EXIT_OK: u8 = 0;
/// Configuration, argument or I/O error.
const EXIT_FAILURE: u8 = 1;
/// The run passed the gate but some timesteps failed.
const EXIT_PARTIAL: u8 = 2;
/// Not yet available; the next trigger should try again.
const EXIT_NOT_YET_AVAILABLE: u8 = 3;
/// The retry budget was spent or the store failed permanently.
const EXIT_GAVE_UP: u8 = 4;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "nwp-fetch",
    about = "Wait for a forecast run to be published and download its timesteps",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: config.toml when present, built-in defaults otherwise)
    #[arg(long, short = 'c', global = true, env = "NWP_FETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Write Prometheus metrics to this file when done
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for the run, then download its timesteps
    Run {
        #[command(flatten)]
        target: RunTarget,

        /// Download root (overrides download.dir)
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Maximum remote operations in flight (overrides download.max_concurrent)
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Check once whether the run (and optionally timesteps) is published
    Check {
        #[command(flatten)]
        target: RunTarget,
    },
}

#[derive(Args)]
struct RunTarget {
    /// Cycle hour: 0, 6, 12 or 18
    #[arg(long, allow_negative_numbers = true)]
    run_hour: i64,

    /// Run date as YYYYMMDD (default: today in UTC)
    #[arg(long)]
    date: Option<String>,

    /// Lead times in hours, comma separated (default: download.timesteps)
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    timesteps: Option<Vec<i64>>,
}

impl RunTarget {
    fn parameters(&self) -> RunParameters {
        RunParameters {
            run_hour: self.run_hour,
            date: self.date.clone(),
            timesteps: self.timesteps.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_logging(json: bool) {
    // stdout carries the JSON result; logs go to stderr.
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = load(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let code = match cli.command {
        Commands::Run {
            target,
            download_dir,
            max_concurrent,
        } => {
            let mut params = target.parameters();
            params.download_dir = download_dir;
            params.max_concurrent = max_concurrent;
            run_pipeline(&config, params).await?
        }
        Commands::Check { target } => check(&config, target.parameters()).await?,
    };

    if let Some(path) = &cli.metrics_file {
        write_metrics(path).await?;
    }

    Ok(code)
}

/// Load the configuration file, or defaults plus environment overrides when
/// none is given or present.
fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from("config.toml");
            if !default.exists() {
                info!("No config.toml found, using defaults and environment");
                return load_config_from_env()
                    .context("Failed to load config from environment");
            }
            default
        }
    };

    info!("Loading configuration from {:?}", path);
    load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

async fn run_pipeline(config: &Config, params: RunParameters) -> Result<u8> {
    let plan = match PipelinePlan::build(config, params) {
        Ok(plan) => plan,
        Err(e) => return report_error(&e),
    };

    let orchestrator = DownloadOrchestrator::from_config(config)
        .await
        .context("Failed to create object store")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    match orchestrator.run_until_cancelled(&plan, cancel).await {
        Ok(result) => {
            print_json(&serde_json::to_value(&result)?)?;
            Ok(result_exit_code(&result))
        }
        Err(e) => report_error(&e),
    }
}

/// One check of the run and of each requested timestep, without retries.
async fn check(config: &Config, params: RunParameters) -> Result<u8> {
    let run = match params.resolve_run() {
        Ok(run) => run,
        Err(e) => return report_error(&OrchestratorError::from(e)),
    };
    let mut requests = Vec::new();
    for raw in params.timesteps.unwrap_or_default() {
        let request = u32::try_from(raw)
            .map_err(|_| nwp_fetch_core::InvalidArgument::Timestep(raw))
            .and_then(|timestep| TimestepRequest::new(run, timestep));
        match request {
            Ok(request) => requests.push(request),
            Err(e) => return report_error(&OrchestratorError::from(e)),
        }
    }

    let store = create_object_store(&config.store)
        .await
        .context("Failed to create object store")?;
    let scheme = KeyScheme::new(&config.source.model, &config.source.product);
    let checker = AvailabilityChecker::new(store);

    let prefix = scheme.run_prefix(&run);
    let outcome = checker.probe(&prefix).await;

    let mut timesteps = BTreeMap::new();
    for request in &requests {
        let key = scheme.timestep_key(request);
        timesteps.insert(request.timestep, checker.probe(&key).await);
    }

    print_json(&json!({
        "run": run,
        "prefix": prefix,
        "outcome": outcome,
        "timesteps": timesteps,
    }))?;

    Ok(probe_exit_code(&outcome))
}

fn report_error(err: &OrchestratorError) -> Result<u8> {
    let code = error_exit_code(err);
    if code == EXIT_NOT_YET_AVAILABLE {
        info!("{}", err);
    } else {
        error!("{}", err);
    }
    print_json(&json!({
        "error": err.to_string(),
        "gave_up": err.gave_up(),
        "run": err.run(),
        "attempts": err.attempts(),
    }))?;
    Ok(code)
}

fn result_exit_code(result: &PipelineResult) -> u8 {
    if result.is_complete() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

fn error_exit_code(err: &OrchestratorError) -> u8 {
    match err {
        OrchestratorError::RunNotYetAvailable { .. } => EXIT_NOT_YET_AVAILABLE,
        OrchestratorError::Cancelled { .. } => EXIT_CANCELLED,
        _ if err.gave_up() => EXIT_GAVE_UP,
        _ => EXIT_FAILURE,
    }
}

fn probe_exit_code(outcome: &AvailabilityOutcome) -> u8 {
    match outcome {
        AvailabilityOutcome::Available { .. } => EXIT_OK,
        AvailabilityOutcome::Pending { .. } => EXIT_NOT_YET_AVAILABLE,
        AvailabilityOutcome::Exhausted { .. } | AvailabilityOutcome::Aborted { .. } => {
            EXIT_GAVE_UP
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn write_metrics(path: &Path) -> Result<()> {
    let text = metrics::encode_metrics().context("Failed to encode metrics")?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write metrics to {:?}", path))
}
