//! # parley
//!
//! Command-line entry point. Loads settings, wires the generator and the
//! coordinator together once, runs a simulation and prints its final state.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use parley_core::generation::TextGenerator;
use parley_core::jobs::{JobSnapshot, JobStatus};
use parley_core::messages::{Participant, SimulationRequest};
use parley_engine::DialogueOptions;
use parley_jobs::{CoordinatorConfig, SimulationCoordinator};
use parley_llm::OllamaGenerator;
use parley_settings::{LoggingSettings, ParleySettings, SimulationSettings};
use parley_telemetry::{init_telemetry, parse_level, TelemetryConfig};

/// Multi-agent dialogue simulations.
#[derive(Parser, Debug)]
#[command(name = "parley", about = "Multi-agent dialogue simulations", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one simulation and print the final job snapshot as JSON.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Rounds in which every participant speaks once.
    #[arg(long, default_value_t = 1)]
    turns: u32,

    /// Scenario text shown to every participant.
    #[arg(long)]
    context: Option<String>,

    /// A participant as `ROLE` or `ROLE=PERSONA`. Repeat in speaking order.
    #[arg(long = "participant", value_parser = parse_participant)]
    participants: Vec<Participant>,

    /// Read the whole request from a JSON file instead.
    #[arg(long, conflicts_with_all = ["context", "participants"])]
    request: Option<PathBuf>,

    /// Delay between status polls.
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,
}

impl RunArgs {
    fn build_request(&self) -> Result<SimulationRequest> {
        let request = match &self.request {
            Some(path) => read_request(path)?,
            None => SimulationRequest {
                turns: self.turns,
                context: self.context.clone(),
                participants: self.participants.clone(),
            },
        };
        request.validate().context("invalid simulation request")?;
        Ok(request)
    }
}

fn parse_participant(raw: &str) -> Result<Participant, String> {
    let (role, persona) = match raw.split_once('=') {
        Some((role, persona)) => (role.trim(), Some(persona.trim())),
        None => (raw.trim(), None),
    };
    if role.is_empty() {
        return Err(format!("participant '{raw}' has an empty role"));
    }
    Ok(match persona.filter(|p| !p.is_empty()) {
        Some(persona) => Participant::with_persona(role, persona),
        None => Participant::new(role),
    })
}

fn read_request(path: &Path) -> Result<SimulationRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request file: {}", path.display()))
}

fn telemetry_config(logging: &LoggingSettings) -> TelemetryConfig {
    let log_level = parse_level(&logging.level).unwrap_or(Level::INFO);
    TelemetryConfig {
        log_level,
        module_levels: vec![
            ("hyper".into(), Level::WARN),
            ("reqwest".into(), Level::WARN),
        ],
        json: logging.json,
    }
}

fn coordinator_config(simulation: &SimulationSettings) -> CoordinatorConfig {
    CoordinatorConfig {
        job_timeout: simulation.job_timeout(),
        dialogue: DialogueOptions {
            max_output_tokens: simulation.max_tokens(),
            call_timeout: simulation.generation_timeout(),
        },
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = parley_settings::load_settings().context("Failed to load settings")?;
    init_telemetry(&telemetry_config(&settings.logging))?;

    match cli.command {
        Command::Run(args) => run(args, &settings).await,
    }
}

async fn run(args: RunArgs, settings: &ParleySettings) -> Result<ExitCode> {
    let request = args.build_request()?;

    let generator: Arc<dyn TextGenerator> = Arc::new(
        OllamaGenerator::new(
            &settings.ollama.base_url,
            settings.ollama.model.clone(),
            settings.ollama.request_timeout(),
        )
        .context("Failed to create Ollama client")?,
    );
    let coordinator = SimulationCoordinator::new(coordinator_config(&settings.simulation));

    info!(
        app = %settings.app_name,
        model = %settings.ollama.model,
        base_url = %settings.ollama.base_url,
        "starting simulation"
    );
    let job_id = coordinator.submit(request, generator).job_id;

    let poll_interval = Duration::from_millis(args.poll_interval_ms.max(1));
    let snapshot = tokio::select! {
        snapshot = poll_until_terminal(&coordinator, &job_id, poll_interval) => snapshot?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for ctrl+c");
            }
            info!("interrupted, shutting down");
            coordinator.shutdown().await;
            coordinator.get(&job_id)?
        }
    };

    coordinator.shutdown().await;
    print_snapshot(&snapshot)?;

    Ok(match snapshot.status {
        JobStatus::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn poll_until_terminal(
    coordinator: &SimulationCoordinator,
    job_id: &parley_core::JobId,
    interval: Duration,
) -> Result<JobSnapshot> {
    let mut last_status = None;
    loop {
        let snapshot = coordinator.get(job_id)?;
        if last_status != Some(snapshot.status) {
            info!(job_id = %job_id, status = %snapshot.status, "job status");
            last_status = Some(snapshot.status);
        }
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }
        tokio::time::sleep(interval).await;
    }
}

fn print_snapshot(snapshot: &JobSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to encode job snapshot")?;
    println!("{json}");
    Ok(())
}
