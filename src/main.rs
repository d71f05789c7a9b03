// ImpactSim CLI - JSON request in, JSON response out
// Logs go to stderr so stdout can be piped

use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use impactsim::{
    init_logging, physics_constants, presets, CachedProvider, CancellationToken, DeflectionStrategy,
    EngineConfig, ImpactScenario, ImpactService, MonteCarloRequest, SimulationOptions,
    SimulationRequest, StaticSettlements,
};

#[derive(Parser)]
#[command(name = "impactsim", version, about = "Asteroid impact effect and deflection simulator")]
struct Cli {
    /// JSON engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Baseline impact, with an optional deflection strategy
    Impact {
        /// Request file (`-` for stdin)
        request: PathBuf,
    },
    /// Baseline against a deflected trajectory
    Deflect { request: PathBuf },
    /// Stochastic uncertainty analysis
    MonteCarlo {
        request: PathBuf,
        #[arg(long)]
        runs: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List the built-in scenarios
    Presets,
    /// Print the physical constants used by the models
    Constants,
}

#[derive(Deserialize)]
struct DeflectRequest {
    scenario: ImpactScenario,
    strategy: DeflectionStrategy,
    #[serde(default)]
    options: Option<SimulationOptions>,
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(|e| format!("stdin: {e}"))?
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?
    };
    serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn emit<T: Serialize>(value: &T, compact: bool) -> Result<(), String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

async fn run(cli: Cli, config: EngineConfig) -> Result<(), String> {
    let provider = CachedProvider::with_ttl(
        StaticSettlements::world_cities(),
        Duration::from_secs(config.provider_cache_ttl_s),
    );
    let defaults = config.default_options();
    let service = ImpactService::new(config, Arc::new(provider));

    match cli.command {
        Command::Impact { request } => {
            let request: SimulationRequest = read_request(&request)?;
            let response = service
                .simulate_impact(request)
                .await
                .map_err(|e| e.to_string())?;
            emit(&response, cli.compact)
        }
        Command::Deflect { request } => {
            let request: DeflectRequest = read_request(&request)?;
            let response = service
                .simulate_deflection(
                    request.scenario,
                    request.strategy,
                    request.options.unwrap_or(defaults),
                )
                .await
                .map_err(|e| e.to_string())?;
            emit(&response, cli.compact)
        }
        Command::MonteCarlo {
            request,
            runs,
            seed,
        } => {
            let mut request: MonteCarloRequest = read_request(&request)?;
            request.runs = runs.or(request.runs);
            request.seed = seed.or(request.seed);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let summary = service
                .run_monte_carlo(request, cancel)
                .await
                .map_err(|e| e.to_string())?;
            emit(&summary, cli.compact)
        }
        Command::Presets => emit(&presets(), cli.compact),
        Command::Constants => emit(&physics_constants(), cli.compact),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(None);
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(Some(&config.log_level));

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
