// Engine Configuration - Defaults, JSON file and IMPACTSIM_* overrides
// Later sources win: defaults < config file < environment

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::effects::CoastModel;
use crate::error::{require_positive, ConfigError};
use crate::monte_carlo::MonteCarloConfig;
use crate::simulation::SimulationOptions;
use crate::zones::ZoneScheme;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "IMPACTSIM_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub monte_carlo: MonteCarloConfig,
    /// Seed used when a request does not carry one
    pub default_seed: Option<u64>,
    /// Settlement lookup budget (ms)
    pub provider_timeout_ms: u64,
    /// Settlement cache lifetime (s)
    pub provider_cache_ttl_s: u64,
    pub coast: CoastModel,
    pub zone_scheme: ZoneScheme,
    pub resolution_km: f64,
    pub seismic_reach_km: f64,
    /// tracing filter directive; RUST_LOG takes precedence
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monte_carlo: MonteCarloConfig::default(),
            default_seed: None,
            provider_timeout_ms: 5000,
            provider_cache_ttl_s: 3600,
            coast: CoastModel::default(),
            zone_scheme: ZoneScheme::default(),
            resolution_km: 10.0,
            seismic_reach_km: 1000.0,
            log_level: "info".to_string(),
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl EngineConfig {
    /// Defaults, then the optional JSON file, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Apply `IMPACTSIM_*` overrides; unknown keys are ignored.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "MC_RUNS" => self.monte_carlo.default_runs = parse(&key, &value)?,
                "MC_MAX_RUNS" => self.monte_carlo.max_runs = parse(&key, &value)?,
                "MC_PARALLEL" => self.monte_carlo.parallel = parse_bool(&key, &value)?,
                "MC_DIAMETER_SIGMA" => self.monte_carlo.diameter_sigma = parse(&key, &value)?,
                "MC_VELOCITY_SIGMA" => self.monte_carlo.velocity_sigma = parse(&key, &value)?,
                "MC_ANGLE_SIGMA" => self.monte_carlo.angle_sigma = parse(&key, &value)?,
                "MC_JITTER_KM" => self.monte_carlo.location_jitter_km = parse(&key, &value)?,
                "SEED" => self.default_seed = Some(parse(&key, &value)?),
                "PROVIDER_TIMEOUT_MS" => self.provider_timeout_ms = parse(&key, &value)?,
                "PROVIDER_CACHE_TTL_S" => self.provider_cache_ttl_s = parse(&key, &value)?,
                "SHORE_DISTANCE_KM" => self.coast.distance_to_shore_km = parse(&key, &value)?,
                "SHORE_SLOPE" => self.coast.shore_slope = parse(&key, &value)?,
                "RESOLUTION_KM" => self.resolution_km = parse(&key, &value)?,
                "SEISMIC_REACH_KM" => self.seismic_reach_km = parse(&key, &value)?,
                "ZONE_SCHEME" => {
                    self.zone_scheme = match value.trim().to_ascii_lowercase().as_str() {
                        "crater_multiples" => ZoneScheme::CraterMultiples,
                        "blast_keyed" => ZoneScheme::BlastKeyed,
                        _ => {
                            return Err(ConfigError::Env {
                                key: key.clone(),
                                value: value.clone(),
                            })
                        }
                    }
                }
                "LOG_LEVEL" => self.log_level = value.trim().to_string(),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monte_carlo.validate()?;
        self.default_options().validate()?;
        require_positive("provider_timeout_ms", self.provider_timeout_ms as f64)?;
        Ok(())
    }

    /// Simulation options derived from the configured defaults
    pub fn default_options(&self) -> SimulationOptions {
        SimulationOptions {
            resolution_km: self.resolution_km,
            zone_scheme: self.zone_scheme,
            coast: self.coast,
            seismic_reach_km: self.seismic_reach_km,
            ..SimulationOptions::default()
        }
    }
}
