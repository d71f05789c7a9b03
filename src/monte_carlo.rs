// Monte Carlo Uncertainty Engine - Stochastic trials over the impact pipeline
// Trials may run on rayon workers; results are reduced in trial order

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::deflection::DeflectionStrategy;
use crate::error::{require_non_negative, SimulationError, ValidationError};
use crate::impact::AsteroidProperties;
use crate::orbit::ImpactGeometry;
use crate::settlements::{GdpTable, SettlementProvider};
use crate::simulation::{
    evaluate_deflection, evaluate_impact, ImpactScenario, ResolvedScenario, SimulationOptions,
};
use crate::zones::GeoPoint;

/// Perturbed diameter/velocity never drop below this fraction of nominal
const MIN_SAMPLE_FACTOR: f64 = 0.05;

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub default_runs: u32,
    /// Hard cap on trials per request
    pub max_runs: u32,
    pub parallel: bool,
    /// 1σ multiplicative noise on diameter
    pub diameter_sigma: f64,
    /// 1σ multiplicative noise on velocity
    pub velocity_sigma: f64,
    /// 1σ multiplicative noise on entry angle
    pub angle_sigma: f64,
    /// 1σ impact point jitter (km) in each horizontal direction
    pub location_jitter_km: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            default_runs: 1000,
            max_runs: 10_000,
            parallel: true,
            diameter_sigma: 0.1,
            velocity_sigma: 0.05,
            angle_sigma: 0.1,
            location_jitter_km: 5.0,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_runs == 0 {
            return Err(ValidationError::new("monte_carlo.max_runs", "must be >= 1"));
        }
        if self.default_runs == 0 || self.default_runs > self.max_runs {
            return Err(ValidationError::new(
                "monte_carlo.default_runs",
                format!("must be within [1, {}]", self.max_runs),
            ));
        }
        require_non_negative("monte_carlo.diameter_sigma", self.diameter_sigma)?;
        require_non_negative("monte_carlo.velocity_sigma", self.velocity_sigma)?;
        require_non_negative("monte_carlo.angle_sigma", self.angle_sigma)?;
        require_non_negative("monte_carlo.location_jitter_km", self.location_jitter_km)?;
        Ok(())
    }

    fn check_runs(&self, runs: u32) -> Result<(), ValidationError> {
        if runs == 0 || runs > self.max_runs {
            return Err(ValidationError::new(
                "runs",
                format!("must be within [1, {}]", self.max_runs),
            ));
        }
        Ok(())
    }
}

/// Request record for the CLI and the async service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonteCarloRequest {
    pub scenario: ImpactScenario,
    #[serde(default)]
    pub strategy: Option<DeflectionStrategy>,
    /// `None` leaves the choice to the caller's configured defaults
    #[serde(default)]
    pub options: Option<SimulationOptions>,
    #[serde(default)]
    pub runs: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Shared flag checked between trials.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy)]
struct RunningStats {
    n: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            n: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    fn finish(&self) -> Option<MetricStats> {
        if self.n == 0 {
            return None;
        }
        let n = self.n as f64;
        let mean = self.sum / n;
        Some(MetricStats {
            mean,
            variance: (self.sum_sq / n - mean * mean).max(0.0),
            min: self.min,
            max: self.max,
        })
    }
}

/// Spread of impact points; x is longitude, y is latitude (degrees)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImpactPointCovariance {
    pub mean_x: f64,
    pub mean_y: f64,
    pub var_x: f64,
    pub var_y: f64,
    pub cov_xy: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PointStats {
    n: u64,
    sx: f64,
    sy: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

impl PointStats {
    fn push(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.syy += y * y;
        self.sxy += x * y;
    }

    fn finish(&self) -> Option<ImpactPointCovariance> {
        if self.n == 0 {
            return None;
        }
        let n = self.n as f64;
        let (mean_x, mean_y) = (self.sx / n, self.sy / n);
        Some(ImpactPointCovariance {
            mean_x,
            mean_y,
            var_x: (self.sxx / n - mean_x * mean_x).max(0.0),
            var_y: (self.syy / n - mean_y * mean_y).max(0.0),
            cov_xy: self.sxy / n - mean_x * mean_y,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeflectionEffectSummary {
    pub mean_miss_distance_km: f64,
    pub mean_impact_probability: f64,
    pub mean_energy_reduction_pct: f64,
    pub mean_population_exposure_reduction: f64,
    /// Share of trials in which the asteroid missed
    pub miss_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonteCarloSummary {
    pub total_runs: u32,
    pub completed_runs: u32,
    pub cancelled: bool,
    /// Trials that ended with an impact (all of them without a strategy)
    pub impacting_runs: u32,
    /// Seed of the injected RNG, when the caller knows it
    pub seed: Option<u64>,
    pub energy_joules: Option<MetricStats>,
    pub tnt_megatons: Option<MetricStats>,
    pub crater_diameter_m: Option<MetricStats>,
    pub seismic_magnitude: Option<MetricStats>,
    pub tsunami_height_m: Option<MetricStats>,
    pub population_affected: Option<MetricStats>,
    pub economic_loss_usd: Option<MetricStats>,
    pub impact_point: Option<ImpactPointCovariance>,
    pub mean_deflection_effect: Option<DeflectionEffectSummary>,
}

// =============================================================================
// TRIALS
// =============================================================================

fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

fn sample_factor<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    (1.0 + sigma * gaussian(rng)).max(MIN_SAMPLE_FACTOR)
}

struct DeflectionSample {
    miss_distance_km: f64,
    impact_probability: f64,
    energy_reduction_pct: f64,
    population_exposure_reduction: f64,
}

struct TrialOutcome {
    energy_joules: f64,
    tnt_megatons: f64,
    crater_diameter_m: f64,
    seismic_magnitude: f64,
    tsunami_height_m: Option<f64>,
    population_affected: f64,
    economic_loss_usd: f64,
    /// (longitude, latitude) of the final impact, if any
    impact_point: Option<(f64, f64)>,
    deflection: Option<DeflectionSample>,
}

#[derive(Default)]
struct Accumulator {
    completed: u32,
    impacting: u32,
    energy: RunningStats,
    megatons: RunningStats,
    crater: RunningStats,
    seismic: RunningStats,
    tsunami: RunningStats,
    population: RunningStats,
    loss: RunningStats,
    points: PointStats,
    miss: RunningStats,
    probability: RunningStats,
    energy_reduction: RunningStats,
    population_reduction: RunningStats,
    misses: u32,
}

impl Accumulator {
    fn push(&mut self, trial: &TrialOutcome) {
        self.completed += 1;
        self.energy.push(trial.energy_joules);
        self.megatons.push(trial.tnt_megatons);
        self.crater.push(trial.crater_diameter_m);
        self.seismic.push(trial.seismic_magnitude);
        if let Some(h) = trial.tsunami_height_m {
            self.tsunami.push(h);
        }
        self.population.push(trial.population_affected);
        self.loss.push(trial.economic_loss_usd);
        if let Some((x, y)) = trial.impact_point {
            self.impacting += 1;
            self.points.push(x, y);
        }
        if let Some(d) = &trial.deflection {
            self.miss.push(d.miss_distance_km);
            self.probability.push(d.impact_probability);
            self.energy_reduction.push(d.energy_reduction_pct);
            self.population_reduction.push(d.population_exposure_reduction);
            if d.impact_probability == 0.0 {
                self.misses += 1;
            }
        }
    }

    fn finish(self, total_runs: u32, cancelled: bool) -> MonteCarloSummary {
        let mean = |s: &RunningStats| s.finish().map_or(0.0, |m| m.mean);
        let mean_deflection_effect = (self.miss.n > 0).then(|| DeflectionEffectSummary {
            mean_miss_distance_km: mean(&self.miss),
            mean_impact_probability: mean(&self.probability),
            mean_energy_reduction_pct: mean(&self.energy_reduction),
            mean_population_exposure_reduction: mean(&self.population_reduction),
            miss_fraction: self.misses as f64 / self.miss.n as f64,
        });

        MonteCarloSummary {
            total_runs,
            completed_runs: self.completed,
            cancelled,
            impacting_runs: self.impacting,
            seed: None,
            energy_joules: self.energy.finish(),
            tnt_megatons: self.megatons.finish(),
            crater_diameter_m: self.crater.finish(),
            seismic_magnitude: self.seismic.finish(),
            tsunami_height_m: self.tsunami.finish(),
            population_affected: self.population.finish(),
            economic_loss_usd: self.loss.finish(),
            impact_point: self.points.finish(),
            mean_deflection_effect,
        }
    }
}

/// Runs trials against a fixed configuration and settlement source.
pub struct MonteCarloEngine<'a> {
    pub config: &'a MonteCarloConfig,
    pub options: &'a SimulationOptions,
    pub provider: &'a dyn SettlementProvider,
    pub gdp: &'a GdpTable,
}

impl<'a> MonteCarloEngine<'a> {
    /// Run `runs` trials. Per-trial seeds are drawn from `rng` up front so
    /// the summary does not depend on how trials are scheduled.
    pub fn run<R: Rng + ?Sized>(
        &self,
        scenario: &ImpactScenario,
        strategy: Option<&DeflectionStrategy>,
        runs: u32,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<MonteCarloSummary, SimulationError> {
        self.config.check_runs(runs)?;
        self.options.validate()?;
        if let Some(s) = strategy {
            s.validate()?;
        }
        let base = scenario.resolve()?;

        let started = Instant::now();
        let seeds: Vec<u64> = (0..runs).map(|_| rng.gen()).collect();
        let trial = |&seed: &u64| -> Option<Result<TrialOutcome, SimulationError>> {
            if cancel.is_cancelled() {
                return None;
            }
            Some(self.trial(&base, strategy, seed))
        };

        let outcomes: Vec<_> = if self.config.parallel {
            seeds.par_iter().map(trial).collect()
        } else {
            seeds.iter().map(trial).collect()
        };

        let mut acc = Accumulator::default();
        for outcome in outcomes.into_iter().flatten() {
            acc.push(&outcome?);
        }
        let cancelled = acc.completed < runs;
        let summary = acc.finish(runs, cancelled);

        info!(
            runs,
            completed = summary.completed_runs,
            impacting = summary.impacting_runs,
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "monte carlo finished"
        );
        Ok(summary)
    }

    fn trial(
        &self,
        base: &ResolvedScenario,
        strategy: Option<&DeflectionStrategy>,
        seed: u64,
    ) -> Result<TrialOutcome, SimulationError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let cfg = self.config;

        let diameter = base.asteroid.diameter_m() * sample_factor(&mut rng, cfg.diameter_sigma);
        let asteroid = AsteroidProperties::new(diameter, base.asteroid.density_kg_m3())?;
        let velocity = base.geometry.velocity_m_s * sample_factor(&mut rng, cfg.velocity_sigma);
        let angle = (base.geometry.angle_deg * (1.0 + cfg.angle_sigma * gaussian(&mut rng)))
            .clamp(1.0, 90.0);
        let site = GeoPoint::new(base.geometry.latitude, base.geometry.longitude).offset_km(
            cfg.location_jitter_km * gaussian(&mut rng),
            cfg.location_jitter_km * gaussian(&mut rng),
        );

        let resolved = ResolvedScenario {
            asteroid,
            geometry: ImpactGeometry {
                velocity_m_s: velocity,
                angle_deg: angle,
                latitude: site.latitude,
                longitude: site.longitude,
                ..base.geometry.clone()
            },
            target_type: base.target_type,
        };

        let impact = evaluate_impact(&resolved, self.options, self.provider, self.gdp);

        let (impact_point, deflection) = match strategy {
            None => (Some((site.longitude, site.latitude)), None),
            Some(strategy) => {
                let (result, _) = evaluate_deflection(
                    &resolved,
                    &impact,
                    strategy,
                    self.options,
                    self.provider,
                    self.gdp,
                )?;
                let point = result
                    .new_impact_location
                    .map(|p| (p.longitude, p.latitude));
                let sample = DeflectionSample {
                    miss_distance_km: result.miss_distance_km,
                    impact_probability: result.impact_probability,
                    energy_reduction_pct: result.energy_reduction_pct,
                    population_exposure_reduction: result.population_exposure_reduction as f64,
                };
                (point, Some(sample))
            }
        };

        Ok(TrialOutcome {
            energy_joules: impact.energy_joules,
            tnt_megatons: impact.tnt_equivalent_megatons,
            crater_diameter_m: impact.crater_diameter_m,
            seismic_magnitude: impact.seismic_magnitude,
            tsunami_height_m: impact.tsunami_height_m,
            population_affected: impact.total_population_affected as f64,
            economic_loss_usd: impact.total_economic_loss_usd,
            impact_point,
            deflection,
        })
    }
}

/// Convenience entry point with default configuration.
pub fn run_monte_carlo<R: Rng + ?Sized>(
    scenario: &ImpactScenario,
    strategy: Option<&DeflectionStrategy>,
    runs: u32,
    options: &SimulationOptions,
    provider: &dyn SettlementProvider,
    rng: &mut R,
) -> Result<MonteCarloSummary, SimulationError> {
    let config = MonteCarloConfig::default();
    let gdp = GdpTable::builtin();
    let engine = MonteCarloEngine {
        config: &config,
        options,
        provider,
        gdp: &gdp,
    };
    engine.run(scenario, strategy, runs, rng, &CancellationToken::new())
}
