// Async Service Boundary - Settlement lookup with timeout, blocking workers
// Shared handle for servers and the CLI; the physics core stays synchronous

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::deflection::DeflectionStrategy;
use crate::error::{ProviderError, SimulationError};
use crate::monte_carlo::{CancellationToken, MonteCarloEngine, MonteCarloRequest, MonteCarloSummary};
use crate::settlements::{GdpTable, Settlement, SettlementProvider, StaticSettlements};
use crate::simulation::{
    exposure_radius_km, simulate_deflection, simulate_impact, DeflectionComparison, ImpactScenario,
    SimulationOptions, SimulationRequest, SimulationResponse,
};
use crate::units::{days_to_seconds, R_EARTH};
use crate::zones::{haversine_km, GeoPoint};

/// Prefetch radius multiplier; absorbs small changes in exposure reach
const PREFETCH_MARGIN: f64 = 2.0;

/// Monte Carlo site jitter covered by the prefetch, in standard deviations
const JITTER_SIGMAS: f64 = 4.0;

/// Any disc this wide covers the whole globe (km)
const HALF_CIRCUMFERENCE_KM: f64 = PI * R_EARTH / 1000.0;

/// Rounding slack for the coverage test (km)
const COVERAGE_SLACK_KM: f64 = 1e-6;

/// Largest horizontal shift a strategy can give the impact site (km)
fn drift_km(strategy: Option<&DeflectionStrategy>) -> f64 {
    strategy.map_or(0.0, |s| {
        s.delta_v_m_s.max(0.0) * days_to_seconds(s.lead_time_days.max(0.0)) / 1000.0
    })
}

/// Settlement lookup outcome handed to the core
enum Prefetched {
    /// Every settlement within `radius_km` of `center`
    Ready {
        settlements: StaticSettlements,
        center: GeoPoint,
        radius_km: f64,
    },
    Failed(ProviderError),
}

impl Prefetched {
    fn everywhere(settlements: StaticSettlements) -> Self {
        Prefetched::Ready {
            settlements,
            center: GeoPoint::new(0.0, 0.0),
            radius_km: f64::INFINITY,
        }
    }
}

impl SettlementProvider for Prefetched {
    fn settlements_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Settlement>, ProviderError> {
        match self {
            Prefetched::Ready {
                settlements,
                center: covered_center,
                radius_km: covered_radius_km,
            } => {
                let covered = *covered_radius_km >= HALF_CIRCUMFERENCE_KM
                    || haversine_km(*covered_center, center) + radius_km
                        <= covered_radius_km + COVERAGE_SLACK_KM;
                if !covered {
                    debug!(
                        latitude = center.latitude,
                        longitude = center.longitude,
                        radius_km,
                        "lookup outside prefetched area"
                    );
                    return Err(ProviderError::Unavailable(
                        "site outside prefetched settlement area".into(),
                    ));
                }
                settlements.settlements_near(center, radius_km)
            }
            Prefetched::Failed(err) => Err(err.clone()),
        }
    }
}

#[derive(Clone)]
pub struct ImpactService {
    config: Arc<EngineConfig>,
    provider: Arc<dyn SettlementProvider>,
    gdp: Arc<GdpTable>,
}

impl ImpactService {
    pub fn new(config: EngineConfig, provider: Arc<dyn SettlementProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            gdp: Arc::new(GdpTable::builtin()),
        }
    }

    pub fn with_gdp_table(mut self, gdp: GdpTable) -> Self {
        self.gdp = Arc::new(gdp);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve settlements around the baseline site once, bounded by the
    /// configured timeout. The disc is widened by `extra_km` so deflected
    /// or jittered sites stay inside it. Failures are carried into the
    /// core, which marks the exposure as unavailable.
    async fn prefetch(
        &self,
        scenario: &ImpactScenario,
        options: &SimulationOptions,
        extra_km: f64,
    ) -> Prefetched {
        if !options.include_population {
            return Prefetched::everywhere(StaticSettlements::default());
        }
        let radius_km = match scenario.resolve() {
            Ok(resolved) => {
                (exposure_radius_km(&resolved, options) * PREFETCH_MARGIN + extra_km)
                    .min(HALF_CIRCUMFERENCE_KM)
            }
            // The core reports the validation error itself
            Err(_) => return Prefetched::everywhere(StaticSettlements::default()),
        };
        let center = GeoPoint::new(scenario.impact_latitude, scenario.impact_longitude);
        let provider = self.provider.clone();
        let timeout_ms = self.config.provider_timeout_ms;

        let lookup = tokio::task::spawn_blocking(move || provider.settlements_near(center, radius_km));
        match tokio::time::timeout(Duration::from_millis(timeout_ms), lookup).await {
            Ok(Ok(Ok(list))) => Prefetched::Ready {
                settlements: StaticSettlements::new(list),
                center,
                radius_km,
            },
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "settlement provider failed");
                Prefetched::Failed(err)
            }
            Ok(Err(join)) => {
                warn!(error = %join, "settlement provider panicked");
                Prefetched::Failed(ProviderError::Unavailable(join.to_string()))
            }
            Err(_) => {
                warn!(timeout_ms, "settlement provider timed out");
                Prefetched::Failed(ProviderError::Timeout(timeout_ms))
            }
        }
    }

    /// Requests without options use the configured defaults.
    pub async fn simulate_impact(
        &self,
        mut request: SimulationRequest,
    ) -> Result<SimulationResponse, SimulationError> {
        let options = request
            .options
            .get_or_insert_with(|| self.config.default_options())
            .clone();
        let extra_km = drift_km(request.deflection.as_ref());
        let settlements = self.prefetch(&request.scenario, &options, extra_km).await;
        let gdp = self.gdp.clone();
        let response = tokio::task::spawn_blocking(move || simulate_impact(&request, &settlements, &gdp))
            .await
            .map_err(|e| SimulationError::Worker(e.to_string()))??;
        info!(
            megatons = response.baseline.tnt_equivalent_megatons,
            population = response.baseline.total_population_affected,
            "impact simulated"
        );
        Ok(response)
    }

    pub async fn simulate_deflection(
        &self,
        scenario: ImpactScenario,
        strategy: DeflectionStrategy,
        options: SimulationOptions,
    ) -> Result<DeflectionComparison, SimulationError> {
        let settlements = self.prefetch(&scenario, &options, drift_km(Some(&strategy))).await;
        let gdp = self.gdp.clone();
        tokio::task::spawn_blocking(move || {
            simulate_deflection(&scenario, &strategy, &options, &settlements, &gdp)
        })
        .await
        .map_err(|e| SimulationError::Worker(e.to_string()))?
    }

    /// Run Monte Carlo on a blocking worker. The returned summary records
    /// the seed actually used, so the run can be reproduced.
    pub async fn run_monte_carlo(
        &self,
        request: MonteCarloRequest,
        cancel: CancellationToken,
    ) -> Result<MonteCarloSummary, SimulationError> {
        let options = request
            .options
            .clone()
            .unwrap_or_else(|| self.config.default_options());
        let extra_km = drift_km(request.strategy.as_ref())
            + JITTER_SIGMAS * self.config.monte_carlo.location_jitter_km;
        let settlements = self.prefetch(&request.scenario, &options, extra_km).await;
        let config = self.config.clone();
        let gdp = self.gdp.clone();
        let runs = request.runs.unwrap_or(config.monte_carlo.default_runs);
        let seed = request
            .seed
            .or(config.default_seed)
            .unwrap_or_else(rand::random);

        tokio::task::spawn_blocking(move || {
            let engine = MonteCarloEngine {
                config: &config.monte_carlo,
                options: &options,
                provider: &settlements,
                gdp: &gdp,
            };
            let mut rng = StdRng::seed_from_u64(seed);
            let mut summary = engine.run(
                &request.scenario,
                request.strategy.as_ref(),
                runs,
                &mut rng,
                &cancel,
            )?;
            summary.seed = Some(seed);
            Ok(summary)
        })
        .await
        .map_err(|e| SimulationError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflection::StrategyKind;
    use crate::impact::{AsteroidSpec, Composition, TargetType};
    use crate::simulation::Trajectory;
    use crate::zones::ZoneScheme;

    fn scenario() -> ImpactScenario {
        ImpactScenario {
            asteroid: AsteroidSpec {
                diameter_m: 160.0,
                composition: Composition::Stony,
                density_kg_m3: None,
            },
            trajectory: Trajectory::Direct {
                velocity_m_s: 15_000.0,
                angle_deg: 45.0,
                azimuth_deg: None,
            },
            target_type: TargetType::ContinentalCrust,
            impact_latitude: 51.5,
            impact_longitude: -0.1,
        }
    }

    fn request() -> SimulationRequest {
        SimulationRequest {
            scenario: scenario(),
            options: None,
            deflection: None,
        }
    }

    #[tokio::test]
    async fn test_world_cities_exposure() {
        let service = ImpactService::new(
            EngineConfig::default(),
            Arc::new(StaticSettlements::world_cities()),
        );
        let response = service.simulate_impact(request()).await.unwrap();
        assert!(!response.baseline.data_unavailable);
        assert_eq!(response.baseline.affected_settlements[0].name, "London");
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let slow = |_: GeoPoint, _: f64| -> Result<Vec<Settlement>, ProviderError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![])
        };
        let config = EngineConfig {
            provider_timeout_ms: 20,
            ..EngineConfig::default()
        };
        let service = ImpactService::new(config, Arc::new(slow));
        let response = service.simulate_impact(request()).await.unwrap();
        assert!(response.baseline.data_unavailable);
        assert_eq!(response.baseline.total_population_affected, 0);
        assert!(response.baseline.energy_joules > 0.0);
    }

    #[tokio::test]
    async fn test_validation_error_surfaces() {
        let service = ImpactService::new(EngineConfig::default(), Arc::new(StaticSettlements::default()));
        let mut bad = request();
        bad.scenario.asteroid.diameter_m = 0.0;
        let err = service.simulate_impact(bad).await.unwrap_err();
        assert!(matches!(err, SimulationError::Validation(ref v) if v.field == "asteroid.diameter_m"));
    }

    #[tokio::test]
    async fn test_monte_carlo_records_seed() {
        let service = ImpactService::new(EngineConfig::default(), Arc::new(StaticSettlements::default()));
        let mc = MonteCarloRequest {
            scenario: scenario(),
            strategy: None,
            options: Some(SimulationOptions {
                include_population: false,
                ..SimulationOptions::default()
            }),
            runs: Some(64),
            seed: Some(1234),
        };
        let first = service.run_monte_carlo(mc.clone(), CancellationToken::new()).await.unwrap();
        let second = service.run_monte_carlo(mc, CancellationToken::new()).await.unwrap();
        assert_eq!(first.seed, Some(1234));
        assert_eq!(first.completed_runs, 64);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_options_use_configured_defaults() {
        let config = EngineConfig {
            zone_scheme: ZoneScheme::BlastKeyed,
            resolution_km: 3.0,
            ..EngineConfig::default()
        };
        let service = ImpactService::new(config, Arc::new(StaticSettlements::world_cities()));
        let response = service.simulate_impact(request()).await.unwrap();
        assert_eq!(response.metadata.zone_scheme, ZoneScheme::BlastKeyed);
        assert_eq!(response.metadata.resolution_km, 3.0);

        let mut explicit = request();
        explicit.options = Some(SimulationOptions::default());
        let response = service.simulate_impact(explicit).await.unwrap();
        assert_eq!(response.metadata.zone_scheme, ZoneScheme::CraterMultiples);
        assert_eq!(response.metadata.resolution_km, 10.0);
    }

    #[tokio::test]
    async fn test_deflected_site_far_from_baseline_keeps_exposure() {
        // ~3000 km of eastward drift carries the site well past the
        // baseline exposure disc
        let scenario = ImpactScenario {
            trajectory: Trajectory::Direct {
                velocity_m_s: 15_000.0,
                angle_deg: 20.0,
                azimuth_deg: Some(90.0),
            },
            impact_latitude: 40.0,
            impact_longitude: -100.0,
            ..scenario()
        };
        let strategy = DeflectionStrategy {
            kind: StrategyKind::KineticImpactor,
            delta_v_m_s: 0.01,
            direction: [1.0, 0.0, 0.0],
            lead_time_days: 3650.0,
            cost_usd: 0.0,
        };
        let options = SimulationOptions::default();
        let cities = StaticSettlements::world_cities();
        let direct = simulate_deflection(&scenario, &strategy, &options, &cities, &GdpTable::builtin())
            .unwrap();

        let service = ImpactService::new(EngineConfig::default(), Arc::new(cities));
        let served = service
            .simulate_deflection(scenario, strategy, options)
            .await
            .unwrap();

        let expected = direct.deflected.unwrap();
        let deflected = served.deflected.unwrap();
        assert!(!deflected.data_unavailable);
        assert!(deflected.total_population_affected > 0);
        assert_eq!(deflected.total_population_affected, expected.total_population_affected);
        assert_eq!(
            served.comparison.population_exposure_reduction,
            direct.comparison.population_exposure_reduction
        );
    }

    #[test]
    fn test_lookup_outside_prefetched_disc_is_unavailable() {
        let prefetched = Prefetched::Ready {
            settlements: StaticSettlements::world_cities(),
            center: GeoPoint::new(51.5, -0.1),
            radius_km: 500.0,
        };
        assert!(prefetched.settlements_near(GeoPoint::new(51.5, -0.1), 400.0).is_ok());
        // Paris is ~340 km away: a 400 km disc there pokes out of the 500 km one
        assert!(matches!(
            prefetched.settlements_near(GeoPoint::new(48.9, 2.35), 400.0),
            Err(ProviderError::Unavailable(_))
        ));
        assert!(Prefetched::everywhere(StaticSettlements::default())
            .settlements_near(GeoPoint::new(-33.9, 151.2), 1000.0)
            .is_ok());
    }

    #[test]
    fn test_drift_bound() {
        let strategy = DeflectionStrategy {
            kind: StrategyKind::KineticImpactor,
            delta_v_m_s: 0.01,
            direction: [1.0, 0.0, 0.0],
            lead_time_days: 100.0,
            cost_usd: 0.0,
        };
        assert_eq!(drift_km(None), 0.0);
        assert!((drift_km(Some(&strategy)) - 86.4).abs() < 1e-9);
    }
}
