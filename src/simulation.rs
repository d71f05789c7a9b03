// Simulation Pipeline - Geometry → energy/crater → effects → zones/exposure
// Requests and responses are plain serde records; the core is synchronous

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::deflection::{self, DeflectionResult, DeflectionStrategy};
use crate::effects::{secondary_effects, CoastModel, TsunamiSeverity, MAX_SEISMIC_MAGNITUDE};
use crate::error::{
    require_non_negative, require_positive, require_range, SimulationError, ValidationError,
};
use crate::impact::{
    crater_dimensions, impact_energy, AsteroidProperties, AsteroidSpec, ImpactParameters,
    TargetType,
};
use crate::orbit::{ImpactGeometry, KeplerianElements};
use crate::settlements::{GdpTable, SettlementProvider};
use crate::zones::{
    affected_coastline_km, assess_exposure, damage_zones, mmi_zones, tsunami_zones,
    AffectedSettlement, DamageZone, ExposureReport, GeoPoint, MmiZone, TierThresholds,
    TsunamiZone, ZoneScheme,
};

/// Models reported in the response metadata
const PHYSICS_MODELS: &[&str] = &[
    "pi-scaling crater (D = 1.25 (E / rho g)^1/4 sin^1/3)",
    "seismic moment magnitude (eta = 0.01)",
    "tsunami amplitude with geometric spreading, dissipation and shoaling",
    "blast/thermal cube-root scaling",
    "linear deflection drift",
];

// =============================================================================
// REQUEST
// =============================================================================

/// How the arrival speed and angle are obtained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Trajectory {
    Direct {
        velocity_m_s: f64,
        angle_deg: f64,
        #[serde(default)]
        azimuth_deg: Option<f64>,
    },
    Orbit {
        elements: KeplerianElements,
        /// Measured entry angle; estimated from the orbit when absent
        #[serde(default)]
        angle_deg: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactScenario {
    pub asteroid: AsteroidSpec,
    pub trajectory: Trajectory,
    #[serde(default)]
    pub target_type: TargetType,
    pub impact_latitude: f64,
    pub impact_longitude: f64,
}

/// Validated inputs ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScenario {
    pub asteroid: AsteroidProperties,
    pub geometry: ImpactGeometry,
    pub target_type: TargetType,
}

impl ImpactScenario {
    /// Validate every field and build the impact geometry.
    /// Orbit input runs the Kepler solver and may fail with a geometry error.
    pub fn resolve(&self) -> Result<ResolvedScenario, SimulationError> {
        let asteroid = AsteroidProperties::from_spec(&self.asteroid)?;

        let geometry = match &self.trajectory {
            Trajectory::Direct {
                velocity_m_s,
                angle_deg,
                azimuth_deg,
            } => {
                ImpactParameters {
                    velocity_m_s: *velocity_m_s,
                    angle_deg: *angle_deg,
                    target_type: self.target_type,
                    impact_latitude: self.impact_latitude,
                    impact_longitude: self.impact_longitude,
                }
                .validate()?;
                if let Some(azimuth) = azimuth_deg {
                    require_range("trajectory.azimuth_deg", *azimuth, 0.0, 360.0)?;
                }
                ImpactGeometry::direct(
                    *velocity_m_s,
                    *angle_deg,
                    self.impact_latitude,
                    self.impact_longitude,
                    *azimuth_deg,
                )
            }
            Trajectory::Orbit {
                elements,
                angle_deg,
            } => {
                elements.validate()?;
                require_range("impact_latitude", self.impact_latitude, -90.0, 90.0)?;
                require_range("impact_longitude", self.impact_longitude, -180.0, 180.0)?;
                if let Some(angle) = angle_deg {
                    require_range("angle_deg", *angle, 0.0, 90.0)?;
                }
                ImpactGeometry::from_orbit(
                    elements,
                    self.impact_latitude,
                    self.impact_longitude,
                    *angle_deg,
                )?
            }
        };

        Ok(ResolvedScenario {
            asteroid,
            geometry,
            target_type: self.target_type,
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_resolution_km() -> f64 {
    10.0
}

fn default_seismic_reach_km() -> f64 {
    1000.0
}

/// Which optional effects to compute and at what ring resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationOptions {
    #[serde(default = "default_true")]
    pub include_tsunami: bool,
    #[serde(default = "default_true")]
    pub include_seismic: bool,
    #[serde(default = "default_true")]
    pub include_population: bool,
    /// Target ring edge length (km)
    #[serde(default = "default_resolution_km")]
    pub resolution_km: f64,
    #[serde(default)]
    pub zone_scheme: ZoneScheme,
    #[serde(default)]
    pub coast: CoastModel,
    /// Outer radius of the seismic intensity rings (km)
    #[serde(default = "default_seismic_reach_km")]
    pub seismic_reach_km: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            include_tsunami: true,
            include_seismic: true,
            include_population: true,
            resolution_km: default_resolution_km(),
            zone_scheme: ZoneScheme::default(),
            coast: CoastModel::default(),
            seismic_reach_km: default_seismic_reach_km(),
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("options.resolution_km", self.resolution_km)?;
        require_positive("options.seismic_reach_km", self.seismic_reach_km)?;
        require_positive("options.coast.shore_slope", self.coast.shore_slope)?;
        require_non_negative("options.coast.distance_to_shore_km", self.coast.distance_to_shore_km)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationRequest {
    pub scenario: ImpactScenario,
    /// `None` leaves the choice to the caller's configured defaults
    #[serde(default)]
    pub options: Option<SimulationOptions>,
    #[serde(default)]
    pub deflection: Option<DeflectionStrategy>,
}

// =============================================================================
// RESULT
// =============================================================================

/// `[low, high]` interval
pub type Interval = [f64; 2];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UncertaintyBounds {
    pub crater_diameter_m: Interval,
    pub seismic_magnitude: Interval,
    pub tsunami_height_m: Option<Interval>,
    pub population_affected: [u64; 2],
}

impl UncertaintyBounds {
    fn new(crater_diameter_m: f64, magnitude: f64, tsunami_m: Option<f64>, population: u64) -> Self {
        Self {
            crater_diameter_m: [crater_diameter_m * 0.8, crater_diameter_m * 1.2],
            seismic_magnitude: [
                (magnitude - 0.5).max(0.0),
                (magnitude + 0.5).min(MAX_SEISMIC_MAGNITUDE),
            ],
            tsunami_height_m: tsunami_m.map(|h| [h * 0.5, h * 2.0]),
            population_affected: [population / 2, population.saturating_mul(2)],
        }
    }
}

/// Everything computed for one impact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactResult {
    pub impact_latitude: f64,
    pub impact_longitude: f64,
    pub impact_velocity_m_s: f64,
    pub impact_angle_deg: f64,
    pub angle_estimated: bool,
    pub target_type: TargetType,

    pub mass_kg: f64,
    pub energy_joules: f64,
    pub tnt_equivalent_megatons: f64,
    pub crater_diameter_m: f64,
    pub crater_depth_m: f64,
    pub crater_rim_height_m: f64,

    pub seismic_magnitude: f64,
    pub peak_ground_acceleration: f64,
    pub tsunami_height_m: Option<f64>,
    pub tsunami_severity: Option<TsunamiSeverity>,
    pub blast_radius_km: f64,
    pub thermal_radius_km: f64,

    pub damage_zones: Vec<DamageZone>,
    pub mmi_zones: Vec<MmiZone>,
    pub tsunami_zones: Vec<TsunamiZone>,
    pub affected_coastline_km: Option<f64>,

    pub affected_settlements: Vec<AffectedSettlement>,
    pub total_population_affected: u64,
    pub total_economic_loss_usd: f64,
    pub gdp_impact_percentage: f64,
    pub data_unavailable: bool,

    pub uncertainty_bounds: UncertaintyBounds,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationMetadata {
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
    pub resolution_km: f64,
    pub zone_scheme: ZoneScheme,
    pub models: Vec<String>,
    /// Epoch of the orbit solution, for orbit-derived scenarios
    pub orbit_epoch_utc: Option<DateTime<Utc>>,
}

impl SimulationMetadata {
    fn new(options: &SimulationOptions, geometry: &ImpactGeometry) -> Self {
        Self {
            generated_at: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            resolution_km: options.resolution_km,
            zone_scheme: options.zone_scheme,
            models: PHYSICS_MODELS.iter().map(|m| m.to_string()).collect(),
            orbit_epoch_utc: geometry.epoch_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResponse {
    pub baseline: ImpactResult,
    pub deflection: Option<DeflectionResult>,
    /// Impact after deflection; absent when the asteroid misses
    pub deflected: Option<ImpactResult>,
    pub metadata: SimulationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeflectionComparison {
    pub baseline: ImpactResult,
    /// Absent when the deflected asteroid misses Earth
    pub deflected: Option<ImpactResult>,
    pub comparison: DeflectionResult,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Radii shared by the rings and the exposure search.
struct Reach {
    thresholds: TierThresholds,
    search_radius_km: f64,
}

fn reach(
    crater_radius_km: f64,
    blast_radius_km: f64,
    tsunami_zones: &[TsunamiZone],
    options: &SimulationOptions,
) -> Reach {
    let thresholds = options
        .zone_scheme
        .thresholds(crater_radius_km, blast_radius_km);
    let tsunami_km = tsunami_zones
        .iter()
        .map(|z| z.distance_km)
        .fold(0.0, f64::max);
    let seismic_km = if options.include_seismic {
        options.seismic_reach_km
    } else {
        0.0
    };
    let search_radius_km = thresholds
        .outermost_km()
        .max(blast_radius_km)
        .max(tsunami_km)
        .max(seismic_km);
    Reach {
        thresholds,
        search_radius_km,
    }
}

/// Radius (km) within which settlements can appear in the exposure report.
pub fn exposure_radius_km(resolved: &ResolvedScenario, options: &SimulationOptions) -> f64 {
    let energy = impact_energy(&resolved.asteroid, resolved.geometry.velocity_m_s);
    let crater = crater_dimensions(
        energy.energy_joules,
        resolved.geometry.angle_deg,
        resolved.target_type.density(),
    );
    let marine = resolved.target_type.is_marine() && options.include_tsunami;
    let fx = secondary_effects(energy.energy_joules, crater.radius_km(), marine, &options.coast);
    let tsunami = fx
        .tsunami_height_m
        .map(|h| tsunami_zones(h, GeoPoint::new(0.0, 0.0), options.resolution_km))
        .unwrap_or_default();
    reach(crater.radius_km(), fx.blast_radius_km, &tsunami, options).search_radius_km
}

/// Run energy, crater, secondary effects and exposure for one impact.
///
/// Provider failures degrade the exposure section to zero with
/// `data_unavailable` set; the physics is unaffected.
pub fn evaluate_impact(
    resolved: &ResolvedScenario,
    options: &SimulationOptions,
    provider: &dyn SettlementProvider,
    gdp: &GdpTable,
) -> ImpactResult {
    let geometry = &resolved.geometry;
    let center = GeoPoint::new(geometry.latitude, geometry.longitude);

    let energy = impact_energy(&resolved.asteroid, geometry.velocity_m_s);
    let crater = crater_dimensions(
        energy.energy_joules,
        geometry.angle_deg,
        resolved.target_type.density(),
    );
    let marine = resolved.target_type.is_marine() && options.include_tsunami;
    let fx = secondary_effects(energy.energy_joules, crater.radius_km(), marine, &options.coast);

    debug!(
        megatons = energy.tnt_megatons,
        crater_m = crater.diameter_m,
        magnitude = fx.seismic_magnitude,
        "impact evaluated"
    );

    let tsunami = fx
        .tsunami_height_m
        .map(|h| tsunami_zones(h, center, options.resolution_km))
        .unwrap_or_default();
    let Reach {
        thresholds,
        search_radius_km,
    } = reach(crater.radius_km(), fx.blast_radius_km, &tsunami, options);

    let zones = damage_zones(center, &thresholds, options.resolution_km);
    let mmi = if options.include_seismic {
        mmi_zones(
            fx.seismic_magnitude,
            center,
            options.seismic_reach_km,
            options.resolution_km,
        )
    } else {
        Vec::new()
    };

    let exposure = if options.include_population {
        match provider.settlements_near(center, search_radius_km) {
            Ok(candidates) => assess_exposure(center, &thresholds, search_radius_km, &candidates, gdp),
            Err(err) => {
                warn!(error = %err, "settlement data unavailable; exposure set to zero");
                ExposureReport::unavailable()
            }
        }
    } else {
        ExposureReport::default()
    };

    let uncertainty_bounds = UncertaintyBounds::new(
        crater.diameter_m,
        fx.seismic_magnitude,
        fx.tsunami_height_m,
        exposure.total_population_affected,
    );

    ImpactResult {
        impact_latitude: geometry.latitude,
        impact_longitude: geometry.longitude,
        impact_velocity_m_s: geometry.velocity_m_s,
        impact_angle_deg: geometry.angle_deg,
        angle_estimated: geometry.angle_estimated,
        target_type: resolved.target_type,
        mass_kg: energy.mass_kg,
        energy_joules: energy.energy_joules,
        tnt_equivalent_megatons: energy.tnt_megatons,
        crater_diameter_m: crater.diameter_m,
        crater_depth_m: crater.depth_m,
        crater_rim_height_m: crater.rim_height_m,
        seismic_magnitude: fx.seismic_magnitude,
        peak_ground_acceleration: fx.peak_ground_acceleration,
        tsunami_height_m: fx.tsunami_height_m,
        tsunami_severity: fx.tsunami_severity,
        blast_radius_km: fx.blast_radius_km,
        thermal_radius_km: fx.thermal_radius_km,
        affected_coastline_km: fx.tsunami_height_m.map(|_| affected_coastline_km(&tsunami)),
        damage_zones: zones,
        mmi_zones: mmi,
        tsunami_zones: tsunami,
        affected_settlements: exposure.settlements,
        total_population_affected: exposure.total_population_affected,
        total_economic_loss_usd: exposure.total_economic_loss_usd,
        gdp_impact_percentage: exposure.gdp_impact_percentage,
        data_unavailable: exposure.data_unavailable,
        uncertainty_bounds,
    }
}

/// Apply a strategy and, if the asteroid still hits, re-run the pipeline
/// at the shifted site.
pub fn evaluate_deflection(
    resolved: &ResolvedScenario,
    baseline: &ImpactResult,
    strategy: &DeflectionStrategy,
    options: &SimulationOptions,
    provider: &dyn SettlementProvider,
    gdp: &GdpTable,
) -> Result<(DeflectionResult, Option<ImpactResult>), ValidationError> {
    let trajectory = deflection::propagate(&resolved.geometry, strategy)?;

    let deflected = if strategy.delta_v_m_s == 0.0 {
        Some(baseline.clone())
    } else {
        trajectory.geometry.as_ref().map(|geometry| {
            let shifted = ResolvedScenario {
                geometry: geometry.clone(),
                ..resolved.clone()
            };
            evaluate_impact(&shifted, options, provider, gdp)
        })
    };

    let deflected_population = deflected
        .as_ref()
        .map_or(0, |r| r.total_population_affected);
    let result = DeflectionResult::new(
        strategy,
        &trajectory,
        baseline.total_population_affected,
        deflected_population,
    );
    debug!(
        miss_km = result.miss_distance_km,
        probability = result.impact_probability,
        "deflection evaluated"
    );
    Ok((result, deflected))
}

/// Baseline impact plus an optional deflection comparison.
pub fn simulate_impact(
    request: &SimulationRequest,
    provider: &dyn SettlementProvider,
    gdp: &GdpTable,
) -> Result<SimulationResponse, SimulationError> {
    let options = request.options.clone().unwrap_or_default();
    options.validate()?;
    if let Some(strategy) = &request.deflection {
        strategy.validate()?;
    }
    let resolved = request.scenario.resolve()?;
    let baseline = evaluate_impact(&resolved, &options, provider, gdp);

    let (deflection, deflected) = match &request.deflection {
        Some(strategy) => {
            let (result, deflected) =
                evaluate_deflection(&resolved, &baseline, strategy, &options, provider, gdp)?;
            (Some(result), deflected)
        }
        None => (None, None),
    };

    Ok(SimulationResponse {
        metadata: SimulationMetadata::new(&options, &resolved.geometry),
        baseline,
        deflection,
        deflected,
    })
}

/// Baseline and deflected impacts side by side.
pub fn simulate_deflection(
    scenario: &ImpactScenario,
    strategy: &DeflectionStrategy,
    options: &SimulationOptions,
    provider: &dyn SettlementProvider,
    gdp: &GdpTable,
) -> Result<DeflectionComparison, SimulationError> {
    options.validate()?;
    strategy.validate()?;
    let resolved = scenario.resolve()?;
    let baseline = evaluate_impact(&resolved, options, provider, gdp);
    let (comparison, deflected) =
        evaluate_deflection(&resolved, &baseline, strategy, options, provider, gdp)?;
    Ok(DeflectionComparison {
        baseline,
        deflected,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflection::StrategyKind;
    use crate::error::ProviderError;
    use crate::impact::Composition;
    use crate::settlements::{Settlement, StaticSettlements};
    use crate::zones::ExposureTier;
    use approx::assert_relative_eq;

    fn scenario(target_type: TargetType) -> ImpactScenario {
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
            target_type,
            impact_latitude: 40.0,
            impact_longitude: -74.0,
        }
    }

    fn town(name: &str, lat: f64, lon: f64) -> Settlement {
        Settlement {
            name: name.to_string(),
            country: "USA".to_string(),
            country_code: Some("US".to_string()),
            latitude: lat,
            longitude: lon,
            population: 10_000,
            gdp_per_capita_usd: None,
        }
    }

    fn all_finite(r: &ImpactResult) -> bool {
        [
            r.mass_kg,
            r.energy_joules,
            r.tnt_equivalent_megatons,
            r.crater_diameter_m,
            r.crater_depth_m,
            r.seismic_magnitude,
            r.peak_ground_acceleration,
            r.blast_radius_km,
            r.thermal_radius_km,
            r.total_economic_loss_usd,
            r.gdp_impact_percentage,
        ]
        .iter()
        .all(|v| v.is_finite())
            && r.tsunami_height_m.map_or(true, f64::is_finite)
    }

    #[test]
    fn test_reference_scenario() {
        let request = SimulationRequest {
            scenario: scenario(TargetType::ContinentalCrust),
            options: None,
            deflection: None,
        };
        let response =
            simulate_impact(&request, &StaticSettlements::default(), &GdpTable::builtin()).unwrap();
        let r = &response.baseline;
        assert_relative_eq!(r.mass_kg, 6.43e9, max_relative = 0.05);
        assert_relative_eq!(r.tnt_equivalent_megatons, 172.8, max_relative = 0.05);
        assert!(r.tsunami_height_m.is_none());
        assert!(r.tsunami_zones.is_empty());
        assert_eq!(r.damage_zones.len(), 5);
        assert_eq!(r.mmi_zones.len(), 19);
        assert!(all_finite(r));
        assert!(response.deflection.is_none());
        assert_eq!(response.metadata.zone_scheme, ZoneScheme::CraterMultiples);
    }

    #[test]
    fn test_ocean_target_has_tsunami() {
        let resolved = scenario(TargetType::Ocean).resolve().unwrap();
        let r = evaluate_impact(
            &resolved,
            &SimulationOptions::default(),
            &StaticSettlements::default(),
            &GdpTable::builtin(),
        );
        assert!(r.tsunami_height_m.unwrap() >= 0.0);
        assert_eq!(r.tsunami_zones.len(), 4);
        assert_eq!(r.affected_coastline_km, Some(200.0));

        let options = SimulationOptions {
            include_tsunami: false,
            ..SimulationOptions::default()
        };
        let dry = evaluate_impact(&resolved, &options, &StaticSettlements::default(), &GdpTable::builtin());
        assert!(dry.tsunami_height_m.is_none());
    }

    #[test]
    fn test_zones_and_tiers_agree() {
        let resolved = scenario(TargetType::ContinentalCrust).resolve().unwrap();
        let crater_km = evaluate_impact(
            &resolved,
            &SimulationOptions::default(),
            &StaticSettlements::default(),
            &GdpTable::builtin(),
        )
        .crater_diameter_m
            / 2000.0;

        // One settlement at ground zero, one between the medium and low rings
        let provider = StaticSettlements::new(vec![
            town("ground zero", 40.0, -74.0),
            town("outskirts", 40.0 + 8.0 * crater_km / 111.32, -74.0),
        ]);
        let r = evaluate_impact(&resolved, &SimulationOptions::default(), &provider, &GdpTable::builtin());
        assert_eq!(r.affected_settlements.len(), 2);
        assert_eq!(r.affected_settlements[0].exposure_tier, ExposureTier::Extreme);
        assert_eq!(r.affected_settlements[1].exposure_tier, ExposureTier::Low);
        let low_ring = &r.damage_zones[3];
        assert!(r.affected_settlements[1].distance_km <= low_ring.radius_km);
        assert_eq!(r.total_population_affected, 20_000);
        assert_relative_eq!(
            r.affected_settlements[0].economic_loss_usd,
            10_000.0 * 65_000.0 * 0.95
        );
    }

    #[test]
    fn test_provider_failure_degrades_exposure() {
        let failing = |_: GeoPoint, _: f64| -> Result<Vec<Settlement>, ProviderError> {
            Err(ProviderError::Timeout(5000))
        };
        let resolved = scenario(TargetType::ContinentalCrust).resolve().unwrap();
        let r = evaluate_impact(&resolved, &SimulationOptions::default(), &failing, &GdpTable::builtin());
        assert!(r.data_unavailable);
        assert_eq!(r.total_population_affected, 0);
        assert_eq!(r.total_economic_loss_usd, 0.0);
        assert!(r.crater_diameter_m > 0.0);
    }

    #[test]
    fn test_invalid_input_rejected_before_compute() {
        let mut bad = scenario(TargetType::Ocean);
        bad.impact_latitude = 95.0;
        let err = bad.resolve().unwrap_err();
        assert_eq!(
            err,
            SimulationError::Validation(ValidationError::new(
                "impact_latitude",
                "must be within [-90, 90]"
            ))
        );

        let mut bad = scenario(TargetType::Ocean);
        bad.asteroid.diameter_m = -5.0;
        assert!(matches!(bad.resolve(), Err(SimulationError::Validation(_))));
    }

    #[test]
    fn test_orbit_trajectory_is_flagged_estimated() {
        let mut s = scenario(TargetType::ContinentalCrust);
        s.trajectory = Trajectory::Orbit {
            elements: KeplerianElements {
                semi_major_axis_au: 1.5,
                eccentricity: 0.4,
                inclination_deg: 10.0,
                longitude_of_ascending_node_deg: 80.0,
                argument_of_periapsis_deg: 300.0,
                mean_anomaly_deg: 20.0,
                epoch_jd: 2_460_000.5,
            },
            angle_deg: None,
        };
        let request = SimulationRequest {
            scenario: s,
            options: None,
            deflection: None,
        };
        let response =
            simulate_impact(&request, &StaticSettlements::default(), &GdpTable::builtin()).unwrap();
        assert!(response.baseline.angle_estimated);
        assert_relative_eq!(response.baseline.impact_angle_deg, 28.0);
        assert!(response.metadata.orbit_epoch_utc.is_some());
    }

    #[test]
    fn test_zero_delta_v_deflection_matches_baseline() {
        let strategy = DeflectionStrategy {
            kind: StrategyKind::KineticImpactor,
            delta_v_m_s: 0.0,
            direction: [0.0, 1.0, 0.0],
            lead_time_days: 1000.0,
            cost_usd: 0.0,
        };
        let cmp = simulate_deflection(
            &scenario(TargetType::ContinentalCrust),
            &strategy,
            &SimulationOptions::default(),
            &StaticSettlements::world_cities(),
            &GdpTable::builtin(),
        )
        .unwrap();
        assert_eq!(cmp.deflected.as_ref(), Some(&cmp.baseline));
        assert_eq!(cmp.comparison.miss_distance_km, 0.0);
        assert_eq!(cmp.comparison.impact_probability, 1.0);
        assert_eq!(cmp.comparison.population_exposure_reduction, 0);
        assert_eq!(
            cmp.comparison.new_impact_location,
            Some(GeoPoint::new(40.0, -74.0))
        );
    }

    #[test]
    fn test_successful_deflection_removes_exposure() {
        let strategy = DeflectionStrategy {
            kind: StrategyKind::KineticImpactor,
            delta_v_m_s: 1.0,
            direction: [0.0, 0.0, 1.0],
            lead_time_days: 3650.0,
            cost_usd: 1e9,
        };
        let cmp = simulate_deflection(
            &scenario(TargetType::ContinentalCrust),
            &strategy,
            &SimulationOptions::default(),
            &StaticSettlements::world_cities(),
            &GdpTable::builtin(),
        )
        .unwrap();
        assert!(cmp.deflected.is_none());
        assert_eq!(cmp.comparison.impact_probability, 0.0);
        assert_eq!(cmp.comparison.energy_reduction_pct, 100.0);
        assert_eq!(
            cmp.comparison.population_exposure_reduction,
            cmp.baseline.total_population_affected as i64
        );
        // New York and Philadelphia lie inside the seismic reach
        assert!(cmp.baseline.total_population_affected > 0);
    }

    #[test]
    fn test_request_json_defaults() {
        let json = r#"{
            "scenario": {
                "asteroid": {"diameter_m": 100.0},
                "trajectory": {"mode": "direct", "velocity_m_s": 15000.0, "angle_deg": 45.0},
                "impact_latitude": 0.0,
                "impact_longitude": 0.0
            }
        }"#;
        let request: SimulationRequest = serde_json::from_str(json).unwrap();
        assert!(request.options.is_none());
        assert_eq!(request.scenario.target_type, TargetType::ContinentalCrust);
        assert!(request.deflection.is_none());
    }
}
