// End-to-end pipeline checks through the public API

use approx::assert_relative_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use impactsim::{
    preset, presets, run_monte_carlo, simulate_deflection, simulate_impact, AsteroidSpec,
    Composition, DeflectionStrategy, ExposureTier, GdpTable, ImpactResult, ImpactScenario,
    MonteCarloRequest, SimulationOptions, SimulationRequest, StaticSettlements, StrategyKind,
    TargetType, Trajectory,
};

fn reference(target_type: TargetType, lat: f64, lon: f64) -> ImpactScenario {
    ImpactScenario {
        asteroid: AsteroidSpec {
            diameter_m: 160.0,
            composition: Composition::Stony,
            density_kg_m3: Some(3000.0),
        },
        trajectory: Trajectory::Direct {
            velocity_m_s: 15_000.0,
            angle_deg: 45.0,
            azimuth_deg: None,
        },
        target_type,
        impact_latitude: lat,
        impact_longitude: lon,
    }
}

fn run(scenario: ImpactScenario) -> ImpactResult {
    let request = SimulationRequest {
        scenario,
        options: None,
        deflection: None,
    };
    simulate_impact(&request, &StaticSettlements::world_cities(), &GdpTable::builtin())
        .unwrap()
        .baseline
}

#[test]
fn reference_impactor_energy() {
    let r = run(reference(TargetType::ContinentalCrust, 0.0, 0.0));
    assert_relative_eq!(r.mass_kg, 6.43e9, max_relative = 0.05);
    assert_relative_eq!(r.energy_joules, 7.23e17, max_relative = 0.05);
    assert_relative_eq!(r.tnt_equivalent_megatons, 172.8, max_relative = 0.05);
    assert!(r.crater_depth_m <= r.crater_diameter_m);
    assert!((0.0..=10.0).contains(&r.seismic_magnitude));
}

#[test]
fn tsunami_only_over_water() {
    let land = run(reference(TargetType::ContinentalCrust, 0.0, 0.0));
    assert!(land.tsunami_height_m.is_none());
    assert!(land.affected_coastline_km.is_none());

    for target in [TargetType::Ocean, TargetType::OceanicCrust] {
        let sea = run(reference(target, 0.0, -30.0));
        assert!(sea.tsunami_height_m.unwrap() >= 0.0);
        assert!(!sea.tsunami_zones.is_empty());
    }
}

#[test]
fn city_impact_ranks_settlements_by_distance() {
    let r = run(reference(TargetType::ContinentalCrust, 35.6762, 139.6503));
    let tokyo = &r.affected_settlements[0];
    assert_eq!(tokyo.name, "Tokyo");
    assert_eq!(tokyo.exposure_tier, ExposureTier::Extreme);
    assert!(r
        .affected_settlements
        .windows(2)
        .all(|w| w[0].distance_km <= w[1].distance_km));
    assert!(r.total_economic_loss_usd > 0.0);
    assert!(r.gdp_impact_percentage > 0.0 && r.gdp_impact_percentage <= 100.0);
    let [low, high] = r.uncertainty_bounds.population_affected;
    assert!(low <= r.total_population_affected && r.total_population_affected <= high);
}

#[test]
fn zero_delta_v_reproduces_baseline() {
    for kind in [
        StrategyKind::KineticImpactor,
        StrategyKind::GravityTractor,
        StrategyKind::NuclearStandoff,
        StrategyKind::IonBeam,
    ] {
        let strategy = DeflectionStrategy {
            kind,
            delta_v_m_s: 0.0,
            direction: [0.3, -0.2, 0.9],
            lead_time_days: 500.0,
            cost_usd: 1e9,
        };
        let cmp = simulate_deflection(
            &reference(TargetType::ContinentalCrust, 51.5, -0.1),
            &strategy,
            &SimulationOptions::default(),
            &StaticSettlements::world_cities(),
            &GdpTable::builtin(),
        )
        .unwrap();
        assert_eq!(cmp.deflected.as_ref(), Some(&cmp.baseline));
        assert_eq!(cmp.comparison.miss_distance_km, 0.0);
        assert_eq!(cmp.comparison.impact_probability, 1.0);
        assert_eq!(cmp.comparison.energy_reduction_pct, 0.0);
        assert_eq!(cmp.comparison.strategy_efficiency, 0.0);
    }
}

#[test]
fn combined_request_carries_deflection() {
    let request = SimulationRequest {
        scenario: reference(TargetType::Ocean, 10.0, -40.0),
        options: None,
        deflection: Some(DeflectionStrategy {
            kind: StrategyKind::KineticImpactor,
            delta_v_m_s: 0.002,
            direction: [0.0, 1.0, 0.0],
            lead_time_days: 30.0,
            cost_usd: 0.0,
        }),
    };
    let response =
        simulate_impact(&request, &StaticSettlements::world_cities(), &GdpTable::builtin()).unwrap();
    let deflection = response.deflection.unwrap();
    assert!(deflection.deflection_angle_deg > 0.0);
    assert!((0.0..=1.0).contains(&deflection.impact_probability));
    assert_eq!(
        deflection.new_impact_location.is_some(),
        deflection.impact_probability > 0.0
    );
    assert_eq!(response.deflected.is_some(), deflection.impact_probability > 0.0);
}

#[test]
fn presets_run_end_to_end() {
    for p in presets() {
        let r = run(p.scenario);
        assert!(r.energy_joules > 0.0 && r.energy_joules.is_finite(), "{}", p.name);
    }
    let large = run(preset("large").unwrap().scenario);
    let small = run(preset("small").unwrap().scenario);
    assert!(large.crater_diameter_m > small.crater_diameter_m);
}

#[test]
fn monte_carlo_centres_on_baseline() {
    let options = SimulationOptions {
        include_population: false,
        ..SimulationOptions::default()
    };
    let mut rng = StdRng::seed_from_u64(2024);
    let summary = run_monte_carlo(
        &reference(TargetType::ContinentalCrust, 0.0, 25.0),
        None,
        2000,
        &options,
        &StaticSettlements::default(),
        &mut rng,
    )
    .unwrap();
    assert_eq!(summary.total_runs, 2000);
    assert_eq!(summary.completed_runs, 2000);
    let point = summary.impact_point.unwrap();
    assert!((point.mean_x - 25.0).abs() < 0.01);
    let energy = summary.energy_joules.unwrap();
    assert_relative_eq!(energy.mean, 7.23e17, max_relative = 0.25);
}

#[test]
fn response_serialises_snake_case() {
    let r = run(reference(TargetType::Ocean, 0.0, -30.0));
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["target_type"], "ocean");
    assert_eq!(json["damage_zones"][0]["severity_tier"], "extreme");
    assert!(json["tsunami_severity"].is_string());
}

#[test]
fn demo_requests_parse() {
    let impact: SimulationRequest =
        serde_json::from_str(include_str!("../demos/impact.json")).unwrap();
    assert!(impact.deflection.is_some());
    assert!(impact.options.unwrap().include_tsunami);

    let deflect: serde_json::Value =
        serde_json::from_str(include_str!("../demos/deflect.json")).unwrap();
    let scenario: ImpactScenario = serde_json::from_value(deflect["scenario"].clone()).unwrap();
    let strategy: DeflectionStrategy = serde_json::from_value(deflect["strategy"].clone()).unwrap();
    assert_eq!(scenario.target_type, TargetType::Ocean);
    assert_eq!(strategy.kind, StrategyKind::GravityTractor);
    assert_eq!(strategy.cost_usd, 0.0);

    let mc: MonteCarloRequest =
        serde_json::from_str(include_str!("../demos/monte_carlo.json")).unwrap();
    assert!(matches!(mc.scenario.trajectory, Trajectory::Orbit { angle_deg: None, .. }));
    assert_eq!(mc.seed, Some(42));
    assert!(mc.scenario.resolve().unwrap().geometry.angle_estimated);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn outputs_always_finite(
        diameter in 1.0f64..5000.0,
        velocity in 1000.0f64..72_000.0,
        angle in 0.0f64..=90.0,
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        marine in any::<bool>(),
    ) {
        let mut scenario = reference(
            if marine { TargetType::Ocean } else { TargetType::ContinentalCrust },
            lat,
            lon,
        );
        scenario.asteroid.diameter_m = diameter;
        scenario.trajectory = Trajectory::Direct { velocity_m_s: velocity, angle_deg: angle, azimuth_deg: None };
        let request = SimulationRequest {
            scenario,
            options: Some(SimulationOptions { include_seismic: false, ..SimulationOptions::default() }),
            deflection: None,
        };
        let r = simulate_impact(&request, &StaticSettlements::world_cities(), &GdpTable::builtin())
            .unwrap()
            .baseline;
        for v in [
            r.energy_joules,
            r.crater_diameter_m,
            r.crater_depth_m,
            r.seismic_magnitude,
            r.peak_ground_acceleration,
            r.blast_radius_km,
            r.total_economic_loss_usd,
            r.gdp_impact_percentage,
        ] {
            prop_assert!(v.is_finite() && v >= 0.0);
        }
        for zone in &r.damage_zones {
            for [x, y] in &zone.ring {
                prop_assert!(x.is_finite() && y.is_finite());
            }
        }
    }
}
