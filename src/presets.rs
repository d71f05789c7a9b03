// Presets - Canned scenarios and the physical constants behind the models

use serde::Serialize;

use crate::impact::{AsteroidSpec, Composition, TargetType};
use crate::simulation::{ImpactScenario, Trajectory};
use crate::units::{
    asteroid_density, scaling, target_density, EARTH_GRAVITY, JOULES_PER_MEGATON, R_EARTH,
    WATER_DENSITY,
};

#[derive(Debug, Clone, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub scenario: ImpactScenario,
}

fn direct(
    diameter_m: f64,
    composition: Composition,
    velocity_m_s: f64,
    angle_deg: f64,
    target_type: TargetType,
    latitude: f64,
    longitude: f64,
) -> ImpactScenario {
    ImpactScenario {
        asteroid: AsteroidSpec {
            diameter_m,
            composition,
            density_kg_m3: None,
        },
        trajectory: Trajectory::Direct {
            velocity_m_s,
            angle_deg,
            azimuth_deg: None,
        },
        target_type,
        impact_latitude: latitude,
        impact_longitude: longitude,
    }
}

pub fn presets() -> Vec<Preset> {
    vec![
        Preset {
            name: "small",
            description: "100 m stony asteroid, regional damage",
            scenario: direct(
                100.0,
                Composition::Stony,
                15_000.0,
                45.0,
                TargetType::ContinentalCrust,
                40.7128,
                -74.0060,
            ),
        },
        Preset {
            name: "medium",
            description: "500 m stony asteroid into the Pacific",
            scenario: direct(
                500.0,
                Composition::Stony,
                20_000.0,
                30.0,
                TargetType::Ocean,
                35.0,
                -140.0,
            ),
        },
        Preset {
            name: "large",
            description: "1 km iron asteroid, continental devastation",
            scenario: direct(
                1000.0,
                Composition::Iron,
                25_000.0,
                60.0,
                TargetType::ContinentalCrust,
                48.8566,
                2.3522,
            ),
        },
    ]
}

pub fn preset(name: &str) -> Option<Preset> {
    presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Constants a client may want to display next to the results
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhysicsConstants {
    pub gravity_m_s2: f64,
    pub earth_radius_m: f64,
    pub joules_per_megaton: f64,
    pub water_density_kg_m3: f64,
    pub stony_density_kg_m3: f64,
    pub iron_density_kg_m3: f64,
    pub carbonaceous_density_kg_m3: f64,
    pub continental_crust_density_kg_m3: f64,
    pub oceanic_crust_density_kg_m3: f64,
    pub crater_scaling_constant: f64,
    pub seismic_efficiency: f64,
    pub tsunami_efficiency: f64,
    pub kinetic_impactor_efficiency: f64,
}

pub fn physics_constants() -> PhysicsConstants {
    PhysicsConstants {
        gravity_m_s2: EARTH_GRAVITY,
        earth_radius_m: R_EARTH,
        joules_per_megaton: JOULES_PER_MEGATON,
        water_density_kg_m3: WATER_DENSITY,
        stony_density_kg_m3: asteroid_density::STONY,
        iron_density_kg_m3: asteroid_density::IRON,
        carbonaceous_density_kg_m3: asteroid_density::CARBONACEOUS,
        continental_crust_density_kg_m3: target_density::CONTINENTAL_CRUST,
        oceanic_crust_density_kg_m3: target_density::OCEANIC_CRUST,
        crater_scaling_constant: scaling::CRATER_DIAMETER_K,
        seismic_efficiency: scaling::SEISMIC_EFFICIENCY,
        tsunami_efficiency: scaling::TSUNAMI_EFFICIENCY,
        kinetic_impactor_efficiency: scaling::DEFLECTION_EFFICIENCY,
    }
}
