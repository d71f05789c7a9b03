// Impact Energy & Crater Model - Mass, kinetic energy and π-scaling craters
// Pure functions of the inputs; no state is kept between calls

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{require_positive, require_range, ValidationError};
use crate::units::{
    asteroid_density, energy_to_megatons, scaling, target_density, EARTH_GRAVITY,
};

/// Smallest reported crater diameter (m)
pub const MIN_CRATER_DIAMETER_M: f64 = 10.0;

/// Smallest reported crater depth (m)
pub const MIN_CRATER_DEPTH_M: f64 = 2.0;

/// Final depth as a fraction of final diameter
pub const CRATER_DEPTH_RATIO: f64 = 0.25;

/// Rim height as a fraction of final diameter
pub const CRATER_RIM_RATIO: f64 = 0.1;

// =============================================================================
// ASTEROID
// =============================================================================

/// Bulk composition presets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    #[default]
    Stony,
    Iron,
    Carbonaceous,
}

impl Composition {
    pub fn density(self) -> f64 {
        match self {
            Composition::Stony => asteroid_density::STONY,
            Composition::Iron => asteroid_density::IRON,
            Composition::Carbonaceous => asteroid_density::CARBONACEOUS,
        }
    }
}

/// Physical description of the impactor as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AsteroidSpec {
    pub diameter_m: f64,
    #[serde(default)]
    pub composition: Composition,
    /// Overrides the composition preset when present
    #[serde(default)]
    pub density_kg_m3: Option<f64>,
}

/// Validated, immutable impactor properties.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct AsteroidProperties {
    diameter_m: f64,
    density_kg_m3: f64,
    mass_kg: f64,
}

impl AsteroidProperties {
    pub fn new(diameter_m: f64, density_kg_m3: f64) -> Result<Self, ValidationError> {
        require_positive("asteroid.diameter_m", diameter_m)?;
        require_positive("asteroid.density_kg_m3", density_kg_m3)?;
        Ok(Self {
            diameter_m,
            density_kg_m3,
            mass_kg: mass_from_diameter(diameter_m, density_kg_m3),
        })
    }

    pub fn from_spec(spec: &AsteroidSpec) -> Result<Self, ValidationError> {
        let density = spec
            .density_kg_m3
            .unwrap_or_else(|| spec.composition.density());
        Self::new(spec.diameter_m, density)
    }

    pub fn diameter_m(&self) -> f64 {
        self.diameter_m
    }

    pub fn density_kg_m3(&self) -> f64 {
        self.density_kg_m3
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }
}

// =============================================================================
// TARGET
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    ContinentalCrust,
    OceanicCrust,
    Ocean,
}

impl TargetType {
    pub fn density(self) -> f64 {
        match self {
            TargetType::ContinentalCrust => target_density::CONTINENTAL_CRUST,
            TargetType::OceanicCrust => target_density::OCEANIC_CRUST,
            TargetType::Ocean => target_density::OCEAN,
        }
    }

    /// Whether a water column can carry a tsunami
    pub fn is_marine(self) -> bool {
        matches!(self, TargetType::Ocean | TargetType::OceanicCrust)
    }
}

/// Arrival conditions at the surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImpactParameters {
    pub velocity_m_s: f64,
    /// 90 = vertical
    pub angle_deg: f64,
    pub target_type: TargetType,
    pub impact_latitude: f64,
    pub impact_longitude: f64,
}

impl ImpactParameters {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("velocity_m_s", self.velocity_m_s)?;
        require_range("angle_deg", self.angle_deg, 0.0, 90.0)?;
        require_range("impact_latitude", self.impact_latitude, -90.0, 90.0)?;
        require_range("impact_longitude", self.impact_longitude, -180.0, 180.0)?;
        Ok(())
    }
}

// =============================================================================
// ENERGY
// =============================================================================

pub fn mass_from_diameter(diameter_m: f64, density: f64) -> f64 {
    let radius = diameter_m / 2.0;
    density * (4.0 / 3.0) * PI * radius.powi(3)
}

pub fn kinetic_energy(mass_kg: f64, velocity_m_s: f64) -> f64 {
    0.5 * mass_kg * velocity_m_s * velocity_m_s
}

// =============================================================================
// CRATER
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Crater {
    pub diameter_m: f64,
    pub depth_m: f64,
    pub rim_height_m: f64,
}

impl Crater {
    pub fn radius_km(&self) -> f64 {
        self.diameter_m / 2000.0
    }
}

/// Final crater from the π-scaling law
/// D = k · (E / (ρ_t · g))^(1/4) · sin(θ)^(1/3)
pub fn crater_dimensions(energy_joules: f64, angle_deg: f64, target_density: f64) -> Crater {
    let energy_term = (energy_joules.max(0.0) / (target_density * EARTH_GRAVITY)).powf(0.25);
    let angle_term = angle_deg.to_radians().sin().max(0.0).cbrt();
    let raw = scaling::CRATER_DIAMETER_K * energy_term * angle_term;

    let diameter_m = raw.max(MIN_CRATER_DIAMETER_M);
    Crater {
        diameter_m,
        depth_m: (diameter_m * CRATER_DEPTH_RATIO).max(MIN_CRATER_DEPTH_M),
        rim_height_m: diameter_m * CRATER_RIM_RATIO,
    }
}

/// Energy-side summary of one impact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImpactEnergy {
    pub mass_kg: f64,
    pub energy_joules: f64,
    pub tnt_megatons: f64,
}

pub fn impact_energy(asteroid: &AsteroidProperties, velocity_m_s: f64) -> ImpactEnergy {
    let energy_joules = kinetic_energy(asteroid.mass_kg(), velocity_m_s);
    ImpactEnergy {
        mass_kg: asteroid.mass_kg(),
        energy_joules,
        tnt_megatons: energy_to_megatons(energy_joules),
    }
}
