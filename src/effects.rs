// Secondary Effects Model - Seismic shaking, tsunami, blast and thermal reach
// Each formula stands alone; callers combine them in any order

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::units::{energy_to_megatons, scaling, EARTH_GRAVITY, WATER_DENSITY};

/// Distance floor for attenuation laws (km); avoids log(0)
pub const MIN_DISTANCE_KM: f64 = 0.1;

/// Moment-magnitude clamp
pub const MAX_SEISMIC_MAGNITUDE: f64 = 10.0;

/// log10 of the moment (N·m) that maps to the anchor magnitude
const MOMENT_ANCHOR_LOG10: f64 = 16.0;

/// Magnitude assigned to a moment of 1e16 N·m
const MAGNITUDE_ANCHOR: f64 = 6.0;

/// Radius of the water column assumed to absorb tsunami energy (m)
const TSUNAMI_SOURCE_RADIUS_M: f64 = 1000.0;

/// Tsunami dissipation length scale (km)
const TSUNAMI_DECAY_KM: f64 = 100.0;

/// Reference distance for geometric spreading (km)
const TSUNAMI_REFERENCE_KM: f64 = 1.0;

// =============================================================================
// SEISMIC
// =============================================================================

/// Moment magnitude from impact energy.
///
/// M_w = (2/3)·(log10(M0) − 16) + 6 with M0 = η·E in N·m and η = 0.01,
/// clamped to [0, 10].
pub fn seismic_magnitude(energy_joules: f64) -> f64 {
    let moment = scaling::SEISMIC_EFFICIENCY * energy_joules;
    if moment <= 0.0 || !moment.is_finite() {
        return if moment.is_infinite() {
            MAX_SEISMIC_MAGNITUDE
        } else {
            0.0
        };
    }
    ((2.0 / 3.0) * (moment.log10() - MOMENT_ANCHOR_LOG10) + MAGNITUDE_ANCHOR)
        .clamp(0.0, MAX_SEISMIC_MAGNITUDE)
}

/// Peak ground acceleration at `distance_km` (gal, cm/s²)
pub fn peak_ground_acceleration(magnitude: f64, distance_km: f64) -> f64 {
    let r = distance_km.max(MIN_DISTANCE_KM);
    10f64.powf(magnitude - 1.5 * r.log10() - 0.01 * r)
}

/// Modified Mercalli Intensity at `distance_km`, clamped to [1, 12]
pub fn mmi_at_distance(magnitude: f64, distance_km: f64) -> f64 {
    let r = distance_km.max(MIN_DISTANCE_KM);
    (magnitude - 1.5 * r.log10() - 0.01 * r).clamp(1.0, 12.0)
}

// =============================================================================
// TSUNAMI
// =============================================================================

/// Coastline parameters for shoaling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoastModel {
    pub distance_to_shore_km: f64,
    /// Dimensionless bathymetric slope at the shore
    pub shore_slope: f64,
}

impl Default for CoastModel {
    fn default() -> Self {
        Self {
            distance_to_shore_km: 100.0,
            shore_slope: 0.01,
        }
    }
}

/// Deep-water wave height at the source (m)
pub fn tsunami_initial_height(energy_joules: f64) -> f64 {
    let tsunami_energy = energy_joules * scaling::TSUNAMI_EFFICIENCY;
    let area = PI * TSUNAMI_SOURCE_RADIUS_M * TSUNAMI_SOURCE_RADIUS_M;
    let energy_density = tsunami_energy / area;
    0.1 * (energy_density.max(0.0) / (WATER_DENSITY * EARTH_GRAVITY)).sqrt()
}

/// Open-ocean height after travelling `distance_km`
/// h(r) = h0 · exp(−r/λ) · (r0/r)^0.5
pub fn tsunami_height_at(initial_height_m: f64, distance_km: f64) -> f64 {
    let r = distance_km.max(MIN_DISTANCE_KM);
    let spreading = (TSUNAMI_REFERENCE_KM / r).sqrt();
    let dissipation = (-r / TSUNAMI_DECAY_KM).exp();
    (initial_height_m * spreading * dissipation).max(0.0)
}

/// Run-up height at the coast including shoaling amplification
pub fn tsunami_coastal_height(energy_joules: f64, coast: &CoastModel) -> f64 {
    let open_ocean = tsunami_height_at(tsunami_initial_height(energy_joules), coast.distance_to_shore_km);
    let amplification = 1.0 / coast.shore_slope.max(1e-4).sqrt();
    open_ocean * amplification
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TsunamiSeverity {
    Low,
    Medium,
    High,
    Extreme,
}

impl TsunamiSeverity {
    pub fn from_height(height_m: f64) -> Self {
        if height_m < 2.0 {
            TsunamiSeverity::Low
        } else if height_m < 5.0 {
            TsunamiSeverity::Medium
        } else if height_m < 10.0 {
            TsunamiSeverity::High
        } else {
            TsunamiSeverity::Extreme
        }
    }
}

// =============================================================================
// BLAST & THERMAL
// =============================================================================

/// Air-blast damage radius (km), R = k · Mt^(1/3)
pub fn blast_radius_km(energy_joules: f64) -> f64 {
    scaling::BLAST_RADIUS_KM_PER_MT * energy_to_megatons(energy_joules).max(0.0).cbrt()
}

/// Third-degree burn radius (km), R = k · Mt^(1/3)
pub fn thermal_radius_km(energy_joules: f64) -> f64 {
    scaling::THERMAL_RADIUS_KM_PER_MT * energy_to_megatons(energy_joules).max(0.0).cbrt()
}

/// Radiant exposure at `distance_km` (J/m²), inverse-square spreading
pub fn thermal_fluence(energy_joules: f64, distance_km: f64) -> f64 {
    let r_m = distance_km.max(MIN_DISTANCE_KM) * 1000.0;
    scaling::THERMAL_EFFICIENCY * energy_joules / (4.0 * PI * r_m * r_m)
}

// =============================================================================
// SUMMARY
// =============================================================================

/// All secondary effects for one impact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SecondaryEffects {
    pub seismic_magnitude: f64,
    /// At the crater rim
    pub peak_ground_acceleration: f64,
    pub tsunami_height_m: Option<f64>,
    pub tsunami_severity: Option<TsunamiSeverity>,
    pub blast_radius_km: f64,
    pub thermal_radius_km: f64,
}

pub fn secondary_effects(
    energy_joules: f64,
    crater_radius_km: f64,
    marine_target: bool,
    coast: &CoastModel,
) -> SecondaryEffects {
    let magnitude = seismic_magnitude(energy_joules);
    let tsunami_height_m = marine_target.then(|| tsunami_coastal_height(energy_joules, coast));

    SecondaryEffects {
        seismic_magnitude: magnitude,
        peak_ground_acceleration: peak_ground_acceleration(magnitude, crater_radius_km),
        tsunami_height_m,
        tsunami_severity: tsunami_height_m.map(TsunamiSeverity::from_height),
        blast_radius_km: blast_radius_km(energy_joules),
        thermal_radius_km: thermal_radius_km(energy_joules),
    }
}
