// Units & Constants - Physical constants and unit conversions
// SI units throughout unless the name says otherwise

// =============================================================================
// PHYSICAL CONSTANTS (SI Units)
// =============================================================================

/// Gravitational constant (m³/(kg·s²))
pub const G: f64 = 6.67430e-11;

/// Astronomical Unit in meters
pub const AU: f64 = 1.495978707e11;

/// Sun's gravitational parameter μ = G * M_sun (m³/s²)
pub const MU_SUN: f64 = 1.32712440018e20;

/// Earth's gravitational parameter μ = G * M_earth (m³/s²)
pub const MU_EARTH: f64 = 3.986004418e14;

/// Earth's mean radius (m), used for surface geometry and miss distance
pub const R_EARTH: f64 = 6.371e6;

/// Earth's mean radius (km), haversine distances
pub const R_EARTH_KM: f64 = 6371.0;

/// Standard surface gravity (m/s²)
pub const EARTH_GRAVITY: f64 = 9.81;

/// Earth escape velocity at the surface (m/s)
pub const EARTH_ESCAPE_VELOCITY: f64 = 11_186.0;

/// 1 megaton of TNT in joules
pub const JOULES_PER_MEGATON: f64 = 4.184e15;

/// Sea water density (kg/m³)
pub const WATER_DENSITY: f64 = 1000.0;

/// Julian date of the J2000 epoch
pub const J2000_JD: f64 = 2451545.0;

/// Julian date of the Unix epoch (1970-01-01T00:00:00Z)
pub const UNIX_EPOCH_JD: f64 = 2440587.5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Kilometers per degree of latitude (and of longitude at the equator)
pub const KM_PER_DEGREE: f64 = 111.32;

/// Asteroid bulk density by composition (kg/m³)
pub mod asteroid_density {
    pub const STONY: f64 = 3000.0;
    pub const IRON: f64 = 7800.0;
    pub const CARBONACEOUS: f64 = 2000.0;
}

/// Target rock/water density by surface type (kg/m³)
pub mod target_density {
    pub const CONTINENTAL_CRUST: f64 = 2500.0;
    pub const OCEANIC_CRUST: f64 = 2900.0;
    pub const OCEAN: f64 = 1000.0;
}

/// Scaling-law coefficients shared by the effect models
pub mod scaling {
    /// π-scaling crater coefficient
    pub const CRATER_DIAMETER_K: f64 = 1.25;
    /// Fraction of impact energy radiated as seismic waves
    pub const SEISMIC_EFFICIENCY: f64 = 0.01;
    /// Fraction of impact energy coupled into the water column
    pub const TSUNAMI_EFFICIENCY: f64 = 0.1;
    /// Fraction of impact energy emitted as thermal radiation
    pub const THERMAL_EFFICIENCY: f64 = 0.1;
    /// Blast (≈1 psi overpressure) radius per Mt^(1/3), km
    pub const BLAST_RADIUS_KM_PER_MT: f64 = 10.0;
    /// Thermal (third-degree burn) radius per Mt^(1/3), km
    pub const THERMAL_RADIUS_KM_PER_MT: f64 = 13.0;
    /// Kinetic impactor momentum-transfer efficiency
    pub const DEFLECTION_EFFICIENCY: f64 = 0.1;
}

// =============================================================================
// CONVERSIONS
// =============================================================================

pub fn energy_to_megatons(energy_joules: f64) -> f64 {
    energy_joules / JOULES_PER_MEGATON
}

pub fn megatons_to_energy(megatons: f64) -> f64 {
    megatons * JOULES_PER_MEGATON
}

pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}

pub fn m_to_km(m: f64) -> f64 {
    m / 1000.0
}

pub fn days_to_seconds(days: f64) -> f64 {
    days * SECONDS_PER_DAY
}

/// Convert a Julian date to a UTC timestamp.
/// Returns `None` for dates chrono cannot represent.
pub fn julian_date_to_utc(jd: f64) -> Option<chrono::DateTime<chrono::Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    chrono::DateTime::from_timestamp_millis(millis as i64)
}

/// Convert a UTC timestamp to a Julian date.
pub fn utc_to_julian_date(time: chrono::DateTime<chrono::Utc>) -> f64 {
    time.timestamp_millis() as f64 / (SECONDS_PER_DAY * 1000.0) + UNIX_EPOCH_JD
}
