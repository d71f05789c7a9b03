// Orbital/Geometry Adapter - Orbital elements to impact geometry
// Solves Kepler's equation and builds the Earth-centred approach trajectory

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{require_positive, require_range, GeometryError, ValidationError};
use crate::units::{
    julian_date_to_utc, AU, EARTH_ESCAPE_VELOCITY, J2000_JD, MU_SUN, R_EARTH,
};

/// Convergence threshold on |E - e sin E - M|
pub const KEPLER_TOLERANCE: f64 = 1e-10;

/// Newton iteration cap for Kepler's equation
pub const KEPLER_MAX_ITERATIONS: u32 = 100;

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > 1e-15 {
            Self {
                x: self.x / mag,
                y: self.y / mag,
                z: self.z / mag,
            }
        } else {
            Self::zero()
        }
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn add(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// =============================================================================
// STATE VECTOR (Position + Velocity)
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateVector {
    pub position: Vector3, // meters (SI)
    pub velocity: Vector3, // m/s (SI)
}

impl StateVector {
    pub fn new(position: Vector3, velocity: Vector3) -> Self {
        Self { position, velocity }
    }
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

/// Heliocentric elements as supplied by an orbital catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeplerianElements {
    pub semi_major_axis_au: f64,
    /// 0 <= e < 1 (bound orbits only)
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub longitude_of_ascending_node_deg: f64,
    pub argument_of_periapsis_deg: f64,
    pub mean_anomaly_deg: f64,
    /// Epoch (Julian Date)
    pub epoch_jd: f64,
}

impl KeplerianElements {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("orbit.semi_major_axis_au", self.semi_major_axis_au)?;
        if !(self.eccentricity.is_finite() && (0.0..1.0).contains(&self.eccentricity)) {
            return Err(ValidationError::new(
                "orbit.eccentricity",
                "must be within [0, 1)",
            ));
        }
        require_range("orbit.inclination_deg", self.inclination_deg, 0.0, 180.0)?;
        for (field, value) in [
            (
                "orbit.longitude_of_ascending_node_deg",
                self.longitude_of_ascending_node_deg,
            ),
            (
                "orbit.argument_of_periapsis_deg",
                self.argument_of_periapsis_deg,
            ),
            ("orbit.mean_anomaly_deg", self.mean_anomaly_deg),
        ] {
            require_range(field, value, 0.0, 360.0)?;
        }
        if !self.epoch_jd.is_finite() {
            return Err(ValidationError::new("orbit.epoch_jd", "must be finite"));
        }
        Ok(())
    }

    /// Convert orbital elements to a heliocentric Cartesian state vector
    pub fn to_state_vector(&self, mu: f64) -> Result<StateVector, GeometryError> {
        let a = self.semi_major_axis_au * AU;
        let e = self.eccentricity;
        let i = self.inclination_deg.to_radians();
        let omega_big = self.longitude_of_ascending_node_deg.to_radians(); // Ω
        let omega_small = self.argument_of_periapsis_deg.to_radians(); // ω
        let m = self.mean_anomaly_deg.to_radians();

        let eccentric_anomaly = solve_kepler_equation(m, e, KEPLER_MAX_ITERATIONS)?;

        let cos_e = eccentric_anomaly.cos();
        let true_anomaly = 2.0
            * ((1.0 + e).sqrt() * (eccentric_anomaly / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (eccentric_anomaly / 2.0).cos());

        // Distance from focus
        let r = a * (1.0 - e * cos_e);

        // Perifocal frame
        let cos_nu = true_anomaly.cos();
        let sin_nu = true_anomaly.sin();
        let x_orb = r * cos_nu;
        let y_orb = r * sin_nu;

        let sqrt_mu_p = (mu / (a * (1.0 - e * e))).sqrt();
        let vx_orb = -sqrt_mu_p * sin_nu;
        let vy_orb = sqrt_mu_p * (e + cos_nu);

        // R = Rz(Ω) · Rx(i) · Rz(ω)
        let cos_omega = omega_big.cos();
        let sin_omega = omega_big.sin();
        let cos_w = omega_small.cos();
        let sin_w = omega_small.sin();
        let cos_i = i.cos();
        let sin_i = i.sin();

        let r11 = cos_omega * cos_w - sin_omega * sin_w * cos_i;
        let r12 = -cos_omega * sin_w - sin_omega * cos_w * cos_i;
        let r21 = sin_omega * cos_w + cos_omega * sin_w * cos_i;
        let r22 = -sin_omega * sin_w + cos_omega * cos_w * cos_i;
        let r31 = sin_w * sin_i;
        let r32 = cos_w * sin_i;

        let position = Vector3::new(
            r11 * x_orb + r12 * y_orb,
            r21 * x_orb + r22 * y_orb,
            r31 * x_orb + r32 * y_orb,
        );

        let velocity = Vector3::new(
            r11 * vx_orb + r12 * vy_orb,
            r21 * vx_orb + r22 * vy_orb,
            r31 * vx_orb + r32 * vy_orb,
        );

        Ok(StateVector { position, velocity })
    }

    /// Simplified Earth elements (J2000 mean elements, ecliptic frame)
    pub fn earth(julian_date: f64) -> Self {
        let days = julian_date - J2000_JD;
        let mean_anomaly_deg = (357.529 + 360.0 * days / 365.256_363).rem_euclid(360.0);
        Self {
            semi_major_axis_au: 1.000_001,
            eccentricity: 0.0167,
            inclination_deg: 0.0,
            longitude_of_ascending_node_deg: 0.0,
            argument_of_periapsis_deg: 102.9,
            mean_anomaly_deg,
            epoch_jd: julian_date,
        }
    }
}

/// Solve Kepler's equation M = E - e*sin(E) using Newton-Raphson.
///
/// Seeds with E₀ = M and stops once |f| < [`KEPLER_TOLERANCE`]. Hitting
/// `max_iterations` first yields [`GeometryError::KeplerNotConverged`]
/// carrying the last iterate, so callers can decide whether to accept it.
pub fn solve_kepler_equation(
    mean_anomaly: f64,
    eccentricity: f64,
    max_iterations: u32,
) -> Result<f64, GeometryError> {
    let mut e_anom = mean_anomaly;

    for _ in 0..max_iterations {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
        if f.abs() < KEPLER_TOLERANCE {
            return Ok(e_anom);
        }
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        e_anom -= f / f_prime;
    }

    let residual = (e_anom - eccentricity * e_anom.sin() - mean_anomaly).abs();
    if residual < KEPLER_TOLERANCE {
        Ok(e_anom)
    } else {
        Err(GeometryError::KeplerNotConverged {
            last_estimate: e_anom,
            residual,
            iterations: max_iterations,
        })
    }
}

// =============================================================================
// IMPACT GEOMETRY
// =============================================================================

/// Heading used when the caller gives no approach azimuth (due east).
pub const DEFAULT_AZIMUTH_DEG: f64 = 90.0;

/// Where, how fast and from which direction the asteroid arrives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactGeometry {
    pub velocity_m_s: f64,
    /// Angle above the local horizon, 90 = vertical
    pub angle_deg: f64,
    /// Compass heading of travel, degrees clockwise from north
    pub azimuth_deg: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// True when `angle_deg` came from the orbit heuristic, not a measurement
    pub angle_estimated: bool,
    /// Hyperbolic excess speed, when derived from an orbit (m/s)
    pub v_infinity_m_s: Option<f64>,
    /// Epoch of the orbit solution, when derived from an orbit
    pub epoch_utc: Option<chrono::DateTime<chrono::Utc>>,
}

impl ImpactGeometry {
    pub fn direct(
        velocity_m_s: f64,
        angle_deg: f64,
        latitude: f64,
        longitude: f64,
        azimuth_deg: Option<f64>,
    ) -> Self {
        Self {
            velocity_m_s,
            angle_deg,
            azimuth_deg: azimuth_deg.unwrap_or(DEFAULT_AZIMUTH_DEG),
            latitude,
            longitude,
            angle_estimated: false,
            v_infinity_m_s: None,
            epoch_utc: None,
        }
    }

    /// Derive impact geometry from heliocentric elements.
    ///
    /// The orbit fixes speed and approach direction only; the impact site
    /// is supplied by the caller. `measured_angle_deg` overrides the
    /// heuristic when a real measurement exists.
    pub fn from_orbit(
        elements: &KeplerianElements,
        latitude: f64,
        longitude: f64,
        measured_angle_deg: Option<f64>,
    ) -> Result<Self, GeometryError> {
        let asteroid = elements.to_state_vector(MU_SUN)?;
        let earth = KeplerianElements::earth(elements.epoch_jd).to_state_vector(MU_SUN)?;

        let v_rel = asteroid.velocity.sub(&earth.velocity);
        let v_inf = v_rel.magnitude();
        if v_inf < 1e-9 {
            return Err(GeometryError::DegenerateApproach);
        }

        // Arrival speed after falling through Earth's potential well
        let velocity_m_s = (v_inf * v_inf + EARTH_ESCAPE_VELOCITY * EARTH_ESCAPE_VELOCITY).sqrt();

        let (angle_deg, angle_estimated) = match measured_angle_deg {
            Some(angle) => (angle, false),
            None => (
                estimate_impact_angle(elements.inclination_deg, elements.eccentricity),
                true,
            ),
        };

        let azimuth_deg = v_rel.y.atan2(v_rel.x).to_degrees().rem_euclid(360.0);

        Ok(Self {
            velocity_m_s,
            angle_deg,
            azimuth_deg,
            latitude,
            longitude,
            angle_estimated,
            v_infinity_m_s: Some(v_inf),
            epoch_utc: julian_date_to_utc(elements.epoch_jd),
        })
    }

    /// Earth-centred position of the impact point (m)
    pub fn impact_position(&self) -> Vector3 {
        surface_normal(self.latitude, self.longitude).scale(R_EARTH)
    }

    /// Earth-centred arrival velocity (m/s), pointing into the surface
    pub fn velocity_vector(&self) -> Vector3 {
        let up = surface_normal(self.latitude, self.longitude);
        let (north, east) = local_horizontal_axes(self.latitude, self.longitude);
        let az = self.azimuth_deg.to_radians();
        let heading = north.scale(az.cos()).add(&east.scale(az.sin()));
        let elevation = self.angle_deg.to_radians();

        heading
            .scale(elevation.cos())
            .sub(&up.scale(elevation.sin()))
            .scale(self.velocity_m_s)
    }

    /// Orbital frame at arrival: (along-track, cross-track, radial-out)
    pub fn orbital_frame(&self) -> [Vector3; 3] {
        let along = self.velocity_vector().normalize();
        let up = surface_normal(self.latitude, self.longitude);
        let mut cross = along.cross(&up).normalize();
        if cross.magnitude() < 0.5 {
            // Vertical entry: any horizontal axis is perpendicular
            cross = local_horizontal_axes(self.latitude, self.longitude).1;
        }
        let radial = cross.cross(&along).normalize();
        [along, cross, radial]
    }
}

/// Heuristic impact angle from inclination and eccentricity.
///
/// This is an approximation, not derived physics: the true angle depends on
/// the encounter geometry, which a single osculating orbit does not fix.
pub fn estimate_impact_angle(inclination_deg: f64, eccentricity: f64) -> f64 {
    (inclination_deg.abs() + 45.0 * eccentricity).clamp(5.0, 90.0)
}

/// Outward unit normal at a geodetic point (spherical Earth)
pub fn surface_normal(latitude: f64, longitude: f64) -> Vector3 {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Local (north, east) unit vectors at a geodetic point
pub fn local_horizontal_axes(latitude: f64, longitude: f64) -> (Vector3, Vector3) {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    let north = Vector3::new(-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos());
    let east = Vector3::new(-lon.sin(), lon.cos(), 0.0);
    (north, east)
}

/// Wrap a longitude into [-180, 180]
pub fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Mean motion (rad/s) of a bound orbit
pub fn mean_motion(semi_major_axis_m: f64, mu: f64) -> f64 {
    (mu / semi_major_axis_m.powi(3)).sqrt()
}

/// Orbital period (days) of a bound heliocentric orbit
pub fn orbital_period_days(semi_major_axis_au: f64) -> f64 {
    2.0 * PI / mean_motion(semi_major_axis_au * AU, MU_SUN) / 86_400.0
}

// =============================================================================
// TESTS
// =============================================================================
