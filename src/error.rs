// Error Types - Validation, geometry and boundary failures
// Every fallible entry point in the engine returns one of these

use serde::Serialize;

// =============================================================================
// VALIDATION
// =============================================================================

/// Raw input rejected before any computation runs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[error("invalid {field}: {constraint}")]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `asteroid.diameter_m`)
    pub field: String,
    /// Human-readable constraint that was violated
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// Require `value` to be finite and strictly positive.
pub fn require_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be a finite value > 0"))
    }
}

/// Require `value` to be finite and non-negative.
pub fn require_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be a finite value >= 0"))
    }
}

/// Require `value` to lie in the closed interval `[min, max]`.
pub fn require_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be within [{min}, {max}]"),
        ))
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
pub enum GeometryError {
    /// Newton iteration on Kepler's equation hit its cap.
    #[error(
        "Kepler solver did not converge after {iterations} iterations \
         (last estimate {last_estimate}, residual {residual:e})"
    )]
    KeplerNotConverged {
        /// Last eccentric anomaly iterate (radians)
        last_estimate: f64,
        /// |E - e sin E - M| at the last iterate
        residual: f64,
        iterations: u32,
    },

    /// Asteroid and Earth share the same heliocentric velocity.
    #[error("relative approach velocity is zero; impact geometry undefined")]
    DegenerateApproach,
}

// =============================================================================
// COLLABORATOR BOUNDARY
// =============================================================================

/// Failure reported by a settlement/population provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("settlement provider unavailable: {0}")]
    Unavailable(String),

    #[error("settlement lookup timed out after {0} ms")]
    Timeout(u64),
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to parse JSON content.
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    Env { key: String, value: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

// =============================================================================
// UMBRELLA
// =============================================================================

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Background worker panicked or was aborted.
    #[error("simulation worker failed: {0}")]
    Worker(String),
}
