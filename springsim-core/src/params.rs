//! Simulation parameters, configured limits and request validation
//!
//! Everything downstream of [`SimulationParameters::validate`] assumes a
//! positive mass and spring constant; the solver does not check again.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Highest damping coefficient accepted by validation.
pub const MAX_DAMPING: f64 = 100.0;

/// Inputs that fully determine one trajectory.
///
/// Zero damping is a valid value and means the undamped case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Mass in kg
    pub mass: f64,
    /// Spring constant in N/m
    pub spring_constant: f64,
    /// Initial displacement from equilibrium in metres
    pub initial_displacement: f64,
    /// Damping coefficient
    #[serde(default)]
    pub damping: f64,
}

impl SimulationParameters {
    pub fn new(mass: f64, spring_constant: f64, initial_displacement: f64, damping: f64) -> Self {
        Self {
            mass,
            spring_constant,
            initial_displacement,
            damping,
        }
    }

    /// Check every rule against `limits`, reporting all violations at once.
    pub fn validate(&self, limits: &Limits) -> Result<(), Rejection> {
        let mut errors = Vec::new();

        if !self.mass.is_finite() || self.mass <= 0.0 {
            errors.push(ValidationError::MassNotPositive(self.mass));
        } else if self.mass > limits.max_mass {
            errors.push(ValidationError::MassTooLarge {
                value: self.mass,
                max: limits.max_mass,
            });
        }

        if !self.spring_constant.is_finite() || self.spring_constant <= 0.0 {
            errors.push(ValidationError::SpringConstantNotPositive(
                self.spring_constant,
            ));
        } else if self.spring_constant > limits.max_spring_constant {
            errors.push(ValidationError::SpringConstantTooLarge {
                value: self.spring_constant,
                max: limits.max_spring_constant,
            });
        }

        if !self.initial_displacement.is_finite()
            || self.initial_displacement.abs() > limits.max_displacement
        {
            errors.push(ValidationError::DisplacementOutOfRange {
                value: self.initial_displacement,
                max: limits.max_displacement,
            });
        }

        if !self.damping.is_finite() || self.damping < 0.0 {
            errors.push(ValidationError::DampingNegative(self.damping));
        } else if self.damping > MAX_DAMPING {
            errors.push(ValidationError::DampingTooLarge {
                value: self.damping,
                max: MAX_DAMPING,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Rejection { errors })
        }
    }
}

/// Upper bounds applied by validation and echoed to subscribers in every
/// init message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Limits {
    pub max_mass: f64,
    pub max_spring_constant: f64,
    pub max_displacement: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_mass: 10.0,
            max_spring_constant: 1000.0,
            max_displacement: 1.0,
        }
    }
}

/// A single violated rule
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("mass must be positive (got {0})")]
    MassNotPositive(f64),

    #[error("mass cannot exceed {max} kg (got {value})")]
    MassTooLarge { value: f64, max: f64 },

    #[error("spring constant must be positive (got {0})")]
    SpringConstantNotPositive(f64),

    #[error("spring constant cannot exceed {max} N/m (got {value})")]
    SpringConstantTooLarge { value: f64, max: f64 },

    #[error("initial displacement cannot exceed {max} meters in magnitude (got {value})")]
    DisplacementOutOfRange { value: f64, max: f64 },

    #[error("damping cannot be negative (got {0})")]
    DampingNegative(f64),

    #[error("damping cannot exceed {max} (got {value})")]
    DampingTooLarge { value: f64, max: f64 },
}

impl ValidationError {
    /// Name of the request field the rule applies to
    pub fn field(&self) -> &'static str {
        match self {
            Self::MassNotPositive(_) | Self::MassTooLarge { .. } => "mass",
            Self::SpringConstantNotPositive(_) | Self::SpringConstantTooLarge { .. } => {
                "spring_constant"
            }
            Self::DisplacementOutOfRange { .. } => "initial_displacement",
            Self::DampingNegative(_) | Self::DampingTooLarge { .. } => "damping",
        }
    }
}

/// A rejected request. Always holds at least one error.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    errors: Vec<ValidationError>,
}

impl Rejection {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid simulation parameters: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Rejection {}
