//! Closed-form response of a damped spring-mass oscillator
//!
//! The mass is released from rest at the initial displacement, so every
//! branch satisfies x(0) = x0 and x'(0) = 0. The regime is picked from the
//! damping ratio with a small tolerance around 1.0, since exact equality
//! with critical damping is not reliable in floating point.
//!
//! Mass and spring constant may be arbitrarily close to zero, so products
//! and quotients that can leave the f64 range are taken apart: √k and √m
//! are computed separately and the overdamped roots never square ζ.

use crate::params::SimulationParameters;

/// Half-width of the band around ζ = 1 treated as critically damped
pub const REGIME_TOLERANCE: f64 = 1e-8;

/// Natural angular frequency ω₀ = √(k / m)
pub fn natural_frequency(mass: f64, spring_constant: f64) -> f64 {
    spring_constant.sqrt() / mass.sqrt()
}

/// Damping ratio ζ = c / (2·√(k·m))
///
/// May be infinite when `k·m` is far below the smallest normal f64.
pub fn damping_ratio(mass: f64, spring_constant: f64, damping: f64) -> f64 {
    damping / (2.0 * spring_constant.sqrt() * mass.sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DampingRegime {
    Underdamped,
    CriticallyDamped,
    Overdamped,
}

impl DampingRegime {
    pub fn classify(zeta: f64) -> Self {
        if zeta > 1.0 + REGIME_TOLERANCE {
            Self::Overdamped
        } else if zeta < 1.0 - REGIME_TOLERANCE {
            Self::Underdamped
        } else {
            Self::CriticallyDamped
        }
    }
}

/// Branch coefficients, computed once per parameter set
#[derive(Debug, Clone, Copy)]
enum Branch {
    Underdamped {
        decay: f64,
        omega_d: f64,
        cos_coeff: f64,
        sin_coeff: f64,
    },
    Critical {
        omega0: f64,
        x0: f64,
    },
    Overdamped {
        fast: f64,
        slow: f64,
        fast_coeff: f64,
        slow_coeff: f64,
    },
}

/// Displacement as a function of time for one set of parameters
#[derive(Debug, Clone, Copy)]
pub struct Trajectory {
    regime: DampingRegime,
    branch: Branch,
}

impl Trajectory {
    pub fn new(params: &SimulationParameters) -> Self {
        let omega0 = natural_frequency(params.mass, params.spring_constant);
        let zeta = damping_ratio(params.mass, params.spring_constant, params.damping);
        let x0 = params.initial_displacement;
        let regime = DampingRegime::classify(zeta);

        let branch = match regime {
            DampingRegime::Underdamped => {
                let omega_d = omega0 * ((1.0 - zeta) * (1.0 + zeta)).sqrt();
                Branch::Underdamped {
                    decay: zeta * omega0,
                    omega_d,
                    cos_coeff: x0,
                    sin_coeff: zeta * x0 * omega0 / omega_d,
                }
            }
            DampingRegime::CriticallyDamped => Branch::Critical { omega0, x0 },
            DampingRegime::Overdamped => {
                // Roots are -β(1 ± s) with β = c/2m and s = √(1 - 1/ζ²).
                // The slow root uses r1·r2 = ω₀² so it keeps full precision
                // for large ζ.
                let rho = 1.0 / zeta;
                let s = ((1.0 - rho) * (1.0 + rho)).sqrt();
                let decay = params.damping / (2.0 * params.mass);
                let slow = -(2.0 * params.spring_constant / params.damping) / (1.0 + s);
                // Coefficients sum to x0 and give zero initial velocity
                Branch::Overdamped {
                    fast: (-decay * (1.0 + s)).max(f64::MIN),
                    slow,
                    fast_coeff: -x0 * rho * rho / (2.0 * s * (1.0 + s)),
                    slow_coeff: x0 * (1.0 + s) / (2.0 * s),
                }
            }
        };

        Self { regime, branch }
    }

    pub fn regime(&self) -> DampingRegime {
        self.regime
    }

    /// Displacement in metres at `t` seconds after release
    pub fn displacement(&self, t: f64) -> f64 {
        match self.branch {
            Branch::Underdamped {
                decay,
                omega_d,
                cos_coeff,
                sin_coeff,
            } => {
                let phase = omega_d * t;
                (-decay * t).exp() * (cos_coeff * phase.cos() + sin_coeff * phase.sin())
            }
            Branch::Critical { omega0, x0 } => (x0 + omega0 * x0 * t) * (-omega0 * t).exp(),
            Branch::Overdamped {
                fast,
                slow,
                fast_coeff,
                slow_coeff,
            } => fast_coeff * (fast * t).exp() + slow_coeff * (slow * t).exp(),
        }
    }
}

/// Evaluate the displacement at time `t` for the given parameters.
///
/// `mass` and `spring_constant` must be positive.
pub fn evaluate(
    mass: f64,
    spring_constant: f64,
    initial_displacement: f64,
    damping: f64,
    t: f64,
) -> f64 {
    let params = SimulationParameters::new(mass, spring_constant, initial_displacement, damping);
    Trajectory::new(&params).displacement(t)
}
