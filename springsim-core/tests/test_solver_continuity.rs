//! Continuity of the solution at t = 0 and across regime boundaries

use springsim_core::solver::{DampingRegime, Trajectory};
use springsim_core::tests::test_helpers::approx_eq;
use springsim_core::SimulationParameters;

/// Damping coefficient producing damping ratio `zeta` for the given mass and spring
fn damping_for(zeta: f64, mass: f64, spring_constant: f64) -> f64 {
    zeta * 2.0 * (spring_constant * mass).sqrt()
}

#[test]
fn test_initial_displacement_in_every_regime() {
    let cases = [
        (1.0, 4.0, 0.5, 0.0),
        (2.0, 50.0, -0.3, 1.0),
        (1.0, 1.0, 1.0, 2.0),
        (1.0, 1.0, 1.0, 4.0),
        (10.0, 1000.0, 0.75, 100.0),
        (0.5, 0.5, -1.0, 1.0),
    ];

    for (mass, k, x0, damping) in cases {
        let trajectory = Trajectory::new(&SimulationParameters::new(mass, k, x0, damping));
        assert!(
            approx_eq(trajectory.displacement(0.0), x0, 1e-12),
            "x(0) != x0 for regime {:?}",
            trajectory.regime()
        );
    }
}

#[test]
fn test_branches_agree_near_critical() {
    let (mass, k, x0) = (2.0, 8.0, 0.4);
    let below = Trajectory::new(&SimulationParameters::new(
        mass,
        k,
        x0,
        damping_for(1.0 - 1e-6, mass, k),
    ));
    let at = Trajectory::new(&SimulationParameters::new(
        mass,
        k,
        x0,
        damping_for(1.0, mass, k),
    ));
    let above = Trajectory::new(&SimulationParameters::new(
        mass,
        k,
        x0,
        damping_for(1.0 + 1e-6, mass, k),
    ));

    assert_eq!(below.regime(), DampingRegime::Underdamped);
    assert_eq!(at.regime(), DampingRegime::CriticallyDamped);
    assert_eq!(above.regime(), DampingRegime::Overdamped);

    for t in [0.05, 0.1, 0.5, 1.0] {
        let reference = at.displacement(t);
        assert!(approx_eq(below.displacement(t), reference, 1e-5), "t = {}", t);
        assert!(approx_eq(above.displacement(t), reference, 1e-5), "t = {}", t);
    }
}

#[test]
fn test_evaluation_is_deterministic() {
    let params = SimulationParameters::new(3.0, 120.0, 0.9, 7.5);
    let a = Trajectory::new(&params);
    let b = Trajectory::new(&params);
    for i in 0..100 {
        let t = i as f64 * 0.1;
        assert_eq!(a.displacement(t).to_bits(), b.displacement(t).to_bits());
    }
}
