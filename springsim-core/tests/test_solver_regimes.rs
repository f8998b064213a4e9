//! Closed-form solutions for each damping regime

use springsim_core::solver::{damping_ratio, natural_frequency, DampingRegime, Trajectory};
use springsim_core::tests::test_helpers::approx_eq;
use springsim_core::{encode, evaluate, RunEvent, RunId, Sample, SimulationParameters};
use std::f64::consts::{E, PI};

#[test]
fn test_derived_quantities() {
    assert!(approx_eq(natural_frequency(1.0, 4.0), 2.0, 1e-12));
    assert!(approx_eq(damping_ratio(1.0, 1.0, 2.0), 1.0, 1e-12));
    assert!(approx_eq(damping_ratio(1.0, 1.0, 4.0), 2.0, 1e-12));
    assert!(approx_eq(damping_ratio(2.0, 8.0, 0.0), 0.0, 1e-12));
}

#[test]
fn test_regime_classification() {
    assert_eq!(DampingRegime::classify(0.0), DampingRegime::Underdamped);
    assert_eq!(DampingRegime::classify(0.999), DampingRegime::Underdamped);
    assert_eq!(DampingRegime::classify(1.0), DampingRegime::CriticallyDamped);
    assert_eq!(DampingRegime::classify(1.0 + 1e-9), DampingRegime::CriticallyDamped);
    assert_eq!(DampingRegime::classify(1.0 - 1e-9), DampingRegime::CriticallyDamped);
    assert_eq!(DampingRegime::classify(1.001), DampingRegime::Overdamped);
    assert_eq!(DampingRegime::classify(5.0), DampingRegime::Overdamped);
}

#[test]
fn test_undamped_is_cosine() {
    // m = 1, k = 4 → ω₀ = 2, x(t) = 0.5·cos(2t)
    assert!(approx_eq(evaluate(1.0, 4.0, 0.5, 0.0, 0.0), 0.5, 1e-12));
    assert!(approx_eq(evaluate(1.0, 4.0, 0.5, 0.0, PI / 4.0), 0.0, 1e-12));
    assert!(approx_eq(evaluate(1.0, 4.0, 0.5, 0.0, PI / 2.0), -0.5, 1e-12));

    for i in 0..50 {
        let t = i as f64 * 0.1;
        let expected = 0.5 * (2.0 * t).cos();
        assert!(
            approx_eq(evaluate(1.0, 4.0, 0.5, 0.0, t), expected, 1e-12),
            "mismatch at t = {}",
            t
        );
    }
}

#[test]
fn test_critically_damped_value() {
    // m = 1, k = 1, c = 2 → ζ = 1, x(t) = (1 + t)·e^(−t)
    let params = SimulationParameters::new(1.0, 1.0, 1.0, 2.0);
    let trajectory = Trajectory::new(&params);
    assert_eq!(trajectory.regime(), DampingRegime::CriticallyDamped);
    assert!(approx_eq(trajectory.displacement(1.0), 2.0 / E, 1e-12));
    assert!(approx_eq(trajectory.displacement(1.0), 0.7358, 1e-4));
}

#[test]
fn test_overdamped_decays_without_oscillation() {
    // m = 1, k = 1, c = 4 → ζ = 2
    let params = SimulationParameters::new(1.0, 1.0, 1.0, 4.0);
    let trajectory = Trajectory::new(&params);
    assert_eq!(trajectory.regime(), DampingRegime::Overdamped);
    assert!(approx_eq(trajectory.displacement(0.0), 1.0, 1e-12));

    let mut previous = trajectory.displacement(0.0);
    for i in 1..=400 {
        let x = trajectory.displacement(i as f64 * 0.1);
        assert!(x > 0.0, "overdamped response changed sign at step {}", i);
        assert!(x < previous, "overdamped response not decaying at step {}", i);
        previous = x;
    }
    assert!(previous < 1e-3, "should have decayed towards rest, got {}", previous);
}

#[test]
fn test_underdamped_envelope_decays() {
    // ζ = 0.1: oscillates, bounded by the e^(−ζω₀t) envelope scaled for the sine term
    let params = SimulationParameters::new(1.0, 100.0, 0.2, 2.0);
    let trajectory = Trajectory::new(&params);
    assert_eq!(trajectory.regime(), DampingRegime::Underdamped);

    let mut sign_changes = 0;
    let mut previous = trajectory.displacement(0.0);
    for i in 1..=300 {
        let t = i as f64 * 0.01;
        let x = trajectory.displacement(t);
        let envelope = 0.2 * (-1.0 * t).exp() / (1.0_f64 - 0.01).sqrt();
        assert!(x.abs() <= envelope + 1e-12, "outside envelope at t = {}", t);
        if x.signum() != previous.signum() {
            sign_changes += 1;
        }
        previous = x;
    }
    assert!(sign_changes >= 4, "underdamped response should oscillate");
}

#[test]
fn test_negative_displacement_mirrors_positive() {
    for damping in [0.0, 2.0, 4.0] {
        for i in 0..20 {
            let t = i as f64 * 0.25;
            let up = evaluate(1.0, 1.0, 0.5, damping, t);
            let down = evaluate(1.0, 1.0, -0.5, damping, t);
            assert!(approx_eq(up, -down, 1e-12));
        }
    }
}

#[test]
fn test_results_finite_across_limits() {
    let masses = [0.01, 1.0, 10.0];
    let springs = [0.01, 1.0, 1000.0];
    let dampings = [0.0, 0.5, 10.0, 100.0];
    for &m in &masses {
        for &k in &springs {
            for &c in &dampings {
                for i in 0..100 {
                    let x = evaluate(m, k, 1.0, c, i as f64 * 0.1);
                    assert!(x.is_finite(), "non-finite for m={} k={} c={}", m, k, c);
                }
            }
        }
    }
}

#[test]
fn test_results_finite_for_extreme_valid_inputs() {
    let masses = [1e-320, f64::MIN_POSITIVE, 1e-160, 1e-9, 1.0, 10.0];
    let springs = [1e-320, f64::MIN_POSITIVE, 1e-160, 1e-9, 1.0, 1000.0];
    let dampings = [0.0, 1e-300, 1e-6, 1.0, 100.0];
    let times = [0.0, 0.1, 1.0, 100.0, 1e6];
    for &m in &masses {
        for &k in &springs {
            for &c in &dampings {
                for &x0 in &[1.0, -1.0] {
                    let trajectory = Trajectory::new(&SimulationParameters::new(m, k, x0, c));
                    for &t in &times {
                        let x = trajectory.displacement(t);
                        assert!(
                            x.is_finite(),
                            "non-finite at t={} for m={} k={} c={} ({:?})",
                            t,
                            m,
                            k,
                            c,
                            trajectory.regime()
                        );
                    }
                    assert!(
                        approx_eq(trajectory.displacement(0.0), x0, 1e-9),
                        "x(0) != x0 for m={} k={} c={}",
                        m,
                        k,
                        c
                    );
                }
            }
        }
    }
}

#[test]
fn test_tiny_mass_and_spring_with_heavy_damping() {
    let trajectory = Trajectory::new(&SimulationParameters::new(1e-160, 1e-160, 0.5, 100.0));
    assert_eq!(trajectory.regime(), DampingRegime::Overdamped);
    for t in [0.0, 0.1, 1.0] {
        assert!(approx_eq(trajectory.displacement(t), 0.5, 1e-12), "t = {}", t);
    }

    let frame = encode(&RunEvent::Sample(Sample {
        run: RunId(1),
        time: 0.1,
        displacement: trajectory.displacement(0.1),
    }))
    .expect("encode");
    assert!(!frame.contains("null"), "frame = {}", frame);
}

#[test]
fn test_large_damping_ratio_follows_slow_root() {
    // For ζ ≫ 1 the response is x0·e^(−ω₀t/2ζ) = x0·e^(−kt/c)
    for (m, k, c, t) in [
        (1e-6, 1e-6, 100.0, 1e8),
        (1e-9, 1e-9, 100.0, 1e10),
        (1e-3, 1e-3, 50.0, 5e4),
    ] {
        let zeta = damping_ratio(m, k, c);
        assert!(zeta > 1e3);
        let expected = (-natural_frequency(m, k) * t / (2.0 * zeta)).exp();
        let x = evaluate(m, k, 1.0, c, t);
        assert!(
            approx_eq(x, expected, 1e-8),
            "m={} k={} c={}: got {} expected {}",
            m,
            k,
            c,
            x,
            expected
        );
    }
}
