use sansnd::engine::curve::{geomspace, IqCurve};
use sansnd::SansError;

mod common;
use common::assert_rel_close;

#[test]
fn test_geomspace_endpoints() {
    let grid = geomspace(1e-6, 439.0, 1000);
    assert_eq!(grid.len(), 1000);
    assert_eq!(grid[0], 1e-6);
    assert_eq!(*grid.last().unwrap(), 439.0);
    assert!(grid.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_flat_intensity_integral_and_sampling() {
    // I(q) = 2 everywhere: ∫ q·I dq = q², and Q ~ qlim·sqrt(u).
    let curve = IqCurve::from_function(|_| 2.0, 0.1, 10.0, 1000, &[]);
    assert_rel_close(curve.integral_to(5.0), 25.0, 1e-9, "integral to 5");
    assert_rel_close(curve.integral_to(10.0), 100.0, 1e-9, "integral to 10");

    for u in [0.01, 0.25, 0.5, 0.99] {
        assert_rel_close(curve.sample_q(u, 10.0), 10.0 * u.sqrt(), 1e-6, "flat sample");
    }
}

#[test]
fn test_single_power_law_is_exact() {
    // I(q) = 1/q on two nodes only. The cell reconstruction recovers the
    // exponent, so ∫_0^x q·I dq = x exactly, and sampling is linear in u.
    let curve = IqCurve::from_points(vec![1.0, 100.0], vec![1.0, 0.01]).unwrap();
    assert_rel_close(curve.integral_to(10.0), 10.0, 1e-12, "integral to 10");
    assert_rel_close(curve.integral_to(100.0), 100.0, 1e-12, "integral to 100");

    for u in [0.001, 0.2, 0.5, 0.999] {
        assert_rel_close(curve.sample_q(u, 100.0), 100.0 * u, 1e-9, "power-law sample");
    }
}

#[test]
fn test_breakpoint_continuity_and_monotonic_inversion() {
    let (a1, b1, b2, q0): (f64, f64, f64, f64) = (10.0, 1.2, 3.8, 0.05);
    let a2 = a1 * q0.powf(b2 - b1);
    let f = move |q: f64| {
        if q < q0 {
            a1 * q.powf(-b1)
        } else {
            a2 * q.powf(-b2)
        }
    };
    let curve = IqCurve::from_function(f, 1e-4, 10.0, 5000, &[q0]);

    // The cumulative integral is continuous across the breakpoint.
    let below = curve.integral_to(q0 * (1.0 - 1e-9));
    let above = curve.integral_to(q0 * (1.0 + 1e-9));
    assert_rel_close(below, above, 1e-6, "cumulative integral at q0");

    // Inversion is monotonic in u, with every draw inside (0, qlim].
    let qlim = 2.0;
    let mut previous = 0.0;
    for step in 0..=1000 {
        let u = step as f64 / 1000.0 * 0.999_999;
        let q = curve.sample_q(u, qlim);
        assert!(q > 0.0 && q <= qlim, "sampled q = {q} out of range");
        assert!(q >= previous, "inversion not monotonic at u = {u}");
        previous = q;
    }
}

#[test]
fn test_from_points_validation() {
    let err = IqCurve::from_points(vec![0.1, 1.0], vec![1.0]).unwrap_err();
    assert!(matches!(err, SansError::Configuration(_)));

    let err = IqCurve::from_points(vec![0.1], vec![1.0]).unwrap_err();
    assert!(matches!(err, SansError::Configuration(_)));

    let err = IqCurve::from_points(vec![1.0, 0.1], vec![1.0, 1.0]).unwrap_err();
    assert!(matches!(err, SansError::Configuration(_)));

    let err = IqCurve::from_points(vec![0.1, 1.0], vec![1.0, -2.0]).unwrap_err();
    assert!(matches!(err, SansError::Configuration(_)));
}

#[test]
fn test_zero_curve_falls_back_to_flat_sampling() {
    let curve = IqCurve::from_points(vec![0.1, 1.0], vec![0.0, 0.0]).unwrap();
    assert_eq!(curve.integral_to(1.0), 0.0);
    assert_rel_close(curve.sample_q(0.25, 1.0), 0.5, 1e-12, "flat fallback");
}
