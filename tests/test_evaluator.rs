use sansnd::core::model::{ModelParameters, SansModel};
use sansnd::engine::curve::geomspace;
use sansnd::engine::evaluator::ScatteringEvaluator;
use sansnd::SansError;

mod common;
use common::{assert_rel_close, power_law_model, sphere_model, write_data_file};

#[test]
fn test_vectorized_output_is_aligned_and_non_negative() {
    let evaluator = ScatteringEvaluator::new(sphere_model()).unwrap();

    let energies = [1e-5, 1e-4, 1e-3, 1e-2, 0.1];
    let xs = evaluator.cross_section_many(&energies).unwrap();
    assert_eq!(xs.len(), energies.len());
    assert!(xs.iter().all(|&v| v >= 0.0 && v.is_finite()));

    // Element i depends only on input i.
    for (idx, &e) in energies.iter().enumerate() {
        assert_eq!(xs[idx], evaluator.cross_section(e).unwrap());
    }

    let q_values = [0.0, 1e-4, 0.01, 0.1, 1.0];
    let intensities = evaluator.intensity_many(&q_values).unwrap();
    assert_eq!(intensities.len(), q_values.len());
    assert!(intensities.iter().all(|&v| v >= 0.0 && v.is_finite()));
}

#[test]
fn test_repeated_inputs_give_identical_outputs() {
    let evaluator = ScatteringEvaluator::new(sphere_model()).unwrap();
    let out = evaluator.intensity_many(&[0.02, 0.02]).unwrap();
    assert_eq!(out[0], out[1]);

    let xs = evaluator.cross_section_many(&[1e-3, 1e-3]).unwrap();
    assert_eq!(xs[0], xs[1]);
}

#[test]
fn test_sphere_direct_and_curve_paths_agree() {
    let evaluator = ScatteringEvaluator::new(sphere_model()).unwrap();
    for e in geomspace(1e-4, 0.1, 7) {
        let direct = evaluator.cross_section(e).unwrap();
        let from_iq = evaluator.cross_section_from_intensity(e).unwrap();
        assert!(direct > 0.0);
        assert_rel_close(from_iq, direct, 1e-3, "sphere cross-section paths");
    }
}

#[test]
fn test_power_law_direct_and_curve_paths_agree() {
    let evaluator = ScatteringEvaluator::new(power_law_model()).unwrap();
    // The sweep crosses the energy where the kinematic limit 2k passes
    // the breakpoint, exercising both closed-form branches.
    for e in geomspace(1e-7, 1e-3, 9) {
        let direct = evaluator.cross_section(e).unwrap();
        let from_iq = evaluator.cross_section_from_intensity(e).unwrap();
        assert!(direct > 0.0);
        assert_rel_close(from_iq, direct, 1e-6, "power-law cross-section paths");
    }
}

#[test]
fn test_zero_energy_is_continuous() {
    let evaluator = ScatteringEvaluator::new(sphere_model()).unwrap();

    let at_zero = evaluator.cross_section(0.0).unwrap();
    let near_zero = evaluator.cross_section(1e-14).unwrap();
    assert!(at_zero > 0.0 && at_zero.is_finite());
    assert_rel_close(at_zero, near_zero, 1e-6, "cross-section near E = 0");

    let helper_zero = evaluator.cross_section_from_intensity(0.0).unwrap();
    let helper_near = evaluator.cross_section_from_intensity(1e-14).unwrap();
    assert_rel_close(helper_zero, helper_near, 1e-3, "curve cross-section near E = 0");
}

#[test]
fn test_malformed_inputs_fail_loudly() {
    let evaluator = ScatteringEvaluator::new(sphere_model()).unwrap();

    for bad in [f64::NAN, -1.0, f64::INFINITY] {
        assert!(matches!(
            evaluator.cross_section(bad).unwrap_err(),
            SansError::Domain { .. }
        ));
    }

    // One malformed element rejects the whole vectorized call.
    let err = evaluator
        .cross_section_many(&[1e-3, f64::NAN, 1e-2])
        .unwrap_err();
    assert!(matches!(err, SansError::Domain { .. }));

    let err = evaluator.intensity_many(&[0.01, -0.5]).unwrap_err();
    assert!(matches!(err, SansError::Domain { .. }));
}

#[test]
fn test_table_model_round_trip() {
    // I(q) = 1/q sampled on three nodes: the log-log reconstruction is
    // exact, so interior lookups return the underlying law.
    let path = write_data_file("iq-powerlaw.txt", "0.01 100.0\n0.1 10.0\n1.0 1.0\n");
    let model = SansModel::from_table_file(&path).unwrap();
    let evaluator = ScatteringEvaluator::new(model).unwrap();

    assert_rel_close(evaluator.intensity(0.05).unwrap(), 20.0, 1e-9, "table I(q)");
    // Outside the tabulated domain: constant below, zero above.
    assert_eq!(evaluator.intensity(1e-3).unwrap(), 100.0);
    assert_eq!(evaluator.intensity(2.0).unwrap(), 0.0);

    // Both cross-section paths integrate the same table.
    let direct = evaluator.cross_section(1e-3).unwrap();
    let from_iq = evaluator.cross_section_from_intensity(1e-3).unwrap();
    assert!(direct > 0.0);
    assert_eq!(direct, from_iq);
}

#[test]
fn test_guinier_porod_paths_coincide() {
    let model = SansModel::new(ModelParameters::GuinierPorod {
        a: 1.0,
        s: 1.0,
        rg: 30.0,
        m: 4.0,
        p: 2.5,
    })
    .unwrap();
    let evaluator = ScatteringEvaluator::new(model).unwrap();
    let direct = evaluator.cross_section(1e-3).unwrap();
    let from_iq = evaluator.cross_section_from_intensity(1e-3).unwrap();
    assert!(direct > 0.0);
    assert_eq!(direct, from_iq);
}

#[test]
fn test_sphere_distribution_averages_cross_sections() {
    let path = write_data_file("radii-avg.txt", "40.0 1.0\n60.0 1.0\n");
    let mixed = ScatteringEvaluator::new(
        SansModel::new(ModelParameters::SphereDistribution {
            path,
            sld: 1.0,
            sld_solvent: 0.0,
        })
        .unwrap(),
    )
    .unwrap();
    let small = ScatteringEvaluator::new(SansModel::sphere(40.0, 1.0, 0.0).unwrap()).unwrap();
    let large = ScatteringEvaluator::new(SansModel::sphere(60.0, 1.0, 0.0).unwrap()).unwrap();

    let e = 1e-3;
    let expected =
        0.5 * (small.cross_section(e).unwrap() + large.cross_section(e).unwrap());
    assert_rel_close(
        mixed.cross_section(e).unwrap(),
        expected,
        1e-12,
        "distribution average",
    );
}
