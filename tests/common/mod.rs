#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use sansnd::core::model::{ModelParameters, SansModel};

// Prototype fit of a nanodiamond powder I(Q): two power-law branches
// meeting at q0. a2 is derived from the other parameters so the branches
// join exactly.
pub const PPF_A1: f64 = 132.869;
pub const PPF_B1: f64 = 1.33605;
pub const PPF_B2: f64 = 3.97314;
pub const PPF_Q0: f64 = 0.0510821;

pub fn ppf_a2() -> f64 {
    PPF_A1 * PPF_Q0.powf(PPF_B2 - PPF_B1)
}

pub fn sphere_model() -> SansModel {
    SansModel::sphere(50.0, 1.0, 0.0).expect("valid sphere model")
}

pub fn power_law_model() -> SansModel {
    SansModel::new(ModelParameters::PowerLaw {
        a1: PPF_A1,
        b1: PPF_B1,
        a2: ppf_a2(),
        b2: PPF_B2,
        q0: PPF_Q0,
    })
    .expect("valid power-law model")
}

/// Writes a scratch data file under the system temp directory and
/// returns its path. Names must be unique per call site.
pub fn write_data_file(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("sansnd-test-{}-{}", std::process::id(), name));
    fs::write(&path, contents).expect("writing test data file");
    path
}

pub fn assert_rel_close(actual: f64, expected: f64, rel_tol: f64, what: &str) {
    let scale = actual.abs().max(expected.abs());
    assert!(
        (actual - expected).abs() <= rel_tol * scale,
        "{what}: {actual} vs {expected} (relative tolerance {rel_tol})"
    );
}
