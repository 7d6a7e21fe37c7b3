use rayon::prelude::*;

use crate::core::constants;
use crate::core::error::{SansError, SansResult};
use crate::core::model::{ModelForm, Q_MIN, SansModel};
use crate::engine::curve::{GRID_POINTS, IqCurve};

/// Incident energy (eV) the resampled curve must cover: the grid extends
/// to the kinematic limit Q = 2k at this energy.
const EKIN_MAX: f64 = 100.0;

/// Evaluates cross-sections and intensities for a fixed model.
///
/// Construction resamples the model's I(Q) once; afterwards every call is
/// a pure function of its arguments, so the vectorized entry points are
/// free to fan out across threads.
pub struct ScatteringEvaluator {
    model: SansModel,
    curve: IqCurve,
}

impl ScatteringEvaluator {
    pub fn new(model: SansModel) -> SansResult<Self> {
        let q_hi = 2.0 * constants::ekin_to_wavevector(EKIN_MAX);
        let curve = match model.form() {
            ModelForm::Table { q, i } => IqCurve::from_points(q.clone(), i.clone())?,
            _ => IqCurve::from_function(
                |x| model.intensity_value(x),
                Q_MIN,
                q_hi,
                GRID_POINTS,
                &model.grid_knots(),
            ),
        };
        let (lo, hi) = curve.q_domain();
        log::debug!("resampled I(Q) over Q = [{lo:.3e}, {hi:.3e}]");
        Ok(Self { model, curve })
    }

    pub fn model(&self) -> &SansModel {
        &self.model
    }

    pub(crate) fn curve(&self) -> &IqCurve {
        &self.curve
    }

    /// Total scattering cross-section at one incident energy (eV).
    pub fn cross_section(&self, ekin: f64) -> SansResult<f64> {
        validate_energy(ekin)?;
        Ok(self.cross_section_value(ekin))
    }

    /// Vectorized [`Self::cross_section`]: output is index-aligned with
    /// the input and has the same length.
    pub fn cross_section_many(&self, energies: &[f64]) -> SansResult<Vec<f64>> {
        validate_energies(energies)?;
        Ok(energies
            .par_iter()
            .map(|&e| self.cross_section_value(e))
            .collect())
    }

    /// Scattering intensity I(Q) at one momentum transfer (1/Å).
    pub fn intensity(&self, q: f64) -> SansResult<f64> {
        validate_q(q)?;
        Ok(self.model.intensity_value(q))
    }

    /// Vectorized [`Self::intensity`].
    pub fn intensity_many(&self, q_values: &[f64]) -> SansResult<Vec<f64>> {
        for &q in q_values {
            validate_q(q)?;
        }
        Ok(q_values
            .par_iter()
            .map(|&q| self.model.intensity_value(q))
            .collect())
    }

    /// Cross-section derived by integrating the resampled intensity curve,
    /// σ(E) = ∫_0^2k q·I(q) dq / 2k². The alternative path to
    /// [`Self::cross_section`], kept as a numerical cross-check of the
    /// closed forms.
    pub fn cross_section_from_intensity(&self, ekin: f64) -> SansResult<f64> {
        validate_energy(ekin)?;
        let k = constants::ekin_to_wavevector(ekin);
        Ok(self.curve_cross_section(k))
    }

    /// Vectorized [`Self::cross_section_from_intensity`].
    pub fn cross_section_from_intensity_many(&self, energies: &[f64]) -> SansResult<Vec<f64>> {
        validate_energies(energies)?;
        Ok(energies
            .par_iter()
            .map(|&e| self.curve_cross_section(constants::ekin_to_wavevector(e)))
            .collect())
    }

    fn cross_section_value(&self, ekin: f64) -> f64 {
        let k = constants::ekin_to_wavevector(ekin);
        match self.model.form() {
            ModelForm::Sphere { radius, contrast } => sphere_cross_section(k, *radius, *contrast),
            ModelForm::SphereDistribution { entries, contrast } => entries
                .iter()
                .map(|&(r, w)| w * sphere_cross_section(k, r, *contrast))
                .sum(),
            ModelForm::PowerLaw { a1, b1, a2, b2, q0 } => {
                power_law_cross_section(k, *a1, *b1, *a2, *b2, *q0)
            }
            // No closed form for these; the curve integral is the direct path.
            ModelForm::GuinierPorod { .. } | ModelForm::Table { .. } => self.curve_cross_section(k),
        }
    }

    fn curve_cross_section(&self, k: f64) -> f64 {
        self.curve.integral_to(2.0 * k) / (2.0 * k * k)
    }
}

/// Born-approximation sphere integral
/// G(x) = (1 - 1/x² + sin(2x)/x³ - sin²x/x⁴)/4 with its small-x series,
/// where x = 2kR. Satisfies ∫_0^x 9(sin u - u cos u)²/u⁵ du = 9·G(x).
fn born_sphere_integral(x: f64) -> f64 {
    if x < 1e-2 {
        x * x / 18.0 - x * x * x * x / 180.0
    } else {
        let s = x.sin();
        let x2 = x * x;
        0.25 * (1.0 - 1.0 / x2 + (2.0 * x).sin() / (x2 * x) - s * s / (x2 * x2))
    }
}

/// Closed-form sphere cross-section σ = 8π²Δρ²R⁴·G(2kR)/k², the exact
/// value of ∫_0^2k q·I_sphere(q) dq / 2k².
fn sphere_cross_section(k: f64, radius: f64, contrast: f64) -> f64 {
    let pi = std::f64::consts::PI;
    let x = 2.0 * k * radius;
    8.0 * pi * pi * contrast * contrast * radius.powi(4) * born_sphere_integral(x) / (k * k)
}

/// Closed-form cross-section of the piecewise power law, integrating each
/// branch analytically up to the kinematic limit 2k.
fn power_law_cross_section(k: f64, a1: f64, b1: f64, a2: f64, b2: f64, q0: f64) -> f64 {
    let q_max = 2.0 * k;
    let integral = if q_max <= q0 {
        power_branch_integral(a1, b1, 0.0, q_max)
    } else {
        power_branch_integral(a1, b1, 0.0, q0) + power_branch_integral(a2, b2, q0, q_max)
    };
    integral / (2.0 * k * k)
}

/// ∫ a·q^(1-b) dq over [q_lo, q_hi]; q_lo = 0 requires b < 2.
fn power_branch_integral(a: f64, b: f64, q_lo: f64, q_hi: f64) -> f64 {
    let e = 2.0 - b;
    if e.abs() < 1e-12 {
        a * (q_hi / q_lo).ln()
    } else {
        a * (q_hi.powf(e) - q_lo.powf(e)) / e
    }
}

pub(crate) fn validate_energy(ekin: f64) -> SansResult<()> {
    if !ekin.is_finite() {
        return Err(SansError::Domain {
            name: "ekin",
            value: ekin,
            reason: "kinetic energy must be finite",
        });
    }
    if ekin < 0.0 {
        return Err(SansError::Domain {
            name: "ekin",
            value: ekin,
            reason: "kinetic energy must be non-negative",
        });
    }
    Ok(())
}

pub(crate) fn validate_energies(energies: &[f64]) -> SansResult<()> {
    energies.iter().try_for_each(|&e| validate_energy(e))
}

fn validate_q(q: f64) -> SansResult<()> {
    if !q.is_finite() {
        return Err(SansError::Domain {
            name: "q",
            value: q,
            reason: "momentum transfer must be finite",
        });
    }
    if q < 0.0 {
        return Err(SansError::Domain {
            name: "q",
            value: q,
            reason: "momentum transfer must be non-negative",
        });
    }
    Ok(())
}
