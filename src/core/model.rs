use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{SansError, SansResult};

/// Lower edge of the resampled Q domain (1/Å). Pure power-law forms
/// diverge at Q = 0 and are evaluated at this point for any smaller Q.
pub const Q_MIN: f64 = 1e-6;

/// Join point (1/Å) between the low-Q power law and the Guinier section.
const GUINIER_LOW_Q_JOIN: f64 = 0.016;

/// Largest relative disagreement tolerated between the two power-law
/// branches at the breakpoint q0.
const BREAKPOINT_MISMATCH_TOL: f64 = 0.02;

/// Immutable description of a scattering model. Serializable, so a model
/// can be read back from a JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelParameters {
    /// Dilute monodisperse spheres: `radius` in Å, scattering-length
    /// densities of the particle and the surrounding solvent.
    Sphere {
        radius: f64,
        sld: f64,
        #[serde(default)]
        sld_solvent: f64,
    },

    /// Piecewise power law: I(Q) = a1·Q^-b1 below the breakpoint `q0`,
    /// a2·Q^-b2 above it. The two branches must agree at `q0`.
    PowerLaw {
        a1: f64,
        b1: f64,
        a2: f64,
        b2: f64,
        q0: f64,
    },

    /// Empirical Guinier-Porod curve: low-Q power law with exponent `p`,
    /// Guinier mid-section (`a`, `s`, radius of gyration `rg`), Porod
    /// tail with exponent `m`. Join points are derived so the curve is
    /// continuous.
    GuinierPorod {
        a: f64,
        s: f64,
        rg: f64,
        m: f64,
        p: f64,
    },

    /// Tabulated I(Q) loaded from a two-column whitespace text file
    /// (Q ascending, intensity non-negative).
    Table { path: PathBuf },

    /// Polydisperse spheres. The file tabulates (radius, weight) rows;
    /// evaluation averages over the weighted radii.
    SphereDistribution {
        path: PathBuf,
        sld: f64,
        #[serde(default)]
        sld_solvent: f64,
    },
}

/// Resolved model state: parameters validated, data files loaded,
/// derived quantities precomputed.
#[derive(Debug, Clone)]
pub(crate) enum ModelForm {
    Sphere {
        radius: f64,
        contrast: f64,
    },
    PowerLaw {
        a1: f64,
        b1: f64,
        a2: f64,
        b2: f64,
        q0: f64,
    },
    GuinierPorod {
        a: f64,
        s: f64,
        rg: f64,
        m: f64,
        p: f64,
        /// Join between the low-Q power law and the Guinier section.
        q1: f64,
        /// Join between the Guinier section and the Porod tail.
        q2: f64,
        /// Prefactor of the low-Q branch, fixed by continuity at q1.
        c_low: f64,
        /// Prefactor of the Porod branch, fixed by continuity at q2.
        c_porod: f64,
    },
    Table {
        q: Vec<f64>,
        i: Vec<f64>,
    },
    SphereDistribution {
        /// (radius, weight) with weights normalized to sum to one.
        entries: Vec<(f64, f64)>,
        contrast: f64,
    },
}

/// A scattering model with fixed parameters. Construction validates the
/// parameters and loads any referenced data file; afterwards the model is
/// immutable and all evaluation is pure.
#[derive(Debug, Clone)]
pub struct SansModel {
    params: ModelParameters,
    form: ModelForm,
}

impl SansModel {
    pub fn new(params: ModelParameters) -> SansResult<Self> {
        let form = resolve(&params)?;
        Ok(Self { params, form })
    }

    /// Monodisperse sphere model.
    pub fn sphere(radius: f64, sld: f64, sld_solvent: f64) -> SansResult<Self> {
        Self::new(ModelParameters::Sphere {
            radius,
            sld,
            sld_solvent,
        })
    }

    /// Model backed by a tabulated I(Q) file.
    pub fn from_table_file(path: impl Into<PathBuf>) -> SansResult<Self> {
        Self::new(ModelParameters::Table { path: path.into() })
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    pub(crate) fn form(&self) -> &ModelForm {
        &self.form
    }

    /// Q values that must appear as grid nodes when the model is
    /// resampled, so that every piecewise join sits on a cell boundary.
    pub(crate) fn grid_knots(&self) -> Vec<f64> {
        match &self.form {
            ModelForm::PowerLaw { q0, .. } => vec![*q0],
            ModelForm::GuinierPorod { q1, q2, .. } => vec![*q1, *q2],
            _ => Vec::new(),
        }
    }

    /// Scattering intensity I(Q) of the model at momentum transfer `q`.
    pub(crate) fn intensity_value(&self, q: f64) -> f64 {
        match &self.form {
            ModelForm::Sphere { radius, contrast } => sphere_intensity(q, *radius, *contrast),
            ModelForm::SphereDistribution { entries, contrast } => entries
                .iter()
                .map(|&(r, w)| w * sphere_intensity(q, r, *contrast))
                .sum(),
            ModelForm::PowerLaw { a1, b1, a2, b2, q0 } => {
                let q = q.max(Q_MIN);
                if q < *q0 {
                    a1 * q.powf(-b1)
                } else {
                    a2 * q.powf(-b2)
                }
            }
            ModelForm::GuinierPorod {
                a,
                s,
                rg,
                m,
                p,
                q1,
                q2,
                c_low,
                c_porod,
            } => {
                let q = q.max(Q_MIN);
                if q < *q1 {
                    c_low * q.powf(-p)
                } else if q < *q2 {
                    a * q.powf(-s) * (-(q * q * rg * rg) / (3.0 - s)).exp()
                } else {
                    c_porod * q.powf(-m)
                }
            }
            ModelForm::Table { q: qs, i } => table_intensity(qs, i, q),
        }
    }
}

/// Sphere form amplitude 3(sin u - u cos u)/u³, with a series expansion
/// near u = 0 where the closed form cancels catastrophically.
fn sphere_form_amplitude(u: f64) -> f64 {
    if u < 1e-4 {
        1.0 - u * u / 10.0
    } else {
        3.0 * (u.sin() - u * u.cos()) / (u * u * u)
    }
}

/// I(Q) of a single sphere: (V·Δρ·A(QR))² with V the sphere volume.
fn sphere_intensity(q: f64, radius: f64, contrast: f64) -> f64 {
    let volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
    let amp = sphere_form_amplitude(q.abs() * radius);
    let scattering = volume * contrast * amp;
    scattering * scattering
}

/// Piecewise log-log interpolation on a tabulated curve. Constant below
/// the first node, zero above the last.
fn table_intensity(qs: &[f64], is: &[f64], x: f64) -> f64 {
    let n = qs.len();
    if x <= qs[0] {
        return is[0];
    }
    if x >= qs[n - 1] {
        return if x > qs[n - 1] { 0.0 } else { is[n - 1] };
    }
    let j = qs.partition_point(|&v| v <= x) - 1;
    let (q1, q2) = (qs[j], qs[j + 1]);
    let (i1, i2) = (is[j], is[j + 1]);
    if i1 > 0.0 && i2 > 0.0 {
        let b = (i1 / i2).ln() / (q2 / q1).ln();
        i1 * (x / q1).powf(-b)
    } else {
        // Linear on q·I(q), matching the resampled-curve fallback.
        let (f1, f2) = (q1 * i1, q2 * i2);
        (f1 + (f2 - f1) * (x - q1) / (q2 - q1)) / x
    }
}

fn resolve(params: &ModelParameters) -> SansResult<ModelForm> {
    match params {
        ModelParameters::Sphere {
            radius,
            sld,
            sld_solvent,
        } => {
            require_positive("radius", *radius)?;
            require_finite_non_negative("sld", *sld)?;
            require_finite_non_negative("sld_solvent", *sld_solvent)?;
            Ok(ModelForm::Sphere {
                radius: *radius,
                contrast: sld - sld_solvent,
            })
        }

        ModelParameters::PowerLaw { a1, b1, a2, b2, q0 } => {
            for (name, v) in [("a1", a1), ("b1", b1), ("a2", a2), ("b2", b2), ("q0", q0)] {
                require_positive(name, *v)?;
            }
            if *b1 >= 2.0 {
                return Err(SansError::Configuration(format!(
                    "b1 must be below 2 so the low-Q branch is integrable, got {b1}"
                )));
            }
            let i_low = a1 * q0.powf(-b1);
            let i_high = a2 * q0.powf(-b2);
            let mismatch = (i_low - i_high).abs() / i_low.max(i_high);
            if !(mismatch <= BREAKPOINT_MISMATCH_TOL) {
                return Err(SansError::Configuration(format!(
                    "power-law branches disagree at q0 = {q0} \
                     ({i_low:.6e} vs {i_high:.6e}, relative {mismatch:.3})"
                )));
            }
            Ok(ModelForm::PowerLaw {
                a1: *a1,
                b1: *b1,
                a2: *a2,
                b2: *b2,
                q0: *q0,
            })
        }

        ModelParameters::GuinierPorod { a, s, rg, m, p } => {
            for (name, v) in [("a", a), ("rg", rg), ("m", m), ("p", p)] {
                require_positive(name, *v)?;
            }
            require_finite_non_negative("s", *s)?;
            if *s >= 3.0 {
                return Err(SansError::Configuration(format!(
                    "s must be below 3, got {s}"
                )));
            }
            if m <= s {
                return Err(SansError::Configuration(format!(
                    "the Porod exponent m ({m}) must exceed s ({s})"
                )));
            }
            let q1 = GUINIER_LOW_Q_JOIN;
            let q2 = ((m - s) * (3.0 - s) / 2.0).sqrt() / rg;
            if q2 <= q1 {
                return Err(SansError::Configuration(format!(
                    "derived Guinier-Porod join q2 = {q2:.4e} does not exceed q1 = {q1:.4e}; \
                     rg is too large for these exponents"
                )));
            }
            let guinier = |q: f64| a * q.powf(-s) * (-(q * q * rg * rg) / (3.0 - s)).exp();
            Ok(ModelForm::GuinierPorod {
                a: *a,
                s: *s,
                rg: *rg,
                m: *m,
                p: *p,
                q1,
                q2,
                c_low: guinier(q1) * q1.powf(*p),
                c_porod: guinier(q2) * q2.powf(*m),
            })
        }

        ModelParameters::Table { path } => {
            let (q, i) = load_two_column_file(path)?;
            validate_table(path, &q, &i)?;
            Ok(ModelForm::Table { q, i })
        }

        ModelParameters::SphereDistribution {
            path,
            sld,
            sld_solvent,
        } => {
            require_finite_non_negative("sld", *sld)?;
            require_finite_non_negative("sld_solvent", *sld_solvent)?;
            let (radii, weights) = load_two_column_file(path)?;
            let mut total = 0.0;
            for (&r, &w) in radii.iter().zip(&weights) {
                if !r.is_finite() || r <= 0.0 {
                    return Err(SansError::Configuration(format!(
                        "{}: radius entries must be finite and positive, got {r}",
                        path.display()
                    )));
                }
                if !w.is_finite() || w < 0.0 {
                    return Err(SansError::Configuration(format!(
                        "{}: weight entries must be finite and non-negative, got {w}",
                        path.display()
                    )));
                }
                total += w;
            }
            if !(total > 0.0) {
                return Err(SansError::Configuration(format!(
                    "{}: the radius distribution has zero total weight",
                    path.display()
                )));
            }
            let entries = radii
                .into_iter()
                .zip(weights)
                .map(|(r, w)| (r, w / total))
                .collect();
            Ok(ModelForm::SphereDistribution {
                entries,
                contrast: sld - sld_solvent,
            })
        }
    }
}

fn require_positive(name: &str, v: f64) -> SansResult<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(SansError::Configuration(format!(
            "{name} must be a finite positive number, got {v}"
        )));
    }
    Ok(())
}

fn require_finite_non_negative(name: &str, v: f64) -> SansResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(SansError::Configuration(format!(
            "{name} must be a finite non-negative number, got {v}"
        )));
    }
    Ok(())
}

/// Reads a whitespace-separated two-column text file. Blank lines and
/// lines starting with '#' are skipped.
fn load_two_column_file(path: &Path) -> SansResult<(Vec<f64>, Vec<f64>)> {
    let text = fs::read_to_string(path).map_err(|source| SansError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(a), Some(b)) = (fields.next(), fields.next()) else {
            return Err(SansError::Configuration(format!(
                "{}: line {}: expected two columns",
                path.display(),
                lineno + 1
            )));
        };
        let parse = |tok: &str| -> SansResult<f64> {
            tok.parse().map_err(|_| {
                SansError::Configuration(format!(
                    "{}: line {}: '{}' is not a number",
                    path.display(),
                    lineno + 1,
                    tok
                ))
            })
        };
        xs.push(parse(a)?);
        ys.push(parse(b)?);
    }
    Ok((xs, ys))
}

fn validate_table(path: &Path, q: &[f64], i: &[f64]) -> SansResult<()> {
    if q.len() < 2 {
        return Err(SansError::Configuration(format!(
            "{}: an I(Q) table needs at least two rows",
            path.display()
        )));
    }
    if !(q[0] > 0.0) {
        return Err(SansError::Configuration(format!(
            "{}: Q values must be positive, first is {}",
            path.display(),
            q[0]
        )));
    }
    if q.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(SansError::Configuration(format!(
            "{}: Q values must be strictly ascending",
            path.display()
        )));
    }
    if i.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(SansError::Configuration(format!(
            "{}: intensities must be finite and non-negative",
            path.display()
        )));
    }
    if i.iter().all(|&v| v == 0.0) {
        return Err(SansError::Configuration(format!(
            "{}: the intensity table is identically zero",
            path.display()
        )));
    }
    Ok(())
}
