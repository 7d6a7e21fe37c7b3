use crate::core::error::{SansError, SansResult};

/// Number of points in a resampled Q grid.
pub const GRID_POINTS: usize = 100_000;

/// Exponents this close to the integrable limit 2 switch to the
/// logarithmic antiderivative.
const LOG_BRANCH_EPS: f64 = 1e-12;

/// Geometrically spaced grid from `lo` to `hi`, both included exactly.
pub fn geomspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    debug_assert!(lo > 0.0 && hi > lo && n >= 2);
    let log_lo = lo.ln();
    let step = (hi.ln() - log_lo) / (n - 1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|j| (log_lo + step * j as f64).exp()).collect();
    grid[0] = lo;
    grid[n - 1] = hi;
    grid
}

/// Interpolation rule across one grid cell [q_j, q_j+1].
#[derive(Debug, Clone, Copy)]
enum Segment {
    /// I(q) = i_j · (q/q_j)^-exponent. Exact when the underlying curve is
    /// a power law across the cell.
    PowerLaw { exponent: f64 },
    /// q·I(q) varies linearly across the cell. Fallback wherever a
    /// power law cannot be fitted (zero or wildly scaled endpoints).
    Linear { slope: f64 },
}

/// Cumulative-integral table of ∫ q·I(q) dq over an ascending Q grid.
///
/// Each cell carries an analytically integrable and invertible segment, so
/// the table serves both as the cross-section integral and as the CDF for
/// inverse-transform sampling of the momentum transfer. Below the first
/// grid point the first cell's power law is extrapolated down to Q = 0
/// (flat when its exponent is not integrable there).
#[derive(Debug, Clone)]
pub struct IqCurve {
    q: Vec<f64>,
    i: Vec<f64>,
    /// cum[j] = ∫_0^q[j] x·I(x) dx.
    cum: Vec<f64>,
    /// seg[j] spans [q[j], q[j+1]].
    seg: Vec<Segment>,
    /// 2 - exponent of the sub-grid extrapolation; always positive.
    head_e: f64,
}

impl IqCurve {
    /// Builds the table from explicit (Q, I) nodes, e.g. a measured curve.
    pub fn from_points(q: Vec<f64>, i: Vec<f64>) -> SansResult<Self> {
        if q.len() != i.len() {
            return Err(SansError::Configuration(format!(
                "Q and I arrays differ in length ({} vs {})",
                q.len(),
                i.len()
            )));
        }
        if q.len() < 2 {
            return Err(SansError::Configuration(
                "an I(Q) curve needs at least two nodes".into(),
            ));
        }
        if !(q[0] > 0.0) || q.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SansError::Configuration(
                "Q nodes must be positive and strictly ascending".into(),
            ));
        }
        if i.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SansError::Configuration(
                "intensity nodes must be finite and non-negative".into(),
            ));
        }
        Ok(Self::build(q, i))
    }

    /// Resamples `f` on a geometric grid over [q_lo, q_hi]. In-range
    /// `knots` are inserted as grid nodes so piecewise joins of `f` sit
    /// exactly on cell boundaries.
    pub fn from_function<F: Fn(f64) -> f64>(
        f: F,
        q_lo: f64,
        q_hi: f64,
        n: usize,
        knots: &[f64],
    ) -> Self {
        let mut q = geomspace(q_lo, q_hi, n);
        for &knot in knots {
            if knot > q_lo && knot < q_hi {
                q.push(knot);
            }
        }
        q.sort_by(|a, b| a.partial_cmp(b).expect("grid nodes are finite"));
        q.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON * *b);
        let i: Vec<f64> = q.iter().map(|&x| f(x).max(0.0)).collect();
        Self::build(q, i)
    }

    fn build(q: Vec<f64>, i: Vec<f64>) -> Self {
        let n = q.len();
        let mut seg = Vec::with_capacity(n - 1);
        for j in 0..n - 1 {
            seg.push(fit_segment(q[j], q[j + 1], i[j], i[j + 1]));
        }

        // Sub-grid tail: continue the first cell's power law to Q = 0 when
        // that mass is finite, otherwise treat I as flat below the grid.
        let head_e = match seg[0] {
            Segment::PowerLaw { exponent } if exponent < 2.0 - 1e-9 => 2.0 - exponent,
            _ => 2.0,
        };
        let head_mass = i[0] * q[0] * q[0] / head_e;

        let mut cum = Vec::with_capacity(n);
        cum.push(head_mass);
        let mut acc = head_mass;
        for j in 0..n - 1 {
            acc += segment_mass(seg[j], q[j], q[j + 1], i[j]);
            cum.push(acc);
        }

        Self {
            q,
            i,
            cum,
            seg,
            head_e,
        }
    }

    /// Domain covered by the grid.
    pub fn q_domain(&self) -> (f64, f64) {
        (self.q[0], *self.q.last().expect("grid is non-empty"))
    }

    /// Total mass ∫_0^qlim q·I(q) dq. Monotonic and continuous in `qlim`,
    /// including across grid nodes and piecewise joins.
    pub fn integral_to(&self, qlim: f64) -> f64 {
        if !(qlim > 0.0) {
            return 0.0;
        }
        if qlim <= self.q[0] {
            return self.cum[0] * (qlim / self.q[0]).powf(self.head_e);
        }
        let n = self.q.len();
        if qlim >= self.q[n - 1] {
            return self.cum[n - 1];
        }
        let j = self.q.partition_point(|&x| x <= qlim) - 1;
        self.cum[j] + partial_mass(self.seg[j], self.q[j], qlim, self.i[j])
    }

    /// Draws a momentum transfer in (0, qlim] by inverting the cumulative
    /// integral at `u`·total, for uniform `u` in [0, 1).
    pub fn sample_q(&self, u: f64, qlim: f64) -> f64 {
        let total = self.integral_to(qlim);
        if !(total > 0.0) {
            // Degenerate curve (no scattering weight below qlim): fall
            // back to the flat-intensity distribution.
            return qlim * u.sqrt();
        }
        let target = u * total;

        // Sub-grid branch.
        if target <= self.cum[0] || qlim <= self.q[0] {
            if !(self.cum[0] > 0.0) {
                return self.q[0].min(qlim);
            }
            let q = self.q[0] * (target / self.cum[0]).powf(1.0 / self.head_e);
            return q.min(qlim);
        }

        let idx = self.cum.partition_point(|&c| c < target);
        let j = idx.clamp(1, self.cum.len() - 1) - 1;
        let t = target - self.cum[j];
        let q = invert_in_cell(self.seg[j], self.q[j], self.q[j + 1], self.i[j], t);
        q.min(qlim)
    }
}

/// Fits a power law through the cell endpoints, falling back to a linear
/// profile of q·I(q) when the endpoints do not support one.
fn fit_segment(q1: f64, q2: f64, i1: f64, i2: f64) -> Segment {
    if i1 > 0.0 && i2 > 0.0 {
        let exponent = (i1 / i2).ln() / (q2 / q1).ln();
        if exponent.is_finite() {
            let seg = Segment::PowerLaw { exponent };
            if segment_mass(seg, q1, q2, i1).is_finite() {
                return seg;
            }
        }
    }
    let f1 = q1 * i1;
    let f2 = q2 * i2;
    Segment::Linear {
        slope: (f2 - f1) / (q2 - q1),
    }
}

/// ∫ q·I(q) dq across the whole cell.
fn segment_mass(seg: Segment, q1: f64, q2: f64, i1: f64) -> f64 {
    partial_mass(seg, q1, q2, i1)
}

/// ∫ q·I(q) dq from the cell's lower edge up to `q` inside the cell.
fn partial_mass(seg: Segment, q1: f64, q: f64, i1: f64) -> f64 {
    match seg {
        Segment::PowerLaw { exponent } => {
            let e = 2.0 - exponent;
            let base = i1 * q1 * q1;
            if e.abs() < LOG_BRANCH_EPS {
                base * (q / q1).ln()
            } else {
                base * ((q / q1).powf(e) - 1.0) / e
            }
        }
        Segment::Linear { slope } => {
            let d = q - q1;
            q1 * i1 * d + 0.5 * slope * d * d
        }
    }
}

/// Solves partial_mass(seg, q1, q, i1) = t for q within [q1, q2].
fn invert_in_cell(seg: Segment, q1: f64, q2: f64, i1: f64, t: f64) -> f64 {
    let q = match seg {
        Segment::PowerLaw { exponent } => {
            let e = 2.0 - exponent;
            let base = i1 * q1 * q1;
            if e.abs() < LOG_BRANCH_EPS {
                q1 * (t / base).exp()
            } else {
                let ratio = (1.0 + t * e / base).max(f64::MIN_POSITIVE);
                q1 * ratio.powf(1.0 / e)
            }
        }
        Segment::Linear { slope } => {
            let f1 = q1 * i1;
            if slope.abs() < 1e-300 {
                if f1 > 0.0 {
                    q1 + t / f1
                } else {
                    q1
                }
            } else {
                let disc = (f1 * f1 + 2.0 * slope * t).max(0.0);
                q1 + (disc.sqrt() - f1) / slope
            }
        }
    };
    q.clamp(q1, q2)
}
