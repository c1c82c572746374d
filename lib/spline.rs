//! Natural cubic spline through complex-valued samples.
//!
//! Used to resample a field slice at the half-step times the propagator needs,
//! and to back the `intp` time function.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ MbResult, config_err };

/// Relative tolerance (in units of the knot span) within which points just
/// outside the knot range are clamped onto it instead of being treated as
/// out of range.
const EDGE_TOL: f64 = 1e-9;

/// Natural cubic spline with real knots and complex values.
///
/// Evaluates to zero outside the knot range.
#[derive(Clone, Debug, PartialEq)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<C64>,
    // second derivatives at each knot
    y2s: Vec<C64>,
}

impl CubicSpline {
    /// Construct a natural cubic spline.
    ///
    /// `xs` must be strictly increasing and as long as `ys`.
    pub fn new(xs: Vec<f64>, ys: Vec<C64>) -> MbResult<Self> {
        if xs.len() != ys.len() {
            return Err(config_err(format!(
                "spline knots and values differ in length ({} vs {})",
                xs.len(), ys.len())));
        }
        if xs.is_empty() {
            return Err(config_err("spline requires at least one knot"));
        }
        if let Some(k) = (1..xs.len()).find(|&k| xs[k] <= xs[k - 1]) {
            return Err(config_err(format!(
                "spline knots must be strictly increasing (index {})", k)));
        }

        let n = xs.len();
        let mut y2s: Vec<C64> = vec![C64::new(0.0, 0.0); n];
        if n < 3 { return Ok(Self { xs, ys, y2s }); }

        // tridiagonal sweep; coefficients are real, right-hand sides complex
        let mut diag: Vec<f64> = vec![0.0; n];
        let mut u: Vec<C64> = vec![C64::new(0.0, 0.0); n];
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * diag[i - 1] + 2.0;
            diag[i] = (sig - 1.0) / p;
            let d
                = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (d * 6.0 / (xs[i + 1] - xs[i - 1]) - u[i - 1] * sig) / p;
        }
        for k in (0..n - 2).rev() {
            y2s[k + 1] = y2s[k + 2] * diag[k + 1] + u[k + 1];
        }
        Ok(Self { xs, ys, y2s })
    }

    /// Spline through the samples `ys` taken at `xs`.
    pub fn from_arrays(xs: &nd::Array1<f64>, ys: &nd::Array1<C64>)
        -> MbResult<Self>
    {
        Self::new(xs.to_vec(), ys.to_vec())
    }

    pub fn knots(&self) -> &[f64] { &self.xs }

    pub fn values(&self) -> &[C64] { &self.ys }

    /// Evaluate the spline at `x`; zero outside the knot range.
    pub fn evaluate(&self, x: f64) -> C64 {
        let n = self.xs.len();
        let x0 = self.xs[0];
        let x1 = self.xs[n - 1];
        let tol = EDGE_TOL * (x1 - x0).abs().max(1.0);
        if x < x0 - tol || x > x1 + tol { return C64::new(0.0, 0.0); }
        if n == 1 { return self.ys[0]; }
        let x = x.clamp(x0, x1);

        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x { hi = mid; } else { lo = mid; }
        }

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        self.ys[lo] * a
            + self.ys[hi] * b
            + (self.y2s[lo] * (a * a * a - a) + self.y2s[hi] * (b * b * b - b))
                * (h * h / 6.0)
    }
}
