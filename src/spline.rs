//! Natural cubic spline through tabulated samples.
//!
//! Used by [`crate::dispersion::DispersionLaw::Table`] to interpolate the
//! real and imaginary parts of a tabulated refractive index.

use crate::error::{BerremanError, Result};


/// Piecewise cubic interpolant with continuous first and second derivatives
/// and zero curvature at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    y2s: Vec<f64>, // second derivatives at the knots
}

impl CubicSpline {
    /// Builds the spline. `xs` must be strictly increasing, with at least two
    /// samples and as many `ys` as `xs`.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(BerremanError::InvalidTable(format!(
                "{} abscissae for {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(BerremanError::InvalidTable(
                "at least two samples are required".to_string(),
            ));
        }
        if let Some(i) = (1..xs.len()).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(BerremanError::InvalidTable(format!(
                "abscissae must be strictly increasing (index {})",
                i
            )));
        }

        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n];

        // tridiagonal sweep
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2s[i - 1] + 2.0;
            y2s[i] = (sig - 1.0) / p;
            let slope = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }

        for k in (0..n - 1).rev() {
            y2s[k] = y2s[k] * y2s[k + 1] + u[k];
        }

        Ok(Self { xs, ys, y2s })
    }

    /// Value at `x`. Outside the table the value at the nearest end is held.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (first, last) = self.range();
        let x = x.clamp(first, last);
        let n = self.xs.len();
        let hi = self.xs.partition_point(|&xi| xi <= x).clamp(1, n - 1);
        let lo = hi - 1;

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }

    /// Range of the tabulated abscissae.
    pub fn range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}
