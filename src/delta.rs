//! Delta matrix and homogeneous-slab propagators.
//!
//! The tangential fields `Ψ = (Ex, Ey, Hx, Hy)` obey `dΨ/dz = i k0 Δ Ψ`,
//! where the Delta matrix `Δ` depends only on the reduced wavenumber
//! `Kx = kx / k0` and the local permittivity tensor. Across a homogeneous
//! slab of thickness `h` the exact propagator is `P = exp(i h k0 Δ)`.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::Deserialize;

use crate::error::BerremanError;
use crate::{Matrix4c, Tensor};


/// Builds the Delta matrix for reduced wavenumber `kx` and permittivity `eps`.
///
/// `eps` need not be symmetric. `eps[(2, 2)]` must be non-zero.
pub fn build_delta(kx: Complex64, eps: &Tensor) -> Matrix4c {
    let e22 = eps[(2, 2)];
    debug_assert!(e22 != Complex64::new(0.0, 0.0), "eps_zz must be non-zero");
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);

    Matrix4c::new(
        -kx * eps[(2, 0)] / e22,
        -kx * eps[(2, 1)] / e22,
        zero,
        one - kx * kx / e22,
        //
        zero,
        zero,
        -one,
        zero,
        //
        eps[(1, 2)] * eps[(2, 0)] / e22 - eps[(1, 0)],
        kx * kx - eps[(1, 1)] + eps[(1, 2)] * eps[(2, 1)] / e22,
        zero,
        kx * eps[(1, 2)] / e22,
        //
        eps[(0, 0)] - eps[(0, 2)] * eps[(2, 0)] / e22,
        eps[(0, 1)] - eps[(0, 2)] * eps[(2, 1)] / e22,
        zero,
        -kx * eps[(0, 2)] / e22,
    )
}

/// How the propagator `exp(i h k0 Δ)` of a homogeneous slab is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum PropagatorMethod {
    /// `I + i h k0 Δ`, valid for `|h k0 Δ| ≪ 1`.
    Linear,
    /// Padé matrix exponential. `P(h)·P(-h) = I`.
    #[default]
    Pade,
}

impl PropagatorMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Pade => "Padé",
        }
    }
}

impl fmt::Display for PropagatorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropagatorMethod {
    type Err = BerremanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "padé" | "pade" | "exact" => Ok(Self::Pade),
            _ => Err(BerremanError::UnsupportedPropagator(s.to_string())),
        }
    }
}

impl TryFrom<String> for PropagatorMethod {
    type Error = BerremanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Propagator across a homogeneous slab of thickness `h` (negative `h`
/// propagates backwards).
pub fn propagator(delta: &Matrix4c, h: f64, k0: f64, method: PropagatorMethod) -> Matrix4c {
    let generator = delta * Complex64::new(0.0, h * k0);
    match method {
        PropagatorMethod::Linear => Matrix4c::identity() + generator,
        PropagatorMethod::Pade => generator.exp(),
    }
}
