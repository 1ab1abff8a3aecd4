//! Optics of stratified anisotropic media with Berreman's 4x4 matrix method.
//!
//! A [`structure::Structure`] is an isotropic front half-space, an ordered
//! stack of [`layer::Layer`]s and a back half-space. Evaluating it for a
//! reduced transverse wavenumber `Kx` and a vacuum wavenumber `k0` yields the
//! reflection and transmission Jones matrices, which a
//! [`results::ResultSet`] turns into power coefficients, circular basis
//! coefficients and ellipsometric angles.
//!
//! Construction runs bottom-up (materials, layers, structure) and evaluation
//! runs top-down (per-layer propagators, transfer matrix, Jones matrices).

pub mod config;
pub mod delta;
pub mod dispersion;
pub mod error;
pub mod evaluation;
pub mod halfspace;
pub mod inhomogeneous;
pub mod layer;
pub mod material;
pub mod results;
pub mod rotation;
pub mod settings;
pub mod spline;
pub mod structure;

pub use error::{BerremanError, Result};

/// Complex 3x3 permittivity tensor.
pub type Tensor = nalgebra::Matrix3<num_complex::Complex64>;

/// Complex 4x4 matrix acting on the tangential fields `(Ex, Ey, Hx, Hy)`.
pub type Matrix4c = nalgebra::Matrix4<num_complex::Complex64>;

/// Complex 2x2 Jones matrix in the `(p, s)` or `(L, R)` basis.
pub type Jones = nalgebra::Matrix2<num_complex::Complex64>;
