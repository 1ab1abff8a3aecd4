use std::f64::consts::PI;

/// Product of photon energy and wavelength, in eV·m (`λ = 1240e-9 / E`).
pub const EV_WAVELENGTH: f64 = 1240e-9;
/// Default vacuum wavenumber, for a wavelength of 1 µm.
pub const DEFAULT_K0: f64 = 2.0 * PI / 1e-6;
/// Convergence tolerance of the complex Schur decomposition.
pub const SCHUR_TOLERANCE: f64 = 1e-14;
/// Iteration cap of the complex Schur decomposition. Zero is never used.
pub const SCHUR_MAX_ITERATIONS: usize = 1000;
/// Relative distance under which two eigenvalues are treated as one mode pair.
pub const DEGENERACY_TOLERANCE: f64 = 1e-8;

/// Wavelength in vacuum for a vacuum wavenumber.
pub fn wavelength(k0: f64) -> f64 {
    2.0 * PI / k0
}
