//! Semi-infinite homogeneous media bounding a structure.
//!
//! A half-space provides the transition matrix `L` mapping the amplitudes of
//! its four eigenmodes `(s+, s-, p+, p-)` to the tangential fields
//! `(Ex, Ey, Hx, Hy)`. `+` modes travel (or decay) towards increasing z.
//!
//! Isotropic half-spaces have a closed-form `L` and `L⁻¹` and relate the
//! incidence angle `Φ` to the reduced wavenumber `Kx = n sinΦ`. Anisotropic
//! half-spaces diagonalize the Delta matrix numerically.

use log::{trace, warn};
use nalgebra::{Schur, Vector4, SVD};
use num_complex::Complex64;

use crate::config;
use crate::delta::build_delta;
use crate::error::{BerremanError, Result};
use crate::material::{IsotropicMaterial, Material};
use crate::{Matrix4c, Tensor};

type Vector4c = Vector4<Complex64>;


/// Tolerances of the numerical eigenmode decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EigenSettings {
    pub schur_tolerance: f64,
    pub schur_max_iterations: usize,
    /// Relative distance under which eigenvalues are treated as equal.
    pub degeneracy_tolerance: f64,
}

impl Default for EigenSettings {
    fn default() -> Self {
        Self {
            schur_tolerance: config::SCHUR_TOLERANCE,
            schur_max_iterations: config::SCHUR_MAX_ITERATIONS,
            degeneracy_tolerance: config::DEGENERACY_TOLERANCE,
        }
    }
}

/// Isotropic half-space with closed-form transition matrices.
///
/// Can be used as front (`Φ = Φi`) or back (`Φ = Φt`) half-space. `Φ` is the
/// angle of the wave travelling towards increasing z, measured from the z
/// axis and oriented by y.
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicHalfSpace {
    material: IsotropicMaterial,
}

impl IsotropicHalfSpace {
    pub fn new(material: IsotropicMaterial) -> Self {
        Self { material }
    }

    pub fn set_material(&mut self, material: IsotropicMaterial) {
        self.material = material;
    }

    pub fn material(&self) -> &IsotropicMaterial {
        &self.material
    }

    pub fn refractive_index(&self, k0: f64) -> Complex64 {
        self.material.refractive_index(config::wavelength(k0))
    }

    /// `Kx = n sinΦ`. Complex if the medium is absorbing.
    pub fn kx_from_phi(&self, phi: f64, k0: f64) -> Complex64 {
        self.refractive_index(k0) * phi.sin()
    }

    /// `Kz = √(n² - Kx²)`, principal branch (`Im(Kz) ≥ 0` beyond the
    /// critical angle).
    pub fn kz_from_kx(&self, kx: Complex64, k0: f64) -> Complex64 {
        let n = self.refractive_index(k0);
        (n * n - kx * kx).sqrt()
    }

    /// `Φ = arcsin(Kx / n)`, complex past the critical angle.
    pub fn phi_from_kx(&self, kx: Complex64, k0: f64) -> Complex64 {
        (kx / self.refractive_index(k0)).asin()
    }

    fn cos_phi(&self, kx: Complex64, k0: f64) -> (Complex64, Complex64) {
        let n = self.refractive_index(k0);
        let sin_phi = kx / n;
        let one = Complex64::new(1.0, 0.0);
        (n, (one - sin_phi * sin_phi).sqrt())
    }

    /// Transition matrix `L`.
    pub fn transition_matrix(&self, kx: Complex64, k0: f64) -> Matrix4c {
        let (n, c) = self.cos_phi(kx, k0);
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        Matrix4c::new(
            zero, zero, c, c, //
            one, one, zero, zero, //
            -n * c, n * c, zero, zero, //
            zero, zero, n, -n,
        )
    }

    /// Inverse transition matrix `L⁻¹`.
    pub fn inverse_transition_matrix(&self, kx: Complex64, k0: f64) -> Matrix4c {
        let (n, c) = self.cos_phi(kx, k0);
        let zero = Complex64::new(0.0, 0.0);
        let half = Complex64::new(0.5, 0.0);
        let nc = (n * c).inv();
        Matrix4c::new(
            zero, half, -half * nc, zero, //
            zero, half, half * nc, zero, //
            half / c, zero, zero, half / n, //
            half / c, zero, zero, -half / n,
        )
    }
}

/// Half-space of arbitrary permittivity; eigenmodes found numerically.
#[derive(Debug, Clone, PartialEq)]
pub struct AnisotropicHalfSpace {
    material: Material,
    eigen: EigenSettings,
}

impl AnisotropicHalfSpace {
    pub fn new(material: Material) -> Self {
        Self::with_settings(material, EigenSettings::default())
    }

    pub fn with_settings(material: Material, eigen: EigenSettings) -> Self {
        Self { material, eigen }
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Transition matrix `L`, columns `(s+, s-, p+, p-)`.
    ///
    /// Modes are sorted by decreasing `Re(q)` (decreasing `Im(q)` when the
    /// real parts vanish), then by decreasing `|Ey|` within a direction.
    /// Each `s` column has `Ey ∈ ℝ⁺`, each `p` column `Ex ∈ ℝ⁺`, and the
    /// matrix is scaled so that `Ey(s+) + Ey(s-) = 2`, which reproduces
    /// [`IsotropicHalfSpace`] for the `s` modes.
    pub fn transition_matrix(&self, kx: Complex64, k0: f64) -> Result<Matrix4c> {
        let epsilon = self.material.tensor(config::wavelength(k0));
        let delta = build_delta(kx, &epsilon);
        eigenmodes(&delta, &self.eigen)
    }
}

/// Half-space bounding the back of a structure.
#[derive(Debug, Clone, PartialEq)]
pub enum HalfSpace {
    Isotropic(IsotropicHalfSpace),
    Anisotropic(AnisotropicHalfSpace),
}

impl From<IsotropicHalfSpace> for HalfSpace {
    fn from(half_space: IsotropicHalfSpace) -> Self {
        Self::Isotropic(half_space)
    }
}

impl From<AnisotropicHalfSpace> for HalfSpace {
    fn from(half_space: AnisotropicHalfSpace) -> Self {
        Self::Anisotropic(half_space)
    }
}

impl HalfSpace {
    pub fn transition_matrix(&self, kx: Complex64, k0: f64) -> Result<Matrix4c> {
        match self {
            Self::Isotropic(hs) => Ok(hs.transition_matrix(kx, k0)),
            Self::Anisotropic(hs) => hs.transition_matrix(kx, k0),
        }
    }

    pub fn tensor(&self, lambda: f64) -> Tensor {
        match self {
            Self::Isotropic(hs) => hs.material.tensor(lambda),
            Self::Anisotropic(hs) => hs.material.tensor(lambda),
        }
    }

    pub fn as_isotropic(&self) -> Option<&IsotropicHalfSpace> {
        match self {
            Self::Isotropic(hs) => Some(hs),
            Self::Anisotropic(_) => None,
        }
    }
}

/// Sorted and normalized eigenvectors of `delta` as columns `(s+, s-, p+, p-)`.
fn eigenmodes(delta: &Matrix4c, eigen: &EigenSettings) -> Result<Matrix4c> {
    let schur = Schur::try_new(*delta, eigen.schur_tolerance, eigen.schur_max_iterations)
        .ok_or_else(|| {
            BerremanError::EigenDecomposition("Schur iteration did not converge".to_string())
        })?;
    let (_, t) = schur.unpack();
    let q = triangular_eigenvalues(&t);
    let scale = q.iter().map(|q| q.norm()).fold(1.0, f64::max);
    let tol = eigen.degeneracy_tolerance * scale;

    // propagation direction first; evanescent pairs by decay
    let direction = |i: usize| if q[i].re.abs() <= tol { 0.0 } else { q[i].re };
    let mut order = [0, 1, 2, 3];
    order.sort_by(|&a, &b| {
        direction(b)
            .total_cmp(&direction(a))
            .then(q[b].im.total_cmp(&q[a].im))
    });
    trace!("eigenvalues {:?} sorted as {:?}", q, order);

    let (s_fwd, p_fwd) = mode_pair(delta, q[order[0]], q[order[1]], tol, eigen)?;
    let (s_bwd, p_bwd) = mode_pair(delta, q[order[2]], q[order[3]], tol, eigen)?;
    Ok(normalize_modes(Matrix4c::from_columns(&[
        s_fwd, s_bwd, p_fwd, p_bwd,
    ])))
}

/// Fixes the phase and global scale of sorted mode columns `(s+, s-, p+, p-)`.
fn normalize_modes(mut psi: Matrix4c) -> Matrix4c {
    // Ey real positive for s, Ex real positive for p
    for col in 0..4 {
        let component = if col < 2 { psi[(1, col)] } else { psi[(0, col)] };
        let magnitude = component.norm();
        if magnitude != 0.0 {
            let mut column = psi.column_mut(col);
            column *= component.conj() / magnitude;
        }
    }

    let sum = psi[(1, 0)] + psi[(1, 1)];
    if sum.norm() == 0.0 {
        warn!("Ey(s+) + Ey(s-) vanishes; transition matrix left unscaled");
    } else {
        psi *= Complex64::new(2.0, 0.0) / sum;
    }
    psi
}

/// Eigenvalues read off a Schur form, solving any 2x2 diagonal block left
/// by the iteration.
fn triangular_eigenvalues(t: &Matrix4c) -> [Complex64; 4] {
    let mut q = [Complex64::new(0.0, 0.0); 4];
    let mut m = 0;
    while m < 4 {
        if m + 1 < 4 && t[(m + 1, m)] != Complex64::new(0.0, 0.0) {
            let (a, b, c, d) = (t[(m, m)], t[(m, m + 1)], t[(m + 1, m)], t[(m + 1, m + 1)]);
            let mean = (a + d) * 0.5;
            let root = ((a - d) * (a - d) * 0.25 + b * c).sqrt();
            q[m] = mean + root;
            q[m + 1] = mean - root;
            m += 2;
        } else {
            q[m] = t[(m, m)];
            m += 1;
        }
    }
    q
}

/// Eigenvectors `(s, p)` of the two modes travelling in one direction.
///
/// A degenerate pair spans a plane of eigenvectors, in which the `s` mode is
/// taken with `Ex = 0` and the `p` mode with `Ey = 0`.
fn mode_pair(
    delta: &Matrix4c,
    qa: Complex64,
    qb: Complex64,
    tol: f64,
    eigen: &EigenSettings,
) -> Result<(Vector4c, Vector4c)> {
    if (qa - qb).norm() <= tol {
        let plane = null_vectors(delta, (qa + qb) * 0.5, 2)?;
        let (a, b) = (&plane[0], &plane[1]);
        let s = a * b[0] - b * a[0];
        let p = a * b[1] - b * a[1];
        if s.norm() > eigen.degeneracy_tolerance && p.norm() > eigen.degeneracy_tolerance {
            return Ok((s.normalize(), p.normalize()));
        }
        return Ok(by_ey(*a, *b));
    }
    let a = null_vectors(delta, qa, 1)?.remove(0);
    let b = null_vectors(delta, qb, 1)?.remove(0);
    Ok(by_ey(a, b))
}

/// Orders two modes by decreasing `|Ey|`.
fn by_ey(a: Vector4c, b: Vector4c) -> (Vector4c, Vector4c) {
    if b[1].norm() > a[1].norm() {
        (b, a)
    } else {
        (a, b)
    }
}

/// The `count` right singular vectors of `delta - qI` with the smallest
/// singular values.
fn null_vectors(delta: &Matrix4c, q: Complex64, count: usize) -> Result<Vec<Vector4c>> {
    let shifted = delta - Matrix4c::identity() * q;
    let svd = SVD::new(shifted, false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        BerremanError::EigenDecomposition("singular vectors were not computed".to_string())
    })?;
    let mut order = [0, 1, 2, 3];
    order.sort_by(|&a, &b| svd.singular_values[a].total_cmp(&svd.singular_values[b]));
    Ok(order[..count]
        .iter()
        .map(|&i| v_t.row(i).adjoint())
        .collect())
}
