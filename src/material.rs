//! Materials: wavelength to permittivity tensor.
//!
//! Isotropic materials additionally expose a scalar refractive index, so they
//! are a type of their own ([`IsotropicMaterial`]). Everything that only
//! needs a tensor takes a [`Material`], which wraps either kind.
//!
//! Tensors are in Gaussian units (`ε = n²` for an isotropic medium).
//! Physical realizability (`Re(ε)` positive energy) is the caller's
//! responsibility.

use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;

use crate::dispersion::DispersionLaw;
use crate::error::{BerremanError, Result};
use crate::Tensor;


/// Material with a scalar refractive index.
#[derive(Debug, Clone, PartialEq)]
pub enum IsotropicMaterial {
    /// `Im(n) > 0` absorbing, `Im(n) < 0` amplifying.
    NonDispersive { n: Complex64 },
    Dispersive { law: DispersionLaw },
}

impl IsotropicMaterial {
    pub fn new(n: Complex64) -> Self {
        Self::NonDispersive { n }
    }

    pub fn real(n: f64) -> Self {
        Self::new(Complex64::new(n, 0.0))
    }

    pub fn dispersive(law: DispersionLaw) -> Self {
        Self::Dispersive { law }
    }

    pub fn refractive_index(&self, lambda: f64) -> Complex64 {
        match self {
            Self::NonDispersive { n } => *n,
            Self::Dispersive { law } => law.refractive_index(lambda),
        }
    }

    pub fn tensor(&self, lambda: f64) -> Tensor {
        let n = self.refractive_index(lambda);
        Tensor::identity() * (n * n)
    }
}

/// Any material, described by its permittivity tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Isotropic(IsotropicMaterial),
    /// Constant tensor; `ε` need not be symmetric.
    NonDispersive { epsilon: Tensor },
    /// Diagonal tensor from one dispersion law per principal axis, expressed
    /// in the lab frame as `R · diag(ε₁, ε₂, ε₃) · Rᵀ`.
    Principal {
        laws: Box<[DispersionLaw; 3]>,
        rotation: Matrix3<f64>,
    },
}

impl From<IsotropicMaterial> for Material {
    fn from(material: IsotropicMaterial) -> Self {
        Self::Isotropic(material)
    }
}

impl Default for Material {
    /// Vacuum.
    fn default() -> Self {
        Self::NonDispersive {
            epsilon: Tensor::identity(),
        }
    }
}

impl Material {
    pub fn from_tensor(epsilon: Tensor) -> Self {
        Self::NonDispersive { epsilon }
    }

    /// Uniaxial material with the extraordinary axis along z.
    pub fn uniaxial(no: f64, ne: f64) -> Self {
        Self::biaxial(no, no, ne)
    }

    /// Biaxial material with principal refractive indices along x, y, z.
    pub fn biaxial(nx: f64, ny: f64, nz: f64) -> Self {
        let diag = Vector3::new(nx * nx, ny * ny, nz * nz).map(|e| Complex64::new(e, 0.0));
        Self::from_tensor(Tensor::from_diagonal(&diag))
    }

    /// Dispersive material with principal axes along x, y, z.
    pub fn principal(laws: [DispersionLaw; 3]) -> Self {
        Self::Principal {
            laws: Box::new(laws),
            rotation: Matrix3::identity(),
        }
    }

    /// Permittivity tensor at wavelength `lambda` (m).
    pub fn tensor(&self, lambda: f64) -> Tensor {
        match self {
            Self::Isotropic(material) => material.tensor(lambda),
            Self::NonDispersive { epsilon } => *epsilon,
            Self::Principal { laws, rotation } => {
                let diag = Vector3::from_iterator(laws.iter().map(|law| law.dielectric(lambda)));
                rotate_tensor(&Tensor::from_diagonal(&diag), rotation)
            }
        }
    }

    /// Refractive index, only defined for isotropic materials.
    pub fn refractive_index(&self, lambda: f64) -> Result<Complex64> {
        match self {
            Self::Isotropic(material) => Ok(material.refractive_index(lambda)),
            _ => Err(BerremanError::NotIsotropic),
        }
    }

    pub fn is_isotropic(&self) -> bool {
        matches!(self, Self::Isotropic(_))
    }

    /// Material rotated by `r`: `ε' = R · ε · Rᵀ`.
    ///
    /// Isotropic materials are invariant, a constant tensor is rotated
    /// directly and a principal-axes material accumulates the rotation.
    pub fn rotated(&self, r: &Matrix3<f64>) -> Self {
        match self {
            Self::Isotropic(_) => self.clone(),
            Self::NonDispersive { epsilon } => Self::from_tensor(rotate_tensor(epsilon, r)),
            Self::Principal { laws, rotation } => Self::Principal {
                laws: laws.clone(),
                rotation: r * rotation,
            },
        }
    }
}

/// `R · ε · Rᵀ` for a real rotation `R`.
pub fn rotate_tensor(epsilon: &Tensor, r: &Matrix3<f64>) -> Tensor {
    let rc = r.map(|x| Complex64::new(x, 0.0));
    rc * epsilon * rc.transpose()
}
