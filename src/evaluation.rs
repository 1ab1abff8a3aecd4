//! Record of one structure evaluation.

use std::sync::Arc;

use num_complex::Complex64;

use crate::error::Result;
use crate::structure::Structure;
use crate::Jones;

/// Jones matrices of a structure for one `(Kx, k0)` pair.
///
/// The structure is held as a shared snapshot: mutating it through
/// [`Arc::make_mut`] afterwards clones it, so a recorded evaluation always
/// describes the structure it was computed from.
#[derive(Debug, Clone)]
pub struct Evaluation {
    structure: Arc<Structure>,
    kx: Complex64,
    k0: f64,
    reflection: Jones,
    transmission: Jones,
    power_correction: Option<f64>,
}

impl Evaluation {
    pub fn new(structure: Arc<Structure>, kx: Complex64, k0: f64) -> Result<Self> {
        let (reflection, transmission) = structure.jones(kx, k0)?;
        let power_correction = structure.power_transmission_correction(kx, k0);
        Ok(Self {
            structure,
            kx,
            k0,
            reflection,
            transmission,
            power_correction,
        })
    }

    pub fn structure(&self) -> &Arc<Structure> {
        &self.structure
    }

    /// Reduced wavenumber along x.
    pub fn kx(&self) -> Complex64 {
        self.kx
    }

    /// Vacuum wavenumber.
    pub fn k0(&self) -> f64 {
        self.k0
    }

    /// `[[r_pp, r_ps], [r_sp, r_ss]]`
    pub fn reflection(&self) -> &Jones {
        &self.reflection
    }

    /// `[[t_pp, t_ps], [t_sp, t_ss]]`
    pub fn transmission(&self) -> &Jones {
        &self.transmission
    }

    /// `Re(Kz_back) / Re(Kz_front)`, `None` for an anisotropic back
    /// half-space.
    pub fn power_correction(&self) -> Option<f64> {
        self.power_correction
    }
}
