//! Complete stratified structure: front half-space, layers, back half-space.
//!
//! The fields at the front face relate to the eigenmode amplitudes of the
//! back half-space through the transfer matrix
//!
//! ```text
//! [E_is, E_rs, E_ip, E_rp]ᵀ = T · [c1, c2, c3, c4]ᵀ,   T = L_f⁻¹ · P(z_f, z_b) · L_b
//! ```
//!
//! from which the reflection and transmission Jones matrices are extracted.

use std::sync::Arc;

use log::debug;
use nalgebra::Vector3;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::{BerremanError, Result};
use crate::evaluation::Evaluation;
use crate::halfspace::{HalfSpace, IsotropicHalfSpace};
use crate::layer::{Layer, ProfileEntry};
use crate::{Jones, Matrix4c};


/// Stratified structure bounded by two half-spaces.
///
/// The front (incidence) half-space must be isotropic. The back (exit)
/// half-space may be anisotropic, in which case no power transmission
/// correction exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    front: IsotropicHalfSpace,
    layers: Vec<Layer>,
    back: HalfSpace,
}

impl Structure {
    pub fn new(front: IsotropicHalfSpace, layers: Vec<Layer>, back: impl Into<HalfSpace>) -> Self {
        Self {
            front,
            layers,
            back: back.into(),
        }
    }

    pub fn set_front(&mut self, front: IsotropicHalfSpace) {
        self.front = front;
    }

    pub fn set_back(&mut self, back: impl Into<HalfSpace>) {
        self.back = back.into();
    }

    /// Layers from z = 0 towards the back half-space.
    pub fn set_layers(&mut self, layers: Vec<Layer>) {
        self.layers = layers;
    }

    pub fn front(&self) -> &IsotropicHalfSpace {
        &self.front
    }

    pub fn back(&self) -> &HalfSpace {
        &self.back
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    /// Permittivity profile with the half-spaces as entries of infinite
    /// thickness.
    pub fn permittivity_profile(&self, lambda: f64) -> Vec<ProfileEntry> {
        let mut profile = vec![(f64::INFINITY, self.front.material().tensor(lambda))];
        profile.extend(
            self.layers
                .iter()
                .flat_map(|layer| layer.permittivity_profile(lambda)),
        );
        profile.push((f64::INFINITY, self.back.tensor(lambda)));
        profile
    }

    /// Refractive index `√(vᵀ ε v)` seen by a field along the unit vector `v`.
    pub fn index_profile(&self, lambda: f64, v: &Vector3<f64>) -> Vec<(f64, Complex64)> {
        let v = v.map(|x| Complex64::new(x, 0.0));
        self.permittivity_profile(lambda)
            .into_iter()
            .map(|(h, epsilon)| (h, v.dot(&(epsilon * v)).sqrt()))
            .collect()
    }

    /// Propagation matrix `P(z_b, z_f)` of all layers, or `P(z_f, z_b)` if
    /// `inv`.
    pub fn propagation_matrix(&self, kx: Complex64, k0: f64, inv: bool) -> Matrix4c {
        let compose = |total: Matrix4c, layer: &Layer| layer.propagation_matrix(kx, k0, inv) * total;
        if inv {
            self.layers.iter().rev().fold(Matrix4c::identity(), compose)
        } else {
            self.layers.iter().fold(Matrix4c::identity(), compose)
        }
    }

    /// Transfer matrix `T = L_f⁻¹ · P(z_f, z_b) · L_b`.
    pub fn structure_matrix(&self, kx: Complex64, k0: f64) -> Result<Matrix4c> {
        let front = self.front.inverse_transition_matrix(kx, k0);
        let p = self.propagation_matrix(kx, k0, true);
        let back = self.back.transition_matrix(kx, k0)?;
        Ok(front * p * back)
    }

    /// Reflection and transmission Jones matrices `(T_ri, T_ti)`, laid out as
    /// `[[xpp, xps], [xsp, xss]]`.
    ///
    /// `t_ps` is the transmitted `p` component for an incident `s` wave.
    pub fn jones(&self, kx: Complex64, k0: f64) -> Result<(Jones, Jones)> {
        let t = self.structure_matrix(kx, k0)?;
        let t_it = Jones::new(t[(2, 2)], t[(2, 0)], t[(0, 2)], t[(0, 0)]);
        let t_ti = t_it
            .try_inverse()
            .ok_or(BerremanError::SingularMatrix("incident-to-transmitted block"))?;
        let t_rt = Jones::new(t[(3, 2)], t[(3, 0)], t[(1, 2)], t[(1, 0)]);
        Ok((t_rt * t_ti, t_ti))
    }

    /// `Re(Kz_back) / Re(Kz_front)`, the factor turning `|t|²` into a power
    /// transmission. Only defined for an isotropic back half-space.
    pub fn power_transmission_correction(&self, kx: Complex64, k0: f64) -> Option<f64> {
        let back = self.back.as_isotropic()?;
        let kz_front = self.front.kz_from_kx(kx, k0);
        let kz_back = back.kz_from_kx(kx, k0);
        Some(kz_back.re / kz_front.re)
    }

    pub fn evaluate(self: &Arc<Self>, kx: impl Into<Complex64>, k0: f64) -> Result<Evaluation> {
        let kx = kx.into();
        debug!(
            "evaluating {} layers at Kx = {}, k0 = {:e}",
            self.layers.len(),
            kx,
            k0
        );
        Evaluation::new(Arc::clone(self), kx, k0)
    }

    /// Evaluates independent `(Kx, k0)` points in parallel. A failing point
    /// does not affect the others.
    pub fn evaluate_sweep(self: &Arc<Self>, points: &[(Complex64, f64)]) -> Vec<Result<Evaluation>> {
        points
            .par_iter()
            .map(|&(kx, k0)| self.evaluate(kx, k0))
            .collect()
    }
}
