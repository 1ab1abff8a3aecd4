//! Layers of a stratified structure and their propagation matrices.
//!
//! Every layer maps the tangential fields at its front face to those at its
//! back face, `Ψ(z + d) = P · Ψ(z)`. With `inv` set, the matrix for the
//! opposite direction `Ψ(z) = P⁻¹ · Ψ(z + d)` is returned instead.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use num_complex::Complex64;
use serde::Deserialize;

use crate::config;
use crate::delta::{build_delta, propagator, PropagatorMethod};
use crate::error::{BerremanError, Result};
use crate::inhomogeneous::InhomogeneousMaterial;
use crate::material::Material;
use crate::{Matrix4c, Tensor};


/// Thickness of a homogeneous layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thickness {
    /// Metres.
    Absolute(f64),
    /// Quarter-wave plate at the given wavelength, `λ / (4 Re n)`. Isotropic
    /// materials only.
    QuarterWave { wavelength: f64 },
}

impl From<f64> for Thickness {
    fn from(thickness: f64) -> Self {
        Self::Absolute(thickness)
    }
}

/// How an inhomogeneous layer is reduced to homogeneous slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SliceEvaluation {
    /// Delta matrix at the middle of each slice, global error `O(h²)`.
    #[default]
    Midpoint,
    /// Three-point symplectic scheme, global error `O(h⁴)`. Needs an exact
    /// (Padé) slice propagator.
    Symplectic,
}

impl SliceEvaluation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Midpoint => "midpoint",
            Self::Symplectic => "symplectic",
        }
    }

    /// Fails if this evaluation cannot use `method` for its slices.
    pub fn check(&self, method: PropagatorMethod) -> Result<()> {
        match (self, method) {
            (Self::Symplectic, PropagatorMethod::Linear) => {
                Err(BerremanError::IncompatibleMethods {
                    evaluation: self.name(),
                    method: method.name(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SliceEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SliceEvaluation {
    type Err = BerremanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "midpoint" => Ok(Self::Midpoint),
            "symplectic" => Ok(Self::Symplectic),
            _ => Err(BerremanError::UnsupportedEvaluation(s.to_string())),
        }
    }
}

impl TryFrom<String> for SliceEvaluation {
    type Error = BerremanError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// One entry of a permittivity profile: slice thickness and tensor.
pub type ProfileEntry = (f64, Tensor);

/// Layer of a structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Homogeneous(HomogeneousLayer),
    Inhomogeneous(InhomogeneousLayer),
    Repeated(RepeatedLayers),
}

impl From<HomogeneousLayer> for Layer {
    fn from(layer: HomogeneousLayer) -> Self {
        Self::Homogeneous(layer)
    }
}

impl From<InhomogeneousLayer> for Layer {
    fn from(layer: InhomogeneousLayer) -> Self {
        Self::Inhomogeneous(layer)
    }
}

impl From<RepeatedLayers> for Layer {
    fn from(layer: RepeatedLayers) -> Self {
        Self::Repeated(layer)
    }
}

impl Layer {
    /// Thickness and permittivity of every homogeneous slice, front to back.
    pub fn permittivity_profile(&self, lambda: f64) -> Vec<ProfileEntry> {
        match self {
            Self::Homogeneous(layer) => layer.permittivity_profile(lambda),
            Self::Inhomogeneous(layer) => layer.permittivity_profile(lambda),
            Self::Repeated(layer) => layer.permittivity_profile(lambda),
        }
    }

    pub fn propagation_matrix(&self, kx: Complex64, k0: f64, inv: bool) -> Matrix4c {
        match self {
            Self::Homogeneous(layer) => layer.propagation_matrix(kx, k0, inv),
            Self::Inhomogeneous(layer) => layer.propagation_matrix(kx, k0, inv),
            Self::Repeated(layer) => layer.propagation_matrix(kx, k0, inv),
        }
    }
}

/// Slab of a homogeneous material.
#[derive(Debug, Clone, PartialEq)]
pub struct HomogeneousLayer {
    material: Material,
    thickness: f64,
    method: PropagatorMethod,
}

impl HomogeneousLayer {
    pub fn new(material: impl Into<Material>, thickness: impl Into<Thickness>) -> Result<Self> {
        let mut layer = Self {
            material: material.into(),
            thickness: 0.0,
            method: PropagatorMethod::default(),
        };
        layer.set_thickness(thickness.into())?;
        Ok(layer)
    }

    pub fn with_method(mut self, method: PropagatorMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the thickness. A quarter-wave thickness is resolved immediately
    /// against the current material.
    pub fn set_thickness(&mut self, thickness: Thickness) -> Result<()> {
        let h = match thickness {
            Thickness::Absolute(h) => h,
            Thickness::QuarterWave { wavelength } => self.quarter_wave_thickness(wavelength)?,
        };
        if !(h >= 0.0 && h.is_finite()) {
            return Err(BerremanError::InvalidDiscretization(format!(
                "layer thickness must be non-negative and finite, got {}",
                h
            )));
        }
        self.thickness = h;
        Ok(())
    }

    pub fn set_material(&mut self, material: impl Into<Material>) {
        self.material = material.into();
    }

    pub fn set_method(&mut self, method: PropagatorMethod) {
        self.method = method;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn method(&self) -> PropagatorMethod {
        self.method
    }

    /// Thickness of a quarter-wave plate of this material at `lambda`.
    pub fn quarter_wave_thickness(&self, lambda: f64) -> Result<f64> {
        let n = self.material.refractive_index(lambda)?;
        Ok(lambda / (4.0 * n.re))
    }

    pub fn delta_matrix(&self, kx: Complex64, k0: f64) -> Matrix4c {
        build_delta(kx, &self.material.tensor(config::wavelength(k0)))
    }

    pub fn permittivity_profile(&self, lambda: f64) -> Vec<ProfileEntry> {
        vec![(self.thickness, self.material.tensor(lambda))]
    }

    /// `exp(±i h k0 Δ)` as computed by the layer's propagator method.
    pub fn propagation_matrix(&self, kx: Complex64, k0: f64, inv: bool) -> Matrix4c {
        let h = if inv { -self.thickness } else { self.thickness };
        propagator(&self.delta_matrix(kx, k0), h, k0, self.method)
    }
}

/// Layer of an inhomogeneous material, propagated slice by slice.
///
/// **Context**: Inside an inhomogeneous layer the Delta matrix depends on z,
/// so there is no closed-form propagator. The material supplies a slice grid
/// and each slice is treated as homogeneous.
///
/// **How it Works**: Slice propagators are composed front to back,
/// `P = P_N · … · P_1`. The inverse composes the reversed grid, each slice
/// being propagated with a negative thickness.
#[derive(Debug, Clone, PartialEq)]
pub struct InhomogeneousLayer {
    material: InhomogeneousMaterial,
    evaluation: SliceEvaluation,
    method: PropagatorMethod,
}

impl InhomogeneousLayer {
    /// Layer with midpoint slicing and Padé slice propagators.
    pub fn new(material: impl Into<InhomogeneousMaterial>) -> Self {
        Self {
            material: material.into(),
            evaluation: SliceEvaluation::default(),
            method: PropagatorMethod::default(),
        }
    }

    pub fn with_methods(
        material: impl Into<InhomogeneousMaterial>,
        evaluation: SliceEvaluation,
        method: PropagatorMethod,
    ) -> Result<Self> {
        let mut layer = Self::new(material);
        layer.set_methods(evaluation, method)?;
        Ok(layer)
    }

    pub fn set_methods(&mut self, evaluation: SliceEvaluation, method: PropagatorMethod) -> Result<()> {
        evaluation.check(method)?;
        self.evaluation = evaluation;
        self.method = method;
        Ok(())
    }

    pub fn set_material(&mut self, material: impl Into<InhomogeneousMaterial>) {
        self.material = material.into();
    }

    pub fn material(&self) -> &InhomogeneousMaterial {
        &self.material
    }

    /// Mutable access for the material's own validating setters.
    pub fn material_mut(&mut self) -> &mut InhomogeneousMaterial {
        &mut self.material
    }

    pub fn evaluation(&self) -> SliceEvaluation {
        self.evaluation
    }

    pub fn method(&self) -> PropagatorMethod {
        self.method
    }

    /// One entry per slice, the tensor taken at the slice midpoint.
    pub fn permittivity_profile(&self, lambda: f64) -> Vec<ProfileEntry> {
        self.material
            .slices()
            .into_iter()
            .tuple_windows()
            .map(|(z1, z2)| (z2 - z1, self.material.tensor(0.5 * (z1 + z2), lambda)))
            .collect()
    }

    pub fn propagation_matrix(&self, kx: Complex64, k0: f64, inv: bool) -> Matrix4c {
        let mut z = self.material.slices();
        if inv {
            z.reverse();
        }
        z.into_iter()
            .tuple_windows()
            .fold(Matrix4c::identity(), |total, (z1, z2)| {
                self.slice_propagator(z2, z1, kx, k0) * total
            })
    }

    /// Propagator `P(z2, z1)` of a thin slice. `z2 < z1` propagates
    /// backwards.
    fn slice_propagator(&self, z2: f64, z1: f64, kx: Complex64, k0: f64) -> Matrix4c {
        let lambda = config::wavelength(k0);
        let h = z2 - z1;
        let slab = |z: f64, length: f64| {
            let delta = build_delta(kx, &self.material.tensor(z, lambda));
            propagator(&delta, length, k0, self.method)
        };
        match self.evaluation {
            SliceEvaluation::Midpoint => slab(0.5 * (z1 + z2), h),
            SliceEvaluation::Symplectic => {
                // P(z2, z1) P(z1, z2) = I since z1 + t1 h = z2 - t3 h
                let s = 2f64.cbrt();
                let b1 = 1.0 / (2.0 - s);
                let b2 = -s / (2.0 - s);
                let t1 = 1.0 / (2.0 * (2.0 - s));
                let t2 = 0.5;
                let t3 = 0.5 - (s - 1.0) / (2.0 * (2.0 - s));
                slab(z1 + t3 * h, b1 * h) * slab(z1 + t2 * h, b2 * h) * slab(z1 + t1 * h, b1 * h)
            }
        }
    }
}

/// Periodic repetition of a sequence of layers.
///
/// For a period `[1, 2, 3]` with `n = 2`, `before = 1` and `after = 0` the
/// stack is `3 1 2 3 1 2 3`: `before` trailing layers of the period precede
/// the repetitions and `after` leading layers follow them.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedLayers {
    layers: Vec<Layer>,
    n: usize,
    before: usize,
    after: usize,
}

impl RepeatedLayers {
    pub fn new(layers: Vec<Layer>, n: usize, before: usize, after: usize) -> Result<Self> {
        check_repetition(layers.len(), before, after)?;
        Ok(Self {
            layers,
            n,
            before,
            after,
        })
    }

    pub fn set_repetition(&mut self, n: usize, before: usize, after: usize) -> Result<()> {
        check_repetition(self.layers.len(), before, after)?;
        self.n = n;
        self.before = before;
        self.after = after;
        Ok(())
    }

    pub fn set_layers(&mut self, layers: Vec<Layer>) -> Result<()> {
        check_repetition(layers.len(), self.before, self.after)?;
        self.layers = layers;
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn before(&self) -> usize {
        self.before
    }

    pub fn after(&self) -> usize {
        self.after
    }

    pub fn permittivity_profile(&self, lambda: f64) -> Vec<ProfileEntry> {
        let profiles: Vec<Vec<ProfileEntry>> = self
            .layers
            .iter()
            .map(|layer| layer.permittivity_profile(lambda))
            .collect();
        let period = profiles.concat();
        let before = profiles[profiles.len() - self.before..].concat();
        let after = profiles[..self.after].concat();

        let mut profile = before;
        for _ in 0..self.n {
            profile.extend_from_slice(&period);
        }
        profile.extend(after);
        profile
    }

    /// Forward: `P_after · P_periodⁿ · P_before`. Inverted:
    /// `P_before⁻¹ · P_period⁻ⁿ · P_after⁻¹`, each block composed from the
    /// inverse layer matrices.
    pub fn propagation_matrix(&self, kx: Complex64, k0: f64, inv: bool) -> Matrix4c {
        let i_after = self.after;
        let i_before = self.layers.len() - self.before;
        let mut period = Matrix4c::identity();
        let mut before = Matrix4c::identity();
        let mut after = None;

        for (i, layer) in self.layers.iter().enumerate() {
            let p = layer.propagation_matrix(kx, k0, inv);
            if i == i_after {
                after = Some(period);
            }
            if inv {
                period *= p;
                if i >= i_before {
                    before *= p;
                }
            } else {
                period = p * period;
                if i >= i_before {
                    before = p * before;
                }
            }
        }
        // `after` spanning the whole period
        let after = after.unwrap_or(period);

        let mut repeated = Matrix4c::identity();
        for _ in 0..self.n {
            repeated *= period;
        }
        if inv {
            before * repeated * after
        } else {
            after * repeated * before
        }
    }
}

fn check_repetition(period: usize, before: usize, after: usize) -> Result<()> {
    if before > period || after > period {
        return Err(BerremanError::InvalidRepetition {
            before,
            after,
            period,
        });
    }
    Ok(())
}
