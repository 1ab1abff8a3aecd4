//! Inhomogeneous materials: permittivity varying along the stratification
//! axis z, with the slice grid used to discretize them.
//!
//! Positions are relative to the material (the first slice is at z = 0),
//! not to the whole structure.

use nalgebra::Vector3;
use ndarray::Array1;

use crate::error::{BerremanError, Result};
use crate::material::{rotate_tensor, Material};
use crate::rotation::rotation_axis_angle;
use crate::Tensor;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::material::IsotropicMaterial;
    use itertools::Itertools;
    use std::f64::consts::PI;

    #[test]
    fn twisted_slices() {
        let twisted = TwistedMaterial::new(Material::uniaxial(1.5, 1.7), 4e-6, PI / 2.0, 8).unwrap();
        let z = twisted.slices();
        assert_eq!(z.len(), 9);
        assert_eq!(z[0], 0.0);
        assert!((z[8] - 4e-6).abs() < 1e-18);
        assert!(z.iter().tuple_windows().all(|(a, b)| b > a));
    }

    #[test]
    fn twisted_tensor_rotates_about_z() {
        // ordinary along z, extraordinary along x
        let base = Material::biaxial(1.7, 1.5, 1.5);
        let twisted = TwistedMaterial::new(base, 2e-6, PI / 2.0, 10).unwrap();
        let start = twisted.tensor(0.0, 1e-6);
        let end = twisted.tensor(2e-6, 1e-6);
        assert!((start[(0, 0)].re - 1.7 * 1.7).abs() < 1e-12);
        assert!((end[(1, 1)].re - 1.7 * 1.7).abs() < 1e-12);
        assert!((end[(0, 0)].re - 1.5 * 1.5).abs() < 1e-12);
    }

    #[test]
    fn setters_validate() {
        let mut twisted = TwistedMaterial::new(Material::default(), 1e-6, 0.0, 4).unwrap();
        assert!(twisted.set_divisions(0).is_err());
        assert!(twisted.set_thickness(-1.0).is_err());
        twisted.set_divisions(3).unwrap();
        assert_eq!(twisted.slices().len(), 4);
        assert!((twisted.slices()[1] - 1e-6 / 3.0).abs() < 1e-18);
        assert!(TwistedMaterial::new(Material::default(), 1e-6, 0.0, 0).is_err());
    }

    #[test]
    fn graded_interpolates_linearly() {
        let graded = GradedMaterial::new(
            IsotropicMaterial::real(1.0).into(),
            IsotropicMaterial::real(2.0).into(),
            1e-6,
            5,
        )
        .unwrap();
        let mid = graded.tensor(0.5e-6, 1e-6);
        assert!((mid[(0, 0)].re - 2.5).abs() < 1e-12);
        assert!((graded.tensor(1e-6, 1e-6)[(2, 2)].re - 4.0).abs() < 1e-12);
    }
}

/// Material whose permittivity depends on the depth z.
#[derive(Debug, Clone, PartialEq)]
pub enum InhomogeneousMaterial {
    Twisted(TwistedMaterial),
    Graded(GradedMaterial),
}

impl From<TwistedMaterial> for InhomogeneousMaterial {
    fn from(material: TwistedMaterial) -> Self {
        Self::Twisted(material)
    }
}

impl From<GradedMaterial> for InhomogeneousMaterial {
    fn from(material: GradedMaterial) -> Self {
        Self::Graded(material)
    }
}

impl InhomogeneousMaterial {
    /// Permittivity tensor at depth `z` and wavelength `lambda`.
    pub fn tensor(&self, z: f64, lambda: f64) -> Tensor {
        match self {
            Self::Twisted(material) => material.tensor(z, lambda),
            Self::Graded(material) => material.tensor(z, lambda),
        }
    }

    /// Slice boundaries `[0, z₁, …, d]`, strictly increasing.
    pub fn slices(&self) -> Vec<f64> {
        match self {
            Self::Twisted(material) => material.slices(),
            Self::Graded(material) => material.slices(),
        }
    }

    pub fn thickness(&self) -> f64 {
        match self {
            Self::Twisted(material) => material.thickness,
            Self::Graded(material) => material.thickness,
        }
    }
}

/// Material rotated about z proportionally to depth, as in twisted nematic
/// or cholesteric liquid crystals.
///
/// Whether `k0·h` (with `h = d / divisions`) is small decides which
/// propagator is adequate: the linear one needs `k0·h ≪ 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TwistedMaterial {
    material: Material,
    thickness: f64,
    angle: f64, // total twist over the thickness
    divisions: usize,
}

impl TwistedMaterial {
    pub fn new(material: Material, thickness: f64, angle: f64, divisions: usize) -> Result<Self> {
        let mut twisted = Self {
            material,
            thickness: 1.0,
            angle,
            divisions: 1,
        };
        twisted.set_thickness(thickness)?;
        twisted.set_divisions(divisions)?;
        Ok(twisted)
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn set_thickness(&mut self, thickness: f64) -> Result<()> {
        self.thickness = checked_thickness(thickness)?;
        Ok(())
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    pub fn set_divisions(&mut self, divisions: usize) -> Result<()> {
        self.divisions = checked_divisions(divisions)?;
        Ok(())
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn tensor(&self, z: f64, lambda: f64) -> Tensor {
        let r = rotation_axis_angle(&Vector3::z(), self.angle * z / self.thickness);
        rotate_tensor(&self.material.tensor(lambda), &r)
    }

    pub fn slices(&self) -> Vec<f64> {
        slice_grid(self.thickness, self.divisions)
    }
}

/// Permittivity interpolated linearly from `front` (z = 0) to `back`
/// (z = thickness).
#[derive(Debug, Clone, PartialEq)]
pub struct GradedMaterial {
    front: Material,
    back: Material,
    thickness: f64,
    divisions: usize,
}

impl GradedMaterial {
    pub fn new(front: Material, back: Material, thickness: f64, divisions: usize) -> Result<Self> {
        Ok(Self {
            front,
            back,
            thickness: checked_thickness(thickness)?,
            divisions: checked_divisions(divisions)?,
        })
    }

    pub fn set_thickness(&mut self, thickness: f64) -> Result<()> {
        self.thickness = checked_thickness(thickness)?;
        Ok(())
    }

    pub fn set_divisions(&mut self, divisions: usize) -> Result<()> {
        self.divisions = checked_divisions(divisions)?;
        Ok(())
    }

    pub fn tensor(&self, z: f64, lambda: f64) -> Tensor {
        let w = z / self.thickness;
        self.front.tensor(lambda) * num_complex::Complex64::from(1.0 - w)
            + self.back.tensor(lambda) * num_complex::Complex64::from(w)
    }

    pub fn slices(&self) -> Vec<f64> {
        slice_grid(self.thickness, self.divisions)
    }
}

fn checked_thickness(thickness: f64) -> Result<f64> {
    if thickness > 0.0 && thickness.is_finite() {
        Ok(thickness)
    } else {
        Err(BerremanError::InvalidDiscretization(format!(
            "thickness must be positive and finite, got {}",
            thickness
        )))
    }
}

fn checked_divisions(divisions: usize) -> Result<usize> {
    if divisions == 0 {
        return Err(BerremanError::InvalidDiscretization(
            "at least one slice is required".to_string(),
        ));
    }
    Ok(divisions)
}

/// `divisions + 1` evenly spaced boundaries from 0 to `thickness`.
fn slice_grid(thickness: f64, divisions: usize) -> Vec<f64> {
    Array1::linspace(0.0, thickness, divisions + 1).to_vec()
}
