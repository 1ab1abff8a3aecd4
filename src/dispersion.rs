//! Dispersion laws for the scalar dielectric function.
//!
//! A dispersion law maps a vacuum wavelength (in metres) or a photon energy
//! (in eV) to a complex dielectric value `ε`. `Im(ε) > 0` describes an
//! absorbing medium and `Im(ε) < 0` an amplifying one.
//!
//! # Laws
//!
//! - **Sellmeier**: `ε(λ) = 1 + Σ Bᵢ λ² / (λ² - λᵢ²)`
//! - **Lorentz (wavelength)**: `ε(λ) = 1 + Σ Aᵢ λ² / (λ² - λᵢ² - i ζᵢ λ)`
//! - **Lorentz (energy)**: `ε(E) = 1 + Σ Aᵢ / (Eᵢ² - E² - i Γᵢ E)`
//! - **Table**: tabulated refractive index, cubic-spline interpolated, `ε = n²`
//!
//! Positive damping (`ζᵢ`, `Γᵢ`) and strength give an absorbing resonance.
//! Table laws hold their boundary values outside the tabulated range.

use num_complex::Complex64;

use crate::config;
use crate::error::Result;
use crate::spline::CubicSpline;


/// One `[Bᵢ, λᵢ]` Sellmeier term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellmeierTerm {
    pub strength: f64,
    pub wavelength: f64,
}

impl SellmeierTerm {
    pub fn new(strength: f64, wavelength: f64) -> Self {
        Self {
            strength,
            wavelength,
        }
    }
}

/// One `[Aᵢ, λᵢ, ζᵢ]` Lorentz term with wavelength coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LorentzLambdaTerm {
    pub strength: f64,
    pub wavelength: f64,
    pub damping: f64,
}

impl LorentzLambdaTerm {
    pub fn new(strength: f64, wavelength: f64, damping: f64) -> Self {
        Self {
            strength,
            wavelength,
            damping,
        }
    }
}

/// One `[Aᵢ, Eᵢ, Γᵢ]` Lorentz term with energy coefficients (eV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LorentzEnergyTerm {
    pub strength: f64,
    pub energy: f64,
    pub broadening: f64,
}

impl LorentzEnergyTerm {
    pub fn new(strength: f64, energy: f64, broadening: f64) -> Self {
        Self {
            strength,
            energy,
            broadening,
        }
    }
}

/// Scalar dielectric function of a material.
#[derive(Debug, Clone, PartialEq)]
pub enum DispersionLaw {
    Sellmeier(Vec<SellmeierTerm>),
    LorentzLambda(Vec<LorentzLambdaTerm>),
    LorentzEnergy(Vec<LorentzEnergyTerm>),
    /// Tabulated refractive index; real and imaginary parts are splined
    /// independently.
    Table { real: CubicSpline, imag: CubicSpline },
}

impl DispersionLaw {
    /// Builds a tabulated law from wavelengths (m) and complex refractive
    /// indices (`n'' > 0` for an absorbing material).
    pub fn table(wavelengths: Vec<f64>, indices: Vec<Complex64>) -> Result<Self> {
        let re = indices.iter().map(|n| n.re).collect();
        let im = indices.iter().map(|n| n.im).collect();
        Ok(Self::Table {
            real: CubicSpline::new(wavelengths.clone(), re)?,
            imag: CubicSpline::new(wavelengths, im)?,
        })
    }

    /// Dielectric function at wavelength `lambda` (m).
    pub fn dielectric(&self, lambda: f64) -> Complex64 {
        let one = Complex64::new(1.0, 0.0);
        match self {
            Self::Sellmeier(terms) => {
                let l2 = lambda * lambda;
                terms.iter().fold(one, |eps, t| {
                    eps + t.strength * l2 / (l2 - t.wavelength * t.wavelength)
                })
            }
            Self::LorentzLambda(terms) => {
                let l2 = lambda * lambda;
                terms.iter().fold(one, |eps, t| {
                    let denom =
                        Complex64::new(l2 - t.wavelength * t.wavelength, -t.damping * lambda);
                    eps + t.strength * l2 / denom
                })
            }
            Self::LorentzEnergy(terms) => {
                let e = config::EV_WAVELENGTH / lambda;
                terms.iter().fold(one, |eps, t| {
                    let denom = Complex64::new(t.energy * t.energy - e * e, -t.broadening * e);
                    eps + t.strength / denom
                })
            }
            Self::Table { real, imag } => {
                let n = Complex64::new(real.evaluate(lambda), imag.evaluate(lambda));
                n * n
            }
        }
    }

    /// Dielectric function at photon energy `energy` (eV).
    pub fn dielectric_energy(&self, energy: f64) -> Complex64 {
        self.dielectric(config::EV_WAVELENGTH / energy)
    }

    /// Refractive index (principal square root of ε) at wavelength `lambda`.
    pub fn refractive_index(&self, lambda: f64) -> Complex64 {
        match self {
            // avoid the square/square-root round trip on tabulated data
            Self::Table { real, imag } => {
                Complex64::new(real.evaluate(lambda), imag.evaluate(lambda))
            }
            _ => self.dielectric(lambda).sqrt(),
        }
    }

    /// Wavelengths covered by a tabulated law, `None` for analytic laws.
    pub fn wavelength_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Table { real, .. } => Some(real.range()),
            _ => None,
        }
    }

    /// Refractive index at photon energy `energy` (eV).
    pub fn refractive_index_energy(&self, energy: f64) -> Complex64 {
        self.refractive_index(config::EV_WAVELENGTH / energy)
    }
}
