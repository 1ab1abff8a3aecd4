use anyhow::{ensure, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use log::{debug, info};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::config::{DEGENERACY_TOLERANCE, SCHUR_MAX_ITERATIONS, SCHUR_TOLERANCE};
use crate::delta::PropagatorMethod;
use crate::halfspace::{AnisotropicHalfSpace, EigenSettings};
use crate::inhomogeneous::InhomogeneousMaterial;
use crate::layer::{HomogeneousLayer, InhomogeneousLayer, SliceEvaluation, Thickness};
use crate::material::Material;


/// Numerical configuration shared by the layers and half-spaces a caller
/// builds. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Propagator of homogeneous slabs and slices.
    pub propagator: PropagatorMethod,
    /// Slicing scheme of inhomogeneous layers.
    pub slice_evaluation: SliceEvaluation,
    pub schur_tolerance: f64,
    pub schur_max_iterations: usize,
    pub degeneracy_tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            propagator: PropagatorMethod::default(),
            slice_evaluation: SliceEvaluation::default(),
            schur_tolerance: SCHUR_TOLERANCE,
            schur_max_iterations: SCHUR_MAX_ITERATIONS,
            degeneracy_tolerance: DEGENERACY_TOLERANCE,
        }
    }
}

impl Settings {
    pub fn eigen(&self) -> EigenSettings {
        EigenSettings {
            schur_tolerance: self.schur_tolerance,
            schur_max_iterations: self.schur_max_iterations,
            degeneracy_tolerance: self.degeneracy_tolerance,
        }
    }

    pub fn homogeneous_layer(
        &self,
        material: impl Into<Material>,
        thickness: impl Into<Thickness>,
    ) -> crate::Result<HomogeneousLayer> {
        Ok(HomogeneousLayer::new(material, thickness)?.with_method(self.propagator))
    }

    pub fn inhomogeneous_layer(
        &self,
        material: impl Into<InhomogeneousMaterial>,
    ) -> crate::Result<InhomogeneousLayer> {
        InhomogeneousLayer::with_methods(material, self.slice_evaluation, self.propagator)
    }

    pub fn anisotropic_half_space(&self, material: Material) -> AnisotropicHalfSpace {
        AnisotropicHalfSpace::with_settings(material, self.eigen())
    }
}

/// Loads settings from an optional TOML file, overridden by `BERREMAN_*`
/// environment variables (e.g. `BERREMAN_PROPAGATOR=linear`).
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        info!("Using configuration file: {:?}", path);
        builder = builder.add_source(File::from(path).required(false));
    }
    builder = builder.add_source(Environment::with_prefix("BERREMAN").try_parsing(true));
    load_from(builder)
}

fn load_from(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .build()
        .context("Error loading configuration")?
        .try_deserialize()
        .context("Error deserializing configuration")?;

    validate_config(&settings)?;
    debug!("{}", settings);

    Ok(settings)
}

pub fn validate_config(settings: &Settings) -> Result<()> {
    ensure!(
        settings.schur_tolerance > 0.0,
        "Schur tolerance must be greater than 0"
    );
    ensure!(
        settings.schur_max_iterations > 0,
        "Schur iteration cap must be greater than 0"
    );
    ensure!(
        settings.degeneracy_tolerance > 0.0,
        "Degeneracy tolerance must be greater than 0"
    );
    settings.slice_evaluation.check(settings.propagator)?;
    Ok(())
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Propagator: {}
  - Slice Evaluation: {}
  - Schur Tolerance: {:e}
  - Schur Max Iterations: {}
  - Degeneracy Tolerance: {:e}
  ",
            self.propagator,
            self.slice_evaluation,
            self.schur_tolerance,
            self.schur_max_iterations,
            self.degeneracy_tolerance,
        )
    }
}
