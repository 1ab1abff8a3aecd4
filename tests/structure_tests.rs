use std::f64::consts::PI;
use std::sync::Arc;

use berreman::{
    config,
    halfspace::{AnisotropicHalfSpace, IsotropicHalfSpace},
    inhomogeneous::TwistedMaterial,
    layer::{HomogeneousLayer, InhomogeneousLayer, Layer, RepeatedLayers, SliceEvaluation, Thickness},
    material::{IsotropicMaterial, Material},
    results::ResultSet,
    rotation::rotation_euler,
    settings::Settings,
    structure::Structure,
    BerremanError,
};
use num_complex::Complex64;

const LAMBDA: f64 = 1e-6;
const K0: f64 = config::DEFAULT_K0;

fn air() -> IsotropicHalfSpace {
    IsotropicHalfSpace::new(IsotropicMaterial::real(1.0))
}

fn glass() -> IsotropicHalfSpace {
    IsotropicHalfSpace::new(IsotropicMaterial::real(1.5))
}

fn real(set: &mut ResultSet, name: &str) -> Vec<f64> {
    set.get(name)
        .unwrap()
        .as_real()
        .unwrap()
        .iter()
        .copied()
        .collect()
}

#[test]
fn fabry_perot_period() {
    let kx = 0.5;
    // λ / (2 n cosΦ) with n cosΦ = √(n² - Kx²)
    let period = LAMBDA / (2.0 * (1.5f64.powi(2) - kx * kx).sqrt());
    let steps = 100;

    let mut structure = Arc::new(Structure::new(air(), vec![], air()));
    let mut set = ResultSet::new();
    for i in 0..=steps {
        let h = period * i as f64 / steps as f64;
        let layer = HomogeneousLayer::new(IsotropicMaterial::real(1.5), h).unwrap();
        Arc::make_mut(&mut structure).set_layers(vec![layer.into()]);
        set.push(structure.evaluate(kx, K0).unwrap());
    }

    let t = real(&mut set, "T_pp");
    assert!((t[0] - 1.0).abs() < 1e-12);
    assert!((t[steps] - 1.0).abs() < 1e-9, "T_pp after one period: {}", t[steps]);
    let (minimum, _) = t
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(i_min, t_min), (i, &t)| {
            if t < t_min {
                (i, t)
            } else {
                (i_min, t_min)
            }
        });
    assert_eq!(minimum, steps / 2);
    assert!(t[minimum] < 0.99);

    // every recorded evaluation kept its own layer
    let thickness = |i: usize| match &set.evaluations()[i].structure().layers()[0] {
        Layer::Homogeneous(layer) => layer.thickness(),
        _ => unreachable!(),
    };
    assert_eq!(thickness(0), 0.0);
    assert!((thickness(steps) - period).abs() < 1e-18);
}

#[test]
fn lossless_stack_conserves_energy() {
    let crystal = Material::uniaxial(1.5, 1.7).rotated(&rotation_euler(0.4, 1.0, 0.2));
    let layers = vec![
        HomogeneousLayer::new(IsotropicMaterial::real(2.0), 120e-9)
            .unwrap()
            .into(),
        HomogeneousLayer::new(crystal, 800e-9).unwrap().into(),
    ];
    let structure = Arc::new(Structure::new(air(), layers, glass()));
    let points: Vec<(Complex64, f64)> = [0.0, 0.3, 0.6, 0.9]
        .iter()
        .map(|&kx| (Complex64::new(kx, 0.0), K0))
        .collect();
    let evaluations = structure
        .evaluate_sweep(&points)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let mut set = ResultSet::from_evaluations(evaluations);

    let (r_pp, r_sp, t_pp, t_sp) = (
        real(&mut set, "R_pp"),
        real(&mut set, "R_sp"),
        real(&mut set, "T_pp"),
        real(&mut set, "T_sp"),
    );
    let (r_ss, r_ps, t_ss, t_ps) = (
        real(&mut set, "R_ss"),
        real(&mut set, "R_ps"),
        real(&mut set, "T_ss"),
        real(&mut set, "T_ps"),
    );
    for i in 0..points.len() {
        let p_in = r_pp[i] + r_sp[i] + t_pp[i] + t_sp[i];
        let s_in = r_ss[i] + r_ps[i] + t_ss[i] + t_ps[i];
        assert!((p_in - 1.0).abs() < 1e-9, "p: {}", p_in);
        assert!((s_in - 1.0).abs() < 1e-9, "s: {}", s_in);
    }
    // the tilted crystal mixes polarizations
    assert!(t_sp.iter().any(|&t| t > 1e-4));
}

#[test]
fn brewster_angle() {
    let front = air();
    let brewster = front.kx_from_phi(1.5f64.atan(), K0);
    let oblique = front.kx_from_phi(PI / 4.0, K0);
    let structure = Arc::new(Structure::new(front, vec![], glass()));
    let mut set = ResultSet::from_evaluations(vec![
        structure.evaluate(brewster, K0).unwrap(),
        structure.evaluate(oblique, K0).unwrap(),
    ]);
    assert!(real(&mut set, "R_pp")[0] < 1e-24);
    assert!(real(&mut set, "R_ss")[0] > 0.1);

    // r_pp / r_ss is real for a bare lossless substrate
    let delta = real(&mut set, "Δ")[1];
    assert!(delta.to_radians().sin().abs() < 1e-9, "Δ = {}", delta);
    let psi = real(&mut set, "Psi_ss");
    assert!(psi.iter().all(|&psi| (psi - 45.0).abs() < 1e-12));
}

#[test]
fn bragg_mirror() {
    let high = HomogeneousLayer::new(
        IsotropicMaterial::real(2.3),
        Thickness::QuarterWave { wavelength: LAMBDA },
    )
    .unwrap();
    let low = HomogeneousLayer::new(
        IsotropicMaterial::real(1.45),
        Thickness::QuarterWave { wavelength: LAMBDA },
    )
    .unwrap();
    let mirror = RepeatedLayers::new(vec![high.into(), low.into()], 10, 0, 0).unwrap();
    let structure = Arc::new(Structure::new(air(), vec![mirror.into()], glass()));

    let mut set = ResultSet::from_evaluations(vec![
        structure.evaluate(0.0, K0).unwrap(),
        // far outside the stop band
        structure.evaluate(0.0, K0 * 0.5).unwrap(),
    ]);
    let r = real(&mut set, "R_ss");
    assert!(r[0] > 0.99, "R = {}", r[0]);
    assert!(r[1] < 0.5, "R = {}", r[1]);
    assert_eq!(set.k0().iter().copied().collect::<Vec<_>>(), vec![K0, K0 * 0.5]);
}

#[test]
fn twisted_nematic_rotates_polarization() {
    // Mauguin regime: 2 d Δn / λ = 8
    let lc = Material::biaxial(1.7, 1.5, 1.5);
    let cell = TwistedMaterial::new(lc, 20e-6, PI / 2.0, 100).unwrap();
    let layer = InhomogeneousLayer::with_methods(
        cell,
        SliceEvaluation::Symplectic,
        berreman::delta::PropagatorMethod::Pade,
    )
    .unwrap();
    let medium = || IsotropicHalfSpace::new(IsotropicMaterial::real(1.6));
    let structure = Arc::new(Structure::new(medium(), vec![layer.into()], medium()));

    let mut set = ResultSet::from_evaluations(vec![structure.evaluate(0.0, K0).unwrap()]);
    let converted = real(&mut set, "T_sp")[0];
    let kept = real(&mut set, "T_pp")[0];
    assert!(converted > 0.9, "T_sp = {}", converted);
    assert!(kept < 0.05, "T_pp = {}", kept);
}

#[test]
fn anisotropic_substrate() {
    // optic axis along z: at normal incidence both polarizations see n_o
    let crystal = AnisotropicHalfSpace::new(Material::uniaxial(1.5, 1.7));
    let structure = Arc::new(Structure::new(air(), vec![], crystal));
    let mut set = ResultSet::from_evaluations(vec![structure.evaluate(0.0, K0).unwrap()]);

    for name in ["R_pp", "R_ss"] {
        assert!((real(&mut set, name)[0] - 0.04).abs() < 1e-9, "{}", name);
    }
    assert_eq!(
        set.get("T_ss").unwrap_err(),
        BerremanError::PowerTransmissionUndefined
    );
}

#[test]
fn settings_drive_construction() {
    let settings = Settings {
        slice_evaluation: SliceEvaluation::Symplectic,
        ..Settings::default()
    };
    let twisted = TwistedMaterial::new(Material::uniaxial(1.5, 1.7), 1e-6, PI / 4.0, 20).unwrap();
    let layer = settings.inhomogeneous_layer(twisted).unwrap();
    assert_eq!(layer.evaluation(), SliceEvaluation::Symplectic);

    let back = settings.anisotropic_half_space(IsotropicMaterial::real(1.5).into());
    let structure = Arc::new(Structure::new(air(), vec![layer.into()], back));
    assert!(structure.evaluate(0.4, K0).is_ok());
}
