//! Collections of evaluations and the coefficients derived from them.
//!
//! A [`ResultSet`] stores evaluations in a flat list or a rectangular grid
//! of any depth and serves named coefficients as `ndarray` arrays of the
//! same shape.
//! Names follow `<kind>[<sep><row><col>]`:
//!
//! | kind | quantity |
//! |---|---|
//! | `r`, `t` | amplitude reflection / transmission |
//! | `R`, `T` | power reflection / transmission |
//! | `Ψ` (`Psi`), `Δ` (`Delta`) | ellipsometric angles, degrees |
//!
//! `row` and `col` are `p`/`s` (linear basis) or `L`/`R` (circular basis),
//! and a bare kind stands for `pp`. `t_ps` is the transmitted `p` component
//! for an incident `s` wave.
//!
//! Derived tables are computed lazily. Requesting power transmission, a
//! circular coefficient or an ellipsometric angle enables that family for the
//! lifetime of the set, and every later recompute includes it.

use std::f64::consts::FRAC_1_SQRT_2;
use std::str::FromStr;

use log::debug;
use nalgebra::Matrix2;
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use crate::error::{BerremanError, Result};
use crate::evaluation::Evaluation;
use crate::Jones;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::config;
    use crate::halfspace::{AnisotropicHalfSpace, IsotropicHalfSpace};
    use crate::material::{IsotropicMaterial, Material};
    use crate::structure::Structure;
    use rand::Rng;
    use std::sync::Arc;

    const K0: f64 = config::DEFAULT_K0;

    fn interface(back: f64) -> Arc<Structure> {
        Arc::new(Structure::new(
            IsotropicHalfSpace::new(IsotropicMaterial::real(1.0)),
            vec![],
            IsotropicHalfSpace::new(IsotropicMaterial::real(back)),
        ))
    }

    fn sweep(n: usize) -> Vec<Evaluation> {
        let s = interface(1.5);
        (0..n)
            .map(|i| s.evaluate(0.1 * i as f64, K0).unwrap())
            .collect()
    }

    fn key(quantity: Quantity, basis: Basis, row: usize, col: usize) -> CoefficientKey {
        CoefficientKey {
            quantity,
            basis,
            row,
            col,
        }
    }

    #[test]
    fn parse_names() {
        use Basis::*;
        use Quantity::*;
        let cases = [
            ("r_sp", key(Reflection, Linear, 1, 0)),
            ("t_ps", key(Transmission, Linear, 0, 1)),
            ("T", key(TransmittedPower, Linear, 0, 0)),
            ("R_LR", key(ReflectedPower, Circular, 0, 1)),
            ("Ψ_ps", key(Psi, Linear, 0, 1)),
            ("Psi_ss", key(Psi, Linear, 1, 1)),
            ("Δ", key(Delta, Linear, 0, 0)),
            ("Delta-sp", key(Delta, Linear, 1, 0)),
        ];
        for (name, expected) in cases {
            assert_eq!(name.parse::<CoefficientKey>(), Ok(expected), "{}", name);
        }
        for name in ["x_pp", "r_pL", "Ψ_LR", "r_p", "r_pps", "rpp", "r_xx", ""] {
            assert_eq!(
                name.parse::<CoefficientKey>(),
                Err(BerremanError::UnknownCoefficient(name.to_string()))
            );
        }
    }

    #[test]
    fn flags_are_sticky_and_recompute_once() {
        let mut set = ResultSet::from_evaluations(sweep(3));
        assert!(set.is_dirty());
        set.get("r_ss").unwrap();
        assert!(!set.is_dirty());
        assert_eq!(set.derived(), DerivedQuantities::default());

        set.get("Ψ").unwrap();
        assert!(set.derived().ellipsometry);
        set.get("r_ss").unwrap();
        assert!(set.derived().ellipsometry && !set.derived().circular);

        set.push(sweep(1).remove(0));
        assert!(set.is_dirty());
        // still served after the recompute without asking again
        let psi = set.get("Psi_pp").unwrap();
        assert!(!set.is_dirty());
        assert_eq!(psi.shape(), &[4]);
        assert!(set.derived().ellipsometry);
    }

    #[test]
    fn enabling_up_front() {
        let mut set =
            ResultSet::from_evaluations(sweep(2)).with_derived(DerivedQuantities::all());
        set.get("r").unwrap();
        let before = set.derived();
        set.get("T_LR").unwrap();
        set.get("Δ_ss").unwrap();
        assert_eq!(set.derived(), before);
        assert!(!set.is_dirty());
    }

    #[test]
    fn empty_set() {
        let mut set = ResultSet::new();
        assert_eq!(set.get("r").unwrap_err(), BerremanError::EmptyResultSet);
        assert_eq!(set.kx().shape(), &[0]);
    }

    #[test]
    fn unknown_names_do_not_enable_anything() {
        let mut set = ResultSet::from_evaluations(sweep(2));
        assert!(set.get("Ψ_LL").is_err());
        assert_eq!(set.derived(), DerivedQuantities::default());
    }

    #[test]
    fn energy_conservation_per_element() {
        let mut set = ResultSet::from_evaluations(sweep(9));
        for pol in ["pp", "ss"] {
            let r = set.get(&format!("R_{}", pol)).unwrap();
            let t = set.get(&format!("T_{}", pol)).unwrap();
            let sum = r.as_real().unwrap() + t.as_real().unwrap();
            assert!(sum.iter().all(|x| (x - 1.0).abs() < 1e-12));
        }
    }

    #[test]
    fn undefined_power_transmission() {
        let s = Arc::new(Structure::new(
            IsotropicHalfSpace::new(IsotropicMaterial::real(1.0)),
            vec![],
            AnisotropicHalfSpace::new(Material::uniaxial(1.5, 1.7)),
        ));
        let mut set = ResultSet::from_evaluations(vec![s.evaluate(0.2, K0).unwrap()]);
        assert!(set.get("R_pp").is_ok());
        assert_eq!(
            set.get("T_pp").unwrap_err(),
            BerremanError::PowerTransmissionUndefined
        );
        assert_eq!(
            set.get("T_RR").unwrap_err(),
            BerremanError::PowerTransmissionUndefined
        );
        assert!(set.get("t_ss").is_ok());
    }

    #[test]
    fn grid_shape() {
        let mut set = ResultSet::new();
        set.push_row(sweep(3)).unwrap();
        set.push_row(sweep(3)).unwrap();
        assert_eq!(set.shape(), vec![2, 3]);
        assert_eq!(
            set.push_row(sweep(2)).unwrap_err(),
            BerremanError::RaggedResultSet {
                expected: 3,
                got: 2
            }
        );

        let r = set.get("r_ss").unwrap();
        assert_eq!(r.shape(), &[2, 3]);
        let kx = set.kx();
        assert_eq!(kx[[1, 2]], Complex64::new(0.2, 0.0));

        set.replace(4, sweep(1).remove(0));
        assert_eq!(set.shape(), vec![2, 3]);
        assert!(set.is_dirty());

        set.remove(0);
        assert_eq!(set.shape(), vec![5]);
    }

    #[test]
    fn flat_set_becomes_grid() {
        let mut set = ResultSet::from_evaluations(sweep(2));
        set.push_row(sweep(2)).unwrap();
        assert_eq!(set.shape(), vec![2, 2]);
        set.extend(sweep(1));
        assert_eq!(set.shape(), vec![5]);
        assert!(set.pop().is_some());
        set.insert(0, sweep(1).remove(0));
        assert_eq!(set.len(), 5);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.shape(), vec![0]);
    }

    #[test]
    fn nested_shape() {
        let s = interface(1.5);
        let evaluations = (0..12)
            .map(|i| s.evaluate(i as f64 / 16.0, K0).unwrap())
            .collect();
        let mut set = ResultSet::from_shape(evaluations, &[2, 2, 3]).unwrap();
        assert_eq!(set.shape(), vec![2, 2, 3]);
        let r = set.get("R_ss").unwrap();
        assert_eq!(r.shape(), &[2, 2, 3]);
        let kx = set.kx();
        // row-major: [1, 0, 2] is evaluation 1·6 + 0·3 + 2
        assert_eq!(kx[[1, 0, 2]], Complex64::new(0.5, 0.0));
        assert_eq!(kx[[0, 1, 1]], Complex64::new(0.25, 0.0));

        set.push_row(sweep(6)).unwrap();
        assert_eq!(set.shape(), vec![3, 2, 3]);
        assert_eq!(
            set.push_row(sweep(3)).unwrap_err(),
            BerremanError::RaggedResultSet {
                expected: 6,
                got: 3
            }
        );
        assert_eq!(
            set.reshape(&[4, 5]).unwrap_err(),
            BerremanError::ShapeMismatch {
                len: 18,
                shape: vec![4, 5]
            }
        );
        assert!(set.reshape(&[]).is_err());
        set.reshape(&[18]).unwrap();
        assert_eq!(set.shape(), vec![18]);
        assert!(set.is_dirty());
    }

    #[test]
    fn from_grid_validates() {
        assert!(ResultSet::from_grid(vec![sweep(2), sweep(2)]).is_ok());
        assert!(ResultSet::from_grid(vec![sweep(2), sweep(3)]).is_err());
    }

    #[test]
    fn circular_basis() {
        let a = Complex64::new(0.3, -0.2);
        let isotropic = Jones::identity() * a;
        // reflection swaps handedness
        let r = circular_jones(&isotropic, Direction::Reflection);
        let zero = Complex64::from(0.0);
        assert!((r - Matrix2::new(zero, a, a, zero)).norm() < 1e-15);
        let t = circular_jones(&isotropic, Direction::Transmission);
        assert!((t - isotropic).norm() < 1e-15);

        let mut set = ResultSet::from_evaluations(sweep(4));
        let rc = set.get("R_LR").unwrap();
        let rpp = set.get("R_pp").unwrap();
        let rss = set.get("R_ss").unwrap();
        let (rc, rpp, rss) = (
            rc.as_real().unwrap(),
            rpp.as_real().unwrap(),
            rss.as_real().unwrap(),
        );
        for i in 0..4 {
            // |r_LR|² = |r_pp + r_ss|² / 4 ≤ (R_pp + R_ss) / 2
            assert!(rc[[i]] <= 0.5 * (rpp[[i]] + rss[[i]]) + 1e-12);
        }
        assert!(set.derived().circular);
    }

    #[test]
    fn ellipsometry_of_isotropic_sample() {
        let (rp, rs) = (Complex64::new(-0.1, 0.05), Complex64::new(-0.3, 0.02));
        let j = Jones::new(rp, Complex64::from(0.0), Complex64::from(0.0), rs);
        let (psi, delta) = ellipsometry_parameters(&j);
        assert!((psi[(1, 1)] - 45.0).abs() < 1e-12);
        assert!(delta[(1, 1)].abs() < 1e-12);
        let expected = (rp / rs).norm().atan().to_degrees();
        assert!((psi[(0, 0)] - expected).abs() < 1e-12);
        assert!(psi[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn ellipsometry_round_trip() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let mut psi = Matrix2::from_fn(|_, _| rng.random_range(1.0..89.0));
            let mut delta = Matrix2::from_fn(|_, _| rng.random_range(-179.0..179.0));
            let r_ss =
                Complex64::from_polar(rng.random_range(0.1..1.0), rng.random_range(-3.0..3.0));
            psi[(1, 1)] = 45.0;
            delta[(1, 1)] = 0.0;

            let j = jones_from_ellipsometry(&psi, &delta, r_ss);
            assert!((j[(1, 1)] - r_ss).norm() < 1e-12);
            let (psi2, delta2) = ellipsometry_parameters(&j);
            assert!((psi2 - psi).norm() < 1e-9);
            assert!((delta2 - delta).norm() < 1e-9);
        }
    }
}

/// Physical quantity addressed by a coefficient name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// `r`
    Reflection,
    /// `t`
    Transmission,
    /// `R`
    ReflectedPower,
    /// `T`
    TransmittedPower,
    /// `Ψ`
    Psi,
    /// `Δ`
    Delta,
}

/// Polarization basis of a coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// `(p, s)`
    Linear,
    /// `(L, R)`
    Circular,
}

/// Parsed coefficient name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoefficientKey {
    pub quantity: Quantity,
    pub basis: Basis,
    /// Output polarization index (`p`, `L` → 0; `s`, `R` → 1).
    pub row: usize,
    /// Input polarization index.
    pub col: usize,
}

const KINDS: [(&str, Quantity); 8] = [
    ("Psi", Quantity::Psi),
    ("Delta", Quantity::Delta),
    ("Ψ", Quantity::Psi),
    ("Δ", Quantity::Delta),
    ("r", Quantity::Reflection),
    ("t", Quantity::Transmission),
    ("R", Quantity::ReflectedPower),
    ("T", Quantity::TransmittedPower),
];

fn polar_index(c: char) -> Option<(Basis, usize)> {
    match c {
        'p' => Some((Basis::Linear, 0)),
        's' => Some((Basis::Linear, 1)),
        'L' => Some((Basis::Circular, 0)),
        'R' => Some((Basis::Circular, 1)),
        _ => None,
    }
}

impl FromStr for CoefficientKey {
    type Err = BerremanError;

    fn from_str(name: &str) -> Result<Self> {
        let unknown = || BerremanError::UnknownCoefficient(name.to_string());
        let (quantity, rest) = KINDS
            .iter()
            .find_map(|(prefix, quantity)| name.strip_prefix(prefix).map(|rest| (*quantity, rest)))
            .ok_or_else(unknown)?;

        if rest.is_empty() {
            return Ok(Self {
                quantity,
                basis: Basis::Linear,
                row: 0,
                col: 0,
            });
        }

        let mut chars = rest.chars();
        let (Some(sep), Some(row), Some(col), None) =
            (chars.next(), chars.next(), chars.next(), chars.next())
        else {
            return Err(unknown());
        };
        if sep.is_alphanumeric() {
            return Err(unknown());
        }
        let ((row_basis, row), (col_basis, col)) = polar_index(row)
            .zip(polar_index(col))
            .ok_or_else(unknown)?;
        if row_basis != col_basis {
            return Err(unknown());
        }
        if row_basis == Basis::Circular && matches!(quantity, Quantity::Psi | Quantity::Delta) {
            return Err(unknown());
        }
        Ok(Self {
            quantity,
            basis: row_basis,
            row,
            col,
        })
    }
}

impl CoefficientKey {
    /// Derived families needed to serve this coefficient.
    pub fn required(&self) -> DerivedQuantities {
        DerivedQuantities {
            power_transmission: self.quantity == Quantity::TransmittedPower,
            circular: self.basis == Basis::Circular,
            ellipsometry: matches!(self.quantity, Quantity::Psi | Quantity::Delta),
        }
    }
}

/// Families of derived tables a [`ResultSet`] computes on every recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedQuantities {
    pub power_transmission: bool,
    pub circular: bool,
    pub ellipsometry: bool,
}

impl DerivedQuantities {
    pub fn all() -> Self {
        Self {
            power_transmission: true,
            circular: true,
            ellipsometry: true,
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            power_transmission: self.power_transmission || other.power_transmission,
            circular: self.circular || other.circular,
            ellipsometry: self.ellipsometry || other.ellipsometry,
        }
    }
}

/// Array returned by [`ResultSet::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum CoefficientArray {
    /// `r` and `t`
    Complex(ArrayD<Complex64>),
    /// `R`, `T`, `Ψ` and `Δ`
    Real(ArrayD<f64>),
}

impl CoefficientArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Complex(array) => array.shape(),
            Self::Real(array) => array.shape(),
        }
    }

    pub fn as_complex(&self) -> Option<&ArrayD<Complex64>> {
        match self {
            Self::Complex(array) => Some(array),
            Self::Real(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Real(array) => Some(array),
            Self::Complex(_) => None,
        }
    }

    /// Complex view of any coefficient; real values get a zero imaginary part.
    pub fn into_complex(self) -> ArrayD<Complex64> {
        match self {
            Self::Complex(array) => array,
            Self::Real(array) => array.mapv(Complex64::from),
        }
    }
}

/// Propagation direction of a Jones matrix, which fixes the handedness
/// convention of the circular basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Reflection,
    Transmission,
}

fn basis_matrices() -> (Jones, Jones) {
    let one = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let i = Complex64::new(0.0, FRAC_1_SQRT_2);
    let c = Jones::new(one, one, i, -i);
    let d = Jones::new(one, one, -i, i);
    (c, d)
}

/// Jones matrix in the circular `(L, R)` basis: `D⁻¹ J C` for reflection and
/// `C⁻¹ J C` for transmission.
pub fn circular_jones(j: &Jones, direction: Direction) -> Jones {
    let (c, d) = basis_matrices();
    // C and D are unitary
    let left = match direction {
        Direction::Reflection => d.adjoint(),
        Direction::Transmission => c.adjoint(),
    };
    left * j * c
}

/// Ellipsometric angles `(Ψ, Δ)` in degrees of a reflection Jones matrix.
///
/// ```text
/// T_ri / r_ss = [[ -tan(Ψ_pp) e^{-iΔ_pp}, -tan(Ψ_ps) e^{-iΔ_ps} ],
///                [  tan(Ψ_sp) e^{-iΔ_sp},  1                    ]]
/// ```
///
/// so that `Ψ_ss = 45°` and `Δ_ss = 0°`.
pub fn ellipsometry_parameters(j: &Jones) -> (Matrix2<f64>, Matrix2<f64>) {
    let mut s = j / j[(1, 1)];
    s.row_mut(0).neg_mut();
    let psi = s.map(|x| x.norm().atan().to_degrees());
    let delta = s.map(|x| -x.arg().to_degrees());
    (psi, delta)
}

/// Reflection Jones matrix with the given ellipsometric angles (degrees) and
/// `r_ss`.
pub fn jones_from_ellipsometry(psi: &Matrix2<f64>, delta: &Matrix2<f64>, r_ss: Complex64) -> Jones {
    let mut s = psi.zip_map(delta, |psi, delta| {
        Complex64::from_polar(psi.to_radians().tan(), -delta.to_radians())
    });
    s.row_mut(0).neg_mut();
    s * r_ss
}

/// Flat list of per-evaluation 2x2 tables, in evaluation order.
#[derive(Debug, Clone, Default)]
struct Tables {
    reflection: Vec<Jones>,
    transmission: Vec<Jones>,
    reflectance: Vec<Matrix2<f64>>,
    transmittance: Option<Vec<Matrix2<f64>>>,
    circular_reflection: Vec<Jones>,
    circular_transmission: Vec<Jones>,
    circular_reflectance: Vec<Matrix2<f64>>,
    circular_transmittance: Option<Vec<Matrix2<f64>>>,
    psi: Vec<Matrix2<f64>>,
    delta: Vec<Matrix2<f64>>,
}

impl Tables {
    fn compute(evaluations: &[Evaluation], derived: DerivedQuantities) -> Self {
        let power = |jones: &Jones| jones.map(|x| x.norm_sqr());
        let corrections: Option<Vec<f64>> =
            evaluations.iter().map(|e| e.power_correction()).collect();
        let transmitted = |jones: &[Jones]| {
            corrections.as_ref().map(|corrections| {
                jones
                    .iter()
                    .zip(corrections)
                    .map(|(t, corr)| power(t) * *corr)
                    .collect::<Vec<_>>()
            })
        };

        let mut tables = Self {
            reflection: evaluations.iter().map(|e| *e.reflection()).collect(),
            transmission: evaluations.iter().map(|e| *e.transmission()).collect(),
            ..Self::default()
        };
        tables.reflectance = tables.reflection.iter().map(power).collect();

        if derived.power_transmission {
            tables.transmittance = transmitted(&tables.transmission);
        }

        if derived.circular {
            tables.circular_reflection = tables
                .reflection
                .iter()
                .map(|j| circular_jones(j, Direction::Reflection))
                .collect();
            tables.circular_transmission = tables
                .transmission
                .iter()
                .map(|j| circular_jones(j, Direction::Transmission))
                .collect();
            tables.circular_reflectance = tables.circular_reflection.iter().map(power).collect();
            tables.circular_transmittance = transmitted(&tables.circular_transmission);
        }

        if derived.ellipsometry {
            (tables.psi, tables.delta) = tables
                .reflection
                .iter()
                .map(ellipsometry_parameters)
                .unzip();
        }
        tables
    }
}

/// Ordered collection of evaluations with lazily derived coefficients.
///
/// Evaluations are stored in row-major order. Every mutation marks the set
/// dirty; the next [`get`](Self::get) recomputes all enabled tables once.
/// Element-wise mutations (`push`, `insert`, `remove`, `pop`, `extend`)
/// flatten a grid, `push_row`, `replace` and `reshape` keep or set it.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    evaluations: Vec<Evaluation>,
    inner: Vec<usize>, // trailing dimensions, empty when flat
    derived: DerivedQuantities,
    dirty: bool,
    tables: Option<Tables>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_evaluations(evaluations: Vec<Evaluation>) -> Self {
        Self {
            evaluations,
            dirty: true,
            ..Self::default()
        }
    }

    /// Grid of evaluations, one inner vector per row.
    pub fn from_grid(rows: Vec<Vec<Evaluation>>) -> Result<Self> {
        let mut set = Self::new();
        for row in rows {
            set.push_row(row)?;
        }
        Ok(set)
    }

    /// Row-major evaluations laid out with an arbitrary `shape`.
    pub fn from_shape(evaluations: Vec<Evaluation>, shape: &[usize]) -> Result<Self> {
        let mut set = Self::from_evaluations(evaluations);
        set.reshape(shape)?;
        Ok(set)
    }

    pub fn with_derived(mut self, derived: DerivedQuantities) -> Self {
        self.enable(derived);
        self
    }

    /// Enables derived families. They stay enabled for the lifetime of the
    /// set.
    pub fn enable(&mut self, derived: DerivedQuantities) {
        let merged = self.derived.union(derived);
        if merged != self.derived {
            self.derived = merged;
            self.dirty = true;
        }
    }

    pub fn derived(&self) -> DerivedQuantities {
        self.derived
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    /// `[n]` for a flat set, `[rows, columns, ...]` for a grid.
    pub fn shape(&self) -> Vec<usize> {
        let block: usize = self.inner.iter().product();
        let mut shape = vec![self.len() / block];
        shape.extend(&self.inner);
        shape
    }

    /// Lays the evaluations out as `shape`, whose dimensions must multiply
    /// to the number of evaluations.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<()> {
        let mismatch = || BerremanError::ShapeMismatch {
            len: self.len(),
            shape: shape.to_vec(),
        };
        let (_, inner) = shape.split_first().ok_or_else(mismatch)?;
        if shape.iter().product::<usize>() != self.len() || inner.contains(&0) {
            return Err(mismatch());
        }
        self.inner = inner.to_vec();
        self.dirty = true;
        Ok(())
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn push(&mut self, evaluation: Evaluation) {
        self.touch_flat();
        self.evaluations.push(evaluation);
    }

    /// Appends a row, the row-major block of one index along the first
    /// dimension. A non-empty flat set counts as a single row. An empty row
    /// is ignored.
    pub fn push_row(&mut self, row: Vec<Evaluation>) -> Result<()> {
        if row.is_empty() {
            return Ok(());
        }
        let expected = if !self.inner.is_empty() {
            self.inner.iter().product()
        } else if self.is_empty() {
            row.len()
        } else {
            self.len()
        };
        if row.len() != expected {
            return Err(BerremanError::RaggedResultSet {
                expected,
                got: row.len(),
            });
        }
        if self.inner.is_empty() {
            self.inner = vec![expected];
        }
        self.dirty = true;
        self.evaluations.extend(row);
        Ok(())
    }

    /// Inserts at a flat index.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, evaluation: Evaluation) {
        self.touch_flat();
        self.evaluations.insert(index, evaluation);
    }

    /// Removes the evaluation at a flat index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Evaluation {
        self.touch_flat();
        self.evaluations.remove(index)
    }

    /// Replaces the evaluation at a flat index, keeping the shape.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn replace(&mut self, index: usize, evaluation: Evaluation) -> Evaluation {
        self.dirty = true;
        std::mem::replace(&mut self.evaluations[index], evaluation)
    }

    pub fn pop(&mut self) -> Option<Evaluation> {
        self.touch_flat();
        self.evaluations.pop()
    }

    pub fn clear(&mut self) {
        self.touch_flat();
        self.evaluations.clear();
        self.tables = None;
    }

    fn touch_flat(&mut self) {
        self.inner.clear();
        self.dirty = true;
    }

    /// Reduced wavenumbers of the evaluations.
    pub fn kx(&self) -> ArrayD<Complex64> {
        self.array(|i| self.evaluations[i].kx())
    }

    /// Vacuum wavenumbers of the evaluations.
    pub fn k0(&self) -> ArrayD<f64> {
        self.array(|i| self.evaluations[i].k0())
    }

    /// Coefficient array for `name`, shaped like the set.
    pub fn get(&mut self, name: &str) -> Result<CoefficientArray> {
        let key: CoefficientKey = name.parse()?;
        self.enable(key.required());
        if self.is_empty() {
            return Err(BerremanError::EmptyResultSet);
        }
        if self.dirty || self.tables.is_none() {
            self.update();
        }
        let Some(tables) = &self.tables else {
            return Err(BerremanError::EmptyResultSet);
        };

        let (row, col) = (key.row, key.col);
        let complex =
            |values: &[Jones]| CoefficientArray::Complex(self.array(|i| values[i][(row, col)]));
        let real =
            |values: &[Matrix2<f64>]| CoefficientArray::Real(self.array(|i| values[i][(row, col)]));
        let circular = key.basis == Basis::Circular;

        let array = match key.quantity {
            Quantity::Reflection if circular => complex(&tables.circular_reflection),
            Quantity::Reflection => complex(&tables.reflection),
            Quantity::Transmission if circular => complex(&tables.circular_transmission),
            Quantity::Transmission => complex(&tables.transmission),
            Quantity::ReflectedPower if circular => real(&tables.circular_reflectance),
            Quantity::ReflectedPower => real(&tables.reflectance),
            Quantity::TransmittedPower => {
                let values = if circular {
                    &tables.circular_transmittance
                } else {
                    &tables.transmittance
                };
                real(values.as_ref().ok_or(BerremanError::PowerTransmissionUndefined)?)
            }
            Quantity::Psi => real(&tables.psi),
            Quantity::Delta => real(&tables.delta),
        };
        Ok(array)
    }

    /// Rebuilds every enabled table from the evaluations.
    fn update(&mut self) {
        debug!(
            "recomputing {} evaluations with {:?}",
            self.len(),
            self.derived
        );
        self.tables = Some(Tables::compute(&self.evaluations, self.derived));
        self.dirty = false;
    }

    /// Array of the set's shape filled from flat indices.
    fn array<T, F>(&self, value: F) -> ArrayD<T>
    where
        F: Fn(usize) -> T,
    {
        let shape = self.shape();
        ArrayD::from_shape_fn(IxDyn(&shape), |index| {
            let flat = shape
                .iter()
                .enumerate()
                .fold(0, |flat, (axis, dim)| flat * dim + index[axis]);
            value(flat)
        })
    }
}

impl Extend<Evaluation> for ResultSet {
    fn extend<I: IntoIterator<Item = Evaluation>>(&mut self, iter: I) {
        self.touch_flat();
        self.evaluations.extend(iter);
    }
}

impl FromIterator<Evaluation> for ResultSet {
    fn from_iter<I: IntoIterator<Item = Evaluation>>(iter: I) -> Self {
        Self::from_evaluations(iter.into_iter().collect())
    }
}
