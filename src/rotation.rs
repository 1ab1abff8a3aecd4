//! Rotation matrices for orienting anisotropic materials.
//!
//! If `A` is a vector, `R * A` is the rotated vector. A tensor is rotated as
//! `R * ε * Rᵀ` (see [`crate::material::Material::rotated`]).

use nalgebra::{Matrix3, Rotation3, Vector3};


/// Rotation defined by Euler angles `(p, n, r)` with successive rotations
/// about z, x' and z'.
///
/// `p` is the precession, `n` the nutation and `r` the proper rotation. The
/// inverse rotation is `(-r, -n, -p)`.
pub fn rotation_euler(p: f64, n: f64, r: f64) -> Matrix3<f64> {
    let (s1, c1) = p.sin_cos();
    let (s2, c2) = n.sin_cos();
    let (s3, c3) = r.sin_cos();
    Matrix3::new(
        c1 * c3 - s1 * c2 * s3,
        -c1 * s3 - s1 * c2 * c3,
        s1 * s2,
        s1 * c3 + c1 * c2 * s3,
        -s1 * s3 + c1 * c2 * c3,
        -c1 * s2,
        s2 * s3,
        s2 * c3,
        c2,
    )
}

/// Rotation `exp(W)` defined by a rotation vector, with `W` the cross-product
/// matrix of `v`. The magnitude of `v` is the angle. The inverse is `-v`.
pub fn rotation_vector(v: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*v).into_inner()
}

/// Rotation by `theta` about the unit vector `v`.
///
/// Computed as `I + W sinθ + W²(1 - cosθ)`; `v` is not renormalized.
pub fn rotation_axis_angle(v: &Vector3<f64>, theta: f64) -> Matrix3<f64> {
    let w = v.cross_matrix();
    Matrix3::identity() + w * theta.sin() + w * w * (1.0 - theta.cos())
}
