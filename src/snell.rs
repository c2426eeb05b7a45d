//! Snell's law and the geometry of reflection and refraction.
//!
//! This module turns an incident direction, a boundary normal and a pair of
//! refractive indices into the directions of the reflected and refracted rays.
//! It is the angular half of every boundary interaction; the power half lives
//! in [`crate::fresnel`].
//!
//! The implementation provides:
//! - Angle of incidence between a ray and a boundary normal
//! - Transmitted angle from Snell's law, with total internal reflection detection
//! - Critical angle for a pair of indices
//! - Mirror and refraction direction vectors
//!
//! # Mathematical Foundation
//!
//! - Snell's law: `n1 sin(theta_i) = n2 sin(theta_t)`
//! - Total internal reflection when `n1 sin(theta_i) > n2`
//! - Vector form of refraction for unit vectors, avoiding explicit rotations

use nalgebra::Vector2;


/// Computes the angle of incidence between a propagation vector and a boundary normal.
///
/// The result lies in `[0, pi/2]` regardless of which way the normal points.
pub fn get_theta_i(normal: &Vector2<f64>, prop: &Vector2<f64>) -> f64 {
    normal.dot(prop).abs().clamp(0.0, 1.0).acos()
}

/// Computes the transmitted angle using Snell's law.
///
/// **Context**: Every boundary crossing needs the refraction angle to build the
/// transmitted ray and to evaluate the Fresnel equations. When the light travels
/// from a denser into a less dense medium beyond the critical angle there is no
/// transmitted ray at all.
///
/// **How it Works**: Evaluates `sin(theta_t) = n1 sin(theta_i) / n2`. Returns `None`
/// when `n1 sin(theta_i) > n2` (total internal reflection). At exactly the critical
/// angle the transmitted ray grazes the boundary.
pub fn get_theta_t(theta_i: f64, n1: f64, n2: f64) -> Option<f64> {
    if n1 == n2 {
        return Some(theta_i);
    }

    let sin_theta_t = n1 * theta_i.sin() / n2;
    if sin_theta_t > 1.0 {
        None
    } else {
        Some(sin_theta_t.asin())
    }
}

/// Computes the critical angle for light travelling from `n1` into `n2`.
/// Only exists when `n1 > n2`.
pub fn critical_angle(n1: f64, n2: f64) -> Option<f64> {
    if n1 > n2 {
        Some((n2 / n1).asin())
    } else {
        None
    }
}

/// Returns the normal flipped, if needed, so that it points against the propagation vector.
fn facing_normal(norm: &Vector2<f64>, prop: &Vector2<f64>) -> Vector2<f64> {
    if norm.dot(prop) > 0.0 {
        -*norm
    } else {
        *norm
    }
}

/// Returns the mirrored propagation vector.
pub fn get_reflection_vector(norm: &Vector2<f64>, prop: &Vector2<f64>) -> Vector2<f64> {
    let n = facing_normal(norm, prop);
    let w = n.dot(prop); // -cos theta_i
    let result = prop - 2.0 * w * n;
    result.normalize()
}

/// Returns the transmitted propagation vector, where `eta` is `n1 / n2`.
///
/// **Context**: The refracted direction is needed in vector form to continue
/// tracing; computing it from angles would require knowing the handedness of the
/// crossing.
///
/// **How it Works**: With the normal facing the incoming ray and `cos_i = -n.d`,
/// the transmitted vector is `eta d + (eta cos_i - cos_t) n`. The caller must have
/// ruled out total internal reflection; the radicand is clamped at zero so that a
/// ray at exactly the critical angle leaves along the boundary.
pub fn get_refraction_vector(norm: &Vector2<f64>, prop: &Vector2<f64>, eta: f64) -> Vector2<f64> {
    let n = facing_normal(norm, prop);
    let cos_i = -n.dot(prop);
    let cos_t = (1.0 - eta * eta * (1.0 - cos_i * cos_i)).max(0.0).sqrt();
    let result = eta * prop + (eta * cos_i - cos_t) * n;
    result.normalize()
}
