//! Fresnel equations for the partition of power at a boundary.
//!
//! This module implements the Fresnel reflectance of unpolarised light at a
//! planar interface between two dielectrics. The reflectance decides how much of
//! an incident ray's power goes into the reflected ray; the remainder goes into
//! the refracted ray, so power is conserved exactly at every split.
//!
//! The Fresnel calculations provide:
//! - Reflection coefficients for s and p polarisations
//! - Unpolarised reflectance and transmittance as their average
//! - Grazing-incidence clamping so the formulas never divide by zero
//! - Total internal reflection as full reflectance

use crate::config::MAX_INCIDENCE_ANGLE;
use crate::snell::get_theta_t;

#[cfg(test)]
mod tests {

    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn normal_incidence_glass() {
        // ((n1 - n2) / (n1 + n2))^2 = 0.04
        let split = Split::new(0.0, 1.0, 1.5);
        assert!((split.reflectance - 0.04).abs() < 1e-12);
        assert!((split.transmittance - 0.96).abs() < 1e-12);
    }

    #[test]
    fn angle30_air_to_glass() {
        let split = Split::new(30.0 * PI / 180.0, 1.0, 1.5);
        assert!((split.reflectance - 0.0416).abs() < 1e-3, "R: {}", split.reflectance);
        assert!((split.reflectance + split.transmittance - 1.0).abs() < 1e-12);
        assert!(!split.is_tir());
    }

    #[test]
    fn total_internal_reflection() {
        let split = Split::new(45.0 * PI / 180.0, 1.5, 1.0);
        assert_eq!(split.reflectance, 1.0);
        assert_eq!(split.transmittance, 0.0);
        assert!(split.is_tir());
    }

    #[test]
    fn grazing_incidence_is_finite() {
        let split = Split::new(PI / 2.0, 1.0, 1.5);
        assert!(split.reflectance.is_finite());
        assert!(split.reflectance > 0.99);
    }

    #[test]
    fn transmittance_vanishes_at_critical_angle() {
        let critical = (1.0f64 / 1.5).asin();
        let below = Split::new(critical - 1e-4, 1.5, 1.0);
        assert!(below.theta_t.is_some());
        assert!(below.transmittance > 0.0 && below.transmittance < 0.2);
        let at = Split::new(critical, 1.5, 1.0);
        assert!(at.transmittance < 1e-6, "T: {}", at.transmittance);
    }

    #[test]
    fn matching_indices_transmit_everything() {
        let split = Split::new(0.8, 1.33, 1.33);
        assert_eq!(split.reflectance, 0.0);
        assert_eq!(split.transmittance, 1.0);
    }
}

/// The partition of an incident ray's power at one boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    pub theta_i: f64,         // clamped angle of incidence
    pub theta_t: Option<f64>, // transmitted angle, `None` under total internal reflection
    pub reflectance: f64,     // fraction of power reflected
    pub transmittance: f64,   // fraction of power transmitted, `1 - reflectance`
}

impl Split {
    /// Computes the Fresnel partition for light from `n1` into `n2`.
    ///
    /// **Context**: Rays carry a power fraction which must be shared between the
    /// reflected and refracted children so that the whole tree conserves energy.
    ///
    /// **How it Works**: The angle of incidence is first clamped below 90 degrees.
    /// If Snell's law has no solution the boundary totally reflects. Otherwise the
    /// s- and p-polarised amplitude coefficients are squared and averaged, and the
    /// transmittance is defined as the complement so that `R + T == 1`.
    pub fn new(theta_i: f64, n1: f64, n2: f64) -> Self {
        let theta_i = theta_i.clamp(0.0, MAX_INCIDENCE_ANGLE);

        let Some(theta_t) = get_theta_t(theta_i, n1, n2) else {
            return Self {
                theta_i,
                theta_t: None,
                reflectance: 1.0,
                transmittance: 0.0,
            };
        };

        let reflectance = reflectance(n1, n2, theta_i, theta_t);
        Self {
            theta_i,
            theta_t: Some(theta_t),
            reflectance,
            transmittance: 1.0 - reflectance,
        }
    }

    pub fn is_tir(&self) -> bool {
        self.theta_t.is_none()
    }
}

/// Computes the unpolarised Fresnel reflectance.
pub fn reflectance(n1: f64, n2: f64, theta_i: f64, theta_t: f64) -> f64 {
    let (rs, rp) = refl(n1, n2, theta_i, theta_t);
    (0.5 * (rs * rs + rp * rp)).clamp(0.0, 1.0)
}

/// Computes the Fresnel amplitude reflection coefficients `(r_s, r_p)`.
pub fn refl(n1: f64, n2: f64, theta_i: f64, theta_t: f64) -> (f64, f64) {
    let cti = theta_i.cos();
    let ctt = theta_t.cos();
    let rs = (n1 * cti - n2 * ctt) / (n1 * cti + n2 * ctt);
    let rp = (n2 * cti - n1 * ctt) / (n2 * cti + n1 * ctt);
    (rs, rp)
}
