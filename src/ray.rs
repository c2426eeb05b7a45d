use std::f64::consts::TAU;

use log::warn;
use nalgebra::{Point2, Vector2};
use serde::Serialize;

use crate::config::{SPEED_OF_LIGHT, VEC_LENGTH_THRESHOLD};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn wavelength_shrinks_in_medium() {
        let ray = Ray::new(Point2::origin(), Vector2::new(3.0, 4.0), 1.0, 650e-9, 1.5);
        assert!((ray.direction.norm() - 1.0).abs() < 1e-12);
        assert!((ray.wavelength_in_medium - 650e-9 / 1.5).abs() < 1e-20);
        assert!((ray.frequency - SPEED_OF_LIGHT / 650e-9).abs() < 1.0);
    }

    #[test]
    fn frequency_survives_medium_change() {
        let ray = Ray::new(Point2::origin(), Vector2::x(), 1.0, 500e-9, 1.0);
        let child = ray.spawn(Point2::new(1.0, 0.0), Vector2::y(), 0.5, 1.33, 0.0);
        assert_eq!(child.frequency, ray.frequency);
        assert_eq!(child.wavelength, ray.wavelength);
        assert!((child.wavelength_in_medium - 500e-9 / 1.33).abs() < 1e-20);
        assert!((child.base_wavelength() - 500e-9).abs() < 1e-18);
    }

    #[test]
    fn zero_direction_falls_back() {
        let ray = Ray::new(Point2::origin(), Vector2::zeros(), 1.0, 650e-9, 1.0);
        assert_eq!(ray.direction, Vector2::x());
    }

    #[test]
    fn phase_accumulates_along_segment() {
        let ray = Ray::new(Point2::origin(), Vector2::x(), 1.0, 1.0, 1.0);
        // a quarter wavelength in
        assert!((ray.phase_after(0.25) - TAU / 4.0).abs() < 1e-12);
        // a whole number of wavelengths wraps to zero
        let wrapped = ray.phase_after(3.0);
        assert!(wrapped < 1e-9 || TAU - wrapped < 1e-9, "wrapped: {}", wrapped);
    }
}

/// A single immutable ray: a half-line with power, wavelength and medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ray {
    pub origin: Point2<f64>,       // tail of the ray
    pub direction: Vector2<f64>,   // unit propagation vector
    pub power: f64,                // fraction of the laser power, 0..=1
    pub wavelength: f64,           // wavelength in vacuum (m)
    pub wavelength_in_medium: f64, // wavelength in the current medium (m)
    pub refractive_index: f64,     // index of the medium the ray travels through
    pub frequency: f64,            // invariant along the lineage (Hz)
    pub phase: f64,                // optical phase at the origin, in [0, 2pi)
}

impl Ray {
    /// Makes a new `Ray`, normalising the direction.
    pub fn new(
        origin: Point2<f64>,
        direction: Vector2<f64>,
        power: f64,
        wavelength: f64,
        refractive_index: f64,
    ) -> Self {
        Self::build(
            origin,
            direction,
            power,
            wavelength,
            SPEED_OF_LIGHT / wavelength,
            refractive_index,
            0.0,
        )
    }

    fn build(
        origin: Point2<f64>,
        direction: Vector2<f64>,
        power: f64,
        wavelength: f64,
        frequency: f64,
        refractive_index: f64,
        phase: f64,
    ) -> Self {
        let direction = match direction.try_normalize(VEC_LENGTH_THRESHOLD) {
            Some(unit) => unit,
            None => {
                warn!("degenerate ray direction {:?}, using +x", direction);
                Vector2::x()
            }
        };

        Self {
            origin,
            direction,
            power,
            wavelength,
            wavelength_in_medium: wavelength / refractive_index,
            refractive_index,
            frequency,
            phase: phase.rem_euclid(TAU),
        }
    }

    /// Creates a child ray of the same frequency in a (possibly) new medium.
    pub fn spawn(
        &self,
        origin: Point2<f64>,
        direction: Vector2<f64>,
        power: f64,
        refractive_index: f64,
        phase: f64,
    ) -> Ray {
        Self::build(
            origin,
            direction,
            power,
            self.wavelength,
            self.frequency,
            refractive_index,
            phase,
        )
    }

    /// Gets the wavelength for this ray if it wasn't inside a medium.
    pub fn base_wavelength(&self) -> f64 {
        SPEED_OF_LIGHT / self.frequency
    }

    /// Phase velocity in the current medium.
    pub fn speed(&self) -> f64 {
        SPEED_OF_LIGHT / self.refractive_index
    }

    /// Point at distance `t` along the ray.
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        self.origin + self.direction * t
    }

    /// Optical phase after travelling `distance` from the origin, wrapped to [0, 2pi).
    pub fn phase_after(&self, distance: f64) -> f64 {
        let phase = (self.phase + TAU * distance / self.wavelength_in_medium).rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU
        if phase >= TAU {
            0.0
        } else {
            phase
        }
    }

    /// Angle of the direction vector from +x, in radians.
    pub fn angle(&self) -> f64 {
        self.direction.y.atan2(self.direction.x)
    }
}

/// How a ray came to exist. Each variant carries the ray itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "ray", rename_all = "lowercase")]
pub enum Branch {
    Incident(Ray),  // emitted by the laser
    Reflected(Ray), // mirrored at a boundary, same medium
    Refracted(Ray), // transmitted through a boundary, new medium
}

impl Branch {
    pub fn ray(&self) -> &Ray {
        match self {
            Branch::Incident(ray) => ray,
            Branch::Reflected(ray) => ray,
            Branch::Refracted(ray) => ray,
        }
    }

    pub fn is_reflected(&self) -> bool {
        matches!(self, Branch::Reflected(_))
    }

    pub fn is_refracted(&self) -> bool {
        matches!(self, Branch::Refracted(_))
    }
}

/// Identity of a ray within one propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RayId {
    pub pass: u64,    // propagation pass that produced the ray
    pub index: usize, // position in the flattened tree
}
