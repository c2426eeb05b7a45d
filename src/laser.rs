use std::f64::consts::{FRAC_PI_2, PI};

use geo_types::Rect;
use nalgebra::{Point2, Vector2};
use serde::Serialize;

use crate::color::LaserColor;
use crate::config::{MAX_ANGLE_IN_WAVE_MODE, WHITE_LIGHT_WAVELENGTHS};
use crate::ray::Ray;


/// A light source that emits from `emission_point` toward `pivot`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Laser {
    pub emission_point: Point2<f64>,
    pub pivot: Point2<f64>, // rotation centre, also the aim point
    pub on: bool,
    pub color: LaserColor,
    pub wave: bool,         // wave representation instead of rays
    pub power: f64,         // fraction of full intensity
}

impl Laser {
    pub fn new(emission_point: Point2<f64>, pivot: Point2<f64>, color: LaserColor, power: f64) -> Self {
        Self {
            emission_point,
            pivot,
            on: true,
            color,
            wave: false,
            power,
        }
    }

    /// Unit vector from the emission point toward the pivot.
    pub fn direction(&self) -> Vector2<f64> {
        (self.pivot - self.emission_point)
            .try_normalize(0.0)
            .unwrap_or_else(Vector2::zeros)
    }

    /// Angle of the pivot-to-emission-point vector, from +x.
    pub fn angle(&self) -> f64 {
        let v = self.emission_point - self.pivot;
        v.y.atan2(v.x)
    }

    pub fn distance_from_pivot(&self) -> f64 {
        (self.emission_point - self.pivot).norm()
    }

    /// Whether the laser sits up and to the left of its pivot.
    pub fn top_left_quadrant(&self) -> bool {
        let angle = self.angle();
        angle > FRAC_PI_2 && angle <= PI
    }

    /// Rotates the emission point about the pivot to `angle`.
    ///
    /// In wave mode the laser may not be rotated past `MAX_ANGLE_IN_WAVE_MODE`
    /// while it sits in the top-left quadrant.
    pub fn set_angle(&mut self, angle: f64) {
        let in_top_left = angle > FRAC_PI_2 && angle <= PI;
        let angle = if self.wave && in_top_left && angle > MAX_ANGLE_IN_WAVE_MODE {
            MAX_ANGLE_IN_WAVE_MODE
        } else {
            angle
        };

        let distance = self.distance_from_pivot();
        self.emission_point = self.pivot + Vector2::new(angle.cos(), angle.sin()) * distance;
    }

    /// Moves the whole laser.
    pub fn translate(&mut self, delta: Vector2<f64>) {
        self.emission_point += delta;
        self.pivot += delta;
    }

    /// Moves the laser, keeping the emission point inside `bounds`.
    pub fn translate_within(&mut self, delta: Vector2<f64>, bounds: &Rect<f64>) {
        let target = constrain_location(self.emission_point + delta, bounds);
        self.translate(target - self.emission_point);
    }

    /// Vacuum wavelengths emitted, ascending.
    pub fn wavelengths(&self) -> Vec<f64> {
        match self.color {
            LaserColor::OneColor(wavelength) => vec![wavelength],
            LaserColor::White => WHITE_LIGHT_WAVELENGTHS.to_vec(),
        }
    }

    /// Builds the root rays, sharing the power equally between wavelengths.
    /// `index_at(point, wavelength)` gives the index of the medium at the emission point.
    pub fn emit<F>(&self, index_at: F) -> Vec<Ray>
    where
        F: Fn(&Point2<f64>, f64) -> f64,
    {
        let wavelengths = self.wavelengths();
        let power = self.power / wavelengths.len() as f64;
        wavelengths
            .into_iter()
            .map(|wavelength| {
                let n = index_at(&self.emission_point, wavelength);
                Ray::new(self.emission_point, self.direction(), power, wavelength, n)
            })
            .collect()
    }
}

/// Clamps a point into a rectangle.
pub fn constrain_location(point: Point2<f64>, bounds: &Rect<f64>) -> Point2<f64> {
    let (min, max) = (bounds.min(), bounds.max());
    Point2::new(point.x.clamp(min.x, max.x), point.y.clamp(min.y, max.y))
}
