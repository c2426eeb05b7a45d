//! Colour/wavelength mapping for rays and wave particles.
//!
//! Wavelengths are looked up in a fixed visible-spectrum table sampled every
//! 20 nm and linearly interpolated between samples. Wavelengths outside the table
//! clamp to the nearest endpoint. White light maps to white.

use ndarray::{arr2, Array2};
use serde::{Deserialize, Serialize};

use crate::config::STRIPE_DARKNESS;
use crate::ray::Ray;

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{Point2, Vector2};

    #[test]
    fn table_samples_are_exact() {
        assert_eq!(wavelength_nm_to_color(440.0), Color::rgb(0, 0, 255));
        assert_eq!(wavelength_nm_to_color(580.0), Color::rgb(255, 255, 0));
        assert_eq!(wavelength_nm_to_color(650.0), Color::rgb(255, 0, 0).blend_toward(Color::rgb(255, 33, 0), 0.5));
    }

    #[test]
    fn interpolates_between_samples() {
        let color = wavelength_nm_to_color(450.0);
        assert_eq!((color.r, color.b), (0, 255));
        assert!(color.g > 50 && color.g < 70, "g: {}", color.g);
    }

    #[test]
    fn clamps_outside_visible_range() {
        assert_eq!(wavelength_nm_to_color(200.0), wavelength_nm_to_color(380.0));
        assert_eq!(wavelength_nm_to_color(1000.0), wavelength_nm_to_color(780.0));
        assert_eq!(wavelength_nm_to_color(f64::NAN), wavelength_nm_to_color(380.0));
    }

    #[test]
    fn white_is_white() {
        assert_eq!(map_wavelength_to_color(LaserColor::White), Color::WHITE);
        assert_eq!(
            map_wavelength_to_color(LaserColor::OneColor(440e-9)),
            Color::rgb(0, 0, 255)
        );
    }

    #[test]
    fn ray_alpha_follows_power() {
        let ray = Ray::new(Point2::origin(), Vector2::x(), 0.25, 650e-9, 1.0);
        let color = ray_color(&ray);
        assert!((color.a - 0.5).abs() < 1e-12);
    }

    #[test]
    fn darker_keeps_alpha() {
        let color = Color { r: 200, g: 100, b: 10, a: 0.7 };
        let dark = color.darker(0.3);
        assert_eq!((dark.r, dark.g, dark.b), (60, 30, 3));
        assert_eq!(dark.a, 0.7);
    }
}

/// Visible spectrum samples, one row per 20 nm: `[wavelength (nm), r, g, b]`.
const SPECTRUM: [[f64; 4]; 21] = [
    [380.0, 97.0, 0.0, 97.0],
    [400.0, 131.0, 0.0, 181.0],
    [420.0, 106.0, 0.0, 255.0],
    [440.0, 0.0, 0.0, 255.0],
    [460.0, 0.0, 123.0, 255.0],
    [480.0, 0.0, 213.0, 255.0],
    [500.0, 0.0, 255.0, 146.0],
    [520.0, 54.0, 255.0, 0.0],
    [540.0, 129.0, 255.0, 0.0],
    [560.0, 195.0, 255.0, 0.0],
    [580.0, 255.0, 255.0, 0.0],
    [600.0, 255.0, 190.0, 0.0],
    [620.0, 255.0, 119.0, 0.0],
    [640.0, 255.0, 33.0, 0.0],
    [660.0, 255.0, 0.0, 0.0],
    [680.0, 255.0, 0.0, 0.0],
    [700.0, 255.0, 0.0, 0.0],
    [720.0, 219.0, 0.0, 0.0],
    [740.0, 181.0, 0.0, 0.0],
    [760.0, 141.0, 0.0, 0.0],
    [780.0, 97.0, 0.0, 0.0],
];

/// What a laser emits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LaserColor {
    OneColor(f64), // vacuum wavelength (m)
    White,
}

/// A display colour with 8-bit channels and a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 1.0 };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    /// Scales the channels toward black. `factor` of 1 leaves the colour unchanged.
    pub fn darker(self, factor: f64) -> Self {
        let scale = |c: u8| (c as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }

    /// Linear blend toward `other` by `t` in [0, 1].
    pub fn blend_toward(self, other: Color, t: f64) -> Self {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

fn spectrum() -> Array2<f64> {
    arr2(&SPECTRUM)
}

/// Maps a vacuum wavelength in nanometres to its display colour.
pub fn wavelength_nm_to_color(nm: f64) -> Color {
    let table = spectrum();
    let rows = table.nrows();
    let (first, last) = (table[[0, 0]], table[[rows - 1, 0]]);
    let step = table[[1, 0]] - first;

    // NaN clamps to the blue end
    let nm = if nm.is_nan() { first } else { nm.clamp(first, last) };
    let i = (((nm - first) / step).floor() as usize).min(rows - 2);
    let t = (nm - table[[i, 0]]) / step;

    let rgb = &table.row(i) * (1.0 - t) + &table.row(i + 1) * t;
    let channel = |c: f64| c.round().clamp(0.0, 255.0) as u8;
    Color::rgb(channel(rgb[1]), channel(rgb[2]), channel(rgb[3]))
}

/// Maps a laser colour to its display colour.
pub fn map_wavelength_to_color(color: LaserColor) -> Color {
    match color {
        LaserColor::OneColor(wavelength) => wavelength_nm_to_color(wavelength * 1e9),
        LaserColor::White => Color::WHITE,
    }
}

/// Colour of a ray: its wavelength's colour with alpha `sqrt(power)`.
pub fn ray_color(ray: &Ray) -> Color {
    wavelength_nm_to_color(ray.wavelength * 1e9).with_alpha(ray.power.max(0.0).sqrt())
}

/// The dark middle colour of a wave particle's stripe gradient.
pub fn stripe_color(color: Color) -> Color {
    color.darker(STRIPE_DARKNESS)
}
