//! Wavelength-dependent refractive indices.
//!
//! This module provides the refractive index providers used by every medium in a
//! scene. An index is either constant or follows a dispersion curve that blends
//! the dispersion of air with the Sellmeier equation for BK7 glass, such that the
//! curve passes exactly through its nominal index at the red reference wavelength.
//!
//! The dispersion model provides:
//! - Constant (non-dispersive) indices such as vacuum
//! - Blended air/glass dispersion curves for arbitrary nominal indices
//! - Presets for common substances
//!
//! # Key Components
//!
//! - [`Dispersion`]: a refractive index as a function of wavelength
//! - [`Substance`]: named presets (vacuum, air, water, glass, diamond)

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::config::WAVELENGTH_RED;


/// A refractive index as a function of vacuum wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dispersion {
    /// The same index at every wavelength.
    Constant(f64),
    /// A linear combination of the air and BK7 curves, scaled so that
    /// `index_at(WAVELENGTH_RED) == reference`.
    Blend { reference: f64 },
}

impl Dispersion {
    /// Builds the index provider from a nominal index, optionally dispersive.
    pub fn new(reference: f64, dispersive: bool) -> Self {
        if dispersive {
            Dispersion::Blend { reference }
        } else {
            Dispersion::Constant(reference)
        }
    }

    /// Returns the refractive index at the given vacuum wavelength (m).
    pub fn index_at(&self, wavelength: f64) -> f64 {
        match *self {
            Dispersion::Constant(n) => n,
            Dispersion::Blend { reference } => {
                let n_air_ref = air_index(WAVELENGTH_RED);
                let n_glass_ref = sellmeier_bk7(WAVELENGTH_RED);
                // 0 is pure air, 1 is pure glass
                let x = (reference - n_air_ref) / (n_glass_ref - n_air_ref);
                let blended = x * sellmeier_bk7(wavelength) + (1.0 - x) * air_index(wavelength);
                // correct the rounding of the blend so the reference point is exact
                let at_ref = x * n_glass_ref + (1.0 - x) * n_air_ref;
                blended + (reference - at_ref)
            }
        }
    }

    /// The index at the reference wavelength.
    pub fn reference(&self) -> f64 {
        match *self {
            Dispersion::Constant(n) => n,
            Dispersion::Blend { reference } => reference,
        }
    }
}

/// Refractive index of air (Ciddor-style two-term fit), wavelength in metres.
fn air_index(wavelength: f64) -> f64 {
    let inv_sq = (wavelength * 1e6).powi(-2);
    1.0 + 5792105e-8 / (238.0185 - inv_sq) + 167917e-8 / (57.362 - inv_sq)
}

/// Sellmeier equation for BK7 glass, wavelength in metres.
fn sellmeier_bk7(wavelength: f64) -> f64 {
    const B: [f64; 3] = [1.03961212, 0.231792344, 1.01046945];
    const C: [f64; 3] = [6.00069867e-3, 2.00179144e-2, 1.03560653e2];

    let l2 = (wavelength * 1e6).powi(2);
    let sum: f64 = B.iter().zip(C.iter()).map(|(b, c)| b * l2 / (l2 - c)).sum();
    (1.0 + sum).sqrt()
}

/// Named substances a medium can be made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Substance {
    Vacuum,
    Air,
    Water,
    Glass,
    Diamond,
}

impl Substance {
    pub fn dispersion(&self) -> Dispersion {
        match self {
            Substance::Vacuum => Dispersion::Constant(1.0),
            Substance::Air => Dispersion::Blend { reference: 1.000293 },
            Substance::Water => Dispersion::Blend { reference: 1.333 },
            Substance::Glass => Dispersion::Blend { reference: 1.5 },
            Substance::Diamond => Dispersion::Blend { reference: 2.419 },
        }
    }
}

impl FromStr for Substance {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vacuum" => Ok(Substance::Vacuum),
            "air" => Ok(Substance::Air),
            "water" => Ok(Substance::Water),
            "glass" => Ok(Substance::Glass),
            "diamond" => Ok(Substance::Diamond),
            other => Err(anyhow!("unknown substance: '{}'", other)),
        }
    }
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Substance::Vacuum => "vacuum",
            Substance::Air => "air",
            Substance::Water => "water",
            Substance::Glass => "glass",
            Substance::Diamond => "diamond",
        };
        write!(f, "{}", name)
    }
}
