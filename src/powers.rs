//! Power budget of a propagation pass.
//!
//! Every root ray injects power into the scene and every leaf of the ray tree
//! removes it again, either by escaping the domain or by being truncated. Since
//! each Fresnel split conserves power exactly, the budget of a pass must close to
//! within floating point error.
//!
//! # Budget Components
//!
//! - Input power: total power carried by the root rays
//! - Output power: power of rays that escaped the domain
//! - Depth truncation: power of rays cut off by the maximum tree depth
//! - Energy truncation: power of children pruned by the minimum power
//! - Hidden reflections: power of partial reflections that are not shown
//! - Missing power: unaccounted remainder, ~0 for a correct pass

use std::{fmt, ops::*};

use serde::Serialize;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn budget_closes() {
        let mut powers = Powers::new();
        powers.input = 1.0;
        powers.output = 0.7;
        powers.trnc_rec = 0.2;
        powers.trnc_energy = 0.05;
        powers.trnc_refl = 0.05;
        assert!(powers.missing().abs() < 1e-12);
    }

    #[test]
    fn add_white_light_passes() {
        let mut total = Powers::new();
        for _ in 0..4 {
            let mut pass = Powers::new();
            pass.input = 0.25;
            pass.output = 0.25;
            pass.tir_count = 2;
            total += pass;
        }
        assert!((total.input - 1.0).abs() < 1e-12);
        assert_eq!(total.tir_count, 8);
        assert!(total.missing().abs() < 1e-12);
    }
}

/// Power accounting for one propagation pass, as fractions of the laser power.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Powers {
    pub input: f64,       // power of the root rays
    pub output: f64,      // power of rays that escaped the domain
    pub trnc_rec: f64,    // power truncated at the maximum depth
    pub trnc_energy: f64, // power of children below the minimum power
    pub trnc_refl: f64,   // power of partial reflections that were not propagated
    pub tir_count: usize, // number of total internal reflections
}

impl Add for Powers {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input: self.input + other.input,
            output: self.output + other.output,
            trnc_rec: self.trnc_rec + other.trnc_rec,
            trnc_energy: self.trnc_energy + other.trnc_energy,
            trnc_refl: self.trnc_refl + other.trnc_refl,
            tir_count: self.tir_count + other.tir_count,
        }
    }
}

impl AddAssign for Powers {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Powers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes power missing from the budget.
    ///
    /// **Context**: Perfect conservation shows zero missing power. A non-zero
    /// value means a ray was dropped without being accounted for.
    ///
    /// **How it Works**: Subtracts all tracked sinks from the input power.
    pub fn missing(&self) -> f64 {
        self.input - (self.output + self.trnc_rec + self.trnc_energy + self.trnc_refl)
    }
}

impl fmt::Display for Powers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Powers:")?;
        writeln!(f, "  Input:            {:.6}", self.input)?;
        writeln!(f, "  Output:           {:.6}", self.output)?;
        writeln!(f, "  Trunc. Rec:       {:.6}", self.trnc_rec)?;
        writeln!(f, "  Trunc. Energy:    {:.6}", self.trnc_energy)?;
        writeln!(f, "  Trunc. Refl:      {:.6}", self.trnc_refl)?;
        writeln!(f, "  Missing:          {:.6}", self.missing())?;
        writeln!(f, "  TIR count:        {}", self.tir_count)
    }
}
