//! Wave particle kinematics.
//!
//! In wave mode every ray segment of the current tree is drawn as a train of
//! moving wave packets. Each ray owns an emitter that spawns a packet at the ray
//! origin whenever the light has travelled one packet width since the previous
//! spawn, so the packet density does not depend on the tick rate.
//!
//! The kinematics provide:
//! - Frame-rate independent spawning from a per-ray distance accumulator
//! - Motion at the phase velocity of the ray's medium
//! - Retirement past the segment end or outside the visible view
//! - Alternating stripe phases for the bright/dark rendering
//! - Immutable snapshots keyed by ray identity
//!
//! A field is bound to one propagation pass. Advancing it with the tree of a new
//! pass throws away every particle of the old one.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::color::{ray_color, stripe_color, Color};
use crate::propagation::{RayTree, TracedRay};
use crate::ray::{Ray, RayId};
use crate::view::View;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::dispersion::Dispersion;
    use crate::geom::Scene;
    use crate::propagation::Propagator;
    use geo_types::{Coord, Rect};
    use nalgebra::Vector2;
    use std::time::Instant;

    const C: f64 = crate::config::SPEED_OF_LIGHT;

    /// A single ray of length 10 (m) in vacuum with a wavelength of 1 (m).
    fn single_ray_tree(pass: u64) -> RayTree {
        let domain = Rect::new(Coord { x: 0.0, y: -10.0 }, Coord { x: 10.0, y: 10.0 });
        let scene = Scene::new(vec![], Dispersion::Constant(1.0), domain).unwrap();
        let ray = Ray::new(Point2::origin(), Vector2::x(), 1.0, 1.0, 1.0);
        Propagator::default().trace(&scene, &[ray], pass)
    }

    #[test]
    fn spawns_one_per_width() {
        let tree = single_ray_tree(0);
        let mut field = WaveField::new(WaveSettings::default());
        // light covers 2.5 wavelengths
        let snapshot = field.advance(&tree, 2.5 / C, &View::unbounded());
        let particles = &snapshot.particles[&tree.rays[0].id];
        assert_eq!(particles.len(), 2);
        assert!((particles[0].offset - 1.5).abs() < 1e-9);
        assert!((particles[1].offset - 0.5).abs() < 1e-9);
    }

    #[test]
    fn independent_of_tick_rate() {
        let tree = single_ray_tree(0);
        let mut coarse = WaveField::new(WaveSettings::default());
        let mut fine = WaveField::new(WaveSettings::default());
        let view = View::unbounded();
        let coarse_snapshot = coarse.advance(&tree, 3.7 / C, &view);
        let mut fine_snapshot = WaveSnapshot::default();
        for _ in 0..37 {
            fine_snapshot = fine.advance(&tree, 0.1 / C, &view);
        }
        let id = tree.rays[0].id;
        assert_eq!(coarse_snapshot.particles[&id].len(), 3);
        assert_eq!(fine_snapshot.particles[&id].len(), 3);
    }

    #[test]
    fn particles_retire_past_segment_end() {
        let tree = single_ray_tree(0);
        let mut field = WaveField::new(WaveSettings::default());
        let view = View::unbounded();
        let mut snapshot = WaveSnapshot::default();
        for _ in 0..45 {
            snapshot = field.advance(&tree, 0.3 / C, &view);
        }
        // 13.5 wavelengths emitted into a 10 wavelength segment
        let particles = &snapshot.particles[&tree.rays[0].id];
        assert_eq!(particles.len(), 10);
        assert!(particles.iter().all(|p| p.offset <= 10.0));
    }

    #[test]
    fn stripes_alternate_phase() {
        let tree = single_ray_tree(0);
        let mut field = WaveField::new(WaveSettings::default());
        let snapshot = field.advance(&tree, 3.0 / C + 1e-12, &View::unbounded());
        let particles = &snapshot.particles[&tree.rays[0].id];
        assert_eq!(particles.len(), 3);
        assert!((particles[1].phase - particles[0].phase - PI).abs() < 1e-12);
        assert!((particles[2].phase - particles[0].phase).abs() < 1e-12);
    }

    #[test]
    fn new_pass_discards_particles() {
        let mut field = WaveField::new(WaveSettings::default());
        let view = View::unbounded();
        field.advance(&single_ray_tree(0), 5.5 / C, &view);
        assert_eq!(field.len(), 5);
        let snapshot = field.advance(&single_ray_tree(1), 0.0, &view);
        assert_eq!(snapshot.pass, 1);
        assert_eq!(snapshot.len(), 0);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let tree = single_ray_tree(0);
        let mut field = WaveField::new(WaveSettings::default());
        let view = View::unbounded();
        field.advance(&tree, 2.5 / C, &view);
        field.advance(&tree, -1.0, &view);
        field.advance(&tree, f64::NAN, &view);
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn huge_step_only_builds_visible_particles() {
        let tree = single_ray_tree(0);
        let mut field = WaveField::new(WaveSettings::default());
        let start = Instant::now();
        // the light covers ten million widths on a ray ten widths long
        let snapshot = field.advance(&tree, (1e7 + 0.5) / C, &View::unbounded());
        assert!(start.elapsed().as_secs_f64() < 1.0, "took {:?}", start.elapsed());

        let particles = &snapshot.particles[&tree.rays[0].id];
        assert_eq!(particles.len(), 10);
        assert!((particles[0].offset - 9.5).abs() < 1e-6);
        assert!((particles[9].offset - 0.5).abs() < 1e-6);
        // the ten millionth spawn has odd parity
        assert_eq!(particles[9].phase, PI);
        assert_eq!(particles[8].phase, 0.0);
    }

    #[test]
    fn particle_position_and_angle() {
        let tree = single_ray_tree(0);
        let mut field = WaveField::new(WaveSettings::default());
        let snapshot = field.advance(&tree, 1.5 / C, &View::unbounded());
        let particle = &snapshot.particles[&tree.rays[0].id][0];
        let position = particle.position(tree.rays[0].ray());
        assert!((position - Point2::new(0.5, 0.0)).norm() < 1e-9);
        assert_eq!(particle.angle, 0.0);
    }
}

/// Tuning of the wave representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveSettings {
    pub width_scale: f64, // particle width in wavelengths
    pub height: f64,      // particle height, i.e. the drawn beam width (m)
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            width_scale: 1.0,
            height: 1.0,
        }
    }
}

/// One wave packet travelling along a ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveParticle {
    pub ray: RayId,
    pub offset: f64,          // distance from the ray origin
    pub width: f64,           // extent along the ray
    pub height: f64,          // extent across the ray
    pub speed: f64,           // phase velocity in the ray's medium
    pub color: Color,
    pub gradient_color: Color, // dark stripe colour
    pub phase: f64,
    pub angle: f64,           // direction of the parent ray from +x
}

impl WaveParticle {
    /// Model position of the particle.
    pub fn position(&self, ray: &Ray) -> Point2<f64> {
        ray.point_at(self.offset)
    }
}

/// Spawning state and live particles of one ray.
#[derive(Debug, Clone, Default)]
struct Emitter {
    accumulated: f64, // distance travelled since the last spawn
    spawned: u64,     // particles spawned so far, for stripe parity
    particles: Vec<WaveParticle>,
}

impl Emitter {
    /// Advances the live particles and spawns new ones at the origin.
    fn advance(&mut self, traced: &TracedRay, dt: f64, settings: &WaveSettings, view: &View) {
        let ray = traced.ray();
        let speed = ray.speed();
        let width = ray.wavelength_in_medium * settings.width_scale;
        if !(width.is_finite() && width > 0.0) {
            return;
        }
        let distance = speed * dt;

        for particle in self.particles.iter_mut() {
            particle.offset += distance;
        }

        self.accumulated += distance;
        // spawns that would already be past the segment end are only counted
        let whole = (self.accumulated / width).floor();
        if whole >= 1.0 {
            let skipped = ((self.accumulated - traced.length) / width - 1.0).ceil().clamp(0.0, whole);
            self.accumulated -= skipped * width;
            self.spawned += skipped as u64;
        }
        while self.accumulated >= width {
            self.accumulated -= width;
            let color = ray_color(ray);
            let parity = if self.spawned % 2 == 0 { 0.0 } else { PI };
            self.particles.push(WaveParticle {
                ray: traced.id,
                offset: self.accumulated,
                width,
                height: settings.height,
                speed,
                color,
                gradient_color: stripe_color(color),
                phase: ray.phase + parity,
                angle: ray.angle(),
            });
            self.spawned += 1;
        }

        self.particles
            .retain(|particle| particle.offset <= traced.length && view.is_visible(&ray.point_at(particle.offset)));
    }
}

/// Immutable particle population handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaveSnapshot {
    pub pass: u64,
    pub particles: BTreeMap<RayId, Vec<WaveParticle>>, // oldest particle first
}

impl WaveSnapshot {
    /// Total number of particles.
    pub fn len(&self) -> usize {
        self.particles.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaveParticle> {
        self.particles.values().flatten()
    }
}

/// Particle emitters for every ray of one propagation pass.
#[derive(Debug, Clone)]
pub struct WaveField {
    pub settings: WaveSettings,
    pass: Option<u64>,
    emitters: BTreeMap<RayId, Emitter>,
}

impl WaveField {
    pub fn new(settings: WaveSettings) -> Self {
        Self {
            settings,
            pass: None,
            emitters: BTreeMap::new(),
        }
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.pass = None;
        self.emitters.clear();
    }

    pub fn len(&self) -> usize {
        self.emitters.values().map(|emitter| emitter.particles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances every particle of `tree` by `dt` seconds.
    ///
    /// **Context**: Called once per animation tick in wave mode. The tree may have
    /// been replaced since the previous tick, in which case the old particles
    /// belong to rays that no longer exist.
    ///
    /// **How it Works**: A tree from a different pass clears the field. Each ray then
    /// moves its particles by `v dt`, adds `v dt` to its accumulator and spawns one
    /// particle per whole width accumulated, at the offset the light has covered
    /// since. Particles past the segment end or out of view are dropped. Negative or
    /// non-finite `dt` does not move anything.
    pub fn advance(&mut self, tree: &RayTree, dt: f64, view: &View) -> WaveSnapshot {
        if self.pass != Some(tree.pass) {
            if self.pass.is_some() {
                debug!("pass {} replaces the wave field, dropping {} particles", tree.pass, self.len());
            }
            self.emitters.clear();
            self.pass = Some(tree.pass);
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        for traced in &tree.rays {
            self.emitters
                .entry(traced.id)
                .or_default()
                .advance(traced, dt, &self.settings, view);
        }

        self.snapshot()
    }

    /// Copies the current population.
    pub fn snapshot(&self) -> WaveSnapshot {
        WaveSnapshot {
            pass: self.pass.unwrap_or_default(),
            particles: self
                .emitters
                .iter()
                .map(|(id, emitter)| (*id, emitter.particles.clone()))
                .collect(),
        }
    }
}
