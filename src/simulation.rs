//! Stateful engine façade.
//!
//! [`Simulation`] owns the scene, the laser and the published ray tree. Every
//! mutation of the laser or of the media triggers a fresh propagation pass, after
//! which the new tree is published as a new `Arc` so that readers holding the old
//! one never observe a partial update.

use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::dispersion::Dispersion;
use crate::geom::Scene;
use crate::laser::Laser;
use crate::medium::Medium;
use crate::propagation::{Propagator, RayTree};
use crate::view::View;
use crate::wave::{WaveField, WaveSettings, WaveSnapshot};


/// The stateful propagation and wave engine.
#[derive(Debug)]
pub struct Simulation {
    scene: Scene,
    laser: Laser,
    propagator: Propagator,
    view: View,
    tree: Arc<RayTree>,
    field: WaveField,
    pass: u64,
}

impl Simulation {
    /// Creates a simulation and runs the first propagation pass.
    pub fn new(scene: Scene, laser: Laser, propagator: Propagator, wave: WaveSettings, view: View) -> Self {
        let tree = Arc::new(propagator.propagate_laser(&scene, &laser, 0));
        Self {
            scene,
            laser,
            propagator,
            view,
            tree,
            field: WaveField::new(wave),
            pass: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn laser(&self) -> &Laser {
        &self.laser
    }

    /// The most recently published ray tree.
    pub fn tree(&self) -> Arc<RayTree> {
        Arc::clone(&self.tree)
    }

    pub fn set_laser(&mut self, laser: Laser) {
        self.laser = laser;
        self.recompute();
    }

    /// Applies a change to the laser and propagates again.
    pub fn update_laser<F>(&mut self, update: F)
    where
        F: FnOnce(&mut Laser),
    {
        update(&mut self.laser);
        self.recompute();
    }

    /// Replaces the media. The scene is validated before anything changes.
    pub fn set_media(&mut self, media: Vec<Medium>) -> Result<()> {
        self.scene = Scene::new(media, self.scene.environment, self.scene.domain)?;
        self.recompute();
        Ok(())
    }

    pub fn set_environment(&mut self, environment: Dispersion) -> Result<()> {
        self.scene = Scene::new(self.scene.media.clone(), environment, self.scene.domain)?;
        self.recompute();
        Ok(())
    }

    pub fn set_propagator(&mut self, propagator: Propagator) {
        self.propagator = propagator;
        self.recompute();
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    /// Advances the wave particles by `dt` seconds. Returns an empty snapshot in ray mode.
    pub fn step(&mut self, dt: f64) -> Arc<WaveSnapshot> {
        if !self.laser.wave {
            self.field.clear();
            return Arc::new(WaveSnapshot {
                pass: self.pass,
                ..Default::default()
            });
        }
        Arc::new(self.field.advance(&self.tree, dt, &self.view))
    }

    /// Runs a new propagation pass and publishes its tree.
    fn recompute(&mut self) {
        self.pass += 1;
        debug!("recomputing ray tree, pass {}", self.pass);
        self.tree = Arc::new(self.propagator.propagate_laser(&self.scene, &self.laser, self.pass));
    }
}
