//! The ray propagation engine.
//!
//! Starting from one or more root rays, this module repeatedly asks the scene for
//! the next boundary crossing, splits the ray into a reflected and a refracted
//! child according to Snell's law and the Fresnel equations, and continues with
//! the children until every branch has escaped the domain, fallen below the
//! minimum power, or reached the maximum depth.
//!
//! The propagation provides:
//! - A flattened, pre-order ray tree (reflected subtree before refracted subtree)
//! - Total internal reflection with the full power reflected
//! - Optional suppression of partial reflections
//! - The boundary normal at every crossing, for drawing normals
//! - Structural termination through `max_depth` and `min_power`
//! - A power budget for every pass
//! - Parallel fan-out of white light into independent wavelengths
//!
//! # Key Components
//!
//! - [`Propagator`]: termination settings and the tracing loop
//! - [`RayTree`]: the immutable output of a pass
//! - [`TracedRay`]: one node of the tree with its segment end point

use std::f64::consts::PI;

use log::{debug, info};
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;
use serde::Serialize;

use crate::color::LaserColor;
use crate::config::{DEFAULT_MAX_DEPTH, DEFAULT_MIN_POWER};
use crate::fresnel::Split;
use crate::geom::{Crossing, Scene};
use crate::laser::Laser;
use crate::powers::Powers;
use crate::ray::{Branch, Ray, RayId};
use crate::snell::{get_reflection_vector, get_refraction_vector, get_theta_i};


/// Why a ray's segment ends where it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    Escaped,  // left the domain
    Split,    // crossed a boundary and split into children
    Tir,      // totally internally reflected
    MaxDepth, // reached a boundary at the maximum depth
}

/// A ray of the tree together with its finite segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracedRay {
    pub id: RayId,
    pub branch: Branch,
    pub parent: Option<usize>, // index of the parent in the tree
    pub depth: usize,          // number of crossings above this ray, 0 for roots
    pub end: Point2<f64>,      // end of the segment
    pub length: f64,           // distance from the origin to `end`
    pub normal: Option<Vector2<f64>>, // outward normal of the crossed edge, `None` on escape
    pub termination: Termination,
}

impl TracedRay {
    pub fn ray(&self) -> &Ray {
        self.branch.ray()
    }
}

/// The flattened output of one propagation pass, in pre-order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RayTree {
    pub pass: u64,
    pub rays: Vec<TracedRay>,
    pub powers: Powers,
}

impl RayTree {
    pub fn empty(pass: u64) -> Self {
        Self {
            pass,
            rays: Vec::new(),
            powers: Powers::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    pub fn get(&self, id: RayId) -> Option<&TracedRay> {
        if id.pass != self.pass {
            return None;
        }
        self.rays.get(id.index)
    }

    /// Indices of the direct children of ray `index`.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.rays
            .iter()
            .enumerate()
            .filter(move |(_, traced)| traced.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Indices of the root rays.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.rays
            .iter()
            .enumerate()
            .filter(|(_, traced)| traced.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Appends another tree of the same pass, renumbering its rays.
    fn append(&mut self, other: RayTree) {
        let offset = self.rays.len();
        self.rays.extend(other.rays.into_iter().map(|mut traced| {
            traced.id.index += offset;
            traced.parent = traced.parent.map(|parent| parent + offset);
            traced
        }));
        self.powers += other.powers;
    }
}

/// A ray waiting to be traced.
struct Pending {
    branch: Branch,
    parent: Option<usize>,
    depth: usize,
}

/// Termination settings of the propagation engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Propagator {
    pub max_depth: usize, // maximum number of ray generations, the root is the first
    pub min_power: f64,   // children at or below this power are not created
    pub show_reflections: bool, // propagate partial reflections, TIR is always propagated
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MIN_POWER)
    }
}

impl Propagator {
    pub fn new(max_depth: usize, min_power: f64) -> Self {
        Self {
            max_depth,
            min_power,
            show_reflections: true,
        }
    }

    /// Turns the propagation of partial reflections on or off.
    pub fn with_reflections(mut self, show_reflections: bool) -> Self {
        self.show_reflections = show_reflections;
        self
    }

    /// Propagates a single incident ray.
    pub fn propagate(&self, scene: &Scene, ray: Ray) -> RayTree {
        self.trace(scene, &[ray], 0)
    }

    /// Propagates everything a laser emits. A laser that is off produces an empty tree.
    pub fn propagate_laser(&self, scene: &Scene, laser: &Laser, pass: u64) -> RayTree {
        if !laser.on {
            return RayTree::empty(pass);
        }
        let roots = laser.emit(|point, wavelength| scene.index_at(point, wavelength));
        self.trace(scene, &roots, pass)
    }

    /// Traces each root ray independently and concatenates the trees in input order.
    ///
    /// **Context**: White light is sampled as several monochromatic root rays which
    /// never interact, so each can be traced on its own thread.
    ///
    /// **How it Works**: Each root is traced in parallel with rayon. The resulting
    /// trees are then appended in order, shifting ray indices so that parent links
    /// stay valid in the combined tree.
    pub fn trace(&self, scene: &Scene, roots: &[Ray], pass: u64) -> RayTree {
        let trees: Vec<RayTree> = roots
            .par_iter()
            .map(|root| self.trace_root(scene, *root, pass))
            .collect();

        let mut tree = RayTree::empty(pass);
        for sub in trees {
            tree.append(sub);
        }

        info!(
            "pass {}: {} rays from {} roots, output {:.6}, missing {:.3e}",
            pass,
            tree.len(),
            roots.len(),
            tree.powers.output,
            tree.powers.missing()
        );
        tree
    }

    /// Traces the tree of a single root ray.
    ///
    /// **Context**: Each boundary crossing can double the number of live rays, so the
    /// recursion is bounded by depth and by power. The output order must be stable.
    ///
    /// **How it Works**: Uses an explicit stack in place of recursion. The refracted
    /// child is pushed before the reflected child, so the reflected subtree is
    /// completely expanded before the refracted one, producing pre-order output.
    fn trace_root(&self, scene: &Scene, root: Ray, pass: u64) -> RayTree {
        let mut tree = RayTree::empty(pass);
        tree.powers.input = root.power;

        let mut stack = vec![Pending {
            branch: Branch::Incident(root),
            parent: None,
            depth: 0,
        }];

        while let Some(Pending { branch, parent, depth }) = stack.pop() {
            let ray = *branch.ray();
            let index = tree.rays.len();
            let crossing = scene.nearest_crossing(&ray.origin, &ray.direction, ray.wavelength);

            let mut traced = TracedRay {
                id: RayId { pass, index },
                branch,
                parent,
                depth,
                end: crossing.point(),
                length: crossing.distance(),
                normal: crossing.normal(),
                termination: Termination::Escaped,
            };

            let hit = match crossing {
                Crossing::Escape { .. } => {
                    tree.powers.output += ray.power;
                    tree.rays.push(traced);
                    continue;
                }
                Crossing::Boundary(hit) => hit,
            };

            if depth + 1 >= self.max_depth {
                tree.powers.trnc_rec += ray.power;
                traced.termination = Termination::MaxDepth;
                tree.rays.push(traced);
                continue;
            }

            let theta_i = get_theta_i(&hit.normal, &ray.direction);
            let split = Split::new(theta_i, hit.n1, hit.n2);
            let phase = ray.phase_after(hit.distance);

            debug!(
                "ray {} at depth {} crosses polygon #{} edge #{}: n1 = {}, n2 = {}, theta_i = {:.4}, R = {:.4}",
                index, depth, hit.polygon, hit.edge, hit.n1, hit.n2, theta_i, split.reflectance
            );

            traced.termination = if split.is_tir() {
                tree.powers.tir_count += 1;
                Termination::Tir
            } else {
                Termination::Split
            };
            tree.rays.push(traced);

            if split.theta_t.is_some() {
                let power = ray.power * split.transmittance;
                if power > self.min_power {
                    let direction = get_refraction_vector(&hit.normal, &ray.direction, hit.n1 / hit.n2);
                    let refracted = ray.spawn(hit.point, direction, power, hit.n2, phase);
                    stack.push(Pending {
                        branch: Branch::Refracted(refracted),
                        parent: Some(index),
                        depth: depth + 1,
                    });
                } else {
                    tree.powers.trnc_energy += power;
                }
            }

            let power = ray.power * split.reflectance;
            if !self.show_reflections && !split.is_tir() {
                tree.powers.trnc_refl += power;
            } else if power > self.min_power {
                let direction = get_reflection_vector(&hit.normal, &ray.direction);
                let phase = phase + if hit.n2 > hit.n1 { PI } else { 0.0 };
                let reflected = ray.spawn(hit.point, direction, power, hit.n1, phase);
                stack.push(Pending {
                    branch: Branch::Reflected(reflected),
                    parent: Some(index),
                    depth: depth + 1,
                });
            } else {
                tree.powers.trnc_energy += power;
            }
        }

        tree
    }
}

/// Propagates a laser shot described by its raw parameters.
///
/// White light is emitted as one root per sampled wavelength, each carrying an
/// equal share of `power`. Every root starts with the index of the medium that
/// contains `origin`.
pub fn propagate(
    origin: Point2<f64>,
    direction: Vector2<f64>,
    power: f64,
    wavelength: f64,
    is_white: bool,
    scene: &Scene,
    propagator: &Propagator,
) -> RayTree {
    let color = if is_white {
        LaserColor::White
    } else {
        LaserColor::OneColor(wavelength)
    };
    let laser = Laser::new(origin, origin + direction, color, power);
    propagator.propagate_laser(scene, &laser, 0)
}
