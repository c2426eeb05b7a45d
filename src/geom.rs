//! Scenes of refracting media and the ray/boundary intersector.
//!
//! A [`Scene`] is the read-only description of everything a ray can meet: a set
//! of media polygons, the environment medium that fills the rest of space, and a
//! finite rectangular domain outside of which rays are considered to escape.
//!
//! The intersector provides:
//! - Nearest boundary crossing strictly ahead of a ray origin
//! - Outward normal of the crossed edge
//! - Refractive indices on both sides of the crossing, at the ray's wavelength
//! - Deterministic tie-breaking (lowest polygon, then lowest edge)
//! - Escape points on the domain boundary
//!
//! # Numeric policy
//!
//! All tolerances are relative to the domain diagonal so that scenes can be
//! described in any length unit.

use geo::Area;
use geo_clipper::Clipper;
use geo_types::{Coord, Rect};
use itertools::Itertools;
use log::{trace, warn};
use nalgebra::{Point2, Vector2};

use crate::config::{CLIP_RESOLUTION, EDGE_PARAMETER_TOLERANCE, RAYCAST_RELATIVE_EPSILON};
use crate::dispersion::Dispersion;
use crate::medium::{outward_normal, GeometryError, Medium};

#[cfg(test)]
mod tests {

    use super::*;

    fn square(x0: f64, y0: f64, size: f64, n: f64) -> Medium {
        Medium::from_vertices(
            &[[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size]],
            Dispersion::Constant(n),
        )
        .unwrap()
    }

    fn domain() -> Rect<f64> {
        Rect::new(Coord { x: -10.0, y: -10.0 }, Coord { x: 10.0, y: 10.0 })
    }

    #[test]
    fn hit_square_from_outside() {
        let scene = Scene::new(vec![square(1.0, -1.0, 2.0, 1.5)], Dispersion::Constant(1.0), domain()).unwrap();
        let crossing = scene.nearest_crossing(&Point2::origin(), &Vector2::x(), 650e-9);
        let Crossing::Boundary(hit) = crossing else {
            panic!("expected a boundary crossing, got {:?}", crossing);
        };
        assert!((hit.distance - 1.0).abs() < 1e-12);
        assert!((hit.normal - Vector2::new(-1.0, 0.0)).norm() < 1e-12);
        assert_eq!(hit.n1, 1.0);
        assert_eq!(hit.n2, 1.5);
        assert_eq!(hit.entering, MediumId::Medium(0));
        assert_eq!(hit.leaving, MediumId::Environment);
    }

    #[test]
    fn hit_square_from_inside() {
        let scene = Scene::new(vec![square(-1.0, -1.0, 2.0, 1.5)], Dispersion::Constant(1.0), domain()).unwrap();
        let crossing = scene.nearest_crossing(&Point2::origin(), &Vector2::y(), 650e-9);
        let Crossing::Boundary(hit) = crossing else {
            panic!("expected a boundary crossing, got {:?}", crossing);
        };
        assert!((hit.point - Point2::new(0.0, 1.0)).norm() < 1e-12);
        assert_eq!((hit.n1, hit.n2), (1.5, 1.0));
    }

    #[test]
    fn surface_just_left_is_ignored() {
        let scene = Scene::new(vec![square(1.0, -1.0, 2.0, 1.5)], Dispersion::Constant(1.0), domain()).unwrap();
        // start exactly on the left face, heading in
        let crossing = scene.nearest_crossing(&Point2::new(1.0, 0.0), &Vector2::x(), 650e-9);
        let Crossing::Boundary(hit) = crossing else {
            panic!("expected a boundary crossing, got {:?}", crossing);
        };
        assert!((hit.point - Point2::new(3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn escape_to_domain_edge() {
        let scene = Scene::new(vec![], Dispersion::Constant(1.0), domain()).unwrap();
        let crossing = scene.nearest_crossing(&Point2::origin(), &Vector2::new(1.0, 1.0).normalize(), 650e-9);
        let Crossing::Escape { point, distance } = crossing else {
            panic!("expected an escape, got {:?}", crossing);
        };
        assert!((point - Point2::new(10.0, 10.0)).norm() < 1e-9);
        assert!((distance - 200f64.sqrt()).abs() < 1e-9);
        assert_eq!(crossing.normal(), None);
    }

    #[test]
    fn origin_outside_domain_escapes_immediately() {
        let scene = Scene::new(vec![], Dispersion::Constant(1.0), domain()).unwrap();
        let crossing = scene.nearest_crossing(&Point2::new(20.0, 0.0), &Vector2::x(), 650e-9);
        assert_eq!(crossing.distance(), 0.0);
    }

    #[test]
    fn vertex_tie_picks_lowest_edge() {
        let scene = Scene::new(vec![square(1.0, -1.0, 2.0, 1.5)], Dispersion::Constant(1.0), domain()).unwrap();
        // through the bottom-left corner (1, -1) and into the square
        let origin = Point2::new(0.0, -2.0);
        let direction = Vector2::new(1.0, 1.0).normalize();
        let first = scene.nearest_crossing(&origin, &direction, 650e-9);
        let second = scene.nearest_crossing(&origin, &direction, 650e-9);
        let (Crossing::Boundary(a), Crossing::Boundary(b)) = (first, second) else {
            panic!("expected boundary crossings");
        };
        // bottom edge is edge 0, left edge is edge 3
        assert_eq!((a.polygon, a.edge), (0, 0));
        assert_eq!(a.entering, MediumId::Medium(0));
        assert_eq!(a, b);
    }

    #[test]
    fn lowest_polygon_wins_overlap() {
        let media = vec![square(0.0, 0.0, 2.0, 1.5), square(1.0, 1.0, 2.0, 2.0)];
        let scene = Scene::new(media, Dispersion::Constant(1.0), domain()).unwrap();
        assert_eq!(scene.medium_at(&Point2::new(1.5, 1.5)), MediumId::Medium(0));
        assert_eq!(scene.medium_at(&Point2::new(2.5, 2.5)), MediumId::Medium(1));
        assert_eq!(scene.medium_at(&Point2::new(5.0, 5.0)), MediumId::Environment);
        assert_eq!(scene.overlaps(), vec![(0, 1)]);
    }

    #[test]
    fn invalid_domain() {
        let flat = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 });
        let result = Scene::new(vec![], Dispersion::Constant(1.0), flat);
        assert_eq!(result.unwrap_err(), GeometryError::InvalidDomain);
    }
}

/// Identifies the medium found at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumId {
    Environment,   // the medium filling the space between polygons
    Medium(usize), // index into `Scene::media`
}

/// The nearest crossing of a media boundary ahead of a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub point: Point2<f64>,   // where the ray meets the boundary
    pub distance: f64,        // distance from the ray origin
    pub normal: Vector2<f64>, // outward normal of the crossed edge
    pub polygon: usize,       // index of the polygon owning the edge
    pub edge: usize,          // index of the edge within the polygon
    pub leaving: MediumId,    // medium on the incident side
    pub entering: MediumId,   // medium on the transmitted side
    pub n1: f64,              // index of the medium being left
    pub n2: f64,              // index of the medium being entered
}

/// Result of casting a ray into a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossing {
    Boundary(Intersection),
    Escape { point: Point2<f64>, distance: f64 }, // no boundary before the domain edge
}

impl Crossing {
    pub fn point(&self) -> Point2<f64> {
        match self {
            Crossing::Boundary(hit) => hit.point,
            Crossing::Escape { point, .. } => *point,
        }
    }

    pub fn distance(&self) -> f64 {
        match self {
            Crossing::Boundary(hit) => hit.distance,
            Crossing::Escape { distance, .. } => *distance,
        }
    }

    /// Outward normal of the crossed edge, `None` on escape.
    pub fn normal(&self) -> Option<Vector2<f64>> {
        match self {
            Crossing::Boundary(hit) => Some(hit.normal),
            Crossing::Escape { .. } => None,
        }
    }
}

/// Media polygons inside a finite domain, surrounded by an environment medium.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub media: Vec<Medium>,     // refracting regions, earlier ones take precedence
    pub environment: Dispersion, // medium outside every polygon
    pub domain: Rect<f64>,      // rays leaving this rectangle escape
    epsilon: f64,               // minimum raycast distance
}

impl Scene {
    /// Builds a scene, checking the domain and the environment index.
    /// Overlapping media are accepted but reported with a warning.
    pub fn new(media: Vec<Medium>, environment: Dispersion, domain: Rect<f64>) -> Result<Self, GeometryError> {
        let (width, height) = (domain.width(), domain.height());
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(GeometryError::InvalidDomain);
        }
        let reference = environment.reference();
        if !reference.is_finite() || reference < 1.0 {
            return Err(GeometryError::InvalidIndex(reference));
        }

        let scene = Self {
            media,
            environment,
            domain,
            epsilon: RAYCAST_RELATIVE_EPSILON * width.hypot(height),
        };

        for (i, j) in scene.overlaps() {
            warn!("media #{} and #{} overlap, the lower index takes precedence", i, j);
        }

        Ok(scene)
    }

    /// Minimum distance a ray must travel before an intersection counts.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn diagonal(&self) -> f64 {
        self.domain.width().hypot(self.domain.height())
    }

    /// Pairs of media whose interiors overlap.
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        let factor = CLIP_RESOLUTION / self.diagonal();
        let min_area = (self.epsilon * 1e3).powi(2);

        self.media
            .iter()
            .enumerate()
            .tuple_combinations()
            .filter(|((_, a), (_, b))| {
                a.polygon().intersection(b.polygon(), factor).unsigned_area() > min_area
            })
            .map(|((i, _), (j, _))| (i, j))
            .collect()
    }

    /// Returns the medium at a point. The first polygon containing the point wins.
    pub fn medium_at(&self, point: &Point2<f64>) -> MediumId {
        self.media
            .iter()
            .position(|medium| medium.contains(point))
            .map_or(MediumId::Environment, MediumId::Medium)
    }

    /// Refractive index of a medium at the given vacuum wavelength.
    pub fn index_of(&self, id: MediumId, wavelength: f64) -> f64 {
        match id {
            MediumId::Environment => self.environment.index_at(wavelength),
            MediumId::Medium(i) => self.media[i].index_at(wavelength),
        }
    }

    /// Refractive index at a point.
    pub fn index_at(&self, point: &Point2<f64>, wavelength: f64) -> f64 {
        self.index_of(self.medium_at(point), wavelength)
    }

    /// Finds the nearest boundary crossing strictly ahead of `origin`.
    ///
    /// **Context**: Each step of the propagation needs to know where the current
    /// ray stops and what lies on both sides of that point. A ray that has just
    /// been spawned on a boundary must not hit the boundary it is leaving.
    ///
    /// **How it Works**: Every edge of every polygon is tested; hits closer than the
    /// raycast epsilon or beyond the domain exit are ignored. A later candidate only
    /// replaces the current best when it is closer by more than epsilon, so rays
    /// through a vertex resolve to the lowest polygon and edge index. The media on
    /// each side are found by sampling just before and just after the crossing
    /// point along the ray.
    pub fn nearest_crossing(&self, origin: &Point2<f64>, direction: &Vector2<f64>, wavelength: f64) -> Crossing {
        let exit = self.exit_distance(origin, direction);
        let mut best: Option<(f64, usize, usize, Vector2<f64>)> = None;

        for (i, medium) in self.media.iter().enumerate() {
            for (j, (a, b)) in medium.edges().enumerate() {
                let Some(t) = ray_segment_distance(origin, direction, &a, &b) else {
                    continue;
                };
                if t <= self.epsilon || t >= exit {
                    continue;
                }
                trace!("candidate hit on polygon #{} edge #{} at t = {}", i, j, t);

                let closer = best.map_or(true, |(best_t, ..)| t < best_t - self.epsilon);
                if closer {
                    best = Some((t, i, j, outward_normal(a, b)));
                }
            }
        }

        let Some((distance, polygon, edge, normal)) = best else {
            return Crossing::Escape {
                point: origin + direction * exit,
                distance: exit,
            };
        };

        let point = origin + direction * distance;
        let step = self.epsilon * 1e3;
        let leaving = self.medium_at(&(point - direction * step));
        let entering = self.medium_at(&(point + direction * step));

        Crossing::Boundary(Intersection {
            point,
            distance,
            normal,
            polygon,
            edge,
            leaving,
            entering,
            n1: self.index_of(leaving, wavelength),
            n2: self.index_of(entering, wavelength),
        })
    }

    /// Distance along the ray to the domain boundary, zero if the origin is outside.
    pub fn exit_distance(&self, origin: &Point2<f64>, direction: &Vector2<f64>) -> f64 {
        let (min, max) = (self.domain.min(), self.domain.max());
        let inside = origin.x >= min.x && origin.x <= max.x && origin.y >= min.y && origin.y <= max.y;
        if !inside {
            return 0.0;
        }

        let axis = |o: f64, d: f64, lo: f64, hi: f64| -> f64 {
            if d > 0.0 {
                (hi - o) / d
            } else if d < 0.0 {
                (lo - o) / d
            } else {
                f64::INFINITY
            }
        };

        let t = axis(origin.x, direction.x, min.x, max.x).min(axis(origin.y, direction.y, min.y, max.y));
        if t.is_finite() {
            t.max(0.0)
        } else {
            0.0
        }
    }
}

/// Distance along a ray to its intersection with the segment `a -> b`, if any.
fn ray_segment_distance(
    origin: &Point2<f64>,
    direction: &Vector2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
) -> Option<f64> {
    let e = b - a;
    let denom = direction.perp(&e);
    if denom.abs() <= EDGE_PARAMETER_TOLERANCE * e.norm() {
        return None; // parallel
    }

    let w = a - origin;
    let t = w.perp(&e) / denom;
    let s = w.perp(direction) / denom;
    if (-EDGE_PARAMETER_TOLERANCE..=1.0 + EDGE_PARAMETER_TOLERANCE).contains(&s) {
        Some(t)
    } else {
        None
    }
}

/// Converts an `[x, y]` pair into a `geo` coordinate.
pub fn coord(xy: [f64; 2]) -> Coord<f64> {
    Coord { x: xy[0], y: xy[1] }
}
