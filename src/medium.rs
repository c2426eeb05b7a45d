//! Refracting media bounded by simple polygons.
//!
//! A [`Medium`] associates a validated polygon boundary with a refractive index
//! provider. Polygons are checked once, when the medium is built, so that the
//! intersector never has to deal with malformed boundaries mid-propagation.
//!
//! The medium system provides:
//! - Validation of polygon boundaries (vertex count, area, self-intersection)
//! - Counter-clockwise normalisation so edge normals point outward
//! - Prism prototypes (triangle, trapezoid, square, semicircle)
//! - Translation and rotation of a prism about its rotation centre

use std::f64::consts::PI;

use geo::algorithm::orient::{Direction, Orient};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BoundingRect, Centroid, Contains, Rotate, Translate};
use geo_types::{Coord, Line, LineString, Point, Polygon, Rect};
use itertools::Itertools;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::VEC_LENGTH_THRESHOLD;
use crate::dispersion::Dispersion;

#[cfg(test)]
mod tests {

    use super::*;

    fn square_vertices() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    #[test]
    fn clockwise_input_is_reoriented() {
        let mut vertices = square_vertices();
        vertices.reverse();
        let medium = Medium::from_vertices(&vertices, Dispersion::Constant(1.5)).unwrap();
        // the first edge normal points away from the centre
        let (a, b) = medium.edges().next().unwrap();
        let normal = outward_normal(a, b);
        let mid = Point2::new(0.5, 0.5);
        assert!(normal.dot(&(a - mid)) > 0.0);
    }

    #[test]
    fn too_few_vertices() {
        let result = Medium::from_vertices(&[[0.0, 0.0], [1.0, 0.0]], Dispersion::Constant(1.5));
        assert_eq!(result.unwrap_err(), GeometryError::TooFewVertices(2));
    }

    #[test]
    fn coincident_vertices_are_merged() {
        let vertices = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let medium = Medium::from_vertices(&vertices, Dispersion::Constant(1.5)).unwrap();
        assert_eq!(medium.num_vertices(), 4);
    }

    #[test]
    fn collinear_vertices_have_no_area() {
        let vertices = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        let result = Medium::from_vertices(&vertices, Dispersion::Constant(1.5));
        assert_eq!(result.unwrap_err(), GeometryError::ZeroArea);
    }

    #[test]
    fn bow_tie_is_rejected() {
        let vertices = vec![[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 1.0]];
        let result = Medium::from_vertices(&vertices, Dispersion::Constant(1.5));
        assert!(matches!(
            result.unwrap_err(),
            GeometryError::SelfIntersecting { .. }
        ));
    }

    #[test]
    fn non_finite_is_rejected() {
        let vertices = vec![[0.0, 0.0], [f64::NAN, 0.0], [0.0, 1.0]];
        let result = Medium::from_vertices(&vertices, Dispersion::Constant(1.5));
        assert_eq!(result.unwrap_err(), GeometryError::NonFinite);
    }

    #[test]
    fn index_below_one_is_rejected() {
        let result = Medium::from_vertices(&square_vertices(), Dispersion::Constant(0.5));
        assert!(matches!(result.unwrap_err(), GeometryError::InvalidIndex(_)));
    }

    #[test]
    fn prototypes_are_valid() {
        let glass = Dispersion::Constant(1.5);
        assert_eq!(Medium::prototypes(1.0, glass).len(), Prototype::ALL.len());
        for prism in Medium::prototypes(1.0, glass) {
            assert!(prism.area() > 0.0);
            assert!(prism.contains(&prism.rotation_center()));
        }
    }

    #[test]
    fn rotate_quarter_turn() {
        let mut medium =
            Medium::from_vertices(&square_vertices(), Dispersion::Constant(1.5)).unwrap();
        medium.rotate_about(Point2::new(0.0, 0.0), PI / 2.0);
        // the square now spans x in [-1, 0]
        assert!(medium.contains(&Point2::new(-0.5, 0.5)));
        assert!(!medium.contains(&Point2::new(0.5, 0.5)));
    }

    #[test]
    fn translate_moves_center() {
        let mut medium =
            Medium::from_vertices(&square_vertices(), Dispersion::Constant(1.5)).unwrap();
        medium.translate(Vector2::new(2.0, -1.0));
        let center = medium.rotation_center();
        assert!((center - Point2::new(2.5, -0.5)).norm() < 1e-12);
    }
}

/// Configuration errors raised when a medium or scene is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("a polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon has zero area")]
    ZeroArea,
    #[error("polygon is self-intersecting (edges {} and {})", edges.0, edges.1)]
    SelfIntersecting { edges: (usize, usize) },
    #[error("polygon has non-finite coordinates")]
    NonFinite,
    #[error("refractive index must be finite and at least 1, got {0}")]
    InvalidIndex(f64),
    #[error("simulation domain must have positive width and height")]
    InvalidDomain,
}

/// A region of space with a uniform refractive index.
#[derive(Debug, Clone, PartialEq)]
pub struct Medium {
    polygon: Polygon<f64>,        // counter-clockwise boundary
    pub dispersion: Dispersion,   // refractive index as a function of wavelength
    rotation_center: Point2<f64>, // pivot used when the prism is rotated
}

impl Medium {
    /// Builds a medium from a list of `[x, y]` vertices.
    /// Consecutive coincident vertices are merged before validation.
    pub fn from_vertices(vertices: &[[f64; 2]], dispersion: Dispersion) -> Result<Self, GeometryError> {
        let coords: Vec<Coord<f64>> = vertices.iter().map(|v| Coord { x: v[0], y: v[1] }).collect();
        Self::new(Polygon::new(LineString::from(coords), vec![]), dispersion)
    }

    /// Builds a medium from a `geo` polygon. Interior rings are not supported and are dropped.
    pub fn new(polygon: Polygon<f64>, dispersion: Dispersion) -> Result<Self, GeometryError> {
        let reference = dispersion.reference();
        if !reference.is_finite() || reference < 1.0 {
            return Err(GeometryError::InvalidIndex(reference));
        }

        let mut coords: Vec<Coord<f64>> = polygon.exterior().0.clone();
        if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        coords.dedup_by(|a, b| (*a - *b).x.hypot((*a - *b).y) < VEC_LENGTH_THRESHOLD);
        // drop the closing vertex, `Polygon::new` closes the ring again
        if coords.len() > 1 {
            let (first, last) = (coords[0], coords[coords.len() - 1]);
            if (first - last).x.hypot((first - last).y) < VEC_LENGTH_THRESHOLD {
                coords.pop();
            }
        }
        if coords.len() < 3 {
            return Err(GeometryError::TooFewVertices(coords.len()));
        }

        let polygon = Polygon::new(LineString::from(coords), vec![]).orient(Direction::Default);
        let extent = polygon
            .bounding_rect()
            .map(|rect| rect.width().hypot(rect.height()))
            .unwrap_or(0.0);
        if polygon.unsigned_area() <= VEC_LENGTH_THRESHOLD * extent * extent {
            return Err(GeometryError::ZeroArea);
        }
        if let Some(edges) = find_self_intersection(&polygon) {
            return Err(GeometryError::SelfIntersecting { edges });
        }

        let rotation_center = polygon
            .centroid()
            .map(|p| Point2::new(p.x(), p.y()))
            .ok_or(GeometryError::ZeroArea)?;

        Ok(Self {
            polygon,
            dispersion,
            rotation_center,
        })
    }

    /// Sets the point the prism rotates about.
    pub fn with_rotation_center(mut self, center: Point2<f64>) -> Self {
        self.rotation_center = center;
        self
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn rotation_center(&self) -> Point2<f64> {
        self.rotation_center
    }

    pub fn num_vertices(&self) -> usize {
        self.polygon.exterior().0.len() - 1
    }

    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    /// Refractive index at the given vacuum wavelength (m).
    pub fn index_at(&self, wavelength: f64) -> f64 {
        self.dispersion.index_at(wavelength)
    }

    /// Returns true if the point lies strictly inside the boundary.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.polygon.contains(&Point::new(point.x, point.y))
    }

    /// Iterates over the edges `(a, b)` in counter-clockwise order.
    pub fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        self.polygon
            .exterior()
            .lines()
            .map(|line| (to_point(line.start), to_point(line.end)))
    }

    /// Moves the medium and its rotation centre.
    pub fn translate(&mut self, delta: Vector2<f64>) {
        self.polygon = self.polygon.translate(delta.x, delta.y);
        self.rotation_center += delta;
    }

    /// Rotates the medium counter-clockwise by `angle` radians about `center`.
    pub fn rotate_about(&mut self, center: Point2<f64>, angle: f64) {
        let pivot = Point::new(center.x, center.y);
        self.polygon = self.polygon.rotate_around_point(angle.to_degrees(), pivot);
        let offset = self.rotation_center - center;
        let (sin, cos) = angle.sin_cos();
        self.rotation_center = center + Vector2::new(cos * offset.x - sin * offset.y, sin * offset.x + cos * offset.y);
    }

    /// Rotates the medium about its own rotation centre.
    pub fn rotate(&mut self, angle: f64) {
        self.rotate_about(self.rotation_center, angle);
    }

    /// A prototype prism `size` across, centred near the origin.
    pub fn prototype(kind: Prototype, size: f64, dispersion: Dispersion) -> Result<Medium, GeometryError> {
        let half = size / 2.0;
        let height = size * 3f64.sqrt() / 2.0;
        let vertices: Vec<[f64; 2]> = match kind {
            Prototype::Triangle => vec![[-half, -height / 3.0], [half, -height / 3.0], [0.0, 2.0 * height / 3.0]],
            Prototype::Trapezoid => vec![
                [-half, -height / 2.0],
                [half, -height / 2.0],
                [half / 2.0, height / 2.0],
                [-half / 2.0, height / 2.0],
            ],
            Prototype::Square => vec![[-half, -half], [half, -half], [half, half], [-half, half]],
            // flat side down
            Prototype::Semicircle => semicircle_vertices(half, 32),
        };
        Medium::from_vertices(&vertices, dispersion)
    }

    /// The prisms offered in the toolbox, each `size` across.
    pub fn prototypes(size: f64, dispersion: Dispersion) -> Vec<Medium> {
        Prototype::ALL
            .iter()
            .filter_map(|kind| Medium::prototype(*kind, size, dispersion).ok())
            .collect()
    }
}

/// Shapes of the toolbox prisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prototype {
    Triangle,
    Trapezoid,
    Square,
    Semicircle,
}

impl Prototype {
    pub const ALL: [Prototype; 4] = [
        Prototype::Triangle,
        Prototype::Trapezoid,
        Prototype::Square,
        Prototype::Semicircle,
    ];
}

/// Vertices of a semicircle of the given radius approximated by `segments` arcs.
fn semicircle_vertices(radius: f64, segments: usize) -> Vec<[f64; 2]> {
    (0..=segments)
        .map(|i| {
            let theta = PI * i as f64 / segments as f64;
            [radius * theta.cos(), radius * theta.sin() - radius / 2.0]
        })
        .collect()
}

/// Returns the first pair of edges that cross each other, if any.
/// Adjacent edges may only share their common vertex.
fn find_self_intersection(polygon: &Polygon<f64>) -> Option<(usize, usize)> {
    let lines: Vec<Line<f64>> = polygon.exterior().lines().collect();
    let n = lines.len();

    lines
        .iter()
        .enumerate()
        .tuple_combinations()
        .find(|((i, a), (j, b))| {
            let adjacent = j - i == 1 || (*i == 0 && *j == n - 1);
            match line_intersection(**a, **b) {
                None => false,
                Some(LineIntersection::Collinear { .. }) => true,
                Some(LineIntersection::SinglePoint { .. }) => !adjacent,
            }
        })
        .map(|((i, _), (j, _))| (i, j))
}

/// Outward unit normal of the edge `a -> b` of a counter-clockwise polygon.
pub fn outward_normal(a: Point2<f64>, b: Point2<f64>) -> Vector2<f64> {
    let d = b - a;
    Vector2::new(d.y, -d.x).normalize()
}

pub fn to_point(coord: Coord<f64>) -> Point2<f64> {
    Point2::new(coord.x, coord.y)
}
