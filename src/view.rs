use geo_types::{Coord, Rect};
use nalgebra::{Affine2, Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};


/// An affine map from model coordinates (metres, y up) to view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelViewTransform {
    transform: Affine2<f64>,
}

impl Default for ModelViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ModelViewTransform {
    pub fn identity() -> Self {
        Self {
            transform: Affine2::identity(),
        }
    }

    /// Maps the model rectangle onto the view rectangle, the top of the model
    /// landing at the top (minimum y) of the view.
    pub fn rectangle_inverted_y(model: &Rect<f64>, view: &Rect<f64>) -> Self {
        let sx = view.width() / model.width();
        let sy = view.height() / model.height();
        #[rustfmt::skip]
        let matrix = Matrix3::new(
            sx,  0.0, view.min().x - sx * model.min().x,
            0.0, -sy, view.min().y + sy * model.max().y,
            0.0, 0.0, 1.0,
        );
        Self {
            transform: Affine2::from_matrix_unchecked(matrix),
        }
    }

    pub fn model_to_view(&self, point: &Point2<f64>) -> Point2<f64> {
        self.transform.transform_point(point)
    }

    pub fn model_to_view_delta(&self, delta: &Vector2<f64>) -> Vector2<f64> {
        self.transform.transform_vector(delta)
    }

    /// `None` for a degenerate transform.
    pub fn view_to_model(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        self.transform.try_inverse().map(|inverse| inverse.transform_point(point))
    }
}

/// What the renderer currently shows: a transform and the visible view rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub transform: ModelViewTransform,
    pub bounds: Option<Rect<f64>>, // `None` shows the whole plane
}

impl Default for View {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl View {
    pub fn new(transform: ModelViewTransform, bounds: Rect<f64>) -> Self {
        Self {
            transform,
            bounds: Some(bounds),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            transform: ModelViewTransform::identity(),
            bounds: None,
        }
    }

    /// Whether a model point lands inside the visible view bounds.
    pub fn is_visible(&self, point: &Point2<f64>) -> bool {
        let Some(bounds) = self.bounds else {
            return true;
        };
        let p = self.transform.model_to_view(point);
        let (min, max) = (bounds.min(), bounds.max());
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }
}

/// View settings as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub width: f64,  // view width in pixels
    pub height: f64, // view height in pixels
}

impl ViewSettings {
    /// A view of the given pixel size showing exactly `model`.
    pub fn view_of(&self, model: &Rect<f64>) -> View {
        let screen = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: self.width, y: self.height });
        View::new(ModelViewTransform::rectangle_inverted_y(model, &screen), screen)
    }
}
