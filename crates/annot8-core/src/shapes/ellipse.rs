//! Ellipse annotation.

use super::{ShapeId, ShapeStyle, ShapeTrait, axis_scale};
use kurbo::{Affine, BezPath, Ellipse as KurboEllipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An outlined ellipse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub(crate) id: ShapeId,
    /// Center point.
    pub center: Point,
    /// Horizontal radius.
    pub radius_x: f64,
    /// Vertical radius.
    pub radius_y: f64,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Ellipse {
    /// Create a new ellipse.
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius_x: radius_x.abs(),
            radius_y: radius_y.abs(),
            style: ShapeStyle::default(),
        }
    }

    /// Create an ellipse from a bounding rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }

    /// Fit the ellipse into the box spanned by two corners, keeping id and style.
    pub fn set_corners(&mut self, p1: Point, p2: Point) {
        let rect = Rect::from_points(p1, p2);
        self.center = rect.center();
        self.radius_x = rect.width() / 2.0;
        self.radius_y = rect.height() / 2.0;
    }

    /// Get as a kurbo Ellipse.
    pub fn as_kurbo(&self) -> KurboEllipse {
        KurboEllipse::new(self.center, (self.radius_x, self.radius_y), 0.0)
    }
}

impl ShapeTrait for Ellipse {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.stroke_width / 2.0;
        let offset = point - self.center;
        let inside = |rx: f64, ry: f64| (offset.x / rx).powi(2) + (offset.y / ry).powi(2) <= 1.0;
        if !inside(self.radius_x + reach, self.radius_y + reach) {
            return false;
        }
        if self.style.fill_color.is_some() {
            return true;
        }
        let (inner_x, inner_y) = (self.radius_x - reach, self.radius_y - reach);
        inner_x <= 0.0 || inner_y <= 0.0 || !inside(inner_x, inner_y)
    }

    fn to_path(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        let scale = axis_scale(affine);
        self.center = affine * self.center;
        self.radius_x *= scale.x;
        self.radius_y *= scale.y;
    }
}
