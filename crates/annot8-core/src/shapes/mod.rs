//! Annotation object definitions.

mod ellipse;
mod freehand;
mod rectangle;
mod text;

pub use ellipse::Ellipse;
pub use freehand::Freehand;
pub use rectangle::Rectangle;
pub use text::Text;

use kurbo::{Affine, BezPath, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Highlighter yellow at 40% opacity.
    pub fn highlight_yellow() -> Self {
        Self::new(255, 255, 0, 102)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties for annotation objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color.
    pub stroke_color: SerializableColor,
    /// Stroke width in page pixels.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill_color: Option<SerializableColor>,
}

impl ShapeStyle {
    /// Black 2px pen stroke, also used for shape outlines.
    pub fn pen() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
        }
    }

    /// Wide semi-transparent yellow stroke.
    pub fn highlighter() -> Self {
        Self {
            stroke_color: SerializableColor::highlight_yellow(),
            stroke_width: 20.0,
            fill_color: None,
        }
    }

    /// Get the stroke color as a peniko Color.
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    /// Get the fill color as a peniko Color.
    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| c.into())
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self::pen()
    }
}

/// Unique identifier for annotation objects.
pub type ShapeId = Uuid;

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Per-axis scale factors of an axis-aligned affine. Extents ignore flips.
pub(crate) fn axis_scale(affine: Affine) -> Vec2 {
    let [a, _, _, d, _, _] = affine.as_coeffs();
    Vec2::new(a.abs(), d.abs())
}

/// Common trait for all annotation objects.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in page-local coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point (in page-local coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Get the path representation for rendering.
    fn to_path(&self) -> BezPath;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Apply a transform to this shape's geometry.
    ///
    /// Only translation and axis-aligned scaling are meaningful; extents stay non-negative.
    fn transform(&mut self, affine: Affine);
}

/// Enum wrapper for all annotation object types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Freehand(Freehand),
    Highlight(Freehand),
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Text(Text),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.id(),
            Shape::Rectangle(s) => s.id(),
            Shape::Ellipse(s) => s.id(),
            Shape::Text(s) => s.id(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.hit_test(point, tolerance),
            Shape::Rectangle(s) => s.hit_test(point, tolerance),
            Shape::Ellipse(s) => s.hit_test(point, tolerance),
            Shape::Text(s) => s.hit_test(point, tolerance),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.to_path(),
            Shape::Rectangle(s) => s.to_path(),
            Shape::Ellipse(s) => s.to_path(),
            Shape::Text(s) => s.to_path(),
        }
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.style(),
            Shape::Rectangle(s) => s.style(),
            Shape::Ellipse(s) => s.style(),
            Shape::Text(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.style_mut(),
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Ellipse(s) => s.style_mut(),
            Shape::Text(s) => s.style_mut(),
        }
    }

    pub fn transform(&mut self, affine: Affine) {
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => s.transform(affine),
            Shape::Rectangle(s) => s.transform(affine),
            Shape::Ellipse(s) => s.transform(affine),
            Shape::Text(s) => s.transform(affine),
        }
    }

    /// Short type name, used in log output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Freehand(_) => "freehand",
            Shape::Highlight(_) => "highlight",
            Shape::Rectangle(_) => "rectangle",
            Shape::Ellipse(_) => "ellipse",
            Shape::Text(_) => "text",
        }
    }

    /// Whether every extent is finite and non-negative.
    pub fn has_valid_geometry(&self) -> bool {
        let finite = |v: f64| v.is_finite();
        match self {
            Shape::Freehand(s) | Shape::Highlight(s) => {
                s.points.iter().all(|p| finite(p.x) && finite(p.y))
            }
            Shape::Rectangle(r) => {
                finite(r.position.x) && finite(r.position.y) && r.width >= 0.0 && r.height >= 0.0
            }
            Shape::Ellipse(e) => {
                finite(e.center.x) && finite(e.center.y) && e.radius_x >= 0.0 && e.radius_y >= 0.0
            }
            Shape::Text(t) => finite(t.position.x) && finite(t.position.y) && t.font_size > 0.0,
        }
    }

    /// Get the text if this shape is a text object.
    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this shape can be resized by corner handles.
    pub fn supports_resize(&self) -> bool {
        !matches!(self, Shape::Text(_))
    }
}
