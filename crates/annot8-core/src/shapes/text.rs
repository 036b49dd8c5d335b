//! Text annotation.

use super::{ShapeId, ShapeStyle, ShapeTrait, axis_scale};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.55;
/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.2;

/// A single- or multi-line text label. The stroke color of its style is the text color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Position (top-left corner of text bounding box).
    pub position: Point,
    /// The text content.
    pub content: String,
    /// Font size in page pixels.
    pub font_size: f64,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Text {
    /// Default font size for inserted text.
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;

    /// Create a new text shape.
    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            font_size: Self::DEFAULT_FONT_SIZE,
            style: ShapeStyle::default(),
        }
    }

    /// Set the font size.
    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    /// Create a text shape whose approximate bounds are centered on a point.
    pub fn centered(center: Point, content: String, font_size: f64) -> Self {
        let mut text = Self::new(Point::ZERO, content).with_font_size(font_size);
        let bounds = text.bounds();
        text.position = Point::new(
            center.x - bounds.width() / 2.0,
            center.y - bounds.height() / 2.0,
        );
        text
    }

    /// Get the text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Approximate width based on the longest line.
    fn approximate_width(&self) -> f64 {
        let max_line_len = self
            .content
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        max_line_len as f64 * self.font_size * CHAR_WIDTH_FACTOR
    }

    /// Approximate height based on font size and number of lines.
    fn approximate_height(&self) -> f64 {
        let mut line_count = self.content.lines().count().max(1);
        if self.content.ends_with('\n') {
            line_count += 1;
        }
        line_count as f64 * self.font_size * LINE_HEIGHT
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let width = self.approximate_width().max(20.0);
        let height = self.approximate_height();
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + width,
            self.position.y + height,
        )
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        // Glyphs are laid out by the renderer; the box is enough for selection
        self.bounds().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        let scale = axis_scale(affine);
        self.position = affine * self.position;
        self.font_size *= (scale.x + scale.y) / 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_creation() {
        let text = Text::new(Point::new(100.0, 100.0), "Hello".to_string());
        assert_eq!(text.content(), "Hello");
        assert!((text.font_size - Text::DEFAULT_FONT_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_centered() {
        let text = Text::centered(Point::new(300.0, 200.0), "Type here".to_string(), 16.0);
        let center = text.bounds().center();
        assert!((center.x - 300.0).abs() < 1e-9);
        assert!((center.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test() {
        let text = Text::new(Point::new(100.0, 100.0), "Hello World".to_string());
        let center = text.bounds().center();
        assert!(text.hit_test(center, 0.0));
        assert!(!text.hit_test(Point::new(0.0, 0.0), 0.0));
    }

    #[test]
    fn test_scale_changes_font_size() {
        let mut text = Text::new(Point::new(10.0, 10.0), "Hi".to_string());
        text.transform(Affine::scale(1.5));
        assert!((text.font_size - 24.0).abs() < 1e-10);
        assert!((text.position.x - 15.0).abs() < 1e-10);
    }
}
