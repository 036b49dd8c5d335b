//! Selection handles and move/resize manipulation.

use crate::shapes::{Freehand, Shape, ShapeId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in page pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;
/// Smallest extent a corner drag can shrink an object to.
const MIN_EXTENT: f64 = 1.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// A corner handle of the selected object.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    pub fn new(position: Point, corner: Corner) -> Self {
        Self { position, corner }
    }

    /// Check if a point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// Corner handles for a shape. Text has none: it moves but does not resize.
pub fn get_handles(shape: &Shape) -> Vec<Handle> {
    if !shape.supports_resize() {
        return Vec::new();
    }
    let b = shape.bounds();
    vec![
        Handle::new(Point::new(b.x0, b.y0), Corner::TopLeft),
        Handle::new(Point::new(b.x1, b.y0), Corner::TopRight),
        Handle::new(Point::new(b.x0, b.y1), Corner::BottomLeft),
        Handle::new(Point::new(b.x1, b.y1), Corner::BottomRight),
    ]
}

/// Find which corner handle (if any) is hit at the given point.
pub fn hit_test_handles(shape: &Shape, point: Point, tolerance: f64) -> Option<Corner> {
    get_handles(shape)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.corner)
}

/// An in-flight move or resize of one object.
#[derive(Debug, Clone)]
pub struct ManipulationState {
    pub shape_id: ShapeId,
    /// The corner being dragged (None = moving the whole object).
    pub handle: Option<Corner>,
    pub start_point: Point,
    pub current_point: Point,
    /// Geometry before the drag, used for previews and to restore an abandoned gesture.
    pub original_shape: Shape,
}

impl ManipulationState {
    pub fn new(shape_id: ShapeId, handle: Option<Corner>, start_point: Point, original_shape: Shape) -> Self {
        Self {
            shape_id,
            handle,
            start_point,
            current_point: start_point,
            original_shape,
        }
    }

    /// Get the drag delta.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    /// The original shape with the current drag applied.
    pub fn preview(&self, keep_aspect_ratio: bool) -> Shape {
        apply_manipulation(&self.original_shape, self.handle, self.delta(), keep_aspect_ratio)
    }
}

/// Apply a drag to a shape and return the result. A corner dragged past the opposite corner
/// flips the box; extents never go negative.
pub fn apply_manipulation(shape: &Shape, handle: Option<Corner>, delta: Vec2, keep_aspect_ratio: bool) -> Shape {
    let mut shape = shape.clone();
    let Some(corner) = handle else {
        shape.transform(Affine::translate(delta));
        return shape;
    };

    let bounds = shape.bounds();
    let target = resized_bounds(bounds, corner, delta, keep_aspect_ratio);
    match &mut shape {
        Shape::Rectangle(rect) => {
            rect.set_corners(Point::new(target.x0, target.y0), Point::new(target.x1, target.y1));
        }
        Shape::Ellipse(ellipse) => {
            ellipse.set_corners(Point::new(target.x0, target.y0), Point::new(target.x1, target.y1));
        }
        Shape::Freehand(path) | Shape::Highlight(path) => fit_freehand(path, bounds, target),
        Shape::Text(_) => {}
    }
    shape
}

/// New bounding box after dragging `corner` by `delta`, normalized so x0 <= x1 and y0 <= y1.
fn resized_bounds(bounds: Rect, corner: Corner, delta: Vec2, keep_aspect_ratio: bool) -> Rect {
    let (moving, anchor) = match corner {
        Corner::TopLeft => (Point::new(bounds.x0, bounds.y0), Point::new(bounds.x1, bounds.y1)),
        Corner::TopRight => (Point::new(bounds.x1, bounds.y0), Point::new(bounds.x0, bounds.y1)),
        Corner::BottomLeft => (Point::new(bounds.x0, bounds.y1), Point::new(bounds.x1, bounds.y0)),
        Corner::BottomRight => (Point::new(bounds.x1, bounds.y1), Point::new(bounds.x0, bounds.y0)),
    };
    let moved = moving + delta;
    let rect = Rect::from_points(anchor, moved);
    let mut width = rect.width().max(MIN_EXTENT);
    let mut height = rect.height().max(MIN_EXTENT);

    if keep_aspect_ratio && bounds.height() > 0.0 {
        let aspect = bounds.width() / bounds.height();
        if aspect > 0.0 {
            let size = width.max(height * aspect);
            width = size;
            height = size / aspect;
        }
    }

    // Grow away from the anchor, toward wherever the pointer ended up
    let x0 = if moved.x < anchor.x { anchor.x - width } else { anchor.x };
    let y0 = if moved.y < anchor.y { anchor.y - height } else { anchor.y };
    Rect::new(x0, y0, x0 + width, y0 + height)
}

/// Map every point of a path from `from` onto `to`.
fn fit_freehand(path: &mut Freehand, from: Rect, to: Rect) {
    if path.is_empty() {
        return;
    }
    let scale_x = to.width() / from.width().max(MIN_EXTENT);
    let scale_y = to.height() / from.height().max(MIN_EXTENT);
    for point in &mut path.points {
        point.x = to.x0 + (point.x - from.x0) * scale_x;
        point.y = to.y0 + (point.y - from.y0) * scale_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Ellipse, Rectangle, ShapeStyle, Text};

    fn rect_of(shape: &Shape) -> &Rectangle {
        match shape {
            Shape::Rectangle(rect) => rect,
            other => panic!("Expected rectangle, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_rectangle_handles() {
        let rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0);
        let handles = get_handles(&Shape::Rectangle(rect));
        assert_eq!(handles.len(), 4);
        assert_eq!(handles[3].corner, Corner::BottomRight);
        assert_eq!(handles[3].position, Point::new(100.0, 50.0));
    }

    #[test]
    fn test_text_has_no_resize_handles() {
        let text = Text::new(Point::ZERO, "Type here".to_string());
        assert!(get_handles(&Shape::Text(text)).is_empty());
    }

    #[test]
    fn test_handle_hit_test() {
        let rect = Shape::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0));
        assert_eq!(
            hit_test_handles(&rect, Point::new(98.0, 97.0), HANDLE_HIT_TOLERANCE),
            Some(Corner::BottomRight)
        );
        assert_eq!(hit_test_handles(&rect, Point::new(50.0, 50.0), HANDLE_HIT_TOLERANCE), None);
    }

    #[test]
    fn test_move() {
        let shape = Shape::Rectangle(Rectangle::new(Point::new(10.0, 10.0), 20.0, 20.0));
        let moved = apply_manipulation(&shape, None, Vec2::new(5.0, -5.0), false);
        assert_eq!(rect_of(&moved).position, Point::new(15.0, 5.0));
        assert_eq!(moved.id(), shape.id());
    }

    #[test]
    fn test_corner_resize() {
        let shape = Shape::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0));
        let result = apply_manipulation(&shape, Some(Corner::BottomRight), Vec2::new(50.0, 50.0), false);
        let rect = rect_of(&result);
        assert!((rect.width - 150.0).abs() < f64::EPSILON);
        assert!((rect.height - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_drag_past_opposite_corner_normalizes() {
        let shape = Shape::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 80.0));
        // Drag bottom-right 150px left and 120px up, past the top-left anchor
        let result = apply_manipulation(&shape, Some(Corner::BottomRight), Vec2::new(-150.0, -120.0), false);
        let rect = rect_of(&result);
        assert!(rect.width >= 0.0 && rect.height >= 0.0);
        assert!((rect.position.x + 50.0).abs() < 1e-9);
        assert!((rect.position.y + 40.0).abs() < 1e-9);
        assert!((rect.width - 50.0).abs() < 1e-9);
        assert!((rect.height - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_ellipse_resize_keeps_radii_positive() {
        let shape = Shape::Ellipse(Ellipse::new(Point::new(50.0, 40.0), 50.0, 40.0));
        let result = apply_manipulation(&shape, Some(Corner::TopLeft), Vec2::new(300.0, 300.0), false);
        let Shape::Ellipse(ellipse) = result else {
            panic!("Expected ellipse");
        };
        assert!(ellipse.radius_x > 0.0);
        assert!(ellipse.radius_y > 0.0);
        assert!(result_is_valid(&Shape::Ellipse(ellipse)));
    }

    fn result_is_valid(shape: &Shape) -> bool {
        shape.has_valid_geometry()
    }

    #[test]
    fn test_freehand_resize() {
        let path = Freehand::from_points(
            vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 50.0),
                Point::new(0.0, 50.0),
            ],
            ShapeStyle::pen(),
        );
        let result = apply_manipulation(
            &Shape::Freehand(path),
            Some(Corner::BottomRight),
            Vec2::new(50.0, 50.0),
            false,
        );
        let bounds = result.bounds();
        assert!((bounds.width() - 100.0).abs() < 0.1);
        assert!((bounds.height() - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_aspect_ratio_resize() {
        let shape = Shape::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0));
        let result = apply_manipulation(&shape, Some(Corner::BottomRight), Vec2::new(100.0, 100.0), true);
        let rect = rect_of(&result);
        assert!((rect.width / rect.height - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_preview_does_not_touch_original() {
        let shape = Shape::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0));
        let mut state = ManipulationState::new(shape.id(), None, Point::ZERO, shape.clone());
        state.current_point = Point::new(5.0, 5.0);
        let preview = state.preview(false);
        assert_eq!(rect_of(&preview).position, Point::new(5.0, 5.0));
        assert_eq!(state.original_shape, shape);
    }
}
