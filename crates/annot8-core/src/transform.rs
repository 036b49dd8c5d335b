//! Coordinate transform between page-local and logical space.
//!
//! Object geometry lives in page-local pixels at the current zoom. When the zoom changes the
//! live scene is rescaled by `new / old`, with the last applied scale tracked explicitly.
//! Stored snapshots are kept in logical units (scale 1.0) so that a page saved at one zoom
//! and reopened at another comes back at the right size.
//!
//! Rotation never rewrites object geometry. It only changes the rendered page box, which the
//! surface sync re-measures.

use crate::scene::VectorScene;
use crate::storage::PageIndex;
use crate::surface::EditingSurface;
use crate::timer::{Debounce, Instant};
use kurbo::{Affine, Point, Size};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet period before the surface box is re-measured.
pub const DEFAULT_RESYNC_DEBOUNCE: Duration = Duration::from_millis(100);

/// Ratios this close to 1 are treated as "no change".
const RATIO_EPSILON: f64 = 1e-12;

/// Page rotation in quarter turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Parse a multiple of 90 (any multiple, normalized mod 360).
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Rotation::Deg0,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }

    /// Quarter turn clockwise.
    pub fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Whether the rendered box has width and height exchanged.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Convert a page-local point to logical (scale 1.0) units.
pub fn to_logical(point: Point, scale: f64) -> Point {
    Point::new(point.x / scale, point.y / scale)
}

/// Convert a logical point to page-local units at `scale`.
pub fn to_page_local(point: Point, scale: f64) -> Point {
    Point::new(point.x * scale, point.y * scale)
}

fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Ratio to apply when moving from `s_old` to `s_new`, or `None` when nothing should change.
fn rescale_ratio(s_old: f64, s_new: f64) -> Option<f64> {
    if !is_valid_scale(s_old) || !is_valid_scale(s_new) {
        log::warn!("Skipping rescale with degenerate scales {} -> {}", s_old, s_new);
        return None;
    }
    let ratio = s_new / s_old;
    if (ratio - 1.0).abs() < RATIO_EPSILON {
        None
    } else {
        Some(ratio)
    }
}

/// Multiply every coordinate and extent in the scene by `s_new / s_old`. Returns whether
/// anything was written. Stroke widths are left alone.
pub fn rescale(scene: &mut VectorScene, s_old: f64, s_new: f64) -> bool {
    match rescale_ratio(s_old, s_new) {
        Some(ratio) => {
            scene.transform_all(Affine::scale(ratio));
            true
        }
        None => false,
    }
}

/// Copy of a live scene converted to logical units, for storage.
pub fn scene_to_logical(scene: &VectorScene, scale: f64) -> VectorScene {
    let mut logical = scene.clone();
    rescale(&mut logical, scale, 1.0);
    logical
}

/// A stored logical scene converted to page-local units at `scale`.
pub fn scene_from_logical(mut scene: VectorScene, scale: f64) -> VectorScene {
    rescale(&mut scene, 1.0, scale);
    scene
}

/// The last scale that was applied to the live scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBaseline {
    last: f64,
}

impl ScaleBaseline {
    pub fn new(scale: f64) -> Self {
        Self { last: scale }
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    /// Make `scale` the baseline without touching geometry (after a page load).
    pub fn reset(&mut self, scale: f64) {
        self.last = scale;
    }

    /// Rescale the live scene from the baseline to `new_scale` and adopt it as the new
    /// baseline. A degenerate baseline is replaced by `new_scale` with no rescale.
    pub fn apply(&mut self, surface: &mut EditingSurface, new_scale: f64) -> bool {
        if !is_valid_scale(self.last) {
            log::warn!("Scale baseline {} is degenerate, adopting {}", self.last, new_scale);
            self.last = new_scale;
            return false;
        }
        let applied = match rescale_ratio(self.last, new_scale) {
            Some(ratio) => {
                surface.transform_untracked(Affine::scale(ratio));
                true
            }
            None => false,
        };
        if is_valid_scale(new_scale) {
            self.last = new_scale;
        }
        applied
    }
}

/// External page renderer. Only page count and rendered box size are consumed.
pub trait PageRenderer {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Rendered pixel box of a page, or `None` if it cannot be measured right now.
    fn measure(&self, page: PageIndex, scale: f64, rotation: Rotation) -> Option<Size>;
}

/// Reason for re-measuring the surface box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncTrigger {
    PageLoad,
    ScaleChange,
    RotationChange,
    ContainerResize,
}

/// Result of a fired surface sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// Nothing was due.
    Idle,
    /// The surface was resized to the measured box.
    Resized(Size),
    /// The measured box equals the current one.
    Unchanged,
    /// The renderer could not measure the page.
    Unmeasured,
}

/// Keeps the editing surface's pixel box equal to the rendered page box.
#[derive(Debug, Clone)]
pub struct SurfaceSync {
    timer: Debounce,
    triggers: Vec<SyncTrigger>,
    resyncs: u64,
    skipped: u64,
}

impl Default for SurfaceSync {
    fn default() -> Self {
        Self::new(DEFAULT_RESYNC_DEBOUNCE)
    }
}

impl SurfaceSync {
    pub fn new(delay: Duration) -> Self {
        Self {
            timer: Debounce::new(delay),
            triggers: Vec::new(),
            resyncs: 0,
            skipped: 0,
        }
    }

    /// Schedule a re-measure. Triggers arriving within the quiet period coalesce.
    pub fn request(&mut self, trigger: SyncTrigger, now: Instant) {
        if !self.triggers.contains(&trigger) {
            self.triggers.push(trigger);
        }
        self.timer.trigger(now);
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Triggers coalesced into the pending sync.
    pub fn pending_triggers(&self) -> &[SyncTrigger] {
        &self.triggers
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.triggers.clear();
    }

    /// Run the sync if its quiet period has elapsed.
    pub fn poll(
        &mut self,
        now: Instant,
        renderer: &dyn PageRenderer,
        page: PageIndex,
        scale: f64,
        rotation: Rotation,
        surface: &mut EditingSurface,
    ) -> SyncOutcome {
        if !self.timer.poll(now) {
            return SyncOutcome::Idle;
        }
        let triggers = std::mem::take(&mut self.triggers);
        let Some(measured) = renderer.measure(page, scale, rotation) else {
            log::debug!("Page {} not measurable, sync for {:?} dropped", page, triggers);
            return SyncOutcome::Unmeasured;
        };
        if surface.set_size(measured) {
            self.resyncs += 1;
            log::debug!("Surface resized to {:?} ({:?})", measured, triggers);
            SyncOutcome::Resized(measured)
        } else {
            self.skipped += 1;
            SyncOutcome::Unchanged
        }
    }

    /// Number of syncs that changed the surface box.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Number of syncs skipped because the box was already correct.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Ellipse, Freehand, Rectangle, Shape, ShapeStyle, Text};

    struct FixedRenderer {
        native: Size,
        pages: u32,
    }

    impl PageRenderer for FixedRenderer {
        fn page_count(&self) -> u32 {
            self.pages
        }

        fn measure(&self, page: PageIndex, scale: f64, rotation: Rotation) -> Option<Size> {
            if page == 0 || page > self.pages {
                return None;
            }
            let size = Size::new(self.native.width * scale, self.native.height * scale);
            Some(if rotation.swaps_axes() {
                Size::new(size.height, size.width)
            } else {
                size
            })
        }
    }

    fn scene() -> VectorScene {
        let mut scene = VectorScene::new();
        scene.add_shape(Shape::Rectangle(Rectangle::new(Point::new(10.0, 20.0), 100.0, 80.0)));
        scene.add_shape(Shape::Ellipse(Ellipse::new(Point::new(60.0, 40.0), 50.0, 40.0)));
        scene.add_shape(Shape::Freehand(Freehand::from_points(
            vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            ShapeStyle::pen(),
        )));
        scene.add_shape(Shape::Text(Text::new(Point::new(7.0, 9.0), "Type here".to_string())));
        scene
    }

    fn approx_eq(a: &VectorScene, b: &VectorScene) -> bool {
        a.ids() == b.ids()
            && a.shapes_ordered().zip(b.shapes_ordered()).all(|(x, y)| {
                let (bx, by) = (x.bounds(), y.bounds());
                (bx.x0 - by.x0).abs() < 1e-9
                    && (bx.y0 - by.y0).abs() < 1e-9
                    && (bx.x1 - by.x1).abs() < 1e-9
                    && (bx.y1 - by.y1).abs() < 1e-9
            })
    }

    #[test]
    fn test_rescale_multiplies_geometry() {
        let mut scaled = scene();
        assert!(rescale(&mut scaled, 1.0, 1.5));

        let Some(Shape::Rectangle(rect)) = scaled.shapes_ordered().next().cloned() else {
            panic!("Expected rectangle first");
        };
        assert!((rect.position.x - 15.0).abs() < 1e-9);
        assert!((rect.position.y - 30.0).abs() < 1e-9);
        assert!((rect.width - 150.0).abs() < 1e-9);
        assert!((rect.height - 120.0).abs() < 1e-9);
        assert!((rect.style.stroke_width - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rescale_inverse_restores() {
        let original = scene();
        let mut working = original.clone();
        rescale(&mut working, 1.0, 1.7);
        rescale(&mut working, 1.7, 1.0);
        assert!(approx_eq(&working, &original));
        assert_eq!(working.len(), original.len());
    }

    #[test]
    fn test_rescale_identity_is_a_no_op() {
        let original = scene();
        let mut working = original.clone();
        assert!(!rescale(&mut working, 1.2, 1.2));
        assert_eq!(working, original);
    }

    #[test]
    fn test_degenerate_scales_do_nothing() {
        let original = scene();
        let mut working = original.clone();
        assert!(!rescale(&mut working, 0.0, 1.5));
        assert!(!rescale(&mut working, f64::NAN, 1.5));
        assert!(!rescale(&mut working, 1.0, -2.0));
        assert_eq!(working, original);
    }

    #[test]
    fn test_baseline_recovers_from_degenerate_value() {
        let mut surface = EditingSurface::default();
        surface.load_scene(scene());
        let before = surface.scene().clone();

        let mut baseline = ScaleBaseline::new(0.0);
        assert!(!baseline.apply(&mut surface, 1.3));
        assert_eq!(surface.scene(), &before);
        assert!((baseline.last() - 1.3).abs() < f64::EPSILON);

        assert!(baseline.apply(&mut surface, 2.6));
        assert!((baseline.last() - 2.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_logical_roundtrip() {
        let live = scene();
        let logical = scene_to_logical(&live, 2.0);
        let back = scene_from_logical(logical, 2.0);
        assert!(approx_eq(&back, &live));

        let p = Point::new(30.0, 40.0);
        assert_eq!(to_page_local(to_logical(p, 2.0), 2.0), p);
    }

    #[test]
    fn test_rotation_cycle() {
        let mut rotation = Rotation::Deg0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            rotation = rotation.next();
            seen.push(rotation.degrees());
        }
        assert_eq!(seen, vec![90, 180, 270, 0]);
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(45), None);
        assert!(Rotation::Deg90.swaps_axes());
        assert!(!Rotation::Deg180.swaps_axes());
    }

    #[test]
    fn test_surface_sync_coalesces_and_skips_redundant() {
        let renderer = FixedRenderer {
            native: Size::new(600.0, 800.0),
            pages: 3,
        };
        let mut surface = EditingSurface::new(Size::ZERO);
        let mut sync = SurfaceSync::default();
        let t0 = Instant::now();

        sync.request(SyncTrigger::PageLoad, t0);
        sync.request(SyncTrigger::ContainerResize, t0 + Duration::from_millis(50));
        assert_eq!(sync.pending_triggers().len(), 2);

        let early = sync.poll(t0 + Duration::from_millis(120), &renderer, 1, 1.0, Rotation::Deg0, &mut surface);
        assert_eq!(early, SyncOutcome::Idle);

        let fired = sync.poll(t0 + Duration::from_millis(150), &renderer, 1, 1.0, Rotation::Deg0, &mut surface);
        assert_eq!(fired, SyncOutcome::Resized(Size::new(600.0, 800.0)));

        sync.request(SyncTrigger::ContainerResize, t0 + Duration::from_millis(200));
        let again = sync.poll(t0 + Duration::from_millis(300), &renderer, 1, 1.0, Rotation::Deg0, &mut surface);
        assert_eq!(again, SyncOutcome::Unchanged);
        assert_eq!(sync.resyncs(), 1);
        assert_eq!(sync.skipped(), 1);
    }

    #[test]
    fn test_rotation_swaps_measured_box() {
        let renderer = FixedRenderer {
            native: Size::new(600.0, 800.0),
            pages: 1,
        };
        let mut surface = EditingSurface::new(Size::new(600.0, 800.0));
        let mut sync = SurfaceSync::default();
        let t0 = Instant::now();

        sync.request(SyncTrigger::RotationChange, t0);
        let outcome = sync.poll(t0 + DEFAULT_RESYNC_DEBOUNCE, &renderer, 1, 1.0, Rotation::Deg90, &mut surface);
        assert_eq!(outcome, SyncOutcome::Resized(Size::new(800.0, 600.0)));
    }
}
