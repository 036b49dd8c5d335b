//! Page navigation with flush-then-load scene swapping.

use crate::storage::{PageIndex, PersistenceScheduler, SceneStore, StorageResult};
use crate::surface::EditingSurface;
use crate::timer::Instant;
use crate::transform::{ScaleBaseline, SurfaceSync, SyncTrigger, scene_from_logical, scene_to_logical};

/// Everything a page switch reads or writes, borrowed from the session.
pub struct PageSwitchContext<'a> {
    pub surface: &'a mut EditingSurface,
    pub store: &'a mut dyn SceneStore,
    pub scheduler: &'a mut PersistenceScheduler,
    pub baseline: &'a mut ScaleBaseline,
    pub sync: &'a mut SurfaceSync,
    /// Zoom in effect during the switch.
    pub scale: f64,
    pub now: Instant,
}

/// Outcome of a completed page switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSwitchResult {
    pub from: PageIndex,
    pub to: PageIndex,
    /// Number of objects on the incoming page.
    pub loaded_objects: usize,
}

/// Write the live scene to the store now, finalizing any pending debounced save.
///
/// The journal is drained first: everything it describes is captured by this write.
pub fn flush_live_scene(
    surface: &mut EditingSurface,
    store: &mut dyn SceneStore,
    scheduler: &mut PersistenceScheduler,
    page: PageIndex,
    scale: f64,
) -> StorageResult<()> {
    surface.drain_mutations();
    if scheduler.take_pending() {
        log::debug!("Finalizing pending save for page {}", page);
    }
    store.save_scene(page, &scene_to_logical(surface.scene(), scale))
}

/// Tracks the current page and performs switches.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: PageIndex,
    total: u32,
}

impl Navigator {
    /// Start on page 1 of a document with `total` pages.
    pub fn new(total: u32) -> Self {
        Self {
            current: 1,
            total: total.max(1),
        }
    }

    pub fn current_page(&self) -> PageIndex {
        self.current
    }

    pub fn total_pages(&self) -> u32 {
        self.total
    }

    pub fn can_go_back(&self) -> bool {
        self.current > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.current < self.total
    }

    /// Page reached by moving `offset` pages, clamped to the document.
    pub fn offset_target(&self, offset: i64) -> PageIndex {
        let target = (i64::from(self.current) + offset).clamp(1, i64::from(self.total));
        // Clamped into 1..=total, which always fits
        PageIndex::try_from(target).unwrap_or(self.current)
    }

    /// Whether `page` is a valid target other than the current page.
    pub fn would_switch_to(&self, page: PageIndex) -> bool {
        page != self.current && (1..=self.total).contains(&page)
    }

    /// Move by `offset` pages. Returns `None` when the clamped target is the current page.
    pub fn change_page(
        &mut self,
        offset: i64,
        ctx: PageSwitchContext<'_>,
    ) -> StorageResult<Option<PageSwitchResult>> {
        let target = self.offset_target(offset);
        if target == self.current {
            log::debug!("Page change by {} stays on page {}", offset, self.current);
            return Ok(None);
        }
        self.switch_to(target, ctx).map(Some)
    }

    /// Jump to a page. Out-of-range and current-page targets are ignored.
    pub fn jump_to_page(
        &mut self,
        page: PageIndex,
        ctx: PageSwitchContext<'_>,
    ) -> StorageResult<Option<PageSwitchResult>> {
        if !self.would_switch_to(page) {
            log::debug!("Ignoring jump to page {} (current {}, total {})", page, self.current, self.total);
            return Ok(None);
        }
        self.switch_to(page, ctx).map(Some)
    }

    fn switch_to(&mut self, target: PageIndex, ctx: PageSwitchContext<'_>) -> StorageResult<PageSwitchResult> {
        let PageSwitchContext {
            surface,
            store,
            scheduler,
            baseline,
            sync,
            scale,
            now,
        } = ctx;
        let from = self.current;

        // Outgoing page is fully written before anything is loaded
        flush_live_scene(surface, store, scheduler, from, scale)?;

        scheduler.begin_load();
        let incoming = scene_from_logical(store.load_scene(target), scale);
        let loaded_objects = incoming.len();
        surface.load_scene(incoming);
        for mutation in surface.drain_mutations() {
            scheduler.notify(now);
            log::trace!("Load mutation {:?} ignored", mutation);
        }
        scheduler.end_load();

        self.current = target;
        baseline.reset(scale);
        sync.request(SyncTrigger::PageLoad, now);
        log::debug!("Switched page {} -> {} ({} objects)", from, target, loaded_objects);

        Ok(PageSwitchResult {
            from,
            to: target,
            loaded_objects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::VectorScene;
    use crate::shapes::{Rectangle, Shape};
    use crate::storage::MemoryStore;
    use kurbo::{Point, Size};

    struct Fixture {
        surface: EditingSurface,
        store: MemoryStore,
        scheduler: PersistenceScheduler,
        baseline: ScaleBaseline,
        sync: SurfaceSync,
        scale: f64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                surface: EditingSurface::new(Size::new(600.0, 800.0)),
                store: MemoryStore::new(),
                scheduler: PersistenceScheduler::default(),
                baseline: ScaleBaseline::new(1.0),
                sync: SurfaceSync::default(),
                scale: 1.0,
            }
        }

        fn ctx(&mut self) -> PageSwitchContext<'_> {
            PageSwitchContext {
                surface: &mut self.surface,
                store: &mut self.store,
                scheduler: &mut self.scheduler,
                baseline: &mut self.baseline,
                sync: &mut self.sync,
                scale: self.scale,
                now: Instant::now(),
            }
        }
    }

    fn rect(x: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, 10.0), 50.0, 40.0))
    }

    #[test]
    fn test_change_page_clamps() {
        let mut nav = Navigator::new(3);
        let mut fx = Fixture::new();

        assert_eq!(nav.change_page(-1, fx.ctx()).unwrap(), None);
        let result = nav.change_page(10, fx.ctx()).unwrap().unwrap();
        assert_eq!(result.to, 3);
        assert!(!nav.can_go_forward());
        assert!(nav.can_go_back());
    }

    #[test]
    fn test_round_trip_through_store() {
        let mut nav = Navigator::new(3);
        let mut fx = Fixture::new();
        fx.surface.add_shape(rect(1.0));
        fx.surface.add_shape(rect(2.0));
        let page_one = fx.surface.scene().clone();

        nav.change_page(1, fx.ctx()).unwrap();
        assert!(fx.surface.scene().is_empty());
        assert_eq!(fx.store.load_scene(1), page_one);

        fx.surface.add_shape(rect(3.0));
        nav.change_page(-1, fx.ctx()).unwrap();
        assert_eq!(fx.surface.scene(), &page_one);
        assert_eq!(fx.store.load_scene(2).len(), 1);
    }

    #[test]
    fn test_load_schedules_no_save() {
        let mut nav = Navigator::new(2);
        let mut fx = Fixture::new();
        let mut stored = VectorScene::new();
        for i in 0..5 {
            stored.add_shape(rect(f64::from(i)));
        }
        fx.store.save_scene(2, &stored).unwrap();

        nav.jump_to_page(2, fx.ctx()).unwrap();
        assert_eq!(fx.surface.scene().len(), 5);
        assert!(!fx.scheduler.is_pending());
        assert_eq!(fx.scheduler.ignored(), 5);
        assert!(!fx.scheduler.is_loading());
    }

    #[test]
    fn test_jump_no_ops_leave_state_untouched() {
        let mut nav = Navigator::new(3);
        let mut fx = Fixture::new();
        fx.surface.add_shape(rect(1.0));

        for page in [0, 1, 4, 99] {
            assert_eq!(nav.jump_to_page(page, fx.ctx()).unwrap(), None);
        }
        assert_eq!(nav.current_page(), 1);
        assert!(fx.store.is_empty());
        assert_eq!(fx.store.writes(), 0);
        assert_eq!(fx.surface.scene().len(), 1);
    }

    #[test]
    fn test_flush_finalizes_pending_save() {
        let mut nav = Navigator::new(2);
        let mut fx = Fixture::new();
        fx.surface.add_shape(rect(1.0));
        fx.scheduler.notify(Instant::now());

        nav.jump_to_page(2, fx.ctx()).unwrap();
        assert!(!fx.scheduler.is_pending());
        assert_eq!(fx.store.load_scene(1).len(), 1);
    }

    #[test]
    fn test_switch_resets_baseline_and_requests_sync() {
        let mut nav = Navigator::new(2);
        let mut fx = Fixture::new();
        fx.baseline = ScaleBaseline::new(0.7);
        fx.scale = 1.4;

        nav.jump_to_page(2, fx.ctx()).unwrap();
        assert!((fx.baseline.last() - 1.4).abs() < f64::EPSILON);
        assert_eq!(fx.sync.pending_triggers(), &[SyncTrigger::PageLoad]);
    }

    #[test]
    fn test_pages_saved_at_one_zoom_reopen_at_another() {
        let mut nav = Navigator::new(2);
        let mut fx = Fixture::new();
        let id = fx.surface.add_shape(rect(10.0));

        nav.jump_to_page(2, fx.ctx()).unwrap();
        fx.scale = 2.0;
        nav.jump_to_page(1, fx.ctx()).unwrap();

        let Some(Shape::Rectangle(r)) = fx.surface.scene().get_shape(id) else {
            panic!("Expected rectangle");
        };
        assert!((r.position.x - 20.0).abs() < 1e-9);
        assert!((r.width - 100.0).abs() < 1e-9);
    }
}
