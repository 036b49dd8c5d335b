//! Session state for one accepted file, and the workspace that owns it.

use crate::config::EngineConfig;
use crate::export::{ExportError, ExportResult, PageImage, SceneRasterizer};
use crate::input::{KeyEvent, Modifiers, PointerEvent};
use crate::navigator::{Navigator, PageSwitchContext, PageSwitchResult, flush_live_scene};
use crate::notes::{NoteDocument, NotesError, NotesExport, NotesFormat};
use crate::scene::{SerializedScene, VectorScene};
use crate::shapes::ShapeId;
use crate::storage::{MemoryStore, PageIndex, PersistenceScheduler, SceneStore, StorageResult};
use crate::surface::EditingSurface;
use crate::timer::Instant;
use crate::tools::{ToolKind, ToolManager, ToolSettings};
use crate::transform::{
    PageRenderer, Rotation, ScaleBaseline, SurfaceSync, SyncOutcome, SyncTrigger, scene_from_logical,
    scene_to_logical,
};
use kurbo::Size;
use std::collections::BTreeMap;
use thiserror::Error;

/// Zoom when a file is opened.
pub const INITIAL_SCALE: f64 = 1.0;

/// MIME type of accepted files.
pub const PDF_MIME: &str = "application/pdf";

/// File intake rejections. The workspace is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("File is empty")]
    Empty,
    #[error("File is too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("Not a PDF: {name} ({mime})")]
    NotPdf { name: String, mime: String },
    #[error("Document has no pages")]
    NoPages,
}

/// A file handed over by the drop zone or file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Validates files before a session is created.
#[derive(Debug, Clone, Copy)]
pub struct FileIntake {
    max_bytes: u64,
}

impl FileIntake {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Accept PDFs by MIME type, or by `.pdf` extension when the MIME type is missing.
    pub fn validate(&self, file: &SourceFile) -> Result<(), IntakeError> {
        if file.is_empty() {
            return Err(IntakeError::Empty);
        }
        if file.len() > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size: file.len(),
                limit: self.max_bytes,
            });
        }
        let by_mime = file.mime.eq_ignore_ascii_case(PDF_MIME);
        let by_extension = file.mime.is_empty() && file.name.to_ascii_lowercase().ends_with(".pdf");
        if !(by_mime || by_extension) {
            return Err(IntakeError::NotPdf {
                name: file.name.clone(),
                mime: file.mime.clone(),
            });
        }
        Ok(())
    }
}

/// Host facility that exposes a file under a URL the PDF renderer can load.
pub trait ObjectUrls {
    fn create(&mut self, file: &SourceFile) -> String;
    fn revoke(&mut self, url: &str);
}

/// What happened during one `tick`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The live scene was written to the store.
    pub saved: bool,
    /// The surface box changed to this size.
    pub resized: Option<Size>,
    /// Newly committed notes text.
    pub notes_committed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Save,
    Resync,
    Notes,
}

/// Everything tied to one accepted file.
pub struct Session {
    config: EngineConfig,
    source_name: String,
    object_url: String,
    renderer: Box<dyn PageRenderer>,
    navigator: Navigator,
    scale: f64,
    rotation: Rotation,
    tools: ToolManager,
    surface: EditingSurface,
    store: MemoryStore,
    scheduler: PersistenceScheduler,
    baseline: ScaleBaseline,
    sync: SurfaceSync,
    notes: NoteDocument,
}

impl Session {
    /// Start on page 1 at the initial zoom, with an empty store and empty notes.
    pub fn new(
        config: EngineConfig,
        source_name: impl Into<String>,
        object_url: String,
        renderer: Box<dyn PageRenderer>,
        now: Instant,
    ) -> Self {
        let navigator = Navigator::new(renderer.page_count());
        let rotation = Rotation::default();
        let size = renderer
            .measure(navigator.current_page(), INITIAL_SCALE, rotation)
            .unwrap_or(Size::ZERO);
        let mut sync = SurfaceSync::new(config.resync_debounce());
        sync.request(SyncTrigger::PageLoad, now);

        Self {
            tools: ToolManager::new(ToolSettings::from(&config)),
            scheduler: PersistenceScheduler::new(config.save_debounce()),
            notes: NoteDocument::new(config.notes_debounce()),
            source_name: source_name.into(),
            object_url,
            renderer,
            navigator,
            scale: INITIAL_SCALE,
            rotation,
            surface: EditingSurface::new(size),
            store: MemoryStore::new(),
            baseline: ScaleBaseline::new(INITIAL_SCALE),
            sync,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn object_url(&self) -> &str {
        &self.object_url
    }

    pub fn current_page(&self) -> PageIndex {
        self.navigator.current_page()
    }

    pub fn total_pages(&self) -> u32 {
        self.navigator.total_pages()
    }

    pub fn can_go_back(&self) -> bool {
        self.navigator.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.navigator.can_go_forward()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current_tool()
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn surface(&self) -> &EditingSurface {
        &self.surface
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn scheduler(&self) -> &PersistenceScheduler {
        &self.scheduler
    }

    pub fn notes(&self) -> &NoteDocument {
        &self.notes
    }

    pub fn surface_sync(&self) -> &SurfaceSync {
        &self.sync
    }

    /// Feed the surface's journal into the save scheduler.
    fn pump(&mut self, now: Instant) {
        for _ in self.surface.drain_mutations() {
            self.scheduler.notify(now);
        }
    }

    fn switch_context(&mut self, now: Instant) -> (&mut Navigator, PageSwitchContext<'_>) {
        (
            &mut self.navigator,
            PageSwitchContext {
                surface: &mut self.surface,
                store: &mut self.store,
                scheduler: &mut self.scheduler,
                baseline: &mut self.baseline,
                sync: &mut self.sync,
                scale: self.scale,
                now,
            },
        )
    }

    // Tools

    /// Select a tool by toolbar id. Insert tools return the created object.
    pub fn select_tool(&mut self, id: &str, now: Instant) -> Option<ShapeId> {
        self.select_tool_kind(ToolKind::from_id(id), now)
    }

    pub fn select_tool_kind(&mut self, kind: ToolKind, now: Instant) -> Option<ShapeId> {
        let created = self.tools.select(kind, &mut self.surface);
        self.pump(now);
        created
    }

    pub fn pointer(&mut self, event: PointerEvent, modifiers: Modifiers, now: Instant) -> bool {
        let handled = self.tools.handle_pointer(event, modifiers, now, &mut self.surface);
        self.pump(now);
        handled
    }

    pub fn key(&mut self, event: &KeyEvent, now: Instant) -> bool {
        let handled = self.tools.handle_key(event, &mut self.surface);
        self.pump(now);
        handled
    }

    pub fn delete_selected(&mut self, now: Instant) -> bool {
        let removed = self.tools.delete_selected(&mut self.surface);
        self.pump(now);
        removed
    }

    /// Start editing a text object.
    pub fn edit_text(&mut self, id: ShapeId, now: Instant) -> bool {
        let editing = self.tools.edit_text(id, &mut self.surface);
        self.pump(now);
        editing
    }

    /// Replace the content of the text being edited.
    pub fn set_text(&mut self, content: &str, now: Instant) -> bool {
        let changed = self.tools.set_text(content, &mut self.surface);
        self.pump(now);
        changed
    }

    pub fn commit_text(&mut self, now: Instant) -> bool {
        let committed = self.tools.commit_text(&mut self.surface);
        self.pump(now);
        committed
    }

    pub fn exit_text_editing(&mut self, now: Instant) {
        self.tools.exit_text_editing(&mut self.surface);
        self.pump(now);
    }

    // View

    /// Set the zoom, clamped to the configured range, and rescale the live scene.
    pub fn set_zoom(&mut self, scale: f64, now: Instant) -> bool {
        let scale = self.config.clamp_zoom(scale);
        if (scale - self.scale).abs() < f64::EPSILON {
            return false;
        }
        // A drag in progress holds geometry at the old scale
        if self.tools.cancel_gesture(&mut self.surface) {
            log::debug!("Zoom abandoned the gesture in progress");
        }
        self.scale = scale;
        self.baseline.apply(&mut self.surface, scale);
        self.sync.request(SyncTrigger::ScaleChange, now);
        log::debug!("Zoom set to {:.2}", scale);
        true
    }

    pub fn zoom_in(&mut self, now: Instant) -> bool {
        self.set_zoom(round_zoom(self.scale + self.config.zoom_step), now)
    }

    pub fn zoom_out(&mut self, now: Instant) -> bool {
        self.set_zoom(round_zoom(self.scale - self.config.zoom_step), now)
    }

    /// Rotate the page a quarter turn. Object geometry is not rewritten.
    pub fn rotate(&mut self, now: Instant) -> Rotation {
        self.rotation = self.rotation.next();
        self.sync.request(SyncTrigger::RotationChange, now);
        self.rotation
    }

    /// The page container changed size.
    pub fn container_resized(&mut self, now: Instant) {
        self.sync.request(SyncTrigger::ContainerResize, now);
    }

    // Navigation

    /// Close out tool state bound to the outgoing page so its flush includes it.
    fn leave_page(&mut self, target: PageIndex, now: Instant) {
        if self.navigator.would_switch_to(target) {
            self.tools.detach(&mut self.surface);
        }
        self.pump(now);
    }

    pub fn change_page(&mut self, offset: i64, now: Instant) -> StorageResult<Option<PageSwitchResult>> {
        self.leave_page(self.navigator.offset_target(offset), now);
        let (navigator, ctx) = self.switch_context(now);
        navigator.change_page(offset, ctx)
    }

    pub fn jump_to_page(&mut self, page: PageIndex, now: Instant) -> StorageResult<Option<PageSwitchResult>> {
        self.leave_page(page, now);
        let (navigator, ctx) = self.switch_context(now);
        navigator.jump_to_page(page, ctx)
    }

    /// A `[page:N]` reference was clicked in the notes.
    pub fn activate_reference(&mut self, page: PageIndex, now: Instant) -> StorageResult<Option<PageSwitchResult>> {
        self.jump_to_page(page, now)
    }

    // Notes

    pub fn edit_notes(&mut self, text: impl Into<String>, now: Instant) {
        self.notes.edit(text, now);
    }

    pub fn insert_page_tag(&mut self, now: Instant) {
        self.notes.insert_page_tag(self.current_page(), now);
    }

    pub fn import_notes(&mut self, bytes: Vec<u8>, now: Instant) -> Result<(), NotesError> {
        self.notes.import(bytes, now)
    }

    pub fn export_notes(&mut self, format: NotesFormat) -> NotesExport {
        self.notes.export(format)
    }

    // Timers

    /// Run every deferred action whose deadline has passed, earliest first.
    pub fn tick(&mut self, now: Instant) -> StorageResult<TickReport> {
        self.pump(now);
        let mut due: Vec<(Instant, TimerKind)> = [
            (self.scheduler.deadline(), TimerKind::Save),
            (self.sync.deadline(), TimerKind::Resync),
            (self.notes.deadline(), TimerKind::Notes),
        ]
        .into_iter()
        .filter_map(|(deadline, kind)| deadline.filter(|d| *d <= now).map(|d| (d, kind)))
        .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        let mut report = TickReport::default();
        for (_, kind) in due {
            match kind {
                TimerKind::Save => {
                    if self.scheduler.poll(now) {
                        let page = self.current_page();
                        self.store
                            .save_scene(page, &scene_to_logical(self.surface.scene(), self.scale))?;
                        report.saved = true;
                    }
                }
                TimerKind::Resync => {
                    let outcome = self.sync.poll(
                        now,
                        self.renderer.as_ref(),
                        self.navigator.current_page(),
                        self.scale,
                        self.rotation,
                        &mut self.surface,
                    );
                    if let SyncOutcome::Resized(size) = outcome {
                        report.resized = Some(size);
                    }
                }
                TimerKind::Notes => {
                    report.notes_committed = self.notes.poll(now).map(str::to_string);
                }
            }
        }
        Ok(report)
    }

    /// Earliest pending deadline, for hosts that sleep until the next timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.scheduler.deadline(), self.sync.deadline(), self.notes.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Write the live scene and pending notes now.
    pub fn flush(&mut self) -> StorageResult<()> {
        // Edits recorded by the journal are all covered by this write
        let page = self.current_page();
        flush_live_scene(&mut self.surface, &mut self.store, &mut self.scheduler, page, self.scale)?;
        self.notes.flush();
        Ok(())
    }

    /// Final flush, then cancel every timer and drop the stored pages.
    pub fn shutdown(&mut self) -> StorageResult<()> {
        self.tools.select(ToolKind::Select, &mut self.surface);
        let result = self.flush();
        self.scheduler.cancel();
        self.sync.cancel();
        self.notes.cancel();
        log::debug!("Dropping {} stored pages of {}", self.store.len(), self.source_name);
        self.store.clear_all();
        result
    }

    /// Serialized scene of every visited page, live page included.
    pub fn document(&mut self) -> StorageResult<BTreeMap<PageIndex, SerializedScene>> {
        self.flush()?;
        Ok(self.store.entries().clone())
    }

    // Export

    fn page_size(&self, page: PageIndex) -> ExportResult<Size> {
        self.renderer
            .measure(page, self.scale, self.rotation)
            .ok_or(ExportError::Unmeasured(page))
    }

    /// Rasterize the annotations of the page being viewed.
    pub fn current_page_image(&mut self, rasterizer: &dyn SceneRasterizer) -> ExportResult<PageImage> {
        self.flush()?;
        let page = self.current_page();
        let size = self.page_size(page)?;
        rasterizer.rasterize(page, self.surface.scene(), size)
    }

    /// Rasterize every page, in order. Pages never visited export empty scenes.
    pub fn all_page_images(&mut self, rasterizer: &dyn SceneRasterizer) -> ExportResult<Vec<PageImage>> {
        self.flush()?;
        let mut images = Vec::new();
        for page in 1..=self.total_pages() {
            let scene = if page == self.current_page() {
                self.surface.scene().clone()
            } else {
                let logical = VectorScene::from_serialized(&self.store.get(page))
                    .map_err(|source| ExportError::Scene { page, source })?;
                scene_from_logical(logical, self.scale)
            };
            let size = self.page_size(page)?;
            images.push(rasterizer.rasterize(page, &scene, size)?);
        }
        Ok(images)
    }
}

/// Zoom steps land on round hundredths so repeated steps do not drift.
fn round_zoom(scale: f64) -> f64 {
    (scale * 100.0).round() / 100.0
}

/// Owns at most one session and the object URL of its file.
pub struct Workspace<U: ObjectUrls> {
    config: EngineConfig,
    intake: FileIntake,
    urls: U,
    session: Option<Session>,
}

impl<U: ObjectUrls> Workspace<U> {
    pub fn new(config: EngineConfig, urls: U) -> Self {
        Self {
            intake: FileIntake::new(config.max_file_bytes),
            config,
            urls,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn urls(&self) -> &U {
        &self.urls
    }

    /// Validate a file and, if accepted, replace the current session with a fresh one.
    /// A rejected file leaves the current session as it was.
    pub fn open(
        &mut self,
        file: SourceFile,
        renderer: Box<dyn PageRenderer>,
        now: Instant,
    ) -> Result<&mut Session, IntakeError> {
        if let Err(e) = self.intake.validate(&file) {
            log::warn!("Rejected {}: {}", file.name, e);
            return Err(e);
        }
        if renderer.page_count() == 0 {
            log::warn!("Rejected {}: no pages", file.name);
            return Err(IntakeError::NoPages);
        }

        self.clear();
        let url = self.urls.create(&file);
        log::info!(
            "Opened {} ({} bytes, {} pages)",
            file.name,
            file.len(),
            renderer.page_count()
        );
        let session = Session::new(self.config.clone(), file.name, url, renderer, now);
        Ok(self.session.insert(session))
    }

    /// End the current session, if any. Its URL is revoked exactly once.
    pub fn clear(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Err(e) = session.shutdown() {
            log::warn!("Final flush of {} failed: {}", session.source_name(), e);
        }
        self.urls.revoke(session.object_url());
        log::info!("Closed {}", session.source_name());
    }
}

impl<U: ObjectUrls> Drop for Workspace<U> {
    fn drop(&mut self) {
        self.clear();
    }
}
