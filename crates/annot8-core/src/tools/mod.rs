//! Interaction modes and pointer dispatch.
//!
//! Exactly one mode is active. Its pointer handling lives in a single binding slot, so
//! switching modes always unbinds the old handler before the new one is bound.

use crate::config::EngineConfig;
use crate::input::{ClickTracker, KeyEvent, Modifiers, PointerEvent};
use crate::selection::{HANDLE_HIT_TOLERANCE, ManipulationState, hit_test_handles};
use crate::shapes::{Ellipse, Freehand, Rectangle, Shape, ShapeId, ShapeStyle, Text};
use crate::surface::EditingSurface;
use crate::timer::Instant;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Hit tolerance for picking objects, in page pixels.
pub const PICK_TOLERANCE: f64 = 4.0;
/// Points closer than this to the previous captured point are dropped.
const MIN_POINT_SPACING: f64 = 0.5;
/// Simplification tolerance applied to a finished stroke.
const STROKE_SIMPLIFY_TOLERANCE: f64 = 0.5;

/// Available interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    FreehandDraw,
    Highlight,
    RectangleInsert,
    EllipseInsert,
    TextInsert,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Select,
        ToolKind::FreehandDraw,
        ToolKind::Highlight,
        ToolKind::RectangleInsert,
        ToolKind::EllipseInsert,
        ToolKind::TextInsert,
    ];

    /// Map a toolbar id to a mode. Unknown ids fall back to `Select`.
    pub fn from_id(id: &str) -> Self {
        match id {
            "select" => ToolKind::Select,
            "draw" => ToolKind::FreehandDraw,
            "highlight" => ToolKind::Highlight,
            "rectangle" => ToolKind::RectangleInsert,
            "circle" | "ellipse" => ToolKind::EllipseInsert,
            "text" => ToolKind::TextInsert,
            other => {
                log::debug!("Unknown tool id {:?}, using select", other);
                ToolKind::Select
            }
        }
    }

    /// Toolbar id.
    pub fn id(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::FreehandDraw => "draw",
            ToolKind::Highlight => "highlight",
            ToolKind::RectangleInsert => "rectangle",
            ToolKind::EllipseInsert => "circle",
            ToolKind::TextInsert => "text",
        }
    }

    /// Insert modes create one object on entry and hand control back to `Select`.
    pub fn is_insert(self) -> bool {
        matches!(
            self,
            ToolKind::RectangleInsert | ToolKind::EllipseInsert | ToolKind::TextInsert
        )
    }
}

/// Which stroke style a capture produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeKind {
    Pen,
    Highlighter,
}

/// The pointer handler currently attached to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerBinding {
    /// Pick, move and resize objects.
    Select,
    /// Capture a freehand path.
    Stroke(StrokeKind),
}

/// In-flight pointer gesture.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Stroke(Vec<Point>),
    Manipulate(ManipulationState),
}

/// Text being typed into a text object.
#[derive(Debug, Clone)]
struct TextDraft {
    id: ShapeId,
    original: String,
    content: String,
}

/// Defaults used when tools create objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub pen: ShapeStyle,
    pub highlighter: ShapeStyle,
    pub rectangle_size: Size,
    pub ellipse_radii: Vec2,
    pub text_placeholder: String,
    pub text_font_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ToolSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            pen: config.pen.clone(),
            highlighter: config.highlighter.clone(),
            rectangle_size: config.rectangle_size,
            ellipse_radii: config.ellipse_radii,
            text_placeholder: config.text_placeholder.clone(),
            text_font_size: config.text_font_size,
        }
    }
}

/// Manages the current mode and its pointer binding.
#[derive(Debug, Clone)]
pub struct ToolManager {
    current_tool: ToolKind,
    binding: Option<PointerBinding>,
    gesture: Gesture,
    draft: Option<TextDraft>,
    clicks: ClickTracker,
    settings: ToolSettings,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(ToolSettings::default())
    }
}

impl ToolManager {
    /// Create a manager in `Select` mode with its binding attached.
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            current_tool: ToolKind::Select,
            binding: Some(PointerBinding::Select),
            gesture: Gesture::Idle,
            draft: None,
            clicks: ClickTracker::new(),
            settings,
        }
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn binding(&self) -> Option<PointerBinding> {
        self.binding
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Whether a pointer gesture is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_editing_text(&self) -> bool {
        self.draft.is_some()
    }

    /// Switch modes. Insert modes create their object here and return the new id; the
    /// manager is back in `Select` when this returns.
    pub fn select(&mut self, kind: ToolKind, surface: &mut EditingSurface) -> Option<ShapeId> {
        self.exit_current(surface);
        self.current_tool = kind;
        self.enter(kind, surface)
    }

    /// Exit hook: detach the binding and abandon any gesture.
    fn exit_current(&mut self, surface: &mut EditingSurface) {
        self.binding = None;
        self.detach(surface);
    }

    /// End everything tied to the live scene before it is swapped out: an in-flight gesture
    /// is abandoned and the edited text is committed. The mode and its binding stay.
    pub fn detach(&mut self, surface: &mut EditingSurface) {
        self.abandon_gesture(surface);
        self.exit_text_editing(surface);
        self.clicks.reset();
    }

    /// Abandon an in-flight gesture, restoring what it changed. Returns whether one was active.
    pub fn cancel_gesture(&mut self, surface: &mut EditingSurface) -> bool {
        let active = self.is_active();
        self.abandon_gesture(surface);
        active
    }

    /// Enter hook: attach the binding or perform the insert.
    fn enter(&mut self, kind: ToolKind, surface: &mut EditingSurface) -> Option<ShapeId> {
        if kind.is_insert() {
            let id = self.insert(kind, surface);
            self.current_tool = ToolKind::Select;
            self.binding = Some(PointerBinding::Select);
            return Some(id);
        }
        let binding = match kind {
            ToolKind::FreehandDraw => PointerBinding::Stroke(StrokeKind::Pen),
            ToolKind::Highlight => PointerBinding::Stroke(StrokeKind::Highlighter),
            _ => PointerBinding::Select,
        };
        if matches!(binding, PointerBinding::Stroke(_)) {
            surface.clear_selection();
        }
        self.binding = Some(binding);
        None
    }

    fn insert(&mut self, kind: ToolKind, surface: &mut EditingSurface) -> ShapeId {
        let center = surface.viewport_center();
        let settings = &self.settings;
        let shape = match kind {
            ToolKind::EllipseInsert => Shape::Ellipse(Ellipse::new(
                center,
                settings.ellipse_radii.x,
                settings.ellipse_radii.y,
            )),
            ToolKind::TextInsert => Shape::Text(Text::centered(
                center,
                settings.text_placeholder.clone(),
                settings.text_font_size,
            )),
            _ => Shape::Rectangle(Rectangle::centered(
                center,
                settings.rectangle_size.width,
                settings.rectangle_size.height,
            )),
        };
        let id = surface.add_shape(shape);
        surface.select(id);
        if kind == ToolKind::TextInsert {
            self.edit_text(id, surface);
        }
        id
    }

    /// Put back whatever a half-finished gesture changed.
    fn abandon_gesture(&mut self, surface: &mut EditingSurface) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Stroke(points) => {
                log::debug!("Abandoning stroke with {} points", points.len());
            }
            Gesture::Manipulate(state) => {
                log::debug!("Abandoning manipulation of {}", state.shape_id);
                surface.replace_untracked(state.original_shape);
            }
        }
    }

    /// Route a pointer event to the bound handler. Returns whether it was consumed.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        modifiers: Modifiers,
        now: Instant,
        surface: &mut EditingSurface,
    ) -> bool {
        match self.binding {
            None => false,
            Some(PointerBinding::Stroke(kind)) => self.handle_stroke(event, kind, surface),
            Some(PointerBinding::Select) => self.handle_select(event, modifiers, now, surface),
        }
    }

    fn handle_stroke(&mut self, event: PointerEvent, kind: StrokeKind, surface: &mut EditingSurface) -> bool {
        match event {
            PointerEvent::Down { position } => {
                self.gesture = Gesture::Stroke(vec![position]);
                true
            }
            PointerEvent::Move { position } => match &mut self.gesture {
                Gesture::Stroke(points) => {
                    push_spaced(points, position);
                    true
                }
                _ => false,
            },
            PointerEvent::Up { position } => {
                let Gesture::Stroke(mut points) = std::mem::take(&mut self.gesture) else {
                    return false;
                };
                push_spaced(&mut points, position);
                if points.len() < 2 {
                    log::debug!("Discarding stroke with {} point(s)", points.len());
                    return true;
                }
                let shape = match kind {
                    StrokeKind::Pen => {
                        let mut path = Freehand::from_points(points, self.settings.pen.clone());
                        path.simplify(STROKE_SIMPLIFY_TOLERANCE);
                        Shape::Freehand(path)
                    }
                    StrokeKind::Highlighter => {
                        let mut path = Freehand::from_points(points, self.settings.highlighter.clone());
                        path.simplify(STROKE_SIMPLIFY_TOLERANCE);
                        Shape::Highlight(path)
                    }
                };
                surface.add_shape(shape);
                true
            }
        }
    }

    fn handle_select(
        &mut self,
        event: PointerEvent,
        modifiers: Modifiers,
        now: Instant,
        surface: &mut EditingSurface,
    ) -> bool {
        match event {
            PointerEvent::Down { position } => {
                let double_click = self.clicks.register(position, now);
                self.begin_select_gesture(position, double_click, surface);
                true
            }
            PointerEvent::Move { position } => {
                let Gesture::Manipulate(state) = &mut self.gesture else {
                    return false;
                };
                state.current_point = position;
                let preview = state.preview(modifiers.shift);
                surface.replace_untracked(preview);
                true
            }
            PointerEvent::Up { position } => {
                let Gesture::Manipulate(mut state) = std::mem::take(&mut self.gesture) else {
                    return false;
                };
                state.current_point = position;
                if state.delta() == Vec2::ZERO {
                    surface.replace_untracked(state.original_shape);
                } else {
                    surface.replace_untracked(state.preview(modifiers.shift));
                    surface.mark_modified(state.shape_id);
                }
                true
            }
        }
    }

    fn begin_select_gesture(&mut self, position: Point, double_click: bool, surface: &mut EditingSurface) {
        // A click outside the text being edited ends the edit
        if let Some(editing) = surface.editing() {
            if surface.shape_at(position, PICK_TOLERANCE) != Some(editing) {
                self.exit_text_editing(surface);
            }
        }

        if let Some(selected) = surface.selected_shape() {
            if let Some(corner) = hit_test_handles(selected, position, HANDLE_HIT_TOLERANCE) {
                let original = selected.clone();
                self.gesture = Gesture::Manipulate(ManipulationState::new(
                    original.id(),
                    Some(corner),
                    position,
                    original,
                ));
                return;
            }
        }

        let Some(hit) = surface.shape_at(position, PICK_TOLERANCE) else {
            surface.clear_selection();
            return;
        };
        surface.select(hit);

        if double_click && matches!(surface.selected_shape(), Some(Shape::Text(_))) {
            self.edit_text(hit, surface);
            return;
        }
        if surface.editing() == Some(hit) {
            // Clicks inside the edited text position the caret; the host handles that
            return;
        }
        if let Some(original) = surface.selected_shape().cloned() {
            self.gesture = Gesture::Manipulate(ManipulationState::new(hit, None, position, original));
        }
    }

    /// Remove the selected object. Returns whether something was removed.
    pub fn delete_selected(&mut self, surface: &mut EditingSurface) -> bool {
        self.abandon_gesture(surface);
        let Some(id) = surface.selected() else {
            return false;
        };
        if self.draft.as_ref().is_some_and(|d| d.id == id) {
            self.draft = None;
        }
        surface.remove_shape(id).is_some()
    }

    /// Start editing a text object.
    pub fn edit_text(&mut self, id: ShapeId, surface: &mut EditingSurface) -> bool {
        let Some(Shape::Text(text)) = surface.scene().get_shape(id) else {
            return false;
        };
        let content = text.content().to_string();
        if self.draft.as_ref().is_some_and(|d| d.id != id) {
            self.exit_text_editing(surface);
        }
        surface.enter_text_editing(id);
        self.draft = Some(TextDraft {
            id,
            original: content.clone(),
            content,
        });
        true
    }

    /// Replace the content of the text being edited.
    pub fn set_text(&mut self, content: &str, surface: &mut EditingSurface) -> bool {
        let Some(draft) = &mut self.draft else {
            return false;
        };
        draft.content = content.to_string();
        show_draft(draft, surface);
        true
    }

    /// Record the typed text as one modification, if it changed. Editing continues.
    pub fn commit_text(&mut self, surface: &mut EditingSurface) -> bool {
        let Some(draft) = &mut self.draft else {
            return false;
        };
        if draft.content == draft.original {
            return false;
        }
        let content = draft.content.clone();
        draft.original = content.clone();
        let id = draft.id;
        surface.update_shape(id, |shape| {
            if let Some(text) = shape.as_text_mut() {
                text.content = content;
            }
        })
    }

    /// Commit and leave text editing.
    pub fn exit_text_editing(&mut self, surface: &mut EditingSurface) {
        if self.draft.is_none() {
            return;
        }
        self.commit_text(surface);
        self.draft = None;
        surface.exit_text_editing();
    }

    /// Route a key press. Typing goes to the edited text; otherwise Delete/Backspace remove
    /// the selection and Escape clears it.
    pub fn handle_key(&mut self, event: &KeyEvent, surface: &mut EditingSurface) -> bool {
        if let Some(draft) = &mut self.draft {
            match event {
                KeyEvent::Text(typed) => draft.content.push_str(typed),
                KeyEvent::Enter => draft.content.push('\n'),
                KeyEvent::Backspace => {
                    draft.content.pop();
                }
                KeyEvent::Delete => return false,
                KeyEvent::Escape => {
                    self.exit_text_editing(surface);
                    return true;
                }
            }
            show_draft(draft, surface);
            return true;
        }

        match event {
            KeyEvent::Delete | KeyEvent::Backspace => self.delete_selected(surface),
            KeyEvent::Escape => {
                self.abandon_gesture(surface);
                surface.clear_selection();
                true
            }
            KeyEvent::Text(_) | KeyEvent::Enter => false,
        }
    }
}

/// Mirror the draft into the live object without journaling each keystroke.
fn show_draft(draft: &TextDraft, surface: &mut EditingSurface) {
    if let Some(Shape::Text(text)) = surface.scene().get_shape(draft.id) {
        let mut text = text.clone();
        text.content = draft.content.clone();
        surface.replace_untracked(Shape::Text(text));
    }
}

fn push_spaced(points: &mut Vec<Point>, point: Point) {
    match points.last() {
        Some(last) if last.distance(point) < MIN_POINT_SPACING => {}
        _ => points.push(point),
    }
}
