//! The live editing surface: the one scene currently open for editing.

use crate::scene::VectorScene;
use crate::shapes::{Shape, ShapeId};
use kurbo::{Affine, Point, Size};
use serde::{Deserialize, Serialize};

/// One change to the live scene, as observed by persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneMutation {
    Added(ShapeId),
    Modified(ShapeId),
    Removed(ShapeId),
}

impl SceneMutation {
    pub fn shape_id(&self) -> ShapeId {
        match self {
            SceneMutation::Added(id) | SceneMutation::Modified(id) | SceneMutation::Removed(id) => *id,
        }
    }
}

/// Live scene plus selection, text-editing focus and the surface's pixel box.
///
/// Every tracked edit appends to a mutation journal that the session drains into the
/// persistence scheduler.
#[derive(Debug, Clone, Default)]
pub struct EditingSurface {
    scene: VectorScene,
    selected: Option<ShapeId>,
    editing: Option<ShapeId>,
    size: Size,
    journal: Vec<SceneMutation>,
}

impl EditingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn scene(&self) -> &VectorScene {
        &self.scene
    }

    /// Pixel box of the surface.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resize the surface. Returns whether the box actually changed.
    pub fn set_size(&mut self, size: Size) -> bool {
        if self.size == size {
            return false;
        }
        self.size = size;
        true
    }

    /// Center of the visible surface, where inserted objects are placed.
    pub fn viewport_center(&self) -> Point {
        Point::new(self.size.width / 2.0, self.size.height / 2.0)
    }

    /// Add an object on top.
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        log::debug!("Adding {} {}", shape.kind_name(), id);
        self.scene.add_shape(shape);
        self.journal.push(SceneMutation::Added(id));
        id
    }

    /// Edit an object in place and record one modification.
    pub fn update_shape(&mut self, id: ShapeId, edit: impl FnOnce(&mut Shape)) -> bool {
        match self.scene.get_shape_mut(id) {
            Some(shape) => {
                edit(shape);
                self.journal.push(SceneMutation::Modified(id));
                true
            }
            None => false,
        }
    }

    /// Overwrite an object without recording a mutation. Used for drag previews and
    /// for restoring an abandoned gesture.
    pub fn replace_untracked(&mut self, shape: Shape) {
        if self.scene.contains(shape.id()) {
            self.scene.add_shape(shape);
        }
    }

    /// Record that an object changed through an untracked path.
    pub fn mark_modified(&mut self, id: ShapeId) {
        if self.scene.contains(id) {
            self.journal.push(SceneMutation::Modified(id));
        }
    }

    /// Remove an object.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let removed = self.scene.remove_shape(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        self.journal.push(SceneMutation::Removed(id));
        Some(removed)
    }

    /// Swap in another scene object by object, as a page load does. Each removal and
    /// insertion is journaled; a guarded scheduler ignores them.
    pub fn load_scene(&mut self, scene: VectorScene) {
        self.clear_selection();
        let existing: Vec<ShapeId> = self.scene.ids().to_vec();
        for id in existing {
            self.remove_shape(id);
        }
        for shape in scene.shapes_ordered() {
            self.add_shape(shape.clone());
        }
    }

    /// Apply a transform to every object without journaling it.
    pub fn transform_untracked(&mut self, affine: Affine) {
        self.scene.transform_all(affine);
    }

    /// Take the mutations recorded since the last drain.
    pub fn drain_mutations(&mut self) -> Vec<SceneMutation> {
        std::mem::take(&mut self.journal)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.journal.is_empty()
    }

    /// Topmost object under a point.
    pub fn shape_at(&self, point: Point, tolerance: f64) -> Option<ShapeId> {
        self.scene.shapes_at_point(point, tolerance).into_iter().next()
    }

    pub fn select(&mut self, id: ShapeId) {
        if self.scene.contains(id) {
            self.selected = Some(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.editing = None;
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selected.and_then(|id| self.scene.get_shape(id))
    }

    /// Enter text editing mode for a text object.
    pub fn enter_text_editing(&mut self, id: ShapeId) {
        if matches!(self.scene.get_shape(id), Some(Shape::Text(_))) {
            self.selected = Some(id);
            self.editing = Some(id);
        }
    }

    pub fn exit_text_editing(&mut self) {
        self.editing = None;
    }

    /// The text object currently being edited.
    pub fn editing(&self) -> Option<ShapeId> {
        self.editing
    }
}
