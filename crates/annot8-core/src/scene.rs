//! Per-page vector scene and its serialized form.

use crate::shapes::{Shape, ShapeId, ShapeTrait};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version tag written into every serialized scene.
const SCENE_FORMAT_VERSION: u32 = 1;

/// JSON snapshot of a [`VectorScene`], as held by the store for inactive pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedScene(String);

impl SerializedScene {
    /// Wrap a JSON string without validating it.
    pub fn from_raw(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    /// The snapshot of a scene with no objects.
    pub fn empty() -> Self {
        // Serializing an empty scene cannot fail, but keep the fallback well-formed anyway
        VectorScene::new()
            .to_serialized()
            .unwrap_or_else(|_| Self(String::from(r#"{"version":1,"objects":[]}"#)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for SerializedScene {
    fn default() -> Self {
        Self::empty()
    }
}

/// On-disk shape of a scene: objects listed back to front.
#[derive(Serialize, Deserialize)]
struct SceneFile {
    version: u32,
    objects: Vec<Shape>,
}

#[derive(Serialize)]
struct SceneFileRef<'a> {
    version: u32,
    objects: Vec<&'a Shape>,
}

/// All annotation objects of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorScene {
    /// All objects, keyed by ID.
    shapes: HashMap<ShapeId, Shape>,
    /// Z-order of objects (back to front).
    z_order: Vec<ShapeId>,
}

impl VectorScene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object on top of the z-order. An object with the same ID is replaced in place.
    pub fn add_shape(&mut self, shape: Shape) {
        let id = shape.id();
        if self.shapes.insert(id, shape).is_none() {
            self.z_order.push(id);
        }
    }

    /// Remove an object.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        self.z_order.retain(|&shape_id| shape_id != id);
        self.shapes.remove(&id)
    }

    /// Remove all objects.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.z_order.clear();
    }

    /// Get an object by ID.
    pub fn get_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    /// Get a mutable reference to an object by ID.
    pub fn get_shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    /// Objects in z-order (back to front).
    pub fn shapes_ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// IDs in z-order (back to front).
    pub fn ids(&self) -> &[ShapeId] {
        &self.z_order
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Apply the same transform to every object.
    pub fn transform_all(&mut self, affine: Affine) {
        for shape in self.shapes.values_mut() {
            shape.transform(affine);
        }
    }

    /// Bounding box of all objects.
    pub fn bounds(&self) -> Option<Rect> {
        self.shapes_ordered()
            .map(|shape| shape.bounds())
            .reduce(|acc, bounds| acc.union(bounds))
    }

    /// Find objects at a point, front to back.
    pub fn shapes_at_point(&self, point: Point, tolerance: f64) -> Vec<ShapeId> {
        self.z_order
            .iter()
            .rev()
            .filter_map(|&id| {
                self.shapes
                    .get(&id)
                    .filter(|s| s.hit_test(point, tolerance))
                    .map(|_| id)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Serialize to the stored JSON form.
    pub fn to_serialized(&self) -> Result<SerializedScene, serde_json::Error> {
        let file = SceneFileRef {
            version: SCENE_FORMAT_VERSION,
            objects: self.shapes_ordered().collect(),
        };
        serde_json::to_string(&file).map(SerializedScene)
    }

    /// Rebuild a scene from its stored JSON form, preserving z-order.
    pub fn from_serialized(serialized: &SerializedScene) -> Result<Self, serde_json::Error> {
        let file: SceneFile = serde_json::from_str(serialized.as_str())?;
        if file.version != SCENE_FORMAT_VERSION {
            log::warn!(
                "Loading scene with format version {} (expected {})",
                file.version,
                SCENE_FORMAT_VERSION
            );
        }
        let mut scene = Self::new();
        for shape in file.objects {
            scene.add_shape(shape);
        }
        Ok(scene)
    }
}
