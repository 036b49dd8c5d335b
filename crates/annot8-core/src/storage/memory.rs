//! In-memory scene store.

use super::{PageIndex, SceneStore, StorageError, StorageResult};
use crate::scene::SerializedScene;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session-lifetime store; nothing survives the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    pages: BTreeMap<PageIndex, SerializedScene>,
    #[serde(skip)]
    writes: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the raw page map.
    pub fn entries(&self) -> &BTreeMap<PageIndex, SerializedScene> {
        &self.pages
    }
}

impl SceneStore for MemoryStore {
    fn get(&self, page: PageIndex) -> SerializedScene {
        self.pages.get(&page).cloned().unwrap_or_default()
    }

    fn put(&mut self, page: PageIndex, scene: SerializedScene) -> StorageResult<()> {
        if page == 0 {
            return Err(StorageError::InvalidPage(page));
        }
        self.pages.insert(page, scene);
        self.writes += 1;
        Ok(())
    }

    fn clear_all(&mut self) {
        self.pages.clear();
    }

    fn pages(&self) -> Vec<PageIndex> {
        self.pages.keys().copied().collect()
    }

    fn writes(&self) -> u64 {
        self.writes
    }

    fn len(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::VectorScene;
    use crate::shapes::{Rectangle, Shape};
    use kurbo::Point;

    #[test]
    fn test_absent_page_reads_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get(7), SerializedScene::empty());
        assert!(store.load_scene(7).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_overwrites() {
        let mut store = MemoryStore::new();
        store.put(1, SerializedScene::from_raw("a")).unwrap();
        store.put(1, SerializedScene::from_raw("b")).unwrap();

        assert_eq!(store.get(1).as_str(), "b");
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn test_page_zero_rejected() {
        let mut store = MemoryStore::new();
        let result = store.put(0, SerializedScene::empty());
        assert!(matches!(result, Err(StorageError::InvalidPage(0))));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_pages_sorted_and_clear_all() {
        let mut store = MemoryStore::new();
        for page in [3, 1, 2] {
            store.put(page, SerializedScene::empty()).unwrap();
        }
        assert_eq!(store.pages(), vec![1, 2, 3]);

        store.clear_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_load_scene() {
        let mut store = MemoryStore::new();
        let mut scene = VectorScene::new();
        scene.add_shape(Shape::Rectangle(Rectangle::new(Point::new(1.0, 2.0), 3.0, 4.0)));

        store.save_scene(2, &scene).unwrap();
        assert_eq!(store.load_scene(2), scene);
    }

    #[test]
    fn test_unreadable_scene_loads_empty() {
        let mut store = MemoryStore::new();
        store.put(1, SerializedScene::from_raw("{broken")).unwrap();
        assert!(store.load_scene(1).is_empty());
    }
}
