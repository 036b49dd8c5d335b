//! Per-page annotation document store.

mod memory;
pub mod scheduler;

pub use memory::MemoryStore;
pub use scheduler::PersistenceScheduler;

use crate::scene::{SerializedScene, VectorScene};
use thiserror::Error;

/// 1-based page number.
pub type PageIndex = u32;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid page index: {0}")]
    InvalidPage(PageIndex),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend holding one serialized scene per visited page.
///
/// Reads never fail: a page that was never written reads as the empty scene.
pub trait SceneStore {
    /// Get the stored scene for a page.
    fn get(&self, page: PageIndex) -> SerializedScene;

    /// Store a scene for a page, replacing any previous one.
    fn put(&mut self, page: PageIndex, scene: SerializedScene) -> StorageResult<()>;

    /// Drop every stored page.
    fn clear_all(&mut self);

    /// Pages that have been written, in ascending order.
    fn pages(&self) -> Vec<PageIndex>;

    /// Total number of `put` calls since creation.
    fn writes(&self) -> u64;

    fn len(&self) -> usize {
        self.pages().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize a live scene and store it.
    fn save_scene(&mut self, page: PageIndex, scene: &VectorScene) -> StorageResult<()> {
        let serialized = scene.to_serialized()?;
        self.put(page, serialized)
    }

    /// Load and deserialize a page. A stored scene that fails to parse loads as empty.
    fn load_scene(&self, page: PageIndex) -> VectorScene {
        match VectorScene::from_serialized(&self.get(page)) {
            Ok(scene) => scene,
            Err(e) => {
                log::warn!("Stored scene for page {} is unreadable, loading empty: {}", page, e);
                VectorScene::new()
            }
        }
    }
}
