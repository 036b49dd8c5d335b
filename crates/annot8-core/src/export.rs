//! Export-facing contracts: rasterized page images for the external PDF writer.

use crate::scene::VectorScene;
use crate::storage::PageIndex;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kurbo::Size;
use thiserror::Error;

/// Export errors. One terminal message per attempt; annotation state is never touched.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Page {0} could not be measured for export")]
    Unmeasured(PageIndex),
    #[error("Rasterization of page {page} failed: {message}")]
    Rasterize { page: PageIndex, message: String },
    #[error("Stored scene for page {page} is unreadable: {source}")]
    Scene {
        page: PageIndex,
        #[source]
        source: serde_json::Error,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// A page's annotations flattened to a PNG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub page: PageIndex,
    pub width: u32,
    pub height: u32,
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
}

impl PageImage {
    /// `data:image/png;base64,...` form used to embed the image.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.png))
    }
}

/// Draws a scene into a PNG of the given pixel size. Implemented by the host renderer.
pub trait SceneRasterizer {
    fn rasterize(&self, page: PageIndex, scene: &VectorScene, size: Size) -> ExportResult<PageImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let image = PageImage {
            page: 1,
            width: 1,
            height: 1,
            png: b"png".to_vec(),
        };
        assert_eq!(image.to_data_url(), "data:image/png;base64,cG5n");
    }

    #[test]
    fn test_error_messages() {
        let err = ExportError::Rasterize {
            page: 3,
            message: "out of memory".to_string(),
        };
        assert_eq!(err.to_string(), "Rasterization of page 3 failed: out of memory");
    }
}
