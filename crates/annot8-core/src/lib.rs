//! annot8 Core Library
//!
//! Platform-agnostic annotation engine for paged documents: per-page vector scenes,
//! debounced persistence, zoom/rotation sync and page-referencing notes.

pub mod config;
pub mod export;
pub mod input;
pub mod navigator;
pub mod notes;
pub mod scene;
pub mod selection;
pub mod session;
pub mod shapes;
pub mod storage;
pub mod surface;
pub mod timer;
pub mod tools;
pub mod transform;

pub use config::{ConfigError, EngineConfig};
pub use export::{ExportError, PageImage, SceneRasterizer};
pub use input::{KeyEvent, Modifiers, PointerEvent};
pub use navigator::{Navigator, PageSwitchResult};
pub use notes::{NoteDocument, NoteSegment, NotesExport, NotesFormat, parse_page_refs};
pub use scene::{SerializedScene, VectorScene};
pub use selection::{Corner, ManipulationState};
pub use session::{FileIntake, IntakeError, ObjectUrls, Session, SourceFile, TickReport, Workspace};
pub use shapes::{Shape, ShapeId, ShapeStyle};
pub use storage::{MemoryStore, PageIndex, PersistenceScheduler, SceneStore, StorageError};
pub use surface::{EditingSurface, SceneMutation};
pub use timer::{Debounce, Instant};
pub use tools::{ToolKind, ToolManager};
pub use transform::{PageRenderer, Rotation, SurfaceSync, SyncTrigger};
