//! Drives a workspace through a replay script.

use crate::app::{AppError, AppResult};
use crate::script::{Command, ReplayScript};
use annot8_core::config::EngineConfig;
use annot8_core::input::PointerEvent;
use annot8_core::session::{ObjectUrls, Session, SourceFile, Workspace};
use annot8_core::storage::PageIndex;
use annot8_core::timer::Instant;
use annot8_core::transform::{PageRenderer, Rotation};
use kurbo::{Point, Size};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Page geometry taken from the script instead of a real PDF.
struct ScriptRenderer {
    pages: u32,
    page_size: Size,
}

impl PageRenderer for ScriptRenderer {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn measure(&self, page: PageIndex, scale: f64, rotation: Rotation) -> Option<Size> {
        if page == 0 || page > self.pages {
            return None;
        }
        let scaled = self.page_size * scale;
        Some(if rotation.swaps_axes() {
            Size::new(scaled.height, scaled.width)
        } else {
            scaled
        })
    }
}

/// Hands out synthetic object URLs.
#[derive(Debug, Default)]
struct ReplayUrls {
    created: u32,
}

impl ObjectUrls for ReplayUrls {
    fn create(&mut self, file: &SourceFile) -> String {
        self.created += 1;
        format!("blob:annot8/{}/{}", self.created, file.name)
    }

    fn revoke(&mut self, url: &str) {
        log::debug!("Revoked {}", url);
    }
}

/// Final state after a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutput {
    pub file: String,
    pub pages: u32,
    pub current_page: PageIndex,
    pub scale: f64,
    pub rotation: u32,
    pub tool: String,
    /// Stored scene of every visited page.
    pub document: BTreeMap<PageIndex, serde_json::Value>,
    pub notes: String,
    pub saves: u64,
    pub resyncs: u64,
}

impl ReplayOutput {
    fn capture(session: &mut Session) -> AppResult<Self> {
        let mut document = BTreeMap::new();
        for (page, scene) in session.document()? {
            let value: serde_json::Value = serde_json::from_str(scene.as_str())?;
            document.insert(page, value);
        }

        Ok(Self {
            file: session.source_name().to_string(),
            pages: session.total_pages(),
            current_page: session.current_page(),
            scale: session.scale(),
            rotation: session.rotation().degrees(),
            tool: session.current_tool().id().to_string(),
            document,
            notes: session.notes().committed().to_string(),
            saves: session.scheduler().serializations(),
            resyncs: session.surface_sync().resyncs(),
        })
    }
}

pub struct Replayer {
    config: EngineConfig,
}

impl Replayer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn replay(&self, script: &ReplayScript) -> AppResult<ReplayOutput> {
        let start = Instant::now();
        let mut workspace = Workspace::new(self.config.clone(), ReplayUrls::default());

        let size = usize::try_from(script.file.size)
            .map_err(|_| AppError::Invalid(format!("File size {} is not addressable", script.file.size)))?;
        let file = SourceFile::new(script.file.name.clone(), script.file.mime.clone(), vec![0; size]);
        let renderer = ScriptRenderer {
            pages: script.pages,
            page_size: script.page_size,
        };
        let session = workspace.open(file, Box::new(renderer), start)?;

        let mut now = start;
        for (index, step) in script.steps.iter().enumerate() {
            now = start + Duration::from_millis(step.at_ms);
            let report = session.tick(now)?;
            if report.saved {
                log::debug!("Step {}: page {} saved", index, session.current_page());
            }
            apply(session, &step.command, now)?;
        }

        // Let every deferred action run before capturing the result
        if let Some(deadline) = session.next_deadline() {
            now = now.max(deadline);
        }
        session.tick(now)?;
        let output = ReplayOutput::capture(session)?;
        log::info!(
            "Replayed {} steps on {} ({} saves)",
            script.steps.len(),
            output.file,
            output.saves
        );
        Ok(output)
    }
}

fn apply(session: &mut Session, command: &Command, now: Instant) -> AppResult<()> {
    match command {
        Command::SelectTool { tool } => {
            session.select_tool(tool, now);
        }
        Command::PointerDown { x, y, modifiers } => {
            let position = Point::new(*x, *y);
            session.pointer(PointerEvent::Down { position }, *modifiers, now);
        }
        Command::PointerMove { x, y, modifiers } => {
            let position = Point::new(*x, *y);
            session.pointer(PointerEvent::Move { position }, *modifiers, now);
        }
        Command::PointerUp { x, y, modifiers } => {
            let position = Point::new(*x, *y);
            session.pointer(PointerEvent::Up { position }, *modifiers, now);
        }
        Command::Key { key } => {
            session.key(key, now);
        }
        Command::SetText { text } => {
            session.set_text(text, now);
        }
        Command::CommitText => {
            session.commit_text(now);
        }
        Command::DeleteSelected => {
            session.delete_selected(now);
        }
        Command::ZoomIn => {
            session.zoom_in(now);
        }
        Command::ZoomOut => {
            session.zoom_out(now);
        }
        Command::SetZoom { scale } => {
            session.set_zoom(*scale, now);
        }
        Command::Rotate => {
            session.rotate(now);
        }
        Command::Resize => session.container_resized(now),
        Command::ChangePage { offset } => {
            session.change_page(*offset, now)?;
        }
        Command::JumpToPage { page } => {
            session.jump_to_page(*page, now)?;
        }
        Command::EditNotes { text } => session.edit_notes(text.clone(), now),
        Command::InsertPageTag => session.insert_page_tag(now),
        Command::Wait => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ScriptFile, ScriptStep};
    use annot8_core::session::IntakeError;

    fn script(pages: u32, steps: Vec<(u64, Command)>) -> ReplayScript {
        ReplayScript {
            file: ScriptFile {
                name: "paper.pdf".to_string(),
                mime: "application/pdf".to_string(),
                size: 64,
            },
            pages,
            page_size: Size::new(600.0, 800.0),
            steps: steps
                .into_iter()
                .map(|(at_ms, command)| ScriptStep { at_ms, command })
                .collect(),
        }
    }

    fn replay(script: &ReplayScript) -> AppResult<ReplayOutput> {
        Replayer::new(EngineConfig::default()).replay(script)
    }

    #[test]
    fn test_draw_then_switch_pages() {
        let output = replay(&script(
            3,
            vec![
                (0, Command::SelectTool { tool: "rectangle".to_string() }),
                (100, Command::ChangePage { offset: 1 }),
                (200, Command::SelectTool { tool: "circle".to_string() }),
                (300, Command::SelectTool { tool: "circle".to_string() }),
            ],
        ))
        .unwrap();

        assert_eq!(output.current_page, 2);
        assert_eq!(output.document.len(), 2);
        assert_eq!(output.document[&1]["objects"].as_array().unwrap().len(), 1);
        assert_eq!(output.document[&2]["objects"].as_array().unwrap().len(), 2);
        assert_eq!(output.tool, "select");
    }

    #[test]
    fn test_burst_saves_once() {
        let steps = (0..5)
            .map(|i| (i * 200, Command::SelectTool { tool: "rectangle".to_string() }))
            .collect();
        let output = replay(&script(1, steps)).unwrap();
        assert_eq!(output.saves, 1);
    }

    #[test]
    fn test_zoom_and_rotate_reported() {
        let output = replay(&script(
            1,
            vec![
                (0, Command::SetZoom { scale: 1.5 }),
                (10, Command::Rotate),
                (20, Command::Resize),
            ],
        ))
        .unwrap();
        assert!((output.scale - 1.5).abs() < f64::EPSILON);
        assert_eq!(output.rotation, 90);
        assert_eq!(output.resyncs, 1);
    }

    #[test]
    fn test_notes_reference_navigation() {
        let output = replay(&script(
            5,
            vec![
                (0, Command::JumpToPage { page: 4 }),
                (10, Command::InsertPageTag),
                (20, Command::JumpToPage { page: 9 }),
            ],
        ))
        .unwrap();
        assert_eq!(output.current_page, 4);
        assert_eq!(output.notes, "[page:4]");
    }

    #[test]
    fn test_rejected_file() {
        let mut s = script(1, Vec::new());
        s.file.mime = "image/png".to_string();
        s.file.name = "photo.png".to_string();
        assert!(matches!(replay(&s), Err(AppError::Intake(IntakeError::NotPdf { .. }))));
    }
}
