//! Replay script format.

use annot8_core::input::{KeyEvent, Modifiers};
use annot8_core::session::PDF_MIME;
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// The file being "opened". Only its metadata matters; the bytes are synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFile {
    pub name: String,
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default = "default_file_size")]
    pub size: u64,
}

fn default_mime() -> String {
    PDF_MIME.to_string()
}

fn default_file_size() -> u64 {
    1024
}

fn default_page_size() -> Size {
    // US Letter in points
    Size::new(612.0, 792.0)
}

/// A recorded session: the document stand-in and the timed commands applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub file: ScriptFile,
    pub pages: u32,
    /// Page size at zoom 1 and no rotation.
    #[serde(default = "default_page_size")]
    pub page_size: Size,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

/// One command at a time offset from the start of the replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SelectTool { tool: String },
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Key { key: KeyEvent },
    SetText { text: String },
    CommitText,
    DeleteSelected,
    ZoomIn,
    ZoomOut,
    SetZoom { scale: f64 },
    Rotate,
    Resize,
    ChangePage { offset: i64 },
    JumpToPage { page: u32 },
    EditNotes { text: String },
    InsertPageTag,
    /// Advance time without doing anything else.
    Wait,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_script() {
        let script: ReplayScript = serde_json::from_str(r#"{"file": {"name": "a.pdf"}, "pages": 4}"#).unwrap();
        assert_eq!(script.file.mime, "application/pdf");
        assert_eq!(script.page_size, Size::new(612.0, 792.0));
        assert!(script.steps.is_empty());
    }

    #[test]
    fn test_parse_commands() {
        let steps: Vec<ScriptStep> = serde_json::from_str(
            r#"[
                {"at_ms": 0, "command": {"type": "pointer_down", "x": 1.0, "y": 2.0, "modifiers": {"shift": true}}},
                {"at_ms": 10, "command": {"type": "key", "key": {"Text": "a"}}},
                {"at_ms": 20, "command": {"type": "change_page", "offset": -1}},
                {"at_ms": 30, "command": {"type": "zoom_in"}}
            ]"#,
        )
        .unwrap();
        assert!(matches!(
            &steps[0].command,
            Command::PointerDown { modifiers, .. } if modifiers.shift && !modifiers.ctrl
        ));
        assert_eq!(steps[1].command, Command::Key { key: KeyEvent::Text("a".to_string()) });
        assert_eq!(steps[2].command, Command::ChangePage { offset: -1 });
        assert_eq!(steps[3].command, Command::ZoomIn);
    }
}
