//! Notes document and `[page:N]` cross-references.

use crate::storage::PageIndex;
use crate::timer::{Debounce, Instant};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Duration;
use thiserror::Error;

/// Default quiet period before note edits are committed.
pub const DEFAULT_NOTES_DEBOUNCE: Duration = Duration::from_millis(300);

const TAG_OPEN: &str = "[page:";
const TAG_CLOSE: char = ']';

/// Notes errors.
#[derive(Debug, Error)]
pub enum NotesError {
    #[error("Notes file is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// A piece of note text: literal text or a page reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteSegment {
    Text(String),
    PageRef {
        page: PageIndex,
        /// Byte range of the whole `[page:N]` token in the parsed text.
        span: Range<usize>,
    },
}

/// Build the reference token for a page.
pub fn page_tag(page: PageIndex) -> String {
    format!("{TAG_OPEN}{page}{TAG_CLOSE}")
}

/// Split text into literal runs and page references, in order.
///
/// A reference is exactly `[page:` + ASCII digits + `]` naming a page >= 1 that fits in a
/// `PageIndex`. Anything else stays literal text.
pub fn parse_page_refs(text: &str) -> Vec<NoteSegment> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(TAG_OPEN) {
        let start = cursor + offset;
        let digits_start = start + TAG_OPEN.len();
        let digits_len = text[digits_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let digits_end = digits_start + digits_len;

        let page = (digits_len > 0 && text[digits_end..].starts_with(TAG_CLOSE))
            .then(|| text[digits_start..digits_end].parse::<PageIndex>().ok())
            .flatten()
            .filter(|&page| page >= 1);

        match page {
            Some(page) => {
                let end = digits_end + TAG_CLOSE.len_utf8();
                push_text(&mut segments, &text[literal_start..start]);
                segments.push(NoteSegment::PageRef { page, span: start..end });
                literal_start = end;
                cursor = end;
            }
            // Not a reference; resume the search just past this '['
            None => cursor = start + 1,
        }
    }
    push_text(&mut segments, &text[literal_start..]);
    segments
}

fn push_text(segments: &mut Vec<NoteSegment>, text: &str) {
    if text.is_empty() {
        return;
    }
    match segments.last_mut() {
        Some(NoteSegment::Text(last)) => last.push_str(text),
        _ => segments.push(NoteSegment::Text(text.to_string())),
    }
}

/// Block kind of a preview line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// `# `, `## ` or `### ` heading.
    Heading(u8),
    /// `- ` list item.
    ListItem,
    Blank,
    Paragraph,
}

/// Preview piece handed to the external Markdown renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewSegment {
    Text(String),
    PageRef {
        page: PageIndex,
        /// Whether the reference points at the page being viewed.
        is_current: bool,
    },
}

/// One classified line of the notes preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLine {
    pub kind: LineKind,
    /// Line content without its block marker.
    pub segments: Vec<PreviewSegment>,
}

/// Classify each line and resolve its references.
pub fn preview_lines(text: &str, current_page: PageIndex) -> Vec<PreviewLine> {
    text.split('\n')
        .map(|line| {
            let (kind, body) = classify_line(line);
            let segments = parse_page_refs(body)
                .into_iter()
                .map(|segment| match segment {
                    NoteSegment::Text(text) => PreviewSegment::Text(text),
                    NoteSegment::PageRef { page, .. } => PreviewSegment::PageRef {
                        page,
                        is_current: page == current_page,
                    },
                })
                .collect();
            PreviewLine { kind, segments }
        })
        .collect()
}

fn classify_line(line: &str) -> (LineKind, &str) {
    if let Some(body) = line.strip_prefix("### ") {
        (LineKind::Heading(3), body)
    } else if let Some(body) = line.strip_prefix("## ") {
        (LineKind::Heading(2), body)
    } else if let Some(body) = line.strip_prefix("# ") {
        (LineKind::Heading(1), body)
    } else if let Some(body) = line.strip_prefix("- ") {
        (LineKind::ListItem, body)
    } else if line.trim().is_empty() {
        (LineKind::Blank, "")
    } else {
        (LineKind::Paragraph, line)
    }
}

/// Export flavor. The content is identical; only file name and MIME type differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotesFormat {
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "txt")]
    PlainText,
}

impl NotesFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            NotesFormat::Markdown => "notes.md",
            NotesFormat::PlainText => "notes.txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            NotesFormat::Markdown => "text/markdown",
            NotesFormat::PlainText => "text/plain",
        }
    }
}

/// A notes file ready to hand to the host for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesExport {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// The notes text being edited plus its debounced committed copy.
#[derive(Debug, Clone)]
pub struct NoteDocument {
    text: String,
    committed: String,
    debounce: Debounce,
}

impl Default for NoteDocument {
    fn default() -> Self {
        Self::new(DEFAULT_NOTES_DEBOUNCE)
    }
}

impl NoteDocument {
    pub fn new(delay: Duration) -> Self {
        Self {
            text: String::new(),
            committed: String::new(),
            debounce: Debounce::new(delay),
        }
    }

    /// Text as currently typed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text as last published.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Replace the text and restart the commit timer.
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.text = text.into();
        self.debounce.trigger(now);
    }

    /// Append the current page's reference token to the end of the text.
    pub fn insert_page_tag(&mut self, current_page: PageIndex, now: Instant) {
        let text = format!("{}{}", self.text, page_tag(current_page));
        self.edit(text, now);
    }

    /// Load a notes file as an edit.
    pub fn import(&mut self, bytes: Vec<u8>, now: Instant) -> Result<(), NotesError> {
        let text = String::from_utf8(bytes)?;
        self.edit(text, now);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Commit once the quiet period has elapsed. Returns the newly committed text.
    pub fn poll(&mut self, now: Instant) -> Option<&str> {
        if self.debounce.poll(now) {
            self.committed = self.text.clone();
            Some(&self.committed)
        } else {
            None
        }
    }

    /// Commit a pending edit immediately.
    pub fn flush(&mut self) -> bool {
        if self.debounce.take_pending() {
            self.committed = self.text.clone();
            true
        } else {
            false
        }
    }

    /// Drop a pending edit without committing it.
    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    /// Committed text packaged for download. Pending edits are committed first.
    pub fn export(&mut self, format: NotesFormat) -> NotesExport {
        self.flush();
        NotesExport {
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            bytes: self.committed.as_bytes().to_vec(),
        }
    }

    /// Character count for the footer.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn segments(&self) -> Vec<NoteSegment> {
        parse_page_refs(&self.text)
    }

    pub fn preview(&self, current_page: PageIndex) -> Vec<PreviewLine> {
        preview_lines(&self.text, current_page)
    }
}
