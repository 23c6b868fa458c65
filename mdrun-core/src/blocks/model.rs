//! Code block model.

use serde::{Deserialize, Serialize};

/// One fenced code block found in a document.
///
/// Recomputed on every parse; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Lowercased first whitespace-delimited token of the info string
    /// (empty when the fence has no info string).
    pub language: String,
    /// The full info string as written, minus surrounding whitespace.
    pub info: String,
    /// Lines between the fences, joined with the document's line separator.
    pub content: String,
    /// Byte offset of the first character of the opening fence line.
    pub start_offset: usize,
    /// Byte offset just past the closing fence line (before its terminator).
    pub end_offset: usize,
    /// 0-based line number of the opening fence.
    pub start_line: usize,
    /// 0-based line number of the closing fence.
    pub end_line: usize,
}

impl CodeBlock {
    /// Number of lines in the body.
    pub fn line_count(&self) -> usize {
        if self.content.is_empty() {
            0
        } else {
            self.content.lines().count()
        }
    }
}
