use line_ending::LineEnding;
use regex::Regex;
use std::sync::OnceLock;

use super::model::CodeBlock;

static OPEN_FENCE: OnceLock<Regex> = OnceLock::new();
static CLOSE_FENCE: OnceLock<Regex> = OnceLock::new();

fn open_fence() -> &'static Regex {
    // Three or more backticks, then an optional info string without backticks.
    OPEN_FENCE.get_or_init(|| Regex::new(r"^`{3,}([^`]*)$").expect("Invalid open fence regex"))
}

fn close_fence() -> &'static Regex {
    CLOSE_FENCE.get_or_init(|| Regex::new(r"^`{3,}$").expect("Invalid close fence regex"))
}

/// The separator used to join block bodies: the document's dominant line
/// ending.
pub fn line_separator(text: &str) -> String {
    LineEnding::from(text).denormalize("\n")
}

/// First whitespace-delimited token of an info string, lowercased.
pub fn language_from_info(info: &str) -> String {
    info.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

struct OpenBlock {
    info: String,
    start_offset: usize,
    start_line: usize,
    lines: Vec<String>,
}

/// Scan `text` for fenced code blocks, in document order.
///
/// - A line that is a fence marker (optionally followed by an info string)
///   opens a block when none is open.
/// - Inside a block, a line whose trimmed content is exactly a fence marker
///   closes it. Any marker length closes any open block.
/// - A block still open at end of input yields nothing.
pub fn parse_code_blocks(text: &str) -> Vec<CodeBlock> {
    let separator = line_separator(text);
    let mut blocks = Vec::new();
    let mut current: Option<OpenBlock> = None;
    let mut offset = 0usize;

    for (line_no, raw) in text.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw.len();

        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line_end = line_start + line.len();

        match current.take() {
            Some(open) if close_fence().is_match(line.trim()) => {
                blocks.push(CodeBlock {
                    language: language_from_info(&open.info),
                    content: open.lines.join(&separator),
                    info: open.info,
                    start_offset: open.start_offset,
                    end_offset: line_end,
                    start_line: open.start_line,
                    end_line: line_no,
                });
            }
            Some(mut open) => {
                open.lines.push(line.to_string());
                current = Some(open);
            }
            None => {
                if let Some(caps) = open_fence().captures(line) {
                    let info = caps
                        .get(1)
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default();
                    current = Some(OpenBlock {
                        info,
                        start_offset: line_start,
                        start_line: line_no,
                        lines: Vec::new(),
                    });
                }
            }
        }
    }

    if let Some(open) = current {
        tracing::debug!(
            line = open.start_line,
            "dropping unterminated fence at end of document"
        );
    }

    blocks
}
