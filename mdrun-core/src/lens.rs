//! Editor-side actions: one "Run" lens per runnable block.
//!
//! This path stays inside the trusted editor, so lenses carry no token.

use serde::Serialize;

use crate::blocks::parse_code_blocks;
use crate::runtime::languages::is_allowed;

pub const LENS_TITLE: &str = "$(play) Run";
pub const LENS_TOOLTIP: &str = "Run this code block in terminal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockLens {
    /// 0-based line of the opening fence.
    pub line: usize,
    pub title: String,
    pub tooltip: String,
    pub content: String,
    pub language: String,
}

pub fn code_lenses(text: &str, allow_list: &[String]) -> Vec<BlockLens> {
    parse_code_blocks(text)
        .into_iter()
        .filter(|block| is_allowed(&block.language, allow_list))
        .map(|block| BlockLens {
            line: block.start_line,
            title: LENS_TITLE.to_string(),
            tooltip: LENS_TOOLTIP.to_string(),
            content: block.content,
            language: block.language,
        })
        .collect()
}
