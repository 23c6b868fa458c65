//! Fenced code block model + parser.
//!
//! A "block" is one fenced region of a Markdown document:
//! - language tag (first token of the info string)
//! - body text (verbatim, joined with the document's line separator)
//! - byte offsets and line numbers of the opening and closing fences
//!
//! The parser is not fence-length aware and silently drops a fence that
//! is never closed.

pub mod model;
pub mod parser;

pub use model::CodeBlock;
pub use parser::parse_code_blocks;
