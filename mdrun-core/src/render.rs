//! Preview-side fence annotation.
//!
//! Runnable fences get wrapped in a marker element that carries the session
//! token and the normalized language. The click handler in the preview reads
//! the *visible* code text from inside the wrapper and builds the request
//! from that, so what runs is what the user sees.

use crate::blocks::{parse_code_blocks, CodeBlock};
use crate::blocks::parser::language_from_info;
use crate::runtime::languages::is_allowed;

pub const WRAPPER_CLASS: &str = "md-run-terminal-wrapper";
pub const MARKER_ATTR: &str = "data-md-run-terminal";
pub const NONCE_ATTR: &str = "data-md-run-terminal-nonce";
pub const LANGUAGE_ATTR: &str = "data-language";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// What the renderer would have produced without us.
pub fn render_fence_default(language: &str, content: &str) -> String {
    let mut html = String::from("<pre><code");
    if !language.is_empty() {
        html.push_str(&format!(" class=\"language-{}\"", escape_html(language)));
    }
    html.push('>');
    html.push_str(&escape_html(content));
    if !content.is_empty() && !content.ends_with('\n') {
        html.push('\n');
    }
    html.push_str("</code></pre>\n");
    html
}

fn button(action: &str, title: &str, label: &str) -> String {
    format!(
        "<button class=\"md-run-terminal-btn md-run-terminal-{action}-btn\" data-action=\"{action}\" title=\"{title}\">{label}</button>"
    )
}

/// Wrap `default_html` when the fence's language is allow-listed; otherwise
/// hand it back untouched.
pub fn annotate_fence(info: &str, default_html: &str, nonce: &str, allow_list: &[String]) -> String {
    let language = language_from_info(info);
    if !is_allowed(&language, allow_list) {
        return default_html.to_string();
    }

    let mut html = String::new();
    html.push_str(&format!(
        "<div class=\"{}\" {}=\"1\" {}=\"{}\" {}=\"{}\">\n",
        WRAPPER_CLASS,
        MARKER_ATTR,
        NONCE_ATTR,
        escape_html(nonce),
        LANGUAGE_ATTR,
        escape_html(&language)
    ));
    html.push_str("<div class=\"md-run-terminal-btn-group\">");
    html.push_str(&button("type", "Type in Terminal (without executing)", "Type"));
    html.push_str(&button("run", "Run in Terminal", "Run"));
    html.push_str("</div>\n");
    html.push_str(default_html);
    html.push_str("</div>\n");
    html
}

pub fn render_block(block: &CodeBlock, nonce: &str, allow_list: &[String]) -> String {
    let default_html = render_fence_default(&block.language, &block.content);
    annotate_fence(&block.info, &default_html, nonce, allow_list)
}

/// Every fence in `text`, rendered for the preview.
pub fn render_document(text: &str, nonce: &str, allow_list: &[String]) -> String {
    parse_code_blocks(text)
        .iter()
        .map(|block| render_block(block, nonce, allow_list))
        .collect()
}
