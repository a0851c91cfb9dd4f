//! Markdown rendering for card faces.
//!
//! Cards are authored in markdown. Views need sanitised HTML, search and
//! previews need plain text, and the editor needs to know whether a face is
//! blank.

use ammonia::Builder as AmmoniaBuilder;
use comrak::nodes::{AstNode, NodeValue};
use comrak::options::Options;
use comrak::{Arena, format_html, parse_document};
use once_cell::sync::Lazy;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
}

/// Comrak parser with an Ammonia sanitiser on the HTML output.
pub struct MarkdownRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
}

static RENDERER: Lazy<MarkdownRenderer> = Lazy::new(MarkdownRenderer::new);

/// Shared renderer, built on first use.
pub fn markdown() -> &'static MarkdownRenderer {
    &RENDERER
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: card_options(),
            sanitizer: card_sanitizer(),
        }
    }

    /// Render `markdown` to sanitised HTML.
    pub fn to_html(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;
        Ok(self.sanitizer.clean(&html).to_string())
    }

    /// Visible text of `markdown`, one line per block. Raw HTML is dropped.
    pub fn to_text(&self, markdown: &str) -> String {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        let mut buffer = String::new();
        collect_text(root, &mut buffer);
        buffer
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when `markdown` shows nothing: no text and no images.
    pub fn is_empty(&self, markdown: &str) -> bool {
        if markdown.trim().is_empty() {
            return true;
        }
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        let has_image = root
            .descendants()
            .any(|node| matches!(node.data.borrow().value, NodeValue::Image(_)));
        if has_image {
            return false;
        }
        let mut buffer = String::new();
        collect_text(root, &mut buffer);
        buffer.trim().is_empty()
    }
}

fn card_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.underline = true;
    ext.spoiler = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;
    options
}

fn card_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.add_tags(&["input"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("span", &["class"]);
    builder
}

fn is_block(value: &NodeValue) -> bool {
    matches!(
        value,
        NodeValue::Paragraph
            | NodeValue::Heading(_)
            | NodeValue::Item(_)
            | NodeValue::CodeBlock(_)
            | NodeValue::TableRow(_)
    )
}

fn collect_text<'a>(node: &'a AstNode<'a>, buffer: &mut String) {
    let block = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Text(text) => buffer.push_str(text),
            NodeValue::Code(code) => buffer.push_str(&code.literal),
            NodeValue::CodeBlock(code) => buffer.push_str(&code.literal),
            NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
            NodeValue::TableCell => buffer.push(' '),
            _ => {}
        }
        is_block(&data.value)
    };
    for child in node.children() {
        collect_text(child, buffer);
    }
    if block && !buffer.ends_with('\n') {
        buffer.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_sanitised() {
        let html = markdown()
            .to_html("**bold** <script>alert(1)</script>")
            .expect("markdown renders");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("script"));
    }

    #[test]
    fn text_keeps_one_line_per_block() {
        let text = markdown().to_text("# Title\n\nSome *emphasis* and `code`.\n\n- one\n- two");
        insta::assert_snapshot!(text.replace('\n', " | "), @"Title | Some emphasis and code. | one | two");
    }

    #[test]
    fn blank_markdown_is_empty() {
        let renderer = markdown();
        assert!(renderer.is_empty(""));
        assert!(renderer.is_empty("   \n\n"));
        assert!(renderer.is_empty("<!-- note to self -->"));
        assert!(!renderer.is_empty("cat"));
        assert!(!renderer.is_empty("![diagram](diagram.png)"));
    }
}
