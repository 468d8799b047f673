//! HTML rendering rules for the final pass.
//!
//! The converter handles document structure (paragraphs, lists, tables) itself
//! and asks the rules for everything a story format may want to render its own
//! way: inline elements, links, images, code and quotes.

use std::fmt::Write;

use crate::util::escape_html;

/// Inline elements whose tags the rules choose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineKind {
    /// `*text*`
    Emphasis,
    /// `**text**`
    Strong,
    /// `~~text~~`
    Strikethrough,
    /// `^text^`
    Superscript,
    /// `~text~`
    Subscript,
}

/// Format-specific rendering hooks.
///
/// All methods write into `out`. Defaults produce plain HTML5.
pub trait HtmlRules {
    /// Opening tag for an inline element.
    fn inline_start(kind: InlineKind, out: &mut String) {
        out.push_str(match kind {
            InlineKind::Emphasis => "<em>",
            InlineKind::Strong => "<strong>",
            InlineKind::Strikethrough => "<s>",
            InlineKind::Superscript => "<sup>",
            InlineKind::Subscript => "<sub>",
        });
    }

    /// Closing tag for an inline element.
    fn inline_end(kind: InlineKind, out: &mut String) {
        out.push_str(match kind {
            InlineKind::Emphasis => "</em>",
            InlineKind::Strong => "</strong>",
            InlineKind::Strikethrough => "</s>",
            InlineKind::Superscript => "</sup>",
            InlineKind::Subscript => "</sub>",
        });
    }

    /// Inline code span.
    fn code_span(code: &str, out: &mut String) {
        write!(out, "<code>{}</code>", escape_html(code)).unwrap();
    }

    /// Opening `<a>` tag.
    fn link_start(url: &str, title: &str, out: &mut String) {
        out.push_str("<a href=\"");
        out.push_str(&escape_html(url));
        out.push('"');
        if !title.is_empty() {
            write!(out, r#" title="{}""#, escape_html(title)).unwrap();
        }
        out.push('>');
    }

    /// Closing `</a>` tag.
    fn link_end(out: &mut String) {
        out.push_str("</a>");
    }

    /// An image with its collected alt text.
    fn image(src: &str, alt: &str, title: &str, out: &mut String);

    /// A fenced or indented code block.
    fn code_block(lang: Option<&str>, content: &str, out: &mut String);

    /// Blockquote start tag.
    fn blockquote_start(out: &mut String) {
        out.push_str("<blockquote>");
    }

    /// Blockquote end tag.
    fn blockquote_end(out: &mut String) {
        out.push_str("</blockquote>");
    }

    /// A hard line break.
    fn hard_break(out: &mut String) {
        out.push_str("<br>");
    }

    /// A horizontal rule.
    fn horizontal_rule(out: &mut String) {
        out.push_str("<hr>");
    }

    /// A task list checkbox.
    fn task_list_marker(checked: bool, out: &mut String) {
        if checked {
            out.push_str(r#"<input type="checkbox" checked disabled> "#);
        } else {
            out.push_str(r#"<input type="checkbox" disabled> "#);
        }
    }
}
