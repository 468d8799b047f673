//! Story HTML rules.

use std::fmt::Write;

use super::rules::{HtmlRules, InlineKind};
use crate::util::escape_html;

/// Default rules for story output.
///
/// Differs from plain HTML5 in a few places:
/// - strikethrough renders as `<del>`
/// - links with a URL scheme open in a new tab
/// - images are lazy-loaded
pub struct StoryHtml;

impl HtmlRules for StoryHtml {
    fn inline_start(kind: InlineKind, out: &mut String) {
        out.push_str(match kind {
            InlineKind::Emphasis => "<em>",
            InlineKind::Strong => "<strong>",
            InlineKind::Strikethrough => "<del>",
            InlineKind::Superscript => "<sup>",
            InlineKind::Subscript => "<sub>",
        });
    }

    fn inline_end(kind: InlineKind, out: &mut String) {
        out.push_str(match kind {
            InlineKind::Emphasis => "</em>",
            InlineKind::Strong => "</strong>",
            InlineKind::Strikethrough => "</del>",
            InlineKind::Superscript => "</sup>",
            InlineKind::Subscript => "</sub>",
        });
    }

    fn link_start(url: &str, title: &str, out: &mut String) {
        write!(out, r#"<a href="{}""#, escape_html(url)).unwrap();
        if !title.is_empty() {
            write!(out, r#" title="{}""#, escape_html(title)).unwrap();
        }
        if is_external(url) {
            out.push_str(r#" target="_blank" rel="noopener""#);
        }
        out.push('>');
    }

    fn image(src: &str, alt: &str, title: &str, out: &mut String) {
        let title_attr = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        write!(
            out,
            r#"<img src="{}"{title_attr} alt="{}" loading="lazy">"#,
            escape_html(src),
            escape_html(alt)
        )
        .unwrap();
    }

    fn code_block(lang: Option<&str>, content: &str, out: &mut String) {
        if let Some(lang) = lang {
            write!(
                out,
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                escape_html(lang),
                escape_html(content)
            )
            .unwrap();
        } else {
            write!(out, "<pre><code>{}</code></pre>", escape_html(content)).unwrap();
        }
    }
}

/// Whether a link leaves the story.
fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}
