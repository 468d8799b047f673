//! Link substitution.
//!
//! Runs on each text block before insert substitution.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::util::escape_html;

/// Rewrites link syntax in a text block.
pub trait LinkRenderer {
    /// Return `text` with links rendered.
    fn render_links(&self, text: &str) -> String;
}

/// Leaves text unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLinks;

impl LinkRenderer for NoLinks {
    fn render_links(&self, text: &str) -> String {
        text.to_owned()
    }
}

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").unwrap());
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap());

/// Renders Twine-style passage links.
///
/// | Syntax | Label | Target |
/// |--------|-------|--------|
/// | `[[Target]]` | Target | Target |
/// | `[[Label->Target]]` | Label | Target |
/// | `[[Target<-Label]]` | Label | Target |
/// | `[[Label\|Target]]` | Label | Target |
///
/// Targets with a URL scheme become ordinary links; anything else becomes a
/// passage link carrying a `data-folio-go` attribute. Labels and targets are
/// both HTML-escaped.
///
/// # Example
///
/// ```
/// use folio_render::{LinkRenderer, PassageLinks};
///
/// let html = PassageLinks.render_links("Go [[north->Cave]].");
/// assert_eq!(
///     html,
///     r#"Go <a href="javascript:void(0)" data-folio-go="Cave">north</a>."#
/// );
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PassageLinks;

impl PassageLinks {
    /// Split link source into `(label, target)`.
    fn parse(source: &str) -> (&str, &str) {
        if let Some((label, target)) = source.split_once("->") {
            return (label.trim(), target.trim());
        }
        if let Some((target, label)) = source.split_once("<-") {
            return (label.trim(), target.trim());
        }
        if let Some((label, target)) = source.split_once('|') {
            return (label.trim(), target.trim());
        }
        let source = source.trim();
        (source, source)
    }

    fn render_link(caps: &Captures<'_>) -> String {
        let (label, target) = Self::parse(&caps[1]);
        let label = escape_html(label);

        if URL_RE.is_match(target) {
            format!(r#"<a href="{}">{label}</a>"#, escape_html(target))
        } else {
            format!(
                r#"<a href="javascript:void(0)" data-folio-go="{}">{label}</a>"#,
                escape_html(target)
            )
        }
    }
}

impl LinkRenderer for PassageLinks {
    fn render_links(&self, text: &str) -> String {
        LINK_RE
            .replace_all(text, |caps: &Captures<'_>| Self::render_link(caps))
            .into_owned()
    }
}
