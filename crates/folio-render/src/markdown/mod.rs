//! Final Markdown-to-HTML pass.
//!
//! Converts the Markdown accumulated by the block renderer into HTML using
//! pulldown-cmark for parsing and [`HtmlRules`] for format-specific output.
//!
//! # Example
//!
//! ```
//! use folio_render::{MarkdownConverter, MarkdownOptions, StoryHtml};
//!
//! let converter = MarkdownConverter::<StoryHtml>::new(MarkdownOptions::default());
//! let html = converter.convert("\"Hello\" -- *there*...");
//! assert_eq!(html, "<p>\u{201c}Hello\u{201d} \u{2013} <em>there</em>\u{2026}</p>");
//! ```

mod html;
mod rules;

use std::fmt::Write;
use std::marker::PhantomData;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::util::{escape_html, heading_level_to_num};

pub use html::StoryHtml;
pub use rules::{HtmlRules, InlineKind};

/// Fixed rule set for the final pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Curly quotes, en/em dashes and ellipses.
    pub smart_punctuation: bool,
    /// Tables, strikethrough and task lists.
    pub gfm: bool,
    /// Render single newlines inside a paragraph as line breaks.
    pub line_breaks: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            smart_punctuation: true,
            gfm: true,
            line_breaks: true,
        }
    }
}

impl MarkdownOptions {
    /// pulldown-cmark parser options for this configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.smart_punctuation {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }
        if self.gfm {
            options |= Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM;
        }
        options
    }
}

/// Markdown converter with pluggable HTML rules.
///
/// Holds only configuration, so converting is a pure function of the input.
pub struct MarkdownConverter<B: HtmlRules = StoryHtml> {
    options: MarkdownOptions,
    _rules: PhantomData<B>,
}

impl<B: HtmlRules> MarkdownConverter<B> {
    /// Create a converter with the given options.
    #[must_use]
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            _rules: PhantomData,
        }
    }

    /// The converter's options.
    pub fn options(&self) -> MarkdownOptions {
        self.options
    }

    /// Convert Markdown to HTML.
    pub fn convert(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options.parser_options());
        let mut writer = HtmlWriter::<B>::new(self.options.line_breaks, markdown.len());
        for event in parser {
            writer.event(event);
        }
        writer.out
    }
}

impl<B: HtmlRules> Default for MarkdownConverter<B> {
    fn default() -> Self {
        Self::new(MarkdownOptions::default())
    }
}

/// Image being collected: source, title and alt text so far.
struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

/// Table layout state.
#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

impl TableState {
    fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell) {
            Some(Alignment::Left) => r#" style="text-align: left""#,
            Some(Alignment::Center) => r#" style="text-align: center""#,
            Some(Alignment::Right) => r#" style="text-align: right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

struct HtmlWriter<B: HtmlRules> {
    out: String,
    line_breaks: bool,
    /// Language and content of the code block being collected.
    code: Option<(Option<String>, String)>,
    image: Option<PendingImage>,
    table: TableState,
    _rules: PhantomData<B>,
}

impl<B: HtmlRules> HtmlWriter<B> {
    fn new(line_breaks: bool, capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity + capacity / 2),
            line_breaks,
            code: None,
            image: None,
            table: TableState::default(),
            _rules: PhantomData,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&code);
                } else {
                    B::code_span(&code, &mut self.out);
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => self.out.push_str(&html),
            Event::SoftBreak => {
                if let Some(image) = &mut self.image {
                    image.alt.push(' ');
                } else if self.line_breaks {
                    B::hard_break(&mut self.out);
                } else {
                    self.out.push('\n');
                }
            }
            Event::HardBreak => B::hard_break(&mut self.out),
            Event::Rule => B::horizontal_rule(&mut self.out),
            Event::TaskListMarker(checked) => B::task_list_marker(checked, &mut self.out),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        // Alt text is plain; markup inside an image is dropped.
        if self.image.is_some() {
            return;
        }
        match tag {
            Tag::Paragraph => self.out.push_str("<p>"),
            Tag::Heading { level, .. } => {
                write!(self.out, "<h{}>", heading_level_to_num(level)).unwrap();
            }
            Tag::BlockQuote(_) => B::blockquote_start(&mut self.out),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(ToOwned::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => match start {
                Some(1) => self.out.push_str("<ol>"),
                Some(n) => write!(self.out, r#"<ol start="{n}">"#).unwrap(),
                None => self.out.push_str("<ul>"),
            },
            Tag::Item => self.out.push_str("<li>"),
            Tag::Table(alignments) => {
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.out.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell = 0;
                self.out.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.cell = 0;
                self.out.push_str("<tr>");
            }
            Tag::TableCell => {
                let tag = if self.table.in_head { "th" } else { "td" };
                write!(self.out, "<{tag}{}>", self.table.alignment_style()).unwrap();
            }
            Tag::Emphasis => B::inline_start(InlineKind::Emphasis, &mut self.out),
            Tag::Strong => B::inline_start(InlineKind::Strong, &mut self.out),
            Tag::Strikethrough => B::inline_start(InlineKind::Strikethrough, &mut self.out),
            Tag::Superscript => B::inline_start(InlineKind::Superscript, &mut self.out),
            Tag::Subscript => B::inline_start(InlineKind::Subscript, &mut self.out),
            Tag::Link {
                dest_url, title, ..
            } => B::link_start(&dest_url, &title, &mut self.out),
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::DefinitionList => self.out.push_str("<dl>"),
            Tag::DefinitionListTitle => self.out.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.out.push_str("<dd>"),
            Tag::HtmlBlock | Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if self.image.is_some() && tag != TagEnd::Image {
            return;
        }
        match tag {
            TagEnd::Paragraph => self.out.push_str("</p>"),
            TagEnd::Heading(level) => {
                write!(self.out, "</h{}>", heading_level_to_num(level)).unwrap();
            }
            TagEnd::BlockQuote(_) => B::blockquote_end(&mut self.out),
            TagEnd::CodeBlock => {
                if let Some((lang, content)) = self.code.take() {
                    B::code_block(lang.as_deref(), &content, &mut self.out);
                }
            }
            TagEnd::List(ordered) => self.out.push_str(if ordered { "</ol>" } else { "</ul>" }),
            TagEnd::Item => self.out.push_str("</li>"),
            TagEnd::Table => self.out.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.table.in_head = false;
                self.out.push_str("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.out.push_str("</tr>"),
            TagEnd::TableCell => {
                self.out
                    .push_str(if self.table.in_head { "</th>" } else { "</td>" });
                self.table.cell += 1;
            }
            TagEnd::Emphasis => B::inline_end(InlineKind::Emphasis, &mut self.out),
            TagEnd::Strong => B::inline_end(InlineKind::Strong, &mut self.out),
            TagEnd::Strikethrough => B::inline_end(InlineKind::Strikethrough, &mut self.out),
            TagEnd::Superscript => B::inline_end(InlineKind::Superscript, &mut self.out),
            TagEnd::Subscript => B::inline_end(InlineKind::Subscript, &mut self.out),
            TagEnd::Link => B::link_end(&mut self.out),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    B::image(&image.src, &image.alt, &image.title, &mut self.out);
                }
            }
            TagEnd::DefinitionList => self.out.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.out.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.out.push_str("</dd>"),
            TagEnd::HtmlBlock | TagEnd::FootnoteDefinition | TagEnd::MetadataBlock(_) => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, content)) = &mut self.code {
            content.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            self.out.push_str(&escape_html(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn convert(markdown: &str) -> String {
        MarkdownConverter::<StoryHtml>::default().convert(markdown)
    }

    fn convert_with(markdown: &str, options: MarkdownOptions) -> String {
        MarkdownConverter::<StoryHtml>::new(options).convert(markdown)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(convert(""), "");
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(convert("\n\nOne\n\nTwo"), "<p>One</p><p>Two</p>");
    }

    #[test]
    fn test_smart_punctuation() {
        assert_eq!(
            convert("\"It's\" -- done --- now..."),
            "<p>\u{201c}It\u{2019}s\u{201d} \u{2013} done \u{2014} now\u{2026}</p>"
        );
    }

    #[test]
    fn test_smart_punctuation_disabled() {
        let options = MarkdownOptions {
            smart_punctuation: false,
            ..MarkdownOptions::default()
        };
        assert_eq!(
            convert_with("\"a\" -- b", options),
            "<p>&quot;a&quot; -- b</p>"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(convert("one\ntwo"), "<p>one<br>two</p>");

        let options = MarkdownOptions {
            line_breaks: false,
            ..MarkdownOptions::default()
        };
        assert_eq!(convert_with("one\ntwo", options), "<p>one\ntwo</p>");
    }

    #[test]
    fn test_inline_rules() {
        assert_eq!(
            convert("*a* **b** ~~c~~ `d`"),
            "<p><em>a</em> <strong>b</strong> <del>c</del> <code>d</code></p>"
        );
    }

    #[test]
    fn test_links_and_images() {
        assert_eq!(
            convert("[out](https://example.com) ![a *b*](x.png)"),
            concat!(
                r#"<p><a href="https://example.com" target="_blank" rel="noopener">out</a> "#,
                r#"<img src="x.png" alt="a b" loading="lazy"></p>"#
            )
        );
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = convert("<div style=\"text-align: center\">\n\nHi\n\n</div>");
        assert!(html.starts_with("<div style=\"text-align: center\">"));
        assert!(html.contains("<p>Hi</p>"));
        assert!(html.trim_end().ends_with("</div>"));
    }

    #[test]
    fn test_headings_and_lists() {
        assert_eq!(
            convert("## Title\n\n- a\n- b\n\n3. c"),
            r#"<h2>Title</h2><ul><li>a</li><li>b</li></ul><ol start="3"><li>c</li></ol>"#
        );
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            convert("```rust\nlet x = 1 < 2;\n```"),
            r#"<pre><code class="language-rust">let x = 1 &lt; 2;
</code></pre>"#
        );
    }

    #[test]
    fn test_table_alignment() {
        let html = convert("| A | B |\n|:--|--:|\n| 1 | 2 |");
        assert_eq!(
            html,
            concat!(
                r#"<table><thead><tr><th style="text-align: left">A</th>"#,
                r#"<th style="text-align: right">B</th></tr></thead><tbody>"#,
                r#"<tr><td style="text-align: left">1</td><td style="text-align: right">2</td></tr>"#,
                "</tbody></table>"
            )
        );
    }

    #[test]
    fn test_gfm_disabled() {
        let options = MarkdownOptions {
            gfm: false,
            ..MarkdownOptions::default()
        };
        assert!(!convert_with("| A |\n|---|\n| 1 |", options).contains("<table>"));
        assert!(!options.parser_options().contains(Options::ENABLE_TABLES));
    }

    #[test]
    fn test_parser_options_default() {
        let options = MarkdownOptions::default().parser_options();
        assert!(options.contains(Options::ENABLE_SMART_PUNCTUATION));
        assert!(options.contains(Options::ENABLE_STRIKETHROUGH));
        assert!(options.contains(Options::ENABLE_TASKLISTS));
    }

    #[test]
    fn test_convert_is_repeatable() {
        let converter = MarkdownConverter::<StoryHtml>::default();
        let markdown = "Some *text*\n\n> quoted";
        assert_eq!(converter.convert(markdown), converter.convert(markdown));
    }
}
