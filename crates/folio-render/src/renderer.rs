//! Single-pass template renderer.

use crate::block::{BlockOutput, fallback_text};
use crate::document::{Block, ParsedDocument};
use crate::error::RenderError;
use crate::inserts::{InsertRenderer, NoInserts};
use crate::links::{LinkRenderer, NoLinks};
use crate::markdown::{HtmlRules, MarkdownConverter, MarkdownOptions, StoryHtml};
use crate::modifier::{ActivationWindow, MatchOutcome, ModifierRegistry};
use crate::vars::{VarStore, dispatch_vars};

/// Result of rendering a document.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Final HTML.
    pub html: String,
    /// Intermediate Markdown handed to the final pass.
    pub markdown: String,
    /// Non-fatal diagnostics (ambiguous modifier matches).
    pub warnings: Vec<String>,
}

/// Renders a [`ParsedDocument`] to HTML in a single pass.
///
/// The renderer holds only configuration; all per-render state (armed
/// modifiers, modifier state slots) lives inside [`render`](Self::render), so
/// one renderer can be reused for any number of documents.
///
/// # Example
///
/// ```
/// use folio_render::{
///     Block, MemoryStore, ModifierRegistry, ParsedDocument, TemplateRenderer, VarDirective,
/// };
/// use serde_json::json;
///
/// let doc = ParsedDocument::new(
///     vec![VarDirective::constant("visited", json!(true))],
///     vec![Block::Text("Hello, *world*.".to_owned())],
/// );
/// let mut store = MemoryStore::new();
///
/// let result = TemplateRenderer::new()
///     .render(&doc, &(), &ModifierRegistry::new(), &mut store, false)
///     .unwrap();
///
/// assert_eq!(result.html, "<p>Hello, <em>world</em>.</p>");
/// assert_eq!(store.get("visited"), Some(&json!(true)));
/// ```
pub struct TemplateRenderer<I: InsertRenderer = NoInserts, B: HtmlRules = StoryHtml> {
    links: Box<dyn LinkRenderer>,
    inserts: I,
    converter: MarkdownConverter<B>,
}

impl TemplateRenderer {
    /// Create a renderer with no link or insert substitution and default
    /// Markdown options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            links: Box::new(NoLinks),
            inserts: NoInserts,
            converter: MarkdownConverter::default(),
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InsertRenderer, B: HtmlRules> TemplateRenderer<I, B> {
    /// Use a link renderer for text blocks.
    #[must_use]
    pub fn with_links<L: LinkRenderer + 'static>(mut self, links: L) -> Self {
        self.links = Box::new(links);
        self
    }

    /// Use an insert renderer for text blocks.
    #[must_use]
    pub fn with_inserts<J: InsertRenderer>(self, inserts: J) -> TemplateRenderer<J, B> {
        TemplateRenderer {
            links: self.links,
            inserts,
            converter: self.converter,
        }
    }

    /// Use different HTML rules for the final pass.
    #[must_use]
    pub fn with_rules<C: HtmlRules>(self) -> TemplateRenderer<I, C> {
        TemplateRenderer {
            links: self.links,
            inserts: self.inserts,
            converter: MarkdownConverter::new(self.converter.options()),
        }
    }

    /// Set the final pass options.
    #[must_use]
    pub fn with_markdown_options(mut self, options: MarkdownOptions) -> Self {
        self.converter = MarkdownConverter::new(options);
        self
    }

    /// Render a document to HTML.
    ///
    /// Variable directives are applied to `store` first (skipped entirely when
    /// `suppress_vars` is set). Blocks are then walked in order: modifier blocks
    /// arm modifiers, text blocks are substituted, passed through every armed
    /// modifier and appended. The accumulated Markdown goes through the final
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if a variable's condition or value fails, or a
    /// modifier's handler fails. Nothing is rendered in that case, but variable
    /// writes already made are kept.
    pub fn render(
        &self,
        doc: &ParsedDocument,
        inserts: &I::Inserts,
        modifiers: &ModifierRegistry,
        store: &mut dyn VarStore,
        suppress_vars: bool,
    ) -> Result<RenderResult, RenderError> {
        tracing::info!(
            vars = doc.vars.len(),
            blocks = doc.blocks.len(),
            suppress_vars,
            "Rendering document"
        );

        dispatch_vars(&doc.vars, store, suppress_vars)?;

        let (markdown, warnings) = self.render_blocks(&doc.blocks, inserts, modifiers)?;
        tracing::trace!(%markdown, "Intermediate markdown");

        let html = self.converter.convert(&markdown);
        Ok(RenderResult {
            html,
            markdown,
            warnings,
        })
    }

    /// Walk the blocks and build the intermediate Markdown.
    fn render_blocks(
        &self,
        blocks: &[Block],
        inserts: &I::Inserts,
        modifiers: &ModifierRegistry,
    ) -> Result<(String, Vec<String>), RenderError> {
        let mut out = String::new();
        let mut warnings = Vec::new();
        let mut window = ActivationWindow::new();

        for block in blocks {
            match block {
                Block::Text(content) => {
                    let linked = self.links.render_links(content);
                    let mut output = BlockOutput::new(self.inserts.render_inserts(&linked, inserts));

                    if !window.is_empty() {
                        tracing::debug!(count = window.len(), "Applying modifiers to text block");
                    }
                    window.apply(&mut output)?;
                    output.write_to(&mut out);
                }
                Block::Modifier(invocation) => match modifiers.resolve(invocation) {
                    MatchOutcome::Unique(id) => {
                        if let Some(modifier) = modifiers.get(id) {
                            tracing::debug!(
                                modifier = modifier.name(),
                                invocation = invocation.as_str(),
                                "Activating modifier"
                            );
                            window.activate(id, modifier, invocation);
                        }
                    }
                    MatchOutcome::Unmatched => {
                        tracing::debug!(invocation = invocation.as_str(), "No modifier matched");
                        out.push_str(&fallback_text(invocation));
                    }
                    MatchOutcome::Ambiguous(ids) => {
                        let names = modifiers.names(&ids).join(", ");
                        tracing::warn!(
                            invocation = invocation.as_str(),
                            modifiers = %names,
                            "More than one modifier matched"
                        );
                        warnings.push(format!(
                            "More than one modifier matched \"[{invocation}]\" ({names})"
                        ));
                        out.push_str(&fallback_text(invocation));
                    }
                },
            }
        }

        let dropped = window.discard();
        if dropped > 0 {
            tracing::debug!(count = dropped, "Dropping modifiers with no following text");
        }

        Ok((out, warnings))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::document::VarDirective;
    use crate::inserts::VarInserts;
    use crate::links::PassageLinks;
    use crate::modifier::PatternModifier;
    use crate::modifier::builtin::builtin_registry;
    use crate::vars::MemoryStore;

    type CallLog = Rc<RefCell<Vec<String>>>;

    fn text(content: &str) -> Block {
        Block::Text(content.to_owned())
    }

    fn invoke(content: &str) -> Block {
        Block::Modifier(content.to_owned())
    }

    /// Modifier that records each call and the state counter it saw.
    fn recorder(name: &'static str, pattern: &str, log: &CallLog) -> PatternModifier {
        let log = Rc::clone(log);
        PatternModifier::new(name, pattern, move |output, ctx| {
            let n = ctx.state.get("n").and_then(Value::as_u64).unwrap_or(0) + 1;
            ctx.state.insert("n".to_owned(), json!(n));
            log.borrow_mut()
                .push(format!("{name}:{}:{n}:{}", ctx.invocation, output.text));
            output.text.push_str(&format!(" +{name}"));
            Ok(())
        })
        .unwrap()
    }

    fn render(doc: &ParsedDocument, modifiers: &ModifierRegistry) -> RenderResult {
        TemplateRenderer::new()
            .render(doc, &(), modifiers, &mut MemoryStore::new(), false)
            .unwrap()
    }

    #[test]
    fn test_empty_blocks() {
        let result = render(&ParsedDocument::default(), &ModifierRegistry::new());
        assert_eq!(result.markdown, "");
        assert_eq!(result.html, "");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_text_blocks_are_separated() {
        let doc = ParsedDocument::new(vec![], vec![text("One"), text("Two")]);
        let result = render(&doc, &ModifierRegistry::new());
        assert_eq!(result.markdown, "\n\nOne\n\nTwo");
        assert_eq!(result.html, "<p>One</p><p>Two</p>");
    }

    #[test]
    fn test_unmatched_invocation_falls_back() {
        let doc = ParsedDocument::new(vec![], vec![text("Before"), invoke("mystery"), text("After")]);
        let result = render(&doc, &ModifierRegistry::new());

        assert_eq!(result.markdown, "\n\nBefore\n\n[mystery]\n\n\n\nAfter");
        assert!(result.html.contains("<p>[mystery]</p>"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_ambiguous_invocation_falls_back_with_warning() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new()
            .with_modifier(recorder("first", "^sh", &log))
            .with_modifier(recorder("second", "out$", &log));
        let doc = ParsedDocument::new(vec![], vec![invoke("shout"), text("Hi")]);

        let result = render(&doc, &modifiers);

        assert_eq!(result.markdown, "\n\n[shout]\n\n\n\nHi");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("first, second"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_unique_match_gets_exact_invocation() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new().with_modifier(recorder("tag", "(?i)^tag", &log));
        let doc = ParsedDocument::new(vec![], vec![invoke("TAG it"), text("Body")]);

        let result = render(&doc, &modifiers);

        assert_eq!(*log.borrow(), vec!["tag:TAG it:1:Body"]);
        assert_eq!(result.markdown, "\n\nBody +tag");
    }

    #[test]
    fn test_stacked_modifiers_run_in_invocation_order() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new()
            .with_modifier(recorder("a", "^a$", &log))
            .with_modifier(recorder("b", "^b$", &log));
        let doc = ParsedDocument::new(vec![], vec![invoke("b"), invoke("a"), text("Body")]);

        let result = render(&doc, &modifiers);

        assert_eq!(*log.borrow(), vec!["b:b:1:Body", "a:a:1:Body +b"]);
        assert_eq!(result.markdown, "\n\nBody +b +a");
    }

    #[test]
    fn test_modifiers_reset_after_text_block() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new().with_modifier(recorder("a", "^a$", &log));
        let doc = ParsedDocument::new(vec![], vec![invoke("a"), text("One"), text("Two")]);

        let result = render(&doc, &modifiers);

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(result.markdown, "\n\nOne +a\n\nTwo");
    }

    #[test]
    fn test_state_persists_across_activations() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new().with_modifier(recorder("a", "^a", &log));
        let doc = ParsedDocument::new(
            vec![],
            vec![
                invoke("a"),
                text("One"),
                invoke("a again"),
                invoke("a"),
                text("Two"),
            ],
        );

        render(&doc, &modifiers);

        assert_eq!(
            *log.borrow(),
            vec!["a:a:1:One", "a:a again:2:Two", "a:a:3:Two +a"]
        );
    }

    #[test]
    fn test_state_is_fresh_per_render() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new().with_modifier(recorder("a", "^a$", &log));
        let doc = ParsedDocument::new(vec![], vec![invoke("a"), text("x")]);

        render(&doc, &modifiers);
        render(&doc, &modifiers);

        assert_eq!(*log.borrow(), vec!["a:a:1:x", "a:a:1:x"]);
    }

    #[test]
    fn test_trailing_modifiers_never_fire() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new().with_modifier(recorder("a", "^a$", &log));
        let doc = ParsedDocument::new(vec![], vec![text("Only"), invoke("a")]);

        let result = render(&doc, &modifiers);

        assert!(log.borrow().is_empty());
        assert_eq!(result.markdown, "\n\nOnly");
    }

    #[test]
    fn test_fallback_bypasses_armed_modifiers() {
        let log = CallLog::default();
        let modifiers = ModifierRegistry::new().with_modifier(recorder("a", "^a$", &log));
        let doc = ParsedDocument::new(vec![], vec![invoke("a"), invoke("zzz"), text("Body")]);

        let result = render(&doc, &modifiers);

        assert_eq!(*log.borrow(), vec!["a:a:1:Body"]);
        assert_eq!(result.markdown, "\n\n[zzz]\n\n\n\nBody +a");
    }

    #[test]
    fn test_links_run_before_inserts() {
        let mut inserts = Map::new();
        inserts.insert("place".to_owned(), json!("[[Cave]]"));
        let doc = ParsedDocument::new(vec![], vec![text("Go to {place} or [[Hall]].")]);

        let result = TemplateRenderer::new()
            .with_links(PassageLinks)
            .with_inserts(VarInserts)
            .render(&doc, &inserts, &ModifierRegistry::new(), &mut MemoryStore::new(), false)
            .unwrap();

        // The inserted link is not rendered: link substitution already ran.
        assert_eq!(
            result.markdown,
            "\n\nGo to [[Cave]] or <a href=\"javascript:void(0)\" data-folio-go=\"Hall\">Hall</a>."
        );
    }

    #[test]
    fn test_vars_written_before_blocks() {
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        let reader = Rc::clone(&store);
        let modifiers = builtin_registry(
            move |name| reader.borrow().get(name).cloned(),
            &[],
        );
        let doc = ParsedDocument::new(
            vec![VarDirective::constant("lit", json!(true))],
            vec![invoke("if lit"), text("Bright"), invoke("else"), text("Dark")],
        );

        let result = TemplateRenderer::new()
            .render(&doc, &(), &modifiers, &mut Rc::clone(&store), false)
            .unwrap();

        assert_eq!(result.html, "<p>Bright</p>");
        assert_eq!(store.borrow().writes().len(), 1);
    }

    #[test]
    fn test_suppress_vars_is_idempotent() {
        let doc = ParsedDocument::new(
            vec![VarDirective::constant("count", json!(1))],
            vec![text("\"Quoted\" -- text"), invoke("note"), text("hidden")],
        );
        let modifiers = builtin_registry(|_| None, &[]);
        let renderer = TemplateRenderer::new();
        let mut store = MemoryStore::new();

        let first = renderer.render(&doc, &(), &modifiers, &mut store, true).unwrap();
        let second = renderer.render(&doc, &(), &modifiers, &mut store, true).unwrap();

        assert_eq!(first.html, second.html);
        assert_eq!(first.html, "<p>\u{201c}Quoted\u{201d} \u{2013} text</p>");
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_value_error_aborts_render() {
        let doc = ParsedDocument::new(
            vec![
                VarDirective::constant("first", json!(1)),
                VarDirective::new("broken", || Err("no value".into())),
            ],
            vec![text("never rendered")],
        );
        let mut store = MemoryStore::new();

        let err = TemplateRenderer::new()
            .render(&doc, &(), &ModifierRegistry::new(), &mut store, false)
            .unwrap_err();

        assert!(matches!(err, RenderError::Value { ref name, .. } if name == "broken"));
        assert_eq!(store.get("first"), Some(&json!(1)));
    }

    #[test]
    fn test_modifier_error_aborts_render() {
        let modifiers = ModifierRegistry::new().with_modifier(
            PatternModifier::new("boom", "^boom$", |_, _| Err("exploded".into())).unwrap(),
        );
        let doc = ParsedDocument::new(vec![], vec![invoke("boom"), text("x")]);

        let err = TemplateRenderer::new()
            .render(&doc, &(), &modifiers, &mut MemoryStore::new(), false)
            .unwrap_err();

        assert_eq!(err.to_string(), "Modifier \"boom\" failed: exploded");
    }

    #[test]
    fn test_markdown_options_apply() {
        let doc = ParsedDocument::new(vec![], vec![text("\"a\"\nb")]);
        let options = MarkdownOptions {
            smart_punctuation: false,
            gfm: true,
            line_breaks: false,
        };

        let result = TemplateRenderer::new()
            .with_markdown_options(options)
            .render(&doc, &(), &ModifierRegistry::new(), &mut MemoryStore::new(), false)
            .unwrap();

        assert_eq!(result.html, "<p>&quot;a&quot;\nb</p>");
    }

    #[test]
    fn test_builtin_align_and_append() {
        let modifiers = builtin_registry(|_| None, &[]);
        let doc = ParsedDocument::new(
            vec![],
            vec![
                text("Start"),
                invoke("append"),
                text("joined"),
                invoke("align center"),
                text("Middle"),
            ],
        );

        let result = render(&doc, &modifiers);

        assert_eq!(
            result.markdown,
            "\n\nStart joined\n\n<div style=\"text-align: center\">\n\nMiddle\n\n</div>"
        );
    }
}
