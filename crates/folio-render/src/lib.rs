//! Single-pass story template renderer.
//!
//! This crate turns a pre-parsed document (variable directives plus a flat
//! sequence of text and modifier blocks) into HTML.
//!
//! # Architecture
//!
//! A render runs in three phases:
//! - **Variable dispatch**: each [`VarDirective`] writes to the caller's
//!   [`VarStore`] when its condition holds (skippable per render)
//! - **Block rendering**: modifier blocks are resolved against a
//!   [`ModifierRegistry`] and armed until the next text block, which they then
//!   rewrite through its [`BlockOutput`]
//! - **Final pass**: the accumulated Markdown is converted to HTML with
//!   pulldown-cmark and pluggable [`HtmlRules`]
//!
//! Link and insert substitution are pluggable through [`LinkRenderer`] and
//! [`InsertRenderer`].
//!
//! # Example
//!
//! ```
//! use folio_render::{
//!     Block, MemoryStore, ParsedDocument, PassageLinks, TemplateRenderer, builtin_registry,
//! };
//!
//! let doc = ParsedDocument::new(
//!     vec![],
//!     vec![
//!         Block::Text("You wake up.".to_owned()),
//!         Block::Modifier("append".to_owned()),
//!         Block::Text("Then you [[leave->Hall]].".to_owned()),
//!     ],
//! );
//!
//! let result = TemplateRenderer::new()
//!     .with_links(PassageLinks)
//!     .render(&doc, &(), &builtin_registry(|_| None, &[]), &mut MemoryStore::new(), false)
//!     .unwrap();
//!
//! assert_eq!(
//!     result.html,
//!     r#"<p>You wake up. Then you <a href="javascript:void(0)" data-folio-go="Hall">leave</a>.</p>"#
//! );
//! ```

mod block;
pub mod condition;
mod document;
pub mod error;
mod inserts;
mod links;
pub mod markdown;
pub mod modifier;
mod renderer;
mod util;
mod vars;

pub use block::{BLOCK_SEPARATOR, BlockOutput};
pub use condition::{Condition, ConditionError};
pub use document::{Block, ConditionFn, ParsedDocument, RawBlock, ValueFn, VarDirective};
pub use error::{BoxError, RenderError};
pub use inserts::{InsertRenderer, NoInserts, VarInserts};
pub use links::{LinkRenderer, NoLinks, PassageLinks};
pub use markdown::{HtmlRules, InlineKind, MarkdownConverter, MarkdownOptions, StoryHtml};
pub use modifier::builtin::{BUILTINS, builtin_registry, is_builtin};
pub use modifier::{
    ActivationWindow, MatchOutcome, Modifier, ModifierContext, ModifierId, ModifierRegistry,
    ModifierStates, PatternModifier, StateSlot,
};
pub use renderer::{RenderResult, TemplateRenderer};
pub use util::escape_html;
pub use vars::{MemoryStore, VarStore, dispatch_vars};
