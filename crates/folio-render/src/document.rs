//! Parsed document model.
//!
//! A [`ParsedDocument`] is produced by an upstream parser: an ordered list of
//! variable directives plus an ordered list of blocks. The renderer only borrows it.

use std::fmt;

use serde_json::Value;

use crate::error::{BoxError, RenderError};

/// Lazily computed variable value.
pub type ValueFn = dyn Fn() -> Result<Value, BoxError>;

/// Condition guarding a variable assignment.
pub type ConditionFn = dyn Fn() -> Result<bool, BoxError>;

/// An instruction to write a named value to the variable store.
///
/// The value is only computed when the directive fires, so a directive whose
/// condition is false never invokes its value function.
///
/// # Example
///
/// ```
/// use folio_render::VarDirective;
/// use serde_json::json;
///
/// let always = VarDirective::constant("gold", json!(10));
/// let guarded = VarDirective::new("mood", || Ok(json!("cheerful"))).when(|| Ok(false));
///
/// assert!(!always.is_conditional());
/// assert!(guarded.is_conditional());
/// ```
pub struct VarDirective {
    name: String,
    value: Box<ValueFn>,
    condition: Option<Box<ConditionFn>>,
}

impl VarDirective {
    /// Create an unconditional directive with a lazily computed value.
    pub fn new<F>(name: impl Into<String>, value: F) -> Self
    where
        F: Fn() -> Result<Value, BoxError> + 'static,
    {
        Self {
            name: name.into(),
            value: Box::new(value),
            condition: None,
        }
    }

    /// Create an unconditional directive with a fixed value.
    pub fn constant(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, move || Ok(value.clone()))
    }

    /// Guard the assignment with a condition.
    #[must_use]
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn() -> Result<bool, BoxError> + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Variable name written to the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the directive carries a condition.
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// Evaluate the condition. Returns `None` for unconditional directives.
    pub(crate) fn evaluate_condition(&self) -> Option<Result<bool, BoxError>> {
        self.condition.as_ref().map(|condition| condition())
    }

    /// Compute the value.
    pub(crate) fn compute_value(&self) -> Result<Value, BoxError> {
        (self.value)()
    }
}

impl fmt::Debug for VarDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarDirective")
            .field("name", &self.name)
            .field("conditional", &self.is_conditional())
            .finish_non_exhaustive()
    }
}

/// One unit of a parsed document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Literal Markdown text.
    Text(String),
    /// Modifier invocation: the raw text between the modifier delimiters.
    Modifier(String),
}

impl Block {
    /// Build a block from its type tag.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownBlockType`] for any tag other than
    /// `text` or `modifier`.
    pub fn from_kind(kind: &str, content: impl Into<String>) -> Result<Self, RenderError> {
        match kind {
            "text" => Ok(Self::Text(content.into())),
            "modifier" => Ok(Self::Modifier(content.into())),
            other => Err(RenderError::UnknownBlockType(other.to_owned())),
        }
    }

    /// The block's type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Modifier(_) => "modifier",
        }
    }

    /// The block's raw content.
    pub fn content(&self) -> &str {
        match self {
            Self::Text(content) | Self::Modifier(content) => content,
        }
    }
}

/// Untyped block as it appears in serialized parser output.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RawBlock {
    /// Block type tag (`text` or `modifier`).
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// Block content.
    #[cfg_attr(feature = "serde", serde(default))]
    pub content: String,
}

impl TryFrom<RawBlock> for Block {
    type Error = RenderError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        Self::from_kind(&raw.kind, raw.content)
    }
}

/// A document ready to be rendered.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    /// Variable directives, in declaration order.
    pub vars: Vec<VarDirective>,
    /// Blocks, in document order.
    pub blocks: Vec<Block>,
}

impl ParsedDocument {
    /// Create a document from its parts.
    pub fn new(vars: Vec<VarDirective>, blocks: Vec<Block>) -> Self {
        Self { vars, blocks }
    }

    /// Create a document from parser output where either field may be absent.
    ///
    /// Both fields are required; an empty list is fine but a missing one is not.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingField`] naming the absent field.
    pub fn from_parts(
        vars: Option<Vec<VarDirective>>,
        blocks: Option<Vec<Block>>,
    ) -> Result<Self, RenderError> {
        let vars = vars.ok_or(RenderError::MissingField("vars"))?;
        let blocks = blocks.ok_or(RenderError::MissingField("blocks"))?;
        Ok(Self { vars, blocks })
    }

    /// Convert untyped blocks, failing on the first unknown type.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownBlockType`] for the first unrecognized block.
    pub fn blocks_from_raw(
        raw: impl IntoIterator<Item = RawBlock>,
    ) -> Result<Vec<Block>, RenderError> {
        raw.into_iter().map(Block::try_from).collect()
    }
}
