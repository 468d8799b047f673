//! Render error types.

/// Boxed error returned by caller-supplied callbacks (variable values,
/// conditions, modifier handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal render error.
///
/// Any of these aborts the render with no HTML produced. Variable writes made
/// before the failure are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The document is missing its `vars` or `blocks` field.
    #[error("The renderer was given a document with no {0} field")]
    MissingField(&'static str),
    /// A block has a type other than `text` or `modifier`.
    #[error("Don't know how to render a block with type \"{0}\"")]
    UnknownBlockType(String),
    /// Evaluating a variable's condition failed.
    #[error("Failed to evaluate condition for variable \"{name}\": {source}")]
    Condition {
        /// Variable name.
        name: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
    /// Computing a variable's value failed.
    #[error("Failed to compute value for variable \"{name}\": {source}")]
    Value {
        /// Variable name.
        name: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
    /// A modifier's handler failed while processing a text block.
    #[error("Modifier \"{name}\" failed: {source}")]
    Modifier {
        /// Modifier name.
        name: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
}
