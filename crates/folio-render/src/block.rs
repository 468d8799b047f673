//! Per-block output record.

/// Separator placed before every text block (a paragraph break).
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Mutable output for one text block.
///
/// Modifiers may change the text itself or add content around it. Keeping the
/// three parts apart leaves the original text intact for later modifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockOutput {
    /// Emitted before the text. Defaults to [`BLOCK_SEPARATOR`].
    pub before_text: String,
    /// The block's Markdown text.
    pub text: String,
    /// Emitted after the text. Defaults to empty.
    pub after_text: String,
}

impl BlockOutput {
    /// Create an output record with the default separator and no trailing text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            before_text: BLOCK_SEPARATOR.to_owned(),
            text: text.into(),
            after_text: String::new(),
        }
    }

    /// Append `before_text + text + after_text` to `out`.
    pub fn write_to(&self, out: &mut String) {
        out.reserve(self.before_text.len() + self.text.len() + self.after_text.len());
        out.push_str(&self.before_text);
        out.push_str(&self.text);
        out.push_str(&self.after_text);
    }
}

/// Literal text emitted for a modifier invocation that matched no modifier,
/// or more than one.
pub(crate) fn fallback_text(invocation: &str) -> String {
    format!("{BLOCK_SEPARATOR}[{invocation}]{BLOCK_SEPARATOR}")
}
