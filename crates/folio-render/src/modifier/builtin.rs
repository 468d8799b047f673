//! Built-in modifiers.
//!
//! | Name | Invocation | Effect |
//! |------|------------|--------|
//! | `align` | `align center`, `align left`, `align right` | Wraps the block in an aligned `<div>` |
//! | `append` | `append` | Joins the block to the previous paragraph with a space |
//! | `continue` | `continue`, `cont'd`, `cont.` | Joins the block to the previous paragraph directly |
//! | `note` | `note`, `note to self`, `note to myself`, `n.b.`, `fixme`, `todo` | Hides the block |
//! | `conditional` | `if <expr>`, `unless <expr>`, `else` | Shows the block depending on variable state |
//! | `css` | `css` | Turns the block into a `<style>` element |

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{Modifier, ModifierContext, ModifierRegistry};
use crate::block::BlockOutput;
use crate::condition::Condition;
use crate::error::BoxError;

/// Names and invocation syntax of every built-in modifier, in registration order.
pub const BUILTINS: &[(&str, &str)] = &[
    ("align", "align center|left|right"),
    ("append", "append"),
    ("continue", "continue | cont'd | cont."),
    ("note", "note | note to self | note to myself | n.b. | fixme | todo"),
    ("conditional", "if <expr> | unless <expr> | else"),
    ("css", "css"),
];

/// Variable lookup used by [`ConditionalModifier`].
pub type LookupFn = dyn Fn(&str) -> Option<Value>;

static ALIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^align\s+(center|left|right)$").unwrap());
static APPEND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^append$").unwrap());
static CONTINUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:continue|cont'd|cont\.)$").unwrap());
static NOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:note|note to (?:self|myself)|n\.b\.|fixme|todo)$").unwrap()
});
static CONDITIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:(if|unless)\s+(.+)|else)$").unwrap());
static CSS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^css$").unwrap());

/// State key holding the outcome of the last `if`/`unless`.
const LAST_CONDITION: &str = "lastCondition";

/// Hide a block entirely, separator included.
fn hide(output: &mut BlockOutput) {
    output.before_text.clear();
    output.text.clear();
    output.after_text.clear();
}

/// `[align center]`: wraps the block in a `<div>` with the given alignment.
#[derive(Debug, Default)]
pub struct AlignModifier;

impl Modifier for AlignModifier {
    fn name(&self) -> &'static str {
        "align"
    }

    fn matches(&self, invocation: &str) -> bool {
        ALIGN_RE.is_match(invocation.trim())
    }

    fn process(&self, output: &mut BlockOutput, ctx: ModifierContext<'_>) -> Result<(), BoxError> {
        let direction = ALIGN_RE
            .captures(ctx.invocation.trim())
            .and_then(|caps| caps.get(1))
            .map_or("center", |m| m.as_str())
            .to_ascii_lowercase();

        output
            .before_text
            .push_str(&format!(r#"<div style="text-align: {direction}">"#));
        output.before_text.push_str("\n\n");
        output.after_text.push_str("\n\n</div>");
        Ok(())
    }
}

/// `[append]`: continues the previous paragraph after a space.
#[derive(Debug, Default)]
pub struct AppendModifier;

impl Modifier for AppendModifier {
    fn name(&self) -> &'static str {
        "append"
    }

    fn matches(&self, invocation: &str) -> bool {
        APPEND_RE.is_match(invocation.trim())
    }

    fn process(&self, output: &mut BlockOutput, _ctx: ModifierContext<'_>) -> Result<(), BoxError> {
        " ".clone_into(&mut output.before_text);
        Ok(())
    }
}

/// `[continue]`: continues the previous paragraph with no separator.
#[derive(Debug, Default)]
pub struct ContinueModifier;

impl Modifier for ContinueModifier {
    fn name(&self) -> &'static str {
        "continue"
    }

    fn matches(&self, invocation: &str) -> bool {
        CONTINUE_RE.is_match(invocation.trim())
    }

    fn process(&self, output: &mut BlockOutput, _ctx: ModifierContext<'_>) -> Result<(), BoxError> {
        output.before_text.clear();
        Ok(())
    }
}

/// `[note]`: an author's note, removed from the output.
#[derive(Debug, Default)]
pub struct NoteModifier;

impl Modifier for NoteModifier {
    fn name(&self) -> &'static str {
        "note"
    }

    fn matches(&self, invocation: &str) -> bool {
        NOTE_RE.is_match(invocation.trim())
    }

    fn process(&self, output: &mut BlockOutput, _ctx: ModifierContext<'_>) -> Result<(), BoxError> {
        hide(output);
        Ok(())
    }
}

/// `[if expr]`, `[unless expr]` and `[else]`.
///
/// All three share one state slot, so `[else]` sees the outcome of the most
/// recent `[if]` or `[unless]` in the same render. An `[else]` with no earlier
/// condition hides its block.
pub struct ConditionalModifier {
    lookup: Box<LookupFn>,
}

impl ConditionalModifier {
    /// Create a conditional modifier that resolves variables with `lookup`.
    pub fn new<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn should_show(&self, ctx: &mut ModifierContext<'_>) -> Result<bool, BoxError> {
        let invocation = ctx.invocation;
        let caps = CONDITIONAL_RE
            .captures(invocation.trim())
            .ok_or_else(|| format!("not a conditional: [{invocation}]"))?;

        let Some(keyword) = caps.get(1) else {
            // [else]
            return Ok(ctx
                .state
                .get(LAST_CONDITION)
                .and_then(Value::as_bool)
                .is_some_and(|last| !last));
        };

        let expr = caps.get(2).map_or("", |m| m.as_str());
        let condition = Condition::parse(expr)?;
        let mut result = condition.evaluate(self.lookup.as_ref());
        if keyword.as_str().eq_ignore_ascii_case("unless") {
            result = !result;
        }

        ctx.state
            .insert(LAST_CONDITION.to_owned(), Value::Bool(result));
        Ok(result)
    }
}

impl Modifier for ConditionalModifier {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn matches(&self, invocation: &str) -> bool {
        CONDITIONAL_RE.is_match(invocation.trim())
    }

    fn process(
        &self,
        output: &mut BlockOutput,
        mut ctx: ModifierContext<'_>,
    ) -> Result<(), BoxError> {
        if !self.should_show(&mut ctx)? {
            hide(output);
        }
        Ok(())
    }
}

/// `[css]`: the block body becomes a `<style>` element.
#[derive(Debug, Default)]
pub struct CssModifier;

impl Modifier for CssModifier {
    fn name(&self) -> &'static str {
        "css"
    }

    fn matches(&self, invocation: &str) -> bool {
        CSS_RE.is_match(invocation.trim())
    }

    fn process(&self, output: &mut BlockOutput, _ctx: ModifierContext<'_>) -> Result<(), BoxError> {
        output.text = format!("<style>\n{}\n</style>", output.text.trim());
        Ok(())
    }
}

/// Registry holding every built-in modifier except those named in `disabled`.
///
/// `lookup` resolves variable names for `[if]` and `[unless]`.
pub fn builtin_registry<F>(lookup: F, disabled: &[&str]) -> ModifierRegistry
where
    F: Fn(&str) -> Option<Value> + 'static,
{
    let enabled = |name: &str| !disabled.iter().any(|d| d.eq_ignore_ascii_case(name));
    let mut registry = ModifierRegistry::new();

    if enabled("align") {
        registry.register(AlignModifier);
    }
    if enabled("append") {
        registry.register(AppendModifier);
    }
    if enabled("continue") {
        registry.register(ContinueModifier);
    }
    if enabled("note") {
        registry.register(NoteModifier);
    }
    if enabled("conditional") {
        registry.register(ConditionalModifier::new(lookup));
    }
    if enabled("css") {
        registry.register(CssModifier);
    }

    registry
}

/// Whether `name` is a built-in modifier.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
}
