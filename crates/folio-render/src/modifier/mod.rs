//! Pluggable modifiers.
//!
//! A modifier is invoked by a modifier block (for example `[align center]`) and
//! alters the next text block's output. Modifiers are resolved by pattern
//! rather than by name, so the registry is an ordered list of
//! `(predicate, handler)` pairs.
//!
//! # Activation
//!
//! Each modifier block is resolved against the [`ModifierRegistry`]:
//!
//! - exactly one match activates the modifier until the next text block;
//! - no match, or more than one, leaves the invocation in the output as literal
//!   text (`[invocation]`), with a warning for the ambiguous case.
//!
//! Several modifiers may be armed before one text block. They run in the order
//! they were invoked, each seeing the previous one's changes.
//!
//! # Example
//!
//! ```
//! use folio_render::{BlockOutput, Modifier, ModifierContext, ModifierRegistry, MatchOutcome};
//! use folio_render::error::BoxError;
//!
//! struct Shout;
//!
//! impl Modifier for Shout {
//!     fn name(&self) -> &str { "shout" }
//!
//!     fn matches(&self, invocation: &str) -> bool {
//!         invocation.eq_ignore_ascii_case("shout")
//!     }
//!
//!     fn process(&self, output: &mut BlockOutput, _ctx: ModifierContext<'_>) -> Result<(), BoxError> {
//!         output.text = output.text.to_uppercase();
//!         Ok(())
//!     }
//! }
//!
//! let registry = ModifierRegistry::new().with_modifier(Shout);
//! assert!(matches!(registry.resolve("SHOUT"), MatchOutcome::Unique(_)));
//! assert!(matches!(registry.resolve("whisper"), MatchOutcome::Unmatched));
//! ```

pub mod builtin;
mod window;

use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};

use crate::block::BlockOutput;
use crate::error::BoxError;

pub use window::{ActivationWindow, ActiveModifier, ModifierStates};

/// Opaque per-modifier state, persisted across activations within one render.
pub type StateSlot = Map<String, Value>;

/// Stable identifier of a modifier: its position in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierId(usize);

impl ModifierId {
    /// Registry index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Context passed to [`Modifier::process`].
pub struct ModifierContext<'a> {
    /// This modifier's state for the current render.
    pub state: &'a mut StateSlot,
    /// The exact invocation text that activated this modifier.
    pub invocation: &'a str,
}

/// A pluggable handler that alters the text block following its invocation.
///
/// Handlers are shared across renders and take `&self`; anything that must
/// survive between activations belongs in [`ModifierContext::state`].
pub trait Modifier {
    /// Name used in logs and warnings.
    fn name(&self) -> &str;

    /// Whether this modifier handles the given invocation text.
    fn matches(&self, invocation: &str) -> bool;

    /// Alter the block output in place.
    ///
    /// An error aborts the whole render.
    fn process(&self, output: &mut BlockOutput, ctx: ModifierContext<'_>) -> Result<(), BoxError>;
}

/// Handler closure for [`PatternModifier`].
pub type ProcessFn = dyn Fn(&mut BlockOutput, ModifierContext<'_>) -> Result<(), BoxError>;

/// A modifier built from a regular expression and a closure.
///
/// # Example
///
/// ```
/// use folio_render::PatternModifier;
///
/// let hidden = PatternModifier::new("hidden", r"(?i)^hidden$", |output, _ctx| {
///     output.text.clear();
///     Ok(())
/// })
/// .unwrap();
/// ```
pub struct PatternModifier {
    name: String,
    pattern: Regex,
    handler: Box<ProcessFn>,
}

impl PatternModifier {
    /// Create a modifier from a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn new<F>(name: impl Into<String>, pattern: &str, handler: F) -> Result<Self, regex::Error>
    where
        F: Fn(&mut BlockOutput, ModifierContext<'_>) -> Result<(), BoxError> + 'static,
    {
        Ok(Self::from_regex(name, Regex::new(pattern)?, handler))
    }

    /// Create a modifier from a compiled regex.
    pub fn from_regex<F>(name: impl Into<String>, pattern: Regex, handler: F) -> Self
    where
        F: Fn(&mut BlockOutput, ModifierContext<'_>) -> Result<(), BoxError> + 'static,
    {
        Self {
            name: name.into(),
            pattern,
            handler: Box::new(handler),
        }
    }

    /// The match pattern.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Modifier for PatternModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, invocation: &str) -> bool {
        self.pattern.is_match(invocation)
    }

    fn process(&self, output: &mut BlockOutput, ctx: ModifierContext<'_>) -> Result<(), BoxError> {
        (self.handler)(output, ctx)
    }
}

impl fmt::Debug for PatternModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternModifier")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of resolving an invocation against the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No modifier matched.
    Unmatched,
    /// Exactly one modifier matched.
    Unique(ModifierId),
    /// Several modifiers matched, in registration order.
    Ambiguous(Vec<ModifierId>),
}

/// Ordered collection of available modifiers.
#[derive(Default)]
pub struct ModifierRegistry {
    modifiers: Vec<Box<dyn Modifier>>,
}

impl ModifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier.
    #[must_use]
    pub fn with_modifier<M: Modifier + 'static>(mut self, modifier: M) -> Self {
        self.register(modifier);
        self
    }

    /// Register a modifier, returning its identifier.
    pub fn register<M: Modifier + 'static>(&mut self, modifier: M) -> ModifierId {
        self.register_boxed(Box::new(modifier))
    }

    /// Register an already boxed modifier.
    pub fn register_boxed(&mut self, modifier: Box<dyn Modifier>) -> ModifierId {
        self.modifiers.push(modifier);
        ModifierId(self.modifiers.len() - 1)
    }

    /// Look up a modifier by identifier.
    pub fn get(&self, id: ModifierId) -> Option<&dyn Modifier> {
        self.modifiers.get(id.0).map(|m| m.as_ref())
    }

    /// Number of registered modifiers.
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// Whether no modifiers are registered.
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Iterate over modifiers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ModifierId, &dyn Modifier)> + '_ {
        self.modifiers
            .iter()
            .enumerate()
            .map(|(idx, m)| (ModifierId(idx), m.as_ref()))
    }

    /// Names of the given modifiers, for diagnostics.
    pub fn names(&self, ids: &[ModifierId]) -> Vec<&str> {
        ids.iter()
            .filter_map(|id| self.get(*id))
            .map(Modifier::name)
            .collect()
    }

    /// Find every modifier whose predicate matches `invocation`.
    pub fn resolve(&self, invocation: &str) -> MatchOutcome {
        let mut matched: Vec<ModifierId> = self
            .iter()
            .filter(|(_, m)| m.matches(invocation))
            .map(|(id, _)| id)
            .collect();

        match matched.len() {
            0 => MatchOutcome::Unmatched,
            1 => MatchOutcome::Unique(matched.remove(0)),
            _ => MatchOutcome::Ambiguous(matched),
        }
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.modifiers.iter().map(|m| m.name()))
            .finish()
    }
}
