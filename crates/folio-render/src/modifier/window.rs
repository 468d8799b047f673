//! Modifier activation window.
//!
//! Tracks which modifiers are armed between their invocation and the next text
//! block, plus each modifier's state for the current render.

use std::collections::HashMap;

use super::{Modifier, ModifierContext, ModifierId, StateSlot};
use crate::block::BlockOutput;
use crate::error::RenderError;

/// Per-render state slots, keyed by modifier identifier.
///
/// A slot is created empty on a modifier's first activation and reused for
/// every later activation in the same render.
#[derive(Debug, Default)]
pub struct ModifierStates {
    slots: HashMap<ModifierId, StateSlot>,
}

impl ModifierStates {
    /// Create an empty state map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `id`, created empty if this is its first use.
    pub fn slot_mut(&mut self, id: ModifierId) -> &mut StateSlot {
        self.slots.entry(id).or_default()
    }

    /// The slot for `id`, if it has been created.
    pub fn get(&self, id: ModifierId) -> Option<&StateSlot> {
        self.slots.get(&id)
    }

    /// Number of modifiers that have been activated at least once.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no modifier has been activated yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A modifier armed for the next text block.
#[derive(Clone, Copy)]
pub struct ActiveModifier<'a> {
    /// Registry identifier.
    pub id: ModifierId,
    /// The modifier definition.
    pub modifier: &'a dyn Modifier,
    /// The invocation text that activated it.
    pub invocation: &'a str,
}

/// Ordered list of armed modifiers plus their persisted state.
#[derive(Default)]
pub struct ActivationWindow<'a> {
    active: Vec<ActiveModifier<'a>>,
    states: ModifierStates,
}

impl<'a> ActivationWindow<'a> {
    /// Create an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a modifier for the next text block.
    ///
    /// Arming the same modifier twice adds a second entry that shares the first
    /// one's state slot.
    pub fn activate(&mut self, id: ModifierId, modifier: &'a dyn Modifier, invocation: &'a str) {
        self.states.slot_mut(id);
        self.active.push(ActiveModifier {
            id,
            modifier,
            invocation,
        });
    }

    /// Currently armed modifiers, in activation order.
    pub fn active(&self) -> &[ActiveModifier<'a>] {
        &self.active
    }

    /// Number of armed modifiers.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no modifier is armed.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Persisted state for this render.
    pub fn states(&self) -> &ModifierStates {
        &self.states
    }

    /// Run every armed modifier over `output` in activation order, then disarm
    /// them all. State slots are kept.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Modifier`] for the first handler that fails.
    pub fn apply(&mut self, output: &mut BlockOutput) -> Result<(), RenderError> {
        for entry in std::mem::take(&mut self.active) {
            let ctx = ModifierContext {
                state: self.states.slot_mut(entry.id),
                invocation: entry.invocation,
            };
            entry
                .modifier
                .process(output, ctx)
                .map_err(|source| RenderError::Modifier {
                    name: entry.modifier.name().to_owned(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Drop armed modifiers without running them. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.active.len();
        self.active.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::modifier::PatternModifier;

    fn counter() -> PatternModifier {
        PatternModifier::new("count", "^count", |output, ctx| {
            let n = ctx.state.get("n").and_then(serde_json::Value::as_u64).unwrap_or(0) + 1;
            ctx.state.insert("n".to_owned(), json!(n));
            output.text.push_str(&format!(" {}#{n}", ctx.invocation));
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn test_activation_creates_empty_state() {
        let modifier = counter();
        let mut window = ActivationWindow::new();
        let id = ModifierId(0);

        window.activate(id, &modifier, "count");

        assert_eq!(window.len(), 1);
        assert_eq!(window.states().get(id), Some(&StateSlot::new()));
    }

    #[test]
    fn test_apply_runs_in_order_and_clears() {
        let first = PatternModifier::new("a", "a", |output, _| {
            output.text.push('A');
            Ok(())
        })
        .unwrap();
        let second = PatternModifier::new("b", "b", |output, _| {
            output.text.push('B');
            Ok(())
        })
        .unwrap();

        let mut window = ActivationWindow::new();
        window.activate(ModifierId(0), &first, "a");
        window.activate(ModifierId(1), &second, "b");

        let mut output = BlockOutput::new("x");
        window.apply(&mut output).unwrap();

        assert_eq!(output.text, "xAB");
        assert!(window.is_empty());
        assert_eq!(window.states().len(), 2);
    }

    #[test]
    fn test_reactivation_shares_state() {
        let modifier = counter();
        let id = ModifierId(0);
        let mut window = ActivationWindow::new();

        window.activate(id, &modifier, "count one");
        window.activate(id, &modifier, "count two");
        let mut output = BlockOutput::new("t");
        window.apply(&mut output).unwrap();

        window.activate(id, &modifier, "count three");
        window.apply(&mut output).unwrap();

        assert_eq!(output.text, "t count one#1 count two#2 count three#3");
        assert_eq!(window.states().get(id).and_then(|s| s.get("n")), Some(&json!(3)));
    }

    #[test]
    fn test_apply_error_names_modifier() {
        let failing = PatternModifier::new("broken", ".*", |_, _| Err("nope".into())).unwrap();
        let mut window = ActivationWindow::new();
        window.activate(ModifierId(0), &failing, "broken");

        let err = window.apply(&mut BlockOutput::new("x")).unwrap_err();

        assert!(matches!(err, RenderError::Modifier { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_discard_drops_without_running() {
        let modifier = counter();
        let mut window = ActivationWindow::new();
        window.activate(ModifierId(0), &modifier, "count");

        assert_eq!(window.discard(), 1);
        assert!(window.is_empty());
        assert_eq!(window.states().get(ModifierId(0)), Some(&StateSlot::new()));
    }
}
