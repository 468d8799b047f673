//! Variable store and dispatcher.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::document::VarDirective;
use crate::error::RenderError;

/// Write access to the story's variable state.
///
/// The store's lifecycle is owned by the caller. The renderer only writes to it
/// while dispatching variable directives.
pub trait VarStore {
    /// Set `name` to `value`.
    fn set(&mut self, name: &str, value: Value);
}

impl<S: VarStore + ?Sized> VarStore for &mut S {
    fn set(&mut self, name: &str, value: Value) {
        (**self).set(name, value);
    }
}

impl<S: VarStore + ?Sized> VarStore for Rc<RefCell<S>> {
    fn set(&mut self, name: &str, value: Value) {
        self.borrow_mut().set(name, value);
    }
}

/// In-memory variable store that keeps an ordered log of every write.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
    writes: Vec<(String, Value)>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with values. Seeding is not logged as writes.
    #[must_use]
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            writes: Vec::new(),
        }
    }

    /// Current value of a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All current values.
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Every write, in the order it happened.
    pub fn writes(&self) -> &[(String, Value)] {
        &self.writes
    }
}

impl VarStore for MemoryStore {
    fn set(&mut self, name: &str, value: Value) {
        self.writes.push((name.to_owned(), value.clone()));
        self.values.insert(name.to_owned(), value);
    }
}

/// Apply variable directives to the store, in declaration order.
///
/// Conditional directives write only when their condition is true, and their
/// value is never computed otherwise. When `suppress` is set nothing is
/// evaluated or written.
///
/// # Errors
///
/// Returns the first condition or value failure. Writes made before it stay.
pub fn dispatch_vars(
    vars: &[VarDirective],
    store: &mut dyn VarStore,
    suppress: bool,
) -> Result<(), RenderError> {
    if suppress {
        tracing::debug!(count = vars.len(), "Variable dispatch suppressed");
        return Ok(());
    }

    tracing::debug!(count = vars.len(), "Setting vars");

    for var in vars {
        let name = var.name();

        if let Some(condition) = var.evaluate_condition() {
            let fires = condition.map_err(|source| RenderError::Condition {
                name: name.to_owned(),
                source,
            })?;

            if !fires {
                tracing::debug!(name, "Not setting var (condition is currently false)");
                continue;
            }
            tracing::debug!(name, "Setting var (condition is currently true)");
        } else {
            tracing::debug!(name, "Setting var");
        }

        let value = var.compute_value().map_err(|source| RenderError::Value {
            name: name.to_owned(),
            source,
        })?;
        store.set(name, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unconditional_writes_once() {
        let mut store = MemoryStore::new();
        let vars = vec![VarDirective::constant("gold", json!(10))];

        dispatch_vars(&vars, &mut store, false).unwrap();

        assert_eq!(store.writes(), &[("gold".to_owned(), json!(10))]);
    }

    #[test]
    fn test_suppressed_writes_nothing() {
        let mut store = MemoryStore::new();
        let vars = vec![
            VarDirective::constant("gold", json!(10)),
            VarDirective::constant("mood", json!("happy")).when(|| Ok(true)),
        ];

        dispatch_vars(&vars, &mut store, true).unwrap();

        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_suppressed_evaluates_nothing() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let vars = vec![VarDirective::new("x", || Ok(json!(1))).when(move || {
            counter.set(counter.get() + 1);
            Ok(true)
        })];

        dispatch_vars(&vars, &mut MemoryStore::new(), true).unwrap();

        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_false_condition_skips_value() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let vars = vec![
            VarDirective::new("x", move || {
                counter.set(counter.get() + 1);
                Ok(json!(1))
            })
            .when(|| Ok(false)),
        ];
        let mut store = MemoryStore::new();

        dispatch_vars(&vars, &mut store, false).unwrap();

        assert_eq!(calls.get(), 0);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_true_condition_writes() {
        let mut store = MemoryStore::new();
        let vars = vec![VarDirective::constant("x", json!(true)).when(|| Ok(true))];

        dispatch_vars(&vars, &mut store, false).unwrap();

        assert_eq!(store.get("x"), Some(&json!(true)));
    }

    #[test]
    fn test_writes_in_declaration_order() {
        let mut store = MemoryStore::new();
        let vars = vec![
            VarDirective::constant("b", json!(2)),
            VarDirective::constant("a", json!(1)),
            VarDirective::constant("b", json!(3)),
        ];

        dispatch_vars(&vars, &mut store, false).unwrap();

        assert_eq!(
            store.writes(),
            &[
                ("b".to_owned(), json!(2)),
                ("a".to_owned(), json!(1)),
                ("b".to_owned(), json!(3)),
            ]
        );
        assert_eq!(store.get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_later_condition_sees_earlier_write() {
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        let reader = Rc::clone(&store);
        let vars = vec![
            VarDirective::constant("door_open", json!(true)),
            VarDirective::constant("draft", json!(true)).when(move || {
                Ok(reader.borrow().get("door_open") == Some(&json!(true)))
            }),
        ];

        let mut handle = Rc::clone(&store);
        dispatch_vars(&vars, &mut handle, false).unwrap();

        assert_eq!(store.borrow().get("draft"), Some(&json!(true)));
    }

    #[test]
    fn test_value_error_is_fatal_and_keeps_prior_writes() {
        let mut store = MemoryStore::new();
        let vars = vec![
            VarDirective::constant("first", json!(1)),
            VarDirective::new("broken", || Err("no such thing".into())),
            VarDirective::constant("never", json!(2)),
        ];

        let err = dispatch_vars(&vars, &mut store, false).unwrap_err();

        assert!(matches!(err, RenderError::Value { ref name, .. } if name == "broken"));
        assert_eq!(store.writes(), &[("first".to_owned(), json!(1))]);
    }

    #[test]
    fn test_condition_error_is_fatal() {
        let vars = vec![VarDirective::constant("x", json!(1)).when(|| Err("bad".into()))];

        let err = dispatch_vars(&vars, &mut MemoryStore::new(), false).unwrap_err();

        assert!(matches!(err, RenderError::Condition { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_with_values_is_not_logged() {
        let store = MemoryStore::with_values([("hp".to_owned(), json!(5))]);
        assert_eq!(store.get("hp"), Some(&json!(5)));
        assert!(store.writes().is_empty());
    }
}
