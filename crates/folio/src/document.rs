//! JSON document, state and inserts files.
//!
//! A document file is the parser's output:
//!
//! ```json
//! {
//!   "vars": [{"name": "gold", "value": 10, "condition": "not visited"}],
//!   "blocks": [{"type": "text", "content": "You have {gold} gold."}]
//! }
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use folio_render::{
    Condition, InsertRenderer, MemoryStore, ParsedDocument, RawBlock, VarDirective, VarInserts,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CliError;

/// Variable store shared by the dispatcher, conditions and inserts.
pub(crate) type SharedStore = Rc<RefCell<MemoryStore>>;

#[derive(Deserialize)]
struct DocumentFile {
    vars: Option<Vec<VarSpec>>,
    blocks: Option<Vec<RawBlock>>,
}

#[derive(Deserialize)]
struct VarSpec {
    name: String,
    #[serde(default)]
    value: Value,
    condition: Option<String>,
}

/// Parse a document, compiling variable conditions against `store`.
///
/// Conditions are evaluated when the directive is dispatched, so a condition
/// sees the writes made by earlier directives in the same document.
pub(crate) fn parse_document(json: &str, store: &SharedStore) -> Result<ParsedDocument, CliError> {
    let file: DocumentFile = serde_json::from_str(json)?;

    let blocks = file
        .blocks
        .map(ParsedDocument::blocks_from_raw)
        .transpose()?;
    let vars = file
        .vars
        .map(|specs| {
            specs
                .into_iter()
                .map(|spec| compile_var(spec, store))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(ParsedDocument::from_parts(vars, blocks)?)
}

fn compile_var(spec: VarSpec, store: &SharedStore) -> Result<VarDirective, CliError> {
    let VarSpec {
        name,
        value,
        condition,
    } = spec;

    let Some(source) = condition else {
        return Ok(VarDirective::constant(name, value));
    };

    let condition = Condition::parse(&source).map_err(|source| CliError::Condition {
        name: name.clone(),
        source,
    })?;
    let store = Rc::clone(store);

    Ok(VarDirective::constant(name, value).when(move || {
        let store = store.borrow();
        Ok(condition.evaluate(&|var: &str| store.get(var).cloned()))
    }))
}

/// Read a JSON object from a file.
pub(crate) fn read_object(path: &Path) -> Result<Map<String, Value>, CliError> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::Validation(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

/// Write the store's current values to a file as a JSON object.
pub(crate) fn write_state(path: &Path, store: &MemoryStore) -> Result<(), CliError> {
    let state: Map<String, Value> = store
        .values()
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let json = serde_json::to_string_pretty(&Value::Object(state))?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}

/// Inserts backed by the variable store, with explicit inserts taking priority.
pub(crate) struct StoreInserts {
    store: SharedStore,
}

impl StoreInserts {
    pub(crate) fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl InsertRenderer for StoreInserts {
    type Inserts = Map<String, Value>;

    fn render_inserts(&self, text: &str, inserts: &Self::Inserts) -> String {
        let store = self.store.borrow();
        VarInserts::substitute(text, |name| {
            inserts.get(name).or_else(|| store.get(name)).cloned()
        })
    }
}
