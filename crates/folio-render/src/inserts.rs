//! Insert substitution.
//!
//! Runs on each text block after link substitution.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Substitutes inserts (`{name}` and friends) in a text block.
///
/// The shape of the inserts value is up to the implementation; the renderer
/// passes it through untouched.
pub trait InsertRenderer {
    /// Data consulted while substituting.
    type Inserts: ?Sized;

    /// Return `text` with inserts substituted.
    fn render_inserts(&self, text: &str, inserts: &Self::Inserts) -> String;
}

/// Leaves text unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInserts;

impl InsertRenderer for NoInserts {
    type Inserts = ();

    fn render_inserts(&self, text: &str, _inserts: &()) -> String {
        text.to_owned()
    }
}

static INSERT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*([A-Za-z_$][\w$]*(?:\.[\w$]+)*)\s*\}").unwrap());

/// Replaces `{name}` and `{name.field}` with values from a JSON object.
///
/// Strings are inserted as-is, `null` as nothing, and other values as JSON
/// text. Names that are not present are left verbatim.
///
/// # Example
///
/// ```
/// use folio_render::{InsertRenderer, VarInserts};
/// use serde_json::{Map, json};
///
/// let mut vars = Map::new();
/// vars.insert("hero".to_owned(), json!({"name": "Ada"}));
///
/// let text = VarInserts.render_inserts("Hello, {hero.name}. {unknown}", &vars);
/// assert_eq!(text, "Hello, Ada. {unknown}");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct VarInserts;

impl VarInserts {
    /// Substitute inserts in `text`, resolving names with `resolve`.
    ///
    /// `resolve` is asked for the whole name first (`hero.name`), then for the
    /// root (`hero`), whose fields are walked for the rest of the path. Use it
    /// to read inserts from somewhere other than a single JSON object.
    ///
    /// ```
    /// use folio_render::VarInserts;
    /// use serde_json::json;
    ///
    /// let text = VarInserts::substitute("{hero.hp} hp", |name| {
    ///     (name == "hero").then(|| json!({"hp": 3}))
    /// });
    /// assert_eq!(text, "3 hp");
    /// ```
    pub fn substitute<F>(text: &str, resolve: F) -> String
    where
        F: Fn(&str) -> Option<Value>,
    {
        INSERT_RE
            .replace_all(text, |caps: &Captures<'_>| {
                Self::lookup(&caps[1], &resolve)
                    .map_or_else(|| caps[0].to_owned(), |value| Self::format(&value))
            })
            .into_owned()
    }

    fn lookup(path: &str, resolve: &dyn Fn(&str) -> Option<Value>) -> Option<Value> {
        if let Some(value) = resolve(path) {
            return Some(value);
        }
        let mut parts = path.split('.');
        let root = resolve(parts.next()?)?;
        parts.try_fold(root, |mut value, key| value.get_mut(key).map(Value::take))
    }

    fn format(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl InsertRenderer for VarInserts {
    type Inserts = Map<String, Value>;

    fn render_inserts(&self, text: &str, inserts: &Self::Inserts) -> String {
        Self::substitute(text, |name| inserts.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn vars() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("gold".to_owned(), json!(12));
        map.insert("name".to_owned(), json!("Ada"));
        map.insert("nothing".to_owned(), Value::Null);
        map.insert("flags".to_owned(), json!([true, false]));
        map.insert("player".to_owned(), json!({"stats": {"hp": 3}}));
        map
    }

    #[test]
    fn test_no_inserts_is_identity() {
        assert_eq!(NoInserts.render_inserts("{gold}", &()), "{gold}");
    }

    #[test]
    fn test_scalar_values() {
        let text = VarInserts.render_inserts("{name} has {gold} gold.", &vars());
        assert_eq!(text, "Ada has 12 gold.");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        assert_eq!(VarInserts.render_inserts("{ name }", &vars()), "Ada");
    }

    #[test]
    fn test_null_and_compound_values() {
        assert_eq!(VarInserts.render_inserts("[{nothing}]", &vars()), "[]");
        assert_eq!(VarInserts.render_inserts("{flags}", &vars()), "[true,false]");
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(VarInserts.render_inserts("{player.stats.hp}", &vars()), "3");
        assert_eq!(
            VarInserts.render_inserts("{player.stats.mp}", &vars()),
            "{player.stats.mp}"
        );
    }

    #[test]
    fn test_substitute_with_layered_lookup() {
        let base = vars();
        let mut overrides = Map::new();
        overrides.insert("player".to_owned(), json!({"stats": {"hp": 9}}));

        let text = VarInserts::substitute("{name}: {player.stats.hp}", |name| {
            overrides.get(name).or_else(|| base.get(name)).cloned()
        });

        assert_eq!(text, "Ada: 9");
    }

    #[test]
    fn test_unknown_and_non_identifier_left_alone() {
        let text = VarInserts.render_inserts("{missing} {1abc} {a b}", &vars());
        assert_eq!(text, "{missing} {1abc} {a b}");
    }
}
