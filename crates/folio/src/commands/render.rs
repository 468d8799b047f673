//! `folio render` command implementation.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Args;
use folio_config::{CliSettings, Config};
use folio_render::{
    MarkdownOptions, MemoryStore, ModifierRegistry, PassageLinks, RenderResult, TemplateRenderer,
    builtin_registry,
};
use serde_json::{Map, Value};

use super::check_disabled_modifiers;
use crate::document::{SharedStore, StoreInserts, parse_document, read_object, write_state};
use crate::error::CliError;
use crate::output::{Output, write_document};

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Path to the parsed document (JSON).
    document: PathBuf,

    /// JSON object with insert values (takes priority over variable state).
    #[arg(short, long)]
    inserts: Option<PathBuf>,

    /// JSON file with variable state, read before and written after rendering.
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not apply variable directives.
    #[arg(long)]
    no_vars: bool,

    /// Keep straight quotes and dashes.
    #[arg(long)]
    no_smart_punctuation: bool,

    /// Print the intermediate Markdown instead of HTML.
    #[arg(long)]
    markdown: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading inputs or rendering fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            suppress_vars: self.no_vars.then_some(true),
            smart_punctuation: self.no_smart_punctuation.then_some(false),
            state_path: self.state.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        check_disabled_modifiers(&config)?;

        let state = match &config.state_path {
            Some(path) if path.exists() => {
                let state = read_object(path)?;
                tracing::info!(path = %path.display(), vars = state.len(), "Loaded state");
                state
            }
            _ => Map::new(),
        };
        let inserts = self
            .inserts
            .as_deref()
            .map(read_object)
            .transpose()?
            .unwrap_or_default();

        if self.verbose {
            output.info(&format!("Rendering {}...", self.document.display()));
        }
        let json = std::fs::read_to_string(&self.document)?;
        let (result, store) = render_document(&json, state, &inserts, &config)?;
        tracing::info!(
            document = %self.document.display(),
            writes = store.writes().len(),
            warnings = result.warnings.len(),
            "Rendered document"
        );

        for warning in &result.warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        write_document(if self.markdown {
            &result.markdown
        } else {
            &result.html
        })?;

        if let Some(path) = &config.state_path
            && !config.render.suppress_vars
        {
            write_state(path, &store)?;
            tracing::info!(path = %path.display(), vars = store.values().len(), "Saved state");
            output.success(&format!("Saved state to {}", path.display()));
        }

        Ok(())
    }
}

/// Render a JSON document against the given state and inserts.
///
/// Returns the render result and the variable store after rendering.
pub(crate) fn render_document(
    json: &str,
    state: Map<String, Value>,
    inserts: &Map<String, Value>,
    config: &Config,
) -> Result<(RenderResult, MemoryStore), CliError> {
    let store: SharedStore = Rc::new(RefCell::new(MemoryStore::with_values(state)));
    let doc = parse_document(json, &store)?;
    let modifiers = build_registry(config, &store);
    tracing::debug!(
        vars = doc.vars.len(),
        blocks = doc.blocks.len(),
        modifiers = modifiers.len(),
        "Parsed document"
    );

    let renderer = TemplateRenderer::new()
        .with_links(PassageLinks)
        .with_inserts(StoreInserts::new(Rc::clone(&store)))
        .with_markdown_options(MarkdownOptions {
            smart_punctuation: config.render.smart_punctuation,
            gfm: config.render.gfm,
            line_breaks: config.render.line_breaks,
        });

    let mut handle = Rc::clone(&store);
    let result = renderer.render(
        &doc,
        inserts,
        &modifiers,
        &mut handle,
        config.render.suppress_vars,
    )?;

    let final_state = store.borrow().clone();
    Ok((result, final_state))
}

/// Registry of enabled built-in modifiers, reading variables from `store`.
fn build_registry(config: &Config, store: &SharedStore) -> ModifierRegistry {
    if !config.modifiers.builtin {
        return ModifierRegistry::new();
    }

    let store = Rc::clone(store);
    builtin_registry(
        move |name| store.borrow().get(name).cloned(),
        &config.disabled_modifiers(),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const STORY: &str = r#"{
        "vars": [
            {"name": "visits", "value": 1, "condition": "visits == null"},
            {"name": "lamp", "value": "lit"}
        ],
        "blocks": [
            {"type": "text", "content": "You enter the \"cave\"..."},
            {"type": "modifier", "content": "if lamp == 'lit'"},
            {"type": "text", "content": "The {lamp} lamp shows a [[tunnel->Tunnel]]."},
            {"type": "modifier", "content": "else"},
            {"type": "text", "content": "It is dark."},
            {"type": "modifier", "content": "note"},
            {"type": "text", "content": "Remember to add a grue."}
        ]
    }"#;

    fn render(config: &Config, state: Map<String, Value>) -> (RenderResult, MemoryStore) {
        render_document(STORY, state, &Map::new(), config).unwrap()
    }

    #[test]
    fn test_render_story() {
        let (result, store) = render(&Config::default(), Map::new());

        assert_eq!(
            result.html,
            concat!(
                "<p>You enter the \u{201c}cave\u{201d}\u{2026}</p>",
                r#"<p>The lit lamp shows a <a href="javascript:void(0)" data-folio-go="Tunnel">tunnel</a>.</p>"#
            )
        );
        assert!(result.warnings.is_empty());
        assert_eq!(store.get("visits"), Some(&json!(1)));
        assert_eq!(store.get("lamp"), Some(&json!("lit")));
    }

    #[test]
    fn test_render_with_existing_state() {
        let mut state = Map::new();
        state.insert("visits".to_owned(), json!(4));

        let (_, store) = render(&Config::default(), state);

        assert_eq!(store.get("visits"), Some(&json!(4)));
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn test_render_with_suppressed_vars() {
        let mut config = Config::default();
        config.render.suppress_vars = true;

        let (result, store) = render(&config, Map::new());

        assert!(result.html.contains("It is dark."));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_render_without_builtins() {
        let mut config = Config::default();
        config.modifiers.builtin = false;

        let (result, _) = render(&config, Map::new());

        assert!(result.markdown.contains("\n\n[note]\n\n"));
        assert!(result.markdown.contains("[if lamp == 'lit']"));
    }

    #[test]
    fn test_render_with_disabled_builtin() {
        let mut config = Config::default();
        config.modifiers.disabled = vec!["note".to_owned()];

        let (result, _) = render(&config, Map::new());

        assert!(result.html.contains("grue"));
        assert!(result.html.contains("<p>[note]</p>"));
    }

    #[test]
    fn test_explicit_inserts_override_state() {
        let mut inserts = Map::new();
        inserts.insert("lamp".to_owned(), json!("flickering"));

        let (result, _) = render_document(STORY, Map::new(), &inserts, &Config::default()).unwrap();

        assert!(result.html.contains("The flickering lamp"));
    }

    #[test]
    fn test_render_error_surfaces() {
        let err = render_document(r#"{"vars": []}"#, Map::new(), &Map::new(), &Config::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Render(_)));
    }
}
