//! CLI command implementations.

pub(crate) mod modifiers;
pub(crate) mod render;

pub(crate) use modifiers::ModifiersArgs;
pub(crate) use render::RenderArgs;

use folio_config::Config;
use folio_render::is_builtin;

use crate::error::CliError;

/// Reject disabled modifier names that are not built-ins.
pub(crate) fn check_disabled_modifiers(config: &Config) -> Result<(), CliError> {
    let unknown: Vec<&str> = config
        .disabled_modifiers()
        .into_iter()
        .filter(|name| !is_builtin(name))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CliError::Validation(format!(
            "Unknown modifier in modifiers.disabled: {}",
            unknown.join(", ")
        )))
    }
}
