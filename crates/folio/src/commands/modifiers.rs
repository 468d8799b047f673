//! `folio modifiers` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_config::Config;
use folio_render::BUILTINS;

use super::check_disabled_modifiers;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the modifiers command.
#[derive(Args)]
pub(crate) struct ModifiersArgs {
    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ModifiersArgs {
    /// Execute the modifiers command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        check_disabled_modifiers(&config)?;

        output.highlight("Built-in modifiers:");
        for line in modifier_lines(&config) {
            output.info(&line);
        }

        Ok(())
    }
}

/// One line per built-in modifier, marking the ones the config turns off.
fn modifier_lines(config: &Config) -> Vec<String> {
    let disabled = config.disabled_modifiers();

    BUILTINS
        .iter()
        .map(|(name, syntax)| {
            let off = !config.modifiers.builtin
                || disabled.iter().any(|d| d.eq_ignore_ascii_case(name));
            let status = if off { " (disabled)" } else { "" };
            format!("  {name:<12} [{syntax}]{status}")
        })
        .collect()
}
