//! CLI error types.

use folio_config::ConfigError;
use folio_render::{ConditionError, RenderError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid condition for variable \"{name}\": {source}")]
    Condition {
        name: String,
        #[source]
        source: ConditionError,
    },

    #[error("{0}")]
    Validation(String),
}
