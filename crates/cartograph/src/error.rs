//! CLI error types.

use cartograph_config::ConfigError;
use cartograph_site::Stage;
use cartograph_storage::StorageError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("failed to serialize site map: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("build failed during {stage} with {errors} error(s)")]
    BuildFailed { stage: Stage, errors: usize },
}
