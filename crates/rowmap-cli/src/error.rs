//! CLI error type.

use thiserror::Error;

/// Errors raised while loading or resolving a scenario.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("resolution failed: {0}")]
    Resolution(#[from] rowmap_core::Error),
}
