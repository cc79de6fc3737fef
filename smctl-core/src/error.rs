//! Core error types.

use thiserror::Error;

/// Errors from loading a definition document.
///
/// The runtime itself never fails: malformed fragments are skipped while
/// running. These errors only surface when turning text into a document.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
