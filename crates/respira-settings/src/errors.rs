//! Settings error types.

use thiserror::Error;

/// Convenience alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Failure while loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file contains invalid JSON, or the merged document
    /// does not match the settings schema.
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
