//! Settings loading errors.

use thiserror::Error;

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Error loading or parsing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON (or does not match the schema).
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}
