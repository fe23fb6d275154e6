//! Composition-root error type.
//!
//! `DipeoError` sits above the crate-local error enums (`CoreError` for
//! compilation, `RuntimeError` for execution) and adds the failure modes
//! that only exist once there's a CLI and a filesystem involved: a missing
//! diagram file, a config file that won't parse, a diagram that failed
//! compilation.

use thiserror::Error;

/// Result type alias for composition-root operations.
pub type Result<T> = std::result::Result<T, DipeoError>;

#[derive(Debug, Error)]
pub enum DipeoError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A diagram failed to compile; the message summarizes its diagnostics.
    #[error("diagram failed to compile:\n{0}")]
    Compilation(String),

    /// Execution ended in `Termination::Fatal`.
    #[error("execution aborted: {0}")]
    Runtime(#[from] dipeo_runtime::RuntimeError),

    /// A diagram value object was malformed.
    #[error(transparent)]
    Core(#[from] dipeo_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for DipeoError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<&str> for DipeoError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}
