//! Layered configuration for the `dipeo` binary.
//!
//! Supports dual-location configuration:
//! - User-level: `~/.dipeo/dipeo.toml`
//! - Project-level: `./.dipeo/dipeo.toml`
//!
//! Project-level config overrides user-level config, section by section.

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{DipeoConfig, EngineSettings, EventsSettings, LoggingSettings, RetrySettings};

use crate::Result;

/// Load configuration from both locations with project config taking
/// precedence. See [`ConfigLoader::load`] for the full priority order.
pub async fn load_config() -> Result<DipeoConfig> {
    ConfigLoader::new().load().await
}
