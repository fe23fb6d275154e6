//! Ambient config, logging-init, and error helpers shared across the
//! `dipeo-core`, `dipeo-runtime`, `dipeo-events`, and `dipeo` crates.
//!
//! This crate carries no domain logic of its own (no nodes, no events, no
//! scheduler) — it is the small shared foundation those crates sit on, the
//! way `utils` sits underneath `orca` and `orchestrator`.
//!
//! # Modules
//!
//! ## Config (`config`)
//!
//! Layered configuration: environment variables with type parsing, and
//! YAML/JSON file loading with format auto-detection from the extension.
//!
//! ```rust,ignore
//! use dipeo_utils::config::{get_env, get_env_parse, load_config_file};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AppConfig {
//!     api_key: String,
//!     port: u16,
//! }
//!
//! let api_key = get_env("API_KEY")?;
//! let port = get_env_parse::<u16>("PORT")?;
//! let config: AppConfig = load_config_file("config.yaml")?;
//! ```
//!
//! ## Logging (`logging`)
//!
//! A single `tracing` subscriber init helper used by the `dipeo` binary
//! (and by integration tests that want deterministic log output).
//!
//! # Features
//!
//! - `config` - Configuration utilities (enabled by default)
//! - `logging` - Tracing subscriber init helper (enabled by default)

pub mod error;

#[cfg(feature = "config")]
pub mod config;

#[cfg(feature = "logging")]
pub mod logging;

// Re-export commonly used types
pub use error::{Result, UtilsError};

#[cfg(feature = "config")]
pub use config::{
    get_env, get_env_bool, get_env_bool_or, get_env_or, get_env_parse, get_env_parse_or,
    load_config_file, load_json_config, load_yaml_config, ConfigBuilder, FromEnv, ValidateConfig,
};

#[cfg(feature = "logging")]
pub use logging::init_tracing;

