//! First-run bootstrap: creates `~/.dipeo` and a default configuration
//! file. There is no database to initialize — diagram execution state
//! lives for the life of one run (spec §1 scope: no durable persistence
//! layer).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{DipeoError, Result};

pub const CONFIG_DIR: &str = ".dipeo";
pub const CONFIG_FILE: &str = "dipeo.toml";

/// `~/.dipeo`
pub fn get_dipeo_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .ok_or_else(|| DipeoError::Config("could not determine home directory".to_string()))
}

pub fn get_user_config_path() -> Result<PathBuf> {
    Ok(get_dipeo_home()?.join(CONFIG_FILE))
}

pub fn get_project_config_path() -> Result<PathBuf> {
    Ok(PathBuf::from(".").join(CONFIG_DIR).join(CONFIG_FILE))
}

/// `true` once `~/.dipeo` exists and carries a config file.
pub fn is_initialized() -> bool {
    get_dipeo_home().map(|home| home.exists() && home.join(CONFIG_FILE).exists()).unwrap_or(false)
}

/// Create `~/.dipeo` and a default `dipeo.toml` if either is missing.
pub fn initialize(force: bool) -> Result<()> {
    let dipeo_home = get_dipeo_home()?;

    info!(path = %dipeo_home.display(), "initializing dipeo");

    if !dipeo_home.exists() {
        fs::create_dir_all(&dipeo_home).map_err(|e| DipeoError::Config(format!("failed to create directory: {e}")))?;
        info!(path = %dipeo_home.display(), "created dipeo home directory");
    } else {
        info!(path = %dipeo_home.display(), "dipeo home directory already exists");
    }

    let config_path = dipeo_home.join(CONFIG_FILE);
    if !config_path.exists() || force {
        create_default_config(&config_path)?;
        info!(path = %config_path.display(), "created default configuration");
    } else {
        warn!(path = %config_path.display(), "configuration already exists (use --force to overwrite)");
    }

    Ok(())
}

fn create_default_config(path: &Path) -> Result<()> {
    let default_config = r#"# dipeo configuration
#
# This is the user-level configuration file. Project-specific overrides
# can be placed in ./.dipeo/dipeo.toml; any section present there
# replaces the matching section here.

[engine]
# Bound on the number of node firings in flight at once.
concurrency = 4
# Fallback timeout (ms) for node types with no declared default.
default_node_timeout_ms = 30000

[events]
# Per-subscriber bounded queue depth before slow-subscriber detach.
high_water_mark = 256
# How many past events are kept per execution for late subscribers.
replay_window_size = 100

[retry]
max_attempts = 3
base_delay_ms = 200
max_delay_ms = 10000

[logging]
# "trace", "debug", "info", "warn", "error", or an EnvFilter directive
# like "dipeo=debug,dipeo_runtime=trace".
level = "info"
"#;

    fs::write(path, default_config).map_err(|e| DipeoError::Config(format!("failed to write configuration: {e}")))?;

    Ok(())
}

#[cfg(test)]
pub fn cleanup() -> Result<()> {
    let dipeo_home = get_dipeo_home()?;
    if dipeo_home.exists() {
        fs::remove_dir_all(&dipeo_home).map_err(|e| DipeoError::Config(format!("failed to remove directory: {e}")))?;
        info!(path = %dipeo_home.display(), "cleaned up dipeo directory");
    }
    Ok(())
}
