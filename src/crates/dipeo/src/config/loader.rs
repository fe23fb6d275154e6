//! Configuration loader with dual-location support.
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: `~/.dipeo/dipeo.toml`
//! 3. Project-level config: `./.dipeo/dipeo.toml`
//!
//! Later configs override earlier ones wholesale, per section (see
//! `DipeoConfig::merge`) — a project file need only declare the sections
//! it wants to change.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info};

use crate::config::schema::DipeoConfig;
use crate::error::{DipeoError, Result};

pub struct ConfigLoader {
    user_config_path: PathBuf,
    project_config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
        }
    }

    fn user_config_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".dipeo").join("dipeo.toml")
    }

    fn project_config_path() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(".dipeo").join("dipeo.toml")
    }

    /// Priority order: defaults → user-level config → project-level config
    /// → environment variable expansion.
    pub async fn load(&self) -> Result<DipeoConfig> {
        let mut config = DipeoConfig::default();
        info!("loading configuration with defaults");

        match self.load_from_path(&self.user_config_path).await {
            Ok(user_config) => {
                debug!(path = %self.user_config_path.display(), "loaded user-level config");
                config.merge(user_config);
            }
            Err(e) => {
                debug!(path = %self.user_config_path.display(), error = %e, "user-level config not found, using defaults");
            }
        }

        match self.load_from_path(&self.project_config_path).await {
            Ok(project_config) => {
                debug!(path = %self.project_config_path.display(), "loaded project-level config");
                config.merge(project_config);
            }
            Err(e) => {
                debug!(path = %self.project_config_path.display(), error = %e, "project-level config not found");
            }
        }

        config.resolve_env_vars();
        Ok(config)
    }

    async fn load_from_path(&self, path: &PathBuf) -> Result<DipeoConfig> {
        if !path.exists() {
            return Err(DipeoError::Config(format!("config file not found: {}", path.display())));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DipeoError::Config(format!("failed to read config: {e}")))?;

        let config: DipeoConfig =
            toml::from_str(&content).map_err(|e| DipeoError::Config(format!("failed to parse config: {e}")))?;

        Ok(config)
    }

    pub fn user_config_path_ref(&self) -> &PathBuf {
        &self.user_config_path
    }

    pub fn project_config_path_ref(&self) -> &PathBuf {
        &self.project_config_path
    }

    pub fn user_config_exists(&self) -> bool {
        self.user_config_path.exists()
    }

    pub fn project_config_exists(&self) -> bool {
        self.project_config_path.exists()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_paths_live_under_a_dipeo_directory() {
        let loader = ConfigLoader::new();
        assert!(loader.user_config_path_ref().ends_with(".dipeo/dipeo.toml"));
        assert!(loader.project_config_path_ref().ends_with(".dipeo/dipeo.toml"));
    }

    #[tokio::test]
    async fn load_returns_defaults_when_no_files_exist() {
        // Points at a config directory that cannot exist, to isolate this
        // test from a real ~/.dipeo or ./.dipeo on the machine running it.
        let loader = ConfigLoader {
            user_config_path: PathBuf::from("/nonexistent-dipeo-test-path/dipeo.toml"),
            project_config_path: PathBuf::from("/nonexistent-dipeo-test-path-2/dipeo.toml"),
        };
        let config = loader.load().await.unwrap();
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn existence_checks_do_not_panic() {
        let loader = ConfigLoader::new();
        let _ = loader.user_config_exists();
        let _ = loader.project_config_exists();
    }
}
