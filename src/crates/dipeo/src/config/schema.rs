//! Configuration schema for the `dipeo` composition root.

use serde::{Deserialize, Serialize};

/// Top-level configuration: everything the composition root needs that
/// isn't already carried by the diagram itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DipeoConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub events: EventsSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Tunables passed straight through to `dipeo_runtime::EngineConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Bound on the number of node firings in flight at once (spec §5).
    pub concurrency: usize,

    /// Fallback timeout for a node type that declares none of its own
    /// (`NodeConfig::default_timeout_ms` already covers the common cases;
    /// this is the last-resort floor).
    pub default_node_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { concurrency: 4, default_node_timeout_ms: 30_000 }
    }
}

/// Tunables for the event bus/router (`dipeo-events`), when the
/// composition root wires one up for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsSettings {
    /// Per-subscriber bounded queue depth before slow-subscriber detach
    /// (spec §4.6 high-water mark).
    pub high_water_mark: usize,

    /// How many past events `Router` keeps per execution for late
    /// subscribers to replay.
    pub replay_window_size: usize,
}

impl Default for EventsSettings {
    fn default() -> Self {
        Self { high_water_mark: 256, replay_window_size: 100 }
    }
}

/// Default retry policy handed to `dipeo_runtime::EngineConfig` for
/// retryable `HandlerFailed`/`ExternalService` errors (spec §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 200, max_delay_ms: 10_000 }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> dipeo_runtime::RetryPolicy {
        dipeo_runtime::RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: std::time::Duration::from_millis(self.base_delay_ms),
            max_delay: std::time::Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "dipeo=debug".
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl DipeoConfig {
    /// Merge another config into this one (`other` takes precedence).
    /// The loader handles priority: defaults → user file → project file.
    pub fn merge(&mut self, other: DipeoConfig) {
        self.engine = other.engine;
        self.events = other.events;
        self.retry = other.retry;
        self.logging = other.logging;
    }

    /// Resolve `${VAR_NAME}` references in string fields. Currently only
    /// `logging.level` is a free-form string; kept as a method (rather
    /// than inlined in the loader) so new string fields pick it up for
    /// free.
    pub fn resolve_env_vars(&mut self) {
        self.logging.level = Self::expand_env_var(&self.logging.level);
    }

    fn expand_env_var(value: &str) -> String {
        if let Some(var_name) = value.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            std::env::var(var_name).unwrap_or_else(|_| value.to_string())
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_engine_and_retry_settings() {
        let config = DipeoConfig::default();
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn merge_replaces_every_section_wholesale() {
        let mut base = DipeoConfig::default();
        let mut override_config = DipeoConfig::default();
        override_config.engine.concurrency = 16;
        override_config.logging.level = "debug".to_string();

        base.merge(override_config);

        assert_eq!(base.engine.concurrency, 16);
        assert_eq!(base.logging.level, "debug");
        assert_eq!(base.retry.max_attempts, 3); // unchanged
    }

    #[test]
    fn env_var_expansion_substitutes_logging_level() {
        let mut config = DipeoConfig::default();
        config.logging.level = "${TEST_DIPEO_LOG_LEVEL}".to_string();

        std::env::set_var("TEST_DIPEO_LOG_LEVEL", "trace");
        config.resolve_env_vars();
        assert_eq!(config.logging.level, "trace");
        std::env::remove_var("TEST_DIPEO_LOG_LEVEL");
    }

    #[test]
    fn retry_settings_convert_to_a_runtime_retry_policy() {
        let settings = RetrySettings { max_attempts: 5, base_delay_ms: 10, max_delay_ms: 1000 };
        let policy = settings.to_policy();
        assert_eq!(policy.max_attempts, 5);
    }
}
