use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Search engine connection
    pub engine: EngineConfig,

    /// Index names the broker operates on
    #[serde(default)]
    pub indexes: IndexesConfig,

    /// Scrolled full-scan tuning
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Reference registry caching
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Bulk population worker pool
    #[serde(default)]
    pub population: PopulationConfig,

    /// Orphaned index retention
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from embedded defaults, an optional file and the
    /// environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: SEARCH_BROKER_)
            .add_source(
                config::Environment::with_prefix("SEARCH_BROKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine cluster
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Read timeout for interactive requests (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(default = "default_timeout")]
    pub connect_timeout_secs: u64,

    /// Read timeout for index create/delete (seconds)
    #[serde(default = "default_admin_timeout")]
    pub admin_timeout_secs: u64,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_timeout(),
            admin_timeout_secs: default_admin_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexesConfig {
    /// Logical name of the content index group
    #[serde(default = "default_content_index")]
    pub content: String,

    /// Index holding best/worst bets
    #[serde(default = "default_metasearch_index")]
    pub metasearch: String,

    /// Index the reference registries are built from
    #[serde(default = "default_registry_index")]
    pub registry: String,
}

impl Default for IndexesConfig {
    fn default() -> Self {
        Self {
            content: default_content_index(),
            metasearch: default_metasearch_index(),
            registry: default_registry_index(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Requested page size; the engine applies this per shard, so actual
    /// pages may be larger
    #[serde(default = "default_scroll_batch_size")]
    pub batch_size: usize,

    /// Cursor keep-alive between page requests (minutes)
    #[serde(default = "default_scroll_keepalive")]
    pub keepalive_minutes: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            batch_size: default_scroll_batch_size(),
            keepalive_minutes: default_scroll_keepalive(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Lifetime of a registry table before it is rebuilt (seconds)
    #[serde(default = "default_cache_lifetime")]
    pub cache_lifetime_secs: u64,
}

impl RegistryConfig {
    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_lifetime_secs: default_cache_lifetime(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Documents per bulk-write batch
    #[serde(default = "default_population_batch_size")]
    pub batch_size: usize,

    /// Concurrent bulk-write workers
    #[serde(default = "default_population_concurrency")]
    pub concurrency: usize,

    /// Bounded queue capacity between producer and workers
    #[serde(default = "default_population_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_population_batch_size(),
            concurrency: default_population_concurrency(),
            queue_capacity: default_population_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Orphaned indices younger than this many days are kept by timed-clean
    #[serde(default = "default_day_limit")]
    pub day_limit: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            day_limit: default_day_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (overridable with RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_admin_timeout() -> u64 {
    30
}

fn default_content_index() -> String {
    "mainstream".to_string()
}

fn default_metasearch_index() -> String {
    "metasearch".to_string()
}

fn default_registry_index() -> String {
    "government".to_string()
}

fn default_scroll_batch_size() -> usize {
    50
}

fn default_scroll_keepalive() -> u64 {
    1
}

fn default_cache_lifetime() -> u64 {
    300
}

fn default_population_batch_size() -> usize {
    50
}

fn default_population_concurrency() -> usize {
    12
}

fn default_population_queue_capacity() -> usize {
    24
}

fn default_day_limit() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_timeout(), 5);
        assert_eq!(default_admin_timeout(), 30);
        assert_eq!(default_scroll_batch_size(), 50);
        assert_eq!(default_cache_lifetime(), 300);
        assert_eq!(default_population_concurrency(), 12);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.engine.base_url, "http://localhost:9200");
        assert_eq!(config.indexes.metasearch, "metasearch");
        assert_eq!(config.population.batch_size, 50);
        assert_eq!(config.retention.day_limit, 7);
    }

    #[test]
    fn test_duration_helpers() {
        let engine = EngineConfig::default();
        assert_eq!(engine.timeout(), Duration::from_secs(5));
        assert_eq!(engine.admin_timeout(), Duration::from_secs(30));
    }
}
