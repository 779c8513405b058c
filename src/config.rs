use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub bus: BusSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Storage backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_backend")]
    pub backend: DatabaseBackend,
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

fn default_backend() -> DatabaseBackend {
    DatabaseBackend::Memory
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusSettings {
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Users seeded into an empty memory backend at startup
    #[serde(default = "default_seed_user_count")]
    pub seed_user_count: u64,
    /// Composite score at or above which a viewed profile counts as a success
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    /// Profile cache tuning
    #[serde(default = "default_cache_size")]
    pub profile_cache_size: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub profile_cache_ttl_secs: u64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            seed_user_count: default_seed_user_count(),
            score_threshold: default_score_threshold(),
            profile_cache_size: default_cache_size(),
            profile_cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_seed_user_count() -> u64 {
    100
}

fn default_score_threshold() -> f64 {
    5.0
}

fn default_cache_size() -> u64 {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load configuration from file and environment variables.
    ///
    /// Later sources override earlier ones:
    /// 1. config/default.toml
    /// 2. config/local.toml (development overrides)
    /// 3. Environment variables prefixed with EMBER__
    ///    (e.g. EMBER__SERVER__PORT -> server.port)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("EMBER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // DATABASE_URL wins over the config file, matching deploy tooling.
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        builder.build()?.try_deserialize()
    }
}
