//! Configuration management for kbminer
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SPARQL endpoint configuration
    pub sparql: SparqlConfig,

    /// Predicate similarity configuration
    pub similarity: SimilarityConfig,

    /// Mining configuration
    pub mining: MiningConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// SPARQL endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparqlConfig {
    /// Endpoint URL
    pub endpoint: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Total attempts per query, including the first
    pub max_attempts: u32,

    /// User agent string
    pub user_agent: String,
}

/// Predicate similarity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimal joint/individual subject ratio to mark two predicates identical
    pub identical_limit: f64,

    /// Only the most frequent candidates are compared pairwise
    pub max_candidates: usize,

    /// Persist newly different pairs after this many additions
    pub different_flush_every: usize,
}

/// Mining configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Best ranked resources mined from the NIF dataset per entity class
    pub entity_count: usize,

    /// Best ranked resources sampled for the literal census per entity class
    pub literal_resource_count: usize,

    /// Keep only the top groups per class in the knowledge base (unlimited if unset)
    pub knowledge_base_limit: Option<usize>,

    /// Predicates ignored in addition to the built-in deny-lists
    pub extra_ignored_predicates: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding result documents, registries and the knowledge base
    pub results_dir: PathBuf,

    /// NIF dataset path
    pub nif_path: Option<PathBuf>,

    /// Whether to create the results directory if it doesn't exist
    pub create_dirs: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl SparqlConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl LoggingConfig {
    /// Level names accepted by `level`
    pub const LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Default tracing filter directive: crate logs at `level`, dependencies at warn
    ///
    /// `verbose` forces debug output for the crate.
    pub fn filter_directive(&self, verbose: bool) -> String {
        if verbose {
            String::from("kbminer=debug,info")
        } else {
            format!("kbminer={},warn", self.level.to_ascii_lowercase())
        }
    }

    /// Whether structured JSON output was requested
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://dbpedia.org/sparql"),
            request_timeout_secs: 120,
            max_attempts: 15,
            user_agent: format!("kbminer/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            identical_limit: 0.8,
            max_candidates: 250,
            different_flush_every: 100,
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            entity_count: 10,
            literal_resource_count: 10_000,
            knowledge_base_limit: None,
            extra_ignored_predicates: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("data/results"),
            nif_path: None,
            create_dirs: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sparql: SparqlConfig::default(),
            similarity: SimilarityConfig::default(),
            mining: MiningConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let endpoint =
            std::env::var("KBMINER_SPARQL_ENDPOINT").unwrap_or(defaults.sparql.endpoint);

        let request_timeout_secs = std::env::var("KBMINER_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.sparql.request_timeout_secs);

        let max_attempts = std::env::var("KBMINER_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.sparql.max_attempts);

        let identical_limit = std::env::var("KBMINER_IDENTICAL_LIMIT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(defaults.similarity.identical_limit);

        let entity_count = std::env::var("KBMINER_ENTITY_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.mining.entity_count);

        let results_dir = std::env::var("KBMINER_RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.results_dir);

        let nif_path = std::env::var("KBMINER_NIF_PATH").ok().map(PathBuf::from);

        let log_level =
            std::env::var("KBMINER_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("KBMINER_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            sparql: SparqlConfig {
                endpoint,
                request_timeout_secs,
                max_attempts,
                ..defaults.sparql
            },
            similarity: SimilarityConfig {
                identical_limit,
                ..defaults.similarity
            },
            mining: MiningConfig {
                entity_count,
                ..defaults.mining
            },
            storage: StorageConfig {
                results_dir,
                nif_path,
                ..defaults.storage
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sparql.endpoint.is_empty() {
            anyhow::bail!("sparql.endpoint must not be empty");
        }

        if self.sparql.max_attempts == 0 {
            anyhow::bail!("sparql.max_attempts must be greater than 0");
        }

        if !(self.similarity.identical_limit > 0.0 && self.similarity.identical_limit <= 1.0) {
            anyhow::bail!("similarity.identical_limit must be in (0, 1]");
        }

        if self.similarity.max_candidates < 2 {
            anyhow::bail!("similarity.max_candidates must be at least 2");
        }

        if self.similarity.different_flush_every == 0 {
            anyhow::bail!("similarity.different_flush_every must be greater than 0");
        }

        if self.storage.results_dir.as_os_str().is_empty() {
            anyhow::bail!("storage.results_dir must not be empty");
        }

        if !LoggingConfig::LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            anyhow::bail!(
                "logging.level must be one of {}, got '{}'",
                LoggingConfig::LEVELS.join(", "),
                self.logging.level
            );
        }

        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json', got '{}'", self.logging.format);
        }

        Ok(())
    }
}
