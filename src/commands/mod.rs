//! CLI command implementations

pub mod knowledge;
pub mod mining;

pub use knowledge::{build, census, reduce};
pub use mining::{complete, mine, refresh};

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use kbminer::config::Config;
use kbminer::error::{Error, ErrorCategory};
use kbminer::pipeline::EntitySummarizer;
use kbminer::sparql::SparqlClient;
use kbminer::storage::{DocumentStore, JsonFileStore};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub nif: Option<PathBuf>,
    pub log_format: Option<String>,
}

/// Options of the mining commands
#[derive(Debug, Clone)]
pub struct MineOptions {
    pub types: Vec<String>,
    pub count: Option<usize>,
    pub reload: bool,
}

/// Resolve configuration from file or environment plus CLI overrides
pub fn load_config(global: &GlobalOptions) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(dir) = &global.results_dir {
        config.storage.results_dir = dir.clone();
    }
    if let Some(nif) = &global.nif {
        config.storage.nif_path = Some(nif.clone());
    }
    if let Some(format) = &global.log_format {
        config.logging.format = format.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Open the result store described by the configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let dir = &config.storage.results_dir;
    let store = if config.storage.create_dirs {
        JsonFileStore::open_or_create(dir)
    } else {
        JsonFileStore::open(dir)
    }
    .with_context(|| format!("Failed to open results directory: {}", dir.display()))?;

    Ok(Arc::new(store))
}

/// Wire configuration, SPARQL client and store into a summarizer
pub fn summarizer(config: Config) -> Result<EntitySummarizer> {
    let store = open_store(&config)?;
    let client = SparqlClient::new(&config.sparql).context("Failed to create SPARQL client")?;

    tracing::debug!(endpoint = client.endpoint(), results_dir = %config.storage.results_dir.display(), "Summarizer ready");
    Ok(EntitySummarizer::new(config, Arc::new(client), store))
}

/// Log a failed command with its error category
///
/// Returns true when the failure came from the graph endpoint, where a
/// rerun resumes from the results and counts already stored.
pub fn report_failure(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<Error>() {
        Some(cause) => {
            let category = cause.category();
            tracing::error!(
                category = category.label(),
                recoverable = cause.is_recoverable(),
                "{error:#}"
            );
            category == ErrorCategory::Network
        }
        None => {
            tracing::error!("{error:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_logging_comes_from_config_file() {
        let file = config_file("[logging]\nlevel = \"debug\"\nformat = \"json\"\n");
        let global = GlobalOptions {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let config = load_config(&global).unwrap();
        assert!(config.logging.is_json());
        assert_eq!(config.logging.filter_directive(false), "kbminer=debug,warn");
    }

    #[test]
    fn test_log_format_flag_overrides_config() {
        let file = config_file("[logging]\nformat = \"json\"\n");
        let global = GlobalOptions {
            config: Some(file.path().to_path_buf()),
            log_format: Some(String::from("text")),
            ..Default::default()
        };

        let config = load_config(&global).unwrap();
        assert!(!config.logging.is_json());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_endpoint_failure_is_resumable() {
        use kbminer::utils::error::QueryError;

        let outage = anyhow::Error::from(Error::Query(QueryError::ServerError(503)))
            .context("Mining failed for Film");
        assert!(report_failure(&outage));

        let missing = anyhow::Error::from(Error::InputNotFound {
            path: PathBuf::from("abstracts.ttl"),
        })
        .context("Mining failed for Film");
        assert!(!report_failure(&missing));

        assert!(!report_failure(&anyhow::anyhow!("sparql.endpoint must not be empty")));
    }
}
