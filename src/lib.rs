//! kbminer - entity summarization knowledge base miner
//!
//! Builds, for each DBpedia entity class, a ranked list of the predicates
//! that best describe its members. Entity mentions are taken from the NIF
//! abstract annotations, explained by predicates of the knowledge graph,
//! weighted by their position in the abstract and aggregated per class after
//! statistically identical predicates are merged.
//!
//! # Architecture
//!
//! - [`nif`] - Streaming parser for 7-line NIF mention groups
//! - [`sparql`] - Knowledge graph queries and the HTTP SPARQL client
//! - [`relations`] - Candidate predicate enrichment and position weights
//! - [`predicate`] - Deny-lists, similarity registry and identity engine
//! - [`knowledge`] - Literal census and knowledge base aggregation
//! - [`pipeline`] - Resumable orchestration of the whole batch job
//! - [`storage`] - JSON document persistence
//! - [`config`] - Configuration management and settings
//! - [`utils`] - Retry policy, query errors and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kbminer::config::Config;
//! use kbminer::pipeline::EntitySummarizer;
//! use kbminer::sparql::SparqlClient;
//! use kbminer::storage::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = JsonFileStore::open_or_create(&config.storage.results_dir)?;
//!     let client = SparqlClient::new(&config.sparql)?;
//!
//!     let summarizer = EntitySummarizer::new(config, Arc::new(client), Arc::new(store));
//!     let types = vec!["Film".to_string()];
//!     summarizer.create_complete_knowledge_base(&types, 10, false, true).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod knowledge;
pub mod models;
pub mod nif;
pub mod pipeline;
pub mod predicate;
pub mod relations;
pub mod sparql;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{PredicateGroup, RelationRecord, ResourceResult, SectionInfo};
    pub use crate::pipeline::EntitySummarizer;
    pub use crate::predicate::{SimilarityEngine, SimilarityRegistry};
    pub use crate::sparql::{GraphQueryClient, SparqlClient};
    pub use crate::storage::{DocumentStore, JsonFileStore, MemoryStore};
}

// Direct re-exports for convenience
pub use models::{PredicateGroup, RelationRecord, ResourceResult, SectionInfo};
