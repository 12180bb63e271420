//! Knowledge graph access
//!
//! The miner only ever asks a handful of question shapes of the graph, so
//! the whole remote surface is the [`GraphQueryClient`] trait. [`SparqlClient`]
//! answers them over HTTP; tests substitute in-memory fakes.

pub mod client;
pub mod queries;

pub use client::SparqlClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::QueryError;

/// Result type for graph queries
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// A resource of an entity class with its PageRank value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResource {
    pub uri: String,
    pub rank: f64,
}

/// Questions the miner asks of the knowledge graph
///
/// Terms may be full IRIs or bare ontology local names (`Film`,
/// `birthPlace`), which resolve against the DBpedia ontology namespace.
#[async_trait]
pub trait GraphQueryClient: Send + Sync {
    /// Best ranked resources of a class, highest rank first
    async fn ranked_resources(&self, entity_type: &str, limit: usize) -> QueryResult<Vec<RankedResource>>;

    /// Distinct predicates of triples whose object is `object`
    async fn predicates_by_object(&self, object: &str) -> QueryResult<Vec<String>>;

    /// Distinct predicates of triples whose subject is `subject`
    async fn predicates_by_subject(&self, subject: &str, literal_only: bool) -> QueryResult<Vec<String>>;

    /// Distinct predicates directly connecting `subject` and `object`, either direction
    async fn predicates_between(&self, subject: &str, object: &str) -> QueryResult<Vec<String>>;

    /// Number of distinct subjects using every given predicate with a shared object
    async fn count_subjects(&self, predicates: &[String]) -> QueryResult<u64>;

    /// Number of distinct subjects using one predicate
    async fn count_subjects_for(&self, predicate: &str) -> QueryResult<u64> {
        self.count_subjects(&[predicate.to_string()]).await
    }

    /// Number of class members using the predicate in either direction
    async fn count_predicate_in_class(&self, entity_type: &str, predicate: &str) -> QueryResult<u64>;
}
