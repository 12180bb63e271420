//! Literal predicate census
//!
//! Counts, over the best ranked resources of a class, how many resources
//! carry each literal-valued predicate. The census complements the mined
//! relations, which only ever see predicates between resources.

use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{LiteralCensus, PredicateCounts};
use crate::predicate::PredicateFilter;
use crate::sparql::GraphQueryClient;
use crate::storage::{load_or_default, DocumentStore, GLOBAL_STATISTIC_KEY};

/// Builds the literal census of entity classes
pub struct LiteralCensusBuilder {
    client: Arc<dyn GraphQueryClient>,
    filter: PredicateFilter,
}

impl LiteralCensusBuilder {
    pub fn new(client: Arc<dyn GraphQueryClient>, filter: PredicateFilter) -> Self {
        Self { client, filter }
    }

    /// Count literal predicates over the top `resource_count` resources of a class
    pub async fn collect(&self, entity_type: &str, resource_count: usize) -> Result<PredicateCounts> {
        let resources = self
            .client
            .ranked_resources(entity_type, resource_count)
            .await?;

        info!(entity_type, resources = resources.len(), "Collecting literal census");

        let mut counts = PredicateCounts::new();
        for resource in &resources {
            let predicates: BTreeSet<String> = self
                .client
                .predicates_by_subject(&resource.uri, true)
                .await?
                .into_iter()
                .filter(|p| !self.filter.is_ignored(p))
                .collect();

            debug!(resource = %resource.uri, predicates = predicates.len(), "Literal predicates");
            for predicate in predicates {
                *counts.entry(predicate).or_insert(0) += 1;
            }
        }

        Ok(counts)
    }

    /// Collect a class census and merge it into the stored census document
    pub async fn collect_and_store(
        &self,
        store: &dyn DocumentStore,
        entity_type: &str,
        resource_count: usize,
    ) -> Result<PredicateCounts> {
        let counts = self.collect(entity_type, resource_count).await?;
        store.merge(GLOBAL_STATISTIC_KEY, json!({ entity_type: counts }))?;
        Ok(counts)
    }
}

/// Stored census of one class, empty when unknown
pub fn census_for(store: &dyn DocumentStore, entity_type: &str) -> Result<PredicateCounts> {
    let census: LiteralCensus = load_or_default(store, GLOBAL_STATISTIC_KEY)?;
    Ok(census.get(entity_type).cloned().unwrap_or_default())
}
