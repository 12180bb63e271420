//! Candidate predicates for a mention
//!
//! A mention of `link` in the abstract of `resource` is explained by the
//! predicates connecting the two (strict) and, more loosely, by any
//! predicate pointing at `link` (weak). Each candidate is weighted by how
//! many members of the entity class use it.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::{PredicateCounts, RelationRecord};
use crate::predicate::PredicateFilter;
use crate::sparql::GraphQueryClient;

/// Strict and weak predicates found for one link
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedPredicates {
    pub properties: PredicateCounts,
    pub strict_properties: PredicateCounts,
}

/// Looks up candidate predicates for relations
pub struct RelationEnricher {
    client: Arc<dyn GraphQueryClient>,
    filter: PredicateFilter,
    frequencies: HashMap<(String, String), u64>,
}

impl RelationEnricher {
    pub fn new(client: Arc<dyn GraphQueryClient>, filter: PredicateFilter) -> Self {
        Self {
            client,
            filter,
            frequencies: HashMap::new(),
        }
    }

    /// Strict and weak predicates of `link` for a resource of `entity_type`
    ///
    /// Deny-listed predicates and predicates unused by the class are dropped;
    /// a strict predicate never reappears among the weak ones.
    pub async fn enrich(&mut self, resource_uri: &str, link: &str, entity_type: &str) -> Result<EnrichedPredicates> {
        let mut enriched = EnrichedPredicates::default();

        for predicate in self.client.predicates_between(resource_uri, link).await? {
            if self.filter.is_ignored(&predicate) || enriched.strict_properties.contains_key(&predicate) {
                continue;
            }
            let frequency = self.frequency(entity_type, &predicate).await?;
            if frequency > 0 {
                enriched.strict_properties.insert(predicate, frequency);
            }
        }

        for predicate in self.client.predicates_by_object(link).await? {
            if self.filter.is_ignored(&predicate)
                || enriched.strict_properties.contains_key(&predicate)
                || enriched.properties.contains_key(&predicate)
            {
                continue;
            }
            let frequency = self.frequency(entity_type, &predicate).await?;
            if frequency > 0 {
                enriched.properties.insert(predicate, frequency);
            }
        }

        debug!(
            resource_uri,
            link,
            strict = enriched.strict_properties.len(),
            weak = enriched.properties.len(),
            "Relation enriched"
        );
        Ok(enriched)
    }

    /// Enrich every relation of a resource in place
    pub async fn enrich_all(
        &mut self,
        resource_uri: &str,
        entity_type: &str,
        relations: &mut [RelationRecord],
    ) -> Result<()> {
        for relation in relations.iter_mut() {
            let enriched = self.enrich(resource_uri, &relation.link, entity_type).await?;
            relation.properties = enriched.properties;
            relation.strict_properties = enriched.strict_properties;
        }
        Ok(())
    }

    async fn frequency(&mut self, entity_type: &str, predicate: &str) -> Result<u64> {
        let key = (entity_type.to_string(), predicate.to_string());
        if let Some(&count) = self.frequencies.get(&key) {
            return Ok(count);
        }

        let count = self
            .client
            .count_predicate_in_class(entity_type, predicate)
            .await?;
        self.frequencies.insert(key, count);
        Ok(count)
    }
}
