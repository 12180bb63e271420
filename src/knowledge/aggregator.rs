//! Knowledge base aggregation
//!
//! For one entity class every mined relation contributes
//! `frequency × weight` to the canonical group of each of its predicates.
//! Group scores are running means, rescaled to a maximum of 1.0 after each
//! result document, then blended with the class literal census.

use serde_json::json;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::census::census_for;
use crate::error::Result;
use crate::models::{PredicateCounts, PredicateGroup, ResourceResult};
use crate::predicate::{SimilarityEngine, SimilarityRegistry};
use crate::storage::{load_required, result_prefix, DocumentStore, KNOWLEDGE_BASE_KEY};
use crate::utils::round_to;

/// Running group scores of one class
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    groups: Vec<PredicateGroup>,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups in their current state
    pub fn groups(&self) -> &[PredicateGroup] {
        &self.groups
    }

    /// Index of the group holding `predicate`, created on first sight
    fn group_index(&mut self, predicate: &str, registry: &SimilarityRegistry) -> usize {
        if let Some(index) = self.groups.iter().position(|g| g.contains(predicate)) {
            return index;
        }

        let members = registry
            .find_identical(predicate)
            .map(|group| group.iter().cloned().collect())
            .unwrap_or_else(|| vec![predicate.to_string()]);

        self.groups.push(PredicateGroup::new(members));
        self.groups.len() - 1
    }

    /// Fold one weighted observation
    pub fn observe(&mut self, predicate: &str, value: f64, registry: &SimilarityRegistry) {
        let index = self.group_index(predicate, registry);
        self.groups[index].observe(value);
    }

    /// Fold every relation of a result document, then rescale
    pub fn fold_result(&mut self, result: &ResourceResult, registry: &SimilarityRegistry) {
        for relation in &result.relations {
            let weight = relation.effective_weight();
            for (predicate, count) in relation
                .strict_properties
                .iter()
                .chain(relation.properties.iter())
            {
                self.observe(predicate, *count as f64 * weight, registry);
            }
        }
        self.normalize();
    }

    /// Divide every score by the current maximum, rounded to 4 places
    pub fn normalize(&mut self) {
        let max = self
            .groups
            .iter()
            .map(|g| g.score)
            .fold(f64::NEG_INFINITY, f64::max);

        if max <= 0.0 || !max.is_finite() {
            return;
        }
        for group in &mut self.groups {
            group.score = round_to(group.score / max, 4);
        }
    }

    /// Blend in the class literal census
    ///
    /// Each census predicate scores `count / max_count`; a group that already
    /// has a positive score takes the mean of both.
    pub fn fold_census(&mut self, census: &PredicateCounts, registry: &SimilarityRegistry) {
        let Some(&max_count) = census.values().max() else {
            return;
        };
        if max_count == 0 {
            return;
        }

        for (predicate, &count) in census {
            let value = count as f64 / max_count as f64;
            let index = self.group_index(predicate, registry);
            let group = &mut self.groups[index];
            group.score = if group.score > 0.0 {
                round_to((group.score + value) / 2.0, 4)
            } else {
                round_to(value, 4)
            };
        }
    }

    /// Final ranking: rescaled, positive scores only, best first, optionally truncated
    pub fn finish(mut self, limit: Option<usize>) -> Vec<PredicateGroup> {
        self.normalize();

        let mut groups: Vec<PredicateGroup> = self
            .groups
            .into_iter()
            .filter(|g| g.score > 0.0)
            .map(|mut g| {
                g.counter = 0;
                g
            })
            .collect();

        groups.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.predicates.cmp(&b.predicates))
        });

        if let Some(limit) = limit {
            groups.truncate(limit);
        }
        groups
    }
}

/// Builds the ranked knowledge base of entity classes
pub struct KnowledgeBaseAggregator {
    store: Arc<dyn DocumentStore>,
    engine: SimilarityEngine,
    limit: Option<usize>,
}

impl KnowledgeBaseAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, engine: SimilarityEngine, limit: Option<usize>) -> Self {
        Self {
            store,
            engine,
            limit,
        }
    }

    /// Stored result documents of a class; unreadable ones are skipped
    pub fn load_results(&self, entity_type: &str) -> Result<Vec<ResourceResult>> {
        let mut results = Vec::new();
        for key in self.store.keys(&result_prefix(entity_type))? {
            match load_required::<ResourceResult>(self.store.as_ref(), &key) {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "Skipping unreadable result document"),
            }
        }
        Ok(results)
    }

    /// Build, store and return the ranked groups of one class
    pub async fn build(
        &self,
        entity_type: &str,
        registry: &mut SimilarityRegistry,
        identify_identical: bool,
    ) -> Result<Vec<PredicateGroup>> {
        let results = self.load_results(entity_type)?;
        let census = census_for(self.store.as_ref(), entity_type)?;

        info!(
            entity_type,
            results = results.len(),
            census = census.len(),
            "Building knowledge base"
        );

        if identify_identical {
            let candidates = ranked_candidates(&results, &census);
            if !candidates.is_empty() {
                self.engine.identify_identical(registry, &candidates).await?;
            }
            registry.reduce_identical()?;
        }

        let mut aggregation = Aggregation::new();
        for result in &results {
            aggregation.fold_result(result, registry);
            debug!(resource = %result.resource_uri, groups = aggregation.groups().len(), "Result folded");
        }
        aggregation.fold_census(&census, registry);

        let groups = aggregation.finish(self.limit);
        self.store
            .merge(KNOWLEDGE_BASE_KEY, json!({ entity_type: &groups }))?;

        info!(entity_type, groups = groups.len(), "Knowledge base stored");
        Ok(groups)
    }
}

/// Every predicate seen in results and census, most frequent first
pub fn ranked_candidates(results: &[ResourceResult], census: &PredicateCounts) -> Vec<String> {
    let mut totals = census.clone();
    for result in results {
        for (predicate, count) in result.predicate_totals() {
            *totals.entry(predicate).or_insert(0) += count;
        }
    }

    let mut ranked: Vec<(String, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(predicate, _)| predicate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcessTimes, RelationRecord};
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn registry() -> SimilarityRegistry {
        SimilarityRegistry::load(Arc::new(MemoryStore::new()), 100).unwrap()
    }

    fn relation(weight: f64, strict: &[(&str, u64)], weak: &[(&str, u64)]) -> RelationRecord {
        RelationRecord {
            link: "http://dbpedia.org/resource/Target".to_string(),
            anchor: "target".to_string(),
            begin_index: 0,
            end_index: 6,
            section_id: "paragraph_0_100".to_string(),
            weight: Some(weight),
            properties: weak.iter().map(|(p, c)| (p.to_string(), *c)).collect(),
            strict_properties: strict.iter().map(|(p, c)| (p.to_string(), *c)).collect(),
        }
    }

    fn result(relations: Vec<RelationRecord>) -> ResourceResult {
        ResourceResult {
            resource_uri: "http://dbpedia.org/resource/Example".to_string(),
            entity_type: "Film".to_string(),
            process_times: ProcessTimes::default(),
            sections: Vec::new(),
            relations,
            mined_at: Utc::now(),
        }
    }

    #[test]
    fn test_running_mean_over_relations() {
        let registry = registry();
        let mut aggregation = Aggregation::new();

        aggregation.observe("genre", 5.0 * 0.9667, &registry);
        aggregation.observe("genre", 3.0 * 0.475, &registry);

        let group = &aggregation.groups()[0];
        assert!((group.score - 3.12925).abs() < 1e-9);
        assert_eq!(group.counter, 2);
    }

    #[test]
    fn test_fold_result_normalizes() {
        let registry = registry();
        let mut aggregation = Aggregation::new();
        aggregation.fold_result(
            &result(vec![relation(0.5, &[("director", 4)], &[("starring", 2), ("genre", 1)])]),
            &registry,
        );

        let score = |name: &str| {
            aggregation
                .groups()
                .iter()
                .find(|g| g.contains(name))
                .map(|g| g.score)
                .unwrap()
        };
        assert_eq!(score("director"), 1.0);
        assert_eq!(score("starring"), 0.5);
        assert_eq!(score("genre"), 0.25);
    }

    #[test]
    fn test_identical_predicates_share_a_group() {
        let mut registry = registry();
        registry
            .add_identical("http://dbpedia.org/ontology/director", "http://dbpedia.org/property/director")
            .unwrap();

        let mut aggregation = Aggregation::new();
        aggregation.fold_result(
            &result(vec![relation(
                1.0,
                &[("http://dbpedia.org/ontology/director", 4)],
                &[("http://dbpedia.org/property/director", 2)],
            )]),
            &registry,
        );

        assert_eq!(aggregation.groups().len(), 1);
        assert_eq!(aggregation.groups()[0].predicates.len(), 2);
        assert_eq!(aggregation.groups()[0].counter, 2);
    }

    #[test]
    fn test_census_blend_and_final_ranking() {
        let registry = registry();
        let mut aggregation = Aggregation::new();
        aggregation.fold_result(
            &result(vec![relation(1.0, &[("director", 4)], &[("starring", 2)])]),
            &registry,
        );

        let census: PredicateCounts = [("director".to_string(), 10), ("runtime".to_string(), 5)].into();
        aggregation.fold_census(&census, &registry);

        let director = aggregation.groups().iter().find(|g| g.contains("director")).unwrap();
        assert_eq!(director.score, 1.0);
        let runtime = aggregation.groups().iter().find(|g| g.contains("runtime")).unwrap();
        assert_eq!(runtime.score, 0.5);

        let ranked = aggregation.finish(None);
        assert_eq!(ranked[0].score, 1.0);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(ranked.iter().all(|g| g.score > 0.0 && g.counter == 0));
    }

    #[test]
    fn test_finish_renormalizes_after_census() {
        let registry = registry();
        let mut aggregation = Aggregation::new();
        aggregation.observe("a", 1.0, &registry);
        aggregation.normalize();

        let census: PredicateCounts = [("b".to_string(), 10), ("a".to_string(), 1)].into();
        aggregation.fold_census(&census, &registry);
        // a = (1.0 + 0.1) / 2, b = 1.0
        let ranked = aggregation.finish(Some(1));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].predicates, vec!["b"]);
        assert_eq!(ranked[0].score, 1.0);
    }

    #[test]
    fn test_non_positive_groups_dropped() {
        let registry = registry();
        let mut aggregation = Aggregation::new();
        aggregation.fold_result(&result(vec![relation(0.0, &[("zero", 3)], &[])]), &registry);
        assert!(aggregation.finish(None).is_empty());
    }

    #[test]
    fn test_ranked_candidates() {
        let results = vec![result(vec![relation(1.0, &[("a", 1)], &[("b", 5)])])];
        let census: PredicateCounts = [("a".to_string(), 2), ("c".to_string(), 9)].into();
        assert_eq!(ranked_candidates(&results, &census), vec!["c", "b", "a"]);
    }
}
