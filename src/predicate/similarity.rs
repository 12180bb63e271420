//! Statistical predicate similarity
//!
//! Two predicates are considered the same when most subjects using one of
//! them also use the other with the same object:
//!
//! ```text
//! x = |{s : s p1 ?o}|    y = |{s : s p2 ?o}|    z = |{s : s p1 ?o . s p2 ?o}|
//! similarity = z / max(x, y)
//! ```
//!
//! Pairs at or above the identical limit join an identical group, the rest
//! are recorded as different. Every decision is final.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::registry::{PairState, SimilarityRegistry};
use super::{group_key, is_property_ontology_twin};
use crate::config::SimilarityConfig;
use crate::error::{Error, Result};
use crate::sparql::GraphQueryClient;

/// Outcome of one identification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimilarityReport {
    /// Pairs generated from the candidates
    pub pairs: usize,

    /// Pairs resolved by an earlier run
    pub already_known: usize,

    /// Property/ontology twins marked identical without querying
    pub twins: usize,

    /// Pairs measured identical
    pub identical: usize,

    /// Pairs measured different
    pub different: usize,
}

/// Decides predicate identity against the knowledge graph
pub struct SimilarityEngine {
    client: Arc<dyn GraphQueryClient>,
    identical_limit: f64,
    max_candidates: usize,
}

impl SimilarityEngine {
    pub fn new(client: Arc<dyn GraphQueryClient>, config: &SimilarityConfig) -> Self {
        Self {
            client,
            identical_limit: config.identical_limit,
            max_candidates: config.max_candidates,
        }
    }

    /// Similarity ratio of two subject counts
    pub fn similarity(x: u64, y: u64, z: u64) -> f64 {
        let max = x.max(y);
        if max == 0 {
            0.0
        } else {
            z as f64 / max as f64
        }
    }

    /// Compare every pair among the most frequent candidates
    ///
    /// `candidates` must be ordered by descending importance; only the first
    /// `max_candidates` distinct predicates take part.
    pub async fn identify_identical(
        &self,
        registry: &mut SimilarityRegistry,
        candidates: &[String],
    ) -> Result<SimilarityReport> {
        let mut seen = HashSet::new();
        let predicates: Vec<&String> = candidates
            .iter()
            .filter(|p| seen.insert(p.as_str()))
            .take(self.max_candidates)
            .collect();

        let total = predicates.len() * predicates.len().saturating_sub(1) / 2;
        let mut report = SimilarityReport {
            pairs: total,
            ..Default::default()
        };

        info!(candidates = predicates.len(), pairs = total, "Identifying identical predicates");

        let outcome = self
            .compare_all(registry, &predicates, &mut report, total)
            .await;
        // counts fetched before a failure are kept for the next run
        let flushed = registry.flush();
        outcome?;
        flushed?;

        info!(?report, "Identification finished");
        Ok(report)
    }

    async fn compare_all(
        &self,
        registry: &mut SimilarityRegistry,
        predicates: &[&String],
        report: &mut SimilarityReport,
        total: usize,
    ) -> Result<()> {
        let progress_step = (total / 10).max(1);
        let mut done = 0;
        for (i, a) in predicates.iter().enumerate() {
            for b in &predicates[i + 1..] {
                match self.resolve_pair(registry, a, b).await? {
                    Resolution::Known => report.already_known += 1,
                    Resolution::Twin => report.twins += 1,
                    Resolution::Measured(PairState::Identical) => report.identical += 1,
                    Resolution::Measured(_) => report.different += 1,
                }

                done += 1;
                if done % progress_step == 0 {
                    info!(done, total, "Similarity progress");
                }
            }
        }
        Ok(())
    }

    /// Classify one pair of predicates, querying the graph when unresolved
    ///
    /// A predicate paired with itself stays `Unknown` and is never recorded.
    pub async fn classify(
        &self,
        registry: &mut SimilarityRegistry,
        predicates: &[String],
    ) -> Result<PairState> {
        match predicates {
            [a, b] if a == b => Ok(PairState::Unknown),
            [a, b] => {
                self.resolve_pair(registry, a, b).await?;
                Ok(registry.pair_state(a, b))
            }
            [_] | [] => Ok(PairState::Unknown),
            _ => Err(Error::UnsupportedArity {
                count: predicates.len(),
            }),
        }
    }

    async fn resolve_pair(
        &self,
        registry: &mut SimilarityRegistry,
        a: &str,
        b: &str,
    ) -> Result<Resolution> {
        if a == b || registry.pair_state(a, b) != PairState::Unknown {
            return Ok(Resolution::Known);
        }

        if is_property_ontology_twin(a, b) {
            registry.add_identical(a, b)?;
            return Ok(Resolution::Twin);
        }

        let x = self.count(registry, a, &[a]).await?;
        let y = self.count(registry, b, &[b]).await?;
        let z = self.count(registry, &group_key(&[a, b]), &[a, b]).await?;

        let similarity = Self::similarity(x, y, z);
        let state = if similarity >= self.identical_limit {
            registry.add_identical(a, b)?;
            PairState::Identical
        } else {
            registry.add_different(a, b)?;
            PairState::Different
        };

        debug!(a, b, x, y, z, similarity, ?state, "Pair classified");
        Ok(Resolution::Measured(state))
    }

    async fn count(&self, registry: &mut SimilarityRegistry, key: &str, predicates: &[&str]) -> Result<u64> {
        if let Some(count) = registry.cached_count(key) {
            return Ok(count);
        }

        let predicates: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
        let count = self.client.count_subjects(&predicates).await?;
        registry.cache_count(key, count);
        Ok(count)
    }
}

enum Resolution {
    Known,
    Twin,
    Measured(PairState),
}
