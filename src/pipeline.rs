//! Mining pipeline
//!
//! [`EntitySummarizer`] sequences the whole batch job:
//!
//! ```text
//! ranked resources ──▶ NIF scan ──▶ enrich + weight ──▶ result documents
//!                                                            │
//! literal census ──────────────────────────────────────────▶ aggregate ──▶ knowledge base
//! ```
//!
//! Every step is resumable. A resource whose result document exists is not
//! mined again unless a reload is demanded.

use chrono::Utc;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::knowledge::{KnowledgeBaseAggregator, LiteralCensusBuilder};
use crate::models::{PredicateGroup, ProcessTimes, RelationRecord, ResourceResult};
use crate::nif::{NifMention, ResourceBatches};
use crate::predicate::{PredicateFilter, SimilarityEngine, SimilarityRegistry};
use crate::relations::{assign_weights, RelationEnricher};
use crate::sparql::GraphQueryClient;
use crate::storage::{load_required, result_key, store_value, DocumentStore};
use crate::utils::round_to;

/// A resource selected for mining
#[derive(Debug, Clone, PartialEq)]
pub struct TargetResource {
    pub uri: String,
    pub entity_type: String,
    pub rank: f64,
}

/// Summary of one NIF mining run
#[derive(Debug, Clone, Default)]
pub struct MiningReport {
    /// Resources selected by rank
    pub requested: usize,

    /// Resources skipped because a result already exists
    pub skipped: usize,

    /// Resources mined and stored
    pub mined: usize,

    /// Requested resources absent from the dataset
    pub not_found: Vec<String>,
}

/// Orchestrates mining, census and knowledge base construction
pub struct EntitySummarizer {
    config: Config,
    client: Arc<dyn GraphQueryClient>,
    store: Arc<dyn DocumentStore>,
    filter: PredicateFilter,
}

impl EntitySummarizer {
    pub fn new(config: Config, client: Arc<dyn GraphQueryClient>, store: Arc<dyn DocumentStore>) -> Self {
        let filter = PredicateFilter::new(config.mining.extra_ignored_predicates.iter().cloned());
        Self {
            config,
            client,
            store,
            filter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Best ranked resources of every class; a resource listed by several classes keeps the last
    pub async fn best_ranked_resources(&self, entity_types: &[String], count: usize) -> Result<Vec<TargetResource>> {
        let mut targets: Vec<TargetResource> = Vec::new();

        for entity_type in entity_types {
            for ranked in self.client.ranked_resources(entity_type, count).await? {
                let target = TargetResource {
                    uri: ranked.uri,
                    entity_type: entity_type.clone(),
                    rank: ranked.rank,
                };
                match targets.iter_mut().find(|t| t.uri == target.uri) {
                    Some(existing) => *existing = target,
                    None => targets.push(target),
                }
            }
        }

        Ok(targets)
    }

    /// Mine the NIF dataset for the best ranked resources of each class
    pub async fn mine_nif(&self, entity_types: &[String], count: usize, demand_reload: bool) -> Result<MiningReport> {
        let nif_path = self
            .config
            .storage
            .nif_path
            .clone()
            .ok_or_else(|| Error::config("storage.nif_path is required to mine the NIF dataset"))?;
        if !nif_path.is_file() {
            return Err(Error::InputNotFound { path: nif_path });
        }

        let targets = self.best_ranked_resources(entity_types, count).await?;
        let mut report = MiningReport {
            requested: targets.len(),
            ..Default::default()
        };

        let pending: HashMap<String, TargetResource> = targets
            .into_iter()
            .filter(|target| {
                let done = !demand_reload && self.store.exists(&result_key(&target.entity_type, &target.uri));
                if done {
                    report.skipped += 1;
                }
                !done
            })
            .map(|target| (target.uri.clone(), target))
            .collect();

        info!(
            nif = %nif_path.display(),
            requested = report.requested,
            skipped = report.skipped,
            "Mining NIF dataset"
        );
        if pending.is_empty() {
            return Ok(report);
        }

        let reader = BufReader::new(File::open(&nif_path)?);
        let mut batches = ResourceBatches::new(reader, pending.keys().cloned());
        let mut enricher = RelationEnricher::new(self.client.clone(), self.filter.clone());
        let mut started = Instant::now();

        while let Some(batch) = batches.next() {
            let batch = batch?;
            let nif_find = round_to(started.elapsed().as_secs_f64(), 2);

            let Some(target) = pending.get(&batch.resource_uri) else {
                continue;
            };
            info!(
                resource = %target.uri,
                mentions = batch.mentions.len(),
                nif_find,
                remaining = batches.pending().len(),
                "Resource found in NIF dataset"
            );

            self.mine_resource(&mut enricher, target, batch.mentions, nif_find)
                .await?;
            report.mined += 1;
            started = Instant::now();
        }

        report.not_found = batches.pending().iter().cloned().collect();
        report.not_found.sort();
        if !report.not_found.is_empty() {
            warn!(missing = report.not_found.len(), "Some resources were not found in the NIF dataset");
        }

        info!(mined = report.mined, "NIF mining finished");
        Ok(report)
    }

    /// Enrich, weight and store the mentions of one resource
    pub async fn mine_resource(
        &self,
        enricher: &mut RelationEnricher,
        target: &TargetResource,
        mentions: Vec<NifMention>,
        nif_find: f64,
    ) -> Result<ResourceResult> {
        let mut relations: Vec<RelationRecord> = mentions.into_iter().map(RelationRecord::from).collect();

        let started = Instant::now();
        enricher
            .enrich_all(&target.uri, &target.entity_type, &mut relations)
            .await?;
        let relations_find = round_to(started.elapsed().as_secs_f64(), 2);

        let sections = assign_weights(&mut relations)?;

        let result = ResourceResult {
            resource_uri: target.uri.clone(),
            entity_type: target.entity_type.clone(),
            process_times: ProcessTimes {
                nif_find,
                relations_find,
            },
            sections,
            relations,
            mined_at: Utc::now(),
        };

        store_value(
            self.store.as_ref(),
            &result_key(&target.entity_type, &target.uri),
            &result,
        )?;
        info!(resource = %target.uri, relations = result.relations.len(), relations_find, "Result stored");
        Ok(result)
    }

    /// Literal census of every class
    pub async fn generate_literal_census(&self, entity_types: &[String], count: usize) -> Result<()> {
        let builder = LiteralCensusBuilder::new(self.client.clone(), self.filter.clone());
        for entity_type in entity_types {
            let census = builder
                .collect_and_store(self.store.as_ref(), entity_type, count)
                .await?;
            info!(entity_type = %entity_type, predicates = census.len(), "Literal census stored");
        }
        Ok(())
    }

    fn aggregator(&self) -> KnowledgeBaseAggregator {
        let engine = SimilarityEngine::new(self.client.clone(), &self.config.similarity);
        KnowledgeBaseAggregator::new(self.store.clone(), engine, self.config.mining.knowledge_base_limit)
    }

    fn load_registry(&self) -> Result<SimilarityRegistry> {
        SimilarityRegistry::load(self.store.clone(), self.config.similarity.different_flush_every)
    }

    /// Build and store the knowledge base of one class
    pub async fn build_knowledge_base(&self, entity_type: &str, identify_identical: bool) -> Result<Vec<PredicateGroup>> {
        let mut registry = self.load_registry()?;
        self.aggregator()
            .build(entity_type, &mut registry, identify_identical)
            .await
    }

    /// Build and store the knowledge base of several classes with one registry
    pub async fn build_knowledge_bases(&self, entity_types: &[String], identify_identical: bool) -> Result<()> {
        let mut registry = self.load_registry()?;
        let aggregator = self.aggregator();
        for entity_type in entity_types {
            aggregator
                .build(entity_type, &mut registry, identify_identical)
                .await?;
        }
        Ok(())
    }

    /// Mine, take the census and build the knowledge base of every class
    pub async fn create_complete_knowledge_base(
        &self,
        entity_types: &[String],
        count: usize,
        demand_reload: bool,
        identify_identical: bool,
    ) -> Result<()> {
        self.mine_nif(entity_types, count, demand_reload).await?;
        self.generate_literal_census(entity_types, self.config.mining.literal_resource_count)
            .await?;
        self.build_knowledge_bases(entity_types, identify_identical)
            .await
    }

    /// Re-enrich stored results of the best ranked resources without reading the NIF dataset
    pub async fn refresh_results(&self, entity_types: &[String], count: usize) -> Result<usize> {
        let targets = self.best_ranked_resources(entity_types, count).await?;
        let mut enricher = RelationEnricher::new(self.client.clone(), self.filter.clone());
        let mut refreshed = 0;

        for target in &targets {
            let key = result_key(&target.entity_type, &target.uri);
            let Some(mut result) = load_required::<ResourceResult>(self.store.as_ref(), &key)? else {
                continue;
            };

            let started = Instant::now();
            enricher
                .enrich_all(&target.uri, &target.entity_type, &mut result.relations)
                .await?;
            result.process_times.relations_find = round_to(started.elapsed().as_secs_f64(), 2);

            store_value(self.store.as_ref(), &key, &result)?;
            info!(resource = %target.uri, relations = result.relations.len(), "Result refreshed");
            refreshed += 1;
        }

        Ok(refreshed)
    }

    /// Collapse overlapping identical groups; returns the number of groups
    pub fn reduce_identical(&self) -> Result<usize> {
        let mut registry = self.load_registry()?;
        registry.reduce_identical()?;
        Ok(registry.groups().len())
    }
}
