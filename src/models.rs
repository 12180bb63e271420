// Core data structures for the knowledge base miner

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Predicate URI -> frequency within an entity class
pub type PredicateCounts = BTreeMap<String, u64>;

/// Entity class -> ranked predicate groups
pub type KnowledgeBase = BTreeMap<String, Vec<PredicateGroup>>;

/// Entity class -> literal predicate -> number of resources using it
pub type LiteralCensus = BTreeMap<String, PredicateCounts>;

/// One entity mention found in the abstract of a studied resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub link: String,
    pub anchor: String,
    pub begin_index: u64,
    pub end_index: u64,
    pub section_id: String, // e.g. "paragraph_0_419"

    /// Position weight, filled once sections are known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Weak predicates: anything pointing at `link`
    #[serde(default)]
    pub properties: PredicateCounts,

    /// Strict predicates: directly connecting the resource and `link`
    #[serde(default)]
    pub strict_properties: PredicateCounts,
}

impl RelationRecord {
    /// Weight used during aggregation (unweighted relations contribute nothing)
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }
}

/// A document section as it appears in section identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    #[serde(rename = "type")]
    pub section_type: String,
    pub from: u64,
    pub to: u64,
    #[serde(default)]
    pub degradation: f64,
}

impl SectionInfo {
    /// Parse `<type>_<from>_<to>`; degradation starts at 1.0
    pub fn parse(section_id: &str) -> Result<Self> {
        static SECTION_RE: OnceLock<Regex> = OnceLock::new();
        let re = SECTION_RE
            .get_or_init(|| Regex::new(r"^(.+)_(\d+)_(\d+)$").expect("Invalid regex pattern"));

        let invalid = || Error::InvalidSection {
            section_id: section_id.to_string(),
        };

        let caps = re.captures(section_id).ok_or_else(invalid)?;
        let from = caps[2].parse::<u64>().map_err(|_| invalid())?;
        let to = caps[3].parse::<u64>().map_err(|_| invalid())?;

        Ok(Self {
            section_type: caps[1].to_string(),
            from,
            to,
            degradation: 1.0,
        })
    }
}

/// Seconds spent in each mining phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessTimes {
    pub nif_find: f64,
    pub relations_find: f64,
}

/// Mining result for one resource; the unit of persistence and resumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceResult {
    pub resource_uri: String,
    pub entity_type: String,
    pub process_times: ProcessTimes,
    #[serde(default)]
    pub sections: Vec<SectionInfo>,
    pub relations: Vec<RelationRecord>,
    pub mined_at: DateTime<Utc>,
}

impl ResourceResult {
    /// Every predicate seen in this result with its summed frequency
    pub fn predicate_totals(&self) -> PredicateCounts {
        let mut totals = PredicateCounts::new();
        for relation in &self.relations {
            for (predicate, count) in relation
                .strict_properties
                .iter()
                .chain(relation.properties.iter())
            {
                *totals.entry(predicate.clone()).or_insert(0) += count;
            }
        }
        totals
    }
}

/// Score bucket for one canonical group of predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateGroup {
    pub score: f64,

    /// Sorted, unique member URIs
    pub predicates: Vec<String>,

    /// Observations folded into the running mean; never persisted
    #[serde(skip)]
    pub counter: u32,
}

impl PredicateGroup {
    /// Empty group over the given members
    pub fn new(mut members: Vec<String>) -> Self {
        members.sort();
        members.dedup();
        Self {
            score: 0.0,
            predicates: members,
            counter: 0,
        }
    }

    /// Check membership
    pub fn contains(&self, predicate: &str) -> bool {
        self.predicates.iter().any(|p| p == predicate)
    }

    /// Fold one weighted observation into the running mean
    pub fn observe(&mut self, value: f64) {
        let total = self.score * f64::from(self.counter) + value;
        self.counter += 1;
        self.score = total / f64::from(self.counter);
    }
}
