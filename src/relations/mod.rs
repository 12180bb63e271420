//! Relation enrichment and weighting

pub mod enrich;
pub mod weight;

pub use enrich::{EnrichedPredicates, RelationEnricher};
pub use weight::{assign_weights, SectionWeightCalculator};
