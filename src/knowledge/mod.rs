//! Knowledge base construction
//!
//! - [`census`] - literal predicate counts per entity class
//! - [`aggregator`] - weighted, deduplicated predicate ranking per class

pub mod aggregator;
pub mod census;

pub use aggregator::{ranked_candidates, Aggregation, KnowledgeBaseAggregator};
pub use census::{census_for, LiteralCensusBuilder};
