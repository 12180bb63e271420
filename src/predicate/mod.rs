//! Predicate identity
//!
//! Deny-lists of predicates that carry no descriptive value, canonical keys
//! for predicate groups, the persisted similarity registry and the engine
//! deciding which predicates are statistically the same.

pub mod registry;
pub mod similarity;

pub use registry::{reduce_groups, PairState, SimilarityRegistry};
pub use similarity::{SimilarityEngine, SimilarityReport};

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::utils::local_name;

/// Structural predicates (redirects, identifiers, cross links)
pub const NO_SENSE_PREDICATES: &[&str] = &[
    "http://xmlns.com/foaf/0.1/primaryTopic",
    "http://dbpedia.org/ontology/wikiPageRedirects",
    "http://dbpedia.org/ontology/wikiPageDisambiguates",
    "http://dbpedia.org/ontology/wikiPageRevisionID",
    "http://dbpedia.org/ontology/wikiPageID",
    "http://www.w3.org/2002/07/owl#sameAs",
    "http://www.w3.org/2000/01/rdf-schema#seeAlso",
    "http://www.w3.org/2002/07/owl#differentFrom",
    "http://dbpedia.org/ontology/wikiPageExternalLink",
    "http://xmlns.com/foaf/0.1/depiction",
];

/// Boilerplate predicates every resource has (labels, names, abstracts)
pub const COMMON_PREDICATES: &[&str] = &[
    "http://dbpedia.org/ontology/thumbnail",
    "http://xmlns.com/foaf/0.1/name",
    "http://www.w3.org/2000/01/rdf-schema#label",
    "http://dbpedia.org/property/name",
    "http://dbpedia.org/property/commonName",
    "http://dbpedia.org/property/title",
    "http://www.w3.org/2000/01/rdf-schema#comment",
    "http://dbpedia.org/ontology/abstract",
];

/// Decides which predicates are never counted
#[derive(Debug, Clone, Default)]
pub struct PredicateFilter {
    extra: HashSet<String>,
}

impl PredicateFilter {
    /// Built-in deny-lists extended with `extra`
    pub fn new(extra: impl IntoIterator<Item = String>) -> Self {
        Self {
            extra: extra.into_iter().collect(),
        }
    }

    /// Whether a predicate is on a deny-list
    pub fn is_ignored(&self, predicate: &str) -> bool {
        NO_SENSE_PREDICATES.contains(&predicate)
            || COMMON_PREDICATES.contains(&predicate)
            || self.extra.contains(predicate)
    }
}

/// Order independent key of a predicate set: `<a><b>` over sorted unique members
pub fn group_key<S: AsRef<str>>(members: &[S]) -> String {
    let mut sorted: Vec<&str> = members.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.iter().map(|m| format!("<{m}>")).collect()
}

/// Members encoded in a group key
pub fn parse_key(key: &str) -> Vec<String> {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    let re = KEY_RE.get_or_init(|| Regex::new(r"<([^<>]+)>").expect("Invalid regex pattern"));

    re.captures_iter(key)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// DBpedia publishes many predicates twice, as `.../property/x` and `.../ontology/x`
pub fn is_property_ontology_twin(a: &str, b: &str) -> bool {
    if a == b || local_name(a) != local_name(b) {
        return false;
    }
    let key = group_key(&[a, b]);
    key.contains("property/") && key.contains("ontology/")
}
