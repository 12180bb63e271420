//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use kbminer::nif::{render_group, NifMention};
use kbminer::predicate::group_key;
use kbminer::sparql::{GraphQueryClient, QueryResult, RankedResource};
use kbminer::utils::error::QueryError;

pub const DBR: &str = "http://dbpedia.org/resource/";
pub const DBO: &str = "http://dbpedia.org/ontology/";
pub const DBP: &str = "http://dbpedia.org/property/";

pub fn dbr(name: &str) -> String {
    format!("{DBR}{name}")
}

pub fn dbo(name: &str) -> String {
    format!("{DBO}{name}")
}

pub fn dbp(name: &str) -> String {
    format!("{DBP}{name}")
}

/// In-memory knowledge graph answering the miner's questions
#[derive(Default)]
pub struct FakeGraph {
    ranked: HashMap<String, Vec<RankedResource>>,
    between: HashMap<(String, String), Vec<String>>,
    by_object: HashMap<String, Vec<String>>,
    literals: HashMap<String, Vec<String>>,
    subject_counts: HashMap<String, u64>,
    failing_counts: HashSet<String>,
    class_counts: HashMap<(String, String), u64>,

    pub ranked_calls: AtomicUsize,
    pub between_calls: AtomicUsize,
    pub subject_count_calls: AtomicUsize,
    pub class_count_calls: AtomicUsize,
}

impl FakeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranked(mut self, entity_type: &str, resources: &[(&str, f64)]) -> Self {
        self.ranked.insert(
            entity_type.to_string(),
            resources
                .iter()
                .map(|(uri, rank)| RankedResource {
                    uri: uri.to_string(),
                    rank: *rank,
                })
                .collect(),
        );
        self
    }

    pub fn with_between(mut self, subject: &str, object: &str, predicates: &[&str]) -> Self {
        self.between.insert(
            (subject.to_string(), object.to_string()),
            predicates.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_by_object(mut self, object: &str, predicates: &[&str]) -> Self {
        self.by_object.insert(
            object.to_string(),
            predicates.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_literals(mut self, subject: &str, predicates: &[&str]) -> Self {
        self.literals.insert(
            subject.to_string(),
            predicates.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Subject count of one predicate or of a predicate pair
    pub fn with_subject_count(mut self, predicates: &[&str], count: u64) -> Self {
        self.subject_counts.insert(group_key(predicates), count);
        self
    }

    /// Subject count that keeps failing as if the endpoint were down
    pub fn with_failing_count(mut self, predicates: &[&str]) -> Self {
        self.failing_counts.insert(group_key(predicates));
        self
    }

    pub fn with_class_count(mut self, entity_type: &str, predicate: &str, count: u64) -> Self {
        self.class_counts
            .insert((entity_type.to_string(), predicate.to_string()), count);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphQueryClient for FakeGraph {
    async fn ranked_resources(&self, entity_type: &str, limit: usize) -> QueryResult<Vec<RankedResource>> {
        self.ranked_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .ranked
            .get(entity_type)
            .map(|r| r.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn predicates_by_object(&self, object: &str) -> QueryResult<Vec<String>> {
        Ok(self.by_object.get(object).cloned().unwrap_or_default())
    }

    async fn predicates_by_subject(&self, subject: &str, literal_only: bool) -> QueryResult<Vec<String>> {
        assert!(literal_only, "only literal predicates are requested by subject");
        Ok(self.literals.get(subject).cloned().unwrap_or_default())
    }

    async fn predicates_between(&self, subject: &str, object: &str) -> QueryResult<Vec<String>> {
        self.between_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .between
            .get(&(subject.to_string(), object.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn count_subjects(&self, predicates: &[String]) -> QueryResult<u64> {
        self.subject_count_calls.fetch_add(1, Ordering::SeqCst);
        let key = group_key(predicates);
        if self.failing_counts.contains(&key) {
            return Err(QueryError::RetriesExhausted {
                attempts: 15,
                last: Box::new(QueryError::ServerError(503)),
            });
        }
        Ok(self
            .subject_counts
            .get(&key)
            .copied()
            .unwrap_or(0))
    }

    async fn count_predicate_in_class(&self, entity_type: &str, predicate: &str) -> QueryResult<u64> {
        self.class_count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .class_counts
            .get(&(entity_type.to_string(), predicate.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

/// A mention of `link` in the abstract of `resource`
pub fn mention(resource: &str, link: &str, begin: u64, section: &str) -> NifMention {
    NifMention {
        resource_uri: dbr(resource),
        begin_index: begin,
        end_index: begin + link.len() as u64,
        section_id: section.to_string(),
        link: dbr(link),
        anchor: link.replace('_', " "),
    }
}

/// NIF dataset text with a header comment
pub fn nif_dataset(mentions: &[NifMention]) -> String {
    let mut out = String::from("# started 2016-10-20T12:00:00Z\n");
    for m in mentions {
        for line in render_group(m) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Write a NIF dataset to a temporary file
pub fn nif_file(mentions: &[NifMention]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp NIF file");
    file.write_all(nif_dataset(mentions).as_bytes())
        .expect("write temp NIF file");
    file
}
