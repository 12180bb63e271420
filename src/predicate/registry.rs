//! Persisted facts about predicate identity
//!
//! The registry remembers which predicates were judged identical, which
//! pairs were judged different and the subject counts already fetched. It is
//! created once per run, handed to every component that needs it and saved
//! through a [`DocumentStore`].
//!
//! Identical pairs are merged into their groups as soon as they are added,
//! so a predicate never belongs to more than one group.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{group_key, parse_key};
use crate::error::{Error, Result};
use crate::storage::{
    load_or_default, store_value, DocumentStore, COUNTS_KEY, DIFFERENT_PREDICATES_KEY,
    IDENTICAL_PREDICATES_KEY,
};

/// What is known about a pair of predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Unknown,
    Identical,
    Different,
}

/// Disjoint-set forest with path halving and union by rank
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}

/// Merge every set sharing a member into maximal disjoint groups
///
/// The output is sorted, so reducing an already reduced partition returns
/// it unchanged.
pub fn reduce_groups(groups: &[BTreeSet<String>]) -> Vec<BTreeSet<String>> {
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for member in groups.iter().flatten() {
        let next = index.len();
        index.entry(member.as_str()).or_insert(next);
    }

    let mut forest = DisjointSet::new(index.len());
    for group in groups {
        let mut members = group.iter().map(|m| index[m.as_str()]);
        if let Some(first) = members.next() {
            for other in members {
                forest.union(first, other);
            }
        }
    }

    let mut components: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
    for (member, &id) in &index {
        let root = forest.find(id);
        components
            .entry(root)
            .or_default()
            .insert((*member).to_string());
    }

    let mut reduced: Vec<BTreeSet<String>> = components.into_values().collect();
    reduced.sort();
    reduced
}

/// Unordered predicate pair, smaller member first
type Pair = (String, String);

fn pair(a: &str, b: &str) -> Pair {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Identical groups, different pairs and cached subject counts
pub struct SimilarityRegistry {
    store: Arc<dyn DocumentStore>,
    identical: Vec<BTreeSet<String>>,
    different: BTreeSet<Pair>,
    counts: BTreeMap<String, u64>,
    unsaved_different: usize,
    flush_every: usize,
}

impl std::fmt::Debug for SimilarityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityRegistry")
            .field("identical", &self.identical.len())
            .field("different", &self.different.len())
            .field("counts", &self.counts.len())
            .finish_non_exhaustive()
    }
}

impl SimilarityRegistry {
    /// Load the registry documents; missing or corrupt ones start empty
    pub fn load(store: Arc<dyn DocumentStore>, flush_every: usize) -> Result<Self> {
        let identical_keys: Vec<String> = load_or_default(store.as_ref(), IDENTICAL_PREDICATES_KEY)?;
        let different_keys: Vec<String> = load_or_default(store.as_ref(), DIFFERENT_PREDICATES_KEY)?;
        let counts: BTreeMap<String, u64> = load_or_default(store.as_ref(), COUNTS_KEY)?;

        let groups: Vec<BTreeSet<String>> = identical_keys
            .iter()
            .map(|key| parse_key(key).into_iter().collect::<BTreeSet<_>>())
            .filter(|group| group.len() > 1)
            .collect();

        let mut different = BTreeSet::new();
        for key in &different_keys {
            match parse_key(key).as_slice() {
                [a, b] if a != b => {
                    different.insert(pair(a, b));
                }
                _ => warn!(key, "Ignoring malformed different pair"),
            }
        }

        let mut registry = Self {
            store,
            identical: reduce_groups(&groups),
            different,
            counts,
            unsaved_different: 0,
            flush_every: flush_every.max(1),
        };
        registry.purge_contradicted();

        debug!(
            identical = registry.identical.len(),
            different = registry.different.len(),
            counts = registry.counts.len(),
            "Similarity registry loaded"
        );
        Ok(registry)
    }

    /// Canonical groups
    pub fn groups(&self) -> &[BTreeSet<String>] {
        &self.identical
    }

    /// Number of pairs known to differ
    pub fn different_len(&self) -> usize {
        self.different.len()
    }

    /// The full group a predicate belongs to
    pub fn find_identical(&self, predicate: &str) -> Option<&BTreeSet<String>> {
        self.identical.iter().find(|group| group.contains(predicate))
    }

    /// The group holding all given predicates (one or two)
    pub fn find_identical_among(&self, predicates: &[String]) -> Result<Option<&BTreeSet<String>>> {
        check_arity(predicates)?;
        Ok(match predicates {
            [] => None,
            [single] => self.find_identical(single),
            _ => self
                .identical
                .iter()
                .find(|group| predicates.iter().all(|p| group.contains(p))),
        })
    }

    /// Whether two predicates were judged different
    pub fn find_different(&self, predicates: &[String]) -> Result<bool> {
        check_arity(predicates)?;
        Ok(match predicates {
            [a, b] => self.different.contains(&pair(a, b)),
            _ => false,
        })
    }

    /// Current knowledge about a pair
    pub fn pair_state(&self, a: &str, b: &str) -> PairState {
        if self
            .identical
            .iter()
            .any(|group| group.contains(a) && group.contains(b))
        {
            PairState::Identical
        } else if self.different.contains(&pair(a, b)) {
            PairState::Different
        } else {
            PairState::Unknown
        }
    }

    /// Record two predicates as identical and persist the groups
    ///
    /// A predicate is never recorded as identical to itself.
    pub fn add_identical(&mut self, a: &str, b: &str) -> Result<()> {
        if a == b || self.pair_state(a, b) == PairState::Identical {
            return Ok(());
        }

        let mut merged: BTreeSet<String> = [a.to_string(), b.to_string()].into();
        self.identical.retain(|group| {
            if group.contains(a) || group.contains(b) {
                merged.extend(group.iter().cloned());
                false
            } else {
                true
            }
        });

        debug!(members = merged.len(), key = %group_key(&merged.iter().collect::<Vec<_>>()), "Identical group updated");
        let purged = self.purge_group(&merged);
        self.identical.push(merged);
        self.identical.sort();

        if purged {
            self.store_different()?;
        }
        self.store_identical()
    }

    /// Record two predicates as different; persisted in batches
    pub fn add_different(&mut self, a: &str, b: &str) -> Result<()> {
        if a == b || self.pair_state(a, b) == PairState::Identical {
            return Ok(());
        }

        if self.different.insert(pair(a, b)) {
            self.unsaved_different += 1;
            if self.unsaved_different >= self.flush_every {
                self.store_different()?;
            }
        }
        Ok(())
    }

    /// Cached subject count for a predicate or pair key
    pub fn cached_count(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Remember a subject count
    pub fn cache_count(&mut self, key: impl Into<String>, count: u64) {
        self.counts.insert(key.into(), count);
    }

    /// Collapse overlapping groups and persist the result
    pub fn reduce_identical(&mut self) -> Result<()> {
        let before = self.identical.len();
        self.identical = reduce_groups(&self.identical);
        if self.purge_contradicted() {
            self.store_different()?;
        }
        self.store_identical()?;

        info!(before, after = self.identical.len(), "Identical predicates reduced");
        Ok(())
    }

    /// Persist pending different pairs and the count cache
    pub fn flush(&mut self) -> Result<()> {
        self.store_different()?;
        self.store_counts()
    }

    pub fn store_identical(&self) -> Result<()> {
        let keys: Vec<String> = self
            .identical
            .iter()
            .map(|group| group_key(&group.iter().collect::<Vec<_>>()))
            .collect();
        store_value(self.store.as_ref(), IDENTICAL_PREDICATES_KEY, &keys)
    }

    pub fn store_different(&mut self) -> Result<()> {
        let keys: Vec<String> = self
            .different
            .iter()
            .map(|(a, b)| group_key(&[a, b]))
            .collect();
        store_value(self.store.as_ref(), DIFFERENT_PREDICATES_KEY, &keys)?;
        self.unsaved_different = 0;
        Ok(())
    }

    pub fn store_counts(&self) -> Result<()> {
        store_value(self.store.as_ref(), COUNTS_KEY, &self.counts)
    }

    /// Drop different pairs whose members share a group; true if any were dropped
    fn purge_contradicted(&mut self) -> bool {
        let groups = std::mem::take(&mut self.identical);
        let mut purged = false;
        for group in &groups {
            purged |= self.purge_group(group);
        }
        self.identical = groups;
        purged
    }

    /// Drop different pairs lying inside one group
    fn purge_group(&mut self, group: &BTreeSet<String>) -> bool {
        if self.different.is_empty() {
            return false;
        }
        let members: Vec<&String> = group.iter().collect();
        let mut purged = false;
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                purged |= self.different.remove(&pair(a, b));
            }
        }
        purged
    }
}

fn check_arity(predicates: &[String]) -> Result<()> {
    if predicates.len() > 2 {
        return Err(Error::UnsupportedArity {
            count: predicates.len(),
        });
    }
    Ok(())
}
