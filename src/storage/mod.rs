//! Document persistence
//!
//! Every artifact the miner produces is a JSON document addressed by a key:
//! the knowledge base, the literal census, the similarity registries and one
//! result document per mined resource. [`DocumentStore`] hides where the
//! documents live; [`JsonFileStore`] keeps them as files, [`MemoryStore`]
//! keeps them in memory.

pub mod json_store;

pub use json_store::JsonFileStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::utils::{local_name, sanitize_filename};

/// Entity class -> ranked predicate groups
pub const KNOWLEDGE_BASE_KEY: &str = "knowledge_base";

/// Entity class -> literal predicate census
pub const GLOBAL_STATISTIC_KEY: &str = "global_statistic";

/// Canonical identical predicate groups
pub const IDENTICAL_PREDICATES_KEY: &str = "identical_predicates";

/// Pairs of predicates known to differ
pub const DIFFERENT_PREDICATES_KEY: &str = "different_predicates";

/// Cached subject counts per predicate or predicate pair
pub const COUNTS_KEY: &str = "counts";

/// Key of the result document for one resource of one class
///
/// `http://dbpedia.org/ontology/Film` + `http://dbpedia.org/resource/Captain_EO`
/// gives `Film/Captain_EO`.
pub fn result_key(entity_type: &str, resource_uri: &str) -> String {
    format!(
        "{}/{}",
        local_name(entity_type),
        sanitize_filename(local_name(resource_uri))
    )
}

/// Prefix shared by all result documents of one class
pub fn result_prefix(entity_type: &str) -> String {
    format!("{}/", local_name(entity_type))
}

/// Key-addressed JSON document storage
pub trait DocumentStore: Send + Sync {
    /// Load a document; missing documents load as `Value::Null`
    fn load(&self, key: &str) -> Result<Value>;

    /// Replace a document
    fn store(&self, key: &str, document: &Value) -> Result<()>;

    /// Whether a document exists
    fn exists(&self, key: &str) -> bool;

    /// Keys starting with `prefix`, sorted
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Merge a partial document into the stored one
    ///
    /// Objects are merged shallowly, top-level keys of `partial` win.
    /// Anything else replaces the stored document.
    fn merge(&self, key: &str, partial: Value) -> Result<()> {
        let merged = match (self.load(key)?, partial) {
            (Value::Object(mut existing), Value::Object(update)) => {
                existing.extend(update);
                Value::Object(existing)
            }
            (_, replacement) => replacement,
        };
        self.store(key, &merged)
    }
}

/// Load and deserialize a document, falling back to the default
///
/// Documents with an unexpected shape are treated as absent.
pub fn load_or_default<T>(store: &dyn DocumentStore, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let document = store.load(key)?;
    if document.is_null() {
        return Ok(T::default());
    }

    match serde_json::from_value(document) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding document with unexpected shape");
            Ok(T::default())
        }
    }
}

/// Load and deserialize a document that must be present
pub fn load_required<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Result<Option<T>> {
    let document = store.load(key)?;
    if document.is_null() {
        return Ok(None);
    }
    serde_json::from_value(document)
        .map(Some)
        .map_err(|e| Error::storage(key, e.to_string()))
}

/// Serialize and store a document
pub fn store_value<T: Serialize + ?Sized>(store: &dyn DocumentStore, key: &str, value: &T) -> Result<()> {
    let document = serde_json::to_value(value)?;
    store.store(key, &document)
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn documents(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.documents
            .lock()
            .map_err(|_| Error::other("memory store lock poisoned"))
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Value> {
        Ok(self.documents()?.get(key).cloned().unwrap_or(Value::Null))
    }

    fn store(&self, key: &str, document: &Value) -> Result<()> {
        self.documents()?.insert(key.to_string(), document.clone());
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.documents()
            .map(|docs| docs.contains_key(key))
            .unwrap_or(false)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .documents()?
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
