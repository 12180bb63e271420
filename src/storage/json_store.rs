//! JSON file backed document store
//!
//! Key `a/b` lives at `<base_dir>/a/b.json`. Writes go to a temporary file
//! which is then renamed over the target, so a crash never leaves a
//! half-written document behind.

use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::DocumentStore;
use crate::error::{Error, Result};

const EXTENSION: &str = "json";

/// Document store keeping one JSON file per key
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    /// Open an existing directory
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        if !base_dir.is_dir() {
            return Err(Error::StorageDirectoryNotFound { path: base_dir });
        }
        Ok(Self { base_dir })
    }

    /// Open a directory, creating it first when missing
    pub fn open_or_create(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Self::open(base_dir)
    }

    /// Base directory of the store
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File path of a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.{EXTENSION}"))
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_keys(&path, keys)?;
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Ok(relative) = path.with_extension("").strip_prefix(&self.base_dir) {
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                keys.push(key);
            }
        }
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Value> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Value::Null),
            Err(e) => return Err(Error::storage(key, e.to_string())),
        };

        match serde_json::from_str(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "Discarding corrupt document");
                Ok(Value::Null)
            }
        }
    }

    fn store(&self, key: &str, document: &Value) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(key, e.to_string()))?;
        }

        let temp_path = path.with_extension(format!("{EXTENSION}.tmp"));
        let file = File::create(&temp_path).map_err(|e| Error::storage(key, e.to_string()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer
            .flush()
            .map_err(|e| Error::storage(key, e.to_string()))?;

        fs::rename(&temp_path, &path).map_err(|e| Error::storage(key, e.to_string()))?;

        debug!(key, path = %path.display(), "Document stored");
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(&self.base_dir, &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        assert!(matches!(
            JsonFileStore::open(&missing),
            Err(Error::StorageDirectoryNotFound { .. })
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn test_store_and_load_nested_key() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path()).unwrap();

        store.store("Film/Captain_EO", &json!({"relations": []})).unwrap();

        assert!(temp.path().join("Film").join("Captain_EO.json").is_file());
        assert!(store.exists("Film/Captain_EO"));
        assert_eq!(
            store.load("Film/Captain_EO").unwrap(),
            json!({"relations": []})
        );
        // no temp file left behind
        assert!(!temp.path().join("Film").join("Captain_EO.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_document_loads_as_null() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("counts.json"), "{\"truncated\": ").unwrap();

        let store = JsonFileStore::open(temp.path()).unwrap();
        assert_eq!(store.load("counts").unwrap(), Value::Null);
        assert_eq!(store.load("missing").unwrap(), Value::Null);
    }

    #[test]
    fn test_keys_walks_subdirectories() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open_or_create(temp.path().join("results")).unwrap();

        store.store("Film/A", &json!({})).unwrap();
        store.store("Film/B", &json!({})).unwrap();
        store.store("Person/C", &json!({})).unwrap();
        store.store("knowledge_base", &json!({})).unwrap();
        fs::write(store.base_dir().join("Film").join("notes.txt"), "x").unwrap();

        assert_eq!(store.keys("Film/").unwrap(), vec!["Film/A", "Film/B"]);
        assert_eq!(store.keys("").unwrap().len(), 4);
    }
}
