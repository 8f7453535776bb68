//! Recently searched cities, persisted across sessions.

use anyhow::{Context, Result};
use std::{collections::HashMap, fmt::Debug, fs, path::PathBuf};

/// Storage key holding the JSON-encoded history list.
pub const HISTORY_KEY: &str = "weatherSearchHistory";

/// Maximum number of remembered cities.
pub const MAX_ENTRIES: usize = 5;

/// Durable string key-value storage.
pub trait KeyValueStore: Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory: {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                Err(err).with_context(|| format!("Failed to remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Most-recent-first list of up to [`MAX_ENTRIES`] cities, unique ignoring case.
#[derive(Debug)]
pub struct HistoryStore<S> {
    store: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Absent or unreadable history reads as empty.
    pub fn list(&self) -> Vec<String> {
        let Some(raw) = self.store.get(HISTORY_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable search history");
                Vec::new()
            }
        }
    }

    /// Moves `city` to the front, dropping case-insensitive duplicates, and returns the new list.
    pub fn record(&mut self, city: &str) -> Vec<String> {
        let lowered = city.to_lowercase();
        let mut list = self.list();
        list.retain(|entry| entry.to_lowercase() != lowered);
        list.insert(0, city.to_string());
        list.truncate(MAX_ENTRIES);

        match serde_json::to_string(&list) {
            Ok(encoded) => {
                if let Err(err) = self.store.set(HISTORY_KEY, &encoded) {
                    tracing::warn!(error = %err, "failed to persist search history");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to encode search history"),
        }
        list
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(HISTORY_KEY)
    }
}
