//! JSON document persistence
//!
//! Records are kept in memory in insertion order, upserted by key and written
//! out as a pretty-printed JSON array. Writes go to a sibling temp file that is
//! then renamed over the target, so a crash never leaves a truncated file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{Error, Result};

/// A record addressable by a unique key
pub trait KeyedRecord {
    /// Unique key (SKU or URL)
    fn key(&self) -> String;

    /// Whether the record documents a failed attempt
    fn is_failure(&self) -> bool {
        false
    }
}

/// Destination for batch results
#[async_trait]
pub trait RecordSink<R: Send>: Send {
    /// Add or replace a record
    fn upsert(&mut self, record: R);

    /// Persist everything recorded so far
    async fn save(&mut self) -> Result<()>;
}

/// In-memory sink, mostly useful in tests
#[async_trait]
impl<R: Send> RecordSink<R> for Vec<R> {
    fn upsert(&mut self, record: R) {
        self.push(record);
    }

    async fn save(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Ordered record set backed by a JSON array file
#[derive(Debug)]
pub struct JsonDocumentStore<R> {
    path: PathBuf,
    records: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R> JsonDocumentStore<R>
where
    R: KeyedRecord + Serialize + DeserializeOwned + Send + Sync,
{
    /// Open `path`, loading existing records if the file exists.
    ///
    /// An unreadable or malformed file is an error rather than a fresh start,
    /// so earlier progress is never overwritten.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records: Vec<R> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::storage(format!(
                    "Existing output {} is not a record array: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing output at {}, starting fresh", path.display());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut store = Self {
            path,
            records: Vec::with_capacity(records.len()),
            index: HashMap::new(),
        };
        for record in records {
            store.upsert(record);
        }

        if !store.records.is_empty() {
            info!(
                "Loaded {} existing records from {}",
                store.records.len(),
                store.path.display()
            );
        }
        Ok(store)
    }

    /// File backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Insert a record, replacing any record with the same key in place.
    pub fn upsert(&mut self, record: R) {
        let key = record.key();
        match self.index.get(&key) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Keys that a new run should skip.
    ///
    /// Failed records are included unless `retry_failed` is set.
    pub fn resume_keys(&self, retry_failed: bool) -> HashSet<String> {
        self.records
            .iter()
            .filter(|r| !(retry_failed && r.is_failure()))
            .map(KeyedRecord::key)
            .collect()
    }

    /// Number of failed records
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failure()).count()
    }

    /// Write all records to disk.
    pub async fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.records).await?;
        debug!("Saved {} records to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl<R> RecordSink<R> for JsonDocumentStore<R>
where
    R: KeyedRecord + Serialize + DeserializeOwned + Send + Sync,
{
    fn upsert(&mut self, record: R) {
        JsonDocumentStore::upsert(self, record);
    }

    async fn save(&mut self) -> Result<()> {
        JsonDocumentStore::save(self).await
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| Error::storage(format!("Invalid output path: {}", path.display())))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, &json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        url: String,
        #[serde(default)]
        error: Option<String>,
    }

    impl KeyedRecord for Row {
        fn key(&self) -> String {
            self.url.clone()
        }

        fn is_failure(&self) -> bool {
            self.error.is_some()
        }
    }

    fn row(url: &str, error: Option<&str>) -> Row {
        Row {
            url: url.to_string(),
            error: error.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonDocumentStore::<Row>::open(dir.path().join("out.json"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.json");

        let mut store = JsonDocumentStore::<Row>::open(&path).await.unwrap();
        store.upsert(row("b", None));
        store.upsert(row("a", Some("timeout")));
        store.save().await.unwrap();

        let reloaded = JsonDocumentStore::<Row>::open(&path).await.unwrap();
        assert_eq!(reloaded.records(), &[row("b", None), row("a", Some("timeout"))]);
        assert!(!path.with_file_name("out.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonDocumentStore::<Row>::open(dir.path().join("out.json"))
            .await
            .unwrap();

        store.upsert(row("a", Some("boom")));
        store.upsert(row("b", None));
        store.upsert(row("a", None));

        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0], row("a", None));
        assert_eq!(store.get("a"), Some(&row("a", None)));
    }

    #[tokio::test]
    async fn test_resume_keys_with_and_without_failures() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonDocumentStore::<Row>::open(dir.path().join("out.json"))
            .await
            .unwrap();
        store.upsert(row("ok", None));
        store.upsert(row("bad", Some("selector missing")));

        let all = store.resume_keys(false);
        assert!(all.contains("ok") && all.contains("bad"));

        let retry = store.resume_keys(true);
        assert!(retry.contains("ok"));
        assert!(!retry.contains("bad"));
        assert_eq!(store.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_existing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        tokio::fs::write(&path, b"{ not an array").await.unwrap();

        let err = JsonDocumentStore::<Row>::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
