//! Dataset provider backed by a directory of JSON files.
//!
//! Source `people` is the file `<root>/people.json`, holding a JSON array of
//! flat objects. The most recently read file is kept parsed in memory so that
//! chunk requests after the first do not re-read it; it is re-read when its
//! modification time changes.

use crate::error::ProviderError;
use crate::provider::{ChunkResponse, DatasetProvider};
use crate::table::JsonRecord;
use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::sync::Mutex;

const EXTENSION: &str = "json";

/// One loadable source, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub size_bytes: u64,
    /// Seconds since the Unix epoch
    pub modified: Option<u64>,
}

struct CachedSource {
    source: String,
    modified: Option<SystemTime>,
    records: Arc<Vec<JsonRecord>>,
}

pub struct DirectoryProvider {
    root: PathBuf,
    cache: Mutex<Option<CachedSource>>,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryProvider {
            root: root.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file behind `source`, rejecting identifiers that could
    /// escape the root directory.
    pub fn source_path(&self, source: &str) -> Result<PathBuf, ProviderError> {
        let valid = !source.is_empty()
            && !source.starts_with('.')
            && source
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '));
        if !valid {
            return Err(ProviderError::InvalidSource(source.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", source, EXTENSION)))
    }

    /// Every `*.json` source in the directory, newest first.
    pub async fn list_sources(&self) -> Result<Vec<SourceInfo>, ProviderError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut sources = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            sources.push(SourceInfo {
                name: name.to_string(),
                size_bytes: metadata.len(),
                modified: metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs()),
            });
        }
        sources.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        debug!("Listed {} sources in {}", sources.len(), self.root.display());
        Ok(sources)
    }

    /// Parsed records of `source`, or `None` when there is no such file.
    async fn records(&self, source: &str) -> Result<Option<Arc<Vec<JsonRecord>>>, ProviderError> {
        let path = self.source_path(source)?;
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = metadata.modified().ok();

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.source == source && cached.modified == modified {
                return Ok(Some(Arc::clone(&cached.records)));
            }
        }

        let bytes = fs::read(&path).await?;
        let rows: Vec<JsonValue> = serde_json::from_slice(&bytes)?;
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| match row {
                JsonValue::Object(map) => Ok(map),
                _ => Err(ProviderError::Malformed(format!(
                    "record {} of '{}' is not an object",
                    idx, source
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!("Read {} records from {}", records.len(), path.display());

        let records = Arc::new(records);
        *cache = Some(CachedSource {
            source: source.to_string(),
            modified,
            records: Arc::clone(&records),
        });
        Ok(Some(records))
    }
}

#[async_trait]
impl DatasetProvider for DirectoryProvider {
    async fn fetch_chunk(
        &self,
        source: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ChunkResponse, ProviderError> {
        let Some(records) = self.records(source).await? else {
            return Ok(ChunkResponse::failure("File not found"));
        };
        let start = offset.min(records.len());
        let end = offset.saturating_add(limit).min(records.len());
        Ok(ChunkResponse::ok(records[start..end].to_vec(), records.len(), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ChunkLoader, LoadSequencer};
    use crate::error::LoadError;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("recordview-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_source_ids_cannot_escape_root() {
        let provider = DirectoryProvider::new("/data");
        assert_eq!(provider.source_path("people").unwrap(), PathBuf::from("/data/people.json"));
        for bad in ["", "../etc/passwd", "a/b", ".hidden", r"a\b"] {
            assert!(matches!(provider.source_path(bad), Err(ProviderError::InvalidSource(_))));
        }
    }

    #[tokio::test]
    async fn test_serves_chunks_from_file() {
        let dir = scratch_dir("chunks");
        std::fs::write(
            dir.join("people.json"),
            r#"[{"Name": "John", "Age": 40}, {"Name": "Mary", "Age": 25}, {"Name": "Ann", "Age": null}]"#,
        )
        .unwrap();
        let provider = DirectoryProvider::new(&dir);

        assert_eq!(provider.probe("people").await.unwrap(), 3);
        let (records, total) = provider.fetch_chunk("people", 2, 10).await.unwrap().into_records().unwrap();
        assert_eq!(total, Some(3));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Name"], "Ann");

        let loader = ChunkLoader::new(Arc::new(provider)).with_chunk_size(2);
        let guard = LoadSequencer::new().next();
        let dataset = loader.load("people", &guard, |_| {}).await.unwrap();
        assert_eq!(dataset.columns(), &["Name", "Age"]);
        assert_eq!(dataset.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_files_fail() {
        let dir = scratch_dir("malformed");
        std::fs::write(dir.join("broken.json"), "[{\"a\": 1},").unwrap();
        std::fs::write(dir.join("scalars.json"), "[1, 2]").unwrap();
        let loader = ChunkLoader::new(Arc::new(DirectoryProvider::new(&dir)));
        let sequencer = LoadSequencer::new();

        let missing = loader.load("missing", &sequencer.next(), |_| {}).await;
        assert_eq!(
            missing.unwrap_err(),
            LoadError::Provider(ProviderError::Failed("File not found".to_string()))
        );
        let broken = loader.load("broken", &sequencer.next(), |_| {}).await;
        assert!(matches!(broken, Err(LoadError::Provider(ProviderError::Malformed(_)))));
        let scalars = loader.load("scalars", &sequencer.next(), |_| {}).await;
        assert!(matches!(scalars, Err(LoadError::Provider(ProviderError::Malformed(_)))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_lists_json_sources_newest_first() {
        let dir = scratch_dir("listing");
        std::fs::write(dir.join("older.json"), "[]").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.join("newer.json"), "[{}]").unwrap();

        let old_time = std::fs::File::options()
            .write(true)
            .open(dir.join("older.json"))
            .unwrap();
        old_time
            .set_modified(SystemTime::now() - std::time::Duration::from_secs(3600))
            .unwrap();

        let sources = DirectoryProvider::new(&dir).list_sources().await.unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "older"]);
        assert_eq!(sources[1].size_bytes, 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
