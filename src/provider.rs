//! Dataset providers.
//!
//! A provider is the backend that owns the records. The engine only ever asks
//! it for one bounded chunk at a time; the answer is the same JSON envelope
//! the conversion backend emits:
//!
//! ```json
//! {"success": true, "data": [{...}], "total_rows": 2500, "chunk_start": 0, "chunk_size": 1000}
//! ```

use crate::error::ProviderError;
use crate::table::JsonRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;

/// Number of records requested by the row-count probe.
pub const PROBE_LIMIT: usize = 1;

/// Response envelope of a chunk request.
///
/// An answer with an `error` field, or with `success` false, is a failure even
/// when it carries data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<JsonRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

impl ChunkResponse {
    /// A successful chunk.
    pub fn ok(data: Vec<JsonRecord>, total_rows: usize, chunk_start: usize) -> Self {
        let chunk_size = data.len();
        ChunkResponse {
            success: true,
            data: Some(data),
            error: None,
            total_rows: Some(total_rows),
            chunk_start: Some(chunk_start),
            chunk_size: Some(chunk_size),
        }
    }

    /// A failed request.
    pub fn failure(message: impl Into<String>) -> Self {
        ChunkResponse {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Parse a raw JSON answer.
    pub fn from_json(text: &str) -> Result<Self, ProviderError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Turn the envelope into its records, or the failure it reports.
    pub fn into_records(self) -> Result<(Vec<JsonRecord>, Option<usize>), ProviderError> {
        if let Some(message) = self.error {
            return Err(ProviderError::Failed(message));
        }
        if !self.success {
            return Err(ProviderError::Failed("request was not successful".to_string()));
        }
        match self.data {
            Some(data) => Ok((data, self.total_rows)),
            None => Err(ProviderError::Malformed("response carries no data".to_string())),
        }
    }
}

/// Backend that serves a dataset in chunks.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Fetch up to `limit` records starting at `offset`.
    async fn fetch_chunk(
        &self,
        source: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ChunkResponse, ProviderError>;

    /// Learn the total row count of a source.
    async fn probe(&self, source: &str) -> Result<usize, ProviderError> {
        let (_, total_rows) = self.fetch_chunk(source, 0, PROBE_LIMIT).await?.into_records()?;
        total_rows
            .ok_or_else(|| ProviderError::Malformed("probe response has no total_rows".to_string()))
    }
}

/// Provider holding its sources in memory.
///
/// Used by tests, benches and demos. A source can be marked as failing so
/// that every request against it reports an error.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    sources: HashMap<String, Vec<JsonRecord>>,
    failing: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<(String, usize, usize)>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source from JSON objects. Non-object values are skipped.
    pub fn with_source(mut self, source: &str, rows: Vec<JsonValue>) -> Self {
        let records = rows
            .into_iter()
            .filter_map(|row| match row {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.sources.insert(source.to_string(), records);
        self
    }

    /// Make every request against `source` fail with `message`.
    pub fn fail_source(&self, source: &str, message: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(source.to_string(), message.to_string());
        }
    }

    /// Requests served so far as `(source, offset, limit)`.
    pub fn requests(&self) -> Vec<(String, usize, usize)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn chunk(&self, source: &str, offset: usize, limit: usize) -> ChunkResponse {
        if let Some(message) = self.failing.lock().ok().and_then(|f| f.get(source).cloned()) {
            return ChunkResponse::failure(message);
        }
        match self.sources.get(source) {
            Some(records) => {
                let start = offset.min(records.len());
                let end = offset.saturating_add(limit).min(records.len());
                ChunkResponse::ok(records[start..end].to_vec(), records.len(), offset)
            }
            None => ChunkResponse::failure("File not found"),
        }
    }
}

#[async_trait]
impl DatasetProvider for MemoryProvider {
    async fn fetch_chunk(
        &self,
        source: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ChunkResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((source.to_string(), offset, limit));
        }
        Ok(self.chunk(source, offset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_backend_envelope() {
        let text = r#"{"success": true, "data": [{"id": 1}], "total_rows": 10, "chunk_start": 0, "chunk_size": 1}"#;
        let response = ChunkResponse::from_json(text).unwrap();
        let (records, total) = response.into_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(total, Some(10));
    }

    #[test]
    fn test_error_envelope_without_success_flag() {
        let response = ChunkResponse::from_json(r#"{"error": "File not found"}"#).unwrap();
        assert_eq!(
            response.into_records().unwrap_err(),
            ProviderError::Failed("File not found".to_string())
        );
    }

    #[test]
    fn test_unsuccessful_envelope_is_failure() {
        let response = ChunkResponse::from_json(r#"{"success": false, "data": []}"#).unwrap();
        assert!(matches!(response.into_records(), Err(ProviderError::Failed(_))));
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(matches!(
            ChunkResponse::from_json("not json"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_provider_slices_and_probes() {
        let provider = MemoryProvider::new()
            .with_source("s", (0..5).map(|i| json!({"id": i})).collect());

        assert_eq!(provider.probe("s").await.unwrap(), 5);

        let response = provider.fetch_chunk("s", 3, 10).await.unwrap();
        let (records, _) = response.into_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], json!(3));

        assert_eq!(provider.requests(), vec![("s".to_string(), 0, 1), ("s".to_string(), 3, 10)]);
    }

    #[tokio::test]
    async fn test_memory_provider_unknown_source() {
        let provider = MemoryProvider::new();
        assert_eq!(
            provider.probe("missing").await.unwrap_err(),
            ProviderError::Failed("File not found".to_string())
        );
    }
}
