/// RecordView - Chunked Record Browsing Engine
///
/// Loads large record sets from a provider in bounded chunks and serves a
/// filtered, sorted, column-projected and paginated view of them. Wildcard
/// and per-column queries, hit highlighting and record detail are evaluated
/// in memory over index mappings into the loaded dataset.

pub mod value;
pub mod table;
pub mod provider;
pub mod loader;
pub mod columns;
pub mod pattern;
pub mod query;
pub mod sort;
pub mod highlight;
pub mod view;
pub mod error;

pub use value::FieldValue;
pub use table::{Dataset, DatasetBuilder, JsonRecord, Record, Schema};
pub use provider::{ChunkResponse, DatasetProvider, MemoryProvider, PROBE_LIMIT};
pub use loader::{ChunkLoader, LoadGuard, LoadProgress, LoadSequencer, CHUNK_SIZE};
pub use columns::ColumnRegistry;
pub use pattern::WildcardPattern;
pub use query::{filter, CompiledQuery, Criterion, MatchMode, Operator, Query};
pub use sort::{sort_indices, sorted, SortKey, SortOrder};
pub use highlight::{mark_spans, HighlightSpan, Highlighter};
pub use view::{
    DetailField, LoadOutcome, LoadStatus, LoadTicket, RecordDetail, RenderedCell, RenderedRow,
    ViewCoordinator, ViewSnapshot, PAGE_SIZE,
};
pub use error::{LoadError, ProviderError, QueryError, ViewError};

// WebSocket server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod directory;
#[cfg(feature = "server")]
pub mod messages;
#[cfg(feature = "server")]
pub mod websocket;
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn inmates(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "TDCJ": format!("{:08}", i + 1),
                    "Name": if i % 3 == 0 { format!("Johnson {}", i) } else { format!("Smith {}", i) },
                    "Age": 20 + (i % 50),
                    "Unit": if i % 7 == 0 { Value::Null } else { json!("Walls") },
                })
            })
            .collect()
    }

    async fn load_into(
        view: &mut ViewCoordinator,
        loader: &ChunkLoader<MemoryProvider>,
        source: &str,
    ) -> (LoadOutcome, Vec<LoadProgress>) {
        let ticket = view.select_source(source).expect("new source");
        let mut events = Vec::new();
        let result = loader.load(source, ticket.guard(), |p| events.push(p)).await;
        for progress in &events {
            view.apply_progress(&ticket, *progress);
        }
        (view.complete_load(&ticket, result), events)
    }

    #[tokio::test]
    async fn test_complete_workflow() {
        let provider = Arc::new(MemoryProvider::new().with_source("inmates", inmates(2500)));
        let loader = ChunkLoader::new(Arc::clone(&provider));
        let mut view = ViewCoordinator::new();

        let (outcome, events) = load_into(&mut view, &loader, "inmates").await;
        assert_eq!(outcome, LoadOutcome::Applied);
        let percents: Vec<u32> = events.iter().map(LoadProgress::percent).collect();
        assert_eq!(percents, vec![33, 67, 100]);
        assert_eq!(view.status(), &LoadStatus::Ready);

        let snap = view.snapshot();
        assert_eq!(snap.total_records, 2500);
        assert_eq!(snap.total_pages, 50);
        assert_eq!(snap.columns, vec!["TDCJ", "Name", "Age", "Unit"]);

        // Every third record is a Johnson
        view.set_query(Query::simple("john*n")).unwrap();
        assert_eq!(view.filtered_len(), 834);

        view.set_sort("Age").unwrap();
        view.set_sort("Age").unwrap();
        view.set_selected_columns(&["Name", "Age"]).unwrap();
        let snap = view.snapshot();
        assert_eq!(snap.columns, vec!["Name", "Age"]);
        assert_eq!(snap.rows[0].cells[1].text, "69");
        assert!(snap.rows.iter().all(|r| r.cells[0].text.starts_with("Johnson")));
        assert!(!snap.rows[0].cells[0].highlights.is_empty());

        view.set_page(16);
        let snap = view.snapshot();
        assert_eq!(snap.page, 16);
        assert_eq!((snap.showing_from, snap.showing_to), (801, 834));
        assert!(!snap.has_next);
    }

    #[tokio::test]
    async fn test_advanced_query_over_loaded_data() {
        let provider = Arc::new(MemoryProvider::new().with_source("inmates", inmates(100)));
        let loader = ChunkLoader::new(provider).with_chunk_size(30);
        let mut view = ViewCoordinator::new();
        load_into(&mut view, &loader, "inmates").await;

        view.set_query(Query::advanced(
            vec![
                Criterion::new("Unit", Operator::Empty, ""),
                Criterion::new("Age", Operator::Less, "21"),
            ],
            MatchMode::Or,
        ))
        .unwrap();
        // 15 null units (i % 7 == 0) and 2 age-20 records, one of them (i = 0) in both
        assert_eq!(view.filtered_len(), 16);
        assert!(view.snapshot().highlight_pattern.is_none());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_dataset() {
        let provider = Arc::new(
            MemoryProvider::new()
                .with_source("good", inmates(10))
                .with_source("bad", inmates(10)),
        );
        provider.fail_source("bad", "Failed to parse JSON file");
        let loader = ChunkLoader::new(Arc::clone(&provider));
        let mut view = ViewCoordinator::new();

        load_into(&mut view, &loader, "good").await;
        let (outcome, _) = load_into(&mut view, &loader, "bad").await;
        assert_eq!(outcome, LoadOutcome::Failed);

        let snap = view.snapshot();
        assert_eq!(snap.source.as_deref(), Some("good"));
        assert_eq!(snap.total_records, 10);
        assert!(matches!(snap.status, LoadStatus::Failed { ref source, .. } if source == "bad"));
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let loader = ChunkLoader::new(Arc::new(MemoryProvider::new()));
        let mut view = ViewCoordinator::new();
        let (outcome, events) = load_into(&mut view, &loader, "nowhere").await;
        assert_eq!(outcome, LoadOutcome::Failed);
        assert!(events.is_empty());
        assert!(view.dataset().is_none());
    }

    /// Holds requests for one source until released.
    struct GatedProvider {
        inner: MemoryProvider,
        gated: String,
        arrived: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DatasetProvider for GatedProvider {
        async fn fetch_chunk(
            &self,
            source: &str,
            offset: usize,
            limit: usize,
        ) -> Result<ChunkResponse, ProviderError> {
            if source == self.gated && limit != PROBE_LIMIT {
                self.arrived.notify_one();
                self.release.notified().await;
            }
            self.inner.fetch_chunk(source, offset, limit).await
        }
    }

    #[tokio::test]
    async fn test_newer_load_wins_over_late_responses() {
        let provider = Arc::new(GatedProvider {
            inner: MemoryProvider::new()
                .with_source("a", inmates(40))
                .with_source("b", inmates(3)),
            gated: "a".to_string(),
            arrived: Notify::new(),
            release: Notify::new(),
        });
        let loader = ChunkLoader::new(Arc::clone(&provider)).with_chunk_size(10);
        let mut view = ViewCoordinator::new();

        let ticket_a = view.select_source("a").unwrap();
        let slow = tokio::spawn({
            let loader = loader.clone();
            let guard = ticket_a.guard().clone();
            async move { loader.load("a", &guard, |_| {}).await }
        });
        provider.arrived.notified().await;

        let ticket_b = view.select_source("b").unwrap();
        assert!(!ticket_a.is_current());
        let result_b = loader.load("b", ticket_b.guard(), |_| {}).await;
        assert_eq!(view.complete_load(&ticket_b, result_b), LoadOutcome::Applied);

        provider.release.notify_one();
        let result_a = slow.await.expect("load task");
        assert_eq!(result_a, Err(LoadError::Superseded));
        assert_eq!(view.complete_load(&ticket_a, result_a), LoadOutcome::Ignored);

        let dataset = view.dataset().unwrap();
        assert_eq!(dataset.source(), "b");
        assert_eq!(dataset.len(), 3);
        assert_eq!(view.status(), &LoadStatus::Ready);
    }

    #[tokio::test]
    async fn test_reselecting_loaded_source_does_not_fetch() {
        let provider = Arc::new(MemoryProvider::new().with_source("a", inmates(5)));
        let loader = ChunkLoader::new(Arc::clone(&provider));
        let mut view = ViewCoordinator::new();
        load_into(&mut view, &loader, "a").await;
        let served = provider.requests().len();

        assert!(view.select_source("a").is_none());
        assert_eq!(provider.requests().len(), served);
    }
}
