//! Chunked dataset loading.
//!
//! A load probes the provider for the row count, then walks the source in
//! fixed-size chunks, strictly one request at a time and in ascending offset
//! order, so the records gathered so far are always a prefix of the final
//! dataset. Each load runs under a [`LoadGuard`]; once a newer load has been
//! started the guard goes stale and every response that arrives afterwards is
//! dropped instead of appended.

use crate::error::LoadError;
use crate::provider::DatasetProvider;
use crate::table::{Dataset, DatasetBuilder};
use log::{debug, info, trace};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Records requested per chunk.
pub const CHUNK_SIZE: usize = 1000;

/// Progress of a running load, emitted after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    /// Records appended so far
    pub fetched: usize,
    /// Records announced by the probe
    pub total: usize,
    pub chunks_done: usize,
    pub chunk_count: usize,
}

impl LoadProgress {
    /// Completion in whole percent, by chunks.
    pub fn percent(&self) -> u32 {
        if self.chunk_count == 0 {
            return 100;
        }
        ((self.chunks_done as f64 / self.chunk_count as f64) * 100.0).round() as u32
    }
}

/// Hands out generations for loads. Starting a new generation makes every
/// guard of an older one stale.
#[derive(Debug, Clone, Default)]
pub struct LoadSequencer {
    current: Arc<AtomicU64>,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return its guard.
    pub fn next(&self) -> LoadGuard {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        LoadGuard {
            current: Arc::clone(&self.current),
            generation,
        }
    }

    /// Make every outstanding guard stale without starting a load.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Identifies one load generation.
#[derive(Debug, Clone)]
pub struct LoadGuard {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl LoadGuard {
    /// True while no newer load has been started.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Loads whole datasets from a provider, chunk by chunk.
pub struct ChunkLoader<P: ?Sized> {
    provider: Arc<P>,
    chunk_size: usize,
}

impl<P: ?Sized> Clone for ChunkLoader<P> {
    fn clone(&self) -> Self {
        ChunkLoader {
            provider: Arc::clone(&self.provider),
            chunk_size: self.chunk_size,
        }
    }
}

impl<P: DatasetProvider + ?Sized> ChunkLoader<P> {
    pub fn new(provider: Arc<P>) -> Self {
        ChunkLoader {
            provider,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Override the chunk size. Values below 1 are raised to 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Load the complete dataset of `source`.
    ///
    /// `on_progress` is called after every appended chunk. Any provider
    /// failure aborts the load and discards what was gathered. If `guard`
    /// goes stale while a request is outstanding the load ends with
    /// [`LoadError::Superseded`] and the late response is not used.
    pub async fn load<F>(
        &self,
        source: &str,
        guard: &LoadGuard,
        mut on_progress: F,
    ) -> Result<Dataset, LoadError>
    where
        F: FnMut(LoadProgress) + Send,
    {
        let start_time = Instant::now();
        let probe = self.provider.probe(source).await;
        if !guard.is_current() {
            debug!("Dropping probe response for superseded load of '{}'", source);
            return Err(LoadError::Superseded);
        }
        let total = probe?;

        let chunk_count = total.div_ceil(self.chunk_size);
        debug!(
            "Loading '{}': {} records in {} chunks of {}",
            source, total, chunk_count, self.chunk_size
        );

        let mut builder = DatasetBuilder::new(source, total);
        for chunk_idx in 0..chunk_count {
            let offset = chunk_idx * self.chunk_size;
            let response = self
                .provider
                .fetch_chunk(source, offset, self.chunk_size)
                .await;
            if !guard.is_current() {
                debug!(
                    "Dropping chunk at offset {} for superseded load of '{}'",
                    offset, source
                );
                return Err(LoadError::Superseded);
            }
            let (records, _) = response?.into_records()?;
            builder.push_rows(records)?;

            let progress = LoadProgress {
                fetched: builder.len(),
                total,
                chunks_done: chunk_idx + 1,
                chunk_count,
            };
            trace!("Load '{}' at {}%", source, progress.percent());
            on_progress(progress);
        }

        let dataset = builder.finish(total)?;
        info!(
            "Loaded {} records of '{}' in {}ms",
            dataset.len(),
            source,
            start_time.elapsed().as_millis()
        );
        Ok(dataset)
    }
}
