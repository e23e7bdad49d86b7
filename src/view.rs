//! RecordView View Coordinator
//!
//! The coordinator owns the loaded dataset and every piece of view state
//! derived from it: sort order, active query, column selection and current
//! page. Renderers never hold state of their own; they read a
//! [`ViewSnapshot`] after each edit.
//!
//! Derived state is kept as index mappings into the dataset:
//!
//! - `order` lists every dataset position in the current sort order
//! - `active` lists the positions of `order` that pass the query, in that order
//!
//! Sorting rewrites `order`; filtering re-derives `active` from `order`. A sort
//! therefore survives later query edits and a query survives later sorts.
//!
//! # Loading
//!
//! Loads run outside the coordinator. [`ViewCoordinator::select_source`]
//! hands out a [`LoadTicket`]; the caller drives a
//! [`ChunkLoader`](crate::loader::ChunkLoader) with the ticket's guard and
//! reports back through [`ViewCoordinator::apply_progress`] and
//! [`ViewCoordinator::complete_load`]. Starting another load makes every
//! older ticket stale, and reports made with a stale ticket are ignored.
//!
//! # Examples
//!
//! ```
//! use recordview::{Dataset, Query, ViewCoordinator};
//! use serde_json::json;
//!
//! let mut view = ViewCoordinator::new();
//! let ticket = view.select_source("people").unwrap();
//! let dataset = Dataset::from_json_rows("people", vec![
//!     json!({"Name": "John", "Age": 40}),
//!     json!({"Name": "Mary", "Age": 25}),
//! ]).unwrap();
//! view.complete_load(&ticket, Ok(dataset));
//!
//! view.set_query(Query::simple("j*n")).unwrap();
//! let snapshot = view.snapshot();
//! assert_eq!(snapshot.filtered_records, 1);
//! assert_eq!(snapshot.rows[0].cells[0].text, "John");
//! ```

use crate::columns::ColumnRegistry;
use crate::error::{LoadError, ViewError};
use crate::highlight::{HighlightSpan, Highlighter};
use crate::loader::{LoadGuard, LoadProgress, LoadSequencer};
use crate::query::{CompiledQuery, Query};
use crate::sort::{sort_indices, SortKey};
use crate::table::Dataset;
use crate::value::FieldValue;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Instant;

/// Records per page.
pub const PAGE_SIZE: usize = 50;

/// Columns tried, in order, when titling a record detail. Null, empty and
/// zero values are passed over.
const TITLE_COLUMNS: [&str; 5] = ["Name", "name", "TDCJ", "id", "ID"];

/// Where the coordinator stands with respect to loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Nothing has been loaded yet
    Idle,
    /// A load is in flight. A previously loaded dataset stays visible.
    Loading {
        source: String,
        progress: Option<LoadProgress>,
    },
    Ready,
    /// The last load failed. A previously loaded dataset stays visible.
    Failed { source: String, message: String },
}

/// Permission to report on one load.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    source: String,
    guard: LoadGuard,
}

impl LoadTicket {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn guard(&self) -> &LoadGuard {
        &self.guard
    }

    pub fn is_current(&self) -> bool {
        self.guard.is_current()
    }
}

/// What [`ViewCoordinator::complete_load`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The dataset replaced the previous one
    Applied,
    /// The load failed; the previous dataset is kept
    Failed,
    /// The ticket was stale; nothing changed
    Ignored,
}

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    pub value: FieldValue,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<HighlightSpan>,
}

/// One rendered row: the projected cells of a record on the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    /// Position of the record in the active view
    pub index: usize,
    pub cells: Vec<RenderedCell>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub source: Option<String>,
    /// Selected columns, in dataset order
    pub columns: Vec<String>,
    pub all_columns: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_records: usize,
    pub filtered_records: usize,
    /// 1-based position of the first row shown, 0 when nothing is shown
    pub showing_from: usize,
    pub showing_to: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub highlight_pattern: Option<String>,
    pub sort: Option<SortKey>,
    pub query: Option<Query>,
    pub status: LoadStatus,
}

impl ViewSnapshot {
    /// True when a dataset is loaded but holds no records.
    pub fn is_empty_dataset(&self) -> bool {
        self.source.is_some() && self.total_records == 0
    }
}

/// Every field of one record, for a detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDetail {
    /// Position of the record in the active view
    pub index: usize,
    pub title: String,
    pub fields: Vec<DetailField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailField {
    pub column: String,
    /// `None` for null
    pub value: Option<String>,
}

pub struct ViewCoordinator {
    dataset: Option<Dataset>,
    columns: ColumnRegistry,
    order: Vec<usize>,
    active: Vec<usize>,
    query: Option<Query>,
    compiled: CompiledQuery,
    highlighter: Option<Highlighter>,
    sort: Option<SortKey>,
    page: usize,
    status: LoadStatus,
    sequencer: LoadSequencer,
}

impl Default for ViewCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCoordinator {
    pub fn new() -> Self {
        ViewCoordinator {
            dataset: None,
            columns: ColumnRegistry::default(),
            order: Vec::new(),
            active: Vec::new(),
            query: None,
            compiled: CompiledQuery::All,
            highlighter: None,
            sort: None,
            page: 0,
            status: LoadStatus::Idle,
            sequencer: LoadSequencer::new(),
        }
    }

    // -------------------- Loading ---------------------- //

    /// Start loading `source`.
    ///
    /// Returns `None` when `source` is already the loaded dataset; the
    /// dataset is only fetched again when its identity changes (use
    /// [`reload`](Self::reload) to force it). A load in flight at that point
    /// is cancelled and the loaded dataset stays. Otherwise any in-flight
    /// load is superseded and a ticket for the new one is returned.
    pub fn select_source(&mut self, source: &str) -> Option<LoadTicket> {
        if self.dataset.as_ref().map(Dataset::source) == Some(source) {
            debug!("Source '{}' already loaded", source);
            self.cancel_load();
            return None;
        }
        Some(self.start_load(source))
    }

    /// Fetch the current dataset's source again.
    pub fn reload(&mut self) -> Option<LoadTicket> {
        let source = self.dataset.as_ref()?.source().to_string();
        Some(self.start_load(&source))
    }

    fn start_load(&mut self, source: &str) -> LoadTicket {
        if let LoadStatus::Loading { source: previous, .. } = &self.status {
            info!("Superseding load of '{}' with '{}'", previous, source);
        }
        let guard = self.sequencer.next();
        self.status = LoadStatus::Loading {
            source: source.to_string(),
            progress: None,
        };
        LoadTicket {
            source: source.to_string(),
            guard,
        }
    }

    /// Abandon the in-flight load, if any.
    pub fn cancel_load(&mut self) {
        if let LoadStatus::Loading { source, .. } = &self.status {
            info!("Cancelled load of '{}'", source);
            self.sequencer.invalidate();
            self.status = self.settled_status();
        }
    }

    /// Record progress of a load. Returns false for a stale ticket.
    pub fn apply_progress(&mut self, ticket: &LoadTicket, progress: LoadProgress) -> bool {
        if !ticket.is_current() {
            return false;
        }
        self.status = LoadStatus::Loading {
            source: ticket.source.clone(),
            progress: Some(progress),
        };
        true
    }

    /// Hand over the result of a load.
    ///
    /// A successful result replaces the dataset and resets the view state.
    /// A failure keeps whatever was shown before.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Dataset, LoadError>,
    ) -> LoadOutcome {
        if !ticket.is_current() || matches!(result, Err(LoadError::Superseded)) {
            debug!("Ignoring result of superseded load of '{}'", ticket.source);
            return LoadOutcome::Ignored;
        }
        // The ticket is spent; later reports made with it are stale.
        self.sequencer.invalidate();

        match result {
            Ok(dataset) => {
                info!(
                    "Showing '{}': {} records, {} columns",
                    dataset.source(),
                    dataset.len(),
                    dataset.columns().len()
                );
                self.install(dataset);
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!("Loading '{}' failed: {}", ticket.source, err);
                self.status = LoadStatus::Failed {
                    source: ticket.source.clone(),
                    message: err.to_string(),
                };
                LoadOutcome::Failed
            }
        }
    }

    fn install(&mut self, dataset: Dataset) {
        self.columns = ColumnRegistry::new(dataset.columns());
        self.order = (0..dataset.len()).collect();
        self.active = self.order.clone();
        self.query = None;
        self.compiled = CompiledQuery::All;
        self.highlighter = None;
        self.sort = None;
        self.page = 0;
        self.dataset = Some(dataset);
        self.status = LoadStatus::Ready;
    }

    fn settled_status(&self) -> LoadStatus {
        if self.dataset.is_some() {
            LoadStatus::Ready
        } else {
            LoadStatus::Idle
        }
    }

    // -------------------- View edits ---------------------- //

    /// Filter the dataset. An invalid pattern is rejected and the current
    /// filtered view stays as it is.
    pub fn set_query(&mut self, query: Query) -> Result<(), ViewError> {
        if self.dataset.is_none() {
            return Err(ViewError::NoDataset);
        }
        let compiled = match CompiledQuery::compile(&query) {
            Ok(compiled) => compiled,
            Err(err) => {
                warn!("Rejected query: {}", err);
                return Err(err.into());
            }
        };
        self.highlighter = compiled
            .highlight_pattern()
            .and_then(Highlighter::from_pattern);
        self.compiled = compiled;
        self.query = Some(query);
        self.page = 0;
        self.refilter();
        Ok(())
    }

    /// Drop the active query.
    pub fn clear_query(&mut self) {
        self.query = None;
        self.compiled = CompiledQuery::All;
        self.highlighter = None;
        self.page = 0;
        self.refilter();
    }

    /// Sort by `column`, flipping direction if it is already the sort column.
    pub fn set_sort(&mut self, column: &str) -> Result<(), ViewError> {
        let Some(dataset) = self.dataset.as_ref() else {
            return Err(ViewError::NoDataset);
        };
        if !self.columns.contains(column) {
            warn!("Rejected sort on unknown column '{}'", column);
            return Err(ViewError::UnknownColumn(column.to_string()));
        }
        let key = SortKey::toggle(self.sort.as_ref(), column);
        sort_indices(dataset, &mut self.order, &key);
        self.sort = Some(key);
        self.page = 0;
        self.refilter();
        Ok(())
    }

    /// Go to page `page`, clamped to the last page.
    pub fn set_page(&mut self, page: usize) {
        let last = self.total_pages().saturating_sub(1);
        if page > last {
            debug!("Page {} out of range, showing page {}", page, last);
        }
        self.page = page.min(last);
    }

    /// Returns false when already on the last page.
    pub fn next_page(&mut self) -> bool {
        if self.page + 1 >= self.total_pages() {
            return false;
        }
        self.page += 1;
        true
    }

    /// Returns false when already on the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Choose the displayed columns. Rejected, without any change, if the
    /// selection would be empty or names an unknown column.
    pub fn set_selected_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), ViewError> {
        if self.dataset.is_none() {
            return Err(ViewError::NoDataset);
        }
        if let Err(err) = self.columns.select(columns) {
            warn!("Rejected column selection: {}", err);
            return Err(err);
        }
        self.page = 0;
        Ok(())
    }

    fn refilter(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };
        let start_time = Instant::now();
        self.active = self.compiled.filter_indices(dataset, &self.order);
        debug!(
            "Active view: {} of {} records in {}ms",
            self.active.len(),
            dataset.len(),
            start_time.elapsed().as_millis()
        );
    }

    // -------------------- Reading ---------------------- //

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn sort(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn all_columns(&self) -> &[String] {
        self.columns.all_columns()
    }

    pub fn selected_columns(&self) -> &[String] {
        self.columns.selected()
    }

    /// Number of records in the active view.
    pub fn filtered_len(&self) -> usize {
        self.active.len()
    }

    pub fn total_pages(&self) -> usize {
        self.active.len().div_ceil(PAGE_SIZE)
    }

    /// Dataset positions of the records on the current page.
    pub fn page_indices(&self) -> &[usize] {
        let start = (self.page * PAGE_SIZE).min(self.active.len());
        let end = (start + PAGE_SIZE).min(self.active.len());
        &self.active[start..end]
    }

    /// Render-ready state of the current page.
    pub fn snapshot(&self) -> ViewSnapshot {
        let total_pages = self.total_pages();
        let start = (self.page * PAGE_SIZE).min(self.active.len());
        let page_indices = self.page_indices();

        let rows = match self.dataset.as_ref() {
            Some(dataset) => {
                let positions = self.columns.selected_positions();
                page_indices
                    .iter()
                    .enumerate()
                    .filter_map(|(offset, &row)| {
                        let record = dataset.get_record(row)?;
                        let cells = positions
                            .iter()
                            .map(|&col| self.render_cell(record.get(col)))
                            .collect();
                        Some(RenderedRow {
                            index: start + offset,
                            cells,
                        })
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        ViewSnapshot {
            source: self.dataset.as_ref().map(|d| d.source().to_string()),
            columns: self.columns.selected().to_vec(),
            all_columns: self.columns.all_columns().to_vec(),
            rows,
            page: self.page,
            page_size: PAGE_SIZE,
            total_pages,
            total_records: self.dataset.as_ref().map_or(0, Dataset::len),
            filtered_records: self.active.len(),
            showing_from: if page_indices.is_empty() { 0 } else { start + 1 },
            showing_to: start + page_indices.len(),
            has_previous: self.page > 0,
            has_next: self.page + 1 < total_pages,
            highlight_pattern: self.highlighter.as_ref().map(Highlighter::pattern),
            sort: self.sort.clone(),
            query: self.query.clone(),
            status: self.status.clone(),
        }
    }

    fn render_cell(&self, value: Option<&FieldValue>) -> RenderedCell {
        let value = value.cloned().unwrap_or(FieldValue::Null);
        let text = value.display_text();
        let highlights = match (&self.highlighter, value.is_null()) {
            (Some(h), false) => h.spans(&text),
            _ => Vec::new(),
        };
        RenderedCell {
            value,
            text,
            highlights,
        }
    }

    /// Every field of the record at `index` of the active view.
    pub fn record_detail(&self, index: usize) -> Option<RecordDetail> {
        let dataset = self.dataset.as_ref()?;
        let row = *self.active.get(index)?;
        let record = dataset.get_record(row)?;

        let title = TITLE_COLUMNS
            .iter()
            .filter_map(|column| dataset.get_value(row, column))
            .find(|value| !value.is_empty() && value.as_f64() != Some(0.0))
            .map(FieldValue::display_text)
            .unwrap_or_else(|| format!("Record {}", index + 1));

        let fields = dataset
            .columns()
            .iter()
            .zip(record.values())
            .map(|(column, value)| DetailField {
                column: column.clone(),
                value: value.text().map(|t| t.into_owned()),
            })
            .collect();

        Some(RecordDetail {
            index,
            title,
            fields,
        })
    }
}
