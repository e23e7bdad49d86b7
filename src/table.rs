/// RecordView Dataset Implementation
///
/// A Dataset is the fully materialized record sequence of one source. Its
/// schema (the ordered column list) is fixed by the first record observed and
/// every later record is stored against that schema.
///
/// # Examples
///
/// ```
/// use recordview::{Dataset, FieldValue};
/// use serde_json::json;
///
/// let dataset = Dataset::from_json_rows("inmates", vec![
///     json!({"Name": "John", "Age": 34}),
///     json!({"Name": "Jon", "Age": null}),
/// ]).unwrap();
///
/// assert_eq!(dataset.len(), 2);
/// assert_eq!(dataset.columns(), &["Name".to_string(), "Age".to_string()]);
/// assert_eq!(dataset.get_value(1, "Age"), Some(&FieldValue::Null));
/// ```

use crate::error::LoadError;
use crate::value::FieldValue;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// A raw record as delivered by a provider.
pub type JsonRecord = Map<String, JsonValue>;

/// Ordered column list of a dataset.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Creates a schema from column names in display order.
    pub fn new(columns: Vec<String>) -> Self {
        let positions = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Schema { columns, positions }
    }

    /// Derives a schema from the keys of a record, keeping their order.
    pub fn from_record(record: &JsonRecord) -> Self {
        Schema::new(record.keys().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Returns the index of a column by name, or None if not found.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

/// One row of a dataset, positionally aligned with the dataset's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<FieldValue>,
}

impl Record {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Record { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }
}

/// The complete record sequence of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: String,
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from already aligned records.
    ///
    /// Records shorter than the schema are padded with nulls; longer ones are truncated.
    pub fn new(source: impl Into<String>, schema: Schema, records: Vec<Record>) -> Self {
        let width = schema.len();
        let records = records
            .into_iter()
            .map(|mut record| {
                record.values.resize(width, FieldValue::Null);
                record
            })
            .collect();
        Dataset {
            source: source.into(),
            schema,
            records,
        }
    }

    /// An empty dataset with no columns.
    pub fn empty(source: impl Into<String>) -> Self {
        Dataset::new(source, Schema::default(), Vec::new())
    }

    /// Build a dataset from JSON objects, the way the loader does.
    pub fn from_json_rows(source: &str, rows: Vec<JsonValue>) -> Result<Self, LoadError> {
        let mut builder = DatasetBuilder::new(source, rows.len());
        let objects = rows
            .into_iter()
            .map(|row| match row {
                JsonValue::Object(map) => map,
                _ => Map::new(),
            })
            .collect();
        builder.push_rows(objects)?;
        let expected = builder.len();
        builder.finish(expected)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        self.schema.column_names()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get_record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn get_value(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let col_idx = self.schema.get_column_index(column)?;
        self.records.get(row)?.get(col_idx)
    }

    /// Column name / value pairs of one record in schema order.
    pub fn get_row(&self, row: usize) -> Option<Vec<(&str, &FieldValue)>> {
        let record = self.records.get(row)?;
        Some(
            self.schema
                .column_names()
                .iter()
                .map(String::as_str)
                .zip(record.values.iter())
                .collect(),
        )
    }
}

/// Accumulates provider chunks into a dataset.
///
/// The first record pushed fixes the schema. A later record carrying a key the
/// schema does not know fails the load; a missing key is stored as null.
#[derive(Debug)]
pub struct DatasetBuilder {
    source: String,
    schema: Option<Schema>,
    records: Vec<Record>,
}

impl DatasetBuilder {
    pub fn new(source: &str, capacity: usize) -> Self {
        DatasetBuilder {
            source: source.to_string(),
            schema: None,
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one chunk of records in arrival order.
    pub fn push_rows(&mut self, rows: Vec<JsonRecord>) -> Result<(), LoadError> {
        for row in rows {
            let schema = self.schema.get_or_insert_with(|| Schema::from_record(&row));
            let mut values = vec![FieldValue::Null; schema.len()];
            for (key, value) in row {
                match schema.get_column_index(&key) {
                    Some(idx) => values[idx] = FieldValue::from_json(value),
                    None => {
                        return Err(LoadError::SchemaDrift {
                            row: self.records.len(),
                            column: key,
                        })
                    }
                }
            }
            self.records.push(Record::new(values));
        }
        Ok(())
    }

    /// Finalize, checking the record count against what the provider announced.
    pub fn finish(self, expected: usize) -> Result<Dataset, LoadError> {
        if self.records.len() != expected {
            return Err(LoadError::RowCountMismatch {
                expected,
                received: self.records.len(),
            });
        }
        Ok(Dataset {
            source: self.source,
            schema: self.schema.unwrap_or_default(),
            records: self.records,
        })
    }
}
