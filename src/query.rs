//! Query evaluation.
//!
//! Two kinds of query select records from a dataset:
//!
//! - a **simple** query is one wildcard pattern tested against every
//!   non-null field of a record; any hit keeps the record
//! - an **advanced** query is a list of per-column criteria combined with
//!   AND or OR
//!
//! Evaluation is a full rescan, `O(records × columns)`, and never reorders:
//! the result lists record positions in the order they were given.

use crate::error::QueryError;
use crate::pattern::WildcardPattern;
use crate::table::{Dataset, Record};
use crate::value::{parse_number, FieldValue};
use serde::{Deserialize, Serialize};

/// Comparison applied by one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Contains,
    Equals,
    Starts,
    Ends,
    NotContains,
    NotEquals,
    Greater,
    Less,
    Empty,
    NotEmpty,
}

impl Operator {
    /// `empty` and `not_empty` ignore the criterion value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::Empty | Operator::NotEmpty)
    }
}

/// How the criteria of an advanced query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchMode {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

impl Criterion {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Criterion {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    Simple {
        pattern: String,
    },
    Advanced {
        criteria: Vec<Criterion>,
        #[serde(default)]
        mode: MatchMode,
    },
}

impl Query {
    pub fn simple(pattern: impl Into<String>) -> Self {
        Query::Simple {
            pattern: pattern.into(),
        }
    }

    pub fn advanced(criteria: Vec<Criterion>, mode: MatchMode) -> Self {
        Query::Advanced { criteria, mode }
    }

    /// True when the query keeps every record.
    pub fn is_identity(&self) -> bool {
        match self {
            Query::Simple { pattern } => pattern.is_empty(),
            Query::Advanced { criteria, .. } => criteria.is_empty(),
        }
    }
}

/// What a compiled criterion compares against.
#[derive(Debug, Clone)]
enum Needle {
    Pattern(WildcardPattern),
    /// Lower-cased literal
    Text(String),
    /// `None` when the criterion value is not a number
    Number(Option<f64>),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct CompiledCriterion {
    column: String,
    operator: Operator,
    needle: Needle,
}

impl CompiledCriterion {
    fn compile(criterion: &Criterion) -> Result<Self, QueryError> {
        let needle = match criterion.operator {
            Operator::Contains | Operator::NotContains => {
                Needle::Pattern(WildcardPattern::compile(&criterion.value)?)
            }
            Operator::Equals | Operator::NotEquals | Operator::Starts | Operator::Ends => {
                Needle::Text(criterion.value.to_lowercase())
            }
            Operator::Greater | Operator::Less => Needle::Number(parse_number(&criterion.value)),
            Operator::Empty | Operator::NotEmpty => Needle::Nothing,
        };
        Ok(CompiledCriterion {
            column: criterion.column.clone(),
            operator: criterion.operator,
            needle,
        })
    }

    fn matches(&self, value: Option<&FieldValue>) -> bool {
        let is_empty = value.map_or(true, FieldValue::is_empty);
        match self.operator {
            Operator::Empty => return is_empty,
            Operator::NotEmpty => return !is_empty,
            _ if is_empty => return false,
            _ => {}
        }
        let Some(value) = value else {
            return false;
        };

        match (&self.needle, self.operator) {
            (Needle::Number(target), op) => {
                match (value.parse_number(), target) {
                    (Some(n), Some(t)) if op == Operator::Greater => n > *t,
                    (Some(n), Some(t)) if op == Operator::Less => n < *t,
                    _ => false,
                }
            }
            (needle, op) => {
                let text = value.display_text().to_lowercase();
                match (needle, op) {
                    (Needle::Pattern(p), Operator::Contains) => p.is_match(&text),
                    (Needle::Pattern(p), Operator::NotContains) => !p.is_match(&text),
                    (Needle::Text(t), Operator::Equals) => text == *t,
                    (Needle::Text(t), Operator::NotEquals) => text != *t,
                    (Needle::Text(t), Operator::Starts) => text.starts_with(t.as_str()),
                    (Needle::Text(t), Operator::Ends) => text.ends_with(t.as_str()),
                    _ => false,
                }
            }
        }
    }
}

/// A query ready to run against datasets.
#[derive(Debug, Clone)]
pub enum CompiledQuery {
    /// Keeps every record
    All,
    Simple(WildcardPattern),
    Advanced {
        criteria: Vec<CompiledCriterion>,
        mode: MatchMode,
    },
}

impl CompiledQuery {
    /// Compile a query, translating every wildcard it contains.
    pub fn compile(query: &Query) -> Result<Self, QueryError> {
        if query.is_identity() {
            return Ok(CompiledQuery::All);
        }
        match query {
            Query::Simple { pattern } => Ok(CompiledQuery::Simple(WildcardPattern::compile(pattern)?)),
            Query::Advanced { criteria, mode } => Ok(CompiledQuery::Advanced {
                criteria: criteria
                    .iter()
                    .map(CompiledCriterion::compile)
                    .collect::<Result<_, _>>()?,
                mode: *mode,
            }),
        }
    }

    /// The pattern cells should be highlighted with, if any.
    ///
    /// Only simple queries highlight.
    pub fn highlight_pattern(&self) -> Option<&WildcardPattern> {
        match self {
            CompiledQuery::Simple(p) => Some(p),
            _ => None,
        }
    }

    /// Keep the positions in `order` whose records match, preserving order.
    pub fn filter_indices(&self, dataset: &Dataset, order: &[usize]) -> Vec<usize> {
        if let CompiledQuery::All = self {
            return order.to_vec();
        }
        let resolved = self.resolve_columns(dataset);
        order
            .iter()
            .copied()
            .filter(|&idx| {
                dataset
                    .get_record(idx)
                    .map(|record| self.matches_resolved(record, &resolved))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Test a single record of `dataset`.
    pub fn matches(&self, dataset: &Dataset, record: &Record) -> bool {
        let resolved = self.resolve_columns(dataset);
        self.matches_resolved(record, &resolved)
    }

    fn resolve_columns(&self, dataset: &Dataset) -> Vec<Option<usize>> {
        match self {
            CompiledQuery::Advanced { criteria, .. } => criteria
                .iter()
                .map(|c| dataset.schema().get_column_index(&c.column))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn matches_resolved(&self, record: &Record, resolved: &[Option<usize>]) -> bool {
        match self {
            CompiledQuery::All => true,
            CompiledQuery::Simple(pattern) => record
                .values()
                .iter()
                .filter_map(FieldValue::text)
                .any(|text| pattern.is_match(&text)),
            CompiledQuery::Advanced { criteria, mode } => {
                let mut results = criteria
                    .iter()
                    .zip(resolved)
                    .map(|(c, pos)| c.matches(pos.and_then(|p| record.get(p))));
                match mode {
                    MatchMode::And => results.all(|m| m),
                    MatchMode::Or => results.any(|m| m),
                }
            }
        }
    }
}

/// Evaluate `query` over the whole dataset in its stored order.
pub fn filter(dataset: &Dataset, query: &Query) -> Result<Vec<usize>, QueryError> {
    let compiled = CompiledQuery::compile(query)?;
    let order: Vec<usize> = (0..dataset.len()).collect();
    Ok(compiled.filter_indices(dataset, &order))
}
