//! Error types for RecordView
//!
//! Every failure in the engine is reported as one of these structured
//! conditions. None of them leave a `ViewCoordinator` in an invalid state.

use thiserror::Error;

/// A failure reported by (or while talking to) a dataset provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider answered, but reported the request as failed.
    #[error("Provider error: {0}")]
    Failed(String),

    /// The request never produced an answer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The answer could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The source identifier is not acceptable to the provider.
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

/// Terminal failure of a dataset load.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A record carried a column the first record did not have.
    #[error("Record {row} has unexpected column '{column}'")]
    SchemaDrift { row: usize, column: String },

    /// The assembled dataset does not hold the number of rows the probe reported.
    #[error("Expected {expected} records, received {received}")]
    RowCountMismatch { expected: usize, received: usize },

    /// A newer load started before this one finished.
    #[error("Load was superseded by a newer load")]
    Superseded,
}

/// Failure to turn a user query into something that can be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A rejected view edit. The view state is unchanged when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("At least one column must stay selected")]
    EmptySelection,

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("No dataset is loaded")]
    NoDataset,

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Invalid server configuration.
#[cfg(feature = "server")]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PORT must be a number between 0 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("Data directory '{0}' does not exist")]
    MissingDataDir(String),
}
