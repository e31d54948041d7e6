//! Error types for every stage of the analysis pipeline.

use thiserror::Error;

/// Errors raised while loading or manipulating an observation table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{0}' declared more than once")]
    DuplicateColumn(String),

    #[error("column '{column}', row {row}: '{value}' is not a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("column '{column}', row {row}: expected a categorical value")]
    NotCategorical { column: String, row: usize },

    #[error("row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("row has {actual} cells, table has {expected} columns")]
    RowLength { expected: usize, actual: usize },

    #[error("column '{column}' has {actual} values, table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the frequency-table estimator.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("column '{column}', row {row}: missing value")]
    MissingValue { column: String, row: usize },

    #[error("column '{column}': category '{category}' is not among the declared states")]
    UnknownCategory { column: String, category: String },

    #[error("parent combination '{combination}' never occurs in the table")]
    UnobservedParentCategory { combination: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Errors raised while building a network or running inference on it.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("node id {0} already exists")]
    DuplicateNodeId(usize),

    #[error("node name '{0}' already exists")]
    DuplicateNodeName(String),

    #[error("unknown node id {0}")]
    UnknownNode(usize),

    #[error("unknown node name '{0}'")]
    UnknownNodeName(String),

    #[error("invalid edge {parent} -> {child}: {reason}")]
    InvalidEdge {
        parent: usize,
        child: usize,
        reason: String,
    },

    #[error("cycle through node {0}")]
    Cycle(usize),

    #[error("node '{node}': {reason}")]
    InvalidCpt { node: String, reason: String },

    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),

    #[error("evidence has zero probability under the model")]
    InconsistentEvidence,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while reading or applying an analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Estimate(#[from] EstimateError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}
