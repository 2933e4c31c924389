use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by table construction, clustering and imputation.
#[derive(Debug, Error)]
pub enum Error {
    /// Input is empty (no sources, no rows, or no attributes selected).
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// A row or table has the wrong number of attributes.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected attribute count.
        expected: usize,
        /// Found attribute count.
        found: usize,
    },

    /// A row would end up with no observed attribute.
    #[error("row {row} has no observed attributes")]
    EmptyRow {
        /// Row index (or the index the row would have received).
        row: usize,
    },

    /// Rows must be appended in non-decreasing, gap-free source order.
    #[error("source {found} cannot follow source {last}")]
    SourceOrder {
        /// Tag of the last row in the table.
        last: usize,
        /// Tag of the rejected row.
        found: usize,
    },

    /// A source's value list is not a whole number of rows.
    #[error("source {source_id} has {values} values, not a multiple of its width {width}")]
    RaggedSource {
        /// Source tag.
        source_id: usize,
        /// Number of values supplied.
        values: usize,
        /// Number of attributes per row.
        width: usize,
    },

    /// A computation needed a cell that is missing.
    #[error("row {row} is missing attribute {attribute}")]
    MissingValue {
        /// Row index.
        row: usize,
        /// Attribute index.
        attribute: usize,
    },

    /// Imputation left cells without any donor.
    #[error("{count} cells could not be imputed (no donor row has the attribute)")]
    UnfilledCells {
        /// Number of cells still missing.
        count: usize,
    },

    /// Reading a dataset file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A dataset file holds something that is not a number.
    #[error("{path}: cannot parse {token:?}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Offending token.
        token: String,
    },
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
