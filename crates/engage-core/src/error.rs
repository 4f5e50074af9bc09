use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the engagement chart pipeline.
#[derive(Error, Debug)]
pub enum EngageError {
    /// A literal source path does not exist.
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension does not map to a supported tabular format.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A requested column is absent from a source file, or a filter references
    /// a column the loaded table does not have.
    #[error("Schema error in {path}: {message}")]
    Schema { path: PathBuf, message: String },

    /// Two source files produced different column sets.
    #[error("Schema mismatch: {path} has columns [{found}], expected [{expected}]")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// An aggregation or filter referenced a column that is not in the table.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A data row carries more fields than the header declares.
    #[error("Malformed row {row} in {path}: expected {expected} fields, found {found}")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// An in-memory row does not match the table's column count.
    #[error("Row {row} has {found} values but the table has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// An aggregation produced no groups; rendering should be skipped.
    #[error("No data available for {0}")]
    EmptyResult(String),

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A spreadsheet could not be opened or a sheet could not be read.
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngageError {
    /// Build a [`EngageError::Schema`] for `path`.
    pub fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    /// `true` for the non-fatal "nothing to draw" condition.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult(_))
    }
}

/// Convenience alias used throughout the engage crates.
pub type Result<T> = std::result::Result<T, EngageError>;
