use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnrichmentError>;

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP transfer error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source '{source_ref}' could not be read: {reason}")]
    SourceUnreadable { source_ref: String, reason: String },

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Column '{0}' not found in source")]
    ColumnNotFound(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Failed to write output to {path}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
