use std::path::PathBuf;

use thiserror::Error;

use crate::models::ColumnType;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source file missing: {}", .path.display())]
    MissingSource { path: PathBuf },

    #[error("Column '{column}' not found")]
    MissingColumn { column: String },

    #[error("Cannot coerce value '{value}' in column '{column}' to {target}")]
    SchemaCoercion {
        column: String,
        value: String,
        target: ColumnType,
    },

    #[error("Unknown category '{label}' in column '{column}'")]
    UnknownCategory { column: String, label: String },

    #[error("Join produced no rows from {left_rows} left and {right_rows} right rows")]
    EmptyJoin { left_rows: usize, right_rows: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Data merge error: {0}")]
    DataMerge(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl ProcessingError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        ProcessingError::MissingColumn {
            column: column.into(),
        }
    }
}
