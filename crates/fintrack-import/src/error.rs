//! Error types for fintrack-import

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whole-file import failure
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Reader task failed: {message}")]
    Task { message: String },
}

pub type ImportResult<T> = Result<T, ImportError>;

/// A row that could not be decoded; the rest of the file still imports
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("row {row}: {reason}")]
pub struct RowError {
    /// 1-based row number in the source file
    pub row: usize,
    pub reason: String,
}

impl RowError {
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }
}
