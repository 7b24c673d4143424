//! Error types for fintrack-core
//!
//! Expected edge cases (zero totals, empty groups) never surface here; they
//! resolve to defined fallback values inside the calculators. What remains are
//! lookups that miss and persistence failures.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No position for the given external identifier
    PositionNotFound,
    /// No transaction for the given identifier
    TransactionNotFound,
    /// Value rejected by validation
    InvalidValue,
    /// Snapshot could not be encoded or decoded
    SnapshotError,
    /// IO error
    IoError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::PositionNotFound => write!(f, "POSITION_NOT_FOUND"),
            ErrorCode::TransactionNotFound => write!(f, "TRANSACTION_NOT_FOUND"),
            ErrorCode::InvalidValue => write!(f, "INVALID_VALUE"),
            ErrorCode::SnapshotError => write!(f, "SNAPSHOT_ERROR"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Detailed error information for front ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            suggestions: vec![],
        }
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Main error type for fintrack-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Position not found: {external_id}")]
    PositionNotFound { external_id: String },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: u64 },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::PositionNotFound { .. } => ErrorCode::PositionNotFound,
            CoreError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
            CoreError::InvalidValue { .. } => ErrorCode::InvalidValue,
            CoreError::Snapshot { .. } => ErrorCode::SnapshotError,
            CoreError::Io(_) => ErrorCode::IoError,
            CoreError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::PositionNotFound { .. } => ErrorSeverity::Info,
            CoreError::TransactionNotFound { .. } => ErrorSeverity::Info,
            CoreError::InvalidValue { .. } => ErrorSeverity::Warning,
            CoreError::Snapshot { .. } => ErrorSeverity::Error,
            CoreError::Io(_) => ErrorSeverity::Error,
            CoreError::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::PositionNotFound { external_id } => details
                .with_suggestion(format!(
                    "Import transactions tagged '{}' before validating it.",
                    external_id
                ))
                .with_suggestion(
                    "Investment identifiers start with 'I', credit identifiers with 'C'.".to_string(),
                ),
            CoreError::Snapshot { .. } => details.with_suggestion(
                "The snapshot file may be corrupt; restore a backup or wipe and re-import."
                    .to_string(),
            ),
            _ => details,
        }
    }

    /// Log the error at a level matching its severity
    pub fn log(&self, operation: &str) {
        match self.severity() {
            ErrorSeverity::Info => log::info!(target: "fintrack::error", "{} - {}", operation, self),
            ErrorSeverity::Warning => {
                log::warn!(target: "fintrack::error", "{} - {}", operation, self)
            }
            ErrorSeverity::Error | ErrorSeverity::Critical => log::error!(
                target: "fintrack::error",
                "{} - {}",
                operation,
                self.to_details()
            ),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::Snapshot {
            message: error.to_string(),
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;
