//! Unified error hierarchy for LoadRS
//!
//! Insufficient data is never an error in this crate: the analyzers degrade to a
//! flagged default result instead. Errors are reserved for logically impossible
//! requests, malformed input files and configuration problems.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all LoadRS operations
#[derive(Debug, Error)]
pub enum LoadRsError {
    /// A request that cannot produce a meaningful result
    #[error("Precondition violated: {0}")]
    Precondition(#[from] PreconditionError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Logically impossible requests that fail fast
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// Programs must span at least one week
    #[error("total_weeks must be at least 1, got {total_weeks}")]
    InvalidProgramLength { total_weeks: u32 },

    /// Deload cadence of zero would never schedule a deload
    #[error("deload_frequency must be at least 1, got {deload_frequency}")]
    InvalidDeloadFrequency { deload_frequency: u32 },

    /// Unknown periodization model name
    #[error("Unknown periodization model: {0}")]
    UnknownModel(String),

    /// Unknown training goal name
    #[error("Unknown training goal: {0}")]
    UnknownGoal(String),
}

/// Input file errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// Extension not recognised
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Format-specific parsing error
    #[error("Parse error in {format} at {path}: {reason}")]
    ParseError {
        format: String,
        path: PathBuf,
        reason: String,
    },

    /// File parsed but contained no usable records
    #[error("No records found in {path}")]
    Empty { path: PathBuf },
}

/// Result type alias for LoadRS operations
pub type Result<T> = std::result::Result<T, LoadRsError>;

impl LoadRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LoadRsError::Precondition(_) => ErrorSeverity::Error,
            LoadRsError::Validation(_) => ErrorSeverity::Warning,
            LoadRsError::Import(ImportError::Empty { .. }) => ErrorSeverity::Warning,
            LoadRsError::Import(_) => ErrorSeverity::Error,
            LoadRsError::Configuration(_) => ErrorSeverity::Error,
            LoadRsError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LoadRsError::Precondition(PreconditionError::InvalidProgramLength { .. }) => {
                "A training program needs at least one week.".to_string()
            }
            LoadRsError::Import(ImportError::UnsupportedFormat { format }) => {
                format!("Cannot read '{}' files. Use CSV or JSON.", format)
            }
            LoadRsError::Import(ImportError::Empty { path }) => {
                format!("No usable records in {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
