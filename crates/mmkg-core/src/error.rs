//! Centralized error types for MMKG core.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for loading and analysis operations.
#[derive(Error, Debug)]
pub enum MmkgError {
    #[error("Data root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Disease summary not found: {}", .0.display())]
    SummaryNotFound(PathBuf),

    #[error("Invalid summary row {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("Duplicate disease id {id} ('{first}' and '{second}')")]
    DuplicateCondition { id: i64, first: String, second: String },

    #[error("Curated tables error: {0}")]
    CuratedTables(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for MMKG core operations.
pub type MmkgResult<T> = Result<T, MmkgError>;

impl MmkgError {
    /// Create an invalid record error.
    pub fn invalid_record(line: u64, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MmkgError::SummaryNotFound(PathBuf::from("/data/DiseaseSummary.csv"));
        assert_eq!(err.to_string(), "Disease summary not found: /data/DiseaseSummary.csv");

        let err = MmkgError::invalid_record(4, "system is empty");
        assert_eq!(err.to_string(), "Invalid summary row 4: system is empty");

        let err = MmkgError::DuplicateCondition {
            id: 7,
            first: "Asthma".to_string(),
            second: "COPD".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate disease id 7 ('Asthma' and 'COPD')");
    }
}
