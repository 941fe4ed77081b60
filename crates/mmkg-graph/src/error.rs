//! Graph adapter errors.

use thiserror::Error;

/// Errors raised by graph repositories.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid identifier '{0}': labels, relationship types and property names must be alphanumeric")]
    InvalidIdentifier(String),

    #[error("Missing endpoint for {kind}: {from} -> {to}")]
    MissingEndpoint { kind: String, from: String, to: String },

    #[error("Unexpected value in column '{column}': {reason}")]
    Column { column: String, reason: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Result type for graph repository operations.
pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub fn column(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Column {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Reject anything that cannot be spliced into Cypher as a label, type or key.
pub fn check_identifier(name: &str) -> GraphResult<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(GraphError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_identifier() {
        assert!(check_identifier("MULTIMORBIDITY_PATTERN").is_ok());
        assert!(check_identifier("Disease").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("1abc").is_err());
        assert!(check_identifier("Disease) DETACH DELETE (n").is_err());
    }
}
