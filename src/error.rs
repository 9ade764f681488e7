use thiserror::Error;

/// Main error type for GraphSight
#[derive(Error, Debug)]
pub enum GraphSightError {
    /// Database-related errors (store unavailable, SQL failures)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Property-map (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema migration failures (bad filename, failed SQL batch)
    #[error("Migration error: {0}")]
    Migration(String),

    /// Invalid caller input, rejected before any store mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Node or document lookup failed for a caller-supplied reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// Referential constraint violation (e.g. edge endpoint does not exist)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Internal invariant broken; indicates a caller bug, not bad data
    #[error("Invariant violation: {0}")]
    Invariant(String),
}

/// Convenient Result type using GraphSightError
pub type Result<T> = std::result::Result<T, GraphSightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphSightError::Validation("weight must be non-negative".to_string());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("weight must be non-negative"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: GraphSightError = rusqlite_err.into();
        assert!(matches!(err, GraphSightError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GraphSightError = io_err.into();
        assert!(matches!(err, GraphSightError::Io(_)));
    }

    #[test]
    fn test_not_found_distinct_from_validation() {
        let nf = GraphSightError::NotFound("node 42".to_string());
        assert!(nf.to_string().starts_with("Not found"));
    }
}
