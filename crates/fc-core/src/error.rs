//! Unified error type for filecast.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in filecast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was malformed (missing file part, bad form value, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller lacks permission for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A catalog record exists but its artifact is gone from storage.
    ///
    /// Reported to clients as 404, but kept separate from [`Error::NotFound`]
    /// so that the integrity fault shows up in logs. `path` is for logs only
    /// and stays out of the display string returned to clients.
    #[error("artifact missing for file {id}")]
    ArtifactMissing {
        /// The record identifier.
        id: String,
        /// The storage path the record points at.
        path: String,
    },

    /// The requested byte range cannot be served from an artifact of `size`.
    #[error("Range not satisfiable for {size} byte artifact")]
    RangeNotSatisfiable {
        /// Total artifact size, echoed in `Content-Range: bytes */size`.
        size: u64,
    },

    /// The payload exceeds a configured size or storage limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The client stopped sending data for longer than the idle window.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Reading or writing durable artifact storage failed.
    #[error("Storage error: {source}")]
    Storage {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound { .. } => 404,
            Error::ArtifactMissing { .. } => 404,
            Error::Timeout(_) => 408,
            Error::PayloadTooLarge(_) => 413,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::Storage { .. } => 500,
            Error::Database { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound { .. } => "not_found",
            Error::ArtifactMissing { .. } => "artifact_missing",
            Error::Timeout(_) => "timeout",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::Storage { .. } => "storage_error",
            Error::Database { .. } => "database_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::ArtifactMissing`].
    pub fn artifact_missing(id: impl fmt::Display, path: impl fmt::Display) -> Self {
        Error::ArtifactMissing {
            id: id.to_string(),
            path: path.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("file", 42);
        assert_eq!(err.to_string(), "file not found: 42");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn artifact_missing_is_404_with_distinct_code() {
        let err = Error::artifact_missing(7, "/data/content/abc.mp4");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "artifact_missing");
        assert_eq!(err.to_string(), "artifact missing for file 7");
    }

    #[test]
    fn range_not_satisfiable_is_416() {
        let err = Error::RangeNotSatisfiable { size: 1000 };
        assert_eq!(err.http_status(), 416);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("missing file part".into());
        assert_eq!(err.to_string(), "Validation error: missing file part");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn io_converts_to_storage() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Storage { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn limits_and_timeouts() {
        assert_eq!(Error::PayloadTooLarge("x".into()).http_status(), 413);
        assert_eq!(Error::Timeout("idle".into()).http_status(), 408);
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }
}
