//! Unified application error types for CrudKit.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Every error carries a status code,
//! a short title and a detail string, which the transport layer renders as
//! `{"code", "title", "detail"}`.

use std::fmt;
use thiserror::Error;

/// Detail returned to callers for any server-side failure.
pub const SERVER_ERROR_MESSAGE: &str = "Something went wrong. Try to use this service later.";

/// Detail returned to callers for rejected request payloads.
pub const VALIDATION_ERROR_MESSAGE: &str = "Provided values are not valid.";

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// The request violates a business rule.
    BadRequest,
    /// The request payload failed schema validation.
    Validation,
    /// A storage-level failure, optionally classified by [`IntegrityViolation`].
    Database,
    /// An unclassified internal error.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// Portable categories of integrity-constraint violations.
///
/// Each storage backend maps its driver-specific codes into this closed set
/// at the storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// A unique constraint or primary key collided.
    Unique,
    /// A foreign key reference is dangling.
    ForeignKey,
    /// A required column received NULL.
    NotNull,
    /// A CHECK constraint rejected the row.
    Check,
}

impl IntegrityViolation {
    /// HTTP status code for this violation class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unique | Self::ForeignKey => 409,
            Self::NotNull | Self::Check => 400,
        }
    }

    /// Short response title for this violation class.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Unique | Self::ForeignKey => "Conflict",
            Self::NotNull | Self::Check => "Bad request",
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => write!(f, "unique violation"),
            Self::ForeignKey => write!(f, "foreign key violation"),
            Self::NotNull => write!(f, "not-null violation"),
            Self::Check => write!(f, "check violation"),
        }
    }
}

/// The unified application error used throughout CrudKit.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Integrity class for database errors raised by a constraint.
    pub violation: Option<IntegrityViolation>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            violation: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            violation: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an unclassified database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a database error classified as an integrity violation.
    pub fn integrity(violation: IntegrityViolation, message: impl Into<String>) -> Self {
        Self {
            violation: Some(violation),
            ..Self::new(ErrorKind::Database, message)
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Attach an integrity class to this error.
    pub fn with_violation(mut self, violation: IntegrityViolation) -> Self {
        self.violation = Some(violation);
        self
    }

    /// Whether the error is a storage-level failure.
    pub fn is_database(&self) -> bool {
        self.kind == ErrorKind::Database
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self.kind {
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Validation => 422,
            ErrorKind::Database => self.violation.map_or(500, |v| v.status_code()),
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Serialization => 500,
        }
    }

    /// Short title rendered alongside the status code.
    pub fn title(&self) -> &'static str {
        match self.kind {
            ErrorKind::NotFound => "Not found",
            ErrorKind::BadRequest => "Bad request",
            ErrorKind::Validation => "Validation error",
            ErrorKind::Database => self.violation.map_or("Database error", |v| v.title()),
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Serialization => {
                "Server error"
            }
        }
    }

    /// Detail string safe to return to the caller.
    ///
    /// Server-side failures never expose their message.
    pub fn public_detail(&self) -> String {
        match self.kind {
            ErrorKind::Validation => VALIDATION_ERROR_MESSAGE.to_string(),
            _ if self.is_server_error() => SERVER_ERROR_MESSAGE.to_string(),
            _ => self.message.clone(),
        }
    }

    /// Whether the error maps to a 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            violation: self.violation,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("x").status_code(), 404);
        assert_eq!(AppError::bad_request("x").status_code(), 400);
        assert_eq!(AppError::validation("x").status_code(), 422);
        assert_eq!(AppError::internal("x").status_code(), 500);
        assert_eq!(AppError::database("x").status_code(), 500);
    }

    #[test]
    fn test_integrity_mapping() {
        let unique = AppError::integrity(IntegrityViolation::Unique, "dup");
        assert_eq!(unique.status_code(), 409);
        assert_eq!(unique.title(), "Conflict");

        let fk = AppError::integrity(IntegrityViolation::ForeignKey, "dangling");
        assert_eq!(fk.status_code(), 409);

        let not_null = AppError::integrity(IntegrityViolation::NotNull, "null name");
        assert_eq!(not_null.status_code(), 400);
        assert_eq!(not_null.title(), "Bad request");
    }

    #[test]
    fn test_public_detail_hides_server_errors() {
        let err = AppError::database("connection reset by peer");
        assert_eq!(err.public_detail(), SERVER_ERROR_MESSAGE);

        let err = AppError::not_found("Example with id=1 not found");
        assert_eq!(err.public_detail(), "Example with id=1 not found");

        let err = AppError::validation("name: length");
        assert_eq!(err.public_detail(), VALIDATION_ERROR_MESSAGE);
    }

    #[test]
    fn test_clone_keeps_violation() {
        let err = AppError::integrity(IntegrityViolation::Check, "bad");
        let cloned = err.clone();
        assert_eq!(cloned.violation, Some(IntegrityViolation::Check));
        assert_eq!(cloned.kind, ErrorKind::Database);
    }
}
