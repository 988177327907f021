//! Domain error type for the mutation core.
//!
//! All failures in this workspace are values, never panics: every fallible
//! operation returns `DomainResult<T>`. A `DomainError` pairs a closed
//! category (`ErrorKind`) with a machine-readable code string such as
//! `validation.field.attachment_not_found`, a human message, and optional
//! structured details for callers that need more than the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error categories.
///
/// Callers dispatch on the kind (e.g. map to an HTTP status); the `code`
/// string on `DomainError` carries the finer-grained reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Invariant,
    NotImplemented,
    Unauthorized,
    Forbidden,
    Infrastructure,
    Unexpected,
}

impl ErrorKind {
    /// Returns the category name used in error codes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Invariant => "invariant",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Infrastructure => "infrastructure",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

/// Error value returned by every fallible operation in the mutation core.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    /// Machine-readable code, e.g. "validation.field.user_not_found"
    pub code: String,
    pub message: String,
    /// Optional structured payload (offending field id, raw value, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DomainError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, code, message)
    }

    /// Creates a conflict error.
    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, code, message)
    }

    /// Creates a not-found error.
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, code, message)
    }

    /// Creates an invariant-violation error (a bug surfaced as a value).
    pub fn invariant(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invariant, code, message)
    }

    /// Creates a not-implemented error.
    pub fn not_implemented(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, code, message)
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, code, message)
    }

    /// Creates a forbidden error.
    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, code, message)
    }

    /// Creates an infrastructure error (repository / transaction failure).
    pub fn infrastructure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Infrastructure, code, message)
    }

    /// Creates an unexpected error.
    pub fn unexpected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, code, message)
    }

    /// Attaches structured details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// True when the error belongs to the given category.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Result type alias used across the workspace.
pub type DomainResult<T> = Result<T, DomainError>;
