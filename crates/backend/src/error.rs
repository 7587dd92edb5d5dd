//! Backend error taxonomy.
//!
//! None of these are fatal: callers log them and turn them into user-facing
//! notifications.

use thiserror::Error;

/// Wire code the document store uses for rule rejections.
pub const PERMISSION_DENIED: &str = "permission-denied";

/// Anonymous sign-in failed. The session simply stays absent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("sign-in rejected: {0}")]
    Rejected(String),

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// A create, delete or batch write failed. Local state is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("write rejected: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// A live query reported a failure and stopped delivering snapshots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("missing or insufficient permissions")]
    PermissionDenied,

    #[error("connectivity failure ({0})")]
    Connectivity(String),
}

impl SubscriptionError {
    /// Map a document-store error code onto the two failure classes.
    pub fn from_code(code: &str) -> Self {
        if code == PERMISSION_DENIED {
            Self::PermissionDenied
        } else {
            Self::Connectivity(code.to_string())
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::PermissionDenied => PERMISSION_DENIED,
            Self::Connectivity(code) => code,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Startup configuration could not be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("malformed config document: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
