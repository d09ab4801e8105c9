//! Document-layer error taxonomy.
//!
//! # Invariants
//! - Every error maps to exactly one [`ErrorKind`] and renders a non-empty
//!   message.
//! - Engine errors are wrapped unchanged so callers can inspect the source.

use crate::kv::KvError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DocResult<T> = Result<T, DocError>;

/// Coarse error class used by transports to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request shape (missing namespace, bad id, ...).
    Invalid,
    /// Namespace, document, organization or user does not exist.
    NotFound,
    /// A record with the same identity already exists.
    Conflict,
    /// Actor lacks the required ownership or membership.
    Unauthorized,
    /// Invariant violation, storage failure or corrupt persisted data.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug)]
pub enum DocError {
    Invalid(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Internal(String),
    /// Key/value engine failure, including missing buckets and keys.
    Kv(KvError),
    /// JSON encoding or decoding of a stored record failed.
    Serialization(serde_json::Error),
    /// Persisted bytes cannot be converted to a valid record.
    InvalidData(String),
}

impl DocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Internal(_) | Self::Serialization(_) | Self::InvalidData(_) => {
                ErrorKind::Internal
            }
            Self::Kv(err) if err.is_not_found() => ErrorKind::NotFound,
            Self::Kv(_) => ErrorKind::Internal,
        }
    }
}

impl Display for DocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Unauthorized(message)
            | Self::Internal(message) => write!(f, "{message}"),
            Self::Kv(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "record serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for DocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<KvError> for DocError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

impl From<serde_json::Error> for DocError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
