//! Identifier model and generation.
//!
//! # Invariants
//! - `Id::encode` always yields exactly [`ID_ENCODED_LEN`] bytes.
//! - `Id::decode(&id.encode()) == Ok(id)` and the canonical string form
//!   parses back to the same value.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Width of the storage-key form of an [`Id`].
pub const ID_ENCODED_LEN: usize = 16;

/// Store-wide identifier for documents, users and organizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Placeholder carried by documents that have not been stored yet.
    pub const fn invalid() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }

    /// Fixed-width byte form used as a bucket key.
    pub fn encode(&self) -> [u8; ID_ENCODED_LEN] {
        *self.0.as_bytes()
    }

    /// Parses the fixed-width byte form produced by [`Id::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, IdError> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| IdError::InvalidLength(bytes.len()))
    }

    /// Parses the canonical string form (as rendered by `Display`).
    pub fn decode_from_string(value: &str) -> Result<Self, IdError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| IdError::InvalidString(value.to_string()))
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::decode_from_string(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    InvalidLength(usize),
    InvalidString(String),
}

impl Display for IdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLength(len) => {
                write!(f, "encoded id must be {ID_ENCODED_LEN} bytes, got {len}")
            }
            Self::InvalidString(value) => write!(f, "invalid id `{value}`"),
        }
    }
}

impl Error for IdError {}

/// Source of fresh identifiers.
pub trait IdGenerator {
    fn id(&self) -> Id;
}

/// Random (UUID v4) identifier generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn id(&self) -> Id {
        Id(Uuid::new_v4())
    }
}
