//! Document model.
//!
//! # Invariants
//! - `id` is [`Id::invalid`] until the document is stored; the store assigns
//!   it.
//! - `meta` and `data` are persisted separately but always together.

use crate::model::id::Id;
use serde::{Deserialize, Serialize};

/// Searchable metadata stored in the namespace `meta` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub name: String,
}

/// A stored document: metadata plus an opaque, already-serialized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: Id,
    pub meta: DocumentMeta,
    /// Stored verbatim; only callers know its encoding.
    pub data: Vec<u8>,
}

impl Document {
    /// Creates an unsaved document.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Id::invalid(),
            meta: DocumentMeta { name: name.into() },
            data: data.into(),
        }
    }
}
