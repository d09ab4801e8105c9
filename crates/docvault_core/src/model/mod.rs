//! Domain model for namespaced documents and their ownership graph.
//!
//! # Responsibility
//! - Define identifiers, documents, directory records and ownership mappings.
//!
//! # Invariants
//! - Every stored object is keyed by a 16-byte [`Id`](id::Id) that is never reused.
//! - Document payloads are opaque bytes; the model never inspects them.

pub mod directory;
pub mod document;
pub mod id;
pub mod mapping;
