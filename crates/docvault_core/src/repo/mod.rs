//! Transaction-scoped persistence over the key/value engine.
//!
//! # Responsibility
//! - Own bucket names, key encodings and record formats.
//! - Keep engine details away from authorization and service orchestration.
//!
//! # Invariants
//! - Every function takes the caller's `&dyn Tx`; repositories never open
//!   transactions of their own.
//! - Missing records surface as `NotFound`, never as empty results.

pub mod directory_repo;
pub mod document_repo;
pub mod mapping_repo;
