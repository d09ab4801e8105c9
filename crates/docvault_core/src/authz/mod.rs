//! Ownership-based authorization for documents.
//!
//! # Responsibility
//! - Evaluate ownership and membership over the relation store
//!   ([`index::DocumentIndex`]).
//! - Express per-call authorization rules as composable values
//!   ([`options`]).

pub mod index;
pub mod options;
