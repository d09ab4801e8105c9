//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and authorization calls into document store
//!   APIs.
//! - Own transaction boundaries; repositories never open transactions.

pub mod document_service;
