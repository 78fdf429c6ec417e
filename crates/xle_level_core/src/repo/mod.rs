//! Repository layer for persisted documents.
//!
//! # Responsibility
//! - Define the location-keyed persistence contract used by document saves.
//! - Isolate SQLite and JSON details from the document manager.

pub mod document_repo;
