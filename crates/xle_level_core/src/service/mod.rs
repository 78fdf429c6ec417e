//! Document use-case services.
//!
//! # Responsibility
//! - Own open documents and the location-keyed save primitive.
//! - Resolve and persist the cell documents a game references.
//! - Keep host entry points decoupled from storage details.

pub mod document_service;
pub mod reference_service;
