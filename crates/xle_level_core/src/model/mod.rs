//! Level document model.
//!
//! # Responsibility
//! - Define the schema types, node arena and typed views used by the
//!   resolver, editors and persistence layers.
//!
//! # Invariants
//! - Nodes are owned by exactly one `Document`.
//! - Cross-document links are `DocumentId` handles, never ownership.

pub mod adapt;
pub mod node;
pub mod record;
pub mod schema;
