//! Schema-driven property editors.
//!
//! Editors are declared once when the schema loads; rendering them is the
//! host's concern.

pub mod collection;
pub mod registry;
