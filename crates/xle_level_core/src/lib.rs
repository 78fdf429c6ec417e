//! Level document graph for the XLE level editor.
//! Typed schema, document arena, cell reference resolution and schema-driven
//! property editors behind the host patch surface.

pub mod config;
pub mod db;
pub mod editor;
pub mod host;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EditorConfig};
pub use editor::collection::{move_by_offset, CollectionContext, CollectionEditor};
pub use editor::registry::{
    ChildPropertyDescriptor, PropertyEditorError, PropertyEditorRegistry, PropertyKey,
};
pub use host::{get_schema_resource_name, on_schema_set_loaded, HostError, LevelEditorHost};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::adapt::{CellRefView, GameView, NodeKind, PlacementsFolderView, TerrainTextureView};
pub use model::node::{Document, DocumentError, DocumentId, DomNode, NodeId, NodeRef};
pub use model::record::NodeRecord;
pub use model::schema::{NodeTypeId, Schema, SchemaError, SchemaTags, TypeCollection, TypeDecl};
pub use repo::document_repo::{
    DocumentRepoError, DocumentRepoResult, DocumentRepository, SqliteDocumentRepository,
};
pub use service::document_service::{DocumentManager, DocumentServiceError};
pub use service::reference_service::{
    is_reference_type, resolve_on_load, resolve_target_node, save_referenced_documents,
    LoadReport, ReferenceFailure, SaveReport,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
