//! Level editor host patch surface.
//!
//! # Responsibility
//! - Receive the parsed schema from the host and initialize the typed layer.
//! - Register schema-driven property editors.
//! - Expose the accessors and document-graph entry points the host calls.
//!
//! # Invariants
//! - Only the first type collection of a schema set is used.
//! - Entry points that take arbitrary nodes never fail on a kind mismatch.

use crate::editor::collection::CollectionEditor;
use crate::editor::registry::{ChildPropertyDescriptor, PropertyEditorError, PropertyEditorRegistry};
use crate::model::node::{DocumentId, NodeRef};
use crate::model::schema::{names, NodeTypeId, Schema, SchemaError, TypeCollection};
use crate::repo::document_repo::DocumentRepository;
use crate::service::document_service::{DocumentManager, DocumentServiceError};
use crate::service::reference_service::{self, LoadReport, SaveReport};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Namespace of the packaged schema resource.
pub const SCHEMA_RESOURCE_NAMESPACE: &str = "LevelEditorXLE.Schema";
/// File name of the packaged schema resource.
pub const SCHEMA_RESOURCE_NAME: &str = "xleroot.xsd";

/// Returns `(namespace, resource name)` of the packaged schema definition.
pub fn get_schema_resource_name() -> (&'static str, &'static str) {
    (SCHEMA_RESOURCE_NAMESPACE, SCHEMA_RESOURCE_NAME)
}

/// Errors from schema-load wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Schema set contained no type collection.
    NoTypeCollections,
    Schema(SchemaError),
    PropertyEditor(PropertyEditorError),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTypeCollections => write!(f, "schema set contains no type collections"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::PropertyEditor(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoTypeCollections => None,
            Self::Schema(err) => Some(err),
            Self::PropertyEditor(err) => Some(err),
        }
    }
}

impl From<SchemaError> for HostError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<PropertyEditorError> for HostError {
    fn from(value: PropertyEditorError) -> Self {
        Self::PropertyEditor(value)
    }
}

/// Schema-dependent state created when the host finishes loading the schema.
#[derive(Debug)]
pub struct LevelEditorHost {
    schema: Arc<Schema>,
    property_editors: PropertyEditorRegistry,
}

/// Initializes the schema from the first type collection and registers the
/// strata collection editor on the terrain base texture type.
///
/// # Errors
/// - `NoTypeCollections` when `type_collections` is empty.
/// - `Schema` when the first collection is malformed or lacks a named type.
pub fn on_schema_set_loaded(type_collections: &[TypeCollection]) -> Result<LevelEditorHost, HostError> {
    let collection = type_collections.first().ok_or(HostError::NoTypeCollections)?;
    let schema = Schema::initialize(collection)?;

    let tags = *schema.tags();
    let mut property_editors = PropertyEditorRegistry::new();
    property_editors.register(
        &schema,
        tags.terrain_base_texture,
        ChildPropertyDescriptor::new("Strata", names::STRATA_CHILD, "List of texturing stratas")
            .with_editor(CollectionEditor::embedded(
                "Strata",
                tags.terrain_base_texture_strata,
            )),
    )?;

    info!(
        "event=schema_loaded module=host status=ok namespace={} types={} property_editors={}",
        schema.target_namespace(),
        schema.len(),
        property_editors.len()
    );
    Ok(LevelEditorHost {
        schema: Arc::new(schema),
        property_editors,
    })
}

impl LevelEditorHost {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn property_editors(&self) -> &PropertyEditorRegistry {
        &self.property_editors
    }

    /// Root document type, for the host's document-type registry.
    pub fn get_game_type(&self) -> NodeTypeId {
        self.schema.tags().game
    }

    /// Starts a document session sharing this host's schema.
    pub fn document_manager<R: DocumentRepository>(&self, repo: R) -> DocumentManager<R> {
        DocumentManager::new(Arc::clone(&self.schema), repo)
    }

    pub fn is_reference_type(&self, node_type: NodeTypeId) -> bool {
        reference_service::is_reference_type(&self.schema, node_type)
    }

    pub fn resolve_target_node<R: DocumentRepository>(
        &self,
        manager: &DocumentManager<R>,
        node: NodeRef,
    ) -> NodeRef {
        reference_service::resolve_target_node(manager, node)
    }

    pub fn resolve_on_load<R: DocumentRepository>(
        &self,
        manager: &mut DocumentManager<R>,
        game: NodeRef,
    ) -> LoadReport {
        reference_service::resolve_on_load(manager, game)
    }

    pub fn save_referenced_documents<R: DocumentRepository>(
        &self,
        manager: &mut DocumentManager<R>,
        game: NodeRef,
    ) -> SaveReport {
        reference_service::save_referenced_documents(manager, game)
    }

    /// Saves the game document, then every cell it references.
    ///
    /// # Errors
    /// Only a failure to save the game document itself is returned; cell
    /// failures are reported in the `SaveReport`.
    pub fn save_game<R: DocumentRepository>(
        &self,
        manager: &mut DocumentManager<R>,
        game: DocumentId,
    ) -> Result<SaveReport, DocumentServiceError> {
        manager.save_document(game)?;
        let root = manager
            .document(game)
            .ok_or(DocumentServiceError::DocumentNotOpen(game))?
            .root();
        Ok(reference_service::save_referenced_documents(
            manager,
            NodeRef::new(game, root),
        ))
    }
}
