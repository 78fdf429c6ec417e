//! Open-document management.
//!
//! # Responsibility
//! - Own every open document (game roots and placement cells).
//! - Provide the location-keyed save primitive shared by top-level saves and
//!   referenced-document saves.
//! - Implement cell reference resolution (Unresolved -> Resolved).
//!
//! # Invariants
//! - At most one open document per location.
//! - Reference targets are `DocumentId` handles; closing a document leaves
//!   handles to it dangling, which readers treat as unresolved.
//! - Resolving an already resolved reference has no side effects.

use crate::model::adapt::CellRefView;
use crate::model::node::{Document, DocumentError, DocumentId, NodeRef};
use crate::model::schema::{NodeTypeId, Schema};
use crate::repo::document_repo::{DocumentRepoError, DocumentRepository};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from document management operations.
#[derive(Debug)]
pub enum DocumentServiceError {
    /// No persisted document exists at the location.
    DocumentNotFound(String),
    /// Document id is not (or no longer) open.
    DocumentNotOpen(DocumentId),
    /// A document with this location is already open.
    AlreadyOpen(String),
    /// Node does not adapt to a cell reference.
    NotACellReference(NodeRef),
    /// Cell reference carries no usable location.
    MissingLocation(NodeRef),
    /// Referenced document root is not a placements document.
    TargetTypeMismatch { location: String, found: String },
    /// Tree-level failure.
    Document(DocumentError),
    /// Repository-level failure.
    Repo(DocumentRepoError),
}

impl Display for DocumentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound(location) => write!(f, "document not found: {location}"),
            Self::DocumentNotOpen(id) => write!(f, "document is not open: {id}"),
            Self::AlreadyOpen(location) => write!(f, "document already open: {location}"),
            Self::NotACellReference(node) => write!(
                f,
                "node {} in document {} is not a cell reference",
                node.node, node.document
            ),
            Self::MissingLocation(node) => {
                write!(f, "cell reference {} has no location", node.node)
            }
            Self::TargetTypeMismatch { location, found } => write!(
                f,
                "document `{location}` has root type `{found}`, expected a placements document"
            ),
            Self::Document(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DocumentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Document(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DocumentError> for DocumentServiceError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

impl From<DocumentRepoError> for DocumentServiceError {
    fn from(value: DocumentRepoError) -> Self {
        Self::Repo(value)
    }
}

/// Owner of all open documents for one editor session.
pub struct DocumentManager<R: DocumentRepository> {
    schema: Arc<Schema>,
    repo: R,
    documents: BTreeMap<DocumentId, Document>,
    by_location: BTreeMap<String, DocumentId>,
}

impl<R: DocumentRepository> DocumentManager<R> {
    pub fn new(schema: Arc<Schema>, repo: R) -> Self {
        Self {
            schema,
            repo,
            documents: BTreeMap::new(),
            by_location: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(&id)
    }

    /// Id of the open document at `location`, if any.
    pub fn document_id(&self, location: &str) -> Option<DocumentId> {
        self.by_location.get(location).copied()
    }

    /// Creates a new, unsaved document with a fresh root.
    pub fn create_document(
        &mut self,
        location: impl Into<String>,
        root_type: NodeTypeId,
    ) -> Result<DocumentId, DocumentServiceError> {
        let location = location.into();
        if self.by_location.contains_key(&location) {
            return Err(DocumentServiceError::AlreadyOpen(location));
        }
        let document = Document::new(location, root_type);
        Ok(self.register(document))
    }

    /// Returns the open document at `location`, loading it when needed.
    pub fn open_document(&mut self, location: &str) -> Result<DocumentId, DocumentServiceError> {
        if let Some(id) = self.document_id(location) {
            return Ok(id);
        }

        let record = self
            .repo
            .load_document(location)?
            .ok_or_else(|| DocumentServiceError::DocumentNotFound(location.to_string()))?;
        let document = Document::from_record(location, &record, &self.schema)?;
        let id = self.register(document);
        info!(
            "event=document_open module=document status=ok location={} nodes={}",
            location,
            record.node_count()
        );
        Ok(id)
    }

    /// Saves a document to its own location.
    pub fn save_document(&mut self, id: DocumentId) -> Result<(), DocumentServiceError> {
        let location = self
            .documents
            .get(&id)
            .ok_or(DocumentServiceError::DocumentNotOpen(id))?
            .uri()
            .to_string();
        self.save_document_to(id, &location)
    }

    /// Persists a document at `location`, used verbatim as the store key.
    pub fn save_document_to(
        &mut self,
        id: DocumentId,
        location: &str,
    ) -> Result<(), DocumentServiceError> {
        let document = self
            .documents
            .get_mut(&id)
            .ok_or(DocumentServiceError::DocumentNotOpen(id))?;
        let record = document.to_record(&self.schema);
        if let Err(err) = self.repo.save_document(location, &record) {
            warn!(
                "event=document_save module=document status=error location={} error={}",
                location, err
            );
            return Err(err.into());
        }
        if document.uri() == location {
            document.mark_clean();
        }
        info!(
            "event=document_save module=document status=ok location={} nodes={}",
            location,
            record.node_count()
        );
        Ok(())
    }

    /// Closes a document and returns it. Handles to it become dangling.
    pub fn close_document(&mut self, id: DocumentId) -> Option<Document> {
        let document = self.documents.remove(&id)?;
        self.by_location.remove(document.uri());
        info!(
            "event=document_close module=document status=ok location={}",
            document.uri()
        );
        Some(document)
    }

    /// Open target of a reference node, ignoring closed documents.
    pub fn live_target(&self, cell_ref: NodeRef) -> Option<DocumentId> {
        self.documents
            .get(&cell_ref.document)?
            .target(cell_ref.node)
            .filter(|target| self.documents.contains_key(target))
    }

    /// Resolves one cell reference, loading the referenced cell on demand.
    ///
    /// # Errors
    /// - `DocumentNotOpen` / `NotACellReference` when `cell_ref` is not a
    ///   reference node of an open document.
    /// - `MissingLocation` when the reference has no non-blank location.
    /// - `DocumentNotFound` / `Repo` / `Document` when loading fails.
    /// - `TargetTypeMismatch` when the loaded root is not a placements document.
    ///
    /// On error the target stays unset, and a document opened only for this
    /// call is closed again.
    pub fn resolve_cell_reference(
        &mut self,
        cell_ref: NodeRef,
    ) -> Result<DocumentId, DocumentServiceError> {
        if let Some(target) = self.live_target(cell_ref) {
            return Ok(target);
        }

        let location = {
            let document = self
                .documents
                .get(&cell_ref.document)
                .ok_or(DocumentServiceError::DocumentNotOpen(cell_ref.document))?;
            let view = CellRefView::adapt(&self.schema, document, cell_ref.node)
                .ok_or(DocumentServiceError::NotACellReference(cell_ref))?;
            view.uri()
                .filter(|uri| !uri.trim().is_empty())
                .ok_or(DocumentServiceError::MissingLocation(cell_ref))?
                .to_string()
        };

        let already_open = self.document_id(&location).is_some();
        let target = self.open_document(&location)?;
        let root_type = self.documents[&target].root_type();
        let expected = self.schema.tags().placements_document;
        if !self.schema.is_assignable_from(expected, root_type) {
            if !already_open {
                self.close_document(target);
            }
            return Err(DocumentServiceError::TargetTypeMismatch {
                location,
                found: self.schema.type_name(root_type).to_string(),
            });
        }

        self.documents
            .get_mut(&cell_ref.document)
            .ok_or(DocumentServiceError::DocumentNotOpen(cell_ref.document))?
            .set_target(cell_ref.node, target)?;
        info!(
            "event=cell_resolve module=document status=ok location={}",
            location
        );
        Ok(target)
    }

    fn register(&mut self, document: Document) -> DocumentId {
        let id = document.id();
        self.by_location.insert(document.uri().to_string(), id);
        self.documents.insert(id, document);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentManager, DocumentServiceError};
    use crate::db::open_db_in_memory;
    use crate::model::node::NodeRef;
    use crate::model::schema::{names, Schema, TypeCollection};
    use crate::repo::document_repo::SqliteDocumentRepository;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::initialize(&TypeCollection::xle_baseline()).unwrap())
    }

    #[test]
    fn open_reuses_loaded_document_and_close_forgets_it() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        let schema = schema();
        let cell_type = schema.tags().placements_document;
        let mut manager = DocumentManager::new(schema, repo);

        let created = manager.create_document("cells/a.plcdoc", cell_type).unwrap();
        manager.save_document(created).unwrap();
        assert!(!manager.document(created).unwrap().is_dirty());
        assert_eq!(manager.open_document("cells/a.plcdoc").unwrap(), created);

        manager.close_document(created).unwrap();
        let reopened = manager.open_document("cells/a.plcdoc").unwrap();
        assert_ne!(reopened, created);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn create_rejects_duplicate_location_and_open_reports_missing() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        let schema = schema();
        let game_type = schema.tags().game;
        let mut manager = DocumentManager::new(schema, repo);

        manager.create_document("level.game", game_type).unwrap();
        assert!(matches!(
            manager.create_document("level.game", game_type),
            Err(DocumentServiceError::AlreadyOpen(_))
        ));
        assert!(matches!(
            manager.open_document("missing.game"),
            Err(DocumentServiceError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn mismatched_target_opened_by_resolve_is_closed_again() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        let schema = schema();
        let tags = *schema.tags();
        let mut manager = DocumentManager::new(schema, &repo);

        let wrong = manager.create_document("cells/wrong.plcdoc", tags.game).unwrap();
        manager.save_document(wrong).unwrap();
        manager.close_document(wrong).unwrap();

        let game = manager.create_document("level.game", tags.game).unwrap();
        let doc = manager.document_mut(game).unwrap();
        let root = doc.root();
        let folder = doc
            .append_child(root, names::PLACEMENTS_FOLDER_CHILD, tags.placements_folder)
            .unwrap();
        let cell = doc
            .append_child(folder, names::CELL_CHILD, tags.placements_cell_reference)
            .unwrap();
        doc.set_attribute(cell, names::URI_ATTR, "cells/wrong.plcdoc")
            .unwrap();
        let cell_ref = NodeRef::new(game, cell);

        assert!(matches!(
            manager.resolve_cell_reference(cell_ref),
            Err(DocumentServiceError::TargetTypeMismatch { .. })
        ));
        assert_eq!(manager.document_id("cells/wrong.plcdoc"), None);
        assert_eq!(manager.len(), 1);

        let reopened = manager.open_document("cells/wrong.plcdoc").unwrap();
        assert!(matches!(
            manager.resolve_cell_reference(cell_ref),
            Err(DocumentServiceError::TargetTypeMismatch { .. })
        ));
        assert_eq!(manager.document_id("cells/wrong.plcdoc"), Some(reopened));
        assert_eq!(manager.document(game).unwrap().target(cell), None);
    }
}
