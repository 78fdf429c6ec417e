//! Typed views over generic document nodes.
//!
//! # Responsibility
//! - Answer "can this node be used as a Game / PlacementsFolder / CellReference
//!   / terrain texture?" with an optional typed view.
//! - Keep the closed set of known node kinds in one place.
//!
//! # Invariants
//! - Adaptation never fails loudly: a mismatch yields `None`.
//! - A view borrows its document; it never outlives or mutates it.

use crate::model::node::{Document, DocumentId, NodeId};
use crate::model::schema::{names, NodeTypeId, Schema};

/// Closed set of node kinds this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Game,
    PlacementsFolder,
    CellReference,
    PlacementsDocument,
    TerrainBaseTexture,
    Strata,
    Other,
}

impl NodeKind {
    /// Classifies a type by the most specific named tag it derives from.
    pub fn of(schema: &Schema, node_type: NodeTypeId) -> Self {
        let tags = schema.tags();
        let candidates = [
            (tags.placements_cell_reference, Self::CellReference),
            (tags.placements_folder, Self::PlacementsFolder),
            (tags.game, Self::Game),
            (tags.placements_document, Self::PlacementsDocument),
            (tags.terrain_base_texture_strata, Self::Strata),
            (tags.terrain_base_texture, Self::TerrainBaseTexture),
        ];
        candidates
            .into_iter()
            .find(|(tag, _)| schema.is_assignable_from(*tag, node_type))
            .map_or(Self::Other, |(_, kind)| kind)
    }
}

fn adapts_to(schema: &Schema, document: &Document, node: NodeId, tag: NodeTypeId) -> bool {
    document
        .node(node)
        .is_some_and(|entry| schema.is_assignable_from(tag, entry.node_type))
}

/// Game root view.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    schema: &'a Schema,
    document: &'a Document,
    node: NodeId,
}

impl<'a> GameView<'a> {
    pub fn adapt(schema: &'a Schema, document: &'a Document, node: NodeId) -> Option<Self> {
        adapts_to(schema, document, node, schema.tags().game).then_some(Self {
            schema,
            document,
            node,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// First child in the placements-folder slot that adapts, if any.
    pub fn placements_folder(&self) -> Option<PlacementsFolderView<'a>> {
        self.document
            .children(self.node, names::PLACEMENTS_FOLDER_CHILD)
            .iter()
            .find_map(|child| PlacementsFolderView::adapt(self.schema, self.document, *child))
    }
}

/// Placements folder view.
#[derive(Debug, Clone, Copy)]
pub struct PlacementsFolderView<'a> {
    schema: &'a Schema,
    document: &'a Document,
    node: NodeId,
}

impl<'a> PlacementsFolderView<'a> {
    pub fn adapt(schema: &'a Schema, document: &'a Document, node: NodeId) -> Option<Self> {
        adapts_to(schema, document, node, schema.tags().placements_folder).then_some(Self {
            schema,
            document,
            node,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Cell references in collection order. Foreign nodes in the slot are skipped.
    pub fn cells(&self) -> Vec<CellRefView<'a>> {
        self.document
            .children(self.node, names::CELL_CHILD)
            .iter()
            .filter_map(|child| CellRefView::adapt(self.schema, self.document, *child))
            .collect()
    }
}

/// Cell reference view.
#[derive(Debug, Clone, Copy)]
pub struct CellRefView<'a> {
    document: &'a Document,
    node: NodeId,
}

impl<'a> CellRefView<'a> {
    pub fn adapt(schema: &'a Schema, document: &'a Document, node: NodeId) -> Option<Self> {
        adapts_to(schema, document, node, schema.tags().placements_cell_reference)
            .then_some(Self { document, node })
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> Option<&'a str> {
        self.document.attribute(self.node, names::NAME_ATTR)
    }

    /// Declared location of the referenced cell, verbatim.
    pub fn uri(&self) -> Option<&'a str> {
        self.document.attribute(self.node, names::URI_ATTR)
    }

    /// Target handle; may name a document that has since been closed.
    pub fn target(&self) -> Option<DocumentId> {
        self.document.target(self.node)
    }
}

/// Terrain base texture view, owner of the strata collection.
#[derive(Debug, Clone, Copy)]
pub struct TerrainTextureView<'a> {
    document: &'a Document,
    node: NodeId,
}

impl<'a> TerrainTextureView<'a> {
    pub fn adapt(schema: &'a Schema, document: &'a Document, node: NodeId) -> Option<Self> {
        adapts_to(schema, document, node, schema.tags().terrain_base_texture)
            .then_some(Self { document, node })
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn strata(&self) -> &'a [NodeId] {
        self.document.children(self.node, names::STRATA_CHILD)
    }
}
