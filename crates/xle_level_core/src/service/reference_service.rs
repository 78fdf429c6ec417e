//! Cell reference resolution and document-graph sweeps.
//!
//! # Responsibility
//! - Answer whether a type is a reference type.
//! - Map any node to the node it stands for (reference target root, or itself).
//! - Sweep a game's placements folder to resolve every cell on load.
//! - Sweep the same folder to save every resolved cell to its declared location.
//!
//! # Invariants
//! - Entry points accept arbitrary nodes; a node that does not adapt to the
//!   expected kind turns the call into a no-op.
//! - Sweeps visit references in collection order and never stop early.
//! - Unresolved references are skipped by saves without being reported as errors.

use crate::model::adapt::{CellRefView, GameView};
use crate::model::node::{DocumentId, NodeId, NodeRef};
use crate::model::schema::{NodeTypeId, Schema};
use crate::repo::document_repo::DocumentRepository;
use crate::service::document_service::DocumentManager;
use log::{info, warn};

/// One reference that could not be resolved or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFailure {
    pub cell_ref: NodeId,
    pub location: Option<String>,
    pub message: String,
}

/// Outcome of a load sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of references the sweep attempted.
    pub attempted: usize,
    /// `(reference, target)` pairs now resolved, in collection order.
    pub resolved: Vec<(NodeId, DocumentId)>,
    pub failures: Vec<ReferenceFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a save sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Locations written, in collection order.
    pub saved: Vec<String>,
    /// References without a live target.
    pub skipped: Vec<NodeId>,
    pub failures: Vec<ReferenceFailure>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Returns whether `node_type` is, or derives from, the cell reference type.
pub fn is_reference_type(schema: &Schema, node_type: NodeTypeId) -> bool {
    schema.is_assignable_from(schema.tags().placements_cell_reference, node_type)
}

/// Returns the root of the referenced cell when `node` is a resolved cell
/// reference whose target is open; otherwise returns `node` unchanged.
pub fn resolve_target_node<R: DocumentRepository>(
    manager: &DocumentManager<R>,
    node: NodeRef,
) -> NodeRef {
    let is_cell_ref = manager
        .document(node.document)
        .and_then(|document| CellRefView::adapt(manager.schema(), document, node.node))
        .is_some();
    if !is_cell_ref {
        return node;
    }

    manager
        .live_target(node)
        .and_then(|target| manager.document(target))
        .map_or(node, |target| NodeRef::new(target.id(), target.root()))
}

/// Resolves every cell reference of the game's placements folder.
///
/// Does nothing when `game` is not a Game node or has no placements folder.
/// A failing reference is logged and recorded; the sweep continues.
pub fn resolve_on_load<R: DocumentRepository>(
    manager: &mut DocumentManager<R>,
    game: NodeRef,
) -> LoadReport {
    let mut report = LoadReport::default();
    let Some(cells) = collect_cell_refs(manager, game) else {
        return report;
    };

    for (cell, location) in cells {
        report.attempted += 1;
        let cell_ref = NodeRef::new(game.document, cell);
        match manager.resolve_cell_reference(cell_ref) {
            Ok(target) => report.resolved.push((cell, target)),
            Err(err) => {
                warn!(
                    "event=cell_resolve module=reference status=error location={} error={}",
                    location.as_deref().unwrap_or("<none>"),
                    err
                );
                report.failures.push(ReferenceFailure {
                    cell_ref: cell,
                    location,
                    message: err.to_string(),
                });
            }
        }
    }

    info!(
        "event=resolve_on_load module=reference status=ok attempted={} resolved={} failed={}",
        report.attempted,
        report.resolved.len(),
        report.failures.len()
    );
    report
}

/// Saves every resolved cell of the game's placements folder to the location
/// declared on its reference.
///
/// Does nothing when `game` is not a Game node or has no placements folder.
/// References without a live target are skipped. A failing save is logged and
/// recorded; the remaining references are still attempted.
pub fn save_referenced_documents<R: DocumentRepository>(
    manager: &mut DocumentManager<R>,
    game: NodeRef,
) -> SaveReport {
    let mut report = SaveReport::default();
    let Some(cells) = collect_cell_refs(manager, game) else {
        return report;
    };

    for (cell, location) in cells {
        let Some(target) = manager.live_target(NodeRef::new(game.document, cell)) else {
            report.skipped.push(cell);
            continue;
        };
        let Some(location) = location.filter(|value| !value.trim().is_empty()) else {
            warn!("event=cell_save module=reference status=error error_code=missing_location");
            report.failures.push(ReferenceFailure {
                cell_ref: cell,
                location: None,
                message: "cell reference has no location".to_string(),
            });
            continue;
        };

        match manager.save_document_to(target, &location) {
            Ok(()) => report.saved.push(location),
            Err(err) => report.failures.push(ReferenceFailure {
                cell_ref: cell,
                location: Some(location),
                message: err.to_string(),
            }),
        }
    }

    info!(
        "event=save_referenced module=reference status=ok saved={} skipped={} failed={}",
        report.saved.len(),
        report.skipped.len(),
        report.failures.len()
    );
    report
}

/// Snapshot of `(reference, location)` pairs so the sweep can mutate the manager.
fn collect_cell_refs<R: DocumentRepository>(
    manager: &DocumentManager<R>,
    game: NodeRef,
) -> Option<Vec<(NodeId, Option<String>)>> {
    let document = manager.document(game.document)?;
    let folder = GameView::adapt(manager.schema(), document, game.node)?.placements_folder()?;
    Some(
        folder
            .cells()
            .into_iter()
            .map(|cell| (cell.node_id(), cell.uri().map(str::to_string)))
            .collect(),
    )
}
