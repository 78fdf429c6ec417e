use std::cell::RefCell;
use xle_level_core::db::open_db_in_memory;
use xle_level_core::model::schema::names;
use xle_level_core::{
    is_reference_type, on_schema_set_loaded, resolve_target_node, Document, DocumentManager,
    DocumentRepoError, DocumentRepoResult, DocumentRepository, LevelEditorHost, NodeId,
    NodeRecord, NodeRef, SaveReport, Schema, SqliteDocumentRepository, TypeCollection, TypeDecl,
};

fn host() -> LevelEditorHost {
    on_schema_set_loaded(&[TypeCollection::xle_baseline()]).unwrap()
}

fn store_cell(repo: &SqliteDocumentRepository<'_>, schema: &Schema, location: &str) {
    let mut doc = Document::new(location, schema.tags().placements_document);
    let root = doc.root();
    let object_type = schema.type_id(names::PLACEMENT_OBJECT_TYPE).unwrap();
    let placement = doc
        .append_child(root, names::PLACEMENT_CHILD, object_type)
        .unwrap();
    doc.set_attribute(placement, "model", "game/model/rock.dae")
        .unwrap();
    repo.save_document(location, &doc.to_record(schema)).unwrap();
}

/// Builds a game with one cell reference per entry; an empty entry gets no uri.
fn create_game<R: DocumentRepository>(
    manager: &mut DocumentManager<R>,
    locations: &[&str],
) -> (NodeRef, Vec<NodeId>) {
    let tags = *manager.schema().tags();
    let game = manager
        .create_document("levels/test.game", tags.game)
        .unwrap();
    let doc = manager.document_mut(game).unwrap();
    let root = doc.root();
    let folder = doc
        .append_child(root, names::PLACEMENTS_FOLDER_CHILD, tags.placements_folder)
        .unwrap();

    let mut cells = Vec::new();
    for location in locations {
        let cell = doc
            .append_child(folder, names::CELL_CHILD, tags.placements_cell_reference)
            .unwrap();
        if !location.is_empty() {
            doc.set_attribute(cell, names::URI_ATTR, *location).unwrap();
        }
        cells.push(cell);
    }
    (NodeRef::new(game, root), cells)
}

#[test]
fn resolve_on_load_resolves_every_reference_in_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    let locations = ["cells/0_0.plcdoc", "cells/0_1.plcdoc", "cells/1_0.plcdoc"];
    for location in locations {
        store_cell(&repo, host.schema(), location);
    }

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &locations);
    let report = host.resolve_on_load(&mut manager, game);

    assert!(report.is_clean());
    assert_eq!(report.attempted, 3);
    let resolved_refs: Vec<NodeId> = report.resolved.iter().map(|(cell, _)| *cell).collect();
    assert_eq!(resolved_refs, cells);

    for ((cell, target), location) in report.resolved.iter().zip(locations) {
        let target_doc = manager.document(*target).unwrap();
        assert_eq!(target_doc.uri(), location);
        assert_eq!(
            resolve_target_node(&manager, NodeRef::new(game.document, *cell)),
            NodeRef::new(*target, target_doc.root())
        );
    }
}

#[test]
fn load_sweep_continues_past_failing_references() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    store_cell(&repo, host.schema(), "cells/a.plcdoc");
    store_cell(&repo, host.schema(), "cells/b.plcdoc");
    let wrong = Document::new("cells/wrong.plcdoc", host.get_game_type());
    repo.save_document("cells/wrong.plcdoc", &wrong.to_record(host.schema()))
        .unwrap();

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(
        &mut manager,
        &[
            "cells/a.plcdoc",
            "cells/missing.plcdoc",
            "",
            "cells/wrong.plcdoc",
            "cells/b.plcdoc",
        ],
    );
    let report = host.resolve_on_load(&mut manager, game);

    assert_eq!(report.attempted, 5);
    let resolved: Vec<NodeId> = report.resolved.iter().map(|(cell, _)| *cell).collect();
    assert_eq!(resolved, vec![cells[0], cells[4]]);
    let failed: Vec<NodeId> = report.failures.iter().map(|f| f.cell_ref).collect();
    assert_eq!(failed, vec![cells[1], cells[2], cells[3]]);
    assert_eq!(report.failures[1].location, None);

    for cell in &cells[1..4] {
        let node = NodeRef::new(game.document, *cell);
        assert_eq!(resolve_target_node(&manager, node), node);
    }
    assert_eq!(manager.document_id("cells/wrong.plcdoc"), None);
}

#[test]
fn resolution_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    store_cell(&repo, host.schema(), "cells/0_0.plcdoc");

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &["cells/0_0.plcdoc"]);
    let cell_ref = NodeRef::new(game.document, cells[0]);

    let first = manager.resolve_cell_reference(cell_ref).unwrap();
    let open_after_first = manager.len();
    let second = manager.resolve_cell_reference(cell_ref).unwrap();
    assert_eq!(first, second);
    assert_eq!(manager.len(), open_after_first);

    let report = host.resolve_on_load(&mut manager, game);
    assert_eq!(report.resolved, vec![(cells[0], first)]);
    assert_eq!(manager.len(), open_after_first);

    let once = resolve_target_node(&manager, cell_ref);
    let twice = resolve_target_node(&manager, cell_ref);
    assert_eq!(once, twice);
    assert_eq!(once.document, first);
}

#[test]
fn non_reference_nodes_pass_through() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &["cells/unresolved.plcdoc"]);
    let folder = manager.document(game.document).unwrap().children(
        game.node,
        names::PLACEMENTS_FOLDER_CHILD,
    )[0];

    for node in [
        game,
        NodeRef::new(game.document, folder),
        NodeRef::new(game.document, cells[0]),
        NodeRef::new(game.document, uuid::Uuid::new_v4()),
        NodeRef::new(uuid::Uuid::new_v4(), game.node),
    ] {
        assert_eq!(host.resolve_target_node(&manager, node), node);
    }
}

#[test]
fn reference_type_test_covers_subtypes_only() {
    let mut collection = TypeCollection::xle_baseline();
    collection.types.push(
        TypeDecl::new("streamedCellReferenceType")
            .with_base(names::PLACEMENTS_CELL_REFERENCE_TYPE)
            .with_attribute("streamingDistance"),
    );
    let host = on_schema_set_loaded(&[collection]).unwrap();
    let schema = host.schema();
    let streamed = schema.type_id("streamedCellReferenceType").unwrap();

    assert!(is_reference_type(schema, schema.tags().placements_cell_reference));
    assert!(host.is_reference_type(streamed));
    assert!(!host.is_reference_type(schema.tags().placements_folder));
    assert!(!host.is_reference_type(host.get_game_type()));
}

#[test]
fn derived_reference_types_are_resolved_by_the_sweep() {
    let mut collection = TypeCollection::xle_baseline();
    collection.types.push(
        TypeDecl::new("streamedCellReferenceType")
            .with_base(names::PLACEMENTS_CELL_REFERENCE_TYPE),
    );
    let host = on_schema_set_loaded(&[collection]).unwrap();
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    store_cell(&repo, host.schema(), "cells/streamed.plcdoc");

    let mut manager = host.document_manager(&repo);
    let (game, _) = create_game(&mut manager, &[]);
    let streamed = host.schema().type_id("streamedCellReferenceType").unwrap();
    let doc = manager.document_mut(game.document).unwrap();
    let folder = doc.children(game.node, names::PLACEMENTS_FOLDER_CHILD)[0];
    let cell = doc.append_child(folder, names::CELL_CHILD, streamed).unwrap();
    doc.set_attribute(cell, names::URI_ATTR, "cells/streamed.plcdoc")
        .unwrap();

    let report = host.resolve_on_load(&mut manager, game);
    assert_eq!(report.resolved.len(), 1);
    assert_eq!(report.resolved[0].0, cell);
}

#[test]
fn sweeps_ignore_nodes_that_are_not_games() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    store_cell(&repo, host.schema(), "cells/0_0.plcdoc");

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &["cells/0_0.plcdoc"]);
    let not_a_game = NodeRef::new(game.document, cells[0]);
    let open_before = manager.len();

    let load = host.resolve_on_load(&mut manager, not_a_game);
    assert_eq!(load.attempted, 0);
    assert_eq!(manager.len(), open_before);
    assert_eq!(
        manager.document(game.document).unwrap().target(cells[0]),
        None
    );

    let save = host.save_referenced_documents(&mut manager, not_a_game);
    assert_eq!(save, SaveReport::default());
    let missing_doc = NodeRef::new(uuid::Uuid::new_v4(), game.node);
    assert_eq!(host.resolve_on_load(&mut manager, missing_doc).attempted, 0);
    assert_eq!(repo.list_locations().unwrap(), vec!["cells/0_0.plcdoc"]);
}

#[test]
fn game_without_placements_folder_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();

    let mut manager = host.document_manager(&repo);
    let game = manager
        .create_document("levels/empty.game", host.get_game_type())
        .unwrap();
    let root = manager.document(game).unwrap().root();

    let load = host.resolve_on_load(&mut manager, NodeRef::new(game, root));
    let save = host.save_referenced_documents(&mut manager, NodeRef::new(game, root));
    assert_eq!(load.attempted, 0);
    assert!(save.saved.is_empty() && save.skipped.is_empty());
}

#[test]
fn save_skips_unresolved_and_uses_declared_location_verbatim() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    let odd_location = "Cells\\Row 0\\0_1.PLCDOC";
    store_cell(&repo, host.schema(), odd_location);

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &[odd_location, "cells/never.plcdoc"]);
    let target = manager
        .resolve_cell_reference(NodeRef::new(game.document, cells[0]))
        .unwrap();

    let object_type = host.schema().type_id(names::PLACEMENT_OBJECT_TYPE).unwrap();
    let cell_doc = manager.document_mut(target).unwrap();
    let cell_root = cell_doc.root();
    cell_doc
        .append_child(cell_root, names::PLACEMENT_CHILD, object_type)
        .unwrap();
    assert!(cell_doc.is_dirty());

    let report = host.save_referenced_documents(&mut manager, game);
    assert!(report.is_clean());
    assert_eq!(report.saved, vec![odd_location.to_string()]);
    assert_eq!(report.skipped, vec![cells[1]]);
    assert_eq!(repo.list_locations().unwrap(), vec![odd_location]);
    assert!(!manager.document(target).unwrap().is_dirty());

    let stored = repo.load_document(odd_location).unwrap().unwrap();
    assert_eq!(stored.children[names::PLACEMENT_CHILD].len(), 2);
}

#[test]
fn closed_targets_read_as_unresolved() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    store_cell(&repo, host.schema(), "cells/0_0.plcdoc");

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &["cells/0_0.plcdoc"]);
    let cell_ref = NodeRef::new(game.document, cells[0]);
    let target = manager.resolve_cell_reference(cell_ref).unwrap();
    manager.close_document(target).unwrap();

    assert_eq!(resolve_target_node(&manager, cell_ref), cell_ref);
    let report = host.save_referenced_documents(&mut manager, game);
    assert_eq!(report.skipped, vec![cells[0]]);

    let relinked = manager.resolve_cell_reference(cell_ref).unwrap();
    assert_ne!(relinked, target);
}

#[test]
fn save_game_persists_game_then_cells() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    store_cell(&repo, host.schema(), "cells/0_0.plcdoc");

    let mut manager = host.document_manager(&repo);
    let (game, _) = create_game(&mut manager, &["cells/0_0.plcdoc"]);
    host.resolve_on_load(&mut manager, game);

    let report = host.save_game(&mut manager, game.document).unwrap();
    assert_eq!(report.saved, vec!["cells/0_0.plcdoc".to_string()]);
    assert_eq!(
        repo.list_locations().unwrap(),
        vec!["cells/0_0.plcdoc", "levels/test.game"]
    );

    let mut reloaded = host.document_manager(&repo);
    let game_id = reloaded.open_document("levels/test.game").unwrap();
    let root = reloaded.document(game_id).unwrap().root();
    let report = host.resolve_on_load(&mut reloaded, NodeRef::new(game_id, root));
    assert_eq!(report.resolved.len(), 1);
}

/// Store that rejects writes to one location and records every write attempt.
struct RejectingStore<'conn> {
    inner: SqliteDocumentRepository<'conn>,
    rejected: &'static str,
    writes: RefCell<Vec<String>>,
}

impl DocumentRepository for RejectingStore<'_> {
    fn load_document(&self, location: &str) -> DocumentRepoResult<Option<NodeRecord>> {
        self.inner.load_document(location)
    }

    fn save_document(&self, location: &str, root: &NodeRecord) -> DocumentRepoResult<()> {
        self.writes.borrow_mut().push(location.to_string());
        if location == self.rejected {
            return Err(DocumentRepoError::InvalidLocation(location.to_string()));
        }
        self.inner.save_document(location, root)
    }

    fn delete_document(&self, location: &str) -> DocumentRepoResult<bool> {
        self.inner.delete_document(location)
    }

    fn list_locations(&self) -> DocumentRepoResult<Vec<String>> {
        self.inner.list_locations()
    }
}

#[test]
fn save_sweep_continues_past_failing_locations() {
    let conn = open_db_in_memory().unwrap();
    let host = host();
    let store = RejectingStore {
        inner: SqliteDocumentRepository::try_new(&conn).unwrap(),
        rejected: "cells/b.plcdoc",
        writes: RefCell::new(Vec::new()),
    };
    let locations = ["cells/a.plcdoc", "cells/b.plcdoc", "cells/c.plcdoc"];
    for location in locations {
        store_cell(&store.inner, host.schema(), location);
    }

    let mut manager = host.document_manager(&store);
    let (game, cells) = create_game(&mut manager, &locations);
    assert!(host.resolve_on_load(&mut manager, game).is_clean());
    store.writes.borrow_mut().clear();

    let report = host.save_referenced_documents(&mut manager, game);
    assert_eq!(report.saved, vec!["cells/a.plcdoc", "cells/c.plcdoc"]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].cell_ref, cells[1]);
    assert_eq!(
        report.failures[0].location.as_deref(),
        Some("cells/b.plcdoc")
    );
    assert_eq!(*store.writes.borrow(), locations);
}

#[test]
fn save_sweep_reports_resolved_reference_without_location() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let host = host();
    let locations = ["cells/a.plcdoc", "cells/b.plcdoc", "cells/c.plcdoc"];
    for location in locations {
        store_cell(&repo, host.schema(), location);
    }

    let mut manager = host.document_manager(&repo);
    let (game, cells) = create_game(&mut manager, &locations);
    assert!(host.resolve_on_load(&mut manager, game).is_clean());
    manager
        .document_mut(game.document)
        .unwrap()
        .set_attribute(cells[1], names::URI_ATTR, "  ")
        .unwrap();

    let report = host.save_referenced_documents(&mut manager, game);
    assert_eq!(report.saved, vec!["cells/a.plcdoc", "cells/c.plcdoc"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].cell_ref, cells[1]);
    assert_eq!(report.failures[0].location, None);
}
