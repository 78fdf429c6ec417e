//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `xle_level_core` linkage and print the host surface constants.
//! - Optionally load one game from the document store and run the load sweep.
//!
//! Usage: `xle_level_cli [config.json] [game-location]`

use log::error;
use std::path::Path;
use std::process::ExitCode;
use xle_level_core::db::open_db;
use xle_level_core::{
    core_version, get_schema_resource_name, init_logging, on_schema_set_loaded, EditorConfig,
    LevelEditorHost, NodeRef, SqliteDocumentRepository, TypeCollection,
};

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let game_location = args.next();

    match run(config_path.as_deref(), game_location.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<&str>, game_location: Option<&str>) -> Result<(), String> {
    let config = match config_path {
        Some(path) => EditorConfig::load(Path::new(path)).map_err(|err| err.to_string())?,
        None => EditorConfig::default(),
    };
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    let host = on_schema_set_loaded(&[TypeCollection::xle_baseline()])
        .map_err(|err| err.to_string())?;
    let (namespace, resource) = get_schema_resource_name();
    println!("xle_level_core version={}", core_version());
    println!("schema resource={namespace}/{resource}");
    println!(
        "game type={}",
        host.schema().type_name(host.get_game_type())
    );

    match game_location {
        Some(location) => sweep_game(&host, &config, location),
        None => Ok(()),
    }
}

fn sweep_game(host: &LevelEditorHost, config: &EditorConfig, location: &str) -> Result<(), String> {
    let conn = open_db(&config.store_path).map_err(|err| err.to_string())?;
    let repo = SqliteDocumentRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let mut manager = host.document_manager(&repo);

    let game = manager
        .open_document(location)
        .map_err(|err| err.to_string())?;
    let root = manager
        .document(game)
        .map(|document| document.root())
        .ok_or_else(|| format!("document `{location}` closed unexpectedly"))?;
    let report = host.resolve_on_load(&mut manager, NodeRef::new(game, root));

    println!(
        "cells attempted={} resolved={} failed={}",
        report.attempted,
        report.resolved.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!(
            "  unresolved location={} error={}",
            failure.location.as_deref().unwrap_or("<none>"),
            failure.message
        );
    }
    Ok(())
}
