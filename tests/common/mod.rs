/// Shared test helpers for all warden integration tests.
///
/// Import from any integration test file with:
///   `#[path = "common/mod.rs"] mod common;`
pub mod generators;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use warden_core::config::WardenConfig;
use warden_core::store::KnowledgeStore;
use warden_enforce::dispatch::EngineDispatcher;
use warden_enforce::engines::EngineRegistry;

/// Create a repository from a set of files.
///
/// Each entry in `files` is `(relative_path, content)`.
/// Returns (TempDir, project_root). Hold the TempDir to keep the directory alive.
#[allow(dead_code)]
pub fn create_repo(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    for (path, content) in files {
        write_file(&root, path, content);
    }
    (dir, root)
}

#[allow(dead_code)]
pub fn write_file(root: &std::path::Path, rel: &str, content: &str) {
    let full_path = root.join(rel);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&full_path, content).unwrap();
}

/// Write a policy document into the default policy directory.
#[allow(dead_code)]
pub fn write_policy(root: &std::path::Path, id: &str, rules: serde_json::Value) {
    let doc = serde_json::json!({ "id": id, "version": "1", "rules": rules });
    write_file(root, &format!(".warden/policies/{id}.json"), &doc.to_string());
}

/// Default engines, optionally backed by a knowledge store.
#[allow(dead_code)]
pub fn engines(store: Option<Arc<dyn KnowledgeStore>>) -> Arc<EngineRegistry> {
    Arc::new(EngineRegistry::with_defaults(&WardenConfig::default(), store))
}

#[allow(dead_code)]
pub fn dispatcher() -> EngineDispatcher {
    EngineDispatcher::new(engines(None))
}

/// Create an in-memory knowledge store seeded with `sql`.
#[allow(dead_code)]
pub fn in_memory_store(sql: &str) -> Arc<dyn KnowledgeStore> {
    let store = warden_core::sqlite::SqliteKnowledgeStore::in_memory()
        .expect("Failed to create in-memory SqliteKnowledgeStore");
    store.execute_batch(sql).expect("Failed to seed knowledge store");
    Arc::new(store)
}
