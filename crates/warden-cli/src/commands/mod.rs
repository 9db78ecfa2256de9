pub mod actions;
pub mod audit;
pub mod check_paths;
pub mod verify_edit;

use std::path::PathBuf;
use std::sync::Arc;

use warden_core::config::WardenConfig;
use warden_core::policy::load_policy_dir;
use warden_core::sqlite::SqliteKnowledgeStore;
use warden_core::store::KnowledgeStore;
use warden_enforce::engines::EngineRegistry;
use warden_enforce::validator::PolicySet;

/// Exit code for operational failures (bad input, unreadable files).
/// Codes 0, 1 and 2 are the three-tier governance decision.
pub const EXIT_ERROR: i32 = 3;

/// A repository opened for governance: root, configuration, and engines.
pub struct Workspace {
    pub root: PathBuf,
    pub config: WardenConfig,
    pub engines: Arc<EngineRegistry>,
}

impl Workspace {
    pub fn open(root: Option<PathBuf>) -> Result<Self, String> {
        let root = match root {
            Some(r) => r,
            None => std::env::current_dir().map_err(|e| format!("failed to get current directory: {e}"))?,
        };
        let root = root
            .canonicalize()
            .map_err(|e| format!("cannot open repository root {}: {e}", root.display()))?;
        let config = WardenConfig::load(&root.join(".warden"));
        let store = open_store(&root, &config);
        let engines = Arc::new(EngineRegistry::with_defaults(&config, store));
        Ok(Self { root, config, engines })
    }

    /// Rules of every policy document that loads. Each malformed document
    /// becomes an error-severity load failure.
    pub fn load_policies(&self) -> PolicySet {
        PolicySet::from_loads(load_policy_dir(&self.root.join(&self.config.policy_dir)))
    }
}

fn open_store(root: &std::path::Path, config: &WardenConfig) -> Option<Arc<dyn KnowledgeStore>> {
    let db = config.knowledge.database.as_ref()?;
    let path = root.join(db);
    match SqliteKnowledgeStore::open_read_only(&path) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "knowledge store unavailable");
            None
        }
    }
}
