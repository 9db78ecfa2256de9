//! Pluggable verification engines.
//!
//! An engine is bound to one or more check types and is only ever invoked
//! through [`crate::dispatch::EngineDispatcher`], which owns severity and
//! message framing. Engines report raw findings in an [`EngineResult`].

pub mod content;
pub mod knowledge;
pub mod structural;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use warden_core::config::WardenConfig;
use warden_core::store::{KnowledgeStore, StoreError, TableShim};
use warden_core::types::{EngineResult, RuleParams};
use warden_parsers::treesitter::ParseError;

pub use content::ContentEngine;
pub use knowledge::KnowledgeEngine;
pub use structural::StructuralEngine;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine '{engine}' does not support check type '{check}'")]
    UnsupportedCheck { engine: String, check: String },

    #[error("rule parameters missing 'check_type'")]
    MissingCheckType,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine '{engine}' cannot verify {target}")]
    WrongTarget { engine: String, target: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Whether an engine inspects individual files or the repository as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineScope {
    File,
    Repository,
}

/// One file under evaluation.
///
/// `content` is the proposed text of a pending write; when absent the file
/// is judged as it is on disk. `baseline` is the text the write replaces.
#[derive(Debug, Clone)]
pub struct FileTarget {
    pub path: PathBuf,
    pub rel_path: String,
    pub content: Option<String>,
    pub baseline: Option<String>,
}

impl FileTarget {
    /// A file judged as it currently is on disk.
    pub fn on_disk(root: &Path, rel_path: &str) -> Self {
        Self {
            path: root.join(rel_path),
            rel_path: rel_path.to_string(),
            content: None,
            baseline: None,
        }
    }

    /// A pending write. The current on-disk text, if any, becomes the baseline.
    pub fn proposed(root: &Path, rel_path: &str, content: impl Into<String>) -> Self {
        let path = root.join(rel_path);
        let baseline = std::fs::read_to_string(&path).ok();
        Self {
            path,
            rel_path: rel_path.to_string(),
            content: Some(content.into()),
            baseline,
        }
    }

    pub fn with_baseline(mut self, baseline: impl Into<String>) -> Self {
        self.baseline = Some(baseline.into());
        self
    }

    /// Whether there is addressable content to judge: a pending write, or a
    /// regular file on disk.
    pub fn is_addressable(&self) -> bool {
        self.content.is_some() || self.path.is_file()
    }

    /// The text under evaluation: proposed content, else the file on disk.
    pub fn read(&self) -> Result<String, EngineError> {
        match &self.content {
            Some(c) => Ok(c.clone()),
            None => std::fs::read_to_string(&self.path).map_err(|source| EngineError::Unreadable {
                path: self.rel_path.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Target {
    File(FileTarget),
    Repository { root: PathBuf },
}

impl Target {
    /// Path used on violations produced for this target.
    pub fn display_path(&self) -> String {
        match self {
            Target::File(f) => f.rel_path.clone(),
            Target::Repository { .. } => ".".to_string(),
        }
    }

    pub fn as_file(&self) -> Option<&FileTarget> {
        match self {
            Target::File(f) => Some(f),
            Target::Repository { .. } => None,
        }
    }
}

pub trait Engine: Send + Sync {
    fn id(&self) -> &str;

    /// Check-type identifiers accepted in `params.check_type`.
    fn supported_checks(&self) -> &'static [&'static str];

    fn scope(&self) -> EngineScope {
        EngineScope::File
    }

    fn verify(&self, target: &Target, params: &RuleParams) -> Result<EngineResult, EngineError>;
}

/// Resolve and validate `params.check_type` against an engine's catalogue.
pub fn check_type<'p>(engine: &dyn Engine, params: &'p RuleParams) -> Result<&'p str, EngineError> {
    let check = params.check_type().ok_or(EngineError::MissingCheckType)?;
    if engine.supported_checks().contains(&check) {
        Ok(check)
    } else {
        Err(EngineError::UnsupportedCheck {
            engine: engine.id().to_string(),
            check: check.to_string(),
        })
    }
}

/// Capability map from engine id to engine.
///
/// Built once at startup and shared by reference; tests build their own.
#[derive(Default, Clone)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn Engine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The structural, content and knowledge engines configured from `config`.
    /// `store` backs the knowledge engine; without one its checks fail closed.
    pub fn with_defaults(config: &WardenConfig, store: Option<Arc<dyn KnowledgeStore>>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StructuralEngine::new(config.structural.max_comment_length)));
        registry.register(Arc::new(ContentEngine));
        registry.register(Arc::new(KnowledgeEngine::new(
            store,
            TableShim::new(config.knowledge.table_shim.clone()),
        )));
        registry
    }

    /// Register an engine, replacing any engine with the same id.
    pub fn register(&mut self, engine: Arc<dyn Engine>) -> Option<Arc<dyn Engine>> {
        self.engines.insert(engine.id().to_string(), engine)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Engine>> {
        self.engines.get(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }
}
