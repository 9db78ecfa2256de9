//! Hard invariants: rules with no override, evaluated before and
//! independently of the declarative rule table.

use std::path::{Component, Path, PathBuf};

use warden_core::types::{Severity, Violation};

/// Provenance recorded on hard-invariant violations.
pub const HARD_INVARIANT_SOURCE: &str = "hard_invariant";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("path {0:?} escapes the repository root")]
    EscapesRoot(String),
    #[error("absolute path {0:?} cannot be placed relative to the repository")]
    Unresolvable(String),
    #[error("path is empty")]
    EmptyPath,
}

pub trait HardInvariant: Send + Sync {
    fn id(&self) -> &str;

    /// `Ok(Some(message))` when `path` violates the invariant.
    fn check(&self, path: &str) -> Result<Option<String>, InvariantError>;

    /// Evaluate, failing closed: an evaluation fault is a violation.
    fn evaluate(&self, path: &str) -> Option<Violation> {
        let message = match self.check(path) {
            Ok(None) => return None,
            Ok(Some(message)) => message,
            Err(e) => {
                tracing::warn!(invariant = %self.id(), path, error = %e, "hard invariant evaluation failed");
                format!("hard invariant could not be evaluated: {e}")
            }
        };
        Some(Violation::new(
            self.id(),
            path,
            message,
            Severity::Error,
            HARD_INVARIANT_SOURCE,
        ))
    }
}

/// Never permit a write under the governance root.
#[derive(Debug, Clone)]
pub struct GovernanceRootInvariant {
    root: Vec<String>,
    display: String,
    repo_root: Option<PathBuf>,
}

impl GovernanceRootInvariant {
    pub fn new(governance_root: &str) -> Self {
        let root = lexical_components(governance_root).unwrap_or_default();
        Self {
            display: root.join("/"),
            root,
            repo_root: None,
        }
    }

    /// Resolve absolute paths against this repository root.
    pub fn with_repo_root(mut self, repo_root: &Path) -> Self {
        self.repo_root = Some(repo_root.to_path_buf());
        self
    }
}

impl HardInvariant for GovernanceRootInvariant {
    fn id(&self) -> &str {
        "governance_root"
    }

    fn check(&self, path: &str) -> Result<Option<String>, InvariantError> {
        if path.trim().is_empty() {
            return Err(InvariantError::EmptyPath);
        }
        let normalized = path.replace('\\', "/");
        let candidate = Path::new(&normalized);
        let relative = if candidate.is_absolute() {
            let Some(repo) = &self.repo_root else {
                return Err(InvariantError::Unresolvable(path.to_string()));
            };
            match candidate.strip_prefix(repo) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                Err(_) => return Ok(None),
            }
        } else {
            normalized.clone()
        };
        let parts =
            lexical_components(&relative).ok_or_else(|| InvariantError::EscapesRoot(path.to_string()))?;
        if self.root.is_empty() || parts.len() < self.root.len() {
            return Ok(None);
        }
        if parts[..self.root.len()] == self.root[..] {
            Ok(Some(format!(
                "writes under the governance root '{}' are never permitted",
                self.display
            )))
        } else {
            Ok(None)
        }
    }
}

/// Resolve `.` and `..` lexically. `None` if `..` climbs above the start.
fn lexical_components(path: &str) -> Option<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for c in Path::new(path).components() {
        match c {
            Component::Normal(s) => out.push(s.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                out.pop()?;
            }
        }
    }
    Some(out)
}
