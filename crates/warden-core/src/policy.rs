//! Policy document loading.
//!
//! A policy document is a JSON rule table for one governance domain. Documents
//! are loaded once per audit run and are immutable for that run. A malformed
//! document is reported as a [`PolicyError`] for that document only; callers
//! decide how to surface it (the audit coordinator turns it into a failed check).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{sort_rules, PolicyRule, RuleAction, RuleParams, Severity};

/// A loaded, validated policy document. Rules are sorted by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub rules: Vec<PolicyRule>,
}

/// Errors raised while loading a policy document.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy document {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("policy '{policy}' declares rule '{rule}' more than once")]
    DuplicateRule { policy: String, rule: String },

    #[error("policy '{policy}' rule '{rule}' is invalid: {reason}")]
    InvalidRule {
        policy: String,
        rule: String,
        reason: String,
    },
}

/// On-disk shape of a rule. `action` may be omitted when `engine` is set.
#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    action: Option<RuleAction>,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    params: RuleParams,
    #[serde(default)]
    description: String,
    #[serde(default)]
    fix_command: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    id: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    rules: Vec<RawRule>,
}

/// Result of loading one file from a policy directory.
#[derive(Debug)]
pub struct PolicyLoad {
    pub path: PathBuf,
    pub result: Result<PolicyDocument, PolicyError>,
}

impl PolicyLoad {
    /// File stem of the document, used to name it when it fails to load.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl PolicyDocument {
    /// Parse and validate a policy document from JSON text.
    pub fn from_json(path: &str, content: &str) -> Result<Self, PolicyError> {
        let raw: RawDocument = serde_json::from_str(content).map_err(|source| PolicyError::Json {
            path: path.to_string(),
            source,
        })?;
        Self::from_raw(raw)
    }

    /// Load a policy document from a file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&display, &content)
    }

    fn from_raw(raw: RawDocument) -> Result<Self, PolicyError> {
        let mut seen = BTreeSet::new();
        let mut rules = Vec::with_capacity(raw.rules.len());

        for r in raw.rules {
            if r.id.trim().is_empty() {
                return Err(PolicyError::InvalidRule {
                    policy: raw.id.clone(),
                    rule: r.id,
                    reason: "rule id is empty".to_string(),
                });
            }
            if !seen.insert(r.id.clone()) {
                return Err(PolicyError::DuplicateRule {
                    policy: raw.id.clone(),
                    rule: r.id,
                });
            }

            let action = match (r.action, &r.engine) {
                (Some(RuleAction::DelegateToEngine), _) | (None, Some(_)) => RuleAction::DelegateToEngine,
                (Some(a), Some(engine)) => {
                    return Err(PolicyError::InvalidRule {
                        policy: raw.id.clone(),
                        rule: r.id,
                        reason: format!("action '{}' cannot be combined with engine '{engine}'", a.as_str()),
                    })
                }
                (Some(a), None) => a,
                (None, None) => {
                    return Err(PolicyError::InvalidRule {
                        policy: raw.id.clone(),
                        rule: r.id,
                        reason: "rule has neither an action nor an engine".to_string(),
                    })
                }
            };
            if action == RuleAction::DelegateToEngine && r.engine.is_none() {
                return Err(PolicyError::InvalidRule {
                    policy: raw.id.clone(),
                    rule: r.id,
                    reason: "engine action requires an engine id".to_string(),
                });
            }

            rules.push(PolicyRule {
                id: r.id,
                pattern: r.pattern,
                action,
                severity: r.severity,
                engine: r.engine,
                params: r.params,
                description: r.description,
                fix_command: r.fix_command,
                source: raw.id.clone(),
            });
        }

        sort_rules(&mut rules);
        Ok(PolicyDocument {
            id: raw.id,
            version: raw.version,
            description: raw.description,
            rules,
        })
    }
}

/// Load every `*.json` policy document in `dir`, sorted by file name.
///
/// A missing directory yields an empty list. Each file is loaded
/// independently so one malformed document never hides the others.
pub fn load_policy_dir(dir: &Path) -> Vec<PolicyLoad> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let result = PolicyDocument::load(&path);
            if let Err(e) = &result {
                tracing::warn!(path = %path.display(), error = %e, "failed to load policy document");
            }
            PolicyLoad { path, result }
        })
        .collect()
}
