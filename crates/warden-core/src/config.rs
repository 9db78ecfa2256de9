//! Configuration file loading for warden.
//!
//! Reads `.warden/warden.json` and provides typed access to all settings.
//! Falls back to sensible defaults when the config file is missing or incomplete.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level warden configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Root directory no write may ever touch (hard invariant).
    #[serde(default = "default_governance_root")]
    pub governance_root: String,
    /// Directory holding `*.json` policy documents, relative to the repo root.
    #[serde(default = "default_policy_dir")]
    pub policy_dir: String,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub structural: StructuralConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

/// Audit coordinator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Run-level timeout; 0 disables it.
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default = "default_top_offenders")]
    pub top_offenders: usize,
}

/// Structural engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralConfig {
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
}

/// External knowledge store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// SQLite database path, relative to the repo root.
    #[serde(default)]
    pub database: Option<String>,
    /// Logical collection name → current physical table name.
    #[serde(default)]
    pub table_shim: BTreeMap<String, String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_governance_root() -> String {
    ".intent".to_string()
}
fn default_policy_dir() -> String {
    ".warden/policies".to_string()
}
fn default_max_workers() -> usize {
    4
}
fn default_top_offenders() -> usize {
    5
}
fn default_max_comment_length() -> usize {
    120
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            timeout_seconds: 0,
            top_offenders: default_top_offenders(),
        }
    }
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            max_comment_length: default_max_comment_length(),
        }
    }
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            governance_root: default_governance_root(),
            policy_dir: default_policy_dir(),
            audit: AuditConfig::default(),
            structural: StructuralConfig::default(),
            knowledge: KnowledgeConfig::default(),
            ignore_patterns: vec![],
        }
    }
}

impl WardenConfig {
    /// Load configuration from `warden.json` inside the given warden directory.
    /// Returns defaults, with a warning, if the file doesn't exist or can't
    /// be parsed.
    pub fn load(warden_dir: &Path) -> Self {
        let config_path = warden_dir.join("warden.json");
        let content = match std::fs::read_to_string(&config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "config not readable, using defaults"
                );
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Self::default()
            }
        }
    }
}
