//! Checks run by the audit coordinator.
//!
//! A check groups enforcement methods under policy-rule ids. Checks only
//! read the shared [`AuditContext`] and return their own findings, so the
//! coordinator can run them concurrently without locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use warden_core::policy::{PolicyDocument, PolicyError, PolicyLoad};
use warden_core::types::{RuleAction, Severity, Violation};
use warden_parsers::treesitter::{grammar_for, TreeSitterParser};
use warden_parsers::walker::WalkEntry;

use crate::dispatch::EngineDispatcher;
use crate::engines::{EngineScope, FileTarget, Target};
use crate::matcher::RuleSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckError {
    #[error("policy document {path} failed to load: {reason}")]
    MalformedPolicy { path: String, reason: String },

    #[error("check failed: {0}")]
    Failed(String),
}

/// A discovered repository file.
#[derive(Debug, Clone, Serialize)]
pub struct AuditFile {
    pub rel_path: String,
    pub path: PathBuf,
    pub language: Option<&'static str>,
}

impl From<WalkEntry> for AuditFile {
    fn from(e: WalkEntry) -> Self {
        Self {
            rel_path: e.rel_path,
            path: e.path,
            language: e.language,
        }
    }
}

/// Per-file symbol counts from the parse pre-pass. Parse failures are
/// recorded, not fatal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolIndex {
    pub symbols: BTreeMap<String, usize>,
    pub parse_failures: BTreeMap<String, String>,
}

impl SymbolIndex {
    pub fn build(files: &[AuditFile]) -> Self {
        let mut index = SymbolIndex::default();
        let mut parser = TreeSitterParser::new();
        for f in files {
            let Some(grammar) = f.language.and_then(|l| grammar_for(l).ok()) else {
                continue;
            };
            let source = match std::fs::read_to_string(&f.path) {
                Ok(s) => s,
                Err(e) => {
                    index.parse_failures.insert(f.rel_path.clone(), e.to_string());
                    continue;
                }
            };
            match parser.parse(grammar, &source) {
                Ok(tree) => {
                    let n = grammar.symbols(tree.root_node(), source.as_bytes()).len();
                    index.symbols.insert(f.rel_path.clone(), n);
                }
                Err(e) => {
                    tracing::debug!(path = %f.rel_path, error = %e, "symbol index: parse failed");
                    index.parse_failures.insert(f.rel_path.clone(), e.to_string());
                }
            }
        }
        index
    }

    pub fn total(&self) -> usize {
        self.symbols.values().sum()
    }
}

/// Shared, read-only inputs for one audit run.
pub struct AuditContext {
    pub root: PathBuf,
    pub files: Vec<AuditFile>,
    pub symbols: SymbolIndex,
    pub dispatcher: EngineDispatcher,
}

impl AuditContext {
    pub fn new(root: &Path, files: Vec<AuditFile>, symbols: SymbolIndex, dispatcher: EngineDispatcher) -> Self {
        Self {
            root: root.to_path_buf(),
            files,
            symbols,
            dispatcher,
        }
    }
}

pub trait RuleCheck: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> &str;

    /// Policy rule ids this check enforces.
    fn policy_rule_ids(&self) -> Vec<String>;

    /// Command that remediates this check's findings, if one exists.
    fn fix_command(&self) -> Option<&str> {
        None
    }

    fn run(&self, ctx: &AuditContext) -> Result<Vec<Violation>, CheckError>;
}

/// Enforces every rule of one policy document over the repository.
///
/// A document that failed to load still becomes a check: running it fails,
/// which surfaces as that check's error without affecting any other.
pub struct PolicyRuleCheck {
    name: String,
    document: Result<PolicyDocument, CheckError>,
    rules: RuleSet,
}

impl PolicyRuleCheck {
    pub fn new(document: PolicyDocument) -> Self {
        let rules = RuleSet::compile(document.rules.clone());
        Self {
            name: document.id.clone(),
            document: Ok(document),
            rules,
        }
    }

    pub fn from_load(load: PolicyLoad) -> Self {
        let name = load.name();
        match load.result {
            Ok(doc) => Self::new(doc),
            Err(source) => Self {
                name,
                document: Err(CheckError::MalformedPolicy {
                    path: load.path.display().to_string(),
                    reason: policy_reason(&source),
                }),
                rules: RuleSet::default(),
            },
        }
    }
}

/// The load error without the path, which the check error already carries.
fn policy_reason(e: &PolicyError) -> String {
    match e {
        PolicyError::Io { source, .. } => source.to_string(),
        PolicyError::Json { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

impl RuleCheck for PolicyRuleCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        "policy"
    }

    fn policy_rule_ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.rule.id.clone()).collect()
    }

    fn run(&self, ctx: &AuditContext) -> Result<Vec<Violation>, CheckError> {
        if let Err(e) = &self.document {
            return Err(e.clone());
        }

        let mut findings = Vec::new();
        for compiled in self.rules.iter() {
            let rule = &compiled.rule;

            if let Err(e) = &compiled.pattern {
                findings.push(Violation::new(
                    &rule.id,
                    ".",
                    format!("Configuration error in rule '{}': {e}", rule.id),
                    Severity::Error,
                    &rule.source,
                ));
                continue;
            }

            if rule.action == RuleAction::DelegateToEngine
                && ctx.dispatcher.scope_of(rule) == Some(EngineScope::Repository)
            {
                let target = Target::Repository {
                    root: ctx.root.clone(),
                };
                findings.extend(ctx.dispatcher.invoke_engine(rule, &target));
                continue;
            }

            let matching = ctx
                .files
                .iter()
                .filter(|f| compiled.pattern.as_ref().is_ok_and(|p| p.is_match(&f.rel_path)));
            for file in matching {
                match rule.action {
                    RuleAction::Deny => {
                        findings.push(Violation::new(
                            &rule.id,
                            &file.rel_path,
                            format!("{}: file is not permitted here", rule.label()),
                            Severity::Error,
                            &rule.source,
                        ));
                    }
                    RuleAction::Warn => {
                        let mut v = rule.violation(&file.rel_path, rule.label());
                        v.severity = Severity::Warning;
                        findings.push(v);
                    }
                    RuleAction::DelegateToEngine => {
                        let target = Target::File(FileTarget::on_disk(&ctx.root, &file.rel_path));
                        findings.extend(ctx.dispatcher.invoke_engine(rule, &target));
                    }
                }
            }
        }
        Ok(findings)
    }
}
