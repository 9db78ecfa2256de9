//! `check_paths`: judge candidate writes against the hard invariants and
//! the policy rule table.
//!
//! Per path, evaluation is sequential: hard invariants first (a violation
//! short-circuits everything else for that path), then every applicable
//! rule in deterministic order. Paths are independent and run in parallel;
//! results keep input order. A failing path never changes how other paths
//! in the same batch are judged.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use warden_core::config::WardenConfig;
use warden_core::policy::{PolicyError, PolicyLoad};
use warden_core::types::{PolicyRule, RuleAction, Severity, Violation};

use crate::dispatch::{panic_message, EngineDispatcher};
use crate::engines::{EngineScope, FileTarget, Target};
use crate::invariant::{GovernanceRootInvariant, HardInvariant};
use crate::matcher::{CompiledRule, RuleSet};
use crate::types::PathCheckResult;

/// Rule id recorded on findings for policy documents that failed to load.
pub const POLICY_LOAD: &str = "policy_load";

/// Rules of every loadable policy document, plus one error violation per
/// document that failed to load.
#[derive(Debug, Default)]
pub struct PolicySet {
    pub rules: Vec<PolicyRule>,
    pub load_failures: Vec<Violation>,
}

impl PolicySet {
    pub fn from_loads(loads: Vec<PolicyLoad>) -> Self {
        let mut set = PolicySet::default();
        for load in loads {
            let name = load.name();
            match load.result {
                Ok(doc) => set.rules.extend(doc.rules),
                Err(e) => {
                    let path = load.path.display().to_string();
                    tracing::warn!(policy = %name, path = %path, error = %e, "policy document failed to load");
                    let message = match &e {
                        PolicyError::Json { .. } | PolicyError::Io { .. } => e.to_string(),
                        other => format!("malformed policy document {path}: {other}"),
                    };
                    set.load_failures
                        .push(Violation::new(POLICY_LOAD, path, message, Severity::Error, name));
                }
            }
        }
        set
    }
}

/// A pending write: repository-relative (or absolute) path plus new content.
#[derive(Debug, Clone)]
pub struct ProposedWrite {
    pub path: String,
    pub content: String,
}

pub struct PathValidator {
    root: PathBuf,
    rules: RuleSet,
    invariants: Vec<Box<dyn HardInvariant>>,
    dispatcher: EngineDispatcher,
    load_failures: Vec<Violation>,
}

#[derive(Default)]
struct PathOutcome {
    violations: Vec<Violation>,
    warnings: Vec<Violation>,
}

impl PathValidator {
    /// A validator with no hard invariants. See [`PathValidator::for_config`].
    pub fn new(root: &Path, rules: Vec<PolicyRule>, dispatcher: EngineDispatcher) -> Self {
        Self {
            root: root.to_path_buf(),
            rules: RuleSet::compile(rules),
            invariants: Vec::new(),
            dispatcher,
            load_failures: Vec::new(),
        }
    }

    /// A validator protecting the configured governance root.
    pub fn for_config(
        root: &Path,
        config: &WardenConfig,
        rules: Vec<PolicyRule>,
        dispatcher: EngineDispatcher,
    ) -> Self {
        let invariant = GovernanceRootInvariant::new(&config.governance_root).with_repo_root(root);
        Self::new(root, rules, dispatcher).with_invariant(Box::new(invariant))
    }

    /// [`PathValidator::for_config`] over a loaded policy directory. Every
    /// document that failed to load is reported in each result, so a broken
    /// policy can never pass for a permissive one.
    pub fn for_policies(
        root: &Path,
        config: &WardenConfig,
        policies: PolicySet,
        dispatcher: EngineDispatcher,
    ) -> Self {
        let mut validator = Self::for_config(root, config, policies.rules, dispatcher);
        validator.load_failures = policies.load_failures;
        validator
    }

    pub fn with_invariant(mut self, invariant: Box<dyn HardInvariant>) -> Self {
        self.invariants.push(invariant);
        self
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Validate files as they are on disk.
    pub fn check_paths(&self, paths: &[String]) -> PathCheckResult {
        let targets: Vec<(String, FileTarget)> = paths
            .iter()
            .map(|p| (p.clone(), FileTarget::on_disk(&self.root, &self.relativize(p))))
            .collect();
        self.check_targets(targets)
    }

    /// Validate pending writes before they persist.
    pub fn check_writes(&self, writes: &[ProposedWrite]) -> PathCheckResult {
        let targets: Vec<(String, FileTarget)> = writes
            .iter()
            .map(|w| {
                let rel = self.relativize(&w.path);
                (w.path.clone(), FileTarget::proposed(&self.root, &rel, w.content.clone()))
            })
            .collect();
        self.check_targets(targets)
    }

    fn check_targets(&self, targets: Vec<(String, FileTarget)>) -> PathCheckResult {
        let outcomes: Vec<PathOutcome> = targets
            .par_iter()
            .map(|(raw, target)| self.evaluate(raw, target))
            .collect();

        let mut result = PathCheckResult {
            violations: self.load_failures.clone(),
            ..PathCheckResult::default()
        };
        for o in outcomes {
            result.violations.extend(o.violations);
            result.warnings.extend(o.warnings);
        }
        result.is_valid = result.violations.is_empty();
        result
    }

    fn relativize(&self, path: &str) -> String {
        let p = Path::new(path);
        match p.strip_prefix(&self.root) {
            Ok(rel) if p.is_absolute() => rel.to_string_lossy().into_owned(),
            _ => crate::matcher::normalize(path),
        }
    }

    fn evaluate(&self, raw: &str, target: &FileTarget) -> PathOutcome {
        for invariant in &self.invariants {
            if let Some(v) = invariant.evaluate(raw) {
                tracing::info!(path = %raw, invariant = %invariant.id(), "hard invariant violated");
                return PathOutcome {
                    violations: vec![v],
                    warnings: Vec::new(),
                };
            }
        }

        let mut outcome = PathOutcome::default();
        for compiled in self.rules.applicable(&target.rel_path) {
            let applied = catch_unwind(AssertUnwindSafe(|| self.apply_rule(compiled, target)));
            match applied {
                Ok(o) => {
                    outcome.violations.extend(o.violations);
                    outcome.warnings.extend(o.warnings);
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    tracing::warn!(rule = %compiled.rule.id, path = %target.rel_path, reason = %reason, "rule evaluation failed");
                    outcome.violations.push(Violation::new(
                        &compiled.rule.id,
                        &target.rel_path,
                        format!("Rule evaluation failed: {reason}"),
                        Severity::Error,
                        &compiled.rule.source,
                    ));
                }
            }
        }
        outcome
    }

    fn apply_rule(&self, compiled: &CompiledRule, target: &FileTarget) -> PathOutcome {
        let rule = &compiled.rule;
        let path = target.rel_path.as_str();
        let mut outcome = PathOutcome::default();

        if let Some(v) = compiled.pattern_violation(path) {
            tracing::warn!(rule = %rule.id, path, "rule skipped: invalid pattern");
            outcome.violations.push(v);
            return outcome;
        }

        match rule.action {
            RuleAction::Deny => {
                let message = if rule.description.is_empty() {
                    format!("path denied by rule '{}'", rule.id)
                } else {
                    rule.description.clone()
                };
                let mut v = Violation::new(&rule.id, path, message, Severity::Error, &rule.source);
                v.suggested_fix = rule.fix_command.clone();
                outcome.violations.push(v);
            }
            RuleAction::Warn => {
                tracing::warn!(rule = %rule.id, policy = %rule.source, path, "{}", rule.label());
                let mut v = rule.violation(path, rule.label());
                v.severity = Severity::Warning;
                outcome.warnings.push(v);
            }
            RuleAction::DelegateToEngine => {
                let engine_target = match self.dispatcher.scope_of(rule) {
                    Some(EngineScope::Repository) => Target::Repository {
                        root: self.root.clone(),
                    },
                    _ => Target::File(target.clone()),
                };
                for mut v in self.dispatcher.invoke_engine(rule, &engine_target) {
                    v.path = path.to_string();
                    if v.is_error() {
                        outcome.violations.push(v);
                    } else {
                        outcome.warnings.push(v);
                    }
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
