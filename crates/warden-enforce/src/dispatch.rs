//! Routes engine rules to their engine and normalizes the outcome.
//!
//! The rule owns authority: every finding carries the rule's severity and
//! is prefixed with the rule's description, whatever the engine reported.
//! An engine error or panic becomes exactly one error-severity violation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use warden_core::types::{PolicyRule, Severity, Violation};

use crate::engines::{EngineRegistry, EngineScope, Target};

#[derive(Clone)]
pub struct EngineDispatcher {
    registry: Arc<EngineRegistry>,
}

impl EngineDispatcher {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Scope of the engine a rule references, if the engine is known.
    pub fn scope_of(&self, rule: &PolicyRule) -> Option<EngineScope> {
        let id = rule.engine.as_deref()?;
        self.registry.get(id).map(|e| e.scope())
    }

    pub fn invoke_engine(&self, rule: &PolicyRule, target: &Target) -> Vec<Violation> {
        let path = target.display_path();

        if let Target::File(file) = target {
            if !file.is_addressable() {
                tracing::debug!(rule = %rule.id, path = %path, "skipping non-addressable target");
                return Vec::new();
            }
        }

        let engine_id = rule.engine.as_deref().unwrap_or("");
        let Some(engine) = self.registry.get(engine_id) else {
            tracing::warn!(rule = %rule.id, engine = %engine_id, "rule references unknown engine");
            return vec![config_error(
                rule,
                &path,
                format!("Configuration error: rule '{}' references unknown engine '{engine_id}'", rule.id),
            )];
        };

        tracing::debug!(rule = %rule.id, engine = %engine_id, path = %path, "dispatching engine");
        let outcome = catch_unwind(AssertUnwindSafe(|| engine.verify(target, &rule.params)));

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(rule = %rule.id, engine = %engine_id, path = %path, error = %e, "engine failed");
                return vec![config_error(rule, &path, format!("Engine failure: {e}"))];
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::warn!(rule = %rule.id, engine = %engine_id, path = %path, reason = %reason, "engine panicked");
                return vec![config_error(rule, &path, format!("Engine failure: {reason}"))];
            }
        };

        if result.ok {
            return Vec::new();
        }
        if result.violations.is_empty() {
            return vec![framed(rule, &path, &result.message, None)];
        }
        result
            .violations
            .iter()
            .map(|f| framed(rule, &path, &f.message, f.line))
            .collect()
    }
}

fn framed(rule: &PolicyRule, path: &str, message: &str, line: Option<u32>) -> Violation {
    let mut v = rule.violation(path, format!("{}: {message}", rule.label()));
    v.line = line;
    v.suggested_fix = rule.fix_command.clone();
    v
}

fn config_error(rule: &PolicyRule, path: &str, message: String) -> Violation {
    Violation::new(&rule.id, path, message, Severity::Error, &rule.source)
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
