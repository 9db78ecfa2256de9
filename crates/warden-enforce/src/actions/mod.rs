//! Atomic action registry.
//!
//! Write-capable operations are registered once at startup and dispatched by
//! id. The handler contract is checked when the action is registered, not
//! when it runs: the handler must return [`ActionResult`] and must carry an
//! [`ActionMarker`] naming the action it was declared for. A handler that
//! fails either check never reaches the dispatch table.

pub mod builtin;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_core::config::WardenConfig;

use crate::dispatch::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Check,
    Fix,
    Sync,
    State,
}

impl ActionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCategory::Check => "check",
            ActionCategory::Fix => "fix",
            ActionCategory::Sync => "sync",
            ActionCategory::State => "state",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "check" => Some(ActionCategory::Check),
            "fix" => Some(ActionCategory::Fix),
            "sync" => Some(ActionCategory::Sync),
            "state" => Some(ActionCategory::State),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Safe,
    Moderate,
    Dangerous,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFlags {
    pub writes_files: bool,
    pub requires_database: bool,
}

/// Return type a handler declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    ActionResult,
    Tuple,
    Bool,
    Unit,
    Json,
}

impl std::fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReturnShape::ActionResult => "ActionResult",
            ReturnShape::Tuple => "tuple",
            ReturnShape::Bool => "bool",
            ReturnShape::Unit => "unit",
            ReturnShape::Json => "json",
        };
        f.write_str(s)
    }
}

/// Proof that a handler was declared as a governed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMarker {
    pub action_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSignature {
    pub returns: ReturnShape,
    pub marker: Option<ActionMarker>,
}

/// Environment an action runs in. Without `write`, actions report what they
/// would change and change nothing.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub root: PathBuf,
    pub config: WardenConfig,
    pub write: bool,
}

/// The sanctioned result of every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub ok: bool,
    pub data: Value,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ActionResult {
    pub fn ok(data: Value) -> Self {
        Self {
            action_id: String::new(),
            ok: true,
            data,
            duration_ms: 0,
            suggestions: Vec::new(),
        }
    }

    pub fn failed(data: Value) -> Self {
        Self { ok: false, ..Self::ok(data) }
    }

    pub fn with_suggestion(mut self, s: impl Into<String>) -> Self {
        self.suggestions.push(s.into());
        self
    }
}

/// What a handler actually produced.
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    Result(ActionResult),
    Tuple(Vec<Value>),
    Bool(bool),
    Unit,
    Json(Value),
}

impl HandlerOutput {
    pub fn shape(&self) -> ReturnShape {
        match self {
            HandlerOutput::Result(_) => ReturnShape::ActionResult,
            HandlerOutput::Tuple(_) => ReturnShape::Tuple,
            HandlerOutput::Bool(_) => ReturnShape::Bool,
            HandlerOutput::Unit => ReturnShape::Unit,
            HandlerOutput::Json(_) => ReturnShape::Json,
        }
    }
}

pub trait ActionHandler: Send + Sync {
    fn signature(&self) -> HandlerSignature;

    fn invoke(&self, ctx: &ActionContext, params: &Value) -> HandlerOutput;
}

/// A function declared as the handler of `action_id`.
pub struct GovernedFn<F> {
    marker: ActionMarker,
    f: F,
}

pub fn governed_fn<F>(action_id: &str, f: F) -> GovernedFn<F>
where
    F: Fn(&ActionContext, &Value) -> ActionResult + Send + Sync,
{
    GovernedFn {
        marker: ActionMarker {
            action_id: action_id.to_string(),
        },
        f,
    }
}

impl<F> ActionHandler for GovernedFn<F>
where
    F: Fn(&ActionContext, &Value) -> ActionResult + Send + Sync,
{
    fn signature(&self) -> HandlerSignature {
        HandlerSignature {
            returns: ReturnShape::ActionResult,
            marker: Some(self.marker.clone()),
        }
    }

    fn invoke(&self, ctx: &ActionContext, params: &Value) -> HandlerOutput {
        HandlerOutput::Result((self.f)(ctx, params))
    }
}

#[derive(Clone)]
pub struct ActionDefinition {
    pub id: String,
    pub category: ActionCategory,
    /// Governing policy ids.
    pub policies: Vec<String>,
    pub impact: ImpactLevel,
    pub resources: ResourceFlags,
    pub description: String,
    pub handler: Arc<dyn ActionHandler>,
}

/// Serializable view of a definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionInfo {
    pub id: String,
    pub category: ActionCategory,
    pub policies: Vec<String>,
    pub impact: ImpactLevel,
    pub resources: ResourceFlags,
    pub description: String,
}

impl ActionDefinition {
    pub fn info(&self) -> ActionInfo {
        ActionInfo {
            id: self.id.clone(),
            category: self.category,
            policies: self.policies.clone(),
            impact: self.impact,
            resources: self.resources,
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    Duplicate(String),

    #[error("action '{0}' declares no governing policy")]
    NoPolicies(String),

    #[error("action '{id}' handler returns {found}, expected ActionResult")]
    ReturnShape { id: String, found: ReturnShape },

    #[error("action '{0}' handler is not declared as a governed action")]
    MissingMarker(String),

    #[error("action '{id}' handler is declared for '{declared}'")]
    MarkerMismatch { id: String, declared: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    NotFound(String),

    #[error("action '{id}' produced {found} instead of ActionResult")]
    UnexpectedOutput { id: String, found: ReturnShape },

    #[error("action '{id}' crashed: {reason}")]
    Panicked { id: String, reason: String },
}

/// Registry of governed actions. Built once, then frozen for shared reads.
#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add `def`. A rejected definition leaves the registry
    /// unchanged.
    pub fn register(&mut self, def: ActionDefinition) -> Result<(), RegistryError> {
        if self.actions.contains_key(&def.id) {
            return Err(RegistryError::Duplicate(def.id));
        }
        if def.policies.is_empty() {
            return Err(RegistryError::NoPolicies(def.id));
        }
        let sig = def.handler.signature();
        if sig.returns != ReturnShape::ActionResult {
            return Err(RegistryError::ReturnShape {
                id: def.id,
                found: sig.returns,
            });
        }
        match sig.marker {
            None => return Err(RegistryError::MissingMarker(def.id)),
            Some(m) if m.action_id != def.id => {
                return Err(RegistryError::MarkerMismatch {
                    id: def.id,
                    declared: m.action_id,
                })
            }
            Some(_) => {}
        }
        tracing::debug!(action = %def.id, category = def.category.as_str(), "action registered");
        self.actions.insert(def.id.clone(), def);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    pub fn list_by_category(&self, category: ActionCategory) -> Vec<&ActionDefinition> {
        self.actions.values().filter(|d| d.category == category).collect()
    }

    /// Every action, ordered by id.
    pub fn list_all(&self) -> Vec<&ActionDefinition> {
        self.actions.values().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// End registration. The frozen registry is read-only.
    pub fn freeze(self) -> Arc<ActionRegistry> {
        Arc::new(self)
    }

    pub fn dispatch(&self, id: &str, ctx: &ActionContext, params: &Value) -> Result<ActionResult, ActionError> {
        let def = self.get(id).ok_or_else(|| ActionError::NotFound(id.to_string()))?;
        let started = Instant::now();
        let output = catch_unwind(AssertUnwindSafe(|| def.handler.invoke(ctx, params))).map_err(|panic| {
            ActionError::Panicked {
                id: id.to_string(),
                reason: panic_message(panic.as_ref()),
            }
        })?;
        let mut result = match output {
            HandlerOutput::Result(r) => r,
            other => {
                return Err(ActionError::UnexpectedOutput {
                    id: id.to_string(),
                    found: other.shape(),
                })
            }
        };
        result.action_id = id.to_string();
        result.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(action = %id, ok = result.ok, duration_ms = result.duration_ms, write = ctx.write, "action dispatched");
        Ok(result)
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
