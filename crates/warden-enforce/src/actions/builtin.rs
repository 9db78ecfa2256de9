//! Actions shipped with warden.

use std::sync::Arc;

use serde_json::{json, Value};
use warden_core::config::WardenConfig;
use warden_core::policy::load_policy_dir;

use super::{
    governed_fn, ActionCategory, ActionContext, ActionDefinition, ActionRegistry, ActionResult, ImpactLevel,
    RegistryError, ResourceFlags,
};

pub const VALIDATE_POLICIES: &str = "policies.validate";
pub const INIT_CONFIG: &str = "config.init";

/// A registry holding every built-in action.
pub fn builtin_registry() -> Result<ActionRegistry, RegistryError> {
    let mut registry = ActionRegistry::new();
    registry.register(ActionDefinition {
        id: VALIDATE_POLICIES.into(),
        category: ActionCategory::Check,
        policies: vec!["policy_integrity".into()],
        impact: ImpactLevel::Safe,
        resources: ResourceFlags::default(),
        description: "Load every policy document and report the ones that fail to parse".into(),
        handler: Arc::new(governed_fn(VALIDATE_POLICIES, validate_policies)),
    })?;
    registry.register(ActionDefinition {
        id: INIT_CONFIG.into(),
        category: ActionCategory::State,
        policies: vec!["governance_root".into()],
        impact: ImpactLevel::Moderate,
        resources: ResourceFlags {
            writes_files: true,
            requires_database: false,
        },
        description: "Write a default .warden/warden.json".into(),
        handler: Arc::new(governed_fn(INIT_CONFIG, init_config)),
    })?;
    Ok(registry)
}

fn validate_policies(ctx: &ActionContext, _: &Value) -> ActionResult {
    let dir = ctx.root.join(&ctx.config.policy_dir);
    let mut documents = Vec::new();
    let mut failed = 0;
    for load in load_policy_dir(&dir) {
        let path = load.path.display().to_string();
        match load.result {
            Ok(doc) => documents.push(json!({ "path": path, "id": doc.id, "rules": doc.rules.len() })),
            Err(e) => {
                failed += 1;
                documents.push(json!({ "path": path, "error": e.to_string() }));
            }
        }
    }
    let data = json!({ "policy_dir": dir.display().to_string(), "documents": documents });
    if failed == 0 {
        ActionResult::ok(data)
    } else {
        ActionResult::failed(data).with_suggestion("fix or remove the malformed policy documents")
    }
}

fn init_config(ctx: &ActionContext, params: &Value) -> ActionResult {
    let path = ctx.root.join(".warden").join("warden.json");
    let force = params.get("force").and_then(Value::as_bool).unwrap_or(false);
    let display = path.display().to_string();

    if path.exists() && !force {
        return ActionResult::failed(json!({ "path": display, "reason": "config already exists" }))
            .with_suggestion("pass {\"force\": true} to overwrite");
    }
    let content = match serde_json::to_string_pretty(&WardenConfig::default()) {
        Ok(c) => c,
        Err(e) => return ActionResult::failed(json!({ "path": display, "reason": e.to_string() })),
    };
    if !ctx.write {
        return ActionResult::ok(json!({ "path": display, "written": false, "content": content }));
    }

    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|_| std::fs::write(&path, format!("{content}\n")));
    match written {
        Ok(()) => ActionResult::ok(json!({ "path": display, "written": true })),
        Err(e) => ActionResult::failed(json!({ "path": display, "reason": e.to_string() })),
    }
}
