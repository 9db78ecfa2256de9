// Tests for the atomic action registry facade

use std::sync::Arc;

use serde_json::{json, Value};
use warden_core::config::WardenConfig;
use warden_enforce::actions::builtin::{builtin_registry, INIT_CONFIG, VALIDATE_POLICIES};
use warden_enforce::actions::{
    governed_fn, ActionCategory, ActionContext, ActionDefinition, ActionResult, ImpactLevel, RegistryError,
    ResourceFlags,
};

use super::common::{create_repo, write_policy};

#[test]
fn test_builtin_ids_are_write_once() {
    let mut registry = builtin_registry().unwrap();
    let impostor = ActionDefinition {
        id: VALIDATE_POLICIES.into(),
        category: ActionCategory::Fix,
        policies: vec!["anything".into()],
        impact: ImpactLevel::Dangerous,
        resources: ResourceFlags::default(),
        description: "impostor".into(),
        handler: Arc::new(governed_fn(VALIDATE_POLICIES, |_, _| ActionResult::ok(Value::Null))),
    };
    assert!(matches!(registry.register(impostor), Err(RegistryError::Duplicate(_))));
    let kept = registry.get(VALIDATE_POLICIES).unwrap();
    assert_eq!(kept.category, ActionCategory::Check);
    assert_eq!(kept.impact, ImpactLevel::Safe);
}

#[test]
fn test_validate_then_init_through_frozen_registry() {
    let (_dir, root) = create_repo(&[]);
    write_policy(&root, "layout", json!([{ "id": "no-tmp", "pattern": "tmp/**", "action": "deny" }]));
    let registry = builtin_registry().unwrap().freeze();
    let ctx = ActionContext {
        root: root.clone(),
        config: WardenConfig::default(),
        write: true,
    };

    let validated = registry.dispatch(VALIDATE_POLICIES, &ctx, &Value::Null).unwrap();
    assert!(validated.ok);
    assert_eq!(validated.data["documents"][0]["rules"], json!(1));

    let init = registry.dispatch(INIT_CONFIG, &ctx, &json!({})).unwrap();
    assert!(init.ok);
    assert!(root.join(".warden/warden.json").is_file());
    assert_eq!(registry.list_by_category(ActionCategory::State).len(), 1);
}
