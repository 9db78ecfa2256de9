// Tests that engine faults fail closed without disturbing other rules

use std::sync::Arc;

use warden_core::config::WardenConfig;
use warden_core::types::{EngineResult, PolicyRule, RuleAction, RuleParams, Severity};
use warden_enforce::dispatch::EngineDispatcher;
use warden_enforce::engines::{Engine, EngineError, EngineRegistry, Target};
use warden_enforce::validator::PathValidator;

use super::common::create_repo;

struct Faulty;

impl Engine for Faulty {
    fn id(&self) -> &str {
        "faulty"
    }
    fn supported_checks(&self) -> &'static [&'static str] {
        &["anything"]
    }
    fn verify(&self, target: &Target, _: &RuleParams) -> Result<EngineResult, EngineError> {
        if target.display_path().ends_with("panic.py") {
            panic!("index out of bounds");
        }
        Err(EngineError::InvalidParams("backend offline".into()))
    }
}

fn rule(id: &str, engine: &str, severity: Severity, params: RuleParams) -> PolicyRule {
    PolicyRule {
        id: id.into(),
        pattern: "**/*.py".into(),
        action: RuleAction::DelegateToEngine,
        severity,
        engine: Some(engine.into()),
        params,
        description: String::new(),
        fix_command: None,
        source: "isolation".into(),
    }
}

fn validator(root: &std::path::Path) -> PathValidator {
    let mut registry = EngineRegistry::with_defaults(&WardenConfig::default(), None);
    registry.register(Arc::new(Faulty));
    let rules = vec![
        rule("a-faulty", "faulty", Severity::Info, RuleParams::new()),
        rule(
            "b-no-print",
            "structural",
            Severity::Warning,
            RuleParams::new()
                .with("check_type", "forbidden_calls")
                .with("calls", vec!["print"]),
        ),
        rule("c-unknown", "does-not-exist", Severity::Info, RuleParams::new()),
    ];
    PathValidator::new(root, rules, EngineDispatcher::new(Arc::new(registry)))
}

#[test]
fn test_engine_error_panic_and_unknown_engine_each_fail_closed() {
    let (_dir, root) = create_repo(&[("src/ok.py", "print('hi')\n"), ("src/panic.py", "print('x')\n")]);
    let result = validator(&root).check_paths(&["src/ok.py".into(), "src/panic.py".into()]);

    let errors: Vec<_> = result
        .violations
        .iter()
        .map(|v| (v.path.as_str(), v.rule.as_str(), v.severity))
        .collect();
    assert_eq!(
        errors,
        vec![
            ("src/ok.py", "a-faulty", Severity::Error),
            ("src/ok.py", "c-unknown", Severity::Error),
            ("src/panic.py", "a-faulty", Severity::Error),
            ("src/panic.py", "c-unknown", Severity::Error),
        ]
    );
    assert!(result.violations[0].message.contains("backend offline"));
    assert!(result.violations[2].message.contains("index out of bounds"));

    // The structural rule still ran for both files.
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().all(|w| w.rule == "b-no-print"));
}

#[test]
fn test_unsupported_check_type_is_engine_failure() {
    let (_dir, root) = create_repo(&[("src/a.py", "x = 1\n")]);
    let rules = vec![rule(
        "typo",
        "structural",
        Severity::Warning,
        RuleParams::new().with("check_type", "forbiden_calls"),
    )];
    let v = PathValidator::new(
        &root,
        rules,
        EngineDispatcher::new(Arc::new(EngineRegistry::with_defaults(&WardenConfig::default(), None))),
    );
    let result = v.check_paths(&["src/a.py".into()]);
    assert_eq!(result.violations.len(), 1);
    assert!(result.violations[0].message.starts_with("Engine failure:"));
}
