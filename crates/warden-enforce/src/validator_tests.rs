use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use warden_core::types::{EngineResult, RawFinding, RuleParams};

use crate::engines::{Engine, EngineError, EngineRegistry};

/// Counts invocations; fails on files whose name contains "bad".
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl Engine for Counting {
    fn id(&self) -> &str {
        "counting"
    }
    fn supported_checks(&self) -> &'static [&'static str] {
        &["count"]
    }
    fn verify(&self, target: &Target, _: &RuleParams) -> Result<EngineResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if target.display_path().contains("bad") {
            Ok(EngineResult::fail("counting", "bad", vec![RawFinding::new("bad file")]))
        } else {
            Ok(EngineResult::pass("counting", "ok"))
        }
    }
}

struct Exploding;

impl Engine for Exploding {
    fn id(&self) -> &str {
        "exploding"
    }
    fn supported_checks(&self) -> &'static [&'static str] {
        &["any"]
    }
    fn verify(&self, _: &Target, _: &RuleParams) -> Result<EngineResult, EngineError> {
        panic!("kaboom")
    }
}

fn rule(id: &str, pattern: &str, action: RuleAction, engine: Option<&str>) -> PolicyRule {
    PolicyRule {
        id: id.into(),
        pattern: pattern.into(),
        action,
        severity: Severity::Error,
        engine: engine.map(str::to_string),
        params: RuleParams::new(),
        description: String::new(),
        fix_command: None,
        source: "test_policy".into(),
    }
}

fn fixture() -> (tempfile::TempDir, Arc<AtomicUsize>, EngineDispatcher) {
    let dir = tempfile::tempdir().unwrap();
    for rel in ["src/a.py", "src/bad.py", "src/c.py", ".intent/charter.json"] {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x = 1\n").unwrap();
    }
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = EngineRegistry::with_defaults(&WardenConfig::default(), None);
    registry.register(Arc::new(Counting {
        calls: Arc::clone(&calls),
    }));
    registry.register(Arc::new(Exploding));
    (dir, calls, EngineDispatcher::new(Arc::new(registry)))
}

fn paths(ps: &[&str]) -> Vec<String> {
    ps.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_hard_invariant_short_circuits() {
    let (dir, calls, dispatcher) = fixture();
    let rules = vec![
        rule("deny-all", "**", RuleAction::Deny, None),
        rule("count", "**", RuleAction::DelegateToEngine, Some("counting")),
        rule("explode", "**", RuleAction::DelegateToEngine, Some("exploding")),
    ];
    let v = PathValidator::for_config(dir.path(), &WardenConfig::default(), rules, dispatcher);

    let result = v.check_paths(&paths(&[".intent/charter.json"]));
    assert!(!result.is_valid);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].rule, "governance_root");
    assert!(result.warnings.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_deny_blocks_and_warn_is_advisory() {
    let (dir, _, dispatcher) = fixture();
    let rules = vec![
        rule("no-c", "src/c.py", RuleAction::Deny, None),
        rule("careful", "src/*.py", RuleAction::Warn, None),
    ];
    let v = PathValidator::new(dir.path(), rules, dispatcher);

    let ok = v.check_paths(&paths(&["src/a.py"]));
    assert!(ok.is_valid);
    assert_eq!(ok.warnings.len(), 1);
    assert_eq!(ok.warnings[0].severity, Severity::Warning);

    let denied = v.check_paths(&paths(&["src/c.py"]));
    assert!(!denied.is_valid);
    assert_eq!(denied.violations[0].message, "path denied by rule 'no-c'");
}

#[test]
fn test_all_matching_rules_accumulate() {
    let (dir, _, dispatcher) = fixture();
    let rules = vec![
        rule("deny-1", "src/**", RuleAction::Deny, None),
        rule("deny-2", "*.py", RuleAction::Deny, None),
        rule("count", "**", RuleAction::DelegateToEngine, Some("counting")),
    ];
    let v = PathValidator::new(dir.path(), rules, dispatcher);
    let result = v.check_paths(&paths(&["src/bad.py"]));
    let ids: Vec<_> = result.violations.iter().map(|v| v.rule.as_str()).collect();
    assert_eq!(ids, vec!["count", "deny-1", "deny-2"]);
}

#[test]
fn test_results_are_deterministic() {
    let (dir, _, dispatcher) = fixture();
    let rules = vec![
        rule("z", "**", RuleAction::Deny, None),
        rule("a", "src/**", RuleAction::DelegateToEngine, Some("counting")),
        rule("m", "*.py", RuleAction::Warn, None),
    ];
    let v = PathValidator::new(dir.path(), rules, dispatcher);
    let input = paths(&["src/c.py", "src/bad.py", "src/a.py", ".intent/charter.json"]);
    let first = v.check_paths(&input);
    for _ in 0..10 {
        let again = v.check_paths(&input);
        assert_eq!(again.violations, first.violations);
        assert_eq!(again.warnings, first.warnings);
    }
    let order: Vec<_> = first.violations.iter().map(|v| (v.path.as_str(), v.rule.as_str())).collect();
    assert_eq!(order[0], ("src/c.py", "z"));
    assert_eq!(order[1], ("src/bad.py", "a"));
}

#[test]
fn test_failing_engine_is_isolated() {
    let (dir, calls, dispatcher) = fixture();
    let rules = vec![
        rule("a-explode", "src/a.py", RuleAction::DelegateToEngine, Some("exploding")),
        rule("b-count", "src/**", RuleAction::DelegateToEngine, Some("counting")),
    ];
    let v = PathValidator::new(dir.path(), rules, dispatcher);
    let result = v.check_paths(&paths(&["src/a.py", "src/c.py"]));

    let failures: Vec<_> = result
        .violations
        .iter()
        .filter(|v| v.message.starts_with("Engine failure"))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::Error);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalid_pattern_does_not_stop_other_rules() {
    let (dir, _, dispatcher) = fixture();
    let rules = vec![
        rule("a-broken", "src/[oops", RuleAction::Warn, None),
        rule("b-deny", "src/a.py", RuleAction::Deny, None),
    ];
    let v = PathValidator::new(dir.path(), rules, dispatcher);
    let result = v.check_paths(&paths(&["src/a.py"]));
    let ids: Vec<_> = result.violations.iter().map(|v| v.rule.as_str()).collect();
    assert_eq!(ids, vec!["a-broken", "b-deny"]);
    assert!(result.violations[0].message.contains("Configuration error"));
}

#[test]
fn test_empty_pattern_matches_nothing() {
    let (dir, _, dispatcher) = fixture();
    let v = PathValidator::new(dir.path(), vec![rule("deny", "", RuleAction::Deny, None)], dispatcher);
    assert!(v.check_paths(&paths(&["src/a.py", "anything"])).is_valid);
}

#[test]
fn test_check_writes_metadata_only() {
    let (dir, _, dispatcher) = fixture();
    let mut r = rule("edits", "src/**/*.py", RuleAction::DelegateToEngine, Some("structural"));
    r.params = RuleParams::new().with("check_type", "metadata_only");
    r.description = "Autonomous edits must be metadata-only".into();
    let v = PathValidator::for_config(dir.path(), &WardenConfig::default(), vec![r], dispatcher);

    let ok = v.check_writes(&[ProposedWrite {
        path: "src/a.py".into(),
        content: "# explain x\nx = 1\n".into(),
    }]);
    assert!(ok.is_valid, "{:?}", ok.violations);

    let changed = v.check_writes(&[ProposedWrite {
        path: "src/a.py".into(),
        content: "x = 2\n".into(),
    }]);
    assert!(!changed.is_valid);
    assert!(changed.violations[0]
        .message
        .starts_with("Autonomous edits must be metadata-only: edit changes executable semantics"));

    let protected = v.check_writes(&[ProposedWrite {
        path: ".intent/charter.json".into(),
        content: "{}".into(),
    }]);
    assert_eq!(protected.violations.len(), 1);
    assert_eq!(protected.violations[0].rule, "governance_root");
}

#[test]
fn test_absolute_paths_are_relativized() {
    let (dir, _, dispatcher) = fixture();
    let v = PathValidator::for_config(
        dir.path(),
        &WardenConfig::default(),
        vec![rule("deny", "src/c.py", RuleAction::Deny, None)],
        dispatcher,
    );
    let abs = dir.path().join("src/c.py").to_string_lossy().into_owned();
    let result = v.check_paths(&[abs]);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].path, "src/c.py");

    let abs = dir.path().join(".intent/x.json").to_string_lossy().into_owned();
    assert_eq!(v.check_paths(&[abs]).violations[0].rule, "governance_root");
}

#[test]
fn test_unloadable_policy_documents_block_every_batch() {
    let (dir, _, dispatcher) = fixture();
    let policies = dir.path().join("policies");
    std::fs::create_dir_all(&policies).unwrap();
    std::fs::write(
        policies.join("layout.json"),
        r#"{"id": "layout", "rules": [{"id": "careful", "pattern": "src/*.py", "action": "warn"}]}"#,
    )
    .unwrap();
    std::fs::write(
        policies.join("secrets.json"),
        r#"{"id": "secrets", "rules": [{"id": "no-tmp", "pattern": "tmp/**", "action": "deny"},]}"#,
    )
    .unwrap();

    let set = PolicySet::from_loads(warden_core::policy::load_policy_dir(&policies));
    assert_eq!(set.rules.len(), 1);
    assert_eq!(set.load_failures.len(), 1);

    let v = PathValidator::for_policies(dir.path(), &WardenConfig::default(), set, dispatcher);
    let result = v.check_paths(&paths(&["src/a.py"]));
    assert!(!result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.violations.len(), 1);
    let failure = &result.violations[0];
    assert_eq!(failure.rule, POLICY_LOAD);
    assert_eq!(failure.source_policy, "secrets");
    assert_eq!(failure.severity, Severity::Error);
    assert!(failure.message.starts_with("malformed policy document"), "{}", failure.message);
}

#[test]
fn test_clean_policy_set_adds_nothing() {
    let (dir, _, dispatcher) = fixture();
    let set = PolicySet {
        rules: vec![rule("careful", "src/*.py", RuleAction::Warn, None)],
        load_failures: Vec::new(),
    };
    let v = PathValidator::for_policies(dir.path(), &WardenConfig::default(), set, dispatcher);
    assert!(v.check_paths(&paths(&["src/a.py"])).is_valid);
}
