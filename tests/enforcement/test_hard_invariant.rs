// Tests for the governance-root hard invariant

use warden_core::config::WardenConfig;
use warden_core::types::{PolicyRule, RuleAction, RuleParams, Severity};
use warden_enforce::validator::PathValidator;

use super::common::{create_repo, dispatcher};

fn allow_everything_rule() -> PolicyRule {
    PolicyRule {
        id: "advisory".into(),
        pattern: "**".into(),
        action: RuleAction::Warn,
        severity: Severity::Warning,
        engine: None,
        params: RuleParams::new(),
        description: "Everything is watched".into(),
        fix_command: None,
        source: "watch".into(),
    }
}

#[test]
fn test_no_rule_can_grant_writes_under_governance_root() {
    let (_dir, root) = create_repo(&[(".intent/charter.json", "{}"), ("src/a.py", "x = 1\n")]);
    let v = PathValidator::for_config(&root, &WardenConfig::default(), vec![allow_everything_rule()], dispatcher());

    for path in [
        ".intent/charter.json",
        ".intent",
        "./.intent/new/file.yaml",
        "src/../.intent/charter.json",
    ] {
        let result = v.check_paths(&[path.to_string()]);
        assert!(!result.is_valid, "{path} should be blocked");
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].rule, "governance_root");
        assert!(result.warnings.is_empty(), "rules must not run for {path}");
    }
}

#[test]
fn test_lookalike_paths_are_not_protected() {
    let (_dir, root) = create_repo(&[]);
    let v = PathValidator::for_config(&root, &WardenConfig::default(), vec![], dispatcher());
    let result = v.check_paths(&[".intentional/x.py".into(), "src/.intent.py".into()]);
    assert!(result.is_valid);
}

#[test]
fn test_escaping_the_repository_fails_closed() {
    let (_dir, root) = create_repo(&[]);
    let v = PathValidator::for_config(&root, &WardenConfig::default(), vec![], dispatcher());
    let result = v.check_paths(&["../../etc/passwd".into()]);
    assert!(!result.is_valid);
    assert!(result.violations[0].message.starts_with("hard invariant could not be evaluated"));
}

#[test]
fn test_blocked_path_does_not_affect_siblings_in_batch() {
    let (_dir, root) = create_repo(&[("src/a.py", "x = 1\n")]);
    let v = PathValidator::for_config(&root, &WardenConfig::default(), vec![allow_everything_rule()], dispatcher());
    let result = v.check_paths(&[".intent/x".into(), "src/a.py".into()]);
    assert!(!result.is_valid);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].path, "src/a.py");
}

#[test]
fn test_configured_governance_root() {
    let (_dir, root) = create_repo(&[]);
    let config = WardenConfig {
        governance_root: ".constitution".into(),
        ..WardenConfig::default()
    };
    let v = PathValidator::for_config(&root, &config, vec![], dispatcher());
    assert!(!v.check_paths(&[".constitution/a".into()]).is_valid);
    assert!(v.check_paths(&[".intent/a".into()]).is_valid);
}
