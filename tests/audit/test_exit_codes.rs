// Tests for the three-tier audit exit decision

use serde_json::json;
use warden_core::config::WardenConfig;
use warden_enforce::audit::AuditRunner;
use warden_enforce::types::{CheckStatus, ExitStatus};

use super::common::{create_repo, engines, write_policy};

fn audit(root: &std::path::Path) -> warden_enforce::types::AuditReport {
    AuditRunner::new(root, WardenConfig::default(), engines(None)).run()
}

#[test]
fn test_clean_repository_exits_zero() {
    let (_dir, root) = create_repo(&[("src/app.py", "def main():\n    return 0\n")]);
    write_policy(
        &root,
        "standards",
        json!([{ "id": "no-eval", "pattern": "src/**/*.py", "engine": "structural",
                 "params": { "check_type": "forbidden_calls", "calls": ["eval", "exec"] } }]),
    );
    let report = audit(&root);
    assert_eq!(report.exit_status, ExitStatus::Clean);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.checks.len(), 1);
    assert_eq!(report.checks[0].policy_rule_ids, vec!["no-eval"]);
}

#[test]
fn test_warnings_only_exit_two() {
    let (_dir, root) = create_repo(&[("src/app.py", "import os\nprint(os.getcwd())\n")]);
    write_policy(
        &root,
        "hygiene",
        json!([{ "id": "side-effects", "pattern": "src/**/*.py", "engine": "structural", "severity": "warning",
                 "params": { "check_type": "no_module_side_effects" },
                 "fix_command": "warden actions run fix.side-effects" }]),
    );
    let report = audit(&root);
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.summary.total_findings, 1);
    assert_eq!(report.checks[0].findings[0].line, Some(2));
    assert_eq!(report.summary.suggested_commands, vec!["warden actions run fix.side-effects"]);
}

#[test]
fn test_any_error_exits_one() {
    let (_dir, root) = create_repo(&[
        ("src/app.py", "import os\nprint(os.getcwd())\n"),
        ("scratch/tmp.txt", "notes"),
    ]);
    write_policy(
        &root,
        "hygiene",
        json!([{ "id": "side-effects", "pattern": "src/**/*.py", "engine": "structural", "severity": "warning",
                 "params": { "check_type": "no_module_side_effects" } }]),
    );
    write_policy(&root, "layout", json!([{ "id": "no-scratch", "pattern": "scratch/**", "action": "deny" }]));

    let report = audit(&root);
    assert_eq!(report.exit_code(), 1);
    let names: Vec<_> = report.checks.iter().map(|c| (c.name.as_str(), c.status)).collect();
    assert_eq!(names, vec![("hygiene", CheckStatus::Failed), ("layout", CheckStatus::Failed)]);
    assert_eq!(report.summary.checks_with_issues, 2);
}

#[test]
fn test_malformed_policy_fails_only_its_check() {
    let (_dir, root) = create_repo(&[
        (".warden/policies/broken.json", r#"{"id": "broken", "rules": [{"id": "x", "action": "deny"}, {"id": "x", "action": "warn"}]}"#),
        ("src/app.py", "x = 1\n"),
    ]);
    write_policy(&root, "layout", json!([{ "id": "no-scratch", "pattern": "scratch/**", "action": "deny" }]));

    let report = audit(&root);
    assert_eq!(report.checks.len(), 2);
    assert_eq!(report.checks[0].name, "broken");
    assert_eq!(report.checks[0].status, CheckStatus::Errored);
    assert!(report.checks[0].findings[0].message.contains("more than once"));
    assert_eq!(report.checks[1].status, CheckStatus::Passed);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_ignore_patterns_exclude_files_from_discovery() {
    let (_dir, root) = create_repo(&[("vendor/lib.py", "eval('1')\n"), ("src/a.py", "x = 1\n")]);
    write_policy(
        &root,
        "standards",
        json!([{ "id": "no-eval", "pattern": "**/*.py", "engine": "structural",
                 "params": { "check_type": "forbidden_calls", "calls": ["eval"] } }]),
    );
    let mut config = WardenConfig::default();
    config.ignore_patterns = vec!["vendor/**".into()];
    let report = AuditRunner::new(&root, config, engines(None)).run();
    assert_eq!(report.exit_code(), 0);

    let unfiltered = audit(&root);
    assert_eq!(unfiltered.exit_code(), 1);
}
