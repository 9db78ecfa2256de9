// Tests for phase reporting and incomplete coverage under the run timeout

use std::sync::Arc;
use std::time::Duration;

use warden_core::config::WardenConfig;
use warden_core::types::Violation;
use warden_enforce::audit::{AuditRunner, INCOMPLETE_COVERAGE};
use warden_enforce::rule_check::{AuditContext, CheckError, RuleCheck};
use warden_enforce::types::{CheckStatus, ExitStatus};

use super::common::{create_repo, engines};

struct Sleepy {
    name: &'static str,
    for_ms: u64,
}

impl RuleCheck for Sleepy {
    fn name(&self) -> &str {
        self.name
    }
    fn category(&self) -> &str {
        "timing"
    }
    fn policy_rule_ids(&self) -> Vec<String> {
        Vec::new()
    }
    fn run(&self, _: &AuditContext) -> Result<Vec<Violation>, CheckError> {
        std::thread::sleep(Duration::from_millis(self.for_ms));
        Ok(Vec::new())
    }
}

#[test]
fn test_timeout_marks_unstarted_checks_incomplete() {
    let (_dir, root) = create_repo(&[("src/a.py", "x = 1\n")]);
    let mut config = WardenConfig::default();
    config.audit.max_workers = 1;
    config.audit.timeout_seconds = 1;

    let report = AuditRunner::new(&root, config, engines(None))
        .with_check(Arc::new(Sleepy { name: "slow", for_ms: 1_200 }))
        .with_check(Arc::new(Sleepy { name: "never-started", for_ms: 0 }))
        .run();

    assert_eq!(report.checks[0].status, CheckStatus::Passed);
    assert_eq!(report.checks[1].status, CheckStatus::Incomplete);
    let finding = &report.checks[1].findings[0];
    assert_eq!(finding.rule, INCOMPLETE_COVERAGE);
    assert_eq!(
        finding.message,
        "incomplete coverage: check 'never-started' did not run before the audit timeout"
    );
    assert_eq!(report.exit_status, ExitStatus::Advisory);
}

#[test]
fn test_phases_report_counts() {
    let (_dir, root) = create_repo(&[
        ("src/a.py", "def f():\n    pass\n"),
        ("src/lib.rs", "pub struct S;\nfn g() {}\n"),
        ("README.md", "# hi\n"),
    ]);
    let report = AuditRunner::new(&root, WardenConfig::default(), engines(None)).run();
    let phase = |name: &str| report.phases.iter().find(|p| p.name == name).unwrap().items;
    assert_eq!(phase("load_policies"), 0);
    assert_eq!(phase("discover_files"), 3);
    assert_eq!(phase("index_symbols"), 3);
    assert_eq!(report.exit_code(), 0);
}
