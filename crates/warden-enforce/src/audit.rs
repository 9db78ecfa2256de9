//! Audit run coordinator.
//!
//! Phases: `load_policies`, `discover_files`, `index_symbols`,
//! `execute_checks`, `aggregate`. Checks run on a bounded worker pool. A
//! run-level timeout stops checks from starting; each check that never ran
//! reports an incomplete-coverage warning instead of vanishing.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use warden_core::config::WardenConfig;
use warden_core::policy::load_policy_dir;
use warden_core::types::{Severity, Violation};
use warden_parsers::walker::FileWalker;

use crate::dispatch::{panic_message, EngineDispatcher};
use crate::engines::EngineRegistry;
use crate::rule_check::{AuditContext, AuditFile, PolicyRuleCheck, RuleCheck, SymbolIndex};
use crate::types::{AuditPhase, AuditReport, AuditSummary, CheckResult, CheckStatus, ExitStatus, Offender};

/// Rule id recorded on incomplete-coverage findings.
pub const INCOMPLETE_COVERAGE: &str = "incomplete_coverage";

pub struct AuditRunner {
    root: PathBuf,
    config: WardenConfig,
    engines: Arc<EngineRegistry>,
    extra_checks: Vec<Arc<dyn RuleCheck>>,
}

impl AuditRunner {
    pub fn new(root: &Path, config: WardenConfig, engines: Arc<EngineRegistry>) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            engines,
            extra_checks: Vec::new(),
        }
    }

    /// Run `check` in addition to the policy-document checks.
    pub fn with_check(mut self, check: Arc<dyn RuleCheck>) -> Self {
        self.extra_checks.push(check);
        self
    }

    /// Run a full audit. Never fails: every error becomes a finding.
    pub fn run(&self) -> AuditReport {
        tracing::info!(root = %self.root.display(), "audit started");
        let mut phases = Vec::new();

        let started = Instant::now();
        let mut checks: Vec<Arc<dyn RuleCheck>> = load_policy_dir(&self.root.join(&self.config.policy_dir))
            .into_iter()
            .map(|load| Arc::new(PolicyRuleCheck::from_load(load)) as Arc<dyn RuleCheck>)
            .collect();
        phases.push(phase("load_policies", started, checks.len()));
        checks.extend(self.extra_checks.iter().cloned());

        let started = Instant::now();
        let files: Vec<AuditFile> = FileWalker::new(&self.root)
            .with_excludes(&self.config.ignore_patterns)
            .walk()
            .into_iter()
            .map(AuditFile::from)
            .collect();
        phases.push(phase("discover_files", started, files.len()));

        let started = Instant::now();
        let symbols = SymbolIndex::build(&files);
        phases.push(phase("index_symbols", started, symbols.total()));

        let ctx = AuditContext::new(
            &self.root,
            files,
            symbols,
            EngineDispatcher::new(Arc::clone(&self.engines)),
        );

        let started = Instant::now();
        let deadline = match self.config.audit.timeout_seconds {
            0 => None,
            secs => Some(started + Duration::from_secs(secs)),
        };
        let results = self.execute(&ctx, &checks, deadline);
        phases.push(phase("execute_checks", started, results.len()));

        let started = Instant::now();
        let summary = summarize(&results, self.config.audit.top_offenders);
        phases.push(phase("aggregate", started, summary.total_findings));

        let exit_status = ExitStatus::from_highest(summary.highest_severity);
        tracing::info!(
            checks = results.len(),
            findings = summary.total_findings,
            exit_status = exit_status.code(),
            "audit finished"
        );
        AuditReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            command: "audit".to_string(),
            root: self.root.display().to_string(),
            phases,
            checks: results,
            summary,
            exit_status,
        }
    }

    /// Execute `checks` against `ctx`. Results keep the order of `checks`.
    pub fn execute(
        &self,
        ctx: &AuditContext,
        checks: &[Arc<dyn RuleCheck>],
        deadline: Option<Instant>,
    ) -> Vec<CheckResult> {
        let run_one = |check: &Arc<dyn RuleCheck>| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                incomplete(check.as_ref())
            } else {
                run_check(check.as_ref(), ctx)
            }
        };
        let workers = self.config.audit.max_workers.max(1);
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| checks.par_iter().map(run_one).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "worker pool unavailable, running checks sequentially");
                checks.iter().map(run_one).collect()
            }
        }
    }
}

fn phase(name: &str, started: Instant, items: usize) -> AuditPhase {
    AuditPhase {
        name: name.to_string(),
        duration_ms: started.elapsed().as_millis() as u64,
        items,
    }
}

fn run_check(check: &dyn RuleCheck, ctx: &AuditContext) -> CheckResult {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| check.run(ctx)));
    let (status, findings) = match outcome {
        Ok(Ok(findings)) if findings.is_empty() => (CheckStatus::Passed, findings),
        Ok(Ok(findings)) => (CheckStatus::Failed, findings),
        Ok(Err(e)) => {
            tracing::warn!(check = %check.name(), error = %e, "check failed");
            (CheckStatus::Errored, vec![check_failure(check, e.to_string())])
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::warn!(check = %check.name(), reason = %reason, "check panicked");
            (CheckStatus::Errored, vec![check_failure(check, format!("check crashed: {reason}"))])
        }
    };
    result(check, status, started.elapsed(), findings)
}

fn check_failure(check: &dyn RuleCheck, message: String) -> Violation {
    Violation::new(check.name(), ".", message, Severity::Error, check.name())
}

fn incomplete(check: &dyn RuleCheck) -> CheckResult {
    let finding = Violation::new(
        INCOMPLETE_COVERAGE,
        ".",
        format!(
            "incomplete coverage: check '{}' did not run before the audit timeout",
            check.name()
        ),
        Severity::Warning,
        check.name(),
    );
    result(check, CheckStatus::Incomplete, Duration::ZERO, vec![finding])
}

fn result(check: &dyn RuleCheck, status: CheckStatus, elapsed: Duration, findings: Vec<Violation>) -> CheckResult {
    CheckResult {
        name: check.name().to_string(),
        category: check.category().to_string(),
        policy_rule_ids: check.policy_rule_ids(),
        status,
        duration_ms: elapsed.as_millis() as u64,
        finding_count: findings.len(),
        max_severity: findings.iter().map(|f| f.severity).max(),
        fix_command: check.fix_command().map(str::to_string),
        findings,
    }
}

/// Totals, highest severity, ranked offenders, and de-duplicated
/// remediation commands.
pub fn summarize(results: &[CheckResult], top_n: usize) -> AuditSummary {
    let mut offenders: Vec<Offender> = results
        .iter()
        .filter(|r| r.has_issues())
        .map(|r| Offender {
            check: r.name.clone(),
            findings: r.finding_count,
        })
        .collect();
    offenders.sort_by(|a, b| b.findings.cmp(&a.findings).then_with(|| a.check.cmp(&b.check)));
    offenders.truncate(top_n);

    let mut seen = BTreeSet::new();
    let mut suggested_commands = Vec::new();
    for r in results.iter().filter(|r| r.has_issues()) {
        let from_findings = r.findings.iter().filter_map(|f| f.suggested_fix.as_deref());
        for cmd in r.fix_command.as_deref().into_iter().chain(from_findings) {
            if seen.insert(cmd.to_string()) {
                suggested_commands.push(cmd.to_string());
            }
        }
    }

    AuditSummary {
        total_findings: results.iter().map(|r| r.finding_count).sum(),
        checks_run: results.len(),
        checks_with_issues: results.iter().filter(|r| r.has_issues()).count(),
        highest_severity: results.iter().filter_map(|r| r.max_severity).max(),
        top_offenders: offenders,
        suggested_commands,
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
