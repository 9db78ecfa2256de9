use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_core::types::{Severity, Violation};
use warden_parsers::metadata::EditCategory;

/// Result of validating a batch of candidate paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathCheckResult {
    /// False when any error-severity violation was produced.
    pub is_valid: bool,
    pub violations: Vec<Violation>,
    /// Advisory findings from `warn` rules. Never block.
    pub warnings: Vec<Violation>,
}

/// Verdict of the metadata-only verifier for one edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditVerdict {
    pub path: String,
    pub semantics_preserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_digest: Option<String>,
    pub categories: BTreeMap<EditCategory, usize>,
    pub findings: Vec<EditFinding>,
}

impl EditVerdict {
    /// True when semantics are preserved and no secondary constraint failed.
    pub fn is_allowed(&self) -> bool {
        self.semantics_preserved && self.findings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditFinding {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The check itself errored or panicked.
    Errored,
    /// The run timed out before the check started.
    Incomplete,
}

/// Reporting aggregate for one executed check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub category: String,
    pub policy_rule_ids: Vec<String>,
    pub status: CheckStatus,
    pub duration_ms: u64,
    pub finding_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
    pub findings: Vec<Violation>,
}

impl CheckResult {
    pub fn has_issues(&self) -> bool {
        self.finding_count > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPhase {
    pub name: String,
    pub duration_ms: u64,
    /// Items the phase produced (policies, files, symbols, checks, findings).
    pub items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offender {
    pub check: String,
    pub findings: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_findings: usize,
    pub checks_run: usize,
    pub checks_with_issues: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<Severity>,
    pub top_offenders: Vec<Offender>,
    pub suggested_commands: Vec<String>,
}

/// Three-tier exit decision: must stop, should look, clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Clean,
    Blocking,
    Advisory,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Blocking => 1,
            ExitStatus::Advisory => 2,
        }
    }

    /// Any error → blocking; otherwise any warning → advisory; else clean.
    pub fn from_highest(highest: Option<Severity>) -> Self {
        match highest {
            Some(Severity::Error) => ExitStatus::Blocking,
            Some(Severity::Warning) => ExitStatus::Advisory,
            Some(Severity::Info) | None => ExitStatus::Clean,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub version: String,
    pub command: String,
    pub root: String,
    pub phases: Vec<AuditPhase>,
    pub checks: Vec<CheckResult>,
    pub summary: AuditSummary,
    pub exit_status: ExitStatus,
}

impl AuditReport {
    pub fn exit_code(&self) -> i32 {
        self.exit_status.code()
    }
}
