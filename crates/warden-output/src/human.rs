use crate::human_helpers::{format_violation_human, status_label};
use crate::OutputFormatter;
use warden_enforce::actions::{ActionInfo, ActionResult};
use warden_enforce::types::{AuditReport, EditVerdict, PathCheckResult};

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_audit(&self, report: &AuditReport) -> String {
        let mut out = String::new();

        for check in &report.checks {
            out.push_str(&format!(
                "{:<5} {} ({} finding(s), {}ms)\n",
                status_label(check.status),
                check.name,
                check.finding_count,
                check.duration_ms,
            ));
            for v in &check.findings {
                out.push_str(&format_violation_human(v));
            }
        }

        let s = &report.summary;
        out.push_str(&format!(
            "\n{} finding(s) across {} of {} check(s); highest severity: {}\n",
            s.total_findings,
            s.checks_with_issues,
            s.checks_run,
            s.highest_severity.map_or("none", |sev| sev.as_str()),
        ));
        if !s.top_offenders.is_empty() {
            out.push_str("Top offenders:\n");
            for o in &s.top_offenders {
                out.push_str(&format!("  {} ({})\n", o.check, o.findings));
            }
        }
        if !s.suggested_commands.is_empty() {
            out.push_str("Suggested commands:\n");
            for cmd in &s.suggested_commands {
                out.push_str(&format!("  {}\n", cmd));
            }
        }
        out
    }

    fn format_path_check(&self, result: &PathCheckResult) -> String {
        if result.violations.is_empty() && result.warnings.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        for v in result.violations.iter().chain(&result.warnings) {
            out.push_str(&format_violation_human(v));
        }
        out.push_str(&format!(
            "\n{} violation(s), {} warning(s)\n",
            result.violations.len(),
            result.warnings.len(),
        ));
        out
    }

    fn format_edit(&self, verdict: &EditVerdict) -> String {
        let mut out = format!(
            "{}: {}\n",
            verdict.path,
            if verdict.is_allowed() { "metadata-only edit" } else { "edit rejected" },
        );
        if let (Some(before), Some(after)) = (&verdict.original_digest, &verdict.modified_digest) {
            out.push_str(&format!("  digest: {} -> {}\n", before, after));
        }
        if !verdict.semantics_preserved {
            out.push_str("  executable semantics changed\n");
        }
        for (category, count) in &verdict.categories {
            out.push_str(&format!("  {}: {}\n", category, count));
        }
        for f in &verdict.findings {
            match f.line {
                Some(line) => out.push_str(&format!("  line {}: {}\n", line, f.message)),
                None => out.push_str(&format!("  {}\n", f.message)),
            }
        }
        out
    }

    fn format_actions(&self, actions: &[ActionInfo]) -> String {
        let mut out = String::new();
        for a in actions {
            out.push_str(&format!(
                "{} [{}] impact={:?} policies={}\n",
                a.id,
                a.category.as_str(),
                a.impact,
                a.policies.join(","),
            ));
            if !a.description.is_empty() {
                out.push_str(&format!("  {}\n", a.description));
            }
        }
        out
    }

    fn format_action_result(&self, result: &ActionResult) -> String {
        let mut out = format!(
            "{}: {} ({}ms)\n",
            result.action_id,
            if result.ok { "ok" } else { "failed" },
            result.duration_ms,
        );
        out.push_str(&serde_json::to_string_pretty(&result.data).unwrap_or_default());
        out.push('\n');
        for s in &result.suggestions {
            out.push_str(&format!("  hint: {}\n", s));
        }
        out
    }
}
