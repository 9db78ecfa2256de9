use crate::OutputFormatter;
use warden_enforce::actions::{ActionInfo, ActionResult};
use warden_enforce::types::{AuditReport, EditVerdict, PathCheckResult};

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_audit(&self, report: &AuditReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_default()
    }
    fn format_path_check(&self, result: &PathCheckResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_default()
    }
    fn format_edit(&self, verdict: &EditVerdict) -> String {
        serde_json::to_string_pretty(verdict).unwrap_or_default()
    }
    fn format_actions(&self, actions: &[ActionInfo]) -> String {
        serde_json::to_string_pretty(actions).unwrap_or_default()
    }
    fn format_action_result(&self, result: &ActionResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_default()
    }
}
