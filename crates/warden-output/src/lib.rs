//! Output formatters for warden command results.
//!
//! Two output modes:
//! - **JSON** (`--json`): machine-readable, stable field order
//! - **Human** (default): terminal report

pub mod human;
pub(crate) mod human_helpers;
pub mod json;

use warden_enforce::actions::{ActionInfo, ActionResult};
use warden_enforce::types::{AuditReport, EditVerdict, PathCheckResult};

pub trait OutputFormatter {
    fn format_audit(&self, report: &AuditReport) -> String;
    fn format_path_check(&self, result: &PathCheckResult) -> String;
    fn format_edit(&self, verdict: &EditVerdict) -> String;
    fn format_actions(&self, actions: &[ActionInfo]) -> String;
    fn format_action_result(&self, result: &ActionResult) -> String;
}
