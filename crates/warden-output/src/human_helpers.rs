use warden_core::types::Violation;
use warden_enforce::types::CheckStatus;

pub(crate) fn format_violation_human(v: &Violation) -> String {
    let location = match v.line {
        Some(line) => format!("{}:{}", v.path, line),
        None => v.path.clone(),
    };
    let mut out = format!("{}[{}]: {}\n  --> {}\n", v.severity, v.rule, v.message, location);
    if !v.source_policy.is_empty() && v.source_policy != v.rule {
        out.push_str(&format!("   = policy: {}\n", v.source_policy));
    }
    if let Some(fix) = &v.suggested_fix {
        out.push_str(&format!("   = fix: {}\n", fix));
    }
    out
}

pub(crate) fn status_label(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Passed => "PASS",
        CheckStatus::Failed => "FAIL",
        CheckStatus::Errored => "ERROR",
        CheckStatus::Incomplete => "SKIP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::types::Severity;

    #[test]
    fn test_violation_with_line_and_fix() {
        let v = Violation::new("no-eval", "src/a.py", "eval is forbidden", Severity::Error, "standards")
            .with_line(4)
            .with_fix("warden fix eval");
        assert_eq!(
            format_violation_human(&v),
            "error[no-eval]: eval is forbidden\n  --> src/a.py:4\n   = policy: standards\n   = fix: warden fix eval\n"
        );
    }

    #[test]
    fn test_invariant_violation_omits_policy_line() {
        let v = Violation::new("governance_root", ".intent/x", "never", Severity::Error, "governance_root");
        assert_eq!(format_violation_human(&v), "error[governance_root]: never\n  --> .intent/x\n");
    }
}
