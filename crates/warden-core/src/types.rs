use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Finding severity. Ordered: `Info < Warning < Error`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported non-compliance.
///
/// Violations are produced once and only ever aggregated; the `with_*`
/// helpers consume the value and are meant for construction only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Id of the policy rule (or hard invariant) that produced this finding.
    pub rule: String,
    pub path: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggested_fix: Option<String>,
    /// Policy document the rule came from.
    pub source_policy: String,
}

impl Violation {
    pub fn new(
        rule: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        source_policy: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            path: path.into(),
            message: message.into(),
            severity,
            line: None,
            suggested_fix: None,
            source_policy: source_policy.into(),
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// What a matching rule does when it has no engine, or that it delegates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleAction {
    Deny,
    Warn,
    #[serde(alias = "engine")]
    DelegateToEngine,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Deny => "deny",
            RuleAction::Warn => "warn",
            RuleAction::DelegateToEngine => "delegate-to-engine",
        }
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine parameters attached to a rule. Ordered so iteration is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(pub BTreeMap<String, Value>);

impl RuleParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `check_type` parameter selecting which check an engine runs.
    pub fn check_type(&self) -> Option<&str> {
        self.get_str("check_type")
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Read a list of strings. A scalar string is normalized to a
    /// one-element list; non-string array items are skipped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A declarative policy rule: match pattern plus simple action or engine reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    /// Glob-style path pattern. An empty pattern never matches.
    #[serde(default)]
    pub pattern: String,
    pub action: RuleAction,
    #[serde(default)]
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "params_empty")]
    pub params: RuleParams,
    #[serde(default)]
    pub description: String,
    /// Command that remediates findings of this rule, if one exists.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fix_command: Option<String>,
    /// Id of the policy document this rule was loaded from.
    #[serde(default)]
    pub source: String,
}

fn params_empty(p: &RuleParams) -> bool {
    p.0.is_empty()
}

impl PolicyRule {
    /// Text used to prefix engine findings. Falls back to the rule id.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.id
        } else {
            &self.description
        }
    }

    /// Build a violation attributed to this rule.
    pub fn violation(&self, path: &str, message: impl Into<String>) -> Violation {
        Violation::new(&self.id, path, message, self.severity, &self.source)
    }
}

/// Sort rules into the deterministic evaluation order (by id, then source).
pub fn sort_rules(rules: &mut [PolicyRule]) {
    rules.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.source.cmp(&b.source)));
}

/// A raw sub-finding reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFinding {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<u32>,
}

impl RawFinding {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Outcome of one engine invocation. The dispatcher, not the engine,
/// decides the final severity and framing of each finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub ok: bool,
    pub message: String,
    pub violations: Vec<RawFinding>,
    pub engine_id: String,
}

impl EngineResult {
    pub fn pass(engine_id: &str, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            violations: Vec::new(),
            engine_id: engine_id.to_string(),
        }
    }

    pub fn fail(engine_id: &str, message: impl Into<String>, violations: Vec<RawFinding>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            violations,
            engine_id: engine_id.to_string(),
        }
    }

    /// Pass when `violations` is empty, fail otherwise.
    pub fn from_findings(engine_id: &str, violations: Vec<RawFinding>) -> Self {
        if violations.is_empty() {
            Self::pass(engine_id, "ok")
        } else {
            let message = format!("{} finding(s)", violations.len());
            Self::fail(engine_id, message, violations)
        }
    }
}
