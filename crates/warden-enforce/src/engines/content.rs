//! Pattern checks over paths and text.

use regex::Regex;
use warden_core::types::{EngineResult, RawFinding, RuleParams};

use super::{check_type, Engine, EngineError, Target};

pub const ENGINE_ID: &str = "content";

const CHECKS: &[&str] = &["path_pattern", "forbidden_content", "required_content"];

pub struct ContentEngine;

impl Engine for ContentEngine {
    fn id(&self) -> &str {
        ENGINE_ID
    }

    fn supported_checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    fn verify(&self, target: &Target, params: &RuleParams) -> Result<EngineResult, EngineError> {
        let check = check_type(self, params)?;
        let file = target.as_file().ok_or_else(|| EngineError::WrongTarget {
            engine: ENGINE_ID.to_string(),
            target: target.display_path(),
        })?;
        let patterns = compile_patterns(params)?;

        if check == "path_pattern" {
            return path_pattern(&file.rel_path, &patterns, params);
        }

        let text = match file.read() {
            Ok(t) => t,
            Err(e @ EngineError::Unreadable { .. }) => {
                return Ok(EngineResult::fail(ENGINE_ID, "target unreadable", vec![RawFinding::new(e.to_string())]))
            }
            Err(e) => return Err(e),
        };

        let findings = match check {
            "forbidden_content" => forbidden_content(&text, &patterns),
            "required_content" => required_content(&text, &patterns),
            other => {
                return Err(EngineError::UnsupportedCheck {
                    engine: ENGINE_ID.to_string(),
                    check: other.to_string(),
                })
            }
        };
        Ok(EngineResult::from_findings(ENGINE_ID, findings))
    }
}

/// `patterns` and `pattern` are both accepted; a scalar is a one-element list.
fn compile_patterns(params: &RuleParams) -> Result<Vec<Regex>, EngineError> {
    let mut sources = params.get_list("patterns");
    sources.extend(params.get_list("pattern"));
    if sources.is_empty() {
        return Err(EngineError::InvalidParams("'patterns' must list at least one pattern".to_string()));
    }
    sources
        .iter()
        .map(|p| Regex::new(p).map_err(|e| EngineError::InvalidParams(format!("bad pattern {p:?}: {e}"))))
        .collect()
}

/// `mode: "require"` (default): the path must match one pattern.
/// `mode: "forbid"`: every matching pattern is a finding.
fn path_pattern(rel_path: &str, patterns: &[Regex], params: &RuleParams) -> Result<EngineResult, EngineError> {
    let findings = match params.get_str("mode").unwrap_or("require") {
        "require" => {
            if patterns.iter().any(|p| p.is_match(rel_path)) {
                Vec::new()
            } else {
                let names: Vec<&str> = patterns.iter().map(Regex::as_str).collect();
                vec![RawFinding::new(format!(
                    "path '{rel_path}' does not match any of: {}",
                    names.join(", ")
                ))]
            }
        }
        "forbid" => patterns
            .iter()
            .filter(|p| p.is_match(rel_path))
            .map(|p| RawFinding::new(format!("path '{rel_path}' matches forbidden pattern '{}'", p.as_str())))
            .collect(),
        other => {
            return Err(EngineError::InvalidParams(format!(
                "unknown path_pattern mode '{other}' (expected require or forbid)"
            )))
        }
    };
    Ok(EngineResult::from_findings(ENGINE_ID, findings))
}

/// One finding per offending line, naming the first pattern that matched.
fn forbidden_content(text: &str, patterns: &[Regex]) -> Vec<RawFinding> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let hit = patterns.iter().find(|p| p.is_match(line))?;
            Some(RawFinding::at_line(
                format!("forbidden pattern '{}' found", hit.as_str()),
                i as u32 + 1,
            ))
        })
        .collect()
}

/// One finding per pattern that never matches anywhere in the text.
fn required_content(text: &str, patterns: &[Regex]) -> Vec<RawFinding> {
    patterns
        .iter()
        .filter(|p| !p.is_match(text))
        .map(|p| RawFinding::new(format!("required pattern '{}' not found", p.as_str())))
        .collect()
}
