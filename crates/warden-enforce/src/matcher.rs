//! Rule pattern matching.
//!
//! Patterns are globs over `/`-separated repository-relative paths. `*`
//! stays within one path segment and `**` spans segments. A pattern without
//! any `/` also matches against the file name alone, so `*.py` covers every
//! Python file. An empty pattern never matches.

use globset::{GlobBuilder, GlobMatcher};
use warden_core::types::{sort_rules, PolicyRule, Severity, Violation};

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid pattern {pattern:?}: {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

/// A compiled rule pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    matcher: Option<GlobMatcher>,
    basename_only: bool,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                matcher: None,
                basename_only: false,
            });
        }
        let glob = GlobBuilder::new(trimmed)
            .literal_separator(true)
            .build()
            .map_err(|e| PatternError {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?;
        Ok(Self {
            matcher: Some(glob.compile_matcher()),
            basename_only: !trimmed.contains('/'),
        })
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        let Some(m) = &self.matcher else {
            return false;
        };
        let path = normalize(rel_path);
        if m.is_match(&path) {
            return true;
        }
        self.basename_only && path.rsplit('/').next().is_some_and(|name| m.is_match(name))
    }
}

/// Separator-normalized path without a leading `./`.
pub fn normalize(rel_path: &str) -> String {
    let p = rel_path.replace('\\', "/");
    p.trim_start_matches("./").to_string()
}

/// A rule with its compiled pattern, or the reason it failed to compile.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: PolicyRule,
    pub pattern: Result<PathPattern, PatternError>,
}

impl CompiledRule {
    /// The error-severity configuration finding for an uncompilable pattern.
    pub fn pattern_violation(&self, path: &str) -> Option<Violation> {
        let err = self.pattern.as_ref().err()?;
        Some(Violation::new(
            &self.rule.id,
            path,
            format!("Configuration error in rule '{}': {err}", self.rule.id),
            Severity::Error,
            &self.rule.source,
        ))
    }
}

/// The active rule table, sorted into deterministic evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(mut rules: Vec<PolicyRule>) -> Self {
        sort_rules(&mut rules);
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = PathPattern::compile(&rule.pattern);
                if let Err(e) = &pattern {
                    tracing::warn!(rule = %rule.id, policy = %rule.source, error = %e, "rule pattern does not compile");
                }
                CompiledRule { rule, pattern }
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Rules that apply to `rel_path`, in evaluation order. Rules whose
    /// pattern failed to compile are included: they cannot prove the path
    /// is out of scope.
    pub fn applicable<'a>(&'a self, rel_path: &'a str) -> impl Iterator<Item = &'a CompiledRule> {
        self.rules.iter().filter(move |r| match &r.pattern {
            Ok(p) => p.is_match(rel_path),
            Err(_) => true,
        })
    }
}
