//! Syntax-tree checks.
//!
//! All checks except `max_size` (file limit) and `metadata_only` need a
//! Python source. `metadata_only` works for every managed grammar.

use std::collections::BTreeSet;
use std::path::Path;

use warden_core::types::{EngineResult, RawFinding, RuleParams};
use warden_parsers::canonical::{compare, CompareError};
use warden_parsers::grammar::SourceGrammar;
use warden_parsers::metadata::{diff_metadata, EditCategory, SourceMetadata};
use warden_parsers::python::structure::PythonModule;
use warden_parsers::treesitter::{detect_language, grammar_for_path, ParseError};

use super::{check_type, Engine, EngineError, FileTarget, Target};
use crate::types::{EditFinding, EditVerdict};

pub const ENGINE_ID: &str = "structural";

const CHECKS: &[&str] = &[
    "forbidden_calls",
    "no_module_side_effects",
    "required_decorator_args",
    "max_size",
    "import_boundary",
    "metadata_only",
];

pub struct StructuralEngine {
    max_comment_length: usize,
}

impl StructuralEngine {
    pub fn new(max_comment_length: usize) -> Self {
        Self { max_comment_length }
    }
}

impl Engine for StructuralEngine {
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

        if check == "metadata_only" {
            return self.metadata_only(file, params);
        }

        let source = match file.read() {
            Ok(s) => s,
            Err(e @ EngineError::Unreadable { .. }) => {
                return Ok(EngineResult::fail(ENGINE_ID, "target unreadable", vec![RawFinding::new(e.to_string())]))
            }
            Err(e) => return Err(e),
        };

        if check == "max_size" {
            return max_size(file, &source, params);
        }

        let module = match parse_python(file, check, &source)? {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let findings = match check {
            "forbidden_calls" => forbidden_calls(&module, params)?,
            "no_module_side_effects" => module_side_effects(&module, params),
            "required_decorator_args" => required_decorator_args(&module, params)?,
            "import_boundary" => import_boundary(&module, params)?,
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

impl StructuralEngine {
    fn metadata_only(&self, file: &FileTarget, params: &RuleParams) -> Result<EngineResult, EngineError> {
        let Some(modified) = &file.content else {
            return Ok(EngineResult::pass(ENGINE_ID, "no pending edit"));
        };
        let Some(original) = &file.baseline else {
            return Ok(EngineResult::fail(
                ENGINE_ID,
                "no baseline",
                vec![RawFinding::new(format!(
                    "cannot prove the edit is metadata-only: '{}' has no baseline version",
                    file.rel_path
                ))],
            ));
        };
        let Some(grammar) = grammar_for_path(Path::new(&file.rel_path)) else {
            return Ok(EngineResult::fail(
                ENGINE_ID,
                "no grammar",
                vec![RawFinding::new(format!(
                    "cannot prove the edit is metadata-only: no grammar for '{}'",
                    file.rel_path
                ))],
            ));
        };
        let options = MetadataOptions::from_params(params, self.max_comment_length)?;
        let verdict = verify_metadata_only(grammar, &file.rel_path, original, modified, &options);

        if verdict.is_allowed() {
            let mut message = format!(
                "semantics preserved (canonical digest {})",
                verdict.modified_digest.as_deref().unwrap_or("-")
            );
            if !verdict.categories.is_empty() {
                let cats: Vec<String> = verdict
                    .categories
                    .iter()
                    .map(|(c, n)| format!("{c}={n}"))
                    .collect();
                message.push_str(&format!("; edits: {}", cats.join(", ")));
            }
            return Ok(EngineResult::pass(ENGINE_ID, message));
        }
        let findings = verdict
            .findings
            .into_iter()
            .map(|f| RawFinding {
                message: f.message,
                line: f.line,
            })
            .collect();
        Ok(EngineResult::fail(ENGINE_ID, "edit is not metadata-only", findings))
    }
}

/// Secondary constraints for edits already proven metadata-only.
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    /// Maximum length of any newly added comment line.
    pub max_comment_length: Option<usize>,
    /// Permitted edit categories; `None` permits all.
    pub allowed: Option<BTreeSet<EditCategory>>,
}

impl MetadataOptions {
    /// Read `max_comment_length` and `allowed_edits` from rule params.
    pub fn from_params(params: &RuleParams, default_max: usize) -> Result<Self, EngineError> {
        let max_comment_length = Some(
            params
                .get_u64("max_comment_length")
                .map(|n| n as usize)
                .unwrap_or(default_max),
        );
        let allowed = match params.get("allowed_edits") {
            None => None,
            Some(_) => Some(
                params
                    .get_list("allowed_edits")
                    .iter()
                    .map(|name| {
                        EditCategory::parse(name).ok_or_else(|| {
                            EngineError::InvalidParams(format!("unknown edit category '{name}'"))
                        })
                    })
                    .collect::<Result<BTreeSet<_>, _>>()?,
            ),
        };
        Ok(Self {
            max_comment_length,
            allowed,
        })
    }
}

/// Prove that `modified` differs from `original` only in comments,
/// documentation, and layout, then apply the secondary constraints.
///
/// A parse failure on either side, or any change to the canonical form,
/// stops evaluation with a single finding.
pub fn verify_metadata_only(
    grammar: &dyn SourceGrammar,
    path: &str,
    original: &str,
    modified: &str,
    options: &MetadataOptions,
) -> EditVerdict {
    let mut verdict = EditVerdict {
        path: path.to_string(),
        semantics_preserved: false,
        original_digest: None,
        modified_digest: None,
        categories: Default::default(),
        findings: Vec::new(),
    };

    let comparison = match compare(grammar, original, modified) {
        Ok(c) => c,
        Err(e) => {
            let line = match &e {
                CompareError::Original(ParseError::Syntax { line, .. })
                | CompareError::Modified(ParseError::Syntax { line, .. }) => Some(*line),
                _ => None,
            };
            verdict.findings.push(EditFinding {
                message: format!("cannot prove the edit is metadata-only: {e}"),
                line,
            });
            return verdict;
        }
    };
    verdict.original_digest = Some(comparison.original.digest.clone());
    verdict.modified_digest = Some(comparison.modified.digest.clone());

    if !comparison.semantics_preserved() {
        verdict.findings.push(EditFinding {
            message: format!(
                "edit changes executable semantics (canonical digest {} -> {})",
                comparison.original.digest, comparison.modified.digest
            ),
            line: None,
        });
        return verdict;
    }
    verdict.semantics_preserved = true;

    let (before, after) = match (
        SourceMetadata::extract(grammar, original),
        SourceMetadata::extract(grammar, modified),
    ) {
        (Ok(b), Ok(a)) => (b, a),
        (Err(e), _) | (_, Err(e)) => {
            verdict.findings.push(EditFinding {
                message: format!("cannot extract metadata: {e}"),
                line: None,
            });
            return verdict;
        }
    };
    let diff = diff_metadata(&before, &after);
    verdict.categories = diff.categories();

    if let Some(max) = options.max_comment_length {
        for c in &diff.added_comments {
            let len = c.text.chars().count();
            if len > max {
                verdict.findings.push(EditFinding {
                    message: format!("added comment is {len} characters (limit {max})"),
                    line: Some(c.line),
                });
            }
        }
    }
    if let Some(allowed) = &options.allowed {
        for (category, count) in &verdict.categories {
            if !allowed.contains(category) {
                verdict.findings.push(EditFinding {
                    message: format!("edit category '{category}' is not permitted ({count} edit(s))"),
                    line: None,
                });
            }
        }
    }
    verdict
}

fn parse_python(
    file: &FileTarget,
    check: &str,
    source: &str,
) -> Result<Result<PythonModule, EngineResult>, EngineError> {
    if detect_language(Path::new(&file.rel_path)) != Some("python") {
        return Err(EngineError::InvalidParams(format!(
            "check '{check}' applies to Python sources, not '{}'",
            file.rel_path
        )));
    }
    Ok(PythonModule::parse(source).map_err(|e| {
        let finding = match e {
            ParseError::Syntax { line, .. } => RawFinding::at_line(format!("cannot parse source: {e}"), line),
            _ => RawFinding::new(format!("cannot parse source: {e}")),
        };
        EngineResult::fail(ENGINE_ID, "parse failure", vec![finding])
    }))
}

fn required_list(params: &RuleParams, key: &str) -> Result<Vec<String>, EngineError> {
    let list = params.get_list(key);
    if list.is_empty() {
        Err(EngineError::InvalidParams(format!("'{key}' must list at least one entry")))
    } else {
        Ok(list)
    }
}

fn forbidden_calls(module: &PythonModule, params: &RuleParams) -> Result<Vec<RawFinding>, EngineError> {
    let forbidden = required_list(params, "calls")?;
    Ok(module
        .call_sites()
        .into_iter()
        .filter(|c| forbidden.contains(&c.name))
        .map(|c| RawFinding::at_line(format!("call to forbidden function '{}'", c.name), c.line))
        .collect())
}

fn module_side_effects(module: &PythonModule, params: &RuleParams) -> Vec<RawFinding> {
    let allowed = params.get_list("allowed_calls");
    module
        .module_side_effects(&allowed)
        .into_iter()
        .map(|e| RawFinding::at_line(format!("module-level side effect ({}): {}", e.kind, e.text), e.line))
        .collect()
}

fn required_decorator_args(module: &PythonModule, params: &RuleParams) -> Result<Vec<RawFinding>, EngineError> {
    let decorator = params
        .get_str("decorator")
        .filter(|d| !d.is_empty())
        .ok_or_else(|| EngineError::InvalidParams("'decorator' is required".to_string()))?;
    let required = required_list(params, "required_args")?;
    let suffix = format!(".{decorator}");

    let mut findings = Vec::new();
    for def in module.decorated_definitions() {
        for use_ in &def.decorators {
            if use_.name != decorator && !use_.name.ends_with(&suffix) {
                continue;
            }
            let missing: Vec<&str> = required
                .iter()
                .filter(|arg| !use_.keywords.contains(arg))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                findings.push(RawFinding::at_line(
                    format!(
                        "@{} on '{}' is missing argument(s): {}",
                        use_.name,
                        def.name,
                        missing.join(", ")
                    ),
                    use_.line,
                ));
            }
        }
    }
    Ok(findings)
}

fn max_size(file: &FileTarget, source: &str, params: &RuleParams) -> Result<EngineResult, EngineError> {
    let max_lines = params.get_u64("max_lines");
    let max_function = params.get_u64("max_function_lines");
    let max_class = params.get_u64("max_class_lines");
    if max_lines.is_none() && max_function.is_none() && max_class.is_none() {
        return Err(EngineError::InvalidParams(
            "max_size needs max_lines, max_function_lines or max_class_lines".to_string(),
        ));
    }

    let mut findings = Vec::new();
    if let Some(max) = max_lines {
        let lines = source.lines().count() as u64;
        if lines > max {
            findings.push(RawFinding::new(format!("file has {lines} lines (limit {max})")));
        }
    }
    if max_function.is_some() || max_class.is_some() {
        let module = match parse_python(file, "max_size", source)? {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        for span in module.definition_spans() {
            let limit = if span.kind == "class" { max_class } else { max_function };
            if let Some(max) = limit.filter(|m| u64::from(span.lines) > *m) {
                findings.push(RawFinding::at_line(
                    format!("{} '{}' spans {} lines (limit {max})", span.kind, span.name, span.lines),
                    span.line,
                ));
            }
        }
    }
    Ok(EngineResult::from_findings(ENGINE_ID, findings))
}

fn import_boundary(module: &PythonModule, params: &RuleParams) -> Result<Vec<RawFinding>, EngineError> {
    let forbidden = params.get_list("forbidden");
    let allowed = params.get_list("allowed");
    if forbidden.is_empty() && allowed.is_empty() {
        return Err(EngineError::InvalidParams(
            "import_boundary needs 'forbidden' or 'allowed' modules".to_string(),
        ));
    }
    let within = |module: &str, prefix: &str| module == prefix || module.starts_with(&format!("{prefix}."));

    let mut findings = Vec::new();
    for import in module.imports() {
        if let Some(p) = forbidden.iter().find(|p| within(&import.module, p)) {
            findings.push(RawFinding::at_line(
                format!("import of '{}' crosses a forbidden boundary ('{p}')", import.module),
                import.line,
            ));
            continue;
        }
        let relative = import.module.starts_with('.');
        if !allowed.is_empty() && !relative && !allowed.iter().any(|p| within(&import.module, p)) {
            findings.push(RawFinding::at_line(
                format!("import of '{}' is outside the allowed modules", import.module),
                import.line,
            ));
        }
    }
    Ok(findings)
}

#[cfg(test)]
#[path = "structural_tests.rs"]
mod tests;
