//! Python grammar: docstrings are documentation, `#` comments and line
//! continuations are trivia.

pub mod structure;

use tree_sitter::{Language, Node};

use crate::grammar::{SourceGrammar, Symbol};
use crate::metadata::{CommentLine, SourceMetadata, MODULE_SCOPE};
use crate::treesitter::{line_of, node_text};

pub struct PythonGrammar;

impl SourceGrammar for PythonGrammar {
    fn name(&self) -> &'static str {
        "python"
    }

    fn language(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn is_non_semantic(&self, node: Node<'_>, _source: &[u8]) -> bool {
        matches!(node.kind(), "comment" | "line_continuation") || is_docstring(node)
    }

    fn collect_metadata(&self, root: Node<'_>, source: &[u8]) -> SourceMetadata {
        let mut meta = SourceMetadata::default();
        if let Some(doc) = docstring_of(root) {
            meta.docs
                .insert(MODULE_SCOPE.to_string(), node_text(doc, source).to_string());
        }
        let mut scope = Vec::new();
        visit_metadata(root, source, &mut scope, &mut meta);
        meta
    }

    fn symbols(&self, root: Node<'_>, source: &[u8]) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut scope = Vec::new();
        visit_symbols(root, source, &mut scope, &mut out);
        out
    }
}

fn visit_metadata(node: Node<'_>, source: &[u8], scope: &mut Vec<String>, meta: &mut SourceMetadata) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "comment" => meta.comments.push(CommentLine {
                line: line_of(child),
                text: node_text(child, source).trim().to_string(),
            }),
            "function_definition" | "class_definition" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                scope.push(name);
                if let Some(doc) = child.child_by_field_name("body").and_then(docstring_of) {
                    let key = unique_key(&meta.docs, scope.join("."));
                    meta.docs.insert(key, node_text(doc, source).to_string());
                }
                visit_metadata(child, source, scope, meta);
                scope.pop();
            }
            _ => visit_metadata(child, source, scope, meta),
        }
    }
}

fn visit_symbols(node: Node<'_>, source: &[u8], scope: &mut Vec<String>, out: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = match child.kind() {
            "function_definition" => "function",
            "class_definition" => "class",
            _ => {
                visit_symbols(child, source, scope, out);
                continue;
            }
        };
        let name = child
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default();
        scope.push(name);
        out.push(Symbol {
            name: scope.join("."),
            kind: kind.to_string(),
            line: line_of(child),
        });
        visit_symbols(child, source, scope, out);
        scope.pop();
    }
}

/// Disambiguate repeated scope names (property setters, overloads).
pub(crate) fn unique_key(docs: &std::collections::BTreeMap<String, String>, key: String) -> String {
    if !docs.contains_key(&key) {
        return key;
    }
    (2..)
        .map(|n| format!("{key}#{n}"))
        .find(|k| !docs.contains_key(k))
        .unwrap_or(key)
}

/// Named children other than comments.
pub(crate) fn statements(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// The docstring string node of a module or body block, if it has one.
fn docstring_of(container: Node<'_>) -> Option<Node<'_>> {
    let first = statements(container).into_iter().next()?;
    if is_docstring(first) {
        statements(first).into_iter().next()
    } else {
        None
    }
}

/// True for the leading string-literal statement of a module, class, or
/// function body.
pub(crate) fn is_docstring(node: Node<'_>) -> bool {
    if node.kind() != "expression_statement" {
        return false;
    }
    let exprs = statements(node);
    if exprs.len() != 1 || !is_plain_string(exprs[0]) {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    let documents_scope = match parent.kind() {
        "module" => true,
        "block" => parent
            .parent()
            .is_some_and(|p| matches!(p.kind(), "function_definition" | "class_definition")),
        _ => false,
    };
    documents_scope
        && statements(parent)
            .first()
            .is_some_and(|first| first.id() == node.id())
}

fn is_plain_string(node: Node<'_>) -> bool {
    match node.kind() {
        "string" => {
            let mut cursor = node.walk();
            let has_interpolation = node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "interpolation");
            !has_interpolation
        }
        "concatenated_string" => statements(node).into_iter().all(is_plain_string),
        _ => false,
    }
}
