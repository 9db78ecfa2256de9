//! Rust grammar: `///`, `//!`, `/** */`, `/*! */` and `#[doc = ...]` are
//! documentation, every other comment is trivia.
//!
//! Outer docs belong to the item that follows them; inner docs belong to
//! the enclosing module (or the file).

use tree_sitter::{Language, Node};

use crate::grammar::{SourceGrammar, Symbol};
use crate::metadata::{CommentLine, SourceMetadata, MODULE_SCOPE};
use crate::treesitter::{line_of, node_text};

pub struct RustGrammar;

impl SourceGrammar for RustGrammar {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn language(&self) -> Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    fn is_non_semantic(&self, node: Node<'_>, source: &[u8]) -> bool {
        match node.kind() {
            "line_comment" | "block_comment" => true,
            "attribute_item" | "inner_attribute_item" => is_doc_attribute(node, source),
            _ => false,
        }
    }

    fn collect_metadata(&self, root: Node<'_>, source: &[u8]) -> SourceMetadata {
        let mut meta = SourceMetadata::default();
        visit(root, source, &mut Vec::new(), &mut meta);
        meta
    }

    fn symbols(&self, root: Node<'_>, source: &[u8]) -> Vec<Symbol> {
        let mut out = Vec::new();
        collect_symbols(root, source, &mut Vec::new(), &mut out);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocKind {
    Outer,
    Inner,
}

fn doc_kind(text: &str) -> Option<DocKind> {
    if text.starts_with("//!") || text.starts_with("/*!") {
        return Some(DocKind::Inner);
    }
    let outer_line = text.starts_with("///") && !text.starts_with("////");
    let outer_block = text.starts_with("/**") && !text.starts_with("/***") && text != "/**/";
    (outer_line || outer_block).then_some(DocKind::Outer)
}

fn is_doc_attribute(node: Node<'_>, source: &[u8]) -> bool {
    let text: String = node_text(node, source)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    text.starts_with("#[doc") || text.starts_with("#![doc")
}

fn item_kind(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "function_item" | "function_signature_item" => "function",
        "struct_item" => "struct",
        "enum_item" => "enum",
        "union_item" => "union",
        "trait_item" => "trait",
        "mod_item" => "module",
        "impl_item" => "impl",
        "const_item" => "const",
        "static_item" => "static",
        "type_item" => "type",
        "macro_definition" => "macro",
        _ => return None,
    })
}

/// Scope segment for a documented node: items, fields and enum variants.
fn item_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    if node.kind() == "impl_item" {
        let ty = node.child_by_field_name("type")?;
        return Some(match node.child_by_field_name("trait") {
            Some(tr) => format!("impl {} for {}", node_text(tr, source), node_text(ty, source)),
            None => format!("impl {}", node_text(ty, source)),
        });
    }
    node.child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
}

fn scope_key(scope: &[String]) -> String {
    if scope.is_empty() {
        MODULE_SCOPE.to_string()
    } else {
        scope.join("::")
    }
}

fn append_doc(meta: &mut SourceMetadata, key: String, text: &str) {
    meta.docs
        .entry(key)
        .and_modify(|d| {
            d.push('\n');
            d.push_str(text);
        })
        .or_insert_with(|| text.to_string());
}

/// The item an outer doc at `children[i]` documents.
fn documented_item<'t>(children: &[Node<'t>], i: usize) -> Option<Node<'t>> {
    children[i + 1..]
        .iter()
        .copied()
        .find(|n| !matches!(n.kind(), "line_comment" | "block_comment" | "attribute_item"))
}

fn visit(node: Node<'_>, source: &[u8], scope: &mut Vec<String>, meta: &mut SourceMetadata) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for (i, child) in children.iter().copied().enumerate() {
        match child.kind() {
            "line_comment" | "block_comment" => {
                let text = node_text(child, source).trim();
                match doc_kind(text) {
                    Some(DocKind::Inner) => append_doc(meta, scope_key(scope), text),
                    Some(DocKind::Outer) => {
                        let key = documented_item(&children, i)
                            .and_then(|item| item_name(item, source))
                            .map(|name| {
                                let mut path = scope.clone();
                                path.push(name);
                                scope_key(&path)
                            })
                            .unwrap_or_else(|| scope_key(scope));
                        append_doc(meta, key, text);
                    }
                    None => meta.comments.push(CommentLine {
                        line: line_of(child),
                        text: text.to_string(),
                    }),
                }
            }
            "attribute_item" | "inner_attribute_item" if is_doc_attribute(child, source) => {
                let text = node_text(child, source).trim();
                let key = if child.kind() == "inner_attribute_item" {
                    scope_key(scope)
                } else {
                    documented_item(&children, i)
                        .and_then(|item| item_name(item, source))
                        .map(|name| {
                            let mut path = scope.clone();
                            path.push(name);
                            scope_key(&path)
                        })
                        .unwrap_or_else(|| scope_key(scope))
                };
                append_doc(meta, key, text);
            }
            _ => match item_name(child, source).filter(|_| is_scope(child)) {
                Some(name) => {
                    scope.push(name);
                    visit(child, source, scope, meta);
                    scope.pop();
                }
                None => visit(child, source, scope, meta),
            },
        }
    }
}

/// Nodes whose children are documented relative to them.
fn is_scope(node: Node<'_>) -> bool {
    item_kind(node.kind()).is_some() || matches!(node.kind(), "field_declaration" | "enum_variant")
}

fn collect_symbols(node: Node<'_>, source: &[u8], scope: &mut Vec<String>, out: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        let Some(kind) = item_kind(child.kind()) else {
            collect_symbols(child, source, scope, out);
            continue;
        };
        let Some(name) = item_name(child, source) else {
            collect_symbols(child, source, scope, out);
            continue;
        };
        scope.push(name);
        out.push(Symbol {
            name: scope.join("::"),
            kind: kind.to_string(),
            line: line_of(child),
        });
        collect_symbols(child, source, scope, out);
        scope.pop();
    }
}
