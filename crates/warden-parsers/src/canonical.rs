//! Canonical serialization of syntax trees.
//!
//! A canonical form is the tree with every non-semantic node removed and all
//! positions dropped, written as an s-expression. Two sources with equal
//! canonical forms differ only in comments, documentation, or layout.

use tree_sitter::Node;

use crate::grammar::SourceGrammar;
use crate::treesitter::{node_text, ParseError, TreeSitterParser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm {
    pub text: String,
    pub digest: String,
}

/// Parse `source` and serialize its stripped tree.
pub fn canonicalize(grammar: &dyn SourceGrammar, source: &str) -> Result<CanonicalForm, ParseError> {
    let mut parser = TreeSitterParser::new();
    let tree = parser.parse(grammar, source)?;
    Ok(canonicalize_node(grammar, tree.root_node(), source.as_bytes()))
}

/// Serialize an already-parsed tree.
pub fn canonicalize_node(grammar: &dyn SourceGrammar, root: Node<'_>, source: &[u8]) -> CanonicalForm {
    let mut text = String::with_capacity(source.len());
    write_node(grammar, root, source, &mut text);
    let digest = warden_core::hash::digest(&text);
    CanonicalForm { text, digest }
}

/// Outcome of comparing two versions of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub original: CanonicalForm,
    pub modified: CanonicalForm,
}

impl Comparison {
    pub fn semantics_preserved(&self) -> bool {
        self.original.text == self.modified.text
    }
}

/// Canonicalize both versions. Fails if either side does not parse.
pub fn compare(
    grammar: &dyn SourceGrammar,
    original: &str,
    modified: &str,
) -> Result<Comparison, CompareError> {
    let original = canonicalize(grammar, original).map_err(CompareError::Original)?;
    let modified = canonicalize(grammar, modified).map_err(CompareError::Modified)?;
    Ok(Comparison { original, modified })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("original version: {0}")]
    Original(ParseError),
    #[error("modified version: {0}")]
    Modified(ParseError),
}

fn write_node(grammar: &dyn SourceGrammar, node: Node<'_>, source: &[u8], out: &mut String) {
    if grammar.is_non_semantic(node, source) {
        return;
    }
    if node.child_count() == 0 {
        if node.is_named() {
            out.push_str(node.kind());
            out.push('=');
            push_escaped(out, node_text(node, source));
        } else {
            out.push('\'');
            push_escaped(out, node.kind());
            out.push('\'');
        }
        out.push(' ');
        return;
    }
    out.push('(');
    out.push_str(node.kind());
    out.push(' ');
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        write_node(grammar, child, source, out);
    }
    out.push_str(") ");
}

fn push_escaped(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
}
