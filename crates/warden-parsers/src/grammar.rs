use tree_sitter::{Language, Node};

use crate::metadata::SourceMetadata;

/// A symbol found while indexing a file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    /// Scope-qualified name, e.g. `Service.handle`.
    pub name: String,
    pub kind: String,
    pub line: u32,
}

/// The language-specific half of canonicalization.
///
/// What counts as documentation or positional metadata differs per managed
/// language; the comparison itself does not. Implementations decide which
/// nodes carry no executable meaning and how documentation maps to scopes.
pub trait SourceGrammar: Send + Sync {
    fn name(&self) -> &'static str;

    fn language(&self) -> Language;

    /// True for nodes stripped before canonicalization: comments,
    /// documentation, and layout-only tokens.
    fn is_non_semantic(&self, node: Node<'_>, source: &[u8]) -> bool;

    /// Collect comment lines (excluding documentation) and documentation
    /// text keyed by the scope it documents.
    fn collect_metadata(&self, root: Node<'_>, source: &[u8]) -> SourceMetadata;

    /// Named definitions in the file, scope-qualified.
    fn symbols(&self, root: Node<'_>, source: &[u8]) -> Vec<Symbol>;
}
