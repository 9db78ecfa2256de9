//! Comment and documentation extraction, and the diff between two versions.
//!
//! Once a change is proven to preserve semantics, the remaining edits are
//! classified into categories so policy can cap which kinds are permitted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::grammar::SourceGrammar;
use crate::treesitter::{ParseError, TreeSitterParser};

/// Scope key used for module-level documentation.
pub const MODULE_SCOPE: &str = "<module>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentLine {
    pub line: u32,
    /// Comment text, trimmed, including its marker (`#`, `//`).
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub comments: Vec<CommentLine>,
    /// Documentation text per scope (`<module>`, `Class`, `Class.method`).
    pub docs: BTreeMap<String, String>,
}

impl SourceMetadata {
    pub fn extract(grammar: &dyn SourceGrammar, source: &str) -> Result<Self, ParseError> {
        let mut parser = TreeSitterParser::new();
        let tree = parser.parse(grammar, source)?;
        Ok(grammar.collect_metadata(tree.root_node(), source.as_bytes()))
    }
}

/// Non-semantic edit categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditCategory {
    CommentInsert,
    CommentDelete,
    CommentReplace,
    DocInsert,
    DocDelete,
    DocReplace,
}

impl EditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditCategory::CommentInsert => "comment_insert",
            EditCategory::CommentDelete => "comment_delete",
            EditCategory::CommentReplace => "comment_replace",
            EditCategory::DocInsert => "doc_insert",
            EditCategory::DocDelete => "doc_delete",
            EditCategory::DocReplace => "doc_replace",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comment_insert" => Some(EditCategory::CommentInsert),
            "comment_delete" => Some(EditCategory::CommentDelete),
            "comment_replace" => Some(EditCategory::CommentReplace),
            "doc_insert" => Some(EditCategory::DocInsert),
            "doc_delete" => Some(EditCategory::DocDelete),
            "doc_replace" => Some(EditCategory::DocReplace),
            _ => None,
        }
    }

    pub fn all() -> [EditCategory; 6] {
        [
            EditCategory::CommentInsert,
            EditCategory::CommentDelete,
            EditCategory::CommentReplace,
            EditCategory::DocInsert,
            EditCategory::DocDelete,
            EditCategory::DocReplace,
        ]
    }
}

impl std::fmt::Display for EditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEdit {
    pub category: EditCategory,
    /// Line in the modified version (original version for deletions).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Scope for doc edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDiff {
    pub edits: Vec<MetadataEdit>,
    /// Comment lines new in the modified version (inserts and replacements).
    pub added_comments: Vec<CommentLine>,
}

impl MetadataDiff {
    pub fn categories(&self) -> BTreeMap<EditCategory, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.edits {
            *counts.entry(e.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Diff comments as multisets of text and docs per scope.
///
/// Comment moves are not edits. When both added and removed comment texts
/// exist they pair up, in line order, as replacements.
pub fn diff_metadata(before: &SourceMetadata, after: &SourceMetadata) -> MetadataDiff {
    let added = multiset_difference(&after.comments, &before.comments);
    let removed = multiset_difference(&before.comments, &after.comments);

    let mut edits = Vec::new();
    let paired = added.len().min(removed.len());
    for c in &added[..paired] {
        edits.push(MetadataEdit {
            category: EditCategory::CommentReplace,
            line: Some(c.line),
            scope: None,
        });
    }
    for c in &added[paired..] {
        edits.push(MetadataEdit {
            category: EditCategory::CommentInsert,
            line: Some(c.line),
            scope: None,
        });
    }
    for c in &removed[paired..] {
        edits.push(MetadataEdit {
            category: EditCategory::CommentDelete,
            line: Some(c.line),
            scope: None,
        });
    }

    for (scope, text) in &after.docs {
        match before.docs.get(scope) {
            None => edits.push(doc_edit(EditCategory::DocInsert, scope)),
            Some(old) if old != text => edits.push(doc_edit(EditCategory::DocReplace, scope)),
            Some(_) => {}
        }
    }
    for scope in before.docs.keys() {
        if !after.docs.contains_key(scope) {
            edits.push(doc_edit(EditCategory::DocDelete, scope));
        }
    }

    MetadataDiff {
        edits,
        added_comments: added,
    }
}

fn doc_edit(category: EditCategory, scope: &str) -> MetadataEdit {
    MetadataEdit {
        category,
        line: None,
        scope: Some(scope.to_string()),
    }
}

/// Comments in `a` whose text occurs more often in `a` than in `b`, in line order.
fn multiset_difference(a: &[CommentLine], b: &[CommentLine]) -> Vec<CommentLine> {
    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for c in b {
        *remaining.entry(c.text.as_str()).or_insert(0) += 1;
    }
    let mut out = Vec::new();
    for c in a {
        match remaining.get_mut(c.text.as_str()) {
            Some(n) if *n > 0 => *n -= 1,
            _ => out.push(c.clone()),
        }
    }
    out
}
