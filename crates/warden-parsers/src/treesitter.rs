use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::grammar::SourceGrammar;
use crate::python::PythonGrammar;
use crate::rust_lang::RustGrammar;

static PYTHON: PythonGrammar = PythonGrammar;
static RUST: RustGrammar = RustGrammar;

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Parse `source` with `grammar`. A tree containing ERROR or MISSING
    /// nodes is rejected: a partial parse cannot prove anything.
    pub fn parse(&mut self, grammar: &dyn SourceGrammar, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .set_language(&grammar.language())
            .map_err(|e| ParseError::Language(format!("{e}")))?;
        let tree = self
            .parser
            .parse(source.as_bytes(), None)
            .ok_or(ParseError::ParseFailed)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax {
                language: grammar.name(),
                line: first_error_line(root),
            });
        }
        Ok(tree)
    }
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("language error: {0}")]
    Language(String),
    #[error("{language} syntax error near line {line}")]
    Syntax { language: &'static str, line: u32 },
    #[error("parse failed")]
    ParseFailed,
}

/// 1-based line of the first ERROR or MISSING node, depth-first.
fn first_error_line(root: Node<'_>) -> u32 {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row as u32 + 1;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).filter(|c| c.has_error()).collect();
        stack.extend(children.into_iter().rev());
    }
    root.start_position().row as u32 + 1
}

/// Look up a grammar by language name.
pub fn grammar_for(name: &str) -> Result<&'static dyn SourceGrammar, ParseError> {
    match name {
        "python" => Ok(&PYTHON),
        "rust" => Ok(&RUST),
        other => Err(ParseError::UnsupportedLanguage(other.to_string())),
    }
}

/// Look up the grammar for a file by extension.
pub fn grammar_for_path(path: &Path) -> Option<&'static dyn SourceGrammar> {
    detect_language(path).and_then(|lang| grammar_for(lang).ok())
}

pub fn detect_language(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "py" | "pyi" => Some("python"),
        "rs" => Some("rust"),
        _ => None,
    }
}

pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}
