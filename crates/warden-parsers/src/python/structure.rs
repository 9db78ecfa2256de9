//! Structural queries over a parsed Python module: call sites, module-level
//! side effects, decorator usage, imports, and definition sizes.

use serde::Serialize;
use tree_sitter::{Node, Tree};

use super::{is_docstring, statements, PythonGrammar};
use crate::treesitter::{line_of, node_text, ParseError, TreeSitterParser};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Callee as written, whitespace removed (`os.system`, `eval`).
    pub name: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideEffect {
    /// Statement kind, e.g. `call`, `for_statement`.
    pub kind: String,
    pub line: u32,
    /// First line of the offending statement.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratorUse {
    pub name: String,
    pub keywords: Vec<String>,
    pub positional: usize,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratedDefinition {
    pub name: String,
    pub line: u32,
    pub decorators: Vec<DecoratorUse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRef {
    pub module: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionSpan {
    pub name: String,
    /// `function` or `class`.
    pub kind: &'static str,
    pub line: u32,
    pub lines: u32,
}

/// A parsed Python module ready for structural queries.
pub struct PythonModule {
    tree: Tree,
    source: String,
}

impl PythonModule {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let mut parser = TreeSitterParser::new();
        let tree = parser.parse(&PythonGrammar, source)?;
        Ok(Self {
            tree,
            source: source.to_string(),
        })
    }

    fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    pub fn line_count(&self) -> u32 {
        self.source.lines().count() as u32
    }

    /// Every call expression in the module, in source order.
    pub fn call_sites(&self) -> Vec<CallSite> {
        let mut out = Vec::new();
        for node in descendants(self.root()) {
            if node.kind() != "call" {
                continue;
            }
            if let Some(func) = node.child_by_field_name("function") {
                out.push(CallSite {
                    name: callee_name(func, self.bytes()),
                    line: line_of(node),
                });
            }
        }
        out
    }

    /// Top-level statements that execute work at import time.
    ///
    /// Declarations (imports, definitions, assignments of non-call values,
    /// docstrings, `pass`) and the `if __name__ == "__main__":` guard are
    /// allowed. A call is allowed when its callee is listed in `allowed_calls`.
    pub fn module_side_effects(&self, allowed_calls: &[String]) -> Vec<SideEffect> {
        let src = self.bytes();
        let mut out = Vec::new();
        for stmt in statements(self.root()) {
            let offending = match stmt.kind() {
                "import_statement"
                | "import_from_statement"
                | "future_import_statement"
                | "function_definition"
                | "class_definition"
                | "decorated_definition"
                | "pass_statement"
                | "type_alias_statement" => None,
                "expression_statement" => expression_side_effect(stmt, src, allowed_calls),
                "if_statement" if is_main_guard(stmt, src) => None,
                "try_statement" if only_declarations(stmt) => None,
                other => Some(other.to_string()),
            };
            if let Some(kind) = offending {
                out.push(SideEffect {
                    kind,
                    line: line_of(stmt),
                    text: first_line(node_text(stmt, src)),
                });
            }
        }
        out
    }

    /// Functions and classes carrying at least one decorator.
    pub fn decorated_definitions(&self) -> Vec<DecoratedDefinition> {
        let src = self.bytes();
        let mut out = Vec::new();
        walk_definitions(self.root(), src, &mut Vec::new(), &mut |def, name| {
            let Some(parent) = def.parent().filter(|p| p.kind() == "decorated_definition") else {
                return;
            };
            let mut cursor = parent.walk();
            let decorators = parent
                .children(&mut cursor)
                .filter(|c| c.kind() == "decorator")
                .map(|d| decorator_use(d, src))
                .collect();
            out.push(DecoratedDefinition {
                name: name.to_string(),
                line: line_of(def),
                decorators,
            });
        });
        out
    }

    /// Imported module names, including relative (`.sibling`) and nested imports.
    pub fn imports(&self) -> Vec<ImportRef> {
        let src = self.bytes();
        let mut out = Vec::new();
        for node in descendants(self.root()) {
            match node.kind() {
                "import_statement" => {
                    let mut cursor = node.walk();
                    for name in node.children_by_field_name("name", &mut cursor) {
                        let module = match name.kind() {
                            "aliased_import" => name.child_by_field_name("name").unwrap_or(name),
                            _ => name,
                        };
                        out.push(ImportRef {
                            module: node_text(module, src).to_string(),
                            line: line_of(node),
                        });
                    }
                }
                "import_from_statement" => {
                    if let Some(module) = node.child_by_field_name("module_name") {
                        out.push(ImportRef {
                            module: node_text(module, src).to_string(),
                            line: line_of(node),
                        });
                    }
                }
                "future_import_statement" => out.push(ImportRef {
                    module: "__future__".to_string(),
                    line: line_of(node),
                }),
                _ => {}
            }
        }
        out
    }

    /// Size of every function and class, scope-qualified.
    pub fn definition_spans(&self) -> Vec<DefinitionSpan> {
        let mut out = Vec::new();
        walk_definitions(self.root(), self.bytes(), &mut Vec::new(), &mut |def, name| {
            let kind = if def.kind() == "class_definition" {
                "class"
            } else {
                "function"
            };
            out.push(DefinitionSpan {
                name: name.to_string(),
                kind,
                line: line_of(def),
                lines: (def.end_position().row - def.start_position().row + 1) as u32,
            });
        });
        out
    }
}

/// Pre-order traversal of every node below (and including) `root`.
fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

fn walk_definitions<'t>(
    node: Node<'t>,
    src: &[u8],
    scope: &mut Vec<String>,
    f: &mut dyn FnMut(Node<'t>, &str),
) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        if matches!(child.kind(), "function_definition" | "class_definition") {
            let name = child
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            scope.push(name);
            f(child, &scope.join("."));
            walk_definitions(child, src, scope, f);
            scope.pop();
        } else {
            walk_definitions(child, src, scope, f);
        }
    }
}

fn callee_name(func: Node<'_>, src: &[u8]) -> String {
    node_text(func, src).split_whitespace().collect()
}

fn expression_side_effect(stmt: Node<'_>, src: &[u8], allowed: &[String]) -> Option<String> {
    if is_docstring(stmt) {
        return None;
    }
    let expr = statements(stmt).into_iter().next()?;
    let value = match expr.kind() {
        "assignment" => expr.child_by_field_name("right")?,
        "augmented_assignment" => return Some(expr.kind().to_string()),
        _ => expr,
    };
    let call = match value.kind() {
        "call" => value,
        "await" => return Some("await".to_string()),
        _ => return None,
    };
    let name = call
        .child_by_field_name("function")
        .map(|f| callee_name(f, src))
        .unwrap_or_default();
    if allowed.iter().any(|a| *a == name) {
        None
    } else {
        Some("call".to_string())
    }
}

fn is_main_guard(stmt: Node<'_>, src: &[u8]) -> bool {
    let Some(cond) = stmt.child_by_field_name("condition") else {
        return false;
    };
    let text: String = node_text(cond, src)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '"' } else { c })
        .collect();
    text == "__name__==\"__main__\"" || text == "\"__main__\"==__name__"
}

/// A `try` whose every branch only imports, assigns, or passes.
fn only_declarations(stmt: Node<'_>) -> bool {
    descendants(stmt)
        .into_iter()
        .filter(|n| n.kind() == "block")
        .flat_map(statements)
        .all(|s| match s.kind() {
            "import_statement" | "import_from_statement" | "pass_statement" => true,
            "expression_statement" => statements(s)
                .first()
                .is_some_and(|e| e.kind() == "assignment" && !has_call_value(*e)),
            _ => false,
        })
}

fn has_call_value(assignment: Node<'_>) -> bool {
    assignment
        .child_by_field_name("right")
        .is_some_and(|r| r.kind() == "call")
}

fn decorator_use(decorator: Node<'_>, src: &[u8]) -> DecoratorUse {
    let expr = statements(decorator).into_iter().next();
    let mut use_ = DecoratorUse {
        name: String::new(),
        keywords: Vec::new(),
        positional: 0,
        line: line_of(decorator),
    };
    let Some(expr) = expr else {
        return use_;
    };
    if expr.kind() != "call" {
        use_.name = callee_name(expr, src);
        return use_;
    }
    if let Some(func) = expr.child_by_field_name("function") {
        use_.name = callee_name(func, src);
    }
    if let Some(args) = expr.child_by_field_name("arguments") {
        for arg in statements(args) {
            if arg.kind() == "keyword_argument" {
                if let Some(name) = arg.child_by_field_name("name") {
                    use_.keywords.push(node_text(name, src).to_string());
                }
            } else {
                use_.positional += 1;
            }
        }
    }
    use_
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").trim_end().to_string()
}
