//! Shared AST services.
//!
//! A small toolkit the detectors build on: byte-offset to line mapping,
//! node-to-source slicing, name extraction from reference shapes, docstring
//! lookup, identifier tokenization, and the statement/expression walkers.
//! Keeping these here localizes drift in the Python AST shape (for example,
//! the historical split between string and constant literal nodes).

use std::collections::HashSet;

use rustpython_ast::text_size::TextRange;
use rustpython_parser::ast;
use rustpython_parser::ast::Ranged;

/// Maps byte offsets in a source text to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build an index over the given source text.
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line number containing the byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// Inclusive (start, end) line numbers covered by a node range.
    pub fn range_lines(&self, range: TextRange) -> (usize, usize) {
        let start = range.start().to_usize();
        let end = range.end().to_usize();
        let start_line = self.line_of(start);
        let end_line = self.line_of(end.saturating_sub(1).max(start));
        (start_line, end_line)
    }

    /// 1-based line of a node's first byte.
    pub fn node_line(&self, node: &impl Ranged) -> usize {
        self.line_of(node.range().start().to_usize())
    }
}

/// Raw source text for a node range, sliced on its start/end lines.
pub fn node_source(range: TextRange, content: &str, lines: &LineIndex) -> String {
    let (start_line, end_line) = lines.range_lines(range);
    slice_lines(content, start_line, end_line)
}

/// Join the inclusive 1-based line range of `content`.
pub fn slice_lines(content: &str, start_line: usize, end_line: usize) -> String {
    content
        .lines()
        .skip(start_line.saturating_sub(1))
        .take(end_line.saturating_sub(start_line) + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the trailing name from a reference-shaped expression.
///
/// `Name` yields its identifier, attribute access yields the final
/// attribute, and subscripted generics (`List[int]`) yield the name of the
/// subscripted value. Any other shape yields `None`.
pub fn name_of(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Name(name) => Some(name.id.to_string()),
        ast::Expr::Attribute(attr) => Some(attr.attr.to_string()),
        ast::Expr::Subscript(sub) => name_of(&sub.value),
        _ => None,
    }
}

/// Name carried by a type annotation, `"unknown"` when absent or opaque.
///
/// String-literal annotations (`"User"`) resolve to their contents.
pub fn annotation_name(annotation: Option<&ast::Expr>) -> String {
    match annotation {
        Some(ast::Expr::Constant(constant)) => match &constant.value {
            ast::Constant::Str(value) => value.clone(),
            _ => "unknown".to_string(),
        },
        Some(expr) => name_of(expr).unwrap_or_else(|| "unknown".to_string()),
        None => "unknown".to_string(),
    }
}

/// First string-literal expression of a class or function body, if present.
pub fn docstring(body: &[ast::Stmt]) -> Option<&str> {
    match body.first() {
        Some(ast::Stmt::Expr(expr)) => match expr.value.as_ref() {
            ast::Expr::Constant(constant) => match &constant.value {
                ast::Constant::Str(value) => Some(value.as_str()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Lowercased identifier-shaped tokens (`[a-zA-Z][a-zA-Z0-9_]*`) in a text.
pub fn identifier_tokens(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let mut current = String::new();
    for ch in text.chars() {
        let extends = !current.is_empty() && (ch.is_ascii_alphanumeric() || ch == '_');
        let starts = current.is_empty() && ch.is_ascii_alphabetic();
        if starts || extends {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.insert(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.insert(current);
    }
    tokens
}

/// A function or method definition, independent of its async flavor.
#[derive(Debug, Clone, Copy)]
pub struct FuncDef<'a> {
    /// Function name.
    pub name: &'a str,
    /// Argument list.
    pub args: &'a ast::Arguments,
    /// Body statements.
    pub body: &'a [ast::Stmt],
    /// Decorator expressions.
    pub decorators: &'a [ast::Expr],
    /// Return annotation.
    pub returns: Option<&'a ast::Expr>,
    /// Byte range of the whole definition.
    pub range: TextRange,
}

impl<'a> FuncDef<'a> {
    /// View a statement as a function definition, if it is one.
    pub fn cast(stmt: &'a ast::Stmt) -> Option<Self> {
        match stmt {
            ast::Stmt::FunctionDef(def) => Some(Self {
                name: def.name.as_str(),
                args: &def.args,
                body: &def.body,
                decorators: &def.decorator_list,
                returns: def.returns.as_deref(),
                range: def.range(),
            }),
            ast::Stmt::AsyncFunctionDef(def) => Some(Self {
                name: def.name.as_str(),
                args: &def.args,
                body: &def.body,
                decorators: &def.decorator_list,
                returns: def.returns.as_deref(),
                range: def.range(),
            }),
            _ => None,
        }
    }

    /// Positional parameter count (positional-only plus regular).
    pub fn parameter_count(&self) -> usize {
        self.args.posonlyargs.len() + self.args.args.len()
    }

    /// Annotation name per positional parameter, `"unknown"` when missing.
    pub fn parameter_annotations(&self) -> Vec<String> {
        self.args
            .posonlyargs
            .iter()
            .chain(self.args.args.iter())
            .map(|arg| annotation_name(arg.def.annotation.as_deref()))
            .collect()
    }

    /// True for `__dunder__` methods.
    pub fn is_special(&self) -> bool {
        self.name.starts_with("__") && self.name.ends_with("__")
    }
}

/// Function definitions in a class's direct body, in declaration order.
pub fn class_methods<'a>(class: &'a ast::StmtClassDef) -> Vec<FuncDef<'a>> {
    class.body.iter().filter_map(FuncDef::cast).collect()
}

/// Class definitions anywhere in a suite, in preorder.
pub fn collect_classes(body: &[ast::Stmt]) -> Vec<&ast::StmtClassDef> {
    let mut classes = Vec::new();
    walk_stmts(body, &mut |stmt| {
        if let ast::Stmt::ClassDef(class) = stmt {
            classes.push(class);
        }
    });
    classes
}

/// Function definitions anywhere in a suite, in preorder.
pub fn collect_functions(body: &[ast::Stmt]) -> Vec<FuncDef<'_>> {
    let mut functions = Vec::new();
    walk_stmts(body, &mut |stmt| {
        if let Some(func) = FuncDef::cast(stmt) {
            functions.push(func);
        }
    });
    functions
}

/// Preorder traversal over every statement in a suite, nested suites included.
pub fn walk_stmts<'a>(body: &'a [ast::Stmt], visit: &mut dyn FnMut(&'a ast::Stmt)) {
    for stmt in body {
        visit(stmt);
        for suite in child_suites(stmt) {
            walk_stmts(suite, visit);
        }
    }
}

/// Nested statement suites directly owned by a statement.
pub fn child_suites<'a>(stmt: &'a ast::Stmt) -> Vec<&'a [ast::Stmt]> {
    match stmt {
        ast::Stmt::FunctionDef(def) => vec![&def.body],
        ast::Stmt::AsyncFunctionDef(def) => vec![&def.body],
        ast::Stmt::ClassDef(def) => vec![&def.body],
        ast::Stmt::For(stmt) => vec![&stmt.body, &stmt.orelse],
        ast::Stmt::AsyncFor(stmt) => vec![&stmt.body, &stmt.orelse],
        ast::Stmt::While(stmt) => vec![&stmt.body, &stmt.orelse],
        ast::Stmt::If(stmt) => vec![&stmt.body, &stmt.orelse],
        ast::Stmt::With(stmt) => vec![&stmt.body],
        ast::Stmt::AsyncWith(stmt) => vec![&stmt.body],
        ast::Stmt::Try(stmt) => {
            let mut suites: Vec<&[ast::Stmt]> = vec![&stmt.body];
            for handler in &stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                suites.push(&handler.body);
            }
            suites.push(&stmt.orelse);
            suites.push(&stmt.finalbody);
            suites
        }
        ast::Stmt::TryStar(stmt) => {
            let mut suites: Vec<&[ast::Stmt]> = vec![&stmt.body];
            for handler in &stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                suites.push(&handler.body);
            }
            suites.push(&stmt.orelse);
            suites.push(&stmt.finalbody);
            suites
        }
        ast::Stmt::Match(stmt) => stmt.cases.iter().map(|case| case.body.as_slice()).collect(),
        _ => Vec::new(),
    }
}

/// Expressions directly owned by a statement (nested suites excluded).
pub fn own_exprs<'a>(stmt: &'a ast::Stmt) -> Vec<&'a ast::Expr> {
    let mut exprs: Vec<&ast::Expr> = Vec::new();
    match stmt {
        ast::Stmt::FunctionDef(def) => {
            exprs.extend(def.decorator_list.iter());
            exprs.extend(def.returns.as_deref());
            collect_argument_exprs(&def.args, &mut exprs);
        }
        ast::Stmt::AsyncFunctionDef(def) => {
            exprs.extend(def.decorator_list.iter());
            exprs.extend(def.returns.as_deref());
            collect_argument_exprs(&def.args, &mut exprs);
        }
        ast::Stmt::ClassDef(def) => {
            exprs.extend(def.bases.iter());
            exprs.extend(def.keywords.iter().map(|kw| &kw.value));
            exprs.extend(def.decorator_list.iter());
        }
        ast::Stmt::Return(stmt) => exprs.extend(stmt.value.as_deref()),
        ast::Stmt::Delete(stmt) => exprs.extend(stmt.targets.iter()),
        ast::Stmt::Assign(stmt) => {
            exprs.extend(stmt.targets.iter());
            exprs.push(&stmt.value);
        }
        ast::Stmt::AugAssign(stmt) => {
            exprs.push(&stmt.target);
            exprs.push(&stmt.value);
        }
        ast::Stmt::AnnAssign(stmt) => {
            exprs.push(&stmt.target);
            exprs.push(&stmt.annotation);
            exprs.extend(stmt.value.as_deref());
        }
        ast::Stmt::For(stmt) => {
            exprs.push(&stmt.target);
            exprs.push(&stmt.iter);
        }
        ast::Stmt::AsyncFor(stmt) => {
            exprs.push(&stmt.target);
            exprs.push(&stmt.iter);
        }
        ast::Stmt::While(stmt) => exprs.push(&stmt.test),
        ast::Stmt::If(stmt) => exprs.push(&stmt.test),
        ast::Stmt::With(stmt) => {
            for item in &stmt.items {
                exprs.push(&item.context_expr);
                exprs.extend(item.optional_vars.as_deref());
            }
        }
        ast::Stmt::AsyncWith(stmt) => {
            for item in &stmt.items {
                exprs.push(&item.context_expr);
                exprs.extend(item.optional_vars.as_deref());
            }
        }
        ast::Stmt::Match(stmt) => exprs.push(&stmt.subject),
        ast::Stmt::Raise(stmt) => {
            exprs.extend(stmt.exc.as_deref());
            exprs.extend(stmt.cause.as_deref());
        }
        ast::Stmt::Assert(stmt) => {
            exprs.push(&stmt.test);
            exprs.extend(stmt.msg.as_deref());
        }
        ast::Stmt::Expr(stmt) => exprs.push(&stmt.value),
        _ => {}
    }
    exprs
}

fn collect_argument_exprs<'a>(args: &'a ast::Arguments, exprs: &mut Vec<&'a ast::Expr>) {
    for arg in args
        .posonlyargs
        .iter()
        .chain(args.args.iter())
        .chain(args.kwonlyargs.iter())
    {
        exprs.extend(arg.def.annotation.as_deref());
        exprs.extend(arg.default.as_deref());
    }
    if let Some(vararg) = &args.vararg {
        exprs.extend(vararg.annotation.as_deref());
    }
    if let Some(kwarg) = &args.kwarg {
        exprs.extend(kwarg.annotation.as_deref());
    }
}

/// Preorder traversal over an expression and every subexpression.
pub fn walk_exprs<'a>(expr: &'a ast::Expr, visit: &mut dyn FnMut(&'a ast::Expr)) {
    visit(expr);
    match expr {
        ast::Expr::BoolOp(e) => e.values.iter().for_each(|v| walk_exprs(v, visit)),
        ast::Expr::NamedExpr(e) => {
            walk_exprs(&e.target, visit);
            walk_exprs(&e.value, visit);
        }
        ast::Expr::BinOp(e) => {
            walk_exprs(&e.left, visit);
            walk_exprs(&e.right, visit);
        }
        ast::Expr::UnaryOp(e) => walk_exprs(&e.operand, visit),
        ast::Expr::Lambda(e) => walk_exprs(&e.body, visit),
        ast::Expr::IfExp(e) => {
            walk_exprs(&e.test, visit);
            walk_exprs(&e.body, visit);
            walk_exprs(&e.orelse, visit);
        }
        ast::Expr::Dict(e) => {
            e.keys.iter().flatten().for_each(|k| walk_exprs(k, visit));
            e.values.iter().for_each(|v| walk_exprs(v, visit));
        }
        ast::Expr::Set(e) => e.elts.iter().for_each(|v| walk_exprs(v, visit)),
        ast::Expr::ListComp(e) => {
            walk_exprs(&e.elt, visit);
            walk_comprehensions(&e.generators, visit);
        }
        ast::Expr::SetComp(e) => {
            walk_exprs(&e.elt, visit);
            walk_comprehensions(&e.generators, visit);
        }
        ast::Expr::DictComp(e) => {
            walk_exprs(&e.key, visit);
            walk_exprs(&e.value, visit);
            walk_comprehensions(&e.generators, visit);
        }
        ast::Expr::GeneratorExp(e) => {
            walk_exprs(&e.elt, visit);
            walk_comprehensions(&e.generators, visit);
        }
        ast::Expr::Await(e) => walk_exprs(&e.value, visit),
        ast::Expr::Yield(e) => {
            if let Some(value) = &e.value {
                walk_exprs(value, visit);
            }
        }
        ast::Expr::YieldFrom(e) => walk_exprs(&e.value, visit),
        ast::Expr::Compare(e) => {
            walk_exprs(&e.left, visit);
            e.comparators.iter().for_each(|c| walk_exprs(c, visit));
        }
        ast::Expr::Call(e) => {
            walk_exprs(&e.func, visit);
            e.args.iter().for_each(|a| walk_exprs(a, visit));
            e.keywords.iter().for_each(|k| walk_exprs(&k.value, visit));
        }
        ast::Expr::FormattedValue(e) => {
            walk_exprs(&e.value, visit);
            if let Some(spec) = &e.format_spec {
                walk_exprs(spec, visit);
            }
        }
        ast::Expr::JoinedStr(e) => e.values.iter().for_each(|v| walk_exprs(v, visit)),
        ast::Expr::Attribute(e) => walk_exprs(&e.value, visit),
        ast::Expr::Subscript(e) => {
            walk_exprs(&e.value, visit);
            walk_exprs(&e.slice, visit);
        }
        ast::Expr::Starred(e) => walk_exprs(&e.value, visit),
        ast::Expr::List(e) => e.elts.iter().for_each(|v| walk_exprs(v, visit)),
        ast::Expr::Tuple(e) => e.elts.iter().for_each(|v| walk_exprs(v, visit)),
        ast::Expr::Slice(e) => {
            for bound in [&e.lower, &e.upper, &e.step].into_iter().flatten() {
                walk_exprs(bound, visit);
            }
        }
        _ => {}
    }
}

fn walk_comprehensions<'a>(
    generators: &'a [ast::Comprehension],
    visit: &mut dyn FnMut(&'a ast::Expr),
) {
    for generator in generators {
        walk_exprs(&generator.target, visit);
        walk_exprs(&generator.iter, visit);
        generator.ifs.iter().for_each(|i| walk_exprs(i, visit));
    }
}

/// Visit every expression anywhere under a suite, nested statements included.
pub fn walk_exprs_in_stmts<'a>(body: &'a [ast::Stmt], visit: &mut dyn FnMut(&'a ast::Expr)) {
    walk_stmts(body, &mut |stmt| {
        for expr in own_exprs(stmt) {
            walk_exprs(expr, visit);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn suite(source: &str) -> Vec<ast::Stmt> {
        crate::lang::python::parse_source(source, Path::new("t.py")).unwrap()
    }

    #[test]
    fn test_line_index_maps_offsets() {
        let content = "a = 1\nb = 2\nc = 3\n";
        let lines = LineIndex::new(content);
        assert_eq!(lines.line_of(0), 1);
        assert_eq!(lines.line_of(6), 2);
        assert_eq!(lines.line_of(13), 3);
    }

    #[test]
    fn test_node_source_slices_whole_lines() {
        let content = "def f():\n    return 1\n\nx = 2\n";
        let body = suite(content);
        let lines = LineIndex::new(content);
        let source = node_source(body[0].range(), content, &lines);
        assert_eq!(source, "def f():\n    return 1");
    }

    #[test]
    fn test_name_of_reference_shapes() {
        let body = suite("a\nb.c\nList[int]\n1 + 2\n");
        let exprs: Vec<_> = body
            .iter()
            .map(|stmt| match stmt {
                ast::Stmt::Expr(e) => e.value.as_ref(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(name_of(exprs[0]).as_deref(), Some("a"));
        assert_eq!(name_of(exprs[1]).as_deref(), Some("c"));
        assert_eq!(name_of(exprs[2]).as_deref(), Some("List"));
        assert_eq!(name_of(exprs[3]), None);
    }

    #[test]
    fn test_docstring_extraction() {
        let body = suite("class C:\n    \"\"\"Summary.\"\"\"\n    x = 1\n");
        let ast::Stmt::ClassDef(class) = &body[0] else {
            panic!("expected class")
        };
        assert_eq!(docstring(&class.body), Some("Summary."));
        assert_eq!(docstring(&class.body[1..]), None);
    }

    #[test]
    fn test_identifier_tokens_are_lowercased_words() {
        let tokens = identifier_tokens("Load_Data(self, 9lives) -> UserRepo");
        assert!(tokens.contains("load_data"));
        assert!(tokens.contains("userrepo"));
        assert!(tokens.contains("self"));
        // Tokens must start with a letter.
        assert!(!tokens.contains("9lives"));
        assert!(tokens.contains("lives"));
    }

    #[test]
    fn test_walkers_reach_nested_statements_and_expressions() {
        let body = suite(
            "def outer():\n    if a and b:\n        for i in items:\n            use(i)\n",
        );
        let mut stmt_count = 0;
        walk_stmts(&body, &mut |_| stmt_count += 1);
        // outer, if, for, expression statement
        assert_eq!(stmt_count, 4);

        let mut call_count = 0;
        walk_exprs_in_stmts(&body, &mut |expr| {
            if matches!(expr, ast::Expr::Call(_)) {
                call_count += 1;
            }
        });
        assert_eq!(call_count, 1);
    }

    #[test]
    fn test_func_def_cast_and_parameters() {
        let body = suite("async def fetch(self, url: str, retries: int = 3) -> bytes:\n    pass\n");
        let func = FuncDef::cast(&body[0]).expect("async def is a function");
        assert_eq!(func.name, "fetch");
        assert_eq!(func.parameter_count(), 3);
        assert_eq!(
            func.parameter_annotations(),
            vec!["unknown".to_string(), "str".to_string(), "int".to_string()]
        );
        assert!(!func.is_special());
    }
}
