//! Heuristic classification of classes as abstractions.
//!
//! Several analyzers need to decide whether a class is meant to be subclassed
//! rather than instantiated. The signals, strongest first: ABC-style base
//! classes, `abstractmethod` decorators, an all-empty method body shape, and
//! finally naming conventions. The predicate lives here so every consumer
//! applies the same rule.

use rustpython_parser::ast;

use crate::lang::ast_utils::{class_methods, name_of, FuncDef};

/// Base-class and decorator names treated as abstract markers.
const ABSTRACT_BASES: [&str; 3] = ["ABC", "Interface", "Abstract"];

/// True when the class reads as an abstraction (interface or abstract class).
pub fn is_abstraction(class: &ast::StmtClassDef) -> bool {
    if has_abstract_base(class) || has_abstract_method(class) {
        return true;
    }

    // A class whose every method body is `pass` or a bare docstring is an
    // interface in all but name.
    let methods = class_methods(class);
    if !methods.is_empty() && methods.iter().all(|m| is_empty_body(m.body)) {
        return true;
    }

    // Naming conventions are the weakest signal; checked last.
    follows_interface_naming(class.name.as_str())
}

/// True when any base class is a known abstract marker, directly or through
/// a dotted attribute (`abc.ABC`).
fn has_abstract_base(class: &ast::StmtClassDef) -> bool {
    class.bases.iter().any(|base| {
        name_of(base).is_some_and(|name| ABSTRACT_BASES.contains(&name.as_str()))
    })
}

/// True when any direct method carries an `abstractmethod` decorator,
/// directly or attributed (`abc.abstractmethod`).
fn has_abstract_method(class: &ast::StmtClassDef) -> bool {
    class_methods(class).iter().any(|method| {
        method
            .decorators
            .iter()
            .any(|dec| name_of(dec).as_deref() == Some("abstractmethod"))
    })
}

/// True for a body containing only `pass` and/or a docstring.
fn is_empty_body(body: &[ast::Stmt]) -> bool {
    body.iter().all(|stmt| match stmt {
        ast::Stmt::Pass(_) => true,
        ast::Stmt::Expr(expr) => matches!(
            expr.value.as_ref(),
            ast::Expr::Constant(constant) if matches!(constant.value, ast::Constant::Str(_))
        ),
        _ => false,
    })
}

/// `IThing`, `FooInterface`, `AbstractBar` style names.
fn follows_interface_naming(name: &str) -> bool {
    let i_prefixed = name.len() > 1
        && name.starts_with('I')
        && name.chars().nth(1).is_some_and(|c| c.is_ascii_uppercase());
    i_prefixed || name.contains("Interface") || name.contains("Abstract")
}

/// Names of the interface's methods, taken from the class's direct body.
pub fn interface_methods<'a>(class: &'a ast::StmtClassDef) -> Vec<FuncDef<'a>> {
    class_methods(class)
}
