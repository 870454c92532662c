//! Built-in helper functions.
//!
//! Resolver bodies may call three helpers without declaring them. Each one
//! referenced by a body is prepended to the body's top-level block as a
//! `const` declaration in its canonical form, in the order listed here.

use gqlx_parser::parse_standalone;
use gqlx_types::ast::{Declarator, Ident, Pattern, Stmt, StmtKind, VarDecl, VarKind};
use gqlx_types::{SourceFile, Span};

use crate::error::{CodegenError, CodegenResult};

/// `either(x, value)`: `value` when `x` is `undefined`, otherwise `x`.
pub const EITHER: &str = "(x, value) => x === undefined ? value : x";

/// `use(x, cb)`: hands an intermediate result to a callback.
pub const USE: &str = "(x, cb) => cb(x)";

/// `cq(url, obj)`: appends the defined entries of `obj` as a query string.
pub const CQ: &str = "(url, obj) => url + (Object.keys(obj).filter(m => obj?.[m] !== undefined && obj?.[m] !== null).length ? `?${Object.keys(obj).filter(m => obj?.[m] !== undefined && obj?.[m] !== null).map(m => `${encodeURIComponent(m)}=${encodeURIComponent(obj[m])}`).join('&')}` : '')";

/// Helper names with their canonical source, in declaration order.
pub const HELPERS: &[(&str, &str)] = &[("either", EITHER), ("use", USE), ("cq", CQ)];

pub fn is_helper(name: &str) -> bool {
    HELPERS.iter().any(|(n, _)| *n == name)
}

/// The canonical source of a helper.
pub fn helper_source(name: &str) -> Option<&'static str> {
    HELPERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, source)| *source)
}

/// Build `const <name> = <canonical form>;`.
pub fn helper_declaration(name: &str) -> CodegenResult<Stmt> {
    let source = helper_source(name)
        .ok_or_else(|| CodegenError::Internal(format!("unknown helper '{name}'")))?;
    let file = SourceFile::new(name, source);
    let init = parse_standalone(&file)
        .map_err(|e| CodegenError::Internal(format!("helper '{name}' does not parse: {e}")))?;
    let span = Span::default();
    let declarator = Declarator {
        target: Pattern::Ident(Ident::new(name, span)),
        init: Some(init),
        span,
    };
    Ok(Stmt::new(
        StmtKind::Var(VarDecl {
            kind: VarKind::Const,
            declarators: vec![declarator],
            span,
        }),
        span,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_helpers_parse() {
        for (name, _) in HELPERS {
            let stmt = helper_declaration(name).unwrap();
            assert!(matches!(stmt.kind, StmtKind::Var(_)));
        }
    }

    #[test]
    fn test_unknown_helper() {
        assert!(helper_declaration("nope").is_err());
        assert!(!is_helper("nope"));
        assert!(is_helper("cq"));
    }
}
