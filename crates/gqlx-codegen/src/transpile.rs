//! Rendering entry points and the generation context.
//!
//! The generator renders a rewritten tree to source text. Names resolve in
//! this order: locally bound names, capabilities (`$api.<name>`), field
//! arguments (`$data.<name>`), and finally the name as written (standard
//! globals, helpers, temporaries).

use gqlx_types::ast::{Block, Expr};
use gqlx_types::Capabilities;
use tracing::debug;

use crate::error::CodegenResult;
use crate::expr::emit_expr;
use crate::rewrite::rewrite;
use crate::scope::Scopes;
use crate::stmt::emit_block;

/// Namespace object through which capabilities are called.
pub const API_NAMESPACE: &str = "$api";

/// Namespace object holding the field arguments.
pub const DATA_NAMESPACE: &str = "$data";

/// State shared by the expression and statement emitters.
pub struct GenContext<'a> {
    capabilities: &'a Capabilities,
    args: &'a [String],
    pub(crate) scopes: Scopes,
}

impl<'a> GenContext<'a> {
    pub fn new(capabilities: &'a Capabilities, args: &'a [String]) -> Self {
        let mut scopes = Scopes::new();
        scopes.push();
        Self {
            capabilities,
            args,
            scopes,
        }
    }

    fn is_argument(&self, name: &str) -> bool {
        self.args.iter().any(|a| a == name)
    }

    /// Resolve an identifier in value position.
    pub fn resolve(&self, name: &str) -> String {
        if self.scopes.contains(name) {
            name.to_string()
        } else if self.capabilities.contains(name) {
            format!("{API_NAMESPACE}.{name}")
        } else if self.is_argument(name) {
            format!("{DATA_NAMESPACE}.{name}")
        } else {
            name.to_string()
        }
    }

    /// Shorthand object keys that name a capability or an argument are
    /// spelled out, since `{ $api.get }` is not valid.
    pub fn expands_shorthand(&self, name: &str) -> bool {
        self.capabilities.contains(name) || self.is_argument(name)
    }
}

/// Render a rewritten top-level block, e.g. `{ return await $api.get('x'); }`.
pub fn transpile(block: &Block, capabilities: &Capabilities, args: &[String]) -> CodegenResult<String> {
    let mut ctx = GenContext::new(capabilities, args);
    let mut out = String::new();
    emit_block(block, &mut ctx, &mut out)?;
    Ok(out)
}

/// Render a single expression.
pub fn transpile_node(expr: &Expr, capabilities: &Capabilities, args: &[String]) -> CodegenResult<String> {
    let mut ctx = GenContext::new(capabilities, args);
    let mut out = String::new();
    emit_expr(expr, &mut ctx, &mut out)?;
    Ok(out)
}

/// Default error boundary around a rendered body: any thrown or rejected
/// value is replaced by one `Error` carrying its serialized description.
pub fn wrap_statements(block: &str) -> String {
    format!(
        "try {block} catch (err) {{ throw new Error(JSON.stringify(err, Object.getOwnPropertyNames(err))); }}"
    )
}

/// A resolver body after rewriting and rendering.
#[derive(Debug, Clone)]
pub struct Generated {
    /// The rewritten top-level block, helpers included.
    pub block: Block,
    /// `block` rendered to source text, without an error boundary.
    pub source: String,
}

/// Rewrite and render one resolver body.
pub fn generate(body: Expr, capabilities: &Capabilities, args: &[String]) -> CodegenResult<Generated> {
    let block = rewrite(body, capabilities, args)?;
    let source = transpile(&block, capabilities, args)?;
    debug!(len = source.len(), "generated resolver source");
    Ok(Generated { block, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_parser::parse_standalone;
    use gqlx_types::SourceFile;

    fn render(src: &str, caps: &Capabilities, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let expr = parse_standalone(&SourceFile::new("t", src)).unwrap();
        transpile_node(&expr, caps, &args).unwrap()
    }

    #[test]
    fn test_simple_addition() {
        assert_eq!(render("a + b", &Capabilities::new(), &["a"]), "($data.a + b)");
    }

    #[test]
    fn test_function_call() {
        assert_eq!(render("f(a, 10)", &Capabilities::new(), &["a"]), "f($data.a, 10)");
    }

    #[test]
    fn test_capability_wins_over_argument() {
        let caps = Capabilities::new().sync("get");
        assert_eq!(render("get", &caps, &["get"]), "$api.get");
    }

    #[test]
    fn test_wrap_statements() {
        assert_eq!(
            wrap_statements("{ return 1; }"),
            "try { return 1; } catch (err) { throw new Error(JSON.stringify(err, Object.getOwnPropertyNames(err))); }"
        );
    }

    #[test]
    fn test_locals_shadow_everything() {
        let caps = Capabilities::new().sync("get");
        assert_eq!(
            render("(get, a) => get(a)", &caps, &["a"]),
            "((get, a) => get(a))"
        );
    }
}
