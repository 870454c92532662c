//! gqlx compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! composite source → Region Extractor → pure schema + field bodies
//!   → Schema parse → Capability Validator → Schema validation
//!   → Async Rewriter + Code Generator → CompiledModule → Service::dispatch
//! ```
//!
//! Every stage is fail-fast: the first error aborts the compile call and no
//! partial module is returned.

pub mod env;
pub mod error;
pub mod excise;
pub mod extract;
pub mod inspect;
pub mod module;
pub mod schema;
pub mod validate;

use gqlx_codegen::generate;
use gqlx_types::{Capabilities, ErrorCode, GqlxError, Location, Result, SourceFile};
use tracing::{debug, info};

pub use error::ServiceError;
pub use excise::excise;
pub use extract::{extract, Container, Extraction, FieldBody, Region};
pub use inspect::{inspect, Layout, LayoutRegion, Position, RegionKind};
pub use module::{
    CompiledModule, CompiledUnit, FieldAdapter, ResolverAdapter, Service, ServicesContext,
};
pub use schema::Schema;
pub use validate::validate;

/// Knobs of one compile call.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Admit `debugger`, `console` and `assert` in field bodies.
    pub debug: bool,
    /// Wraps each generated body in its error boundary.
    pub wrap_statements: fn(&str) -> String,
    /// Applied to each wrapped body last, e.g. to regenerate it for an
    /// older language level.
    pub regenerate: Option<fn(&str) -> String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            debug: false,
            wrap_statements: gqlx_codegen::wrap_statements,
            regenerate: None,
        }
    }
}

/// Compile the composite `source` of module `name`.
pub fn compile(
    name: &str,
    source: &str,
    capabilities: &Capabilities,
    options: &CompileOptions,
) -> Result<CompiledModule> {
    if name.trim().is_empty() {
        return Err(GqlxError::internal("The module name must not be empty."));
    }
    if source.trim().is_empty() {
        return Err(GqlxError::in_schema(
            ErrorCode::SCHEMA_SYNTAX,
            "Error in GraphQL schema: Unexpected end of input.",
            Location::default(),
        ));
    }

    let file = SourceFile::new(name, source);
    let extraction = extract(&file)?;
    let schema = Schema::parse(excise(source, &extraction.spans()))?;

    let mut bodies = Vec::with_capacity(extraction.bodies.len());
    for body in extraction.bodies {
        let arguments = schema.arguments(body.container.as_str(), &body.field);
        validate(&file, &body.expr, capabilities, &arguments, options.debug)?;
        debug!(container = %body.container, field = %body.field, ?arguments, "validated field");
        bodies.push((body, arguments));
    }

    schema.validate()?;

    let mut units = Vec::with_capacity(bodies.len());
    for (body, arguments) in bodies {
        let generated = generate(body.expr, capabilities, &arguments)
            .map_err(|err| GqlxError::internal(err.to_string()))?;
        let mut text = (options.wrap_statements)(&generated.source);
        if let Some(regenerate) = options.regenerate {
            text = regenerate(&text);
        }
        let unit = CompiledUnit::new(body.container, body.field, arguments, text, generated.block);
        debug!(container = %unit.container, field = %unit.field, is_async = unit.is_async, "generated unit");
        units.push(unit);
    }

    let module = CompiledModule::new(name, source, schema, capabilities.clone(), units);
    info!(
        module = %module.name(),
        units = module.units().len(),
        fingerprint = %module.fingerprint(),
        "compiled module"
    );
    Ok(module)
}
