//! gqlx code generator: turns a validated resolver expression into
//! async-correct resolver source.
//!
//! # Pipeline
//!
//! 1. [`rewrite`] wraps the expression into `{ return <expr>; }`, inserts
//!    `await` for every asynchronous capability result, hoists temporaries
//!    out of member chains, defers lazy branches into async thunks and
//!    prepends the built-in helpers the body references.
//! 2. [`transpile`] renders the rewritten block. Capabilities are reached
//!    through `$api`, field arguments through `$data`; operators are fully
//!    parenthesized.
//! 3. [`wrap_statements`] adds the default error boundary.
//!
//! [`generate`] runs the first two steps.

pub mod error;
pub mod expr;
pub mod inbuilt;
pub mod rewrite;
pub mod scope;
pub mod stmt;
pub mod transpile;

pub use error::{CodegenError, CodegenResult};
pub use rewrite::rewrite;
pub use transpile::{
    generate, transpile, transpile_node, wrap_statements, GenContext, Generated, API_NAMESPACE,
    DATA_NAMESPACE,
};
