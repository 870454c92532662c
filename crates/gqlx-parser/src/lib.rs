//! gqlx parser: turns an embedded resolver expression into an AST.
//!
//! The entry point is [`parse_expression_at`]: given the composite source
//! and a byte offset it parses exactly one expression and reports where
//! that expression ends, leaving everything after it untouched.

mod parse_expr;
mod parse_pattern;
mod parse_stmt;
mod parser;

pub use parser::{parse_expression_at, parse_standalone, Parsed, Parser};
