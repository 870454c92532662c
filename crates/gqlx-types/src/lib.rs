//! Shared types for the gqlx compiler.
//!
//! This crate defines the embedded-expression AST, byte-offset spans,
//! source locations, the capability descriptor and the compile-time error
//! taxonomy used by every pipeline stage.

mod capability;
mod error;
mod span;
pub mod ast;

pub use capability::Capabilities;
pub use error::{ErrorCategory, ErrorCode, ErrorKind, GqlxError, Origin};
pub use span::{Location, SourceFile, Span};

/// Result type used throughout the gqlx compiler.
pub type Result<T> = std::result::Result<T, GqlxError>;
