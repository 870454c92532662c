//! Codegen error types.

use thiserror::Error;

/// Errors that can occur while rewriting or rendering a resolver body.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A node kind that the validator should have rejected reached the
    /// generator.
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
