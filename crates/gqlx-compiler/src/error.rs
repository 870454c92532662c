//! Errors raised while serving a compiled module.

use gqlx_eval::RuntimeFault;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// An adapter was requested for a type that is not a root container.
    #[error("Invalid type used. Expected 'Subscription', 'Query', or 'Mutation', but received '{0}'.")]
    InvalidType(String),

    /// The module has no resolver for this field.
    #[error("no resolver for {type_name}.{field}")]
    UnknownField { type_name: String, field: String },

    /// The services context has nothing registered under this module name.
    #[error("no service registered for module '{0}'")]
    UnknownService(String),

    /// The resolver ran and failed.
    #[error(transparent)]
    Fault(#[from] RuntimeFault),
}
