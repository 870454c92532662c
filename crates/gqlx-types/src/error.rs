use crate::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Schema,
    Capability,
    Internal,
}

/// The user-facing error kinds a compile call can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingFieldName,
    EmbeddedExpressionSyntax,
    UnexpectedToken,
    SchemaValidation,
    CapabilityViolation,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingFieldName => "MissingFieldNameError",
            Self::EmbeddedExpressionSyntax => "EmbeddedExpressionSyntaxError",
            Self::UnexpectedToken => "UnexpectedTokenError",
            Self::SchemaValidation => "SchemaValidationError",
            Self::CapabilityViolation => "CapabilityViolationError",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Numeric error code (E100–E999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const MISSING_FIELD_NAME: Self = Self(101);
    pub const EXPRESSION_SYNTAX: Self = Self(102);
    pub const UNBALANCED_PARENS: Self = Self(103);

    // ── Schema errors (E200–E299) ──
    pub const SCHEMA_SYNTAX: Self = Self(200);
    pub const SCHEMA_INVALID: Self = Self(201);

    // ── Capability errors (E400–E499) ──
    pub const FREE_VARIABLE: Self = Self(400);
    pub const FORBIDDEN_CONSTRUCT: Self = Self(401);

    // ── Internal errors (E900–E999) ──
    pub const INTERNAL: Self = Self(900);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Schema,
            400..=499 => ErrorCategory::Capability,
            _ => ErrorCategory::Internal,
        }
    }

    /// Map the code onto the user-facing error kind.
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::UNEXPECTED_TOKEN => ErrorKind::UnexpectedToken,
            Self::MISSING_FIELD_NAME => ErrorKind::MissingFieldName,
            Self::EXPRESSION_SYNTAX | Self::UNBALANCED_PARENS => ErrorKind::EmbeddedExpressionSyntax,
            _ => match self.category() {
                ErrorCategory::Schema => ErrorKind::SchemaValidation,
                ErrorCategory::Capability => ErrorKind::CapabilityViolation,
                _ => ErrorKind::Internal,
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Which text an error location refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// The composite source handed to `compile`.
    Composite,
    /// The excised pure-schema text.
    PureSchema,
}

/// A structured gqlx compile error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GqlxError {
    /// Error code (e.g., E400).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub location: Location,
    pub origin: Origin,
}

impl GqlxError {
    /// Create an error located in the composite source.
    pub fn new(code: ErrorCode, message: impl Into<String>, location: Location) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            location,
            origin: Origin::Composite,
        }
    }

    /// Create an error located in the pure-schema text.
    pub fn in_schema(code: ErrorCode, message: impl Into<String>, location: Location) -> Self {
        Self {
            origin: Origin::PureSchema,
            ..Self::new(code, message, location)
        }
    }

    /// Create an internal error without a meaningful location.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL, message, Location::default())
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

impl fmt::Display for GqlxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.location,
            self.code,
            self.kind(),
            self.message
        )
    }
}

impl std::error::Error for GqlxError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Schema => write!(f, "schema"),
            Self::Capability => write!(f, "capability"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            line: 2,
            column: 7,
            range: [12, 15],
        }
    }

    #[test]
    fn test_code_categories() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::SCHEMA_INVALID.category(), ErrorCategory::Schema);
        assert_eq!(ErrorCode::FREE_VARIABLE.category(), ErrorCategory::Capability);
        assert_eq!(ErrorCode::INTERNAL.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_code_kinds() {
        assert_eq!(ErrorCode::MISSING_FIELD_NAME.kind(), ErrorKind::MissingFieldName);
        assert_eq!(
            ErrorCode::UNBALANCED_PARENS.kind(),
            ErrorKind::EmbeddedExpressionSyntax
        );
        assert_eq!(ErrorCode::SCHEMA_SYNTAX.kind(), ErrorKind::SchemaValidation);
        assert_eq!(
            ErrorCode::FORBIDDEN_CONSTRUCT.kind(),
            ErrorKind::CapabilityViolation
        );
    }

    #[test]
    fn test_display() {
        let err = GqlxError::new(ErrorCode::FREE_VARIABLE, "bad", loc());
        assert_eq!(
            err.to_string(),
            "2:7: E400 [CapabilityViolationError] bad"
        );
    }

    #[test]
    fn test_schema_origin() {
        let err = GqlxError::in_schema(ErrorCode::SCHEMA_SYNTAX, "oops", loc());
        assert_eq!(err.origin, Origin::PureSchema);
        assert_eq!(err.category, ErrorCategory::Schema);
    }

    #[test]
    fn test_serializes_flat_location() {
        let err = GqlxError::new(ErrorCode::UNEXPECTED_TOKEN, "x", loc());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["line"], 2);
        assert_eq!(json["column"], 7);
        assert_eq!(json["range"], serde_json::json!([12, 15]));
        assert_eq!(json["origin"], "composite");
    }
}
