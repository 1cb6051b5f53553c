//! Error taxonomy for the router factory.
//!
//! Configuration-time failures ([`FactoryError`]) are returned synchronously
//! from the registry/factory call that caused them. Request-time failures
//! ([`ValidationException`]) surface as a 400 response when the validation
//! failure handler is enabled, otherwise they propagate to the caller's
//! generic error handling.

use crate::spec::ParameterLocation;
use thiserror::Error;

/// Failure while loading or parsing an OpenAPI specification.
#[derive(Debug, Error)]
pub enum SpecLoadError {
    #[error("failed to read specification `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch specification `{url}`")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("specification `{location}` is not valid YAML or JSON: {message}")]
    Parse { location: String, message: String },
    #[error("specification is structurally invalid: {0}")]
    Structure(String),
    #[error("unresolvable external reference `{0}`")]
    UnresolvedRef(String),
}

/// Configuration-time failure of a registry or factory call.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("failed to load OpenAPI specification")]
    SpecLoad(#[from] SpecLoadError),
    #[error("specification is not loaded")]
    SpecNotLoaded,
    #[error("operation `{0}` is already registered")]
    DuplicateOperation(String),
    #[error("no operation in the specification matches `{0}`")]
    OperationNotFound(String),
    #[error("path `{0}` is not in OpenAPI format (use `/pets/{{id}}`, not `/pets/:id`)")]
    PathNotInSpecFormat(String),
    #[error("a security handler is already mounted for scheme `{scheme}`{}", scope_suffix(.scope))]
    DuplicateSecurityHandler {
        scheme: String,
        scope: Option<String>,
    },
    #[error("the router has already been generated")]
    AlreadyGenerated,
}

fn scope_suffix(scope: &Option<String>) -> String {
    match scope {
        Some(s) => format!(" scope `{s}`"),
        None => String::new(),
    }
}

/// What went wrong while validating a single request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required parameter was absent from the request.
    RequiredParamMissing,
    /// The raw value could not be coerced to the declared type.
    TypeMismatch { expected: &'static str },
    /// The raw value matched none of the declared enum values.
    EnumMismatch,
    /// The raw value did not match the declared pattern or custom predicate.
    PatternMismatch,
    /// The request body failed the JSON Schema structural check.
    BodySchemaInvalid(String),
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationErrorKind::RequiredParamMissing => write!(f, "required parameter missing"),
            ValidationErrorKind::TypeMismatch { expected } => {
                write!(f, "value is not a valid {expected}")
            }
            ValidationErrorKind::EnumMismatch => write!(f, "value is not one of the allowed values"),
            ValidationErrorKind::PatternMismatch => {
                write!(f, "value does not match the declared pattern")
            }
            ValidationErrorKind::BodySchemaInvalid(detail) => {
                write!(f, "body does not match schema: {detail}")
            }
        }
    }
}

/// Request-time validation failure, carrying the failing parameter name,
/// its location, and the error kind. Validation is fail-fast: the first
/// failing parameter aborts validation of the rest.
#[derive(Debug, Clone, Error)]
#[error("validation of {location} parameter `{name}` failed: {kind}")]
pub struct ValidationException {
    pub name: String,
    pub location: ParameterLocation,
    pub kind: ValidationErrorKind,
}

impl ValidationException {
    pub fn new(
        name: impl Into<String>,
        location: ParameterLocation,
        kind: ValidationErrorKind,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            kind,
        }
    }
}
