use http::Method;
use oas3::spec::ParameterIn as OasParameterLocation;
pub use oas3::spec::SecurityScheme;
use serde_json::Value;

/// Where a declared parameter is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
            ParameterLocation::Body => write!(f, "body"),
        }
    }
}

impl From<OasParameterLocation> for ParameterLocation {
    fn from(loc: OasParameterLocation) -> Self {
        match loc {
            OasParameterLocation::Path => ParameterLocation::Path,
            OasParameterLocation::Query => ParameterLocation::Query,
            OasParameterLocation::Header => ParameterLocation::Header,
            OasParameterLocation::Cookie => ParameterLocation::Cookie,
        }
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Value>,
    /// Array element delimiter derived from the declared parameter style:
    /// `' '` for spaceDelimited, `'|'` for pipeDelimited, `','` otherwise.
    pub delimiter: char,
}

/// One security requirement of an operation: a scheme name plus the scopes
/// it demands (empty for schemes without scopes, e.g. API keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub scheme: String,
    pub scopes: Vec<String>,
}

/// One operation declared in the specification: a (path, method) pair,
/// optionally named by an operationId.
///
/// Operations carry everything the registry and router need: declared
/// parameters in schema order, the request body schema, and the security
/// requirements (operation-level, falling back to the document default).
#[derive(Debug, Clone)]
pub struct OperationMeta {
    /// Declared operationId, if any. Operations without one can only be
    /// addressed by (method, path).
    pub operation_id: Option<String>,
    pub method: Method,
    /// OpenAPI-style path template, e.g. `/pets/{id}`.
    pub path_pattern: String,
    /// Declared parameters in specification order (path-item level first,
    /// then operation level).
    pub parameters: Vec<ParameterMeta>,
    /// JSON Schema of the `application/json` request body, `$ref`s resolved.
    pub request_schema: Option<Value>,
    pub request_body_required: bool,
    pub security: Vec<SecurityRequirement>,
    /// Path prefix taken from the first `servers[].url` entry.
    pub base_path: String,
}

impl OperationMeta {
    /// Label used in error messages and logs: operationId when declared,
    /// otherwise `METHOD /path`.
    pub fn label(&self) -> String {
        match &self.operation_id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.method, self.path_pattern),
        }
    }
}
