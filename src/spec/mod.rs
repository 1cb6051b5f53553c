//! OpenAPI specification loading and operation extraction.
//!
//! The raw document is parsed with declaration order preserved, external
//! JSON Schema references are resolved transitively, and each declared
//! (path, method) pair becomes an [`OperationMeta`] in specification order.

mod build;
mod load;
mod types;

pub use build::{
    build_operations, expand_schema_refs, extract_parameters, extract_request_schema,
    extract_security_schemes, resolve_schema_ref,
};
pub use load::{load_from_file, load_from_url, parse_document, SpecModel};
pub use types::{
    OperationMeta, ParameterLocation, ParameterMeta, SecurityRequirement, SecurityScheme,
};
