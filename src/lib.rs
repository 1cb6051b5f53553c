//! # contract-router
//!
//! An [OpenAPI 3](https://spec.openapis.org/oas/v3.1.0) driven router
//! factory with integrated request validation: the specification is the
//! single source of truth for routing, parameter validation, and security
//! mounting.
//!
//! ## Overview
//!
//! The factory loads a specification asynchronously (local file or URL,
//! external JSON Schema references resolved transitively), builds an
//! operation registry in declaration order, lets you mount handlers by
//! operationId or by (method, OpenAPI-style path), and generates an
//! immutable router:
//!
//! - Declared request parameters (path, query, header, cookie) are
//!   validated and coerced to typed values before your handler runs.
//! - JSON request bodies are checked against their schema.
//! - Security handlers are mounted ahead of user handlers for operations
//!   that declare security requirements.
//! - Operations without a mounted handler answer `501 Not Implemented`;
//!   validation failures answer `400 Bad Request` (toggleable).
//!
//! ## Architecture
//!
//! - **[`spec`]** - specification loading and operation extraction
//! - **[`validation`]** - parameter type validators and the per-operation
//!   request validation handler
//! - **[`registry`]** - the operation registry with its mutation API
//! - **[`factory`]** - the router factory and its terminal
//!   `generate_router`
//! - **[`router`]** - the generated router and per-request handler chain
//! - **[`security`]** - the security handler hook contract
//! - **[`request`]** - transport-independent request/response types
//!
//! The crate does not speak HTTP itself: the surrounding server parses
//! requests into [`request::HttpRequest`], calls
//! [`router::Router::handle`], and writes the returned response.
//!
//! ## Quick start
//!
//! ```no_run
//! use contract_router::{HttpRequest, HttpResponse, RouterFactory};
//! use http::Method;
//!
//! # async fn run() -> Result<(), contract_router::error::FactoryError> {
//! let mut factory = RouterFactory::from_file("openapi.yaml").await?;
//!
//! factory.add_handler_by_operation_id("listPets", |ctx| {
//!     let limit = ctx.params().get("limit").and_then(|p| p.value()).cloned();
//!     ctx.respond(HttpResponse::json(
//!         200,
//!         serde_json::json!({ "pets": [], "limit": limit }),
//!     ));
//! })?;
//!
//! let router = factory.generate_router()?;
//! let response = router.handle(HttpRequest::new(Method::GET, "/pets?limit=10"))
//!     .unwrap_or_else(|e| HttpResponse::error(400, &e.to_string()));
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering guarantees
//!
//! Operations are registered, mounted, and matched in specification
//! declaration order: when two route patterns could both match a request
//! path, the operation declared earlier in the specification wins.

pub mod error;
pub mod factory;
pub mod registry;
pub mod request;
pub mod router;
pub mod security;
pub mod spec;
pub mod validation;

pub use error::{FactoryError, SpecLoadError, ValidationErrorKind, ValidationException};
pub use factory::{create_router_factory, RouterFactory};
pub use request::{HttpRequest, HttpResponse};
pub use router::{Router, RoutingContext};
pub use security::{SecurityDecision, SecurityHandler};
pub use spec::{
    load_from_file, load_from_url, OperationMeta, ParameterLocation, ParameterMeta,
    SecurityRequirement, SecurityScheme, SpecModel,
};
pub use validation::{ParameterTypeValidator, RequestParameter, RequestParameters};
