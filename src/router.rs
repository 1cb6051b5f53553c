//! Generated router: declaration-order route matching and per-operation
//! handler chains.
//!
//! The router is immutable once generated. Matching walks the routes in
//! specification declaration order and the first pattern that matches wins,
//! so earlier-declared operations take priority when two patterns could
//! both match a request path.
//!
//! Per matched request the chain runs: mounted security handlers, then the
//! operation's request validation handler, then the user handlers in the
//! order they were added (the synthesized 501 handler when none were).

use crate::error::ValidationException;
use crate::request::{HttpRequest, HttpResponse};
use crate::security::{SecurityDecision, SecurityHandler, SecurityKey};
use crate::validation::{RequestParameters, RequestValidationHandler};
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Maximum number of path parameters before heap allocation. Most REST
/// APIs have well under 8 path params per route.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the matching hot path. Param
/// names come from the static route table, so they are shared `Arc<str>`;
/// values are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A user handler mounted on an operation. Handlers run in mount order;
/// each may write a response or fail the request, and several may be
/// chained on one operation without overwriting each other.
pub type Handler = Arc<dyn Fn(&mut RoutingContext) + Send + Sync>;

/// Per-request context handed to handlers.
///
/// Exposes the request, the extracted path parameters, and the populated
/// [`RequestParameters`] produced by validation. The context is
/// request-scoped: it is created after validation succeeds and dropped when
/// the response is produced.
pub struct RoutingContext {
    request: HttpRequest,
    path_params: ParamVec,
    params: RequestParameters,
    response: Option<HttpResponse>,
    failure: Option<(u16, String)>,
}

impl RoutingContext {
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Get a raw path parameter by name. Uses "last write wins" semantics
    /// for duplicate names at different path depths.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Validated, typed request parameters.
    pub fn params(&self) -> &RequestParameters {
        &self.params
    }

    /// Write the response, ending the handler chain.
    pub fn respond(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    /// Fail the request; the operation's failure handlers run next.
    pub fn fail(&mut self, status: u16, message: impl Into<String>) {
        self.failure = Some((status, message.into()));
    }

    /// The pending failure, if a handler failed the request.
    pub fn failure(&self) -> Option<(u16, &str)> {
        self.failure.as_ref().map(|(s, m)| (*s, m.as_str()))
    }
}

/// A security handler mounted on a route for one requirement.
pub(crate) struct MountedSecurity {
    pub(crate) key: SecurityKey,
    pub(crate) scopes: Vec<String>,
    pub(crate) handler: Arc<dyn SecurityHandler>,
}

/// One generated route: the compiled path pattern plus the full chain.
pub(crate) struct RouteEntry {
    pub(crate) method: Method,
    /// Full pattern including the server base path.
    pub(crate) pattern: String,
    pub(crate) regex: Regex,
    pub(crate) param_names: Vec<Arc<str>>,
    /// Operation label for logs.
    pub(crate) operation: String,
    pub(crate) security: Vec<MountedSecurity>,
    pub(crate) validation: Arc<RequestValidationHandler>,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) failure_handlers: Vec<Handler>,
}

/// Immutable router produced by [`crate::factory::RouterFactory::generate_router`].
///
/// Concurrent requests share only this read-only state, so many requests
/// may be handled at once without locking.
pub struct Router {
    routes: Vec<RouteEntry>,
    validation_failure_handler: bool,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field(
                "validation_failure_handler",
                &self.validation_failure_handler,
            )
            .finish()
    }
}

impl Router {
    pub(crate) fn new(routes: Vec<RouteEntry>, validation_failure_handler: bool) -> Self {
        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();

        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            validation_failure_handler = validation_failure_handler,
            "Routing table generated"
        );

        Self {
            routes,
            validation_failure_handler,
        }
    }

    /// Convert an OpenAPI path template to a regex plus its ordered
    /// parameter names: `/pets/{id}` becomes `^/pets/([^/]+)$` and `["id"]`.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let name = segment.trim_start_matches('{').trim_end_matches('}');
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(segment);
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }

    /// All generated path patterns (base path included), in priority order.
    pub fn path_patterns(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.pattern.clone()).collect()
    }

    /// Match a request path in declaration order; first match wins.
    fn match_route(&self, method: &Method, path: &str) -> Option<(&RouteEntry, ParamVec)> {
        for entry in &self.routes {
            if entry.method != *method {
                continue;
            }
            if let Some(caps) = entry.regex.captures(path) {
                let mut params = ParamVec::new();
                for (i, name) in entry.param_names.iter().enumerate() {
                    if let Some(m) = caps.get(i + 1) {
                        params.push((Arc::clone(name), m.as_str().to_string()));
                    }
                }
                return Some((entry, params));
            }
        }
        None
    }

    /// Handle one request.
    ///
    /// Every outcome the router owns is an `Ok` response: 404 for an
    /// unmatched path, the deny status for a rejected security check, 400
    /// for a validation failure while the validation failure handler is
    /// enabled, and whatever the handler chain produces. The only `Err` is
    /// a validation failure with the failure handler disabled, which is the
    /// caller's generic error handling to deal with.
    pub fn handle(&self, request: HttpRequest) -> Result<HttpResponse, ValidationException> {
        let match_start = Instant::now();
        debug!(method = %request.method, path = %request.path, "Route match attempt");

        let Some((entry, path_params)) = self.match_route(&request.method, &request.path) else {
            warn!(
                method = %request.method,
                path = %request.path,
                duration_us = match_start.elapsed().as_micros() as u64,
                "No route matched"
            );
            return Ok(HttpResponse::error(404, "no route matched request path"));
        };

        info!(
            method = %request.method,
            path = %request.path,
            operation = %entry.operation,
            route_pattern = %entry.pattern,
            duration_us = match_start.elapsed().as_micros() as u64,
            "Route matched"
        );

        for mounted in &entry.security {
            if let SecurityDecision::Deny(status) =
                mounted.handler.authorize(&request, &mounted.scopes)
            {
                info!(
                    operation = %entry.operation,
                    scheme = %mounted.key.scheme,
                    scope = ?mounted.key.scope,
                    status = status,
                    "Security handler denied request"
                );
                return Ok(HttpResponse::error(status, "access denied"));
            }
        }

        let params = match entry.validation.validate(&request, &path_params) {
            Ok(params) => params,
            Err(exception) => {
                if self.validation_failure_handler {
                    return Ok(HttpResponse::json(
                        400,
                        serde_json::json!({
                            "error": exception.to_string(),
                            "parameter": exception.name,
                            "location": exception.location.to_string(),
                        }),
                    ));
                }
                return Err(exception);
            }
        };

        let mut ctx = RoutingContext {
            request,
            path_params,
            params,
            response: None,
            failure: None,
        };

        for handler in &entry.handlers {
            handler(&mut ctx);
            if ctx.failure.is_some() {
                return Ok(self.run_failure_chain(entry, &mut ctx));
            }
            if ctx.response.is_some() {
                break;
            }
        }

        Ok(ctx.response.take().unwrap_or_else(|| {
            warn!(operation = %entry.operation, "Handler chain completed without a response");
            HttpResponse::error(500, "handler chain completed without a response")
        }))
    }

    /// Run the operation's failure handlers in mount order; the first one
    /// to respond wins, otherwise the failure itself becomes the response.
    fn run_failure_chain(&self, entry: &RouteEntry, ctx: &mut RoutingContext) -> HttpResponse {
        for handler in &entry.failure_handlers {
            handler(ctx);
            if let Some(response) = ctx.response.take() {
                return response;
            }
        }
        let (status, message) = ctx
            .failure
            .take()
            .unwrap_or((500, "request failed".to_string()));
        HttpResponse::error(status, &message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_to_regex_extracts_params() {
        let (regex, params) = Router::path_to_regex("/users/{id}/posts/{post_id}").unwrap();
        let names: Vec<&str> = params.iter().map(|p| &**p).collect();
        assert_eq!(names, ["id", "post_id"]);
        assert!(regex.is_match("/users/7/posts/9"));
        assert!(!regex.is_match("/users/7/posts"));
    }

    #[test]
    fn test_path_to_regex_root() {
        let (regex, params) = Router::path_to_regex("/").unwrap();
        assert!(params.is_empty());
        assert!(regex.is_match("/"));
        assert!(!regex.is_match("/x"));
    }
}
