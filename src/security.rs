//! Security handler contract.
//!
//! The factory mounts security handlers ahead of user handlers for
//! operations that declare security requirements. A handler inspects the
//! request's credentials (header, query parameter, or cookie) and either
//! allows the chain to proceed or denies with a 401/403-class status.
//! Concrete scheme implementations (JWT, OAuth2, API keys) live outside
//! this crate; only the hook contract is defined here.
//!
//! A handler is keyed by (scheme name, optional scope); at most one handler
//! may be mounted per distinct key, and a requirement for a scoped scheme
//! is satisfied by the handlers mounted for its scopes plus any scopeless
//! handler mounted for the scheme itself.

use crate::request::HttpRequest;

/// Outcome of a security check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityDecision {
    Allow,
    /// Deny with the given status (401 for missing/invalid credentials,
    /// 403 for insufficient permissions).
    Deny(u16),
}

/// A mounted security handler: `(request, scopes) -> allow | deny(status)`.
pub trait SecurityHandler: Send + Sync {
    fn authorize(&self, request: &HttpRequest, scopes: &[String]) -> SecurityDecision;
}

impl<F> SecurityHandler for F
where
    F: Fn(&HttpRequest, &[String]) -> SecurityDecision + Send + Sync,
{
    fn authorize(&self, request: &HttpRequest, scopes: &[String]) -> SecurityDecision {
        self(request, scopes)
    }
}

/// Mount key for a security handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityKey {
    pub scheme: String,
    pub scope: Option<String>,
}

impl SecurityKey {
    pub fn new(scheme: impl Into<String>, scope: Option<&str>) -> Self {
        Self {
            scheme: scheme.into(),
            scope: scope.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_closure_is_a_security_handler() {
        let handler = |req: &HttpRequest, _scopes: &[String]| {
            if req.get_header("x-api-key") == Some("secret") {
                SecurityDecision::Allow
            } else {
                SecurityDecision::Deny(401)
            }
        };
        let ok = HttpRequest::new(Method::GET, "/").with_header("X-API-Key", "secret");
        let bad = HttpRequest::new(Method::GET, "/");
        assert_eq!(handler.authorize(&ok, &[]), SecurityDecision::Allow);
        assert_eq!(handler.authorize(&bad, &[]), SecurityDecision::Deny(401));
    }
}
