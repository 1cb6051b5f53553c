//! Router factory: the top-level configuration surface.
//!
//! Lifecycle: a factory is created from a loaded specification (file, URL,
//! or an already-parsed model), mutated through the add-handler calls on a
//! single logical thread, and consumed exactly once by
//! [`RouterFactory::generate_router`]. Each operation moves through
//! `DECLARED -> HANDLERS_MOUNTED (0..n times) -> GENERATED`; after
//! generation every configuration call fails with `AlreadyGenerated`.

use crate::error::{FactoryError, SpecLoadError};
use crate::request::HttpResponse;
use crate::registry::OperationRegistry;
use crate::router::{Handler, MountedSecurity, RouteEntry, Router, RoutingContext};
use crate::security::{SecurityHandler, SecurityKey};
use crate::spec::{self, SpecModel};
use http::Method;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Create a router factory from a specification location, dispatching on
/// whether the location is a URL or a filesystem path.
pub async fn create_router_factory(location: &str) -> Result<RouterFactory, FactoryError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        RouterFactory::from_url(location).await
    } else {
        RouterFactory::from_file(location).await
    }
}

/// Factory that turns a loaded OpenAPI specification plus mounted handlers
/// into an immutable [`Router`].
pub struct RouterFactory {
    /// `None` when specification loading failed; every call then fails
    /// with `SpecNotLoaded`.
    model: Option<SpecModel>,
    registry: OperationRegistry,
    security_handlers: HashMap<SecurityKey, Arc<dyn SecurityHandler>>,
    validation_failure_handler: bool,
    generated: bool,
}

impl std::fmt::Debug for RouterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterFactory")
            .field("model", &self.model)
            .field("security_handlers", &self.security_handlers.len())
            .field(
                "validation_failure_handler",
                &self.validation_failure_handler,
            )
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

impl RouterFactory {
    /// Load the specification from a local file and build a factory.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FactoryError> {
        let model = spec::load_from_file(path).await?;
        Self::from_spec(model)
    }

    /// Load the specification from a URL and build a factory.
    pub async fn from_url(url: &str) -> Result<Self, FactoryError> {
        let model = spec::load_from_url(url).await?;
        Self::from_spec(model)
    }

    /// Build a factory from an already loaded specification model.
    pub fn from_spec(model: SpecModel) -> Result<Self, FactoryError> {
        let registry = OperationRegistry::from_spec(&model)?;
        info!(
            source = %model.source,
            operations = registry.len(),
            "Router factory created"
        );
        Ok(Self {
            model: Some(model),
            registry,
            security_handlers: HashMap::new(),
            validation_failure_handler: true,
            generated: false,
        })
    }

    /// Build a factory from the outcome of a specification load.
    ///
    /// A failed or cancelled load yields an unusable factory: every
    /// configuration call and `generate_router` fail with `SpecNotLoaded`.
    pub fn from_load(result: Result<SpecModel, SpecLoadError>) -> Self {
        match result.map_err(FactoryError::from).and_then(Self::from_spec) {
            Ok(factory) => factory,
            Err(error) => {
                warn!(error = %error, "Specification load failed, factory is unusable");
                Self {
                    model: None,
                    registry: OperationRegistry::default(),
                    security_handlers: HashMap::new(),
                    validation_failure_handler: true,
                    generated: false,
                }
            }
        }
    }

    fn ensure_configurable(&self) -> Result<(), FactoryError> {
        if self.generated {
            return Err(FactoryError::AlreadyGenerated);
        }
        if self.model.is_none() {
            return Err(FactoryError::SpecNotLoaded);
        }
        Ok(())
    }

    /// Mount a handler on the operation matching (method, OpenAPI path).
    /// Multiple handlers chain in mount order; none overwrite.
    pub fn add_handler(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Fn(&mut RoutingContext) + Send + Sync + 'static,
    ) -> Result<(), FactoryError> {
        self.ensure_configurable()?;
        self.registry.add_handler(&method, path, Arc::new(handler))
    }

    /// Mount a failure handler on the operation matching (method, path).
    pub fn add_failure_handler(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Fn(&mut RoutingContext) + Send + Sync + 'static,
    ) -> Result<(), FactoryError> {
        self.ensure_configurable()?;
        self.registry
            .add_failure_handler(&method, path, Arc::new(handler))
    }

    /// Mount a handler on the operation named by operationId.
    pub fn add_handler_by_operation_id(
        &mut self,
        operation_id: &str,
        handler: impl Fn(&mut RoutingContext) + Send + Sync + 'static,
    ) -> Result<(), FactoryError> {
        self.ensure_configurable()?;
        self.registry
            .add_handler_by_operation_id(operation_id, Arc::new(handler))
    }

    /// Mount a failure handler on the operation named by operationId.
    pub fn add_failure_handler_by_operation_id(
        &mut self,
        operation_id: &str,
        handler: impl Fn(&mut RoutingContext) + Send + Sync + 'static,
    ) -> Result<(), FactoryError> {
        self.ensure_configurable()?;
        self.registry
            .add_failure_handler_by_operation_id(operation_id, Arc::new(handler))
    }

    /// Mount a security handler for a (scheme, scope) pair.
    ///
    /// At most one handler may be mounted per distinct pair; a duplicate is
    /// rejected, never silently overwritten.
    pub fn add_security_handler(
        &mut self,
        scheme: &str,
        scope: Option<&str>,
        handler: impl SecurityHandler + 'static,
    ) -> Result<(), FactoryError> {
        self.ensure_configurable()?;
        let key = SecurityKey::new(scheme, scope);
        if self.security_handlers.contains_key(&key) {
            return Err(FactoryError::DuplicateSecurityHandler {
                scheme: key.scheme,
                scope: key.scope,
            });
        }
        info!(scheme = %key.scheme, scope = ?key.scope, "Security handler mounted");
        self.security_handlers.insert(key, Arc::new(handler));
        Ok(())
    }

    /// Enable or disable the synthesized 400 validation failure handler
    /// (enabled by default). When disabled, validation failures propagate
    /// from [`Router::handle`] as errors.
    pub fn enable_validation_failure_handler(&mut self, enabled: bool) {
        self.validation_failure_handler = enabled;
    }

    /// Number of operations declared by the loaded specification.
    pub fn operation_count(&self) -> usize {
        self.registry.len()
    }

    /// Generate the router. Terminal: may be called at most once, and the
    /// factory rejects all further configuration afterwards.
    ///
    /// Per operation, in specification declaration order: the path template
    /// is translated to the router pattern, mounted security handlers are
    /// installed ahead of the chain, then the validation handler, then the
    /// user handlers in mount order. Operations with no mounted handler get
    /// a synthesized 501 handler.
    pub fn generate_router(&mut self) -> Result<Router, FactoryError> {
        if self.generated {
            return Err(FactoryError::AlreadyGenerated);
        }
        if self.model.is_none() {
            return Err(FactoryError::SpecNotLoaded);
        }

        let mut routes = Vec::with_capacity(self.registry.len());
        for operation in self.registry.iter() {
            let meta = &operation.meta;
            let pattern = format!("{}{}", meta.base_path, meta.path_pattern);
            let (regex, param_names) = Router::path_to_regex(&pattern)
                .map_err(|e| SpecLoadError::Structure(format!("path `{pattern}`: {e}")))?;

            let mut security = Vec::new();
            for requirement in &meta.security {
                let scheme_key = SecurityKey::new(&requirement.scheme, None);
                if let Some(handler) = self.security_handlers.get(&scheme_key) {
                    security.push(MountedSecurity {
                        key: scheme_key,
                        scopes: requirement.scopes.clone(),
                        handler: Arc::clone(handler),
                    });
                }
                for scope in &requirement.scopes {
                    let scoped_key = SecurityKey::new(&requirement.scheme, Some(scope));
                    if let Some(handler) = self.security_handlers.get(&scoped_key) {
                        security.push(MountedSecurity {
                            key: scoped_key,
                            scopes: vec![scope.clone()],
                            handler: Arc::clone(handler),
                        });
                    }
                }
            }

            let handlers = if operation.handlers.is_empty() {
                vec![not_implemented_handler(meta.label())]
            } else {
                operation.handlers.clone()
            };

            routes.push(RouteEntry {
                method: meta.method.clone(),
                pattern,
                regex,
                param_names,
                operation: meta.label(),
                security,
                validation: Arc::clone(&operation.validation),
                handlers,
                failure_handlers: operation.failure_handlers.clone(),
            });
        }

        self.generated = true;
        Ok(Router::new(routes, self.validation_failure_handler))
    }
}

/// Synthesized per-operation handler for operations nobody mounted.
fn not_implemented_handler(operation: String) -> Handler {
    Arc::new(move |ctx: &mut RoutingContext| {
        ctx.respond(HttpResponse::json(
            501,
            serde_json::json!({
                "error": "Not Implemented",
                "operation": operation,
            }),
        ));
    })
}
