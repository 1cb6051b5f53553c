//! Operation registry: lookup and mutation API between specification
//! loading and router generation.
//!
//! The registry owns one [`Operation`] per declared (path, method) pair, in
//! specification declaration order. Lookup indexes by operationId and by
//! (method, path) are built once at registration time; declaration order is
//! preserved for iteration because it is the route-priority order.

use crate::error::FactoryError;
use crate::router::Handler;
use crate::spec::{OperationMeta, SpecModel};
use crate::validation::RequestValidationHandler;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One registered operation: its metadata, its compiled validation
/// handler, and the handler chains mounted so far.
pub struct Operation {
    pub meta: OperationMeta,
    pub(crate) validation: Arc<RequestValidationHandler>,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) failure_handlers: Vec<Handler>,
}

impl Operation {
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registry of all declared operations, iterable in declaration order.
#[derive(Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
    by_id: HashMap<String, usize>,
    by_route: HashMap<(Method, String), usize>,
}

impl OperationRegistry {
    /// Build the registry from a loaded specification, compiling one
    /// validation handler per operation.
    pub fn from_spec(model: &SpecModel) -> Result<Self, FactoryError> {
        let mut registry = Self::default();
        for meta in &model.operations {
            let validation = Arc::new(RequestValidationHandler::compile(meta)?);
            registry.register(Operation {
                meta: meta.clone(),
                validation,
                handlers: Vec::new(),
                failure_handlers: Vec::new(),
            })?;
        }
        Ok(registry)
    }

    /// Register an operation, indexing it by operationId (when declared)
    /// and by (method, path). Registering a second operation with the same
    /// operationId or the same (method, path) is rejected.
    pub fn register(&mut self, operation: Operation) -> Result<(), FactoryError> {
        if let Some(id) = &operation.meta.operation_id {
            if self.by_id.contains_key(id) {
                return Err(FactoryError::DuplicateOperation(id.clone()));
            }
        }
        let route_key = (
            operation.meta.method.clone(),
            operation.meta.path_pattern.clone(),
        );
        if self.by_route.contains_key(&route_key) {
            return Err(FactoryError::DuplicateOperation(operation.meta.label()));
        }

        debug!(
            operation = %operation.meta.label(),
            method = %operation.meta.method,
            path = %operation.meta.path_pattern,
            "Operation registered"
        );

        let index = self.operations.len();
        if let Some(id) = &operation.meta.operation_id {
            self.by_id.insert(id.clone(), index);
        }
        self.by_route.insert(route_key, index);
        self.operations.push(operation);
        Ok(())
    }

    /// Reject paths that are not in OpenAPI brace-parameter syntax.
    /// Colon-style router paths (`/pets/:id`) are explicitly not accepted.
    pub fn ensure_spec_path_format(path: &str) -> Result<(), FactoryError> {
        let reject = || FactoryError::PathNotInSpecFormat(path.to_string());

        if !path.starts_with('/') {
            return Err(reject());
        }
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment.starts_with(':') {
                return Err(reject());
            }
            if segment.contains('{') || segment.contains('}') {
                let inner = segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .ok_or_else(reject)?;
                if inner.is_empty() || inner.contains('{') || inner.contains('}') {
                    return Err(reject());
                }
            }
        }
        Ok(())
    }

    fn index_by_route(&self, method: &Method, path: &str) -> Result<usize, FactoryError> {
        Self::ensure_spec_path_format(path)?;
        self.by_route
            .get(&(method.clone(), path.to_string()))
            .copied()
            .ok_or_else(|| FactoryError::OperationNotFound(format!("{method} {path}")))
    }

    fn index_by_id(&self, operation_id: &str) -> Result<usize, FactoryError> {
        self.by_id
            .get(operation_id)
            .copied()
            .ok_or_else(|| FactoryError::OperationNotFound(operation_id.to_string()))
    }

    /// Append a handler to the operation matching (method, path).
    pub fn add_handler(
        &mut self,
        method: &Method,
        path: &str,
        handler: Handler,
    ) -> Result<(), FactoryError> {
        let index = self.index_by_route(method, path)?;
        self.operations[index].handlers.push(handler);
        Ok(())
    }

    /// Append a failure handler to the operation matching (method, path).
    pub fn add_failure_handler(
        &mut self,
        method: &Method,
        path: &str,
        handler: Handler,
    ) -> Result<(), FactoryError> {
        let index = self.index_by_route(method, path)?;
        self.operations[index].failure_handlers.push(handler);
        Ok(())
    }

    /// Append a handler to the operation named by operationId.
    pub fn add_handler_by_operation_id(
        &mut self,
        operation_id: &str,
        handler: Handler,
    ) -> Result<(), FactoryError> {
        let index = self.index_by_id(operation_id)?;
        self.operations[index].handlers.push(handler);
        Ok(())
    }

    /// Append a failure handler to the operation named by operationId.
    pub fn add_failure_handler_by_operation_id(
        &mut self,
        operation_id: &str,
        handler: Handler,
    ) -> Result<(), FactoryError> {
        let index = self.index_by_id(operation_id)?;
        self.operations[index].failure_handlers.push(handler);
        Ok(())
    }

    /// Operations in specification declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_path_format() {
        assert!(OperationRegistry::ensure_spec_path_format("/pets/{id}").is_ok());
        assert!(OperationRegistry::ensure_spec_path_format("/pets").is_ok());
        assert!(OperationRegistry::ensure_spec_path_format("/").is_ok());
        assert!(OperationRegistry::ensure_spec_path_format("/pets/:id").is_err());
        assert!(OperationRegistry::ensure_spec_path_format("pets/{id}").is_err());
        assert!(OperationRegistry::ensure_spec_path_format("/pets/{id").is_err());
        assert!(OperationRegistry::ensure_spec_path_format("/pets/{}").is_err());
    }
}
