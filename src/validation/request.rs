//! Request validation against an operation's declared parameters.
//!
//! One handler is compiled per operation at registry build time: parameter
//! validators are derived from their schemas once, and the body schema is
//! compiled once with `jsonschema`, so the per-request path never compiles
//! anything.

use super::param::{ParameterTypeValidator, RequestParameter, RequestParameters};
use crate::error::{SpecLoadError, ValidationErrorKind, ValidationException};
use crate::request::HttpRequest;
use crate::router::ParamVec;
use crate::spec::{OperationMeta, ParameterLocation};
use std::sync::Arc;
use tracing::debug;

/// A declared parameter with its validator compiled from the schema.
#[derive(Debug, Clone)]
pub struct CompiledParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub validator: ParameterTypeValidator,
}

/// Validates all declared parameters of one operation for one incoming
/// request, fail-fast: the first failing parameter aborts validation and
/// no partial [`RequestParameters`] escapes.
#[derive(Clone)]
pub struct RequestValidationHandler {
    parameters: Vec<CompiledParameter>,
    body_validator: Option<Arc<jsonschema::Validator>>,
    body_required: bool,
    operation: String,
}

impl RequestValidationHandler {
    /// Compile a validation handler for an operation.
    ///
    /// Fails only when the operation's body schema itself is invalid, which
    /// is a configuration-time error.
    pub fn compile(op: &OperationMeta) -> Result<Self, SpecLoadError> {
        let parameters = op
            .parameters
            .iter()
            .map(|p| CompiledParameter {
                name: p.name.clone(),
                location: p.location,
                required: p.required,
                validator: ParameterTypeValidator::from_schema(p.schema.as_ref())
                    .with_delimiter(p.delimiter),
            })
            .collect();

        let body_validator = match &op.request_schema {
            Some(schema) => Some(Arc::new(jsonschema::validator_for(schema).map_err(
                |e| {
                    SpecLoadError::Structure(format!(
                        "request body schema of `{}` is invalid: {e}",
                        op.label()
                    ))
                },
            )?)),
            None => None,
        };

        Ok(Self {
            parameters,
            body_validator,
            body_required: op.request_body_required,
            operation: op.label(),
        })
    }

    /// Validate one request, producing the populated parameter container.
    ///
    /// Declared parameters are checked in schema order, then the body. Path
    /// parameter values come from the router's extraction, everything else
    /// from the request itself.
    pub fn validate(
        &self,
        request: &HttpRequest,
        path_params: &ParamVec,
    ) -> Result<RequestParameters, ValidationException> {
        let mut out = RequestParameters::default();

        for param in &self.parameters {
            let raw = match param.location {
                ParameterLocation::Path => path_params
                    .iter()
                    .rfind(|(k, _)| k.as_ref() == param.name.as_str())
                    .map(|(_, v)| v.as_str()),
                ParameterLocation::Query => request.get_query_param(&param.name),
                ParameterLocation::Header => request.get_header(&param.name),
                ParameterLocation::Cookie => request.get_cookie(&param.name),
                ParameterLocation::Body => request
                    .body
                    .as_ref()
                    .and_then(|b| b.get(&param.name))
                    .and_then(|v| v.as_str()),
            };

            let value = param
                .validator
                .validate(raw, param.required)
                .map_err(|kind| {
                    debug!(
                        operation = %self.operation,
                        parameter = %param.name,
                        location = %param.location,
                        kind = %kind,
                        "Parameter validation failed"
                    );
                    ValidationException::new(&param.name, param.location, kind)
                })?;

            out.insert(RequestParameter {
                name: param.name.clone(),
                location: param.location,
                value,
                valid: true,
            });
        }

        self.validate_body(request, &mut out)?;

        Ok(out)
    }

    /// Structural body check, delegated to the compiled JSON Schema
    /// validator.
    fn validate_body(
        &self,
        request: &HttpRequest,
        out: &mut RequestParameters,
    ) -> Result<(), ValidationException> {
        let Some(validator) = &self.body_validator else {
            return Ok(());
        };

        let Some(body) = &request.body else {
            if self.body_required {
                return Err(ValidationException::new(
                    "body",
                    ParameterLocation::Body,
                    ValidationErrorKind::RequiredParamMissing,
                ));
            }
            return Ok(());
        };

        if let Err(error) = validator.validate(body) {
            debug!(
                operation = %self.operation,
                error = %error,
                "Body schema validation failed"
            );
            return Err(ValidationException::new(
                "body",
                ParameterLocation::Body,
                ValidationErrorKind::BodySchemaInvalid(error.to_string()),
            ));
        }

        out.insert(RequestParameter {
            name: "body".to_string(),
            location: ParameterLocation::Body,
            value: Some(body.clone()),
            valid: true,
        });
        Ok(())
    }
}
