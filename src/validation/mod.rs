//! Request parameter validation.
//!
//! [`ParameterTypeValidator`] coerces single raw values; a
//! [`RequestValidationHandler`] orchestrates all declared parameters of one
//! operation for one request, populating [`RequestParameters`] or failing
//! fast with a [`crate::error::ValidationException`].

mod param;
mod request;

pub use param::{
    CustomTypeValidator, ParameterTypeValidator, RequestParameter, RequestParameters,
};
pub use request::{CompiledParameter, RequestValidationHandler};
