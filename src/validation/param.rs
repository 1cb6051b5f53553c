//! Parameter type validators.
//!
//! Every declared parameter gets a validator derived from its schema. A
//! validator coerces one raw string value into a typed JSON value, or
//! reports why it cannot. Validators are pure: same input, same outcome,
//! no side effects.

use crate::error::ValidationErrorKind;
use crate::spec::ParameterLocation;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// User-supplied validator for parameter types the built-in set cannot
/// express. Returns the coerced value on success.
pub trait CustomTypeValidator: Send + Sync {
    fn validate(&self, raw: &str) -> Result<Value, ValidationErrorKind>;
}

impl<F> CustomTypeValidator for F
where
    F: Fn(&str) -> Result<Value, ValidationErrorKind> + Send + Sync,
{
    fn validate(&self, raw: &str) -> Result<Value, ValidationErrorKind> {
        self(raw)
    }
}

/// Validates and coerces a single raw string value per a declared
/// parameter type.
///
/// The built-in variants form a closed set; [`ParameterTypeValidator::Custom`]
/// is the extension point for user-defined types.
#[derive(Clone)]
pub enum ParameterTypeValidator {
    String,
    Integer,
    Number,
    Boolean,
    /// Delimited list; each element is validated with the item validator.
    Array {
        items: Box<ParameterTypeValidator>,
        delimiter: char,
    },
    /// Inline JSON object.
    Object,
    /// Exact match against a fixed allowed-value set.
    Enumeration(Vec<String>),
    /// Regex pattern match; the value stays a string.
    Pattern(Regex),
    Custom(Arc<dyn CustomTypeValidator>),
}

impl std::fmt::Debug for ParameterTypeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "String"),
            Self::Integer => write!(f, "Integer"),
            Self::Number => write!(f, "Number"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Array { items, delimiter } => {
                write!(f, "Array({items:?}, '{delimiter}')")
            }
            Self::Object => write!(f, "Object"),
            Self::Enumeration(allowed) => write!(f, "Enumeration({allowed:?})"),
            Self::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl ParameterTypeValidator {
    /// Derive a validator from a parameter's JSON Schema.
    ///
    /// `enum` and `pattern` take precedence over the plain `type`, matching
    /// how the schema constrains values. An uncompilable pattern degrades to
    /// a plain string validator with a warning rather than poisoning the
    /// whole registry.
    pub fn from_schema(schema: Option<&Value>) -> Self {
        let Some(schema) = schema else {
            return Self::String;
        };

        if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
            let allowed = allowed
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            return Self::Enumeration(allowed);
        }

        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            match Regex::new(pattern) {
                Ok(re) => return Self::Pattern(re),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Uncompilable parameter pattern, falling back to string");
                    return Self::String;
                }
            }
        }

        match schema.get("type").and_then(Value::as_str) {
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("object") => Self::Object,
            Some("array") => Self::Array {
                items: Box::new(Self::from_schema(schema.get("items"))),
                delimiter: ',',
            },
            _ => Self::String,
        }
    }

    /// Replace the array element delimiter with the one derived from the
    /// declared parameter style. No-op for non-array validators.
    #[must_use]
    pub fn with_delimiter(self, delimiter: char) -> Self {
        match self {
            Self::Array { items, .. } => Self::Array { items, delimiter },
            other => other,
        }
    }

    /// Validate a raw value that may be absent.
    ///
    /// An absent value succeeds with the missing marker (`None`) only when
    /// the parameter is optional; required parameters fail with
    /// [`ValidationErrorKind::RequiredParamMissing`].
    pub fn validate(
        &self,
        raw: Option<&str>,
        required: bool,
    ) -> Result<Option<Value>, ValidationErrorKind> {
        match raw {
            Some(raw) => self.coerce(raw).map(Some),
            None if required => Err(ValidationErrorKind::RequiredParamMissing),
            None => Ok(None),
        }
    }

    /// Coerce a present raw value into its typed JSON form.
    pub fn coerce(&self, raw: &str) -> Result<Value, ValidationErrorKind> {
        match self {
            Self::String => Ok(Value::String(raw.to_string())),
            Self::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| ValidationErrorKind::TypeMismatch { expected: "integer" }),
            Self::Number => raw
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| ValidationErrorKind::TypeMismatch { expected: "number" }),
            Self::Boolean => raw
                .parse::<bool>()
                .map(Value::from)
                .map_err(|_| ValidationErrorKind::TypeMismatch { expected: "boolean" }),
            Self::Array { items, delimiter } => {
                let mut out = Vec::new();
                for part in raw.split(*delimiter).filter(|s| !s.is_empty()) {
                    out.push(items.coerce(part.trim())?);
                }
                Ok(Value::Array(out))
            }
            Self::Object => serde_json::from_str::<Value>(raw)
                .ok()
                .filter(Value::is_object)
                .ok_or(ValidationErrorKind::TypeMismatch { expected: "object" }),
            Self::Enumeration(allowed) => {
                if allowed.iter().any(|a| a == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(ValidationErrorKind::EnumMismatch)
                }
            }
            Self::Pattern(re) => {
                if re.is_match(raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(ValidationErrorKind::PatternMismatch)
                }
            }
            Self::Custom(custom) => custom.validate(raw),
        }
    }
}

/// Outcome of validating one declared parameter: the typed value plus its
/// validation status. Immutable after creation.
#[derive(Debug, Clone)]
pub struct RequestParameter {
    pub name: String,
    pub location: ParameterLocation,
    /// The coerced value; `None` is the missing marker for absent optional
    /// parameters.
    pub value: Option<Value>,
    pub valid: bool,
}

impl RequestParameter {
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Whether the parameter was absent from the request.
    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Validated parameters of one request, keyed by parameter name. Scoped to
/// the request: built by the validation handler, dropped with the request.
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    params: HashMap<String, RequestParameter>,
}

impl RequestParameters {
    pub(crate) fn insert(&mut self, param: RequestParameter) {
        self.params.insert(param.name.clone(), param);
    }

    pub fn get(&self, name: &str) -> Option<&RequestParameter> {
        self.params.get(name)
    }

    /// The validated request body, when the operation declares one.
    pub fn body(&self) -> Option<&Value> {
        self.params
            .values()
            .find(|p| p.location == ParameterLocation::Body)
            .and_then(RequestParameter::value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestParameter> {
        self.params.values()
    }
}
