//! Extraction of operation metadata from a parsed OpenAPI document.
//!
//! Operations are produced in specification declaration order: the raw
//! document (whose object keys preserve source order) supplies the path
//! order, and the typed `oas3` model supplies everything else. Declaration
//! order is the route-priority order, so this ordering is an invariant, not
//! a convenience.

use super::types::{OperationMeta, ParameterLocation, ParameterMeta, SecurityRequirement};
use crate::error::SpecLoadError;
use oas3::spec::{ObjectOrReference, Parameter, SecurityScheme};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Resolve a `#/components/schemas/{name}` reference to its schema object.
pub fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    if let Some(name) = ref_path.strip_prefix("#/components/schemas/") {
        spec.components
            .as_ref()?
            .schemas
            .get(name)
            .and_then(|schema_ref| match schema_ref {
                ObjectOrReference::Object(schema) => Some(schema),
                _ => None,
            })
    } else {
        None
    }
}

fn resolve_parameter_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::Parameter> {
    if let Some(name) = ref_path.strip_prefix("#/components/parameters/") {
        spec.components
            .as_ref()?
            .parameters
            .get(name)
            .and_then(|param_ref| match param_ref {
                ObjectOrReference::Object(param) => Some(param),
                _ => None,
            })
    } else {
        None
    }
}

/// Recursively expand `#/components/schemas/` references inside a schema
/// value so the emitted schema is self-contained.
pub fn expand_schema_refs(spec: &OpenApiV3Spec, value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(|v| v.as_str()) {
                if let Some(schema) = resolve_schema_ref(spec, ref_path) {
                    if let Ok(mut new_val) = serde_json::to_value(schema) {
                        expand_schema_refs(spec, &mut new_val);
                        *value = new_val;
                        return;
                    }
                }
            }
            for v in obj.values_mut() {
                expand_schema_refs(spec, v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_schema_refs(spec, v);
            }
        }
        _ => {}
    }
}

/// Extract declared parameters, resolving `#/components/parameters/` refs.
///
/// Path parameters are always required regardless of the declared flag.
pub fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &[ObjectOrReference<Parameter>],
) -> Vec<ParameterMeta> {
    let mut out = Vec::new();
    for p in params {
        let param = match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path),
        };

        if let Some(param) = param {
            let schema = param.schema.as_ref().and_then(|s| match s {
                ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok().map(|mut v| {
                    expand_schema_refs(spec, &mut v);
                    v
                }),
                ObjectOrReference::Ref { ref_path, .. } => resolve_schema_ref(spec, ref_path)
                    .and_then(|sch| serde_json::to_value(sch).ok()),
            });

            let location = ParameterLocation::from(param.location);
            let required = param.required.unwrap_or(false) || location == ParameterLocation::Path;
            let delimiter = match &param.style {
                Some(oas3::spec::ParameterStyle::SpaceDelimited) => ' ',
                Some(oas3::spec::ParameterStyle::PipeDelimited) => '|',
                _ => ',',
            };

            out.push(ParameterMeta {
                name: param.name.clone(),
                location,
                required,
                schema,
                delimiter,
            });
        }
    }
    out
}

/// Extract the `application/json` request body schema and its required flag.
pub fn extract_request_schema(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
) -> (Option<Value>, bool) {
    let Some(ObjectOrReference::Object(req_body)) = operation.request_body.as_ref() else {
        return (None, false);
    };
    let schema = req_body.content.get("application/json").and_then(|media| {
        match media.schema.as_ref()? {
            ObjectOrReference::Object(schema_obj) => {
                serde_json::to_value(schema_obj).ok().map(|mut v| {
                    expand_schema_refs(spec, &mut v);
                    v
                })
            }
            ObjectOrReference::Ref { ref_path, .. } => resolve_schema_ref(spec, ref_path)
                .and_then(|s| serde_json::to_value(s).ok())
                .map(|mut v| {
                    expand_schema_refs(spec, &mut v);
                    v
                }),
        }
    });
    (schema, req_body.required.unwrap_or(false))
}

/// Extract the named security schemes declared under `components`.
pub fn extract_security_schemes(spec: &OpenApiV3Spec) -> HashMap<String, SecurityScheme> {
    spec.components
        .as_ref()
        .map(|c| {
            c.security_schemes
                .iter()
                .filter_map(|(name, scheme)| match scheme {
                    ObjectOrReference::Object(obj) => Some((name.clone(), obj.clone())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn convert_security(reqs: &[oas3::spec::SecurityRequirement]) -> Vec<SecurityRequirement> {
    reqs.iter()
        .flat_map(|req| {
            req.0.iter().map(|(scheme, scopes)| SecurityRequirement {
                scheme: scheme.clone(),
                scopes: scopes.clone(),
            })
        })
        .collect()
}

fn base_path(spec: &OpenApiV3Spec) -> String {
    if let Some(server) = spec.servers.first() {
        let url_str = &server.url;
        url::Url::parse(url_str)
            .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
            .map(|u| {
                let p = u.path().trim_end_matches('/');
                if p == "/" || p.is_empty() {
                    String::new()
                } else {
                    p.to_string()
                }
            })
            .unwrap_or_default()
    } else {
        String::new()
    }
}

/// Path keys of the raw document in declaration order.
fn ordered_paths(raw: &Value) -> Vec<String> {
    raw.get("paths")
        .and_then(Value::as_object)
        .map(|paths| paths.keys().cloned().collect())
        .unwrap_or_default()
}

/// Build operation metadata in specification declaration order.
pub fn build_operations(
    spec: &OpenApiV3Spec,
    raw: &Value,
) -> Result<Vec<OperationMeta>, SpecLoadError> {
    let paths_map = spec
        .paths
        .as_ref()
        .ok_or_else(|| SpecLoadError::Structure("specification declares no paths".to_string()))?;

    let base_path = base_path(spec);
    let mut operations = Vec::new();

    for path in ordered_paths(raw) {
        let Some(item) = paths_map.get(&path) else {
            warn!(path = %path, "Path present in raw document but absent from parsed model");
            continue;
        };

        for (method, operation) in item.methods() {
            let (request_schema, request_body_required) = extract_request_schema(spec, operation);

            // Operation-level security overrides the document default.
            let security = if operation.security.is_empty() {
                convert_security(&spec.security)
            } else {
                convert_security(&operation.security)
            };

            let mut parameters = Vec::new();
            parameters.extend(extract_parameters(spec, &item.parameters));
            parameters.extend(extract_parameters(spec, &operation.parameters));

            operations.push(OperationMeta {
                operation_id: operation.operation_id.clone(),
                method: method.clone(),
                path_pattern: path.clone(),
                parameters,
                request_schema,
                request_body_required,
                security,
                base_path: base_path.clone(),
            });
        }
    }

    Ok(operations)
}
