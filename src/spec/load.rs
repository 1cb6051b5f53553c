//! Asynchronous specification loading.
//!
//! Loading is the only long-latency step in the factory lifecycle: the
//! document itself and any external JSON Schema references it pulls in may
//! live on disk or behind HTTP. Both loaders are async and never block the
//! caller's thread; external references are resolved transitively before
//! the typed model is built, so downstream code only ever sees a
//! self-contained document.

use super::build::{build_operations, extract_security_schemes};
use super::types::{OperationMeta, SecurityScheme};
use crate::error::SpecLoadError;
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Upper bound on external-reference resolution passes. Each pass inlines
/// one level of nesting; exceeding the bound means a reference cycle.
const MAX_RESOLVE_PASSES: usize = 16;

/// A fully loaded specification: the raw document (declaration order
/// preserved), the typed model, and everything extracted from them.
#[derive(Debug, Clone)]
pub struct SpecModel {
    pub spec: OpenApiV3Spec,
    pub raw: Value,
    /// Operations in specification declaration order.
    pub operations: Vec<OperationMeta>,
    pub security_schemes: HashMap<String, SecurityScheme>,
    /// Where the document came from, for logs and errors.
    pub source: String,
}

impl SpecModel {
    /// Parse a specification from in-memory text. External references are
    /// not resolved; use the async loaders for documents that have them.
    pub fn from_str(text: &str, location: &str) -> Result<Self, SpecLoadError> {
        let raw = parse_document(text, location)?;
        Self::from_raw(raw, location)
    }

    fn from_raw(raw: Value, location: &str) -> Result<Self, SpecLoadError> {
        let spec: OpenApiV3Spec = serde_json::from_value(raw.clone())
            .map_err(|e| SpecLoadError::Structure(e.to_string()))?;
        let operations = build_operations(&spec, &raw)?;
        let security_schemes = extract_security_schemes(&spec);

        info!(
            source = %location,
            operation_count = operations.len(),
            security_scheme_count = security_schemes.len(),
            "Specification loaded"
        );

        Ok(Self {
            spec,
            raw,
            operations,
            security_schemes,
            source: location.to_string(),
        })
    }
}

/// Load a specification from a local file, resolving external references.
pub async fn load_from_file(path: impl AsRef<Path>) -> Result<SpecModel, SpecLoadError> {
    let path = path.as_ref();
    let location = path.display().to_string();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SpecLoadError::Io {
            path: location.clone(),
            source,
        })?;

    let mut raw = parse_document(&text, &location)?;
    let base = DocBase::File(
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    );
    resolve_external_refs(&mut raw, &base).await?;
    SpecModel::from_raw(raw, &location)
}

/// Load a specification from a URL, resolving external references.
pub async fn load_from_url(url: &str) -> Result<SpecModel, SpecLoadError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| SpecLoadError::Parse {
            location: url.to_string(),
            message: e.to_string(),
        })?;
    let text = fetch_url(url).await?;
    let mut raw = parse_document(&text, url)?;
    let base = DocBase::Url(parsed);
    resolve_external_refs(&mut raw, &base).await?;
    SpecModel::from_raw(raw, url)
}

/// Parse YAML or JSON text into a raw document value.
///
/// JSON is detected by the leading `{`; everything else goes through the
/// YAML parser (which also accepts JSON, but the dedicated parser gives
/// better errors for the common case).
pub fn parse_document(text: &str, location: &str) -> Result<Value, SpecLoadError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(text).map_err(|e| SpecLoadError::Parse {
            location: location.to_string(),
            message: e.to_string(),
        })
    } else {
        serde_yaml::from_str(text).map_err(|e| SpecLoadError::Parse {
            location: location.to_string(),
            message: e.to_string(),
        })
    }
}

/// Where relative external references are resolved from.
enum DocBase {
    File(PathBuf),
    Url(url::Url),
}

enum DocTarget {
    File(PathBuf),
    Url(String),
}

impl DocBase {
    fn resolve(&self, reference: &str) -> Result<DocTarget, SpecLoadError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(DocTarget::Url(reference.to_string()));
        }
        match self {
            DocBase::File(dir) => Ok(DocTarget::File(dir.join(reference))),
            DocBase::Url(base) => base
                .join(reference)
                .map(|u| DocTarget::Url(u.to_string()))
                .map_err(|_| SpecLoadError::UnresolvedRef(reference.to_string())),
        }
    }
}

async fn fetch_url(url: &str) -> Result<String, SpecLoadError> {
    let response = reqwest::get(url).await.map_err(|source| SpecLoadError::Fetch {
        url: url.to_string(),
        source,
    })?;
    response
        .error_for_status()
        .map_err(|source| SpecLoadError::Fetch {
            url: url.to_string(),
            source,
        })?
        .text()
        .await
        .map_err(|source| SpecLoadError::Fetch {
            url: url.to_string(),
            source,
        })
}

async fn fetch_document(target: DocTarget, label: &str) -> Result<Value, SpecLoadError> {
    let text = match &target {
        DocTarget::File(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SpecLoadError::Io {
                    path: path.display().to_string(),
                    source,
                })?
        }
        DocTarget::Url(url) => fetch_url(url).await?,
    };
    parse_document(&text, label)
}

/// Split an external `$ref` into its document part and JSON pointer part.
fn split_ref(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((doc, pointer)) => (doc, Some(pointer)),
        None => (reference, None),
    }
}

fn collect_external_refs(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(obj) => {
            if let Some(r) = obj.get("$ref").and_then(Value::as_str) {
                if !r.starts_with('#') {
                    out.insert(r.to_string());
                }
            }
            for v in obj.values() {
                collect_external_refs(v, out);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                collect_external_refs(v, out);
            }
        }
        _ => {}
    }
}

fn inline_external_refs(
    value: &mut Value,
    documents: &HashMap<String, Value>,
) -> Result<(), SpecLoadError> {
    match value {
        Value::Object(obj) => {
            let external = obj
                .get("$ref")
                .and_then(Value::as_str)
                .filter(|r| !r.starts_with('#'))
                .map(str::to_string);
            if let Some(reference) = external {
                let (doc_part, pointer) = split_ref(&reference);
                let document = documents
                    .get(doc_part)
                    .ok_or_else(|| SpecLoadError::UnresolvedRef(reference.clone()))?;
                let resolved = match pointer {
                    Some(ptr) if !ptr.is_empty() => document
                        .pointer(ptr)
                        .ok_or_else(|| SpecLoadError::UnresolvedRef(reference.clone()))?,
                    _ => document,
                };
                *value = resolved.clone();
                return Ok(());
            }
            for v in obj.values_mut() {
                inline_external_refs(v, documents)?;
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                inline_external_refs(v, documents)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resolve external `$ref`s transitively, inlining the referenced values.
///
/// Fetched documents are cached by reference string, and relative
/// references are resolved against the root document's location. A pass
/// bound converts reference cycles into a hard error instead of a hang.
async fn resolve_external_refs(root: &mut Value, base: &DocBase) -> Result<(), SpecLoadError> {
    let mut documents: HashMap<String, Value> = HashMap::new();

    for pass in 0..MAX_RESOLVE_PASSES {
        let mut pending = BTreeSet::new();
        collect_external_refs(root, &mut pending);
        if pending.is_empty() {
            return Ok(());
        }

        debug!(
            pass = pass,
            pending_refs = pending.len(),
            "Resolving external references"
        );

        for reference in &pending {
            let (doc_part, _) = split_ref(reference);
            if documents.contains_key(doc_part) {
                continue;
            }
            let target = base.resolve(doc_part)?;
            let document = fetch_document(target, doc_part).await?;
            documents.insert(doc_part.to_string(), document);
        }

        inline_external_refs(root, &documents)?;
    }

    Err(SpecLoadError::UnresolvedRef(
        "external reference nesting exceeds resolver depth (reference cycle?)".to_string(),
    ))
}
