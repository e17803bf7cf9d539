//! Document identity resolution.
//!
//! Every document and graph-element operation addresses its target through
//! [`resolve`], which turns a [`DocumentReference`] into a [`CanonicalHandle`]
//! and the `If-Match` header used for optimistic concurrency. Nothing here
//! touches the network.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{CanonicalHandle, DocumentReference, Headers, Json};

pub const IF_MATCH: &str = "If-Match";

/// Conditional-request header for a resolved document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionHeader(Option<String>);

impl RevisionHeader {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn if_match(rev: impl Into<String>) -> Self {
        Self(Some(rev.into()))
    }

    pub fn revision(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Headers to send with the request (empty when no check is requested)
    pub fn to_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if let Some(rev) = &self.0 {
            headers.insert(IF_MATCH.to_string(), rev.clone());
        }
        headers
    }
}

/// Resolve a reference against its owning collection.
///
/// An explicit `rev` wins over a `_rev` embedded in a body reference. The
/// header is only populated when `check_rev` is set and a revision is known.
pub fn resolve(
    collection: &str,
    reference: &DocumentReference,
    rev: Option<&str>,
    check_rev: bool,
) -> Result<(CanonicalHandle, RevisionHeader)> {
    let handle = match reference {
        DocumentReference::Body(body) => extract_id(collection, body)?,
        DocumentReference::Id(id) => validate_id(collection, id)?,
        DocumentReference::Key(key) => from_key(collection, key)?,
    };

    let effective = rev.or_else(|| reference.embedded_rev());
    let header = match effective {
        Some(rev) if check_rev => RevisionHeader::if_match(rev),
        _ => RevisionHeader::none(),
    };

    Ok((handle, header))
}

/// Check that `id` belongs to `collection` and split off its key
pub fn validate_id(collection: &str, id: &str) -> Result<CanonicalHandle> {
    let key = id
        .strip_prefix(collection)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| {
            Error::IdentityParse(format!("bad collection name in document ID \"{}\"", id))
        })?;

    if key.is_empty() {
        return Err(Error::IdentityParse(format!(
            "document ID \"{}\" has an empty key",
            id
        )));
    }

    Ok(CanonicalHandle::new(collection, key))
}

/// Identity of a document body: `_id` if present, else `_key`
pub fn extract_id(collection: &str, body: &Json) -> Result<CanonicalHandle> {
    if let Some(id) = body.get("_id") {
        let id = id
            .as_str()
            .ok_or_else(|| Error::IdentityParse("field \"_id\" must be a string".to_string()))?;
        return validate_id(collection, id);
    }

    match body.get("_key") {
        Some(Value::String(key)) => from_key(collection, key),
        Some(_) => Err(Error::IdentityParse(
            "field \"_key\" must be a string".to_string(),
        )),
        None => Err(Error::IdentityParse(
            "field \"_key\" or \"_id\" required".to_string(),
        )),
    }
}

/// Full id of a reference whose collection is not known up front, such as
/// the endpoints of an edge.
pub fn document_id(reference: &DocumentReference) -> Result<String> {
    match reference {
        DocumentReference::Id(id) => Ok(id.clone()),
        DocumentReference::Body(body) => body
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::IdentityParse("field \"_id\" required".to_string())),
        DocumentReference::Key(key) => Err(Error::IdentityParse(format!(
            "a full document ID is required, got key \"{}\"",
            key
        ))),
    }
}

/// Body with `_key` populated, deriving it from `_id` when needed
pub fn ensure_key_in_body(collection: &str, body: Json) -> Result<Json> {
    if body.contains_key("_key") {
        return Ok(body);
    }
    if body.contains_key("_id") {
        return ensure_key_from_id(collection, body);
    }
    Err(Error::IdentityParse(
        "field \"_key\" or \"_id\" required".to_string(),
    ))
}

/// Populate `_key` from `_id` when only `_id` is present
pub fn ensure_key_from_id(collection: &str, mut body: Json) -> Result<Json> {
    if body.contains_key("_key") {
        return Ok(body);
    }
    let key = match body.get("_id") {
        Some(_) => extract_id(collection, &body)?.key().to_string(),
        None => return Ok(body),
    };
    body.insert("_key".to_string(), Value::String(key));
    Ok(body)
}

fn from_key(collection: &str, key: &str) -> Result<CanonicalHandle> {
    if key.is_empty() {
        return Err(Error::IdentityParse("document key is empty".to_string()));
    }
    if key.contains('/') {
        return Err(Error::IdentityParse(format!(
            "document key \"{}\" must not contain '/'",
            key
        )));
    }
    Ok(CanonicalHandle::new(collection, key))
}
