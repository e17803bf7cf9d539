use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// JSON object as exchanged with the server
pub type Json = serde_json::Map<String, Value>;

/// Query-string parameters of a request
pub type Params = BTreeMap<String, String>;

/// Extra HTTP headers of a request
pub type Headers = BTreeMap<String, String>;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request represents one call against the database REST surface.
///
/// The endpoint is relative to the database prefix (`/_db/<name>`), e.g.
/// `/_api/document/users/alice`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub endpoint: String,
    pub params: Params,
    pub body: Option<Value>,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: Params::new(),
            body: None,
            headers: Headers::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the parameter only when a value is given
    pub fn param_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Response represents an already-decoded server response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    /// Server-assigned error number (`errorNum`), if any
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
    pub body: Value,
    pub is_success: bool,
}

impl Response {
    /// Build a response from its status and decoded body.
    ///
    /// Error details are lifted from an object body's `errorNum` and
    /// `errorMessage` fields. A response only counts as successful when the
    /// status is 2xx and no error number was reported.
    pub fn new(status_code: u16, body: Value) -> Self {
        let (error_code, error_message) = match &body {
            Value::Object(map) => (
                map.get("errorNum").and_then(Value::as_i64),
                map.get("errorMessage")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            _ => (None, None),
        };
        let is_success = (200..300).contains(&status_code) && error_code.is_none();

        Self {
            status_code,
            error_code,
            error_message,
            body,
            is_success,
        }
    }

    /// Take the body as a JSON object, or an empty one for non-object bodies
    pub fn into_object(self) -> Json {
        match self.body {
            Value::Object(map) => map,
            _ => Json::new(),
        }
    }
}

/// DocumentReference is any accepted way of pointing at a document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentReference {
    /// Full handle, `<collection>/<key>`
    Id(String),
    /// Bare key within the owning collection
    Key(String),
    /// Document body carrying `_id` or `_key` (and optionally `_rev`)
    Body(Json),
}

impl DocumentReference {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Revision embedded in a body reference
    pub fn embedded_rev(&self) -> Option<&str> {
        match self {
            Self::Body(body) => body.get("_rev").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Strings containing a `/` are ids, anything else is a key
impl From<&str> for DocumentReference {
    fn from(value: &str) -> Self {
        if value.contains('/') {
            Self::Id(value.to_string())
        } else {
            Self::Key(value.to_string())
        }
    }
}

impl From<String> for DocumentReference {
    fn from(value: String) -> Self {
        if value.contains('/') {
            Self::Id(value)
        } else {
            Self::Key(value)
        }
    }
}

impl From<&String> for DocumentReference {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Json> for DocumentReference {
    fn from(value: Json) -> Self {
        Self::Body(value)
    }
}

impl From<&Json> for DocumentReference {
    fn from(value: &Json) -> Self {
        Self::Body(value.clone())
    }
}

/// CanonicalHandle is the resolved `<collection>/<key>` target of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalHandle {
    collection: String,
    key: String,
    id: String,
}

impl CanonicalHandle {
    pub(crate) fn new(collection: &str, key: &str) -> Self {
        Self {
            collection: collection.to_string(),
            key: key.to_string(),
            id: format!("{}/{}", collection, key),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CanonicalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Server-side cursor flavour; both share the same update contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorType {
    /// Query results, `/_api/cursor`
    #[default]
    Query,
    /// Collection export, `/_api/export`
    Export,
}

impl CursorType {
    pub fn path(&self) -> &'static str {
        match self {
            CursorType::Query => "cursor",
            CursorType::Export => "export",
        }
    }
}

impl fmt::Display for CursorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
