use std::fmt;

use crate::models::Response;

/// Server error number for a revision mismatch / write conflict
pub const ERROR_CONFLICT: i64 = 1200;
/// Server error number for a missing document
pub const ERROR_DOCUMENT_NOT_FOUND: i64 = 1202;
/// Server error number for a unique constraint violation
pub const ERROR_UNIQUE_CONSTRAINT_VIOLATED: i64 = 1210;
/// Server error number for a missing index
pub const ERROR_INDEX_NOT_FOUND: i64 = 1212;
/// Server error number for a missing cursor
pub const ERROR_CURSOR_NOT_FOUND: i64 = 1600;

pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_PRECONDITION_FAILED: u16 = 412;

/// The kind of operation a server error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DocumentGet,
    DocumentHas,
    DocumentInsert,
    DocumentUpdate,
    DocumentReplace,
    DocumentDelete,
    DocumentKeys,
    DocumentIds,
    DocumentCount,
    DocumentAll,
    DocumentFind,
    DocumentRandom,
    Export,
    Truncate,
    IndexList,
    IndexCreate,
    IndexDelete,
    EdgeList,
    Query,
    CursorFetch,
    CursorClose,
    Version,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::DocumentGet => "document get",
            Operation::DocumentHas => "document lookup",
            Operation::DocumentInsert => "document insert",
            Operation::DocumentUpdate => "document update",
            Operation::DocumentReplace => "document replace",
            Operation::DocumentDelete => "document delete",
            Operation::DocumentKeys => "document keys",
            Operation::DocumentIds => "document ids",
            Operation::DocumentCount => "document count",
            Operation::DocumentAll => "document scan",
            Operation::DocumentFind => "document find",
            Operation::DocumentRandom => "random document",
            Operation::Export => "collection export",
            Operation::Truncate => "collection truncate",
            Operation::IndexList => "index list",
            Operation::IndexCreate => "index create",
            Operation::IndexDelete => "index delete",
            Operation::EdgeList => "edge list",
            Operation::Query => "query",
            Operation::CursorFetch => "cursor fetch",
            Operation::CursorClose => "cursor close",
            Operation::Version => "server version",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of a failed server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub operation: Operation,
    pub status: u16,
    pub code: Option<i64>,
    pub message: String,
}

impl ServerError {
    pub fn from_response(operation: Operation, resp: &Response) -> Self {
        Self {
            operation,
            status: resp.status_code,
            code: resp.error_code,
            message: resp
                .error_message
                .clone()
                .unwrap_or_else(|| format!("HTTP {}", resp.status_code)),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(
                f,
                "{} failed: [HTTP {}][ERR {}] {}",
                self.operation, self.status, code, self.message
            ),
            None => write!(
                f,
                "{} failed: [HTTP {}] {}",
                self.operation, self.status, self.message
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve document identity: {0}")]
    IdentityParse(String),

    #[error("revision conflict: {0}")]
    RevisionConflict(ServerError),

    #[error("not found: {0}")]
    NotFound(ServerError),

    #[error("{0}")]
    Operation(ServerError),

    #[error("cursor state error: {0}")]
    CursorState(String),

    #[error("current cursor batch is empty")]
    EmptyBatch,

    #[error("cursor {id} returned {attempts} empty batches while reporting more results")]
    CursorStalled { id: String, attempts: u32 },

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a failed response.
    ///
    /// HTTP 412 and conflict errors become `RevisionConflict`, missing
    /// documents and cursors become `NotFound`, the rest `Operation`.
    pub fn server(operation: Operation, resp: &Response) -> Self {
        Self::classify(ServerError::from_response(operation, resp))
    }

    pub(crate) fn classify(err: ServerError) -> Self {
        if err.status == HTTP_PRECONDITION_FAILED || err.code == Some(ERROR_CONFLICT) {
            Error::RevisionConflict(err)
        } else if matches!(
            err.code,
            Some(ERROR_DOCUMENT_NOT_FOUND) | Some(ERROR_CURSOR_NOT_FOUND)
        ) {
            Error::NotFound(err)
        } else {
            Error::Operation(err)
        }
    }

    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Transport(err.into())
    }

    fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::RevisionConflict(e) | Error::NotFound(e) | Error::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Server error number carried by this error, if any
    pub fn server_code(&self) -> Option<i64> {
        self.server_error().and_then(|e| e.code)
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        self.server_error().map(|e| e.status)
    }

    /// Operation kind carried by this error, if any
    pub fn operation(&self) -> Option<Operation> {
        self.server_error().map(|e| e.operation)
    }

    pub fn is_revision_conflict(&self) -> bool {
        matches!(self, Error::RevisionConflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_precondition_failed_is_revision_conflict() {
        let resp = Response::new(
            412,
            json!({"errorNum": 1200, "errorMessage": "conflict, _rev values do not match"}),
        );
        let err = Error::server(Operation::DocumentUpdate, &resp);
        assert!(err.is_revision_conflict());
        assert_eq!(err.server_code(), Some(ERROR_CONFLICT));
        assert_eq!(err.operation(), Some(Operation::DocumentUpdate));
    }

    #[test]
    fn test_bare_precondition_failed_is_revision_conflict() {
        let resp = Response::new(412, json!({}));
        let err = Error::server(Operation::DocumentReplace, &resp);
        assert!(err.is_revision_conflict());
        assert_eq!(err.server_code(), None);
        assert_eq!(err.status(), Some(412));
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let resp = Response::new(
            404,
            json!({"errorNum": 1202, "errorMessage": "document not found"}),
        );
        let err = Error::server(Operation::DocumentDelete, &resp);
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_other_failures_are_operation_errors() {
        let resp = Response::new(
            409,
            json!({"errorNum": 1210, "errorMessage": "unique constraint violated"}),
        );
        let err = Error::server(Operation::DocumentInsert, &resp);
        assert!(matches!(err, Error::Operation(_)));
        assert_eq!(
            err.to_string(),
            "document insert failed: [HTTP 409][ERR 1210] unique constraint violated"
        );
    }

    #[test]
    fn test_message_falls_back_to_status() {
        let resp = Response::new(503, serde_json::Value::Null);
        let err = Error::server(Operation::Query, &resp);
        assert_eq!(err.to_string(), "query failed: [HTTP 503] HTTP 503");
        assert_eq!(err.server_code(), None);
    }
}
