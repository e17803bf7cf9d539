//! Per-document results of bulk insert/update/replace/delete calls.
//!
//! The server answers a bulk call with one entry per input document, in
//! input order. Each entry is either document metadata or an embedded error
//! object. Entries are classified once here, and failures become error
//! values in their slot instead of failing the whole call.

use serde_json::Value;

use crate::error::{Error, Operation, Result, ServerError};
use crate::models::Json;

/// One classified entry of a bulk response
#[derive(Debug, Clone, PartialEq)]
pub enum BulkEntry {
    /// Document metadata (`_id`, `_key`, `_rev`, ...)
    Success(Json),
    /// Embedded server error for this document
    Failure {
        code: i64,
        message: String,
        body: Json,
    },
}

impl BulkEntry {
    pub fn classify(value: Value) -> Result<Self> {
        let mut body = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidResponse(format!(
                    "bulk entry must be an object, got {}",
                    other
                )))
            }
        };

        if body.contains_key("_id") {
            rename_old_rev(&mut body);
            return Ok(BulkEntry::Success(body));
        }

        match body.get("errorNum").and_then(Value::as_i64) {
            Some(code) => {
                let message = body
                    .get("errorMessage")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(BulkEntry::Failure {
                    code,
                    message,
                    body,
                })
            }
            None => Err(Error::InvalidResponse(
                "bulk entry carries neither \"_id\" nor \"errorNum\"".to_string(),
            )),
        }
    }

    /// Turn the entry into the per-slot result handed to callers.
    ///
    /// Conflicts are reported as `RevisionConflict` so callers can retry
    /// them, every other failure as an `Operation` error of `operation`.
    pub fn into_result(self, operation: Operation, status: u16) -> Result<Json> {
        match self {
            BulkEntry::Success(meta) => Ok(meta),
            BulkEntry::Failure { code, message, .. } => Err(Error::classify(ServerError {
                operation,
                status,
                code: Some(code),
                message,
            })),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BulkEntry::Success(_))
    }
}

/// Reconcile a successful bulk response into one result per input document.
///
/// `expected` is the number of input documents; pass `None` when the server
/// was asked to stay silent and may omit entries.
pub fn reconcile(
    operation: Operation,
    status: u16,
    body: Value,
    expected: Option<usize>,
) -> Result<Vec<Result<Json>>> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Null | Value::Object(_) if expected.is_none() => Vec::new(),
        other => {
            return Err(Error::InvalidResponse(format!(
                "bulk response must be an array, got {}",
                other
            )))
        }
    };

    if let Some(expected) = expected {
        if entries.len() != expected {
            return Err(Error::InvalidResponse(format!(
                "bulk response has {} entries for {} documents",
                entries.len(),
                expected
            )));
        }
    }

    let classified = entries
        .into_iter()
        .map(BulkEntry::classify)
        .collect::<Result<Vec<_>>>()?;

    Ok(classified
        .into_iter()
        .map(|entry| entry.into_result(operation, status))
        .collect())
}

/// Rename `_oldRev` to `_old_rev` in write metadata
pub fn rename_old_rev(meta: &mut Json) {
    if let Some(old_rev) = meta.remove("_oldRev") {
        meta.insert("_old_rev".to_string(), old_rev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ERROR_CONFLICT, ERROR_UNIQUE_CONSTRAINT_VIOLATED};
    use serde_json::json;

    fn meta(key: &str) -> Value {
        json!({"_id": format!("users/{}", key), "_key": key, "_rev": "_r1"})
    }

    #[test]
    fn test_failure_in_middle_keeps_length_and_order() {
        let body = json!([
            meta("a"),
            meta("b"),
            {"error": true, "errorNum": 1210, "errorMessage": "unique constraint violated"},
            meta("d"),
        ]);

        let results = reconcile(Operation::DocumentInsert, 202, body, Some(4)).unwrap();
        assert_eq!(results.len(), 4);
        for i in [0, 1, 3] {
            assert!(results[i].is_ok(), "slot {} should succeed", i);
        }
        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.server_code(), Some(ERROR_UNIQUE_CONSTRAINT_VIOLATED));
        assert_eq!(err.operation(), Some(Operation::DocumentInsert));
        assert!(!err.is_revision_conflict());
        assert_eq!(
            results[3].as_ref().unwrap().get("_key"),
            Some(&json!("d"))
        );
    }

    #[test]
    fn test_conflict_entries_are_revision_conflicts() {
        let body = json!([
            {"error": true, "errorNum": 1200, "errorMessage": "conflict, _rev values do not match"},
        ]);
        let results = reconcile(Operation::DocumentReplace, 202, body, Some(1)).unwrap();
        let err = results[0].as_ref().unwrap_err();
        assert!(err.is_revision_conflict());
        assert_eq!(err.server_code(), Some(ERROR_CONFLICT));
    }

    #[test]
    fn test_old_rev_is_renamed() {
        let body = json!([{"_id": "users/a", "_key": "a", "_rev": "_r2", "_oldRev": "_r1"}]);
        let results = reconcile(Operation::DocumentUpdate, 202, body, Some(1)).unwrap();
        let meta = results[0].as_ref().unwrap();
        assert_eq!(meta.get("_old_rev"), Some(&json!("_r1")));
        assert!(!meta.contains_key("_oldRev"));
    }

    #[test]
    fn test_length_mismatch_is_invalid() {
        let body = json!([meta("a")]);
        assert!(matches!(
            reconcile(Operation::DocumentDelete, 202, body, Some(2)),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_silent_accepts_missing_entries() {
        let results = reconcile(Operation::DocumentInsert, 202, json!({}), None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_unclassifiable_entry_is_invalid() {
        assert!(matches!(
            BulkEntry::classify(json!({"_key": "a"})),
            Err(Error::InvalidResponse(_))
        ));
        assert!(matches!(
            BulkEntry::classify(json!("users/a")),
            Err(Error::InvalidResponse(_))
        ));
        assert!(BulkEntry::classify(meta("a")).unwrap().is_success());
    }
}
