use std::sync::Arc;

use arangodb_core::bulk::{self, rename_old_rev};
use arangodb_core::error::{ERROR_DOCUMENT_NOT_FOUND, ERROR_INDEX_NOT_FOUND};
use arangodb_core::handle::{self, RevisionHeader};
use arangodb_core::{
    CanonicalHandle, Cursor, CursorConfig, CursorType, DocumentReference, Error, Json, Method,
    Operation, Request, Response, Result, Transport,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::options::{
    DeleteOptions, ExportOptions, FieldFilter, InsertOptions, ReadOptions, ReplaceOptions,
    UpdateOptions,
};

/// Document collection API
#[derive(Clone)]
pub struct Collection {
    transport: Arc<dyn Transport>,
    name: String,
    cursor_config: CursorConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest<'a> {
    count: bool,
    flush: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    flush_wait: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    restrict: Option<Restrict<'a>>,
}

#[derive(Serialize)]
struct Restrict<'a> {
    fields: &'a [String],
    #[serde(rename = "type")]
    kind: &'static str,
}

impl Collection {
    pub fn new(
        transport: Arc<dyn Transport>,
        name: impl Into<String>,
        cursor_config: CursorConfig,
    ) -> Self {
        Self {
            transport,
            name: name.into(),
            cursor_config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a reference against this collection
    pub fn resolve(
        &self,
        reference: &DocumentReference,
        rev: Option<&str>,
        check_rev: bool,
    ) -> Result<(CanonicalHandle, RevisionHeader)> {
        handle::resolve(&self.name, reference, rev, check_rev)
    }

    async fn send(&self, request: Request) -> Result<Response> {
        self.transport.send(request).await
    }

    fn open_cursor(&self, body: Value, cursor_type: CursorType) -> Result<Cursor> {
        Cursor::new(
            self.transport.clone(),
            body,
            cursor_type,
            &self.cursor_config,
        )
    }

    async fn cursor_request(&self, operation: Operation, request: Request) -> Result<Cursor> {
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(operation, &resp));
        }
        self.open_cursor(resp.body, CursorType::Query)
    }

    /// Total number of documents
    pub async fn count(&self) -> Result<u64> {
        let request = Request::new(
            Method::Get,
            format!("/_api/collection/{}/count", self.name),
        );
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentCount, &resp));
        }
        resp.body
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::InvalidResponse("count response lacks \"count\"".to_string()))
    }

    /// Delete all documents
    pub async fn truncate(&self) -> Result<bool> {
        let request = Request::new(
            Method::Put,
            format!("/_api/collection/{}/truncate", self.name),
        );
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::Truncate, &resp));
        }
        Ok(true)
    }

    /// Fetch a document, or `None` if it does not exist
    pub async fn get(
        &self,
        document: impl Into<DocumentReference>,
        options: &ReadOptions,
    ) -> Result<Option<Json>> {
        let document = document.into();
        let (handle, revision) =
            self.resolve(&document, options.rev.as_deref(), options.check_rev)?;

        let request = options.apply(
            Request::new(Method::Get, format!("/_api/document/{}", handle))
                .headers(revision.to_headers()),
        );
        let resp = self.send(request).await?;

        if resp.error_code == Some(ERROR_DOCUMENT_NOT_FOUND) {
            return Ok(None);
        }
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentGet, &resp));
        }
        Ok(Some(resp.into_object()))
    }

    /// Whether a document exists (and matches the revision, if checked)
    pub async fn has(
        &self,
        document: impl Into<DocumentReference>,
        options: &ReadOptions,
    ) -> Result<bool> {
        let document = document.into();
        let (handle, revision) =
            self.resolve(&document, options.rev.as_deref(), options.check_rev)?;

        let request = options.apply(
            Request::new(Method::Get, format!("/_api/document/{}", handle))
                .headers(revision.to_headers()),
        );
        let resp = self.send(request).await?;

        if resp.error_code == Some(ERROR_DOCUMENT_NOT_FOUND) {
            return Ok(false);
        }
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentHas, &resp));
        }
        Ok(true)
    }

    /// Fetch several documents at once; missing ones are left out
    pub async fn get_many(
        &self,
        documents: &[DocumentReference],
        allow_dirty_read: bool,
    ) -> Result<Vec<Json>> {
        let ids = documents
            .iter()
            .map(|d| {
                self.resolve(d, None, false)
                    .map(|(handle, _)| Value::String(handle.id().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let request = ReadOptions::new().allow_dirty_read(allow_dirty_read).apply(
            Request::new(Method::Put, format!("/_api/document/{}", self.name))
                .param("onlyget", true)
                .body(ids),
        );
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentGet, &resp));
        }

        match resp.body {
            Value::Array(entries) => Ok(entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::Object(doc) if doc.contains_key("_id") => Some(doc),
                    _ => None,
                })
                .collect()),
            _ => Err(Error::InvalidResponse(
                "multi-document read must return an array".to_string(),
            )),
        }
    }

    /// Insert a document and return its metadata (empty when silent)
    pub async fn insert(&self, document: Json, options: &InsertOptions) -> Result<Json> {
        let document = handle::ensure_key_from_id(&self.name, document)?;

        let request = options.apply(
            Request::new(Method::Post, format!("/_api/document/{}", self.name)).body(document),
        );
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentInsert, &resp));
        }
        Ok(write_result(resp))
    }

    /// Partially update a document identified by its `_id` or `_key`
    pub async fn update(&self, document: Json, options: &UpdateOptions) -> Result<Json> {
        let (handle, revision) =
            self.resolve(&DocumentReference::from(&document), None, options.check_rev)?;

        let request = options.apply(
            Request::new(Method::Patch, format!("/_api/document/{}", handle))
                .headers(revision.to_headers())
                .body(document),
        );
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentUpdate, &resp));
        }
        Ok(write_result(resp))
    }

    /// Replace a document identified by its `_id` or `_key`
    pub async fn replace(&self, document: Json, options: &ReplaceOptions) -> Result<Json> {
        let (handle, revision) =
            self.resolve(&DocumentReference::from(&document), None, options.check_rev)?;

        let request = options.apply(
            Request::new(Method::Put, format!("/_api/document/{}", handle))
                .headers(revision.to_headers())
                .body(document),
        );
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentReplace, &resp));
        }
        Ok(write_result(resp))
    }

    /// Delete a document.
    ///
    /// Returns `None` when the document is missing and `ignore_missing` is
    /// set; otherwise a missing document is a `NotFound` error.
    pub async fn delete(
        &self,
        document: impl Into<DocumentReference>,
        options: &DeleteOptions,
    ) -> Result<Option<Json>> {
        let document = document.into();
        let (handle, revision) =
            self.resolve(&document, options.rev.as_deref(), options.check_rev)?;

        let request = options.apply(
            Request::new(Method::Delete, format!("/_api/document/{}", handle))
                .headers(revision.to_headers()),
        );
        let resp = self.send(request).await?;

        if resp.error_code == Some(ERROR_DOCUMENT_NOT_FOUND) && options.ignore_missing {
            return Ok(None);
        }
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentDelete, &resp));
        }
        Ok(Some(write_result(resp)))
    }

    async fn bulk(
        &self,
        operation: Operation,
        request: Request,
        documents: usize,
        silent: bool,
    ) -> Result<Vec<Result<Json>>> {
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(operation, &resp));
        }

        let expected = if silent { None } else { Some(documents) };
        let results = bulk::reconcile(operation, resp.status_code, resp.body, expected)?;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(
                collection = %self.name,
                operation = %operation,
                failed,
                total = documents,
                "bulk operation finished with per-document failures"
            );
        }
        Ok(results)
    }

    /// Insert many documents.
    ///
    /// Failures of individual documents do not fail the call: each slot of
    /// the result holds either that document's metadata or its error.
    pub async fn insert_many(
        &self,
        documents: Vec<Json>,
        options: &InsertOptions,
    ) -> Result<Vec<Result<Json>>> {
        let documents = documents
            .into_iter()
            .map(|d| handle::ensure_key_from_id(&self.name, d).map(Value::Object))
            .collect::<Result<Vec<_>>>()?;
        let len = documents.len();

        let request = options.apply(
            Request::new(Method::Post, format!("/_api/document/{}", self.name))
                .body(documents),
        );
        self.bulk(Operation::DocumentInsert, request, len, options.silent)
            .await
    }

    /// Update many documents; see [`Collection::insert_many`] for results
    pub async fn update_many(
        &self,
        documents: Vec<Json>,
        options: &UpdateOptions,
    ) -> Result<Vec<Result<Json>>> {
        let documents = documents
            .into_iter()
            .map(|d| handle::ensure_key_in_body(&self.name, d).map(Value::Object))
            .collect::<Result<Vec<_>>>()?;
        let len = documents.len();

        let request = options.apply(
            Request::new(Method::Patch, format!("/_api/document/{}", self.name))
                .body(documents),
        );
        self.bulk(Operation::DocumentUpdate, request, len, options.silent)
            .await
    }

    /// Replace many documents; see [`Collection::insert_many`] for results
    pub async fn replace_many(
        &self,
        documents: Vec<Json>,
        options: &ReplaceOptions,
    ) -> Result<Vec<Result<Json>>> {
        let documents = documents
            .into_iter()
            .map(|d| handle::ensure_key_in_body(&self.name, d).map(Value::Object))
            .collect::<Result<Vec<_>>>()?;
        let len = documents.len();

        let request = options.apply(
            Request::new(Method::Put, format!("/_api/document/{}", self.name))
                .body(documents),
        );
        self.bulk(Operation::DocumentReplace, request, len, options.silent)
            .await
    }

    /// Delete many documents; see [`Collection::insert_many`] for results
    pub async fn delete_many(
        &self,
        documents: Vec<DocumentReference>,
        options: &DeleteOptions,
    ) -> Result<Vec<Result<Json>>> {
        let selectors = documents
            .into_iter()
            .map(|d| match d {
                DocumentReference::Body(body) => {
                    handle::ensure_key_in_body(&self.name, body).map(Value::Object)
                }
                other => self
                    .resolve(&other, None, false)
                    .map(|(handle, _)| Value::String(handle.key().to_string())),
            })
            .collect::<Result<Vec<_>>>()?;
        let len = selectors.len();

        let request = options.apply(
            Request::new(Method::Delete, format!("/_api/document/{}", self.name))
                .body(selectors),
        );
        self.bulk(Operation::DocumentDelete, request, len, options.silent)
            .await
    }

    /// Cursor over the keys of all documents
    pub async fn keys(&self) -> Result<Cursor> {
        let request = Request::new(Method::Put, "/_api/simple/all-keys")
            .body(json!({"collection": self.name, "type": "key"}));
        self.cursor_request(Operation::DocumentKeys, request).await
    }

    /// Cursor over the IDs of all documents
    pub async fn ids(&self) -> Result<Cursor> {
        let request = Request::new(Method::Put, "/_api/simple/all-keys")
            .body(json!({"collection": self.name, "type": "id"}));
        self.cursor_request(Operation::DocumentIds, request).await
    }

    /// Cursor over all documents
    pub async fn all(&self, skip: Option<u64>, limit: Option<u64>) -> Result<Cursor> {
        let mut data = Json::new();
        data.insert("collection".to_string(), json!(self.name));
        if let Some(skip) = skip {
            data.insert("skip".to_string(), json!(skip));
        }
        if let Some(limit) = limit {
            data.insert("limit".to_string(), json!(limit));
        }
        if let Some(batch_size) = self.cursor_config.batch_size {
            data.insert("batchSize".to_string(), json!(batch_size));
        }

        let request = Request::new(Method::Put, "/_api/simple/all").body(data);
        self.cursor_request(Operation::DocumentAll, request).await
    }

    /// Cursor over documents matching all fields of `filters`
    pub async fn find(
        &self,
        filters: Json,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Cursor> {
        let mut data = Json::new();
        data.insert("collection".to_string(), json!(self.name));
        data.insert("example".to_string(), Value::Object(filters));
        if let Some(skip) = skip {
            data.insert("skip".to_string(), json!(skip));
        }
        if let Some(limit) = limit {
            data.insert("limit".to_string(), json!(limit));
        }

        let request = Request::new(Method::Put, "/_api/simple/by-example").body(data);
        self.cursor_request(Operation::DocumentFind, request).await
    }

    /// Export all documents through an export cursor
    pub async fn export(&self, options: &ExportOptions) -> Result<Cursor> {
        let restrict = options.filter.as_ref().map(|filter| match filter {
            FieldFilter::Include(fields) => Restrict {
                fields,
                kind: "include",
            },
            FieldFilter::Exclude(fields) => Restrict {
                fields,
                kind: "exclude",
            },
        });
        let data = ExportRequest {
            count: options.count,
            flush: options.flush,
            flush_wait: options.flush_wait,
            batch_size: options.batch_size.or(self.cursor_config.batch_size),
            limit: options.limit,
            ttl: options.ttl.or(self.cursor_config.ttl_secs),
            restrict,
        };

        let request = Request::new(Method::Post, "/_api/export")
            .param("collection", &self.name)
            .body(serde_json::to_value(&data)?);
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::Export, &resp));
        }
        self.open_cursor(resp.body, CursorType::Export)
    }

    /// A random document
    pub async fn random(&self) -> Result<Json> {
        let request = Request::new(Method::Put, "/_api/simple/any")
            .body(json!({"collection": self.name}));
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentRandom, &resp));
        }
        match resp.into_object().remove("document") {
            Some(Value::Object(doc)) => Ok(doc),
            _ => Err(Error::InvalidResponse(
                "random document response lacks \"document\"".to_string(),
            )),
        }
    }

    /// Indexes defined on the collection
    pub async fn indexes(&self) -> Result<Vec<Value>> {
        let request = Request::new(Method::Get, "/_api/index").param("collection", &self.name);
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::IndexList, &resp));
        }
        match resp.into_object().remove("indexes") {
            Some(Value::Array(indexes)) => Ok(indexes),
            _ => Err(Error::InvalidResponse(
                "index list response lacks \"indexes\"".to_string(),
            )),
        }
    }

    /// Create an index from a raw definition (`{"type": "persistent", ...}`)
    pub async fn add_index(&self, definition: Json) -> Result<Json> {
        let request = Request::new(Method::Post, "/_api/index")
            .param("collection", &self.name)
            .body(definition);
        let resp = self.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::IndexCreate, &resp));
        }
        Ok(resp.into_object())
    }

    /// Drop an index; `false` when it was missing and `ignore_missing` is set
    pub async fn delete_index(&self, index_id: &str, ignore_missing: bool) -> Result<bool> {
        let id = index_id.rsplit('/').next().unwrap_or(index_id);
        let request = Request::new(
            Method::Delete,
            format!("/_api/index/{}/{}", self.name, id),
        );
        let resp = self.send(request).await?;
        if resp.error_code == Some(ERROR_INDEX_NOT_FOUND) && ignore_missing {
            return Ok(false);
        }
        if !resp.is_success {
            return Err(Error::server(Operation::IndexDelete, &resp));
        }
        Ok(true)
    }
}

/// Metadata of a single-document write with `_oldRev` renamed
fn write_result(resp: Response) -> Json {
    let mut meta = resp.into_object();
    rename_old_rev(&mut meta);
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use arangodb_core::error::{ERROR_CONFLICT, ERROR_UNIQUE_CONSTRAINT_VIOLATED};
    use arangodb_core::handle::IF_MATCH;
    use arangodb_core::ScriptedTransport;

    fn obj(value: Value) -> Json {
        value.as_object().cloned().unwrap()
    }

    fn users(transport: &Arc<ScriptedTransport>) -> Collection {
        Collection::new(transport.clone(), "users", CursorConfig::default())
    }

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            404,
            json!({"error": true, "errorNum": 1202, "errorMessage": "document not found"}),
        );

        let doc = users(&transport).get("alice", &ReadOptions::new()).await.unwrap();
        assert!(doc.is_none());
        assert_eq!(transport.requests()[0].endpoint, "/_api/document/users/alice");
    }

    #[tokio::test]
    async fn test_get_sends_explicit_revision() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(200, json!({"_id": "users/alice", "_key": "alice", "_rev": "_b"}));

        let reference = obj(json!({"_id": "users/alice", "_rev": "_a"}));
        let options = ReadOptions::new().rev("_b").allow_dirty_read(true);
        let doc = users(&transport).get(reference, &options).await.unwrap();
        assert_eq!(doc.unwrap().get("_rev"), Some(&json!("_b")));

        let request = &transport.requests()[0];
        assert_eq!(request.headers.get(IF_MATCH).map(String::as_str), Some("_b"));
        assert_eq!(
            request
                .headers
                .get("x-arango-allow-dirty-read")
                .map(String::as_str),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_get_revision_mismatch_is_conflict() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            412,
            json!({"error": true, "errorNum": 1200, "errorMessage": "conflict"}),
        );
        let err = users(&transport)
            .get("alice", &ReadOptions::new().rev("_x"))
            .await
            .unwrap_err();
        assert!(err.is_revision_conflict());
    }

    #[tokio::test]
    async fn test_wrong_collection_fails_before_sending() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = users(&transport)
            .get("orders/1", &ReadOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdentityParse(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_has() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(200, json!({"_id": "users/alice"}))
            .push(404, json!({"errorNum": 1202, "errorMessage": "document not found"}));

        let col = users(&transport);
        assert!(col.has("alice", &ReadOptions::new()).await.unwrap());
        assert!(!col.has("bob", &ReadOptions::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_uses_embedded_revision() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            201,
            json!({"_id": "users/alice", "_key": "alice", "_rev": "_n", "_oldRev": "_o"}),
        );

        let doc = obj(json!({"_key": "alice", "_rev": "_o", "age": 31}));
        let meta = users(&transport)
            .update(doc, &UpdateOptions::default())
            .await
            .unwrap();
        assert_eq!(meta.get("_old_rev"), Some(&json!("_o")));

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.endpoint, "/_api/document/users/alice");
        assert_eq!(request.headers.get(IF_MATCH).map(String::as_str), Some("_o"));
        assert_eq!(
            request.params.get("ignoreRevs").map(String::as_str),
            Some("false")
        );
    }

    #[tokio::test]
    async fn test_replace_without_rev_check_sends_no_header() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(202, json!({"_id": "users/alice", "_key": "alice", "_rev": "_n"}));

        let options = ReplaceOptions {
            check_rev: false,
            ..ReplaceOptions::default()
        };
        let doc = obj(json!({"_id": "users/alice", "_rev": "_o"}));
        users(&transport).replace(doc, &options).await.unwrap();

        let request = &transport.requests()[0];
        assert!(request.headers.is_empty());
        assert_eq!(request.params.get("ignoreRevs").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let not_found = json!({"error": true, "errorNum": 1202, "errorMessage": "document not found"});
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(404, not_found.clone()).push(404, not_found);

        let col = users(&transport);
        let ignore = DeleteOptions {
            ignore_missing: true,
            ..DeleteOptions::default()
        };
        assert_eq!(col.delete("ghost", &ignore).await.unwrap(), None);

        let err = col
            .delete("ghost", &DeleteOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Some(Operation::DocumentDelete));
    }

    #[tokio::test]
    async fn test_insert_many_reports_failures_per_slot() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            202,
            json!([
                {"_id": "users/a", "_key": "a", "_rev": "_1"},
                {"_id": "users/b", "_key": "b", "_rev": "_1"},
                {"error": true, "errorNum": 1210, "errorMessage": "unique constraint violated"},
                {"_id": "users/d", "_key": "d", "_rev": "_1"}
            ]),
        );

        let docs = vec![
            obj(json!({"_key": "a"})),
            obj(json!({"_key": "b"})),
            obj(json!({"_key": "a"})),
            obj(json!({"_id": "users/d"})),
        ];
        let results = users(&transport)
            .insert_many(docs, &InsertOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok() && results[1].is_ok() && results[3].is_ok());
        assert_eq!(
            results[2].as_ref().unwrap_err().server_code(),
            Some(ERROR_UNIQUE_CONSTRAINT_VIOLATED)
        );

        // keys are derived from ids before sending
        let sent = transport.requests()[0].body.clone().unwrap();
        assert_eq!(sent[3]["_key"], json!("d"));
    }

    #[tokio::test]
    async fn test_bulk_request_failure_fails_whole_call() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            400,
            json!({"error": true, "errorNum": 600, "errorMessage": "invalid JSON"}),
        );
        let err = users(&transport)
            .insert_many(vec![obj(json!({"a": 1}))], &InsertOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.server_code(), Some(600));
        assert_eq!(err.operation(), Some(Operation::DocumentInsert));
    }

    #[tokio::test]
    async fn test_update_many_requires_identity() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = users(&transport)
            .update_many(vec![obj(json!({"age": 1}))], &UpdateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdentityParse(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_many_distinguishes_conflicts() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            202,
            json!([
                {"_id": "users/a", "_key": "a", "_rev": "_1"},
                {"error": true, "errorNum": 1200, "errorMessage": "conflict"},
                {"error": true, "errorNum": 1202, "errorMessage": "document not found"}
            ]),
        );

        let refs = vec![
            DocumentReference::from("a"),
            DocumentReference::from(obj(json!({"_id": "users/b", "_rev": "_0"}))),
            DocumentReference::from("users/c"),
        ];
        let results = users(&transport)
            .delete_many(refs, &DeleteOptions::default())
            .await
            .unwrap();

        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().is_revision_conflict());
        assert_eq!(
            results[1].as_ref().unwrap_err().server_code(),
            Some(ERROR_CONFLICT)
        );
        assert!(results[2].as_ref().unwrap_err().is_not_found());

        let sent = transport.requests()[0].body.clone().unwrap();
        assert_eq!(sent[0], json!("a"));
        assert_eq!(sent[1]["_key"], json!("b"));
        assert_eq!(sent[2], json!("c"));
    }

    #[tokio::test]
    async fn test_keys_cursor_fetches_more() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(201, json!({"id": "77", "result": ["a"], "hasMore": true}))
            .push(200, json!({"id": "77", "result": ["b"], "hasMore": false}));

        let mut cursor = users(&transport).keys().await.unwrap();
        assert_eq!(cursor.collect_remaining().await.unwrap(), vec![json!("a"), json!("b")]);

        let requests = transport.requests();
        assert_eq!(requests[0].endpoint, "/_api/simple/all-keys");
        assert_eq!(requests[0].body.as_ref().unwrap()["type"], json!("key"));
        assert_eq!(requests[1].endpoint, "/_api/cursor/77");
    }

    #[tokio::test]
    async fn test_export_builds_restrict_and_export_cursor() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(201, json!({"id": "x1", "result": [{"_key": "a"}], "hasMore": true, "count": 2}))
            .push(200, json!({"id": "x1", "result": [{"_key": "b"}], "hasMore": false}));

        let options = ExportOptions {
            count: true,
            batch_size: Some(1),
            filter: Some(FieldFilter::Include(vec!["_key".to_string()])),
            ..ExportOptions::default()
        };
        let mut cursor = users(&transport).export(&options).await.unwrap();
        assert_eq!(cursor.cursor_type(), CursorType::Export);
        assert_eq!(cursor.count(), Some(2));
        assert_eq!(cursor.collect_remaining().await.unwrap().len(), 2);

        let requests = transport.requests();
        let body = requests[0].body.clone().unwrap();
        assert_eq!(requests[0].params.get("collection").map(String::as_str), Some("users"));
        assert_eq!(body["batchSize"], json!(1));
        assert_eq!(body["restrict"], json!({"fields": ["_key"], "type": "include"}));
        assert!(body.get("limit").is_none());
        assert_eq!(requests[1].endpoint, "/_api/export/x1");
    }

    #[tokio::test]
    async fn test_delete_index_ignore_missing() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            404,
            json!({"error": true, "errorNum": 1212, "errorMessage": "index not found"}),
        );
        let deleted = users(&transport)
            .delete_index("users/123", true)
            .await
            .unwrap();
        assert!(!deleted);
        assert_eq!(transport.requests()[0].endpoint, "/_api/index/users/123");
    }

    #[tokio::test]
    async fn test_count() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(200, json!({"count": 12, "name": "users"}));
        assert_eq!(users(&transport).count().await.unwrap(), 12);
    }
}
