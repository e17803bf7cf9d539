//! Named graphs: vertex and edge collections addressed through the graph API.
//!
//! Vertex and edge operations share one implementation, [`Elements`], which
//! differs only in the path segment and the response field the server wraps
//! documents in.

use std::fmt;
use std::sync::Arc;

use arangodb_core::bulk::rename_old_rev;
use arangodb_core::error::ERROR_DOCUMENT_NOT_FOUND;
use arangodb_core::handle;
use arangodb_core::{
    DocumentReference, Error, Json, Method, Operation, Request, Response, Result, Transport,
};
use serde_json::Value;

use crate::options::{DeleteOptions, InsertOptions, ReadOptions, ReplaceOptions, UpdateOptions};

/// Handle to a named graph
#[derive(Clone)]
pub struct Graph {
    transport: Arc<dyn Transport>,
    name: String,
}

impl Graph {
    pub fn new(transport: Arc<dyn Transport>, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_collection(&self, name: impl Into<String>) -> VertexCollection {
        VertexCollection {
            elements: Elements::new(self, name.into(), ElementKind::Vertex),
        }
    }

    pub fn edge_collection(&self, name: impl Into<String>) -> EdgeCollection {
        EdgeCollection {
            elements: Elements::new(self, name.into(), ElementKind::Edge),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
struct Elements {
    transport: Arc<dyn Transport>,
    graph: String,
    collection: String,
    kind: ElementKind,
}

impl Elements {
    fn new(graph: &Graph, collection: String, kind: ElementKind) -> Self {
        Self {
            transport: graph.transport.clone(),
            graph: graph.name.clone(),
            collection,
            kind,
        }
    }

    fn endpoint(&self, target: &str) -> String {
        format!("/_api/gharial/{}/{}/{}", self.graph, self.kind, target)
    }

    /// Unwrap the element metadata and carry `new`/`old` along with it
    fn unwrap_element(&self, resp: Response) -> Result<Json> {
        let mut body = resp.into_object();
        let mut element = match body.remove(self.kind.as_str()) {
            Some(Value::Object(element)) => element,
            _ => {
                return Err(Error::InvalidResponse(format!(
                    "graph response lacks \"{}\"",
                    self.kind
                )))
            }
        };
        rename_old_rev(&mut element);
        for extra in ["new", "old"] {
            if let Some(value) = body.remove(extra) {
                element.insert(extra.to_string(), value);
            }
        }
        Ok(element)
    }

    /// Metadata of a write; silent writes carry none
    fn write_result(&self, resp: Response, silent: bool) -> Result<Json> {
        if silent {
            return Ok(Json::new());
        }
        self.unwrap_element(resp)
    }

    async fn get(
        &self,
        reference: DocumentReference,
        options: &ReadOptions,
    ) -> Result<Option<Json>> {
        let (handle, revision) = handle::resolve(
            &self.collection,
            &reference,
            options.rev.as_deref(),
            options.check_rev,
        )?;

        let request = options.apply(
            Request::new(Method::Get, self.endpoint(handle.id())).headers(revision.to_headers()),
        );
        let resp = self.transport.send(request).await?;
        if resp.error_code == Some(ERROR_DOCUMENT_NOT_FOUND) {
            return Ok(None);
        }
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentGet, &resp));
        }
        self.unwrap_element(resp).map(Some)
    }

    async fn insert(&self, document: Json, options: &InsertOptions) -> Result<Json> {
        let document = handle::ensure_key_from_id(&self.collection, document)?;

        let request = Request::new(Method::Post, self.endpoint(&self.collection))
            .param("returnNew", options.return_new)
            .param("silent", options.silent)
            .param_opt("waitForSync", options.sync)
            .body(document);
        let resp = self.transport.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentInsert, &resp));
        }
        self.write_result(resp, options.silent)
    }

    async fn update(&self, document: Json, options: &UpdateOptions) -> Result<Json> {
        let (handle, revision) = handle::resolve(
            &self.collection,
            &DocumentReference::from(&document),
            None,
            options.check_rev,
        )?;

        let request = Request::new(Method::Patch, self.endpoint(handle.id()))
            .headers(revision.to_headers())
            .param("keepNull", options.keep_null)
            .param("overwrite", !options.check_rev)
            .param("silent", options.silent)
            .param("returnNew", options.return_new)
            .param("returnOld", options.return_old)
            .param_opt("waitForSync", options.sync)
            .body(document);
        let resp = self.transport.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentUpdate, &resp));
        }
        self.write_result(resp, options.silent)
    }

    async fn replace(&self, document: Json, options: &ReplaceOptions) -> Result<Json> {
        let (handle, revision) = handle::resolve(
            &self.collection,
            &DocumentReference::from(&document),
            None,
            options.check_rev,
        )?;

        let request = Request::new(Method::Put, self.endpoint(handle.id()))
            .headers(revision.to_headers())
            .param("silent", options.silent)
            .param("returnNew", options.return_new)
            .param("returnOld", options.return_old)
            .param_opt("waitForSync", options.sync)
            .body(document);
        let resp = self.transport.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentReplace, &resp));
        }
        self.write_result(resp, options.silent)
    }

    async fn delete(
        &self,
        reference: DocumentReference,
        options: &DeleteOptions,
    ) -> Result<Option<Json>> {
        let (handle, revision) = handle::resolve(
            &self.collection,
            &reference,
            options.rev.as_deref(),
            options.check_rev,
        )?;

        let request = Request::new(Method::Delete, self.endpoint(handle.id()))
            .headers(revision.to_headers())
            .param("returnOld", options.return_old)
            .param_opt("waitForSync", options.sync);
        let resp = self.transport.send(request).await?;

        if resp.error_code == Some(ERROR_DOCUMENT_NOT_FOUND) && options.ignore_missing {
            return Ok(None);
        }
        if !resp.is_success {
            return Err(Error::server(Operation::DocumentDelete, &resp));
        }

        let mut body = resp.into_object();
        let mut outcome = Json::new();
        outcome.insert(
            "removed".to_string(),
            body.remove("removed").unwrap_or(Value::Bool(true)),
        );
        if let Some(old) = body.remove("old") {
            outcome.insert("old".to_string(), old);
        }
        Ok(Some(outcome))
    }
}

/// Vertex collection of a graph
#[derive(Clone)]
pub struct VertexCollection {
    elements: Elements,
}

impl VertexCollection {
    pub fn name(&self) -> &str {
        &self.elements.collection
    }

    pub async fn get(
        &self,
        vertex: impl Into<DocumentReference>,
        options: &ReadOptions,
    ) -> Result<Option<Json>> {
        self.elements.get(vertex.into(), options).await
    }

    pub async fn insert(&self, vertex: Json, options: &InsertOptions) -> Result<Json> {
        self.elements.insert(vertex, options).await
    }

    pub async fn update(&self, vertex: Json, options: &UpdateOptions) -> Result<Json> {
        self.elements.update(vertex, options).await
    }

    pub async fn replace(&self, vertex: Json, options: &ReplaceOptions) -> Result<Json> {
        self.elements.replace(vertex, options).await
    }

    /// Delete a vertex along with its connected edges
    pub async fn delete(
        &self,
        vertex: impl Into<DocumentReference>,
        options: &DeleteOptions,
    ) -> Result<Option<Json>> {
        self.elements.delete(vertex.into(), options).await
    }
}

/// Which edges of a vertex to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    In,
    Out,
    #[default]
    Any,
}

/// Edges touching a vertex, with the server's scan statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeList {
    pub edges: Vec<Json>,
    pub filtered: u64,
    pub scanned_index: u64,
}

/// Edge collection of a graph
#[derive(Clone)]
pub struct EdgeCollection {
    elements: Elements,
}

impl EdgeCollection {
    pub fn name(&self) -> &str {
        &self.elements.collection
    }

    pub async fn get(
        &self,
        edge: impl Into<DocumentReference>,
        options: &ReadOptions,
    ) -> Result<Option<Json>> {
        self.elements.get(edge.into(), options).await
    }

    /// Insert an edge; the body must carry `_from` and `_to`
    pub async fn insert(&self, edge: Json, options: &InsertOptions) -> Result<Json> {
        self.elements.insert(edge, options).await
    }

    pub async fn update(&self, edge: Json, options: &UpdateOptions) -> Result<Json> {
        self.elements.update(edge, options).await
    }

    pub async fn replace(&self, edge: Json, options: &ReplaceOptions) -> Result<Json> {
        self.elements.replace(edge, options).await
    }

    pub async fn delete(
        &self,
        edge: impl Into<DocumentReference>,
        options: &DeleteOptions,
    ) -> Result<Option<Json>> {
        self.elements.delete(edge.into(), options).await
    }

    /// Connect two vertices. Both must be given by full document ID or by a
    /// body carrying `_id`; fields in `data` win over the derived endpoints.
    pub async fn link(
        &self,
        from: impl Into<DocumentReference>,
        to: impl Into<DocumentReference>,
        data: Option<Json>,
        options: &InsertOptions,
    ) -> Result<Json> {
        let mut edge = Json::new();
        edge.insert(
            "_from".to_string(),
            Value::String(handle::document_id(&from.into())?),
        );
        edge.insert(
            "_to".to_string(),
            Value::String(handle::document_id(&to.into())?),
        );
        if let Some(data) = data {
            edge.extend(data);
        }
        self.elements.insert(edge, options).await
    }

    /// Edges starting or ending at `vertex`
    pub async fn edges(
        &self,
        vertex: impl Into<DocumentReference>,
        direction: EdgeDirection,
    ) -> Result<EdgeList> {
        let vertex_id = handle::document_id(&vertex.into())?;

        let request = Request::new(
            Method::Get,
            format!("/_api/edges/{}", self.elements.collection),
        )
        .param("vertex", vertex_id)
        .param_opt(
            "direction",
            match direction {
                EdgeDirection::In => Some("in"),
                EdgeDirection::Out => Some("out"),
                EdgeDirection::Any => None,
            },
        );
        let resp = self.elements.transport.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::EdgeList, &resp));
        }

        let mut body = resp.into_object();
        let edges = match body.remove("edges") {
            Some(Value::Array(edges)) => edges
                .into_iter()
                .filter_map(|e| match e {
                    Value::Object(edge) => Some(edge),
                    _ => None,
                })
                .collect(),
            _ => {
                return Err(Error::InvalidResponse(
                    "edge list response lacks \"edges\"".to_string(),
                ))
            }
        };
        let stats = body.remove("stats").unwrap_or(Value::Null);
        Ok(EdgeList {
            edges,
            filtered: stats.get("filtered").and_then(Value::as_u64).unwrap_or(0),
            scanned_index: stats
                .get("scannedIndex")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arangodb_core::handle::IF_MATCH;
    use arangodb_core::ScriptedTransport;
    use serde_json::json;

    fn social(transport: &Arc<ScriptedTransport>) -> Graph {
        Graph::new(transport.clone(), "social")
    }

    fn obj(value: Value) -> Json {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_vertex_get_unwraps_element() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(
                200,
                json!({"error": false, "code": 200, "vertex": {"_id": "people/ann", "name": "Ann"}}),
            )
            .push(404, json!({"error": true, "errorNum": 1202, "errorMessage": "not found"}));

        let people = social(&transport).vertex_collection("people");
        let ann = people.get("ann", &ReadOptions::new()).await.unwrap().unwrap();
        assert_eq!(ann.get("name"), Some(&json!("Ann")));
        assert!(people.get("nobody", &ReadOptions::new()).await.unwrap().is_none());

        assert_eq!(
            transport.requests()[0].endpoint,
            "/_api/gharial/social/vertex/people/ann"
        );
    }

    #[tokio::test]
    async fn test_vertex_update_sends_revision_and_merges_new() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            202,
            json!({
                "vertex": {"_id": "people/ann", "_key": "ann", "_rev": "_2", "_oldRev": "_1"},
                "new": {"_id": "people/ann", "age": 40}
            }),
        );

        let options = UpdateOptions {
            return_new: true,
            ..UpdateOptions::default()
        };
        let meta = social(&transport)
            .vertex_collection("people")
            .update(obj(json!({"_key": "ann", "_rev": "_1", "age": 40})), &options)
            .await
            .unwrap();
        assert_eq!(meta.get("_old_rev"), Some(&json!("_1")));
        assert_eq!(meta["new"]["age"], json!(40));

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.headers.get(IF_MATCH).map(String::as_str), Some("_1"));
    }

    #[tokio::test]
    async fn test_vertex_writes_forward_silent_and_overwrite() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(202, json!({"error": false, "code": 202}))
            .push(202, json!({"error": false, "code": 202}));

        let people = social(&transport).vertex_collection("people");
        let update = UpdateOptions {
            check_rev: false,
            silent: true,
            ..UpdateOptions::default()
        };
        let meta = people
            .update(obj(json!({"_key": "ann", "_rev": "_1", "age": 41})), &update)
            .await
            .unwrap();
        assert!(meta.is_empty());

        let replace = ReplaceOptions {
            silent: true,
            ..ReplaceOptions::default()
        };
        let meta = people
            .replace(obj(json!({"_key": "ann", "_rev": "_1"})), &replace)
            .await
            .unwrap();
        assert!(meta.is_empty());

        let requests = transport.requests();
        let param = |i: usize, name: &str| requests[i].params.get(name).cloned();
        assert_eq!(param(0, "overwrite").as_deref(), Some("true"));
        assert_eq!(param(0, "silent").as_deref(), Some("true"));
        assert!(requests[0].headers.is_empty());
        assert_eq!(param(1, "silent").as_deref(), Some("true"));
        assert_eq!(
            requests[1].headers.get(IF_MATCH).map(String::as_str),
            Some("_1")
        );
    }

    #[tokio::test]
    async fn test_edge_delete_returns_old() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            202,
            json!({"error": false, "removed": true, "old": {"_id": "knows/1"}}),
        );

        let options = DeleteOptions {
            return_old: true,
            ..DeleteOptions::default()
        };
        let outcome = social(&transport)
            .edge_collection("knows")
            .delete("knows/1", &options)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.get("removed"), Some(&json!(true)));
        assert_eq!(outcome["old"]["_id"], json!("knows/1"));
        assert_eq!(
            transport.requests()[0].endpoint,
            "/_api/gharial/social/edge/knows/1"
        );
    }

    #[tokio::test]
    async fn test_link_requires_full_ids() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(202, json!({"edge": {"_id": "knows/9", "_key": "9", "_rev": "_1"}}));

        let knows = social(&transport).edge_collection("knows");
        let err = knows
            .link("ann", "people/bob", None, &InsertOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdentityParse(_)));
        assert_eq!(transport.request_count(), 0);

        let data = obj(json!({"since": 2020}));
        let ann = obj(json!({"_id": "people/ann", "name": "Ann"}));
        knows
            .link(ann, "people/bob", Some(data), &InsertOptions::default())
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.endpoint, "/_api/gharial/social/edge/knows");
        assert_eq!(
            request.body,
            Some(json!({"_from": "people/ann", "_to": "people/bob", "since": 2020}))
        );
    }

    #[tokio::test]
    async fn test_edges_lists_with_stats() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            200,
            json!({
                "edges": [{"_id": "knows/1", "_from": "people/ann", "_to": "people/bob"}],
                "stats": {"filtered": 0, "scannedIndex": 2}
            }),
        );

        let list = social(&transport)
            .edge_collection("knows")
            .edges("people/ann", EdgeDirection::Out)
            .await
            .unwrap();
        assert_eq!(list.edges.len(), 1);
        assert_eq!(list.scanned_index, 2);

        let request = &transport.requests()[0];
        assert_eq!(request.endpoint, "/_api/edges/knows");
        assert_eq!(request.params.get("vertex").map(String::as_str), Some("people/ann"));
        assert_eq!(request.params.get("direction").map(String::as_str), Some("out"));
    }
}
