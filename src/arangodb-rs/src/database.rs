use std::sync::Arc;

use arangodb_core::{
    Cursor, CursorConfig, CursorType, Error, Json, Method, Operation, Request, Result, Transport,
};
use serde::Serialize;
use serde_json::Value;

use crate::collection::Collection;
use crate::graph::Graph;
use crate::options::QueryOptions;

/// Handle to one database; cheap to clone
#[derive(Clone)]
pub struct Database {
    transport: Arc<dyn Transport>,
    name: String,
    cursor_config: CursorConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bind_vars: Option<&'a Json>,
    count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u64>,
    #[serde(skip_serializing_if = "QueryExtras::is_empty")]
    options: QueryExtras,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct QueryExtras {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_warning_count: Option<u32>,
}

impl QueryExtras {
    fn is_empty(&self) -> bool {
        self.full_count.is_none() && self.profile.is_none() && self.max_warning_count.is_none()
    }
}

impl Database {
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

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(self.transport.clone(), name, self.cursor_config.clone())
    }

    pub fn graph(&self, name: impl Into<String>) -> Graph {
        Graph::new(self.transport.clone(), name)
    }

    /// Run an AQL query and return a cursor over its results
    pub async fn query(
        &self,
        aql: &str,
        bind_vars: Option<&Json>,
        options: &QueryOptions,
    ) -> Result<Cursor> {
        let data = QueryRequest {
            query: aql,
            bind_vars,
            count: options.count,
            batch_size: options.batch_size.or(self.cursor_config.batch_size),
            ttl: options.ttl.or(self.cursor_config.ttl_secs),
            options: QueryExtras {
                full_count: options.full_count,
                profile: options.profile,
                max_warning_count: options.max_warning_count,
            },
        };

        let mut request =
            Request::new(Method::Post, "/_api/cursor").body(serde_json::to_value(&data)?);
        if options.allow_dirty_read {
            request = request.header(crate::options::DIRTY_READ_HEADER, "true");
        }

        let resp = self.transport.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::Query, &resp));
        }
        Cursor::new(
            self.transport.clone(),
            resp.body,
            CursorType::Query,
            &self.cursor_config,
        )
    }

    /// Server version string
    pub async fn version(&self) -> Result<String> {
        let resp = self
            .transport
            .send(Request::new(Method::Get, "/_api/version"))
            .await?;
        if !resp.is_success {
            return Err(Error::server(Operation::Version, &resp));
        }
        match resp.body.get("version") {
            Some(Value::String(version)) => Ok(version.clone()),
            _ => Err(Error::InvalidResponse(
                "version response lacks \"version\"".to_string(),
            )),
        }
    }
}
