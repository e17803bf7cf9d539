//! Server-side cursor client.
//!
//! A [`Cursor`] hides result pagination: rows from the initial response are
//! queued locally, and further batches are pulled from the server with
//! `PUT /_api/<type>/<id>` as the queue drains. A cursor is owned by exactly
//! one caller. `fetch`, `next` and `pop` take `&mut self`, so two fetches on
//! the same cursor can never overlap, and there is no internal locking.
//!
//! A cursor that is dropped before being drained or closed keeps its
//! server-side state alive until the server's idle timeout reclaims it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::CursorConfig;
use crate::error::{Error, Operation, Result, ServerError, HTTP_NOT_FOUND};
use crate::models::{CursorType, Json, Method, Request};
use crate::transport::Transport;

/// Wire names of execution statistics and the names they are exposed under
const STAT_RENAMES: &[(&str, &str)] = &[
    ("writesExecuted", "modified"),
    ("writesIgnored", "ignored"),
    ("scannedFull", "scanned_full"),
    ("scannedIndex", "scanned_index"),
    ("executionTime", "execution_time"),
    ("httpRequests", "http_requests"),
];

/// Rename statistics fields to their public names; values are untouched
pub fn rename_statistics(mut stats: Json) -> Json {
    for (wire, public) in STAT_RENAMES {
        if let Some(value) = stats.remove(*wire) {
            stats.insert((*public).to_string(), value);
        }
    }
    stats
}

/// What a single server response contributed to the cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchUpdate {
    pub id: Option<String>,
    pub count: Option<u64>,
    pub cached: Option<bool>,
    pub has_more: bool,
    /// Rows appended to the queue by this response
    pub batch: Vec<Value>,
    pub profile: Option<Value>,
    pub warnings: Option<Vec<Value>>,
    pub statistics: Option<Json>,
}

/// Client-side view of a server cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorState {
    id: Option<String>,
    batch: VecDeque<Value>,
    has_more: bool,
    count: Option<u64>,
    cached: Option<bool>,
    profile: Option<Value>,
    warnings: Option<Vec<Value>>,
    statistics: Option<Json>,
}

impl CursorState {
    /// Build the state from the initial query/export/all-keys response
    pub fn from_body(body: Value) -> Result<Self> {
        let mut state = Self::default();
        state.merge(body)?;
        Ok(state)
    }

    /// Apply one server response.
    ///
    /// `id`, `count` and `cached` overwrite when present, `hasMore` always
    /// overwrites, and rows are appended behind whatever is still queued.
    /// The response is validated before anything is changed.
    pub fn merge(&mut self, body: Value) -> Result<BatchUpdate> {
        let mut data = match body {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidResponse(format!(
                    "cursor response must be an object, got {}",
                    other
                )))
            }
        };

        let has_more = data
            .get("hasMore")
            .and_then(Value::as_bool)
            .ok_or_else(|| Error::InvalidResponse("cursor response lacks \"hasMore\"".to_string()))?;
        let rows = match data.remove("result") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(Error::InvalidResponse(
                    "cursor response lacks a \"result\" array".to_string(),
                ))
            }
        };

        let mut update = BatchUpdate {
            has_more,
            ..BatchUpdate::default()
        };

        match data.get("id") {
            Some(Value::String(id)) => update.id = Some(id.clone()),
            Some(Value::Number(id)) => update.id = Some(id.to_string()),
            _ => {}
        }
        update.count = data.get("count").and_then(Value::as_u64);
        update.cached = data.get("cached").and_then(Value::as_bool);

        if let Some(Value::Object(mut extra)) = data.remove("extra") {
            update.profile = extra.remove("profile");
            if let Some(Value::Array(warnings)) = extra.remove("warnings") {
                update.warnings = Some(warnings);
            }
            if let Some(Value::Object(stats)) = extra.remove("stats") {
                update.statistics = Some(rename_statistics(stats));
            }
        }

        if update.id.is_some() {
            self.id = update.id.clone();
        }
        if update.count.is_some() {
            self.count = update.count;
        }
        if update.cached.is_some() {
            self.cached = update.cached;
        }
        self.has_more = has_more;
        if update.profile.is_some() {
            self.profile = update.profile.clone();
        }
        if update.warnings.is_some() {
            self.warnings = update.warnings.clone();
        }
        if update.statistics.is_some() {
            self.statistics = update.statistics.clone();
        }

        self.batch.extend(rows.iter().cloned());
        update.batch = rows;

        Ok(update)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn batch(&self) -> &VecDeque<Value> {
        &self.batch
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.batch.pop_front()
    }
}

/// Cursor over a server result set
pub struct Cursor {
    transport: Arc<dyn Transport>,
    cursor_type: CursorType,
    state: CursorState,
    max_empty_fetches: u32,
    closed: bool,
}

impl Cursor {
    /// Create a cursor from the server's initial response body
    pub fn new(
        transport: Arc<dyn Transport>,
        body: Value,
        cursor_type: CursorType,
        config: &CursorConfig,
    ) -> Result<Self> {
        let state = CursorState::from_body(body)?;
        debug!(
            cursor_type = %cursor_type,
            cursor_id = ?state.id,
            rows = state.batch.len(),
            has_more = state.has_more,
            "cursor opened"
        );

        Ok(Self {
            transport,
            cursor_type,
            state,
            max_empty_fetches: config.max_empty_fetches,
            closed: false,
        })
    }

    /// Server-side cursor ID, absent when all results came inline
    pub fn id(&self) -> Option<&str> {
        self.state.id.as_deref()
    }

    pub fn cursor_type(&self) -> CursorType {
        self.cursor_type
    }

    /// Rows fetched but not yet consumed
    pub fn batch(&self) -> &VecDeque<Value> {
        &self.state.batch
    }

    /// Whether the server holds more rows than have been fetched
    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    /// Total result count, if counting was requested
    pub fn count(&self) -> Option<u64> {
        self.state.count
    }

    pub fn cached(&self) -> Option<bool> {
        self.state.cached
    }

    pub fn statistics(&self) -> Option<&Json> {
        self.state.statistics.as_ref()
    }

    pub fn profile(&self) -> Option<&Value> {
        self.state.profile.as_ref()
    }

    pub fn warnings(&self) -> Option<&[Value]> {
        self.state.warnings.as_deref()
    }

    /// Whether the local batch is empty
    pub fn is_empty(&self) -> bool {
        self.state.batch.is_empty()
    }

    /// Take the next row from the local batch without touching the network
    pub fn pop(&mut self) -> Result<Value> {
        self.state.pop().ok_or(Error::EmptyBatch)
    }

    /// Fetch the next batch from the server and append it to the queue
    pub async fn fetch(&mut self) -> Result<BatchUpdate> {
        let id = self
            .state
            .id
            .clone()
            .ok_or_else(|| Error::CursorState("cursor ID not set".to_string()))?;

        let request = Request::new(
            Method::Put,
            format!("/_api/{}/{}", self.cursor_type.path(), id),
        );
        let resp = self.transport.send(request).await?;
        if !resp.is_success {
            return Err(Error::server(Operation::CursorFetch, &resp));
        }

        let update = self.state.merge(resp.body)?;
        debug!(
            cursor_id = %id,
            rows = update.batch.len(),
            has_more = update.has_more,
            "cursor batch fetched"
        );
        Ok(update)
    }

    /// Next row, fetching from the server when the local batch runs dry.
    ///
    /// Returns `Ok(None)` once the result set is exhausted. A fetch that
    /// brings no rows while the server still reports more is retried, up to
    /// the configured bound.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        let mut empty_fetches = 0;
        while self.state.batch.is_empty() {
            if !self.state.has_more {
                return Ok(None);
            }
            let update = self.fetch().await?;
            if !update.batch.is_empty() {
                continue;
            }
            empty_fetches += 1;
            debug!(
                cursor_id = ?self.state.id,
                attempt = empty_fetches,
                "cursor returned an empty batch"
            );
            if update.has_more && empty_fetches > self.max_empty_fetches {
                return Err(Error::CursorStalled {
                    id: self.state.id.clone().unwrap_or_default(),
                    attempts: empty_fetches,
                });
            }
        }
        self.pop().map(Some)
    }

    /// Next row deserialized into `T`
    pub async fn next_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.next().await? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Drain every remaining row, local and server-side
    pub async fn collect_remaining(&mut self) -> Result<Vec<Value>> {
        let mut rows = Vec::with_capacity(self.state.batch.len());
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Turn the cursor into a stream of rows
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> + Send {
        futures::stream::try_unfold(self, |mut cursor| async move {
            Ok::<_, Error>(cursor.next().await?.map(|row| (row, cursor)))
        })
    }

    /// Close the cursor and free its server resources.
    ///
    /// Returns `Ok(None)` when there is no server-side cursor to close,
    /// `Ok(Some(true))` once closed, and `Ok(Some(false))` when the server no
    /// longer knows the cursor and `ignore_missing` is set. The cursor is
    /// consumed either way.
    pub async fn close(mut self, ignore_missing: bool) -> Result<Option<bool>> {
        self.closed = true;
        let id = match self.state.id.take() {
            Some(id) => id,
            None => return Ok(None),
        };

        let request = Request::new(
            Method::Delete,
            format!("/_api/{}/{}", self.cursor_type.path(), id),
        );
        let resp = self.transport.send(request).await?;

        if resp.is_success {
            debug!(cursor_id = %id, "cursor closed");
            return Ok(Some(true));
        }
        if resp.status_code == HTTP_NOT_FOUND && ignore_missing {
            debug!(cursor_id = %id, "cursor already gone on the server");
            return Ok(Some(false));
        }
        Err(Error::Operation(ServerError::from_response(
            Operation::CursorClose,
            &resp,
        )))
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("cursor_type", &self.cursor_type)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if self.closed || !self.state.has_more {
            return;
        }
        if let Some(id) = &self.state.id {
            debug!(
                cursor_id = %id,
                cursor_type = %self.cursor_type,
                "cursor dropped with unfetched results; it stays open until the server's idle timeout"
            );
        }
    }
}
