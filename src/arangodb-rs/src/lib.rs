//! arangodb Client Library
//!
//! HTTP client for ArangoDB servers: documents, bulk writes, cursors,
//! indexes and named graphs.

mod client;
mod collection;
mod database;
mod graph;
pub mod options;
mod transport;

pub use client::Client;
pub use collection::Collection;
pub use database::Database;
pub use graph::{EdgeCollection, EdgeDirection, EdgeList, Graph, VertexCollection};
pub use options::{
    DeleteOptions, ExportOptions, FieldFilter, InsertOptions, OverwriteMode, QueryOptions,
    ReadOptions, ReplaceOptions, UpdateOptions,
};
pub use transport::HttpTransport;

pub use arangodb_core::{
    ClientConfig, Cursor, CursorConfig, CursorType, DocumentReference, Error, Json, Operation,
    Result, ServerError, Transport,
};
