//! arangodb Core Library
//!
//! Transport-independent building blocks of the arangodb client:
//! - Document identity resolution and revision headers
//! - Server cursor state machine and batch fetching
//! - Bulk response reconciliation
//! - Error taxonomy, wire models and configuration

pub mod bulk;
pub mod config;
pub mod cursor;
pub mod error;
pub mod handle;
pub mod models;
pub mod transport;

// Re-export commonly used types
pub use bulk::BulkEntry;
pub use config::{ClientConfig, CursorConfig};
pub use cursor::{BatchUpdate, Cursor, CursorState};
pub use error::{Error, Operation, Result, ServerError};
pub use handle::RevisionHeader;
pub use models::*;
pub use transport::Transport;

#[cfg(any(test, feature = "test-util"))]
pub use transport::ScriptedTransport;
