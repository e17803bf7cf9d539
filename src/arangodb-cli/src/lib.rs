//! arangodb - command line access to an ArangoDB server
//!
//! Results are written as JSON lines on stdout; logs go to `./logs` and
//! stderr.
//!
//! ```bash
//! arangodb query 'FOR u IN users FILTER u.age > 30 RETURN u' --batch-size 500
//! arangodb import users users.jsonl --chunk-size 1000
//! ```

pub use arangodb_rs;

pub mod commands;
pub mod telemetry;
