//! Streaming Query Example
//!
//! Inserts a few documents, streams them back through an AQL cursor with a
//! small batch size, and reports per-document failures of a bulk insert.
//!
//! Needs a running server on http://localhost:8529 and an existing
//! `examples` collection in `_system`.
//!
//! Run with: cargo run --example stream_query

use arangodb_rs::{Client, ClientConfig, CursorConfig, InsertOptions, QueryOptions};
use futures::TryStreamExt;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig {
        cursor: CursorConfig {
            batch_size: Some(2),
            ..CursorConfig::default()
        },
        ..ClientConfig::default()
    };
    let client = Client::new(config)?;
    println!("Connected to ArangoDB {}\n", client.version().await?);

    let db = client.db();
    let planets = db.collection("examples");
    planets.truncate().await?;

    let docs = ["mercury", "venus", "earth", "venus", "mars"]
        .iter()
        .map(|name| {
            json!({"_key": name, "name": name})
                .as_object()
                .cloned()
                .unwrap_or_default()
        })
        .collect();
    let results = planets.insert_many(docs, &InsertOptions::default()).await?;
    for (i, result) in results.iter().enumerate() {
        if let Err(e) = result {
            println!("Document {} rejected: {}", i, e);
        }
    }

    let cursor = db
        .query(
            "FOR p IN examples SORT p.name RETURN p.name",
            None,
            &QueryOptions {
                count: true,
                ..QueryOptions::default()
            },
        )
        .await?;
    println!("\nQuery matched {:?} documents:", cursor.count());

    let names: Vec<_> = cursor.into_stream().try_collect().await?;
    for name in names {
        println!("   {}", name);
    }

    Ok(())
}
