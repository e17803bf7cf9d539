//! Subcommand implementations.
//!
//! Each command writes JSON lines to the given writer so the binary can hand
//! in a locked stdout and tests a buffer.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use arangodb_rs::{
    Cursor, Database, DocumentReference, ExportOptions, InsertOptions, Json, QueryOptions,
    ReadOptions,
};
use serde_json::Value;
use tracing::{info, warn};

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub failed: usize,
}

/// Write every remaining row of `cursor` as one JSON line, then close it.
///
/// The cursor is closed even when streaming fails part way.
pub async fn drain_cursor<W: Write>(mut cursor: Cursor, out: &mut W) -> Result<u64> {
    let mut rows = 0u64;
    let streamed = loop {
        match cursor.next().await {
            Ok(Some(row)) => {
                if let Err(e) = writeln!(out, "{}", row) {
                    break Err(anyhow::Error::from(e));
                }
                rows += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(anyhow::Error::from(e)),
        }
    };

    let cursor_id = cursor.id().map(str::to_string);
    if let Err(e) = cursor.close(true).await {
        warn!(cursor_id = ?cursor_id, error = %e, "failed to close cursor");
    }
    streamed?;
    out.flush()?;
    Ok(rows)
}

/// Run an AQL query; `bind` is a JSON object of bind variables
pub async fn query<W: Write>(
    db: &Database,
    aql: &str,
    bind: Option<&str>,
    batch_size: Option<u32>,
    count: bool,
    out: &mut W,
) -> Result<u64> {
    let bind_vars = match bind {
        Some(text) => Some(parse_object(text).context("--bind must be a JSON object")?),
        None => None,
    };
    let options = QueryOptions {
        count,
        batch_size,
        ..QueryOptions::default()
    };

    let cursor = db.query(aql, bind_vars.as_ref(), &options).await?;
    if let Some(total) = cursor.count() {
        info!(total, "query matched");
    }
    drain_cursor(cursor, out).await
}

pub async fn export<W: Write>(
    db: &Database,
    collection: &str,
    batch_size: Option<u32>,
    limit: Option<u64>,
    out: &mut W,
) -> Result<u64> {
    let options = ExportOptions {
        batch_size,
        limit,
        ..ExportOptions::default()
    };
    let cursor = db.collection(collection).export(&options).await?;
    drain_cursor(cursor, out).await
}

pub async fn keys<W: Write>(db: &Database, collection: &str, out: &mut W) -> Result<u64> {
    let cursor = db.collection(collection).keys().await?;
    drain_cursor(cursor, out).await
}

/// Print one document; fails when it does not exist
pub async fn get<W: Write>(
    db: &Database,
    collection: &str,
    reference: &str,
    out: &mut W,
) -> Result<()> {
    let doc = db
        .collection(collection)
        .get(DocumentReference::from(reference), &ReadOptions::new())
        .await?;
    match doc {
        Some(doc) => {
            writeln!(out, "{}", Value::Object(doc))?;
            Ok(())
        }
        None => bail!("document \"{}\" not found in {}", reference, collection),
    }
}

/// Insert JSON lines from `input` in chunks of `chunk_size`.
///
/// Every rejected document is reported on `errors` as
/// `<line number>\t<error code>\t<error>`, counting lines from 1; the run
/// continues past them.
pub async fn import<R: BufRead, W: Write>(
    db: &Database,
    collection: &str,
    input: R,
    chunk_size: usize,
    errors: &mut W,
) -> Result<ImportSummary> {
    let target = db.collection(collection);
    let chunk_size = chunk_size.max(1);
    let options = InsertOptions::default();

    let mut summary = ImportSummary::default();
    let mut chunk: Vec<(usize, Json)> = Vec::with_capacity(chunk_size);
    let mut lines = input.lines().enumerate();

    loop {
        let exhausted = match lines.next() {
            Some((index, line)) => {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let doc = parse_object(&line)
                    .with_context(|| format!("line {} is not a JSON object", index + 1))?;
                chunk.push((index, doc));
                if chunk.len() < chunk_size {
                    continue;
                }
                false
            }
            None => true,
        };
        if chunk.is_empty() {
            break;
        }

        let (indices, docs): (Vec<_>, Vec<_>) = std::mem::take(&mut chunk).into_iter().unzip();
        let results = target.insert_many(docs, &options).await?;
        for (index, result) in indices.into_iter().zip(results) {
            match result {
                Ok(_) => summary.created += 1,
                Err(e) => {
                    summary.failed += 1;
                    let code = e
                        .server_code()
                        .map_or_else(|| "-".to_string(), |c| c.to_string());
                    writeln!(errors, "{}\t{}\t{}", index + 1, code, e)?;
                }
            }
        }
        info!(
            collection,
            created = summary.created,
            failed = summary.failed,
            "import chunk done"
        );

        if exhausted {
            break;
        }
    }
    Ok(summary)
}

fn parse_object(text: &str) -> Result<Json> {
    match serde_json::from_str(text)? {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {}", other),
    }
}
