use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arangodb_cli::{commands, telemetry};
use arangodb_rs::{Client, ClientConfig};
use clap::{Parser, Subcommand};

/// ArangoDB command line client
///
/// Rows are printed as JSON lines on stdout.
#[derive(Parser, Debug)]
#[command(name = "arangodb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the client configuration file
    #[arg(short, long, default_value = "arangodb.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an AQL query
    Query {
        aql: String,

        /// Bind variables as a JSON object
        #[arg(short, long)]
        bind: Option<String>,

        #[arg(long)]
        batch_size: Option<u32>,

        /// Ask the server for the total result count
        #[arg(long)]
        count: bool,
    },

    /// Export all documents of a collection
    Export {
        collection: String,

        #[arg(long)]
        batch_size: Option<u32>,

        #[arg(long)]
        limit: Option<u64>,
    },

    /// List document keys of a collection
    Keys { collection: String },

    /// Print one document by key or ID
    Get {
        collection: String,
        reference: String,
    },

    /// Bulk insert documents from a JSON lines file
    Import {
        collection: String,
        file: PathBuf,

        #[arg(long, default_value_t = 500)]
        chunk_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_telemetry(Path::new("./logs"))?;

    let config = ClientConfig::load(&cli.config.to_string_lossy()).unwrap_or_else(|_| {
        tracing::warn!("Failed to load {}, using defaults", cli.config.display());
        ClientConfig::default()
    });
    tracing::info!(url = %config.url, database = %config.database, "arangodb cli starting");

    let client = Client::new(config)?;
    let db = client.db();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Query {
            aql,
            bind,
            batch_size,
            count,
        } => {
            let rows =
                commands::query(&db, &aql, bind.as_deref(), batch_size, count, &mut out).await?;
            tracing::info!(rows, "query finished");
        }
        Commands::Export {
            collection,
            batch_size,
            limit,
        } => {
            let rows = commands::export(&db, &collection, batch_size, limit, &mut out).await?;
            tracing::info!(rows, collection = %collection, "export finished");
        }
        Commands::Keys { collection } => {
            commands::keys(&db, &collection, &mut out).await?;
        }
        Commands::Get {
            collection,
            reference,
        } => {
            commands::get(&db, &collection, &reference, &mut out).await?;
        }
        Commands::Import {
            collection,
            file,
            chunk_size,
        } => {
            let input = BufReader::new(
                File::open(&file).with_context(|| format!("cannot open {}", file.display()))?,
            );
            let summary = commands::import(
                &db,
                &collection,
                input,
                chunk_size,
                &mut io::stderr().lock(),
            )
            .await?;
            eprintln!(
                "imported {} documents into {}, {} failed",
                summary.created, collection, summary.failed
            );
            if summary.failed > 0 {
                bail!("{} documents were rejected", summary.failed);
            }
        }
    }

    Ok(())
}
