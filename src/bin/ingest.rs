use clap::Parser;
use graphsight::Config;
use graphsight::db::{Db, migrate};
use graphsight::ingest::{ExtractionResult, ingest_extraction};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// One extracted document as produced by the external extraction service:
/// the raw text plus its entity/relation payload.
#[derive(Debug, Deserialize)]
struct ExtractionFile {
    content: String,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
    #[serde(flatten)]
    extraction: ExtractionResult,
}

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Ingest extracted documents into the GraphSight store")]
struct Args {
    /// Extraction JSON files, one document each
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    log::info!("Starting GraphSight ingestion");

    let config = Config::load()?;
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| {
        migrate::run_migrations(conn, migrations_dir)
    }).await?;

    log::info!("Database initialized");

    let mut total_nodes = 0;
    let mut total_edges = 0;

    for file in &args.files {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read extraction file: {}", file.display()))?;
        let parsed: ExtractionFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse extraction file: {}", file.display()))?;

        let report = ingest_extraction(
            &db,
            parsed.content,
            parsed.source_url,
            parsed.metadata,
            parsed.extraction,
        )
        .await?;

        println!(
            "{}: document {}{}, {} entities, {} relations -> {} nodes created, {} merged, {} edges",
            file.display(),
            report.document_id,
            if report.document_reused { " (reused)" } else { "" },
            report.entities_extracted,
            report.relations_extracted,
            report.nodes_created,
            report.nodes_merged,
            report.edges_created,
        );

        total_nodes += report.nodes_created;
        total_edges += report.edges_created;
    }

    log::info!(
        "Ingestion complete: {} files, {} nodes created, {} edges created",
        args.files.len(),
        total_nodes,
        total_edges
    );

    Ok(())
}
