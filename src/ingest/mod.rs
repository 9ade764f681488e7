//! Ingestion boundary: turn one extracted document into graph writes.
//!
//! Entity/relation extraction itself is an external collaborator; this
//! module receives its typed output and commits the whole document as one
//! transaction. A failure anywhere rolls everything back, so a partially
//! ingested document never leaves orphaned nodes behind.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::Db;
use crate::error::Result;
use crate::normalize::canonicalize_name;
use crate::store::documents::insert_document;
use crate::store::edges::create_edge;
use crate::store::nodes::get_or_create_node;

/// One entity reported by the extraction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(default, rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// One relation reported by the extraction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn default_weight() -> f64 {
    1.0
}

/// Full extraction payload for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

/// Aggregate counts returned to the caller for upstream reporting.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: i64,
    /// True when identical content had been ingested before and the stored
    /// document row was reused.
    pub document_reused: bool,
    pub entities_extracted: usize,
    pub relations_extracted: usize,
    pub nodes_created: usize,
    pub nodes_merged: usize,
    pub edges_created: usize,
}

/// Ingest one document's extraction output inside a single transaction.
pub fn ingest_with_conn(
    conn: &mut Connection,
    content: &str,
    source_url: Option<&str>,
    metadata: &Map<String, Value>,
    extraction: &ExtractionResult,
) -> Result<IngestReport> {
    let tx = conn.transaction()?;
    let report = write_extraction(&tx, content, source_url, metadata, extraction)?;
    tx.commit()?;

    log::info!(
        "ingested document {}: {} nodes created, {} merged, {} edges created",
        report.document_id,
        report.nodes_created,
        report.nodes_merged,
        report.edges_created
    );
    Ok(report)
}

fn write_extraction(
    conn: &Connection,
    content: &str,
    source_url: Option<&str>,
    metadata: &Map<String, Value>,
    extraction: &ExtractionResult,
) -> Result<IngestReport> {
    let (document_id, created) = insert_document(conn, content, source_url, metadata)?;

    let mut nodes_created = 0;
    let mut nodes_merged = 0;
    // Canonical name -> node id for every entity touched by this document,
    // so a relation endpoint resolves to the typed entity declared above it
    // rather than spawning a second untyped node.
    let mut seen: HashMap<String, i64> = HashMap::new();

    for entity in &extraction.entities {
        let (node_id, was_created) =
            get_or_create_node(conn, &entity.name, &entity.entity_type, Some(document_id))?;
        if was_created {
            nodes_created += 1;
        } else {
            nodes_merged += 1;
        }
        seen.insert(canonicalize_name(&entity.name), node_id);
    }

    let mut edges_created = 0;
    for relation in &extraction.relations {
        let source_id = resolve_endpoint(
            conn,
            &relation.source,
            document_id,
            &mut seen,
            &mut nodes_created,
            &mut nodes_merged,
        )?;
        let target_id = resolve_endpoint(
            conn,
            &relation.target,
            document_id,
            &mut seen,
            &mut nodes_created,
            &mut nodes_merged,
        )?;
        create_edge(
            conn,
            source_id,
            target_id,
            &relation.relation_type,
            relation.weight,
            &relation.properties,
        )?;
        edges_created += 1;
    }

    Ok(IngestReport {
        document_id,
        document_reused: !created,
        entities_extracted: extraction.entities.len(),
        relations_extracted: extraction.relations.len(),
        nodes_created,
        nodes_merged,
        edges_created,
    })
}

fn resolve_endpoint(
    conn: &Connection,
    raw_name: &str,
    document_id: i64,
    seen: &mut HashMap<String, i64>,
    nodes_created: &mut usize,
    nodes_merged: &mut usize,
) -> Result<i64> {
    if let Some(&id) = seen.get(&canonicalize_name(raw_name)) {
        return Ok(id);
    }
    // Endpoint not in the entity list: create it untyped
    let (id, created) = get_or_create_node(conn, raw_name, "", Some(document_id))?;
    if created {
        *nodes_created += 1;
    } else {
        *nodes_merged += 1;
    }
    seen.insert(canonicalize_name(raw_name), id);
    Ok(id)
}

/// Async entry point: one document's ingestion as one unit of work.
pub async fn ingest_extraction(
    db: &Db,
    content: String,
    source_url: Option<String>,
    metadata: Map<String, Value>,
    extraction: ExtractionResult,
) -> Result<IngestReport> {
    db.with_connection(move |conn| {
        ingest_with_conn(conn, &content, source_url.as_deref(), &metadata, &extraction)
    })
    .await
}
