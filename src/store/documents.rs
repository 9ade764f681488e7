//! Document provenance records. Immutable once written; re-ingesting
//! byte-identical content reuses the existing row via the content hash.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;
use super::{Document, json_column_err, now_rfc3339};

const DOCUMENT_COLUMNS: &str = "id, content, source_url, content_hash, metadata_json, created_at";

fn document_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let metadata_json: String = row.get(4)?;
    let metadata: Map<String, Value> =
        serde_json::from_str(&metadata_json).map_err(|e| json_column_err(4, e))?;
    Ok(Document {
        id: row.get(0)?,
        content: row.get(1)?,
        source_url: row.get(2)?,
        content_hash: row.get(3)?,
        metadata,
        created_at: row.get(5)?,
    })
}

/// SHA-256 hex digest of document content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Insert a document, or reuse the existing row when identical content was
/// already ingested. Returns `(document_id, created)`.
pub fn insert_document(
    conn: &Connection,
    content: &str,
    source_url: Option<&str>,
    metadata: &Map<String, Value>,
) -> Result<(i64, bool)> {
    let hash = content_hash(content);

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM documents WHERE content_hash = ?1 ORDER BY id LIMIT 1",
            params![hash],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        log::debug!("document with hash {} already stored as id {}", hash, id);
        return Ok((id, false));
    }

    let metadata_json = serde_json::to_string(metadata)?;
    conn.execute(
        "INSERT INTO documents (content, source_url, content_hash, metadata_json, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![content, source_url, hash, metadata_json, now_rfc3339()],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

/// Get a document by id
pub fn get_document(conn: &Connection, id: i64) -> Result<Option<Document>> {
    let doc = conn
        .query_row(
            &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
            params![id],
            document_from_row,
        )
        .optional()?;
    Ok(doc)
}

/// List documents with pagination. Returns the page plus the total count.
pub fn list_documents(
    conn: &Connection,
    offset: usize,
    limit: usize,
) -> Result<(Vec<Document>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM documents ORDER BY id LIMIT ?1 OFFSET ?2",
        DOCUMENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![limit as i64, offset as i64], document_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok((rows, total))
}
