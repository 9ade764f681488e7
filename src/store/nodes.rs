//! Node CRUD and get-or-create deduplication.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{GraphSightError, Result};
use crate::normalize::{canonicalize_name, canonicalize_type};
use super::{Node, NodeProperties, NodeRef, json_column_err, now_rfc3339};

const NODE_COLUMNS: &str =
    "id, canonical_name, node_type, properties_json, source_document_id, created_at, updated_at";

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let properties_json: String = row.get(3)?;
    let properties: NodeProperties =
        serde_json::from_str(&properties_json).map_err(|e| json_column_err(3, e))?;
    Ok(Node {
        id: row.get(0)?,
        canonical_name: row.get(1)?,
        node_type: row.get(2)?,
        properties,
        source_document_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Get an existing node for `(canonical_name, canonical_type)` or create it.
///
/// Returns `(node_id, created)`. On a hit the raw spelling is appended to
/// the node's alias set (if new) and `updated_at` is bumped; the whole
/// read-check-write sequence runs on the caller's connection, inside
/// whatever transaction scopes the logical unit. A concurrent duplicate
/// insert is swallowed by `ON CONFLICT DO NOTHING` against the unique
/// identity index and resolved through the merge path.
pub fn get_or_create_node(
    conn: &Connection,
    raw_name: &str,
    raw_type: &str,
    source_document_id: Option<i64>,
) -> Result<(i64, bool)> {
    let canonical_name = canonicalize_name(raw_name);
    if canonical_name.is_empty() {
        return Err(GraphSightError::Validation(format!(
            "entity name '{}' is empty after normalization",
            raw_name
        )));
    }
    let node_type = canonicalize_type(raw_type);

    if let Some(id) = merge_alias(conn, &canonical_name, &node_type, raw_name)? {
        return Ok((id, false));
    }

    insert_or_merge(conn, &canonical_name, &node_type, raw_name, source_document_id)
}

/// Insert a fresh node for an identity the caller's lookup missed. When a
/// concurrent writer created the same identity in the meantime, the insert
/// is swallowed by `ON CONFLICT DO NOTHING` against the unique identity
/// index and the call resolves through the merge path instead.
pub(crate) fn insert_or_merge(
    conn: &Connection,
    canonical_name: &str,
    node_type: &str,
    raw_name: &str,
    source_document_id: Option<i64>,
) -> Result<(i64, bool)> {
    let properties = NodeProperties {
        canonical_name: canonical_name.to_string(),
        aliases: [raw_name.to_string()].into_iter().collect(),
        extra: serde_json::Map::new(),
    };
    let properties_json = serde_json::to_string(&properties)?;
    let now = now_rfc3339();

    let inserted = conn.execute(
        "INSERT INTO nodes (canonical_name, node_type, properties_json, source_document_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT(canonical_name, node_type) DO NOTHING",
        params![canonical_name, node_type, properties_json, source_document_id, now],
    )?;

    if inserted == 1 {
        return Ok((conn.last_insert_rowid(), true));
    }

    // Lost a race with a concurrent writer for the same canonical identity;
    // the merge path must succeed now.
    log::debug!(
        "node insert conflict for ({}, {}), merging instead",
        canonical_name,
        node_type
    );
    merge_alias(conn, canonical_name, node_type, raw_name)?
        .map(|id| (id, false))
        .ok_or_else(|| {
            GraphSightError::Invariant(format!(
                "node ({}, {}) neither inserted nor found",
                canonical_name, node_type
            ))
        })
}

/// Look up a node by canonical identity; on a hit, record `raw_name` as an
/// alias and refresh `updated_at`. Returns the node id, or None on a miss.
fn merge_alias(
    conn: &Connection,
    canonical_name: &str,
    node_type: &str,
    raw_name: &str,
) -> Result<Option<i64>> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, properties_json FROM nodes WHERE canonical_name = ?1 AND node_type = ?2",
            params![canonical_name, node_type],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (id, properties_json) = match existing {
        Some(pair) => pair,
        None => return Ok(None),
    };

    let mut properties: NodeProperties = serde_json::from_str(&properties_json)?;
    if properties.aliases.insert(raw_name.to_string()) {
        properties.canonical_name = canonical_name.to_string();
        conn.execute(
            "UPDATE nodes SET properties_json = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(&properties)?, now_rfc3339(), id],
        )?;
    }
    Ok(Some(id))
}

/// Get a node by id
pub fn get_node(conn: &Connection, id: i64) -> Result<Option<Node>> {
    let node = conn
        .query_row(
            &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
            params![id],
            node_from_row,
        )
        .optional()?;
    Ok(node)
}

/// Find a node by raw name: canonicalizes, then exact-matches the canonical
/// name. When the same name exists under multiple types, the oldest node
/// (lowest id) wins.
pub fn find_node_by_name(conn: &Connection, raw_name: &str) -> Result<Option<Node>> {
    let canonical_name = canonicalize_name(raw_name);
    if canonical_name.is_empty() {
        return Ok(None);
    }
    let node = conn
        .query_row(
            &format!(
                "SELECT {} FROM nodes WHERE canonical_name = ?1 ORDER BY id LIMIT 1",
                NODE_COLUMNS
            ),
            params![canonical_name],
            node_from_row,
        )
        .optional()?;
    Ok(node)
}

/// Resolve a caller-supplied reference to an existing node.
/// An unresolved reference is a caller-input error, not an empty result.
pub fn resolve_node(conn: &Connection, reference: &NodeRef) -> Result<Node> {
    let node = match reference {
        NodeRef::Id(id) => get_node(conn, *id)?,
        NodeRef::Name(name) => find_node_by_name(conn, name)?,
    };
    node.ok_or_else(|| GraphSightError::NotFound(reference.to_string()))
}

/// List nodes with pagination and an optional type filter.
/// Returns the page plus the total row count for the filter.
pub fn list_nodes(
    conn: &Connection,
    offset: usize,
    limit: usize,
    node_type: Option<&str>,
) -> Result<(Vec<Node>, i64)> {
    let type_filter = node_type.map(canonicalize_type);

    let (total, rows) = match &type_filter {
        Some(t) => {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM nodes WHERE node_type = ?1",
                params![t],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM nodes WHERE node_type = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
                NODE_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![t, limit as i64, offset as i64], node_from_row)?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            (total, rows)
        }
        None => {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM nodes ORDER BY id LIMIT ?1 OFFSET ?2",
                NODE_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![limit as i64, offset as i64], node_from_row)?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            (total, rows)
        }
    };

    Ok((rows, total))
}

/// Search nodes by canonical-name substring and/or type.
pub fn search_nodes(
    conn: &Connection,
    name_substring: Option<&str>,
    node_type: Option<&str>,
    limit: usize,
) -> Result<Vec<Node>> {
    let name_needle = name_substring
        .map(canonicalize_name)
        .filter(|n| !n.is_empty())
        .map(|n| format!("%{}%", n));
    let type_filter = node_type.map(canonicalize_type);

    let mut sql = format!("SELECT {} FROM nodes", NODE_COLUMNS);
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(needle) = &name_needle {
        clauses.push("canonical_name LIKE ?");
        args.push(Box::new(needle.clone()));
    }
    if let Some(t) = &type_filter {
        clauses.push("node_type = ?");
        args.push(Box::new(t.clone()));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY canonical_name LIMIT ?");
    args.push(Box::new(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args), node_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

/// Delete a node; incident edges cascade via the foreign-key constraint.
/// Returns whether a row was actually removed.
pub fn delete_node(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
    if deleted > 0 {
        log::debug!("deleted node {} (incident edges cascaded)", id);
    }
    Ok(deleted > 0)
}
