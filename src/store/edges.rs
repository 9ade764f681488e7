//! Edge CRUD. Parallel edges between the same ordered pair are permitted
//! and never merged; dedup at that level is an explicit non-feature.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::error::{GraphSightError, Result};
use crate::normalize::canonicalize_relation;
use super::{Edge, json_column_err, now_rfc3339};

const EDGE_COLUMNS: &str =
    "id, source_id, target_id, relation_type, properties_json, weight, created_at";

fn edge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    let properties_json: String = row.get(4)?;
    let properties: Map<String, Value> =
        serde_json::from_str(&properties_json).map_err(|e| json_column_err(4, e))?;
    Ok(Edge {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relation_type: row.get(3)?,
        properties,
        weight: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn node_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM nodes WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(exists.is_some())
}

/// Create a directed edge between two existing nodes.
///
/// The relation label is canonicalized before storing. Rejected before any
/// write: negative or non-finite weight (`Validation`), missing endpoint
/// (`Constraint`).
pub fn create_edge(
    conn: &Connection,
    source_id: i64,
    target_id: i64,
    raw_relation: &str,
    weight: f64,
    properties: &Map<String, Value>,
) -> Result<i64> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(GraphSightError::Validation(format!(
            "edge weight must be a non-negative finite number, got {}",
            weight
        )));
    }
    if !node_exists(conn, source_id)? {
        return Err(GraphSightError::Constraint(format!(
            "edge source node {} does not exist",
            source_id
        )));
    }
    if !node_exists(conn, target_id)? {
        return Err(GraphSightError::Constraint(format!(
            "edge target node {} does not exist",
            target_id
        )));
    }

    let relation_type = canonicalize_relation(raw_relation);
    let properties_json = serde_json::to_string(properties)?;

    conn.execute(
        "INSERT INTO edges (source_id, target_id, relation_type, properties_json, weight, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![source_id, target_id, relation_type, properties_json, weight, now_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get an edge by id
pub fn get_edge(conn: &Connection, id: i64) -> Result<Option<Edge>> {
    let edge = conn
        .query_row(
            &format!("SELECT {} FROM edges WHERE id = ?1", EDGE_COLUMNS),
            params![id],
            edge_from_row,
        )
        .optional()?;
    Ok(edge)
}

/// List edges with pagination. Returns the page plus the total row count.
pub fn list_edges(conn: &Connection, offset: usize, limit: usize) -> Result<(Vec<Edge>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM edges ORDER BY id LIMIT ?1 OFFSET ?2",
        EDGE_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![limit as i64, offset as i64], edge_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok((rows, total))
}

/// All outgoing edges of a node, in insertion order.
pub fn outgoing_edges(conn: &Connection, source_id: i64) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM edges WHERE source_id = ?1 ORDER BY id",
        EDGE_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![source_id], edge_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

/// All incoming edges of a node, in insertion order. Answers "who depends
/// on this node" without a full traversal.
pub fn incoming_edges(conn: &Connection, target_id: i64) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM edges WHERE target_id = ?1 ORDER BY id",
        EDGE_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![target_id], edge_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

/// Delete an edge by id. Returns whether a row was actually removed.
pub fn delete_edge(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM edges WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::nodes::tests::test_conn;
    use crate::store::nodes::{delete_node, get_or_create_node};

    fn two_nodes(conn: &Connection) -> (i64, i64) {
        let (a, _) = get_or_create_node(conn, "alpha", "service", None).unwrap();
        let (b, _) = get_or_create_node(conn, "beta", "database", None).unwrap();
        (a, b)
    }

    #[test]
    fn test_create_edge_canonicalizes_relation() {
        let conn = test_conn();
        let (a, b) = two_nodes(&conn);
        let id = create_edge(&conn, a, b, "connects", 1.0, &Map::new()).unwrap();
        let edge = get_edge(&conn, id).unwrap().unwrap();
        assert_eq!(edge.relation_type, "connects_to");
        assert_eq!(edge.weight, 1.0);
    }

    #[test]
    fn test_create_edge_rejects_negative_weight() {
        let conn = test_conn();
        let (a, b) = two_nodes(&conn);
        let err = create_edge(&conn, a, b, "uses", -0.5, &Map::new()).unwrap_err();
        assert!(matches!(err, GraphSightError::Validation(_)));
        let err = create_edge(&conn, a, b, "uses", f64::NAN, &Map::new()).unwrap_err();
        assert!(matches!(err, GraphSightError::Validation(_)));
        let (_, total) = list_edges(&conn, 0, 10).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_create_edge_rejects_missing_endpoint() {
        let conn = test_conn();
        let (a, _) = two_nodes(&conn);
        let err = create_edge(&conn, a, 999, "uses", 1.0, &Map::new()).unwrap_err();
        assert!(matches!(err, GraphSightError::Constraint(_)));
        let err = create_edge(&conn, 999, a, "uses", 1.0, &Map::new()).unwrap_err();
        assert!(matches!(err, GraphSightError::Constraint(_)));
    }

    #[test]
    fn test_parallel_edges_stay_distinct() {
        let conn = test_conn();
        let (a, b) = two_nodes(&conn);
        let e1 = create_edge(&conn, a, b, "uses", 1.0, &Map::new()).unwrap();
        let e2 = create_edge(&conn, a, b, "uses", 2.0, &Map::new()).unwrap();
        assert_ne!(e1, e2);
        let (_, total) = list_edges(&conn, 0, 10).unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_outgoing_edges() {
        let conn = test_conn();
        let (a, b) = two_nodes(&conn);
        create_edge(&conn, a, b, "uses", 1.0, &Map::new()).unwrap();
        create_edge(&conn, b, a, "queries", 1.0, &Map::new()).unwrap();
        let out = outgoing_edges(&conn, a).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target_id, b);
    }

    #[test]
    fn test_incoming_edges() {
        let conn = test_conn();
        let (a, b) = two_nodes(&conn);
        let (c, _) = get_or_create_node(&conn, "gamma", "service", None).unwrap();
        create_edge(&conn, a, b, "uses", 1.0, &Map::new()).unwrap();
        create_edge(&conn, c, b, "queries", 1.0, &Map::new()).unwrap();
        create_edge(&conn, b, a, "calls", 1.0, &Map::new()).unwrap();

        let incoming = incoming_edges(&conn, b).unwrap();
        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].source_id, a);
        assert_eq!(incoming[1].source_id, c);
        assert!(incoming_edges(&conn, c).unwrap().is_empty());
    }

    #[test]
    fn test_node_delete_cascades_to_edges() {
        let conn = test_conn();
        let (a, b) = two_nodes(&conn);
        create_edge(&conn, a, b, "uses", 1.0, &Map::new()).unwrap();
        create_edge(&conn, b, a, "queries", 1.0, &Map::new()).unwrap();

        assert!(delete_node(&conn, a).unwrap());
        let (_, total) = list_edges(&conn, 0, 10).unwrap();
        assert_eq!(total, 0);
    }
}
