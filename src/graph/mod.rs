//! Traversal engine: impact analysis (bounded BFS) and path finding
//! (bounded DFS over simple paths), plus the path explanation formatter.
//!
//! Both algorithms follow stored edge direction source -> target, read a
//! consistent snapshot of the store into an adjacency view once per query,
//! and never write anything.

mod explain;
mod impact;
mod pathfind;

pub use explain::explain_path;
pub use impact::{ImpactReport, ImpactedNode, impact, impact_with_conn};
pub use pathfind::{PathCandidate, PathNode, PathReport, find_path, find_path_with_conn};

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::error::{GraphSightError, Result};
use crate::normalize::canonicalize_relation;

/// Optional allow-list restricting traversal to specific relation labels.
/// Labels are canonicalized on construction, so callers may pass the same
/// raw spellings ingestion accepts. An empty list means no restriction.
#[derive(Debug, Clone, Default)]
pub struct RelationFilter(Option<HashSet<String>>);

impl RelationFilter {
    /// Follow every relation.
    pub fn any() -> RelationFilter {
        RelationFilter(None)
    }

    /// Follow only the given relations.
    pub fn only<I, S>(raw: I) -> RelationFilter
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: HashSet<String> = raw
            .into_iter()
            .map(|r| canonicalize_relation(r.as_ref()))
            .collect();
        if set.is_empty() {
            RelationFilter(None)
        } else {
            RelationFilter(Some(set))
        }
    }

    pub fn allows(&self, relation_type: &str) -> bool {
        match &self.0 {
            None => true,
            Some(set) => set.contains(relation_type),
        }
    }
}

/// One outgoing hop in the adjacency view.
#[derive(Debug, Clone)]
pub struct OutEdge {
    pub target: i64,
    pub relation_type: String,
    pub weight: f64,
}

/// In-memory forward-adjacency snapshot of the graph, materialized from the
/// store for the duration of one query. Per-hop expansion is then a map
/// lookup instead of a round trip to the store.
pub struct AdjacencyView {
    nodes: HashMap<i64, (String, String)>,
    outgoing: HashMap<i64, Vec<OutEdge>>,
}

impl AdjacencyView {
    /// Load every node label and every edge. Edges are kept in insertion
    /// order per source so traversal output is deterministic.
    pub fn load(conn: &Connection) -> Result<AdjacencyView> {
        let mut nodes = HashMap::new();
        let mut stmt = conn.prepare("SELECT id, canonical_name, node_type FROM nodes")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (id, name, node_type) = row?;
            nodes.insert(id, (name, node_type));
        }

        let mut outgoing: HashMap<i64, Vec<OutEdge>> = HashMap::new();
        let mut stmt = conn
            .prepare("SELECT source_id, target_id, relation_type, weight FROM edges ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;
        for row in rows {
            let (source, target, relation_type, weight) = row?;
            outgoing.entry(source).or_default().push(OutEdge {
                target,
                relation_type,
                weight,
            });
        }

        Ok(AdjacencyView { nodes, outgoing })
    }

    pub fn name(&self, id: i64) -> &str {
        self.nodes
            .get(&id)
            .map(|(name, _)| name.as_str())
            .unwrap_or("")
    }

    pub fn node_type(&self, id: i64) -> &str {
        self.nodes
            .get(&id)
            .map(|(_, node_type)| node_type.as_str())
            .unwrap_or("unknown")
    }

    pub fn outgoing(&self, id: i64) -> &[OutEdge] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Enforce the mandatory depth bound: zero is rejected, values above the
/// configured hard ceiling are clamped down to it.
pub fn clamp_depth(requested: usize, ceiling: usize) -> Result<usize> {
    if requested == 0 {
        return Err(GraphSightError::Validation(
            "max_depth must be at least 1".to_string(),
        ));
    }
    if requested > ceiling {
        log::debug!("clamping requested depth {} to ceiling {}", requested, ceiling);
        return Ok(ceiling);
    }
    Ok(requested)
}

/// Validate the top-k result bound for path finding.
pub fn validate_top_k(top_k: usize) -> Result<usize> {
    if top_k == 0 {
        return Err(GraphSightError::Validation(
            "top_k must be at least 1".to_string(),
        ));
    }
    Ok(top_k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::nodes::tests::test_conn;
    use crate::store::nodes::get_or_create_node;
    use crate::store::edges::create_edge;
    use serde_json::Map;

    #[test]
    fn test_adjacency_view_load() {
        let conn = test_conn();
        let (a, _) = get_or_create_node(&conn, "a", "service", None).unwrap();
        let (b, _) = get_or_create_node(&conn, "b", "service", None).unwrap();
        create_edge(&conn, a, b, "calls", 2.0, &Map::new()).unwrap();

        let view = AdjacencyView::load(&conn).unwrap();
        assert_eq!(view.name(a), "a");
        assert_eq!(view.node_type(b), "service");
        assert_eq!(view.outgoing(a).len(), 1);
        assert_eq!(view.outgoing(a)[0].target, b);
        assert_eq!(view.outgoing(a)[0].weight, 2.0);
        assert!(view.outgoing(b).is_empty());
    }

    #[test]
    fn test_clamp_depth() {
        assert!(clamp_depth(0, 20).is_err());
        assert_eq!(clamp_depth(5, 20).unwrap(), 5);
        assert_eq!(clamp_depth(100, 20).unwrap(), 20);
    }

    #[test]
    fn test_validate_top_k() {
        assert!(validate_top_k(0).is_err());
        assert_eq!(validate_top_k(5).unwrap(), 5);
    }

    #[test]
    fn test_relation_filter_canonicalizes_labels() {
        let filter = RelationFilter::only(["dependsOn", "connects"]);
        assert!(filter.allows("depends_on"));
        assert!(filter.allows("connects_to"));
        assert!(!filter.allows("calls"));
    }

    #[test]
    fn test_relation_filter_empty_means_unrestricted() {
        let filter = RelationFilter::only(Vec::<String>::new());
        assert!(filter.allows("calls"));
        assert!(RelationFilter::any().allows("anything_at_all"));
    }
}
