//! Impact analysis: bounded breadth-first expansion along forward edges.

use std::collections::{HashSet, VecDeque};

use rusqlite::Connection;
use serde::Serialize;

use crate::db::Db;
use crate::error::Result;
use crate::store::NodeRef;
use crate::store::nodes::resolve_node;
use super::{AdjacencyView, RelationFilter, clamp_depth};

/// One transitively impacted node, reported at the minimal depth it was
/// first reached.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactedNode {
    pub id: i64,
    pub name: String,
    pub node_type: String,
    /// Relation label of the edge that first discovered this node.
    pub relation_type: String,
    pub depth: usize,
    /// Witness path of node names from the source to this node.
    pub path: Vec<String>,
}

/// Result of one impact query.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub source_node: String,
    pub source_node_id: i64,
    pub impacted: Vec<ImpactedNode>,
    pub total_impacted: usize,
}

/// Find everything transitively affected if the source node changes or
/// fails, up to `max_depth` forward hops. Only edges the filter allows
/// are followed.
///
/// Breadth-first: depth 1 is the source's direct outgoing edges, each
/// subsequent layer expands only nodes newly discovered in the previous
/// one. A node already in the result set is neither re-added nor
/// re-expanded, which keeps every node at its minimal depth and guarantees
/// termination on cyclic graphs regardless of the depth bound.
pub fn impact_with_conn(
    conn: &Connection,
    source: &NodeRef,
    max_depth: usize,
    depth_ceiling: usize,
    filter: &RelationFilter,
) -> Result<ImpactReport> {
    let max_depth = clamp_depth(max_depth, depth_ceiling)?;
    let source_node = resolve_node(conn, source)?;
    let view = AdjacencyView::load(conn)?;

    let mut visited: HashSet<i64> = HashSet::new();
    visited.insert(source_node.id);

    let mut queue: VecDeque<(i64, usize, Vec<String>)> = VecDeque::new();
    queue.push_back((
        source_node.id,
        0,
        vec![source_node.canonical_name.clone()],
    ));

    let mut impacted: Vec<ImpactedNode> = Vec::new();

    while let Some((node_id, depth, path)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for edge in view.outgoing(node_id) {
            if !filter.allows(&edge.relation_type) {
                continue;
            }
            if !visited.insert(edge.target) {
                continue;
            }
            let name = view.name(edge.target).to_string();
            let mut witness = path.clone();
            witness.push(name.clone());
            impacted.push(ImpactedNode {
                id: edge.target,
                name,
                node_type: view.node_type(edge.target).to_string(),
                relation_type: edge.relation_type.clone(),
                depth: depth + 1,
                path: witness.clone(),
            });
            queue.push_back((edge.target, depth + 1, witness));
        }
    }

    impacted.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.name.cmp(&b.name)));

    let total_impacted = impacted.len();
    log::debug!(
        "impact({}) found {} nodes within {} hops",
        source_node.canonical_name,
        total_impacted,
        max_depth
    );

    Ok(ImpactReport {
        source_node: source_node.canonical_name,
        source_node_id: source_node.id,
        impacted,
        total_impacted,
    })
}

/// Async wrapper running the query as one unit of work on the store.
pub async fn impact(
    db: &Db,
    source: NodeRef,
    max_depth: usize,
    depth_ceiling: usize,
    filter: RelationFilter,
) -> Result<ImpactReport> {
    db.with_connection(move |conn| {
        impact_with_conn(conn, &source, max_depth, depth_ceiling, &filter)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphSightError;
    use crate::store::nodes::tests::test_conn;
    use crate::store::nodes::get_or_create_node;
    use crate::store::edges::create_edge;
    use serde_json::Map;

    const CEILING: usize = 20;

    fn node(conn: &Connection, name: &str) -> i64 {
        get_or_create_node(conn, name, "service", None).unwrap().0
    }

    fn edge(conn: &Connection, a: i64, b: i64, rel: &str) {
        create_edge(conn, a, b, rel, 1.0, &Map::new()).unwrap();
    }

    #[test]
    fn test_impact_layers_and_depths() {
        let conn = test_conn();
        // a -> b -> c, a -> d
        let (a, b, c, d) = (
            node(&conn, "a"),
            node(&conn, "b"),
            node(&conn, "c"),
            node(&conn, "d"),
        );
        edge(&conn, a, b, "depends_on");
        edge(&conn, b, c, "depends_on");
        edge(&conn, a, d, "uses");

        let report = impact_with_conn(&conn, &NodeRef::Id(a), 5, CEILING, &RelationFilter::any()).unwrap();
        assert_eq!(report.total_impacted, 3);
        let depths: Vec<(String, usize)> = report
            .impacted
            .iter()
            .map(|n| (n.name.clone(), n.depth))
            .collect();
        assert_eq!(
            depths,
            vec![
                ("b".to_string(), 1),
                ("d".to_string(), 1),
                ("c".to_string(), 2)
            ]
        );
        assert_eq!(report.impacted[2].path, vec!["a", "b", "c"]);
        let _ = d;
    }

    #[test]
    fn test_impact_respects_depth_bound() {
        let conn = test_conn();
        let (a, b, c) = (node(&conn, "a"), node(&conn, "b"), node(&conn, "c"));
        edge(&conn, a, b, "calls");
        edge(&conn, b, c, "calls");

        let report = impact_with_conn(&conn, &NodeRef::Id(a), 1, CEILING, &RelationFilter::any()).unwrap();
        assert_eq!(report.total_impacted, 1);
        assert_eq!(report.impacted[0].name, "b");
    }

    #[test]
    fn test_impact_minimal_depth_on_diamond() {
        let conn = test_conn();
        // a -> b -> d and a -> d: d must be reported once, at depth 1
        let (a, b, d) = (node(&conn, "a"), node(&conn, "b"), node(&conn, "d"));
        edge(&conn, a, b, "calls");
        edge(&conn, a, d, "calls");
        edge(&conn, b, d, "calls");

        let report = impact_with_conn(&conn, &NodeRef::Id(a), 5, CEILING, &RelationFilter::any()).unwrap();
        let d_entries: Vec<_> = report.impacted.iter().filter(|n| n.name == "d").collect();
        assert_eq!(d_entries.len(), 1);
        assert_eq!(d_entries[0].depth, 1);
    }

    #[test]
    fn test_impact_terminates_on_cycle() {
        let conn = test_conn();
        let (a, b) = (node(&conn, "a"), node(&conn, "b"));
        edge(&conn, a, b, "calls");
        edge(&conn, b, a, "calls");

        let report = impact_with_conn(&conn, &NodeRef::Id(a), 3, CEILING, &RelationFilter::any()).unwrap();
        // b is reachable; a itself is never re-reported
        assert_eq!(report.total_impacted, 1);
        assert_eq!(report.impacted[0].name, "b");
    }

    #[test]
    fn test_impact_forward_only() {
        let conn = test_conn();
        let (a, b) = (node(&conn, "upstream"), node(&conn, "downstream"));
        edge(&conn, a, b, "calls");

        // No outgoing edges from b: impact is empty, which is not an error
        let report = impact_with_conn(&conn, &NodeRef::Id(b), 5, CEILING, &RelationFilter::any()).unwrap();
        assert_eq!(report.total_impacted, 0);
    }

    #[test]
    fn test_impact_unknown_source_is_error() {
        let conn = test_conn();
        let err = impact_with_conn(&conn, &NodeRef::Id(123), 5, CEILING, &RelationFilter::any()).unwrap_err();
        assert!(matches!(err, GraphSightError::NotFound(_)));
    }

    #[test]
    fn test_impact_resolves_source_by_name() {
        let conn = test_conn();
        let (a, b) = (node(&conn, "Payment Service"), node(&conn, "db-a"));
        edge(&conn, a, b, "depends_on");

        let report = impact_with_conn(
            &conn,
            &NodeRef::Name("payment-service".to_string()),
            5,
            CEILING,
            &RelationFilter::any(),
        )
        .unwrap();
        assert_eq!(report.source_node, "payment_service");
        assert_eq!(report.total_impacted, 1);
    }

    #[test]
    fn test_impact_zero_depth_rejected() {
        let conn = test_conn();
        node(&conn, "a");
        let err = impact_with_conn(
            &conn,
            &NodeRef::Name("a".to_string()),
            0,
            CEILING,
            &RelationFilter::any(),
        )
        .unwrap_err();
        assert!(matches!(err, GraphSightError::Validation(_)));
    }

    #[test]
    fn test_impact_relation_filter_limits_expansion() {
        let conn = test_conn();
        // a -[calls]-> b -[calls]-> c, a -[depends_on]-> d
        let (a, b, c, d) = (
            node(&conn, "a"),
            node(&conn, "b"),
            node(&conn, "c"),
            node(&conn, "d"),
        );
        edge(&conn, a, b, "calls");
        edge(&conn, b, c, "calls");
        edge(&conn, a, d, "depends_on");

        let filter = RelationFilter::only(["calls"]);
        let report = impact_with_conn(&conn, &NodeRef::Id(a), 5, CEILING, &filter).unwrap();
        assert_eq!(report.total_impacted, 2);
        assert!(report.impacted.iter().all(|n| n.relation_type == "calls"));
        assert!(report.impacted.iter().all(|n| n.id != d));
    }

    #[test]
    fn test_impact_filter_accepts_raw_relation_spellings() {
        let conn = test_conn();
        let (a, b) = (node(&conn, "a"), node(&conn, "b"));
        edge(&conn, a, b, "depends_on");

        let filter = RelationFilter::only(["dependsOn"]);
        let report = impact_with_conn(&conn, &NodeRef::Id(a), 5, CEILING, &filter).unwrap();
        assert_eq!(report.total_impacted, 1);
        assert_eq!(report.impacted[0].name, "b");
    }
}
