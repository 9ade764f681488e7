//! Path finding: depth-bounded DFS enumeration of simple directed paths,
//! ranked by average edge weight.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::Db;
use crate::error::Result;
use crate::store::NodeRef;
use crate::store::nodes::resolve_node;
use super::{AdjacencyView, OutEdge, RelationFilter, clamp_depth, explain_path, validate_top_k};

/// One node on a returned path.
#[derive(Debug, Clone, Serialize)]
pub struct PathNode {
    pub id: i64,
    pub name: String,
    pub node_type: String,
}

/// One completed source-to-target path.
#[derive(Debug, Clone, Serialize)]
pub struct PathCandidate {
    pub nodes: Vec<PathNode>,
    pub relations: Vec<String>,
    /// Hop count.
    pub length: usize,
    /// Cumulative edge weight divided by hop count; favors shorter paths
    /// with stronger relations.
    pub score: f64,
    pub explanation: String,
}

/// Result of one path query. `found = false` with an empty list is a normal
/// outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub source_node: String,
    pub target_node: String,
    pub paths: Vec<PathCandidate>,
    pub total_paths: usize,
    pub found: bool,
}

struct Search<'a> {
    view: &'a AdjacencyView,
    filter: &'a RelationFilter,
    target: i64,
    max_depth: usize,
    node_stack: Vec<i64>,
    relation_stack: Vec<String>,
    weight_sum: f64,
    visited: HashSet<i64>,
    completed: Vec<(Vec<i64>, Vec<String>, f64)>,
}

impl Search<'_> {
    /// Backtracking DFS. `visited` tracks only the current path, so a node
    /// excluded from one branch stays reachable through another; that is
    /// what makes this an enumeration of simple paths rather than a
    /// shortest-path walk.
    fn expand(&mut self, node: i64) {
        let view = self.view;
        for edge in view.outgoing(node) {
            if !self.filter.allows(&edge.relation_type) {
                continue;
            }
            if edge.target == self.target {
                self.complete(edge);
                continue;
            }
            if self.node_stack.len() == self.max_depth || self.visited.contains(&edge.target) {
                continue;
            }
            self.visited.insert(edge.target);
            self.node_stack.push(edge.target);
            self.relation_stack.push(edge.relation_type.clone());
            self.weight_sum += edge.weight;

            self.expand(edge.target);

            self.weight_sum -= edge.weight;
            self.relation_stack.pop();
            self.node_stack.pop();
            self.visited.remove(&edge.target);
        }
    }

    fn complete(&mut self, edge: &OutEdge) {
        let mut nodes = self.node_stack.clone();
        nodes.push(self.target);
        let mut relations = self.relation_stack.clone();
        relations.push(edge.relation_type.clone());
        self.completed
            .push((nodes, relations, self.weight_sum + edge.weight));
    }
}

/// Enumerate simple paths from source to target up to `max_depth` hops and
/// return the `top_k` best-scoring ones. Only edges the filter allows are
/// followed.
pub fn find_path_with_conn(
    conn: &Connection,
    source: &NodeRef,
    target: &NodeRef,
    max_depth: usize,
    top_k: usize,
    depth_ceiling: usize,
    filter: &RelationFilter,
) -> Result<PathReport> {
    let max_depth = clamp_depth(max_depth, depth_ceiling)?;
    let top_k = validate_top_k(top_k)?;
    let source_node = resolve_node(conn, source)?;
    let target_node = resolve_node(conn, target)?;
    let view = AdjacencyView::load(conn)?;

    let mut search = Search {
        view: &view,
        filter,
        target: target_node.id,
        max_depth,
        node_stack: vec![source_node.id],
        relation_stack: Vec::new(),
        weight_sum: 0.0,
        visited: [source_node.id].into_iter().collect(),
        completed: Vec::new(),
    };
    // A simple path cannot revisit its source, so source == target finds nothing
    if source_node.id != target_node.id {
        search.expand(source_node.id);
    }
    let completed = search.completed;
    let total_paths = completed.len();

    let mut candidates = Vec::with_capacity(total_paths);
    for (node_ids, relations, weight_sum) in completed {
        let length = relations.len();
        let names: Vec<String> = node_ids
            .iter()
            .map(|&id| view.name(id).to_string())
            .collect();
        let explanation = explain_path(&names, &relations)?;
        let nodes = node_ids
            .into_iter()
            .map(|id| PathNode {
                id,
                name: view.name(id).to_string(),
                node_type: view.node_type(id).to_string(),
            })
            .collect();
        candidates.push(PathCandidate {
            nodes,
            relations,
            length,
            score: weight_sum / length as f64,
            explanation,
        });
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.length.cmp(&b.length))
    });
    candidates.truncate(top_k);

    log::debug!(
        "find_path({} -> {}) enumerated {} candidates within {} hops",
        source_node.canonical_name,
        target_node.canonical_name,
        total_paths,
        max_depth
    );

    Ok(PathReport {
        source_node: source_node.canonical_name,
        target_node: target_node.canonical_name,
        found: !candidates.is_empty(),
        paths: candidates,
        total_paths,
    })
}

/// Async wrapper running the query as one unit of work on the store.
pub async fn find_path(
    db: &Db,
    source: NodeRef,
    target: NodeRef,
    max_depth: usize,
    top_k: usize,
    depth_ceiling: usize,
    filter: RelationFilter,
) -> Result<PathReport> {
    db.with_connection(move |conn| {
        find_path_with_conn(conn, &source, &target, max_depth, top_k, depth_ceiling, &filter)
    })
    .await
}
