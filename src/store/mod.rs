//! Repository layer: transactional create/get-or-create/list/delete
//! operations over the graph tables.
//!
//! Every function here is synchronous and takes a `&rusqlite::Connection`,
//! so the caller decides the transaction scope: one document's ingestion or
//! one query runs against a single explicitly scoped transaction, released
//! on every exit path.

pub mod nodes;
pub mod edges;
pub mod documents;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved, strongly-typed node properties plus an open extension map.
/// `canonical_name` and `aliases` are validated at write time; everything
/// else round-trips untouched through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeProperties {
    /// Normalized name, duplicated from the node column for consumers that
    /// only see the property blob.
    #[serde(default)]
    pub canonical_name: String,
    /// Every raw spelling that has resolved to this node.
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A canonical entity in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub canonical_name: String,
    pub node_type: String,
    pub properties: NodeProperties,
    pub source_document_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub relation_type: String,
    pub properties: Map<String, Value>,
    pub weight: f64,
    pub created_at: String,
}

/// Provenance record for ingested source text. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub content: String,
    pub source_url: Option<String>,
    pub content_hash: String,
    pub metadata: Map<String, Value>,
    pub created_at: String,
}

/// Caller-supplied node reference: numeric id or raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Id(i64),
    Name(String),
}

impl NodeRef {
    /// Parse a CLI-style reference: all-digit strings are ids, anything
    /// else is treated as a raw name.
    pub fn parse(raw: &str) -> NodeRef {
        match raw.trim().parse::<i64>() {
            Ok(id) => NodeRef::Id(id),
            Err(_) => NodeRef::Name(raw.to_string()),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "node id {}", id),
            NodeRef::Name(name) => write!(f, "node '{}'", name),
        }
    }
}

/// Current timestamp in the RFC 3339 form all tables store.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Map a serde_json failure inside a rusqlite row closure.
pub(crate) fn json_column_err(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ref_parse() {
        assert_eq!(NodeRef::parse("42"), NodeRef::Id(42));
        assert_eq!(
            NodeRef::parse("payment service"),
            NodeRef::Name("payment service".to_string())
        );
    }

    #[test]
    fn test_node_properties_roundtrip() {
        let mut props = NodeProperties {
            canonical_name: "payment_service".to_string(),
            aliases: ["Payment Service".to_string()].into_iter().collect(),
            extra: Map::new(),
        };
        props
            .extra
            .insert("team".to_string(), Value::String("payments".to_string()));

        let json = serde_json::to_string(&props).unwrap();
        let back: NodeProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(back.canonical_name, "payment_service");
        assert!(back.aliases.contains("Payment Service"));
        assert_eq!(back.extra.get("team").unwrap(), "payments");
    }
}
