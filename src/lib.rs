pub mod config;
pub mod error;
pub mod db;
pub mod normalize;
pub mod store;
pub mod graph;
pub mod ingest;

pub use config::Config;
pub use error::{GraphSightError, Result};
pub use graph::{ImpactReport, PathReport, RelationFilter, explain_path, find_path, impact};
pub use store::{Document, Edge, Node, NodeRef};
