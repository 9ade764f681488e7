use graphsight::{Config, NodeRef, db::Db, graph};
use graphsight::graph::RelationFilter;
use std::time::Instant;

/// Parse CLI args: first positional is the node (name or id); optional
/// --max-depth <n> and repeatable --relation <r>.
fn parse_impact_args(default_depth: usize) -> anyhow::Result<(NodeRef, usize, Vec<String>)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut node = None;
    let mut max_depth = default_depth;
    let mut relations: Vec<String> = Vec::new();
    let mut next_depth = false;
    let mut next_relation = false;
    for arg in &args {
        if next_depth {
            max_depth = arg.parse()?;
            next_depth = false;
            continue;
        }
        if next_relation {
            relations.push(arg.clone());
            next_relation = false;
            continue;
        }
        if arg == "--max-depth" {
            next_depth = true;
            continue;
        }
        if arg == "--relation" {
            next_relation = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        if node.is_none() {
            node = Some(NodeRef::parse(arg));
        }
    }
    let node = node.ok_or_else(|| anyhow::anyhow!(
        "Usage: impact <node-name-or-id> [--max-depth <n>] [--relation <r>]...\nExample: impact payment-service --max-depth 5 --relation depends_on"
    ))?;
    Ok((node, max_depth, relations))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let (node, max_depth, relations) = parse_impact_args(config.traversal.default_max_depth)?;

    let start = Instant::now();
    let report = graph::impact(
        &db,
        node,
        max_depth,
        config.traversal.max_depth_ceiling,
        RelationFilter::only(relations),
    )
    .await?;
    let elapsed = start.elapsed();

    println!(
        "\nImpact of '{}' (node {}): {} nodes within {} hops ({} ms)\n",
        report.source_node,
        report.source_node_id,
        report.total_impacted,
        max_depth,
        elapsed.as_millis()
    );

    for node in &report.impacted {
        println!(
            "  depth {}  [{}] {} ({}) via {}",
            node.depth,
            node.node_type,
            node.name,
            node.id,
            node.relation_type
        );
        println!("           path: {}", node.path.join(" -> "));
    }

    if report.impacted.is_empty() {
        println!("  (nothing downstream within the depth bound)");
    }

    Ok(())
}
