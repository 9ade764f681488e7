use graphsight::{Config, NodeRef, db::Db, graph};
use graphsight::graph::RelationFilter;
use std::time::Instant;

/// Parse CLI args: two positionals (source, target; names or ids);
/// optional --max-depth <n>, --top-k <k> and repeatable --relation <r>.
fn parse_path_args(
    default_depth: usize,
    default_top_k: usize,
) -> anyhow::Result<(NodeRef, NodeRef, usize, usize, Vec<String>)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut positionals: Vec<NodeRef> = Vec::new();
    let mut max_depth = default_depth;
    let mut top_k = default_top_k;
    let mut relations: Vec<String> = Vec::new();
    let mut next_depth = false;
    let mut next_top_k = false;
    let mut next_relation = false;
    for arg in &args {
        if next_depth {
            max_depth = arg.parse()?;
            next_depth = false;
            continue;
        }
        if next_top_k {
            top_k = arg.parse()?;
            next_top_k = false;
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
        if arg == "--top-k" {
            next_top_k = true;
            continue;
        }
        if arg == "--relation" {
            next_relation = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        if positionals.len() < 2 {
            positionals.push(NodeRef::parse(arg));
        }
    }
    let usage = || anyhow::anyhow!(
        "Usage: path <source> <target> [--max-depth <n>] [--top-k <k>] [--relation <r>]...\nExample: path fraud-service cache-b --max-depth 5"
    );
    let mut positionals = positionals.into_iter();
    let source = positionals.next().ok_or_else(usage)?;
    let target = positionals.next().ok_or_else(usage)?;
    Ok((source, target, max_depth, top_k, relations))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let (source, target, max_depth, top_k, relations) =
        parse_path_args(config.traversal.default_max_depth, config.traversal.default_top_k)?;

    let start = Instant::now();
    let report = graph::find_path(
        &db,
        source,
        target,
        max_depth,
        top_k,
        config.traversal.max_depth_ceiling,
        RelationFilter::only(relations),
    )
    .await?;
    let elapsed = start.elapsed();

    if !report.found {
        println!(
            "\nNo path from '{}' to '{}' within {} hops ({} ms)",
            report.source_node,
            report.target_node,
            max_depth,
            elapsed.as_millis()
        );
        return Ok(());
    }

    println!(
        "\n{} of {} paths from '{}' to '{}' ({} ms)\n",
        report.paths.len(),
        report.total_paths,
        report.source_node,
        report.target_node,
        elapsed.as_millis()
    );

    for (rank, path) in report.paths.iter().enumerate() {
        println!(
            "  #{} score {:.3}, {} hops",
            rank + 1,
            path.score,
            path.length
        );
        println!("     {}", path.explanation);
    }

    Ok(())
}
