use graphsight::{Config, db::Db};
use graphsight::store::nodes;

/// Parse CLI args: optional positional name substring, --type <t>, --limit <n>.
fn parse_search_args() -> anyhow::Result<(Option<String>, Option<String>, usize)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut needle = None;
    let mut node_type = None;
    let mut limit = 50usize;
    let mut next_type = false;
    let mut next_limit = false;
    for arg in &args {
        if next_type {
            node_type = Some(arg.clone());
            next_type = false;
            continue;
        }
        if next_limit {
            limit = arg.parse()?;
            next_limit = false;
            continue;
        }
        if arg == "--type" {
            next_type = true;
            continue;
        }
        if arg == "--limit" {
            next_limit = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        if needle.is_none() {
            needle = Some(arg.clone());
        }
    }
    if needle.is_none() && node_type.is_none() {
        anyhow::bail!(
            "Usage: search [<name-substring>] [--type <t>] [--limit <n>]\nExample: search payment --type service"
        );
    }
    Ok((needle, node_type, limit))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let (needle, node_type, limit) = parse_search_args()?;

    let results = db
        .with_connection(move |conn| {
            nodes::search_nodes(conn, needle.as_deref(), node_type.as_deref(), limit)
        })
        .await?;

    if results.is_empty() {
        println!("No matching nodes.");
        return Ok(());
    }

    println!("\n{} matching nodes:\n", results.len());
    for node in &results {
        let aliases: Vec<&str> = node
            .properties
            .aliases
            .iter()
            .map(String::as_str)
            .collect();
        println!(
            "  {:<6} [{}] {}  aliases: {}",
            node.id,
            node.node_type,
            node.canonical_name,
            aliases.join(", ")
        );
    }

    Ok(())
}
