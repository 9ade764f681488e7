use graphsight::Config;
use graphsight::db::{Db, migrate};
use graphsight::error::GraphSightError;
use std::path::Path;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "stats" => {
            run_stats().await?;
        }
        "verify" | _ => {
            // Default: verify database schema
            run_schema_verification().await?;
        }
    }

    Ok(())
}

/// Open the database and apply pending migrations
async fn open_db(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| {
        migrate::run_migrations(conn, migrations_dir)
    }).await?;
    Ok(db)
}

/// Run database schema verification
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting GraphSight v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Traversal depth ceiling: {}", config.traversal.max_depth_ceiling);

    let db = open_db(&config).await?;
    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    log::info!("Ready for ingestion and queries");

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        // Check tables
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = vec!["documents", "edges", "nodes", "schema_migrations"];
        let mut all_tables_exist = true;

        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            } else {
                log::debug!("✓ Table exists: {}", table);
            }
        }

        if !all_tables_exist {
            return Err(GraphSightError::Config("Not all required tables exist".to_string()));
        }

        // Check traversal indexes
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_indexes = vec![
            "idx_nodes_identity",
            "idx_nodes_type",
            "idx_edges_source",
            "idx_edges_target",
            "idx_edges_relation",
            "idx_documents_content_hash",
        ];

        for index_name in &expected_indexes {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Index exists: {}", index_name);
            } else {
                return Err(GraphSightError::Config(format!("Missing index: {}", index_name)));
            }
        }

        // Check migrations
        let applied = migrate::get_applied_migrations(conn)?;
        if applied.is_empty() {
            return Err(GraphSightError::Config("No migrations applied".to_string()));
        }
        log::debug!("✓ {} migrations applied", applied.len());

        // Check pragmas
        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(GraphSightError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(GraphSightError::Config("Foreign keys not enabled".to_string()));
        }
        log::debug!("✓ Foreign keys enabled (edge cascade depends on this)");

        // Integrity check
        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(GraphSightError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}

/// Print aggregate graph statistics
async fn run_stats() -> Result<()> {
    let config = Config::load()?;
    let db = open_db(&config).await?;

    println!("\n=== GraphSight Store Statistics ===\n");

    let (nodes, edges, documents) = db.with_connection(|conn| {
        let nodes: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        let edges: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        let documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok::<(i64, i64, i64), GraphSightError>((nodes, edges, documents))
    }).await?;

    println!("Nodes:     {}", nodes);
    println!("Edges:     {}", edges);
    println!("Documents: {}", documents);

    let type_counts = db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT node_type, COUNT(*) FROM nodes GROUP BY node_type ORDER BY COUNT(*) DESC LIMIT 10"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok::<Vec<(String, i64)>, GraphSightError>(rows)
    }).await?;

    if !type_counts.is_empty() {
        println!("\nTop node types:");
        for (node_type, count) in type_counts {
            println!("  {:<16} {}", node_type, count);
        }
    }

    let relation_counts = db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT relation_type, COUNT(*) FROM edges GROUP BY relation_type ORDER BY COUNT(*) DESC LIMIT 10"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok::<Vec<(String, i64)>, GraphSightError>(rows)
    }).await?;

    if !relation_counts.is_empty() {
        println!("\nTop relation types:");
        for (relation_type, count) in relation_counts {
            println!("  {:<16} {}", relation_type, count);
        }
    }

    println!();
    Ok(())
}
