//! Versioned schema migrations. Each `NNN_name.sql` file under the
//! migrations directory runs once, inside its own transaction, and is
//! recorded in `schema_migrations`.

use std::fs;
use std::path::Path;

use rusqlite::{Connection, params};

use crate::error::{GraphSightError, Result};

struct Migration {
    version: u32,
    name: String,
    sql: String,
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of migrations already recorded, in version order.
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

/// "001_graph_tables.sql" -> (1, "001_graph_tables")
fn parse_migration_filename(filename: &str) -> Result<(u32, String)> {
    let stem = filename.trim_end_matches(".sql");
    let version = stem
        .split('_')
        .next()
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| {
            GraphSightError::Migration(format!(
                "migration filename '{}' has no numeric version prefix",
                filename
            ))
        })?;
    Ok((version, stem.to_string()))
}

fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();
    for entry in fs::read_dir(migrations_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        let filename = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            GraphSightError::Migration(format!(
                "unreadable migration filename: {}",
                path.display()
            ))
        })?;
        let (version, name) = parse_migration_filename(filename)?;
        let sql = fs::read_to_string(&path)?;
        migrations.push(Migration { version, name, sql });
    }
    migrations.sort_by_key(|m| m.version);
    Ok(migrations)
}

/// Apply every pending migration from `migrations_dir`. Already-recorded
/// migrations are skipped, so running this at every startup is safe.
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;

    for migration in load_migrations(migrations_dir)? {
        if applied.contains(&migration.name) {
            log::debug!("migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!(
            "applying migration {} (version {})",
            migration.name,
            migration.version
        );

        let tx = conn.transaction()?;
        // execute_batch handles multi-statement migration files
        tx.execute_batch(&migration.sql).map_err(|e| {
            GraphSightError::Migration(format!("{} failed: {}", migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use std::fs;

    #[test]
    fn test_migration_tracking() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();

        ensure_migrations_table(&conn).unwrap();

        conn.execute("CREATE TABLE test (id INTEGER)", []).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![1, "001_test"],
        ).unwrap();

        let applied = get_applied_migrations(&conn).unwrap();
        assert!(applied.contains(&"001_test".to_string()));
    }

    #[test]
    fn test_parse_migration_filename() {
        let (version, name) = parse_migration_filename("002_add_weights.sql").unwrap();
        assert_eq!(version, 2);
        assert_eq!(name, "002_add_weights");

        let err = parse_migration_filename("weights.sql").unwrap_err();
        assert!(matches!(err, GraphSightError::Migration(_)));
    }

    #[test]
    fn test_load_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let migrations_dir = temp_dir.path().join("migrations");
        fs::create_dir(&migrations_dir).unwrap();

        fs::write(
            migrations_dir.join("001_test.sql"),
            "CREATE TABLE test (id INTEGER);"
        ).unwrap();

        fs::write(
            migrations_dir.join("002_another.sql"),
            "CREATE TABLE another (id INTEGER);"
        ).unwrap();

        let migrations = load_migrations(&migrations_dir).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[1].version, 2);
    }

    #[test]
    fn test_failed_migration_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let migrations_dir = temp_dir.path().join("migrations");
        fs::create_dir(&migrations_dir).unwrap();
        fs::write(migrations_dir.join("001_broken.sql"), "CREATE TABLE (").unwrap();

        let db_path = temp_dir.path().join("test.db");
        let mut conn = Connection::open(&db_path).unwrap();
        let err = run_migrations(&mut conn, &migrations_dir).unwrap_err();
        match err {
            GraphSightError::Migration(msg) => assert!(msg.contains("001_broken")),
            other => panic!("expected migration error, got {}", other),
        }
        // The failed file's transaction rolled back; nothing was recorded
        assert!(get_applied_migrations(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_full_migration_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let mut conn = Connection::open(&db_path).unwrap();

        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        run_migrations(&mut conn, &migrations_dir).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap();

        assert!(tables.contains(&"documents".to_string()));
        assert!(tables.contains(&"nodes".to_string()));
        assert!(tables.contains(&"edges".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));

        // Traversal indexes: identity dedup on nodes, adjacency on edges
        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap();

        assert!(indexes.contains(&"idx_nodes_identity".to_string()));
        assert!(indexes.contains(&"idx_edges_source".to_string()));
        assert!(indexes.contains(&"idx_edges_target".to_string()));
    }

    #[test]
    fn test_migrations_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let mut conn = Connection::open(&db_path).unwrap();

        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        run_migrations(&mut conn, &migrations_dir).unwrap();
        // Second run must skip everything already applied
        run_migrations(&mut conn, &migrations_dir).unwrap();

        let applied = get_applied_migrations(&conn).unwrap();
        assert!(!applied.is_empty());
    }
}
