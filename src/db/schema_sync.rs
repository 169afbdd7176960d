//! Schema bootstrap for the catalog database
//!
//! Creates missing tables on startup. Existing tables are left as they are,
//! so databases written by earlier versions of the service keep working.

use sqlx::SqlitePool;
use tracing::debug;

/// Tables owned by this service, in creation order
const TABLES: &[(&str, &str)] = &[
    (
        "files",
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY,
            path TEXT UNIQUE,
            filename TEXT,
            language TEXT,
            analyzed_at TEXT
        )
        "#,
    ),
    (
        "settings",
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    ),
];

/// Result of a schema sync operation
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
}

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Create every missing table
pub async fn sync_schema(pool: &SqlitePool) -> Result<SchemaSyncResult, sqlx::Error> {
    let mut result = SchemaSyncResult::default();

    for (name, ddl) in TABLES {
        if table_exists(pool, name).await? {
            debug!(table = name, "Table already present");
            continue;
        }
        sqlx::query(ddl).execute(pool).await?;
        result.tables_created.push(name.to_string());
    }

    Ok(result)
}
