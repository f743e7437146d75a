//! Opening the ledger database: connection setup and the embedded schema.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

const LEDGER_SCHEMA: &str = include_str!("schema.sql");

/// Open (or create) the ledger database at `db_path`.
///
/// Missing parent directories are created. The schema only uses
/// `IF NOT EXISTS` / `OR IGNORE` statements, so reopening an existing ledger
/// leaves its cycles, days and vault untouched.
pub async fn open_ledger_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { prepare_connection(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    apply_ledger_schema(&pool).await?;

    let (assets,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets")
        .fetch_one(&pool)
        .await?;
    info!(path = %db_path, assets = assets, "Ledger database ready");
    Ok(pool)
}

/// Create the ledger tables and indexes and seed the asset catalog.
async fn apply_ledger_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut applied = 0;
    for statement in LEDGER_SCHEMA.split(';').map(str::trim) {
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
        applied += 1;
    }
    debug!(statements = applied, "Ledger schema applied");
    Ok(())
}

/// Per-connection settings: enforced references between cycles, days and
/// sales, WAL journaling, and a busy timeout for the write gate's peers.
async fn prepare_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    let journal_mode: String = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?
        .get(0);

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    debug!(journal_mode = %journal_mode, "Ledger connection prepared");
    Ok(())
}
