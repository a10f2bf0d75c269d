//! Connection + migration-table bootstrap, kept from the donor's
//! `db.rs` pattern and re-scoped to the tables this crate owns.

use rusqlite::{Connection, Result};
use std::path::PathBuf;

/// Local-first data directory: database and logs live next to the
/// binary rather than in a platform data dir, matching the donor's
/// development-mode default.
pub fn get_app_data_dir() -> PathBuf {
    let app_data_dir = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".careerengine");
    std::fs::create_dir_all(&app_data_dir).expect("Failed to create app data directory");
    app_data_dir
}

pub fn get_db_path() -> PathBuf {
    get_app_data_dir().join("careerengine.db")
}

pub fn get_connection() -> Result<Connection> {
    let db_path = get_db_path();
    Connection::open(db_path)
}

pub fn init_database() -> Result<()> {
    let conn = get_connection()?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    run_migrations(&conn)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    let migration_name = "001_career_engine";
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM migrations WHERE name = ?")?;
    let count: i64 = stmt.query_row([migration_name], |row| row.get(0))?;
    if count == 0 {
        migration_001_career_engine(conn)?;
        conn.execute(
            "INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))",
            [migration_name],
        )?;
    }
    Ok(())
}

pub fn migration_001_career_engine(conn: &Connection) -> Result<()> {
    crate::resume_store::SqliteResumeStore::ensure_schema(conn)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    crate::job_store::SqliteJobStore::ensure_schema(conn)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    crate::extraction_cache::ensure_schema(conn)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    crate::persistence::ensure_schema(conn)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    Ok(())
}
