use anyhow::{Context, Result};
use rusqlite::Connection;

pub mod memos;

pub use memos::{MemoRecord, MemoRepository};

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS memos (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            audio_path TEXT,
            color TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create memos table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_memos_created_at ON memos(created_at DESC)",
        [],
    )
    .context("Failed to create memos created_at index")?;

    Ok(())
}
