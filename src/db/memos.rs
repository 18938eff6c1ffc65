//! Memo record persistence.
//!
//! CRUD over the `memos` table. Raw SQL with rusqlite, no ORM. Memo ids are
//! uuid strings generated on insert; ordering is newest-first.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// A memo row from the database.
#[derive(Debug, Clone)]
pub struct MemoRecord {
    pub id: String,
    pub text: String,
    pub audio_path: Option<String>,
    pub color: String,
    pub created_at: String,
}

/// Repository for memo records.
pub struct MemoRepository;

impl MemoRepository {
    /// Insert a new memo and return its generated id.
    pub fn insert(
        conn: &Connection,
        text: &str,
        audio_path: Option<&str>,
        color: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO memos (id, text, audio_path, color) VALUES (?1, ?2, ?3, ?4)",
            params![id, text, audio_path, color],
        )
        .context("Failed to insert memo")?;

        Ok(id)
    }

    /// Get a memo by id.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<MemoRecord>> {
        conn.query_row(
            "SELECT id, text, audio_path, color, created_at FROM memos WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .optional()
        .context("Failed to query memo")
    }

    /// Delete a memo. Returns false when no such memo existed.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM memos WHERE id = ?1", params![id])
            .context("Failed to delete memo")?;
        Ok(deleted > 0)
    }

    /// List memos, newest first.
    pub fn list(conn: &Connection, limit: usize) -> Result<Vec<MemoRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, text, audio_path, color, created_at FROM memos \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .context("Failed to prepare memo list query")?;

        let rows = stmt
            .query_map(params![limit as i64], Self::from_row)
            .context("Failed to list memos")?;

        let mut memos = Vec::new();
        for row in rows {
            memos.push(row?);
        }

        Ok(memos)
    }

    /// Search memo text with a LIKE filter, newest first.
    pub fn search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<MemoRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, text, audio_path, color, created_at FROM memos \
                 WHERE text LIKE ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )
            .context("Failed to prepare memo search query")?;

        let pattern = format!("%{}%", query);
        let rows = stmt
            .query_map(params![pattern, limit as i64], Self::from_row)
            .context("Failed to search memos")?;

        let mut memos = Vec::new();
        for row in rows {
            memos.push(row?);
        }

        Ok(memos)
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoRecord> {
        Ok(MemoRecord {
            id: row.get(0)?,
            text: row.get(1)?,
            audio_path: row.get(2)?,
            color: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
