//! Memo store operations shared by the CLI and REST API.
//!
//! Memos are owned by the persistence layer; the session coordinator only
//! ever references them by id. A memo is created from a finished transcript
//! (or typed text), optionally carrying the recording's audio file, and is
//! immutable until deleted.

use crate::db::{self, MemoRepository};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Input for saving a memo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemo {
    pub text: String,
    pub audio_path: Option<String>,
    pub color: String,
}

/// A stored memo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoEntry {
    pub id: String,
    pub text: String,
    pub audio_path: Option<String>,
    pub color: String,
    pub created_at: String,
}

impl From<db::MemoRecord> for MemoEntry {
    fn from(record: db::MemoRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            audio_path: record.audio_path,
            color: record.color,
            created_at: record.created_at,
        }
    }
}

/// Save a memo and return its id.
pub fn save(memo: &NewMemo) -> Result<String> {
    if memo.text.trim().is_empty() {
        return Err(anyhow!("Memo text is empty"));
    }

    let conn = db::init_db()?;
    MemoRepository::insert(
        &conn,
        memo.text.trim(),
        memo.audio_path.as_deref(),
        &memo.color,
    )
}

/// List memos, newest first; filtered when a query is given.
pub fn list(query: Option<&str>, limit: usize) -> Result<Vec<MemoEntry>> {
    let conn = db::init_db()?;
    let records = match query {
        Some(q) if !q.trim().is_empty() => MemoRepository::search(&conn, q.trim(), limit)?,
        _ => MemoRepository::list(&conn, limit)?,
    };
    Ok(records.into_iter().map(MemoEntry::from).collect())
}

/// Get a single memo by id.
pub fn get(id: &str) -> Result<Option<MemoEntry>> {
    let conn = db::init_db()?;
    Ok(MemoRepository::get(&conn, id)?.map(MemoEntry::from))
}

/// Delete a memo; its audio file (if any) goes with it.
pub fn delete(id: &str) -> Result<()> {
    let conn = db::init_db()?;
    let record = MemoRepository::get(&conn, id)?
        .ok_or_else(|| anyhow!("Memo {} not found", id))?;

    if !MemoRepository::delete(&conn, id)? {
        return Err(anyhow!("Memo {} not found", id));
    }

    if let Some(audio_path) = record.audio_path {
        if let Err(e) = std::fs::remove_file(&audio_path) {
            tracing::warn!("Failed to delete audio file {}: {}", audio_path, e);
        }
    }

    Ok(())
}
