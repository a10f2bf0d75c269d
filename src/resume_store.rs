//! Resume store collaborator (spec.md §6a). Narrow read interface; the
//! core never writes resumes.

use crate::errors::CareerEngineError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Resume {
    pub id: String,
    pub user_id: String,
    pub raw_text: String,
    pub processing_run_id: Option<String>,
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn get_default_resume(&self, user_id: &str) -> Result<Option<Resume>, CareerEngineError>;

    /// Load a resume by id. Used by the engine once the orchestrator has
    /// already resolved `resume_id` via `get_default_resume` (spec.md §4.1
    /// ResolveResume, §4.2 step 1) — a narrow extension of the (a) Resume
    /// store contract, not a second way to discover a default resume.
    async fn get_by_id(&self, resume_id: &str) -> Result<Option<Resume>, CareerEngineError>;
}

pub struct SqliteResumeStore {
    conn: Mutex<Connection>,
}

impl SqliteResumeStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    pub fn ensure_schema(conn: &Connection) -> Result<(), CareerEngineError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS resumes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                raw_text TEXT NOT NULL,
                processing_run_id TEXT,
                is_default INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for SqliteResumeStore {
    async fn get_default_resume(&self, user_id: &str) -> Result<Option<Resume>, CareerEngineError> {
        let guard = self.conn.lock().expect("resume store mutex poisoned");
        Self::ensure_schema(&guard)?;
        guard
            .query_row(
                "SELECT id, user_id, raw_text, processing_run_id FROM resumes
                 WHERE user_id = ?1 AND is_default = 1
                 ORDER BY created_at DESC LIMIT 1",
                params![user_id],
                |row| {
                    Ok(Resume {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        raw_text: row.get(2)?,
                        processing_run_id: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(CareerEngineError::from)
    }

    async fn get_by_id(&self, resume_id: &str) -> Result<Option<Resume>, CareerEngineError> {
        let guard = self.conn.lock().expect("resume store mutex poisoned");
        Self::ensure_schema(&guard)?;
        guard
            .query_row(
                "SELECT id, user_id, raw_text, processing_run_id FROM resumes WHERE id = ?1",
                params![resume_id],
                |row| {
                    Ok(Resume {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        raw_text: row.get(2)?,
                        processing_run_id: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(CareerEngineError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(default: bool) -> SqliteResumeStore {
        let conn = Connection::open_in_memory().unwrap();
        SqliteResumeStore::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO resumes (id, user_id, raw_text, processing_run_id, is_default, created_at)
             VALUES ('r1', 'u1', 'Experienced Rust engineer', NULL, ?1, 'now')",
            params![default as i64],
        )
        .unwrap();
        SqliteResumeStore::new(conn)
    }

    #[tokio::test]
    async fn returns_default_resume_for_user() {
        let store = seeded(true);
        let resume = store.get_default_resume("u1").await.unwrap().unwrap();
        assert_eq!(resume.id, "r1");
        assert_eq!(resume.raw_text, "Experienced Rust engineer");
    }

    #[tokio::test]
    async fn no_default_resume_returns_none() {
        let store = seeded(false);
        assert!(store.get_default_resume("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_by_id_finds_resume_regardless_of_default_flag() {
        let store = seeded(false);
        let resume = store.get_by_id("r1").await.unwrap().unwrap();
        assert_eq!(resume.user_id, "u1");
        assert!(store.get_by_id("missing").await.unwrap().is_none());
    }
}
