//! Job store collaborator (spec.md §6b). Narrow read interface.

use crate::errors::CareerEngineError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub requirements: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
}

impl Job {
    /// Concatenated job text plus the enrichment block the mapper needs
    /// for mapping quality (spec.md §4.2 step 2).
    pub fn full_text(&self) -> String {
        let mut text = self.description.clone();
        if let Some(requirements) = &self.requirements {
            text.push('\n');
            text.push_str(requirements);
        }
        text.push_str("\n\nTitle: ");
        text.push_str(&self.title);
        if !self.required_skills.is_empty() {
            text.push_str("\nRequired skills: ");
            text.push_str(&self.required_skills.join(", "));
        }
        if !self.preferred_skills.is_empty() {
            text.push_str("\nPreferred skills: ");
            text.push_str(&self.preferred_skills.join(", "));
        }
        if let Some(company) = &self.company {
            text.push_str("\nCompany: ");
            text.push_str(company);
        }
        if let Some(location) = &self.location {
            text.push_str("\nLocation: ");
            text.push_str(location);
        }
        text
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<Option<Job>, CareerEngineError>;
}

pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    pub fn ensure_schema(conn: &Connection) -> Result<(), CareerEngineError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS career_engine_jobs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                company TEXT,
                location TEXT,
                description TEXT NOT NULL,
                requirements TEXT,
                required_skills_json TEXT NOT NULL DEFAULT '[]',
                preferred_skills_json TEXT NOT NULL DEFAULT '[]'
            )",
            [],
        )?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<Job>, CareerEngineError> {
        let guard = self.conn.lock().expect("job store mutex poisoned");
        Self::ensure_schema(&guard)?;
        guard
            .query_row(
                "SELECT id, title, company, location, description, requirements,
                        required_skills_json, preferred_skills_json
                 FROM career_engine_jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    let required_skills_json: String = row.get(6)?;
                    let preferred_skills_json: String = row.get(7)?;
                    Ok(Job {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        company: row.get(2)?,
                        location: row.get(3)?,
                        description: row.get(4)?,
                        requirements: row.get(5)?,
                        required_skills: serde_json::from_str(&required_skills_json).unwrap_or_default(),
                        preferred_skills: serde_json::from_str(&preferred_skills_json).unwrap_or_default(),
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

    fn seeded() -> SqliteJobStore {
        let conn = Connection::open_in_memory().unwrap();
        SqliteJobStore::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO career_engine_jobs
             (id, title, company, location, description, requirements, required_skills_json, preferred_skills_json)
             VALUES ('j1', 'Senior Engineer', 'Acme', 'Remote', 'Build things', 'Python required',
                     '[\"Python\",\"React\"]', '[\"Rust\"]')",
            [],
        )
        .unwrap();
        SqliteJobStore::new(conn)
    }

    #[tokio::test]
    async fn loads_job_with_skill_lists() {
        let store = seeded();
        let job = store.get_job("j1").await.unwrap().unwrap();
        assert_eq!(job.title, "Senior Engineer");
        assert_eq!(job.required_skills, vec!["Python", "React"]);
    }

    #[tokio::test]
    async fn missing_job_returns_none() {
        let store = seeded();
        assert!(store.get_job("nope").await.unwrap().is_none());
    }

    #[test]
    fn full_text_includes_enrichment_block() {
        let job = Job {
            id: "j1".to_string(),
            title: "Senior Engineer".to_string(),
            company: Some("Acme".to_string()),
            location: Some("Remote".to_string()),
            description: "Build things".to_string(),
            requirements: Some("Python required".to_string()),
            required_skills: vec!["Python".to_string()],
            preferred_skills: vec!["Rust".to_string()],
        };
        let text = job.full_text();
        assert!(text.contains("Senior Engineer"));
        assert!(text.contains("Required skills: Python"));
        assert!(text.contains("Acme"));
    }
}
