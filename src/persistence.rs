//! Persisted row shapes for `ProcessingRun`, `GapAnalysisResult` and
//! `ReportStatus` (spec.md §3, §6e), grounded on `db.rs`'s
//! connection/insert idioms and `ai_cache.rs`'s JSON-column storage.
//!
//! The dual legacy/canonical format (spec.md §3, §9) is kept on the
//! `gap_analysis_results` row: a flattened legacy column set plus the
//! canonical `analysis_json`/`analysis_version` pair new readers dispatch
//! on exclusively.

use crate::config::Config;
use crate::errors::CareerEngineError;
use crate::gap_result::GapAnalysisResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

pub fn ensure_schema(conn: &Connection) -> Result<(), CareerEngineError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS processing_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resume_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            effective_config_json TEXT,
            llm_model_id TEXT NOT NULL,
            embedding_model_id TEXT NOT NULL,
            code_version TEXT NOT NULL,
            taxonomy_snapshot_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS gap_analysis_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            processing_run_id INTEGER NOT NULL,
            resume_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            analysis_version TEXT NOT NULL,
            analysis_json TEXT NOT NULL,
            matched_skills_json TEXT NOT NULL,
            missing_skills_json TEXT NOT NULL,
            resume_skills_json TEXT NOT NULL,
            score REAL NOT NULL,
            markdown TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS report_status (
            user_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            status TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, job_id)
        )",
        [],
    )?;
    Ok(())
}

/// Identifying metadata captured when a `ProcessingRun` is created, before
/// the effective configuration is known (spec.md §3).
pub struct NewProcessingRun {
    pub resume_id: String,
    pub job_id: String,
    pub llm_model_id: String,
    pub embedding_model_id: String,
    pub code_version: String,
    pub taxonomy_snapshot_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatusState {
    Generating,
    Ready,
}

impl ReportStatusState {
    fn as_str(self) -> &'static str {
        match self {
            ReportStatusState::Generating => "generating",
            ReportStatusState::Ready => "ready",
        }
    }
}

/// Persistence collaborator (spec.md §6e): the core's own row I/O for the
/// three persisted shapes it owns. Resume/job storage is a separate,
/// narrower seam (`resume_store.rs`/`job_store.rs`).
pub trait Persistence: Send + Sync {
    /// Create a `ProcessingRun` row at analysis start. Immutable after
    /// the effective configuration is attached.
    fn create_processing_run(&self, run: NewProcessingRun, now_iso: &str) -> Result<i64, CareerEngineError>;

    /// Attach the effective configuration snapshot (spec.md §4.2 step 3).
    fn set_processing_run_config(&self, run_id: i64, config: &Config) -> Result<(), CareerEngineError>;

    /// Insert the canonical result plus its legacy flattened columns.
    /// Rows are never mutated after insert (spec.md §3 lifecycle).
    fn insert_gap_analysis_result(
        &self,
        run_id: i64,
        result: &GapAnalysisResult,
        now_iso: &str,
    ) -> Result<i64, CareerEngineError>;

    /// Upsert the (user, job) report status. `ready` is only ever set
    /// after a `GapAnalysisResult` commit (spec.md §5 ordering guarantee).
    fn set_report_status(
        &self,
        user_id: &str,
        job_id: &str,
        status: ReportStatusState,
        now_iso: &str,
    ) -> Result<(), CareerEngineError>;

    /// Clear the report status row on analysis failure (spec.md §4.2,
    /// §7): readers see neither `generating` nor `ready` and can retry.
    fn clear_report_status(&self, user_id: &str, job_id: &str) -> Result<(), CareerEngineError>;

    fn get_report_status(&self, user_id: &str, job_id: &str) -> Result<Option<ReportStatusState>, CareerEngineError>;

    /// Reload a `GapAnalysisResult` from its canonical `analysis_json`
    /// column (spec.md §3, §8 property P8: a stored result round-trips
    /// byte-equivalent through serialization and canonical reload).
    fn get_gap_analysis_result(&self, result_id: i64) -> Result<Option<GapAnalysisResult>, CareerEngineError>;
}

pub struct SqlitePersistence {
    conn: Mutex<Connection>,
}

impl SqlitePersistence {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }
}

impl Persistence for SqlitePersistence {
    fn create_processing_run(&self, run: NewProcessingRun, now_iso: &str) -> Result<i64, CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        ensure_schema(&guard)?;
        guard.execute(
            "INSERT INTO processing_runs
             (resume_id, job_id, effective_config_json, llm_model_id, embedding_model_id,
              code_version, taxonomy_snapshot_id, created_at)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.resume_id,
                run.job_id,
                run.llm_model_id,
                run.embedding_model_id,
                run.code_version,
                run.taxonomy_snapshot_id,
                now_iso
            ],
        )?;
        Ok(guard.last_insert_rowid())
    }

    fn set_processing_run_config(&self, run_id: i64, config: &Config) -> Result<(), CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        let config_json = serde_json::to_string(config)?;
        guard.execute(
            "UPDATE processing_runs SET effective_config_json = ?1 WHERE id = ?2",
            params![config_json, run_id],
        )?;
        Ok(())
    }

    fn insert_gap_analysis_result(
        &self,
        run_id: i64,
        result: &GapAnalysisResult,
        now_iso: &str,
    ) -> Result<i64, CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        ensure_schema(&guard)?;
        let analysis_json = serde_json::to_string(result)?;
        let matched_json = serde_json::to_string(&result.matched_skills)?;
        let missing_json = serde_json::to_string(&result.missing_skills)?;
        let resume_json = serde_json::to_string(&result.resume_skills)?;
        guard.execute(
            "INSERT INTO gap_analysis_results
             (processing_run_id, resume_id, job_id, analysis_version, analysis_json,
              matched_skills_json, missing_skills_json, resume_skills_json, score,
              markdown, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                result.context.resume_id,
                result.context.job_id,
                result.version,
                analysis_json,
                matched_json,
                missing_json,
                resume_json,
                result.metrics.score,
                result.markdown,
                now_iso
            ],
        )?;
        Ok(guard.last_insert_rowid())
    }

    fn set_report_status(
        &self,
        user_id: &str,
        job_id: &str,
        status: ReportStatusState,
        now_iso: &str,
    ) -> Result<(), CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        ensure_schema(&guard)?;
        guard.execute(
            "INSERT INTO report_status (user_id, job_id, status, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, job_id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![user_id, job_id, status.as_str(), now_iso],
        )?;
        Ok(())
    }

    fn clear_report_status(&self, user_id: &str, job_id: &str) -> Result<(), CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        ensure_schema(&guard)?;
        guard.execute(
            "DELETE FROM report_status WHERE user_id = ?1 AND job_id = ?2",
            params![user_id, job_id],
        )?;
        Ok(())
    }

    fn get_report_status(&self, user_id: &str, job_id: &str) -> Result<Option<ReportStatusState>, CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        ensure_schema(&guard)?;
        let status: Option<String> = guard
            .query_row(
                "SELECT status FROM report_status WHERE user_id = ?1 AND job_id = ?2",
                params![user_id, job_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map(|s| match s.as_str() {
            "ready" => ReportStatusState::Ready,
            _ => ReportStatusState::Generating,
        }))
    }

    fn get_gap_analysis_result(&self, result_id: i64) -> Result<Option<GapAnalysisResult>, CareerEngineError> {
        let guard = self.conn.lock().expect("persistence mutex poisoned");
        ensure_schema(&guard)?;
        let analysis_json: Option<String> = guard
            .query_row(
                "SELECT analysis_json FROM gap_analysis_results WHERE id = ?1",
                params![result_id],
                |row| row.get(0),
            )
            .optional()?;
        analysis_json
            .map(|json| serde_json::from_str(&json).map_err(CareerEngineError::from))
            .transpose()
    }
}
