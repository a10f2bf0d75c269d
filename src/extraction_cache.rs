//! Idempotent, concurrency-safe extraction cache (spec.md §3 ExtractionCache,
//! §4.4, §5). Reworked from the donor's `ai_cache` get/put pair into the
//! skip-locked claim/wait/release protocol the spec requires.

use crate::clock::Clock;
use crate::errors::CareerEngineError;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use std::time::Duration;

/// How long a waiter sits on a `running` row before surfacing
/// `ExtractionPending` (spec.md §4.4 step 3).
pub const JOIN_WINDOW_MS: u64 = 2500;
const JOIN_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Resume,
    Jd,
}

impl DocType {
    fn as_str(self) -> &'static str {
        match self {
            DocType::Resume => "resume",
            DocType::Jd => "jd",
        }
    }
}

/// The unique key an ExtractionCache row is addressed by (spec.md §3).
#[derive(Debug, Clone)]
pub struct CacheKey {
    pub doc_type: DocType,
    pub text_sha256: String,
    pub extractor_version: String,
    pub model_id: String,
    pub prompt_version: String,
}

pub fn compute_text_sha256(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn ensure_schema(conn: &Connection) -> Result<(), CareerEngineError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS extraction_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            doc_type TEXT NOT NULL,
            text_sha256 TEXT NOT NULL,
            extractor_version TEXT NOT NULL,
            model_id TEXT NOT NULL,
            prompt_version TEXT NOT NULL,
            status TEXT NOT NULL,
            result_json TEXT,
            diagnostics_json TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(doc_type, text_sha256, extractor_version, model_id, prompt_version)
        )",
        [],
    )?;
    Ok(())
}

enum ClaimOutcome {
    Ready(Value),
    Running,
    Claimed,
}

fn lookup_status(
    conn: &Connection,
    key: &CacheKey,
) -> Result<Option<(String, Option<String>)>, CareerEngineError> {
    conn.query_row(
        "SELECT status, result_json FROM extraction_cache
         WHERE doc_type = ?1 AND text_sha256 = ?2 AND extractor_version = ?3
           AND model_id = ?4 AND prompt_version = ?5",
        params![
            key.doc_type.as_str(),
            key.text_sha256,
            key.extractor_version,
            key.model_id,
            key.prompt_version
        ],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(CareerEngineError::from)
}

/// Steps 1-5 of the claim algorithm. Recurses on a losing insert race
/// (step 5's "restart from step 1").
fn try_claim(conn: &Connection, key: &CacheKey, now_iso: &str) -> Result<ClaimOutcome, CareerEngineError> {
    match lookup_status(conn, key)? {
        Some((status, result_json)) if status == "ready" => {
            let raw = result_json.ok_or_else(|| {
                CareerEngineError::PersistenceFailed("ready row missing result_json".to_string())
            })?;
            Ok(ClaimOutcome::Ready(serde_json::from_str(&raw)?))
        }
        Some((status, _)) if status == "running" => Ok(ClaimOutcome::Running),
        Some((status, _)) if status == "failed" => {
            let updated = conn.execute(
                "UPDATE extraction_cache SET status = 'running', result_json = NULL, updated_at = ?1
                 WHERE doc_type = ?2 AND text_sha256 = ?3 AND extractor_version = ?4
                   AND model_id = ?5 AND prompt_version = ?6 AND status = 'failed'",
                params![
                    now_iso,
                    key.doc_type.as_str(),
                    key.text_sha256,
                    key.extractor_version,
                    key.model_id,
                    key.prompt_version
                ],
            )?;
            if updated == 1 {
                Ok(ClaimOutcome::Claimed)
            } else {
                // Another thread reclaimed the failed row first.
                Ok(ClaimOutcome::Running)
            }
        }
        _ => {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO extraction_cache
                 (doc_type, text_sha256, extractor_version, model_id, prompt_version, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'running', ?6, ?6)",
                params![
                    key.doc_type.as_str(),
                    key.text_sha256,
                    key.extractor_version,
                    key.model_id,
                    key.prompt_version,
                    now_iso
                ],
            )?;
            if inserted == 1 {
                Ok(ClaimOutcome::Claimed)
            } else {
                try_claim(conn, key, now_iso)
            }
        }
    }
}

fn mark_ready(conn: &Connection, key: &CacheKey, result: &Value, now_iso: &str) -> Result<(), CareerEngineError> {
    let result_json = serde_json::to_string(result)?;
    conn.execute(
        "UPDATE extraction_cache SET status = 'ready', result_json = ?1, updated_at = ?2
         WHERE doc_type = ?3 AND text_sha256 = ?4 AND extractor_version = ?5
           AND model_id = ?6 AND prompt_version = ?7",
        params![
            result_json,
            now_iso,
            key.doc_type.as_str(),
            key.text_sha256,
            key.extractor_version,
            key.model_id,
            key.prompt_version
        ],
    )?;
    Ok(())
}

fn mark_failed(conn: &Connection, key: &CacheKey, now_iso: &str) -> Result<(), CareerEngineError> {
    conn.execute(
        "UPDATE extraction_cache SET status = 'failed', updated_at = ?1
         WHERE doc_type = ?2 AND text_sha256 = ?3 AND extractor_version = ?4
           AND model_id = ?5 AND prompt_version = ?6",
        params![
            now_iso,
            key.doc_type.as_str(),
            key.text_sha256,
            key.extractor_version,
            key.model_id,
            key.prompt_version
        ],
    )?;
    Ok(())
}

/// Run `compute_fn` for `key` exactly once across racing callers, per the
/// skip-locked protocol in spec.md §4.4. Callers that lose the race either
/// return the winner's result or, if the winner hasn't finished within the
/// join window, surface `ExtractionPending`.
pub async fn get_or_compute<F, Fut>(
    conn: &Mutex<Connection>,
    key: &CacheKey,
    clock: &dyn Clock,
    compute_fn: F,
) -> Result<Value, CareerEngineError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Value, CareerEngineError>>,
{
    let outcome = {
        let guard = conn.lock().expect("extraction cache mutex poisoned");
        ensure_schema(&guard)?;
        try_claim(&guard, key, &clock.now_iso())?
    };

    match outcome {
        ClaimOutcome::Ready(value) => Ok(value),
        ClaimOutcome::Running => wait_for_ready(conn, key).await,
        ClaimOutcome::Claimed => match compute_fn().await {
            Ok(value) => {
                let guard = conn.lock().expect("extraction cache mutex poisoned");
                mark_ready(&guard, key, &value, &clock.now_iso())?;
                Ok(value)
            }
            Err(err) => {
                let guard = conn.lock().expect("extraction cache mutex poisoned");
                mark_failed(&guard, key, &clock.now_iso())?;
                Err(err)
            }
        },
    }
}

async fn wait_for_ready(conn: &Mutex<Connection>, key: &CacheKey) -> Result<Value, CareerEngineError> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(JOIN_WINDOW_MS);
    loop {
        {
            let guard = conn.lock().expect("extraction cache mutex poisoned");
            if let Some((status, result_json)) = lookup_status(&guard, key)? {
                if status == "ready" {
                    let raw = result_json.ok_or_else(|| {
                        CareerEngineError::PersistenceFailed(
                            "ready row missing result_json".to_string(),
                        )
                    })?;
                    return Ok(serde_json::from_str(&raw)?);
                }
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CareerEngineError::ExtractionPending);
        }
        tokio::time::sleep(Duration::from_millis(JOIN_POLL_INTERVAL_MS)).await;
    }
}
