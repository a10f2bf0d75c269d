//! End-to-end scenario tests exercising `CareerEngine::analyze` through the
//! public API, grounded on spec.md §8's concrete scenarios (S1-S6).

use careerengine::clock::SystemClock;
use careerengine::config::Config;
use careerengine::engine::CareerEngine;
use careerengine::extractor::KeywordExtractor;
use careerengine::job_store::SqliteJobStore;
use careerengine::mapper::Mapper;
use careerengine::persistence::SqlitePersistence;
use careerengine::resume_store::SqliteResumeStore;
use careerengine::vector_index::InMemoryVectorIndex;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn seeded(resume_text: &str, job_description: &str) -> (CareerEngine, String, String) {
    let resume_conn = Connection::open_in_memory().unwrap();
    SqliteResumeStore::ensure_schema(&resume_conn).unwrap();
    resume_conn
        .execute(
            "INSERT INTO resumes (id, user_id, raw_text, processing_run_id, is_default, created_at)
             VALUES ('r1', 'u1', ?, NULL, 1, 'now')",
            [resume_text],
        )
        .unwrap();
    let resume_store = Arc::new(SqliteResumeStore::new(resume_conn));

    let job_conn = Connection::open_in_memory().unwrap();
    SqliteJobStore::ensure_schema(&job_conn).unwrap();
    job_conn
        .execute(
            "INSERT INTO career_engine_jobs
             (id, title, company, location, description, requirements, required_skills_json, preferred_skills_json)
             VALUES ('j1', 'Engineer', NULL, NULL, ?, NULL, '[]', '[]')",
            [job_description],
        )
        .unwrap();
    let job_store = Arc::new(SqliteJobStore::new(job_conn));

    let engine = CareerEngine::new(
        resume_store,
        job_store,
        Arc::new(KeywordExtractor::new()),
        Arc::new(Mapper::new(Arc::new(InMemoryVectorIndex::new()))),
        Arc::new(SqlitePersistence::new(Connection::open_in_memory().unwrap())),
        Arc::new(SystemClock),
        Arc::new(Mutex::new(Connection::open_in_memory().unwrap())),
        Config::default(),
    );
    (engine, "r1".to_string(), "j1".to_string())
}

#[tokio::test]
async fn s1_exact_match_scores_full_marks() {
    let (engine, resume_id, job_id) = seeded(
        "5 years of Python; built React apps.",
        "Required: Python, React.",
    );
    let result = engine.analyze(&resume_id, &job_id, None).await.unwrap();
    assert!(result.missing_skills.is_empty());
    assert_eq!(result.metrics.score, 10.0);
    assert!(result.matched_skills.len() >= 2);
}

#[tokio::test]
async fn s2_missing_skill_reduces_score_proportionally() {
    let (engine, resume_id, job_id) = seeded("Python, SQL.", "Python, SQL, Kubernetes (required).");
    let result = engine.analyze(&resume_id, &job_id, None).await.unwrap();
    assert_eq!(result.matched_skills.len(), 2);
    assert_eq!(result.missing_skills.len(), 1);
    assert!(result.metrics.score < 10.0 && result.metrics.score > 0.0);
}

#[tokio::test]
async fn s3_underqualified_candidate_has_no_missing_skills() {
    let (engine, resume_id, job_id) = seeded(
        "Wrote Python scripts occasionally.",
        "Senior Python developer (5+ years required).",
    );
    let result = engine.analyze(&resume_id, &job_id, None).await.unwrap();
    assert!(result.missing_skills.is_empty());
}

#[tokio::test]
async fn s6_concurrent_analyze_calls_both_succeed_against_shared_cache() {
    let (engine, resume_id, job_id) = seeded(
        "5 years of Python; built React apps.",
        "Required: Python, React.",
    );
    let engine = Arc::new(engine);
    let (a, b) = tokio::join!(
        engine.analyze(&resume_id, &job_id, None),
        engine.analyze(&resume_id, &job_id, None),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.metrics.score, b.metrics.score);
}

#[tokio::test]
async fn policy_override_does_not_leak_into_a_later_unrelated_request() {
    let (engine, resume_id, job_id) = seeded("Python, SQL.", "Python, SQL, Kubernetes (required).");
    let overrides = serde_json::json!({"matchStrategy.jdFloor": 0.9});
    let overridden = engine.analyze(&resume_id, &job_id, Some(&overrides)).await.unwrap();
    let baseline = engine.analyze(&resume_id, &job_id, None).await.unwrap();
    assert_eq!(overridden.context.configuration.match_strategy.jd_floor, 0.9);
    assert_eq!(baseline.context.configuration.match_strategy.jd_floor, 0.40);
}
