//! End-to-end demo driver: seeds an in-memory sqlite database and mock
//! collaborators, then runs one analysis through the orchestrator and
//! prints the rendered markdown report. Replaces the donor's
//! `populate_test_data` seeding script and Tauri `main.rs` entry point.

use careerengine::clock::SystemClock;
use careerengine::config::Config;
use careerengine::engine::CareerEngine;
use careerengine::extractor::KeywordExtractor;
use careerengine::job_store::SqliteJobStore;
use careerengine::logging::init_logging;
use careerengine::mapper::Mapper;
use careerengine::orchestrator;
use careerengine::persistence::SqlitePersistence;
use careerengine::resume_store::SqliteResumeStore;
use careerengine::vector_index::InMemoryVectorIndex;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() {
    init_logging(&std::env::current_dir().unwrap_or_else(|_| ".".into()));

    let resume_conn = Connection::open_in_memory().expect("open resume db");
    SqliteResumeStore::ensure_schema(&resume_conn).expect("seed resume schema");
    resume_conn
        .execute(
            "INSERT INTO resumes (id, user_id, raw_text, processing_run_id, is_default, created_at)
             VALUES ('r1', 'u1', '5 years of Python; built React apps.', NULL, 1, 'now')",
            [],
        )
        .expect("seed resume row");
    let resume_store = Arc::new(SqliteResumeStore::new(resume_conn));

    let job_conn = Connection::open_in_memory().expect("open job db");
    SqliteJobStore::ensure_schema(&job_conn).expect("seed job schema");
    job_conn
        .execute(
            "INSERT INTO career_engine_jobs
             (id, title, company, location, description, requirements, required_skills_json, preferred_skills_json)
             VALUES ('j1', 'Senior Engineer', 'Acme', 'Remote', 'Required: Python, React, Kubernetes.', NULL,
                     '[\"Python\",\"React\",\"Kubernetes\"]', '[]')",
            [],
        )
        .expect("seed job row");
    let job_store = Arc::new(SqliteJobStore::new(job_conn));

    let engine = CareerEngine::new(
        resume_store.clone(),
        job_store,
        Arc::new(KeywordExtractor::new()),
        Arc::new(Mapper::new(Arc::new(InMemoryVectorIndex::new()))),
        Arc::new(SqlitePersistence::new(Connection::open_in_memory().expect("open persistence db"))),
        Arc::new(SystemClock),
        Arc::new(Mutex::new(Connection::open_in_memory().expect("open cache db"))),
        Config::default(),
    );

    let state = orchestrator::run(resume_store.as_ref(), &engine, "u1".to_string(), "j1".to_string(), None).await;

    match (state.result, state.error) {
        (Some(result), _) => {
            println!("score: {:.2}/10", result.metrics.score);
            println!("{}", result.markdown.unwrap_or_default());
        }
        (None, Some(err)) => eprintln!("analysis failed: {}", err),
        (None, None) => eprintln!("analysis produced neither a result nor an error"),
    }
}
