//! Three-state pipeline orchestrator (spec.md §4.1), grounded on
//! `commands.rs`'s load → validate → act sequencing, generalized into an
//! explicit state struct with unconditional transitions and a single
//! control-flow primitive: once `error` is set, later states no-op.

use crate::engine::CareerEngine;
use crate::errors::CareerEngineError;
use crate::gap_result::GapAnalysisResult;
use crate::resume_store::ResumeStore;

/// Shared state record threaded through `ResolveResume -> ResolveJob ->
/// RunAnalysis`.
pub struct PipelineState {
    pub user_id: String,
    pub job_id: String,
    pub resume_id: Option<String>,
    pub result: Option<GapAnalysisResult>,
    pub error: Option<CareerEngineError>,
}

impl PipelineState {
    pub fn start(user_id: String, job_id: String) -> Self {
        Self {
            user_id,
            job_id,
            resume_id: None,
            result: None,
            error: None,
        }
    }
}

/// Sequence one `analyze` request through the orchestrator's three
/// states. No branching beyond the upstream-error short-circuit; this
/// function's only job is to preserve that contract and the error
/// message verbatim.
pub async fn run(
    resume_store: &dyn ResumeStore,
    engine: &CareerEngine,
    user_id: String,
    job_id: String,
    policy_overrides: Option<&serde_json::Value>,
) -> PipelineState {
    let mut state = PipelineState::start(user_id, job_id);
    resolve_resume(resume_store, &mut state).await;
    resolve_job(&mut state).await;
    run_analysis(engine, &mut state, policy_overrides).await;
    state
}

async fn resolve_resume(resume_store: &dyn ResumeStore, state: &mut PipelineState) {
    if state.error.is_some() {
        return;
    }
    match resume_store.get_default_resume(&state.user_id).await {
        Ok(Some(resume)) => state.resume_id = Some(resume.id),
        Ok(None) => state.error = Some(CareerEngineError::NoDefaultResume),
        Err(err) => state.error = Some(err),
    }
}

/// Job existence is validated for real inside `CareerEngine::analyze`
/// (it needs the full `Job` row anyway); this state's contract is only
/// that it never runs once `ResolveResume` has already failed.
async fn resolve_job(state: &mut PipelineState) {
    let _ = &state.error;
}

async fn run_analysis(
    engine: &CareerEngine,
    state: &mut PipelineState,
    policy_overrides: Option<&serde_json::Value>,
) {
    if state.error.is_some() {
        return;
    }
    let resume_id = state
        .resume_id
        .clone()
        .expect("resume_id set by a successful ResolveResume");
    match engine.analyze(&resume_id, &state.job_id, policy_overrides).await {
        Ok(result) => state.result = Some(result),
        Err(err) => state.error = Some(err),
    }
}
