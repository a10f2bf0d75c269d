//! Pipeline controller (spec.md §4.2), grounded on `commands.rs`'s
//! load → validate → act → persist sequencing.

use crate::clock::Clock;
use crate::config::Config;
use crate::errors::CareerEngineError;
use crate::extraction_cache::{self, CacheKey, DocType};
use crate::extractor::{normalize, Extractor};
use crate::gap_result::{AnalysisContext, GapAnalysisResult};
use crate::job_store::{Job, JobStore};
use crate::mapper::{Mapper, SourceType};
use crate::persistence::{NewProcessingRun, Persistence, ReportStatusState};
use crate::renderer;
use crate::resume_store::ResumeStore;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

const CODE_VERSION: &str = "1.0.0";
const EXTRACTOR_VERSION: &str = "v1";
const PROMPT_VERSION: &str = "v1";
const EMBEDDING_MODEL_ID: &str = "hashed-bow-v1";
const TAXONOMY_SNAPSHOT_ID: &str = "onet-seed";

/// The core's collaborators, injected at construction (spec.md §6). Each
/// field is a narrow seam the engine depends on without knowing the
/// concrete implementation.
pub struct CareerEngine {
    resume_store: Arc<dyn ResumeStore>,
    job_store: Arc<dyn JobStore>,
    extractor: Arc<dyn Extractor>,
    mapper: Arc<Mapper>,
    persistence: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    cache_conn: Arc<Mutex<Connection>>,
    config: Config,
}

impl CareerEngine {
    pub fn new(
        resume_store: Arc<dyn ResumeStore>,
        job_store: Arc<dyn JobStore>,
        extractor: Arc<dyn Extractor>,
        mapper: Arc<Mapper>,
        persistence: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
        cache_conn: Arc<Mutex<Connection>>,
        config: Config,
    ) -> Self {
        Self {
            resume_store,
            job_store,
            extractor,
            mapper,
            persistence,
            clock,
            cache_conn,
            config,
        }
    }

    /// Run one resume/job skill-gap analysis end to end (spec.md §4.2's
    /// 8 steps). On any stage failure, `ReportStatus` is cleared so
    /// clients can retry; the `ProcessingRun` row itself is left in place.
    pub async fn analyze(
        &self,
        resume_id: &str,
        job_id: &str,
        policy_overrides: Option<&serde_json::Value>,
    ) -> Result<GapAnalysisResult, CareerEngineError> {
        let resume = self
            .resume_store
            .get_by_id(resume_id)
            .await?
            .ok_or_else(|| CareerEngineError::ResumeMissing(resume_id.to_string()))?;
        if resume.raw_text.trim().is_empty() {
            return Err(CareerEngineError::ResumeMissing(resume_id.to_string()));
        }

        let job = self
            .job_store
            .get_job(job_id)
            .await?
            .ok_or_else(|| CareerEngineError::JobNotFound(job_id.to_string()))?;

        let user_id = resume.user_id.clone();
        self.persistence
            .set_report_status(&user_id, job_id, ReportStatusState::Generating, &self.clock.now_iso())?;

        match self.run_analysis(&resume.raw_text, &job, resume_id, job_id, policy_overrides).await {
            Ok(result) => {
                self.persistence
                    .set_report_status(&user_id, job_id, ReportStatusState::Ready, &self.clock.now_iso())?;
                Ok(result)
            }
            Err(err) => {
                self.persistence.clear_report_status(&user_id, job_id)?;
                Err(err)
            }
        }
    }

    async fn run_analysis(
        &self,
        resume_text: &str,
        job: &Job,
        resume_id: &str,
        job_id: &str,
        policy_overrides: Option<&serde_json::Value>,
    ) -> Result<GapAnalysisResult, CareerEngineError> {
        let effective_config = match policy_overrides {
            Some(overrides) => self.config.with_overrides(overrides)?,
            None => self.config.clone(),
        };

        let run_id = self.persistence.create_processing_run(
            NewProcessingRun {
                resume_id: resume_id.to_string(),
                job_id: job_id.to_string(),
                llm_model_id: effective_config.extraction.extractor_model.clone(),
                embedding_model_id: EMBEDDING_MODEL_ID.to_string(),
                code_version: CODE_VERSION.to_string(),
                taxonomy_snapshot_id: TAXONOMY_SNAPSHOT_ID.to_string(),
            },
            &self.clock.now_iso(),
        )?;
        self.persistence.set_processing_run_config(run_id, &effective_config)?;

        let job_text = job.full_text();

        let resume_output = self.extract_cached(DocType::Resume, resume_text, false).await?;
        let job_output = self.extract_cached(DocType::Jd, &job_text, true).await?;

        let resume_mapped = self
            .mapper
            .map_tokens(&resume_output.skills, SourceType::Resume, resume_text, &effective_config)
            .await?;
        let mut diagnostics = self.mapper.get_last_mapping_diagnostics();

        let job_mapped = self
            .mapper
            .map_tokens(&job_output.skills, SourceType::Jd, &job_text, &effective_config)
            .await?;
        diagnostics.merge(self.mapper.get_last_mapping_diagnostics());

        self.mapper
            .map_tasks(&resume_output.responsibilities, resume_text, &effective_config)
            .await?;
        diagnostics.merge(self.mapper.get_last_mapping_diagnostics());

        self.mapper
            .map_tasks(&job_output.responsibilities, &job_text, &effective_config)
            .await?;
        diagnostics.merge(self.mapper.get_last_mapping_diagnostics());

        let context = AnalysisContext {
            resume_id: resume_id.to_string(),
            job_id: job_id.to_string(),
            title: Some(job.title.clone()),
            company: job.company.clone(),
            configuration: effective_config,
            taxonomy_snapshot_tag: TAXONOMY_SNAPSHOT_ID.to_string(),
        };

        let mut result = crate::analyzer::compare(&resume_mapped, &job_mapped, diagnostics, context);
        result.markdown = Some(renderer::render(&result));

        self.persistence
            .insert_gap_analysis_result(run_id, &result, &self.clock.now_iso())?;

        Ok(result)
    }

    async fn extract_cached(
        &self,
        doc_type: DocType,
        text: &str,
        is_job_description: bool,
    ) -> Result<crate::extracted_skill::ExtractionOutput, CareerEngineError> {
        let key = CacheKey {
            doc_type,
            text_sha256: extraction_cache::compute_text_sha256(&normalize(text)),
            extractor_version: EXTRACTOR_VERSION.to_string(),
            model_id: self.config.extraction.extractor_model.clone(),
            prompt_version: PROMPT_VERSION.to_string(),
        };
        let extractor = Arc::clone(&self.extractor);
        let owned_text = text.to_string();
        let value = extraction_cache::get_or_compute(&self.cache_conn, &key, self.clock.as_ref(), || async move {
            let output = extractor.extract(&owned_text, is_job_description).await?;
            serde_json::to_value(output).map_err(CareerEngineError::from)
        })
        .await?;
        serde_json::from_value(value).map_err(CareerEngineError::from)
    }
}
