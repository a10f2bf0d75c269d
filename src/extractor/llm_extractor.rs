//! Language-model-backed extractor (spec.md §4.3), grounded on the donor's
//! `CloudAiProvider::parse_job`-style call/parse/validate shape.

use super::Extractor;
use crate::config::ExtractionMode;
use crate::errors::CareerEngineError;
use crate::extracted_skill::{EvidenceSpan, ExtractedSkill, ExtractionOutput};
use crate::language_model::LanguageModelClient;
use crate::level::{Level, LevelSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const MAX_REASK_ATTEMPTS: u32 = 3;

const LEVEL_VOCAB_INSTRUCTIONS: &str = "Proficiency levels, from lowest to highest: none, basic, working, proficient, advanced. \
Infer level from signals such as explicit years of experience, strong verbs (led, architected, built, shipped), and scale indicators (team size, users, throughput). \
When unsure, omit the level field rather than guessing.";

fn skills_system_prompt() -> String {
    format!(
        "You are a skills extraction engine. Read the provided text and return strict JSON with this shape: \
{{\"skills\": [{{\"token\": string, \"level\": {{\"label\": string, \"score\": number, \"years\": number|null, \"confidence\": number, \"signals\": [string]}}|null, \"nice_to_have\": boolean, \"evidence\": [{{\"start\": number, \"end\": number, \"text\": string}}]}}], \"responsibilities\": [string]}}. \
{}",
        LEVEL_VOCAB_INSTRUCTIONS
    )
}

fn responsibilities_system_prompt() -> String {
    "You are a resume/job analysis engine. Return strict JSON: {\"responsibilities\": [string]}, one entry per distinct responsibility or duty in the text.".to_string()
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    label: Option<String>,
    score: Option<f64>,
    years: Option<f64>,
    confidence: Option<f64>,
    #[serde(default)]
    signals: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvidence {
    start: usize,
    end: usize,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RawSkill {
    token: String,
    level: Option<RawLevel>,
    #[serde(default)]
    nice_to_have: bool,
    #[serde(default)]
    evidence: Vec<RawEvidence>,
}

#[derive(Debug, Deserialize)]
struct RawSkillsResponse {
    skills: Vec<RawSkill>,
    #[serde(default)]
    responsibilities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawResponsibilitiesResponse {
    responsibilities: Vec<String>,
}

fn parse_level(label: &str) -> Option<Level> {
    match label.to_lowercase().as_str() {
        "none" => Some(Level::None_),
        "basic" => Some(Level::Basic),
        "working" => Some(Level::Working),
        "proficient" => Some(Level::Proficient),
        "advanced" => Some(Level::Advanced),
        _ => None,
    }
}

/// Open-Question extension (spec.md §9, SPEC_FULL.md §6.2): an opt-in
/// years-of-experience-to-level lookup, consulted only when the model
/// omitted a label but did report years. Off by default.
fn years_to_level(years: f64) -> Level {
    if years < 1.0 {
        Level::Basic
    } else if years < 3.0 {
        Level::Working
    } else if years < 6.0 {
        Level::Proficient
    } else {
        Level::Advanced
    }
}

/// Fold a raw, possibly-absent level into a snapshot, applying the §4.3
/// default-fill and nice-to-have capping rules.
fn resolve_level(raw: Option<RawLevel>, nice_to_have: bool, cap_nice_to_have: bool, years_to_level_enabled: bool) -> LevelSnapshot {
    let Some(raw) = raw else {
        return LevelSnapshot::default_for(cap_nice_to_have && nice_to_have);
    };

    let mut label = raw.label.as_deref().and_then(parse_level).unwrap_or_else(|| {
        match (years_to_level_enabled, raw.years) {
            (true, Some(years)) => years_to_level(years),
            _ => Level::Working,
        }
    });
    let mut score = raw.score.unwrap_or_else(|| label.score());
    if cap_nice_to_have && nice_to_have && score > 2.0 {
        score = 2.0;
        label = Level::from_score(score);
    }
    let confidence = raw.confidence.unwrap_or(0.5);
    LevelSnapshot::known(label, score, raw.years, confidence, raw.signals)
}

fn build_skill(
    raw: RawSkill,
    is_job: bool,
    cap_nice_to_have: bool,
    years_to_level_enabled: bool,
    source_text: &str,
) -> Option<ExtractedSkill> {
    let token = raw.token.trim().to_string();
    if token.is_empty() {
        return None;
    }
    let nice_to_have = is_job && raw.nice_to_have;
    let level = resolve_level(raw.level, nice_to_have, cap_nice_to_have, years_to_level_enabled);
    let evidence = raw
        .evidence
        .into_iter()
        .map(|e| EvidenceSpan {
            start: e.start,
            end: e.end,
            text: e.text,
        })
        .collect();
    Some(
        ExtractedSkill {
            token,
            level,
            nice_to_have,
            evidence,
        }
        .sanitize_evidence(source_text),
    )
}

/// LLM-backed extractor. Holds the language-model collaborator plus the
/// extraction policy knobs relevant to parsing its output.
pub struct LlmExtractor {
    client: Arc<dyn LanguageModelClient>,
    model: String,
    mode: ExtractionMode,
    cap_nice_to_have: bool,
    years_to_level_enabled: bool,
}

impl LlmExtractor {
    pub fn new(
        client: Arc<dyn LanguageModelClient>,
        model: String,
        mode: ExtractionMode,
        cap_nice_to_have: bool,
        years_to_level_enabled: bool,
    ) -> Self {
        Self {
            client,
            model,
            mode,
            cap_nice_to_have,
            years_to_level_enabled,
        }
    }

    async fn call_with_reask(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, CareerEngineError> {
        let mut last_error = None;
        for attempt in 0..=MAX_REASK_ATTEMPTS {
            let effective_system = if attempt == 0 {
                system_prompt.to_string()
            } else {
                format!(
                    "{}\nYour previous response was malformed or did not match the schema. Return ONLY valid JSON matching the schema exactly.",
                    system_prompt
                )
            };
            match self.client.generate_json(&self.model, &effective_system, user_prompt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    log::warn!("extractor reask attempt {} failed: {}", attempt, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            CareerEngineError::ExtractionFailed("reask budget exhausted with no error".to_string())
        }))
    }

    async fn extract_all_in_one(&self, text: &str, is_job: bool) -> Result<ExtractionOutput, CareerEngineError> {
        let system_prompt = skills_system_prompt();
        let value = self.call_with_reask(&system_prompt, text).await?;
        let raw: RawSkillsResponse = serde_json::from_value(value)
            .map_err(|e| CareerEngineError::ExtractionFailed(format!("skills response shape invalid: {}", e)))?;
        let skills = raw
            .skills
            .into_iter()
            .filter_map(|s| build_skill(s, is_job, self.cap_nice_to_have, self.years_to_level_enabled, text))
            .collect();
        Ok(ExtractionOutput {
            skills,
            responsibilities: raw.responsibilities,
        })
    }

    async fn extract_current(&self, text: &str, is_job: bool) -> Result<ExtractionOutput, CareerEngineError> {
        let skills_system = skills_system_prompt();
        let skills_value = self.call_with_reask(&skills_system, text).await?;
        let raw_skills: RawSkillsResponse = serde_json::from_value(skills_value)
            .map_err(|e| CareerEngineError::ExtractionFailed(format!("skills response shape invalid: {}", e)))?;
        let skills = raw_skills
            .skills
            .into_iter()
            .filter_map(|s| build_skill(s, is_job, self.cap_nice_to_have, self.years_to_level_enabled, text))
            .collect();

        let resp_system = responsibilities_system_prompt();
        let resp_value = self.call_with_reask(&resp_system, text).await?;
        let raw_resp: RawResponsibilitiesResponse = serde_json::from_value(resp_value)
            .map_err(|e| CareerEngineError::ExtractionFailed(format!("responsibilities response shape invalid: {}", e)))?;

        Ok(ExtractionOutput {
            skills,
            responsibilities: raw_resp.responsibilities,
        })
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, text: &str, is_job_description: bool) -> Result<ExtractionOutput, CareerEngineError> {
        match self.mode {
            ExtractionMode::AllInOne => self.extract_all_in_one(text, is_job_description).await,
            ExtractionMode::Current => self.extract_current(text, is_job_description).await,
        }
    }
}
