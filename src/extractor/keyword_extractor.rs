//! Deterministic keyword-matching extractor (spec.md §4.3 "test mode"),
//! grounded on the donor pack's ATS keyword-matching style
//! (other_examples/..advanced_scoring.rs's `ExactMatcher`). Selected
//! explicitly at engine construction when no language model is wired in —
//! never a silent runtime fallback.

use super::Extractor;
use crate::extracted_skill::{ExtractedSkill, ExtractionOutput};
use crate::level::LevelSnapshot;
use async_trait::async_trait;
use regex::Regex;

/// Small built-in vocabulary; test-mode output has bounded confidence and
/// carries no evidence spans (spec.md §4.3).
const VOCABULARY: &[&str] = &[
    "Python", "Rust", "JavaScript", "TypeScript", "SQL", "Java", "React",
    "Kubernetes", "Docker", "AWS", "Project Management", "Leadership",
    "Communication", "Data Analysis",
];

const TEST_MODE_CONFIDENCE: f64 = 0.4;

pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    fn find_tokens(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for &term in VOCABULARY {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            let re = Regex::new(&pattern).expect("static keyword pattern is valid");
            if re.is_match(text) {
                found.push(term.to_string());
            }
        }
        found
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for KeywordExtractor {
    async fn extract(
        &self,
        text: &str,
        is_job_description: bool,
    ) -> Result<ExtractionOutput, crate::errors::CareerEngineError> {
        let skills = self
            .find_tokens(text)
            .into_iter()
            .map(|token| ExtractedSkill {
                token,
                level: LevelSnapshot::known(
                    crate::level::Level::Working,
                    2.0,
                    None,
                    TEST_MODE_CONFIDENCE,
                    vec!["keyword match".to_string()],
                ),
                nice_to_have: false,
                evidence: Vec::new(),
            })
            .collect();
        let _ = is_job_description;
        Ok(ExtractionOutput {
            skills,
            responsibilities: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_vocabulary_terms_case_insensitively() {
        let extractor = KeywordExtractor::new();
        let out = extractor
            .extract("5 years of python; built react apps with typescript", false)
            .await
            .unwrap();
        let tokens: Vec<&str> = out.skills.iter().map(|s| s.token.as_str()).collect();
        assert!(tokens.contains(&"Python"));
        assert!(tokens.contains(&"React"));
        assert!(tokens.contains(&"TypeScript"));
    }

    #[tokio::test]
    async fn test_mode_output_has_no_evidence_and_bounded_confidence() {
        let extractor = KeywordExtractor::new();
        let out = extractor.extract("Python developer", false).await.unwrap();
        for skill in &out.skills {
            assert!(skill.evidence.is_empty());
            match &skill.level {
                LevelSnapshot::Known { confidence, .. } => assert!(*confidence <= 0.5),
                LevelSnapshot::Unknown => panic!("expected known level"),
            }
        }
    }
}
