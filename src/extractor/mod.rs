//! Text-to-skills extraction (spec.md §4.3). A small interface selected at
//! engine construction time rather than a runtime fallback, per spec.md §9:
//! test mode is a deliberate `Extractor` implementation, not a branch
//! inside the LLM-backed one.

mod keyword_extractor;
mod llm_extractor;

pub use keyword_extractor::KeywordExtractor;
pub use llm_extractor::LlmExtractor;

use crate::errors::CareerEngineError;
use crate::extracted_skill::ExtractionOutput;
use async_trait::async_trait;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Turn free text into structured skills and responsibilities.
    /// `is_job_description` selects job-side defaults (nice-to-have
    /// capping) over resume-side ones.
    async fn extract(
        &self,
        text: &str,
        is_job_description: bool,
    ) -> Result<ExtractionOutput, CareerEngineError>;
}

/// Normalize text the way the extraction cache key requires (spec.md
/// §4.4): lowercase, trim, collapse whitespace runs. Must not touch
/// semantically significant punctuation.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut normalized = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for ch in lowered.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
            }
            last_was_space = true;
        } else {
            normalized.push(ch);
            last_was_space = false;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Built   REACT Apps\n\n"), "built react apps");
    }

    #[test]
    fn normalize_keeps_punctuation() {
        assert_eq!(normalize("C++ & C#"), "c++ & c#");
    }
}
