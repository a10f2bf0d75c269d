//! Extractor output types (spec.md §3 "ExtractedSkill", §4.3).

use crate::level::LevelSnapshot;
use serde::{Deserialize, Serialize};

/// A span of the source text backing a detected skill, plus the fragment
/// itself so evidence survives even if offsets later go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl EvidenceSpan {
    /// Whether this span is a valid offset pair into `source`. Invalid
    /// spans are dropped silently per spec.md §4.3.
    pub fn is_valid_for(&self, source: &str) -> bool {
        self.start <= self.end && self.end <= source.len() && source.is_char_boundary(self.start)
            && source.is_char_boundary(self.end)
    }
}

/// One skill detected in resume or job text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSkill {
    pub token: String,
    pub level: LevelSnapshot,
    /// Only meaningful for job descriptions (spec.md §3).
    pub nice_to_have: bool,
    pub evidence: Vec<EvidenceSpan>,
}

impl ExtractedSkill {
    /// Drop evidence spans that don't validate against the source text,
    /// per spec.md §4.3 ("when invalid, drop them silently").
    pub fn sanitize_evidence(mut self, source: &str) -> Self {
        self.evidence.retain(|span| span.is_valid_for(source));
        self
    }
}

/// Full extractor output for one document: skills plus free-text
/// responsibilities (spec.md §4.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub skills: Vec<ExtractedSkill>,
    pub responsibilities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_span_is_dropped() {
        let source = "Built React apps";
        let skill = ExtractedSkill {
            token: "React".into(),
            level: LevelSnapshot::default_for(false),
            nice_to_have: false,
            evidence: vec![
                EvidenceSpan { start: 6, end: 11, text: "React".into() },
                EvidenceSpan { start: 100, end: 200, text: "garbage".into() },
            ],
        }
        .sanitize_evidence(source);
        assert_eq!(skill.evidence.len(), 1);
        assert_eq!(skill.evidence[0].text, "React");
    }
}
