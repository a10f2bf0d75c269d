//! Persisted, canonical analysis output (spec.md §3 "GapAnalysisResult").
//! Three disjoint skill-in-result shapes rather than one struct with a
//! status/origin discriminator field, per the REDESIGN FLAGS in spec.md §9.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::level::LevelSnapshot;
use crate::skill::Skill;
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    MeetsOrExceeds,
    Underqualified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub skill: Skill,
    pub token: String,
    pub candidate_level: LevelSnapshot,
    pub required_level: LevelSnapshot,
    pub level_delta: f64,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSkill {
    pub skill: Skill,
    pub token: String,
    pub required_level: LevelSnapshot,
    pub hot_tech: bool,
    pub in_demand: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeOnlySkill {
    pub skill: Skill,
    pub token: String,
    pub candidate_level: LevelSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub resume_id: String,
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub configuration: Config,
    pub taxonomy_snapshot_tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysisResult {
    pub version: String,
    pub context: AnalysisContext,
    pub metrics: Metrics,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<MissingSkill>,
    pub resume_skills: Vec<ResumeOnlySkill>,
    pub diagnostics: Diagnostics,
    pub extras: serde_json::Value,
    pub markdown: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::level::LevelSnapshot;
    use crate::skill::{Skill, SkillFramework, SkillType};

    fn sample_skill() -> Skill {
        Skill {
            id: "onet:python".to_string(),
            display_name: "Python".to_string(),
            taxonomy_path: "Technology Skills/Programming Languages/Python".to_string(),
            framework: SkillFramework::ONet,
            external_id: Some("onet:python".to_string()),
            hot_tech: false,
            in_demand: true,
            skill_type: SkillType::Skill,
            embedding_handle: "python".to_string(),
            aliases: vec!["Python3".to_string()],
        }
    }

    fn sample() -> GapAnalysisResult {
        GapAnalysisResult {
            version: CURRENT_VERSION.to_string(),
            context: AnalysisContext {
                resume_id: "r1".to_string(),
                job_id: "j1".to_string(),
                title: Some("Engineer".to_string()),
                company: None,
                configuration: Config::default(),
                taxonomy_snapshot_tag: "test".to_string(),
            },
            metrics: Metrics { score: 8.5 },
            matched_skills: vec![MatchedSkill {
                skill: sample_skill(),
                token: "Python".to_string(),
                candidate_level: LevelSnapshot::known(crate::level::Level::Proficient, 3.0, None, 0.8, vec![]),
                required_level: LevelSnapshot::known(crate::level::Level::Working, 2.0, None, 0.6, vec![]),
                level_delta: 1.0,
                status: MatchStatus::MeetsOrExceeds,
            }],
            missing_skills: vec![],
            resume_skills: vec![],
            diagnostics: Diagnostics::default(),
            extras: serde_json::json!({"score_components": {"hot_tech_penalty": 0.0}}),
            markdown: Some("# Report".to_string()),
        }
    }

    /// spec.md §8 property P8: a result persisted with a fixed
    /// `analysis_version` round-trips byte-equivalent through
    /// serialization and canonical reload.
    #[test]
    fn serde_round_trip_is_byte_equivalent() {
        let original = sample();
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: GapAnalysisResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);
        let re_encoded = serde_json::to_string(&decoded).unwrap();
        assert_eq!(re_encoded, encoded);
    }
}
