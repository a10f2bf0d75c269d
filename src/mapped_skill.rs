//! Mapper output (spec.md §3 "MappedSkill").

use crate::level::LevelSnapshot;
use crate::skill::Skill;
use serde::{Deserialize, Serialize};

/// Which side of the pipeline a mapped level snapshot came from. A sum
/// type, not a pair of optional fields, per spec.md §9's call to replace
/// nested-optional dicts with a proper variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappedLevel {
    Candidate(LevelSnapshot),
    Required(LevelSnapshot),
}

impl MappedLevel {
    pub fn snapshot(&self) -> &LevelSnapshot {
        match self {
            MappedLevel::Candidate(s) => s,
            MappedLevel::Required(s) => s,
        }
    }
}

/// A taxonomy node the mapper accepted for an input token/phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedSkill {
    pub skill: Skill,
    pub token: String,
    pub similarity: f64,
    pub level: MappedLevel,
}
