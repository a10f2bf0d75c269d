//! Taxonomy node types (spec.md §3 "Skill (referenced)").

use serde::{Deserialize, Serialize};

/// Which ontology a skill node's identifier is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillFramework {
    Custom,
    #[serde(rename = "onet")]
    ONet,
    Esco,
}

/// A taxonomy entry is either a skill proper or a task/responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Skill,
    Task,
}

/// A canonical taxonomy node, read-only from the engine's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub display_name: String,
    pub taxonomy_path: String,
    pub framework: SkillFramework,
    pub external_id: Option<String>,
    pub hot_tech: bool,
    pub in_demand: bool,
    pub skill_type: SkillType,
    /// Handle used to retrieve this node's embedding from the vector index.
    pub embedding_handle: String,
    pub aliases: Vec<String>,
}

impl Skill {
    /// All names a literal-text guard should check against: canonical name
    /// plus aliases, per spec.md §4.5 step 4 ("canonical name... and no
    /// alias").
    pub fn matchable_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.display_name.as_str()).chain(self.aliases.iter().map(|s| s.as_str()))
    }
}
