//! Taxonomy vector search (spec.md §3 "Skill (referenced)", §4.4).
//!
//! The taxonomy and its embeddings are an external, read-only collaborator
//! from the engine's point of view (spec.md §6c) — this module defines the
//! seam as a trait so the mapper never depends on how nearest-neighbor
//! search is actually implemented, then supplies an in-process
//! implementation backed by a small bundled seed list.

use crate::errors::CareerEngineError;
use crate::skill::{Skill, SkillFramework, SkillType};
use async_trait::async_trait;

/// One candidate returned by a nearest-neighbor query, ranked by
/// descending cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub skill: Skill,
    pub similarity: f64,
}

/// Taxonomy nearest-neighbor search, keyed by embedding handle for the
/// query side (the mapper embeds resume/job tokens upstream of this seam).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `topk` taxonomy nodes closest to `query_embedding`,
    /// ordered by descending similarity. `metadata_filter`, when present,
    /// restricts candidates to that `SkillType` (spec.md §4.5 step 1,
    /// §6c's `query(embedding|text, k, metadata_filter)` contract).
    async fn search(
        &self,
        query_embedding: &[f64],
        topk: usize,
        metadata_filter: Option<SkillType>,
    ) -> Result<Vec<VectorHit>, CareerEngineError>;

    /// Embed free text into the same space the index was built against.
    /// Exposed here rather than in a separate embedder trait because the
    /// in-memory index and its embeddings are one unit grounded on a fixed
    /// bundled vocabulary.
    async fn embed(&self, text: &str) -> Result<Vec<f64>, CareerEngineError>;
}

/// Deterministic hashed bag-of-words embedding over a fixed dimension.
/// Stands in for a real embedding model: two strings sharing tokens land
/// close together, which is all the gate logic in `mapper.rs` needs from
/// this seam.
const EMBEDDING_DIM: usize = 64;

fn hashed_bow_embedding(text: &str) -> Vec<f64> {
    let mut vector = vec![0.0f64; EMBEDDING_DIM];
    let mut token_count = 0usize;
    for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let bucket = token_hash(token) % EMBEDDING_DIM;
        vector[bucket] += 1.0;
        token_count += 1;
    }
    if token_count > 0 {
        let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
    }
    vector
}

fn token_hash(token: &str) -> usize {
    // FNV-1a, chosen for no extra dependency and stable cross-run output.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash as usize
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

struct IndexedSkill {
    skill: Skill,
    embedding: Vec<f64>,
}

/// A small, self-contained taxonomy used for deterministic self-checks and
/// as the default collaborator when no external vector store is wired in.
/// Out of scope: importing the full O*NET Content Model (spec.md §1
/// Non-goals) — this seed list exists to exercise the gate logic, not to
/// stand in for a production taxonomy.
pub struct InMemoryVectorIndex {
    entries: Vec<IndexedSkill>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            entries: seed_skills()
                .into_iter()
                .map(|skill| {
                    let embedding = hashed_bow_embedding(&embedding_source(&skill));
                    IndexedSkill { skill, embedding }
                })
                .collect(),
        }
    }

    pub fn with_skills(skills: Vec<Skill>) -> Self {
        Self {
            entries: skills
                .into_iter()
                .map(|skill| {
                    let embedding = hashed_bow_embedding(&embedding_source(&skill));
                    IndexedSkill { skill, embedding }
                })
                .collect(),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn embedding_source(skill: &Skill) -> String {
    let mut joined = skill.display_name.clone();
    for alias in &skill.aliases {
        joined.push(' ');
        joined.push_str(alias);
    }
    joined
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(
        &self,
        query_embedding: &[f64],
        topk: usize,
        metadata_filter: Option<SkillType>,
    ) -> Result<Vec<VectorHit>, CareerEngineError> {
        let mut hits: Vec<VectorHit> = self
            .entries
            .iter()
            .filter(|entry| metadata_filter.is_none_or(|filter| entry.skill.skill_type == filter))
            .map(|entry| VectorHit {
                skill: entry.skill.clone(),
                similarity: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.skill.display_name.cmp(&b.skill.display_name))
        });
        hits.truncate(topk);
        Ok(hits)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, CareerEngineError> {
        Ok(hashed_bow_embedding(text))
    }
}

fn seed_skills() -> Vec<Skill> {
    let make = |id: &str, name: &str, path: &str, aliases: &[&str]| Skill {
        id: id.to_string(),
        display_name: name.to_string(),
        taxonomy_path: path.to_string(),
        framework: SkillFramework::ONet,
        external_id: Some(id.to_string()),
        hot_tech: false,
        in_demand: true,
        skill_type: SkillType::Skill,
        embedding_handle: name.to_lowercase(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
    };
    let make_hot_tech = |id: &str, name: &str, path: &str, aliases: &[&str]| Skill {
        hot_tech: true,
        ..make(id, name, path, aliases)
    };

    vec![
        make(
            "onet:python",
            "Python",
            "Technology Skills/Programming Languages/Python",
            &["Python3", "Py"],
        ),
        make(
            "onet:rust",
            "Rust",
            "Technology Skills/Programming Languages/Rust",
            &["Rustlang"],
        ),
        make(
            "onet:sql",
            "SQL",
            "Technology Skills/Database/SQL",
            &["Structured Query Language", "Postgres", "MySQL"],
        ),
        make(
            "onet:project-management",
            "Project Management",
            "Skills/Management/Project Management",
            &["PM", "Program Management"],
        ),
        make(
            "onet:communication",
            "Communication",
            "Skills/Basic Skills/Speaking",
            &["Verbal Communication", "Written Communication"],
        ),
        make(
            "onet:data-analysis",
            "Data Analysis",
            "Skills/Analytical Thinking/Data Analysis",
            &["Data Analytics"],
        ),
        make(
            "onet:javascript",
            "JavaScript",
            "Technology Skills/Programming Languages/JavaScript",
            &["JS", "ECMAScript", "Node.js"],
        ),
        make(
            "onet:leadership",
            "Leadership",
            "Skills/Management/Leadership",
            &["Team Leadership"],
        ),
        make(
            "onet:react",
            "React",
            "Technology Skills/Programming Languages/React",
            &["React.js", "ReactJS"],
        ),
        make_hot_tech(
            "onet:kubernetes",
            "Kubernetes",
            "Technology Skills/Data Base User Interface and Query Software/Kubernetes",
            &["K8s"],
        ),
        Skill {
            skill_type: SkillType::Task,
            ..make(
                "onet:task-lead-teams",
                "Leading Cross-Functional Teams",
                "Work Activities/Leadership/Leading Teams",
                &["Leading Teams", "Cross-Functional Leadership"],
            )
        },
    ]
}
