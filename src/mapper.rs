//! Taxonomy mapper with the adaptive CRAG-style confidence gate (spec.md
//! §4.5), grounded on the candidate/rerank retrieval shape in
//! other_examples' DSPy retrieval pipelines but built around the vector
//! index seam in `vector_index.rs`.

use crate::config::{Config, MatchStrategyKind};
use crate::diagnostics::{Diagnostics, GateAction, TokenDiagnostics};
use crate::errors::CareerEngineError;
use crate::extracted_skill::ExtractedSkill;
use crate::level::LevelSnapshot;
use crate::mapped_skill::{MappedLevel, MappedSkill};
use crate::skill::{Skill, SkillType};
use crate::vector_index::{VectorHit, VectorIndex};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Resume,
    Jd,
}

struct StrategyParams {
    strategy: MatchStrategyKind,
    base_topk: u32,
    floor: f64,
    q: f64,
    max_topk: u32,
    bump_topk_by: u32,
    min_hits: u32,
    min_margin: f64,
    allow_recipe_switch: bool,
    lexical_guard: bool,
    max_retries: u32,
}

fn params_for(config: &Config, source_type: SourceType) -> StrategyParams {
    let ms = &config.match_strategy;
    let (floor, q) = match source_type {
        SourceType::Resume => (ms.resume_floor, ms.resume_q),
        SourceType::Jd => (ms.jd_floor, ms.jd_q),
    };
    StrategyParams {
        strategy: ms.strategy,
        base_topk: ms.topk,
        floor,
        q,
        max_topk: config.crag.max_topk,
        bump_topk_by: config.crag.bump_topk_by,
        min_hits: config.crag.min_hits,
        min_margin: config.crag.min_margin,
        allow_recipe_switch: config.crag.allow_recipe_switch,
        lexical_guard: ms.lexical_guard,
        max_retries: config.crag.max_retries,
    }
}

fn params_for_tasks(config: &Config) -> StrategyParams {
    let ms = &config.match_strategy;
    StrategyParams {
        strategy: ms.strategy,
        base_topk: ms.topk,
        floor: ms.task_floor,
        q: ms.task_q,
        max_topk: config.crag.max_topk,
        bump_topk_by: config.crag.bump_topk_by,
        min_hits: config.crag.min_hits,
        min_margin: config.crag.min_margin,
        allow_recipe_switch: config.crag.allow_recipe_switch,
        lexical_guard: ms.lexical_guard,
        max_retries: config.crag.max_retries,
    }
}

fn quantile(sorted_ascending: &[f64], q: f64) -> f64 {
    if sorted_ascending.is_empty() {
        return 0.0;
    }
    let idx = ((q * (sorted_ascending.len() - 1) as f64).round()) as usize;
    sorted_ascending[idx.min(sorted_ascending.len() - 1)]
}

fn compute_cutoff(strategy: MatchStrategyKind, floor: f64, q: f64, scores: &[f64]) -> f64 {
    match strategy {
        MatchStrategyKind::Static => floor,
        MatchStrategyKind::Quantile => {
            let mut sorted = scores.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            floor.max(quantile(&sorted, q))
        }
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let tmp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j - 1])
            };
            prev_diag = tmp;
        }
    }
    row[b.len()]
}

fn literal_guard_passes(skill: &Skill, source_text: &str) -> bool {
    skill.matchable_names().any(|name| {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
        Regex::new(&pattern).map(|re| re.is_match(source_text)).unwrap_or(false)
    })
}

/// Which taxonomy partition a gate iteration queries against. `Default`
/// stays within the caller's own skill type; `SwitchRecipe` (spec.md
/// §4.5's "task_first" example) retargets the query at the other
/// partition instead of re-running the same search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recipe {
    Default,
    Alternate,
}

fn alternate_skill_type(skill_type: SkillType) -> SkillType {
    match skill_type {
        SkillType::Skill => SkillType::Task,
        SkillType::Task => SkillType::Skill,
    }
}

fn best_of(hits: &[VectorHit], token: &str) -> Option<VectorHit> {
    let mut sorted = hits.to_vec();
    sorted.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                levenshtein(token, &a.skill.display_name).cmp(&levenshtein(token, &b.skill.display_name))
            })
            .then_with(|| a.skill.id.cmp(&b.skill.id))
    });
    sorted.into_iter().next()
}

/// Maps extracted skill tokens to canonical taxonomy entries via the
/// vector index, under the bounded CRAG-style gate described in spec.md
/// §4.5. Holds the diagnostics of its most recent call for
/// `get_last_mapping_diagnostics`.
pub struct Mapper {
    index: Arc<dyn VectorIndex>,
    last_diagnostics: Mutex<Diagnostics>,
}

impl Mapper {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            last_diagnostics: Mutex::new(Diagnostics::default()),
        }
    }

    pub fn get_last_mapping_diagnostics(&self) -> Diagnostics {
        self.last_diagnostics.lock().unwrap().clone()
    }

    async fn gate_one(
        &self,
        token: &str,
        source_text: &str,
        params: &StrategyParams,
        expected_skill_type: SkillType,
    ) -> Result<(Option<VectorHit>, TokenDiagnostics), CareerEngineError> {
        let query_embedding = self.index.embed(token).await?;

        let mut topk = params.base_topk;
        let mut floor = params.floor;
        let mut bumped = false;
        let mut recipe = Recipe::Default;
        let mut floor_nudged = false;
        let mut actions = Vec::new();

        let mut above_cutoff: Vec<VectorHit> = Vec::new();
        let mut guarded: Vec<VectorHit> = Vec::new();
        let mut margin = 0.0;
        let mut literal_reject_rate = 0.0;
        let mut final_topk = topk;
        let mut final_cutoff = floor;
        let mut hits_considered = 0usize;

        for iteration in 1..=(params.max_retries + 1) {
            let metadata_filter = Some(match recipe {
                Recipe::Default => expected_skill_type,
                Recipe::Alternate => alternate_skill_type(expected_skill_type),
            });
            let hits = self.index.search(&query_embedding, topk as usize, metadata_filter).await?;
            hits_considered = hits.len();
            let scores: Vec<f64> = hits.iter().map(|h| h.similarity).collect();
            let cutoff = compute_cutoff(params.strategy, floor, params.q, &scores);
            final_topk = topk;
            final_cutoff = cutoff;

            above_cutoff = hits.into_iter().filter(|h| h.similarity >= cutoff).collect();
            guarded = if params.lexical_guard {
                above_cutoff
                    .iter()
                    .cloned()
                    .filter(|h| literal_guard_passes(&h.skill, source_text))
                    .collect()
            } else {
                above_cutoff.clone()
            };

            margin = if guarded.len() >= 2 {
                guarded[0].similarity - guarded[1].similarity
            } else if guarded.len() == 1 {
                guarded[0].similarity
            } else {
                0.0
            };
            literal_reject_rate = if above_cutoff.is_empty() {
                0.0
            } else {
                1.0 - (guarded.len() as f64 / above_cutoff.len() as f64)
            };

            if iteration == params.max_retries + 1 {
                break;
            }

            if (guarded.len() as u32) < params.min_hits && !bumped && topk < params.max_topk {
                let bump = params.bump_topk_by.min(params.max_topk - topk);
                if bump > 0 {
                    topk += bump;
                    bumped = true;
                    actions.push(GateAction::IncreaseTopk { topk_increased: bump });
                    continue;
                }
            }
            if margin < params.min_margin && params.allow_recipe_switch && recipe == Recipe::Default {
                recipe = Recipe::Alternate;
                actions.push(GateAction::SwitchRecipe {
                    recipe: "task_first".to_string(),
                });
                continue;
            }
            if literal_reject_rate > 0.5 && !floor_nudged {
                floor = (floor - 0.05).max(0.0);
                floor_nudged = true;
                actions.push(GateAction::NudgeFloor { delta: -0.05 });
                continue;
            }
            break;
        }

        let selected = if let Some(best) = best_of(&guarded, token) {
            Some(best)
        } else if let Some(best) = above_cutoff.first() {
            if best.similarity >= floor {
                Some(best.clone())
            } else {
                None
            }
        } else {
            None
        };

        let diag = TokenDiagnostics {
            accepted: selected.is_some(),
            hits_considered,
            final_topk,
            final_cutoff,
            margin,
            literal_reject_rate,
            actions,
        };

        Ok((selected, diag))
    }

    async fn map_with_params(
        &self,
        skills: &[(String, LevelSnapshot)],
        source_text: &str,
        params: &StrategyParams,
        side: MapSide,
        expected_skill_type: SkillType,
    ) -> Result<Vec<MappedSkill>, CareerEngineError> {
        let mut diagnostics = Diagnostics::default();
        diagnostics.cutoff_strategy = match params.strategy {
            MatchStrategyKind::Static => "static".to_string(),
            MatchStrategyKind::Quantile => "quantile".to_string(),
        };
        let mut mapped = Vec::new();

        for (token, level) in skills {
            let (selected, diag) = self.gate_one(token, source_text, params, expected_skill_type).await?;
            diagnostics.record_token(token.clone(), diag);
            if let Some(hit) = selected {
                let level_field = match side {
                    MapSide::Candidate => MappedLevel::Candidate(level.clone()),
                    MapSide::Required => MappedLevel::Required(level.clone()),
                };
                mapped.push(MappedSkill {
                    skill: hit.skill,
                    token: token.clone(),
                    similarity: hit.similarity,
                    level: level_field,
                });
            }
        }
        diagnostics.finalize_average_cutoff();
        *self.last_diagnostics.lock().unwrap() = diagnostics;
        Ok(mapped)
    }

    /// Map resume- or job-side extracted skills to taxonomy entries.
    pub async fn map_tokens(
        &self,
        skills: &[ExtractedSkill],
        source_type: SourceType,
        source_text: &str,
        config: &Config,
    ) -> Result<Vec<MappedSkill>, CareerEngineError> {
        let params = params_for(config, source_type);
        let side = match source_type {
            SourceType::Resume => MapSide::Candidate,
            SourceType::Jd => MapSide::Required,
        };
        let pairs: Vec<(String, LevelSnapshot)> =
            skills.iter().map(|s| (s.token.clone(), s.level.clone())).collect();
        self.map_with_params(&pairs, source_text, &params, side, SkillType::Skill).await
    }

    /// Map free-text task/responsibility fragments to taxonomy task
    /// entries. Tasks carry no proficiency level.
    pub async fn map_tasks(
        &self,
        task_texts: &[String],
        source_text: &str,
        config: &Config,
    ) -> Result<Vec<MappedSkill>, CareerEngineError> {
        let params = params_for_tasks(config);
        let pairs: Vec<(String, LevelSnapshot)> = task_texts
            .iter()
            .map(|t| (t.clone(), LevelSnapshot::Unknown))
            .collect();
        self.map_with_params(&pairs, source_text, &params, MapSide::Candidate, SkillType::Task)
            .await
    }
}

#[derive(Clone, Copy)]
enum MapSide {
    Candidate,
    Required,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::skill::SkillFramework;
    use crate::vector_index::InMemoryVectorIndex;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    fn widget_skill() -> Skill {
        Skill {
            id: "custom:widget".to_string(),
            display_name: "Widget Management".to_string(),
            taxonomy_path: "Skills/Custom/Widget Management".to_string(),
            framework: SkillFramework::Custom,
            external_id: None,
            hot_tech: false,
            in_demand: true,
            skill_type: SkillType::Skill,
            embedding_handle: "widget".to_string(),
            aliases: vec![],
        }
    }

    /// A test-only index that returns too few hits below a topk threshold,
    /// forcing `gate_one`'s bump-topk branch (spec.md §8 scenario S5).
    struct TopkSensitiveIndex {
        widens_at: usize,
    }

    #[async_trait::async_trait]
    impl VectorIndex for TopkSensitiveIndex {
        async fn search(
            &self,
            _query_embedding: &[f64],
            topk: usize,
            _metadata_filter: Option<SkillType>,
        ) -> Result<Vec<VectorHit>, CareerEngineError> {
            let mut hits = vec![VectorHit {
                skill: widget_skill(),
                similarity: 0.9,
            }];
            if topk >= self.widens_at {
                hits.push(VectorHit {
                    skill: Skill {
                        id: "custom:widget-adjacent".to_string(),
                        display_name: "Zzz Filler".to_string(),
                        ..widget_skill()
                    },
                    similarity: 0.5,
                });
            }
            Ok(hits)
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f64>, CareerEngineError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Always returns a single hit below the gate's margin threshold, so
    /// every branch of `gate_one`'s retry loop keeps firing until
    /// `max_retries` is exhausted. Counts calls to `search` to verify the
    /// gate's retry budget is actually bounded (spec.md §8 property P6).
    struct NeverSatisfiedIndex {
        calls: AtomicU32,
    }

    impl NeverSatisfiedIndex {
        fn new() -> Self {
            Self { calls: AtomicU32::new(0) }
        }
    }

    #[async_trait::async_trait]
    impl VectorIndex for NeverSatisfiedIndex {
        async fn search(
            &self,
            _query_embedding: &[f64],
            _topk: usize,
            _metadata_filter: Option<SkillType>,
        ) -> Result<Vec<VectorHit>, CareerEngineError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(vec![VectorHit {
                skill: widget_skill(),
                similarity: 0.2,
            }])
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f64>, CareerEngineError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn skill(token: &str) -> ExtractedSkill {
        ExtractedSkill {
            token: token.to_string(),
            level: LevelSnapshot::known(Level::Proficient, 3.0, None, 0.8, vec![]),
            nice_to_have: false,
            evidence: vec![],
        }
    }

    #[tokio::test]
    async fn exact_alias_maps_to_canonical_skill() {
        let mapper = Mapper::new(Arc::new(InMemoryVectorIndex::new()));
        let config = Config::default();
        let mapped = mapper
            .map_tokens(&[skill("Python3")], SourceType::Resume, "I used Python3 daily", &config)
            .await
            .unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].skill.display_name, "Python");
    }

    #[tokio::test]
    async fn literal_guard_rejects_phantom_match() {
        let mapper = Mapper::new(Arc::new(InMemoryVectorIndex::new()));
        let mut config = Config::default();
        config.match_strategy.lexical_guard = true;
        // "Java" text alone shouldn't pull in "JavaScript".
        let mapped = mapper
            .map_tokens(&[skill("Java")], SourceType::Resume, "Experienced with Java", &config)
            .await
            .unwrap();
        assert!(mapped.iter().all(|m| m.skill.display_name != "JavaScript"));
    }

    #[tokio::test]
    async fn unmapped_token_is_dropped_not_fatal() {
        let mapper = Mapper::new(Arc::new(InMemoryVectorIndex::new()));
        let config = Config::default();
        let mapped = mapper
            .map_tokens(&[skill("Completely Unrelated Gibberish Xyz")], SourceType::Resume, "text", &config)
            .await
            .unwrap();
        assert!(mapped.is_empty());
        let diag = mapper.get_last_mapping_diagnostics();
        assert_eq!(diag.gate_summary.unmapped_count, 1);
    }

    #[test]
    fn quantile_strategy_uses_floor_as_lower_bound() {
        let scores = vec![0.1, 0.2, 0.3];
        let cutoff = compute_cutoff(MatchStrategyKind::Quantile, 0.9, 0.5, &scores);
        assert_eq!(cutoff, 0.9);
    }

    #[test]
    fn levenshtein_identical_strings_is_zero() {
        assert_eq!(levenshtein("python", "python"), 0);
        assert_eq!(levenshtein("python", "pythno"), 2);
    }

    #[tokio::test]
    async fn s5_gate_raises_topk_when_too_few_hits_above_cutoff() {
        let mapper = Mapper::new(Arc::new(TopkSensitiveIndex { widens_at: 14 }));
        let config = Config::default();
        let mapped = mapper
            .map_tokens(
                &[skill("widget")],
                SourceType::Resume,
                "Five years of Widget Management experience.",
                &config,
            )
            .await
            .unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].skill.display_name, "Widget Management");

        let diag = mapper.get_last_mapping_diagnostics();
        let token_diag = diag.skill_diagnostics.get("widget").unwrap();
        assert_eq!(token_diag.final_topk, 14);
        assert!(token_diag
            .actions
            .iter()
            .any(|a| matches!(a, GateAction::IncreaseTopk { topk_increased: 4 })));
    }

    #[tokio::test]
    async fn p6_query_count_per_token_is_bounded_by_max_retries() {
        let index = Arc::new(NeverSatisfiedIndex::new());
        let mapper = Mapper::new(index.clone());
        let config = Config::default();
        let mapped = mapper
            .map_tokens(&[skill("widget")], SourceType::Resume, "no literal match here", &config)
            .await
            .unwrap();
        assert!(mapped.is_empty());

        let calls = index.calls.load(AtomicOrdering::SeqCst);
        assert!(calls >= 1);
        assert!(calls <= config.crag.max_retries + 1);
    }
}
