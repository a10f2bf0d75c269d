//! Gap comparison (spec.md §4.6), grounded on the coverage-percentage
//! scoring and matched/missing split in other_examples' `JobMatcher`,
//! reworked into total sum types instead of string lists.

use crate::diagnostics::Diagnostics;
use crate::gap_result::{
    AnalysisContext, GapAnalysisResult, MatchStatus, MatchedSkill, Metrics, MissingSkill,
    ResumeOnlySkill, CURRENT_VERSION,
};
use crate::mapped_skill::{MappedLevel, MappedSkill};
use crate::skill::SkillType;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Compare mapped resume and job skill sets into a canonical result.
/// Never fails on domain data: empty inputs produce an all-missing or
/// all-resume-only result rather than an error (spec.md §7).
pub fn compare(
    resume_mapped: &[MappedSkill],
    job_mapped: &[MappedSkill],
    diagnostics: Diagnostics,
    context: AnalysisContext,
) -> GapAnalysisResult {
    let level_grace = context.configuration.score_weights.level_grace;

    let resume_skills_only: Vec<&MappedSkill> = resume_mapped
        .iter()
        .filter(|m| m.skill.skill_type == SkillType::Skill)
        .collect();
    let job_skills_only: Vec<&MappedSkill> = job_mapped
        .iter()
        .filter(|m| m.skill.skill_type == SkillType::Skill)
        .collect();

    let resume_by_id: HashMap<&str, &MappedSkill> = resume_skills_only
        .iter()
        .map(|m| (m.skill.id.as_str(), *m))
        .collect();

    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for job_skill in &job_skills_only {
        let required_level = required_snapshot(&job_skill.level);
        if let Some(resume_skill) = resume_by_id.get(job_skill.skill.id.as_str()) {
            let candidate_level = candidate_snapshot(&resume_skill.level);
            let level_delta = (required_level.score() - candidate_level.score()).max(0.0);
            let status = if level_delta > level_grace {
                MatchStatus::Underqualified
            } else {
                MatchStatus::MeetsOrExceeds
            };
            matched.push(MatchedSkill {
                skill: job_skill.skill.clone(),
                token: job_skill.token.clone(),
                candidate_level,
                required_level,
                level_delta,
                status,
            });
        } else {
            missing.push(MissingSkill {
                skill: job_skill.skill.clone(),
                token: job_skill.token.clone(),
                required_level,
                hot_tech: job_skill.skill.hot_tech,
                in_demand: job_skill.skill.in_demand,
            });
        }
    }

    sort_matched(&mut matched);
    sort_missing(&mut missing);

    let resume_skills: Vec<ResumeOnlySkill> = resume_skills_only
        .iter()
        .map(|m| ResumeOnlySkill {
            skill: m.skill.clone(),
            token: m.token.clone(),
            candidate_level: candidate_snapshot(&m.level),
        })
        .collect();

    let total = (matched.len() + missing.len()).max(1);
    let coverage = (matched.len() as f64 / total as f64) * 10.0;
    let score = (coverage.clamp(0.0, 10.0) * 100.0).round() / 100.0;

    let mut extras = serde_json::Map::new();
    extras.insert("score_components".to_string(), score_components(&matched, &missing));

    GapAnalysisResult {
        version: CURRENT_VERSION.to_string(),
        context,
        metrics: Metrics { score },
        matched_skills: matched,
        missing_skills: missing,
        resume_skills,
        diagnostics,
        extras: serde_json::Value::Object(extras),
        markdown: None,
    }
}

/// Weighted penalty terms computed for visibility but not folded into
/// `metrics.score` (spec.md §4.6 step 4, SPEC_FULL.md §6 Open Question 1).
fn score_components(matched: &[MatchedSkill], missing: &[MissingSkill]) -> serde_json::Value {
    let missing_hot_tech_penalty: f64 = missing.iter().filter(|m| m.hot_tech).map(|_| 1.0).sum();
    let missing_in_demand_penalty: f64 = missing.iter().filter(|m| m.in_demand).map(|_| 0.5).sum();
    let level_gap_penalty: f64 = matched.iter().map(|m| m.level_delta).sum();
    serde_json::json!({
        "missing_hot_tech_penalty": missing_hot_tech_penalty,
        "missing_in_demand_penalty": missing_in_demand_penalty,
        "level_gap_penalty": level_gap_penalty,
    })
}

fn required_snapshot(level: &MappedLevel) -> crate::level::LevelSnapshot {
    level.snapshot().clone()
}

fn candidate_snapshot(level: &MappedLevel) -> crate::level::LevelSnapshot {
    level.snapshot().clone()
}

fn sort_matched(matched: &mut [MatchedSkill]) {
    matched.sort_by(|a, b| {
        status_rank(a.status)
            .cmp(&status_rank(b.status))
            .then_with(|| b.level_delta.partial_cmp(&a.level_delta).unwrap_or(Ordering::Equal))
            .then_with(|| priority_rank(a.skill.hot_tech, a.skill.in_demand).cmp(&priority_rank(b.skill.hot_tech, b.skill.in_demand)))
            .then_with(|| a.skill.display_name.cmp(&b.skill.display_name))
    });
}

fn sort_missing(missing: &mut [MissingSkill]) {
    missing.sort_by(|a, b| {
        priority_rank(a.hot_tech, a.in_demand)
            .cmp(&priority_rank(b.hot_tech, b.in_demand))
            .then_with(|| a.skill.display_name.cmp(&b.skill.display_name))
    });
}

fn status_rank(status: MatchStatus) -> u8 {
    match status {
        MatchStatus::Underqualified => 0,
        MatchStatus::MeetsOrExceeds => 1,
    }
}

fn priority_rank(hot_tech: bool, in_demand: bool) -> u8 {
    match (hot_tech, in_demand) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::level::{Level, LevelSnapshot};
    use crate::skill::{Skill, SkillFramework, SkillType};

    fn skill(id: &str, name: &str, hot_tech: bool, in_demand: bool) -> Skill {
        Skill {
            id: id.to_string(),
            display_name: name.to_string(),
            taxonomy_path: format!("Technology/{}", name),
            framework: SkillFramework::ONet,
            external_id: None,
            hot_tech,
            in_demand,
            skill_type: SkillType::Skill,
            embedding_handle: name.to_lowercase(),
            aliases: vec![],
        }
    }

    fn mapped(id: &str, name: &str, level: LevelSnapshot, required: bool, hot_tech: bool) -> MappedSkill {
        MappedSkill {
            skill: skill(id, name, hot_tech, true),
            token: name.to_string(),
            similarity: 0.9,
            level: if required {
                MappedLevel::Required(level)
            } else {
                MappedLevel::Candidate(level)
            },
        }
    }

    fn context() -> AnalysisContext {
        AnalysisContext {
            resume_id: "r1".to_string(),
            job_id: "j1".to_string(),
            title: None,
            company: None,
            configuration: Config::default(),
            taxonomy_snapshot_tag: "test".to_string(),
        }
    }

    #[test]
    fn exact_match_scores_ten() {
        let level = LevelSnapshot::known(Level::Proficient, 3.0, None, 0.9, vec![]);
        let resume = vec![mapped("onet:python", "Python", level.clone(), false, false)];
        let job = vec![mapped("onet:python", "Python", level, true, false)];
        let result = compare(&resume, &job, Diagnostics::default(), context());
        assert_eq!(result.metrics.score, 10.0);
        assert!(result.missing_skills.is_empty());
        assert_eq!(result.matched_skills[0].status, MatchStatus::MeetsOrExceeds);
    }

    #[test]
    fn missing_hot_tech_reduces_score() {
        let level = LevelSnapshot::known(Level::Working, 2.0, None, 0.8, vec![]);
        let resume = vec![
            mapped("onet:python", "Python", level.clone(), false, false),
            mapped("onet:sql", "SQL", level.clone(), false, false),
        ];
        let job = vec![
            mapped("onet:python", "Python", level.clone(), true, false),
            mapped("onet:sql", "SQL", level.clone(), true, false),
            mapped("onet:k8s", "Kubernetes", level, true, true),
        ];
        let result = compare(&resume, &job, Diagnostics::default(), context());
        assert_eq!(result.missing_skills.len(), 1);
        assert_eq!(result.missing_skills[0].skill.display_name, "Kubernetes");
        assert!(result.missing_skills[0].hot_tech);
        assert!((result.metrics.score - 6.67).abs() < 0.01);
    }

    #[test]
    fn underqualified_when_delta_exceeds_grace() {
        let candidate = LevelSnapshot::known(Level::Basic, 1.0, None, 0.7, vec![]);
        let required = LevelSnapshot::known(Level::Advanced, 3.5, None, 0.9, vec![]);
        let resume = vec![mapped("onet:python", "Python", candidate, false, false)];
        let job = vec![mapped("onet:python", "Python", required, true, false)];
        let result = compare(&resume, &job, Diagnostics::default(), context());
        assert_eq!(result.matched_skills.len(), 1);
        assert_eq!(result.matched_skills[0].status, MatchStatus::Underqualified);
        assert_eq!(result.matched_skills[0].level_delta, 2.5);
        assert_eq!(result.metrics.score, 10.0);
    }

    #[test]
    fn empty_job_gives_zero_score_with_resume_skills_kept() {
        let level = LevelSnapshot::known(Level::Working, 2.0, None, 0.7, vec![]);
        let resume = vec![mapped("onet:python", "Python", level, false, false)];
        let result = compare(&resume, &[], Diagnostics::default(), context());
        assert!(result.matched_skills.is_empty());
        assert!(result.missing_skills.is_empty());
        assert_eq!(result.metrics.score, 0.0);
        assert_eq!(result.resume_skills.len(), 1);
    }

    #[test]
    fn empty_resume_gives_all_missing() {
        let level = LevelSnapshot::known(Level::Working, 2.0, None, 0.7, vec![]);
        let job = vec![mapped("onet:python", "Python", level, true, false)];
        let result = compare(&[], &job, Diagnostics::default(), context());
        assert_eq!(result.missing_skills.len(), 1);
        assert_eq!(result.metrics.score, 0.0);
    }
}
