//! Markdown rendering (spec.md §4.7), grounded on the gap-analysis text
//! generator in other_examples' `JobMatcher::generate_gap_analysis` —
//! same glyph-marked bullet style, restructured into proper markdown
//! sections and made pure (no I/O).

use crate::gap_result::{GapAnalysisResult, MatchStatus};

const HOT_TECH_GLYPH: &str = "\u{1F525}"; // matches the donor's emoji-marker convention

/// Render a stable markdown report from an analysis result. Pure: no I/O,
/// omits empty sections.
pub fn render(result: &GapAnalysisResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# Skill Gap Analysis\n\nOverall match: **{:.2} / 10**\n",
        result.metrics.score
    ));

    if !result.missing_skills.is_empty() {
        out.push_str("\n## Missing Required Skills\n\n");
        for skill in &result.missing_skills {
            let marker = if skill.hot_tech { format!(" {}", HOT_TECH_GLYPH) } else { String::new() };
            out.push_str(&format!("- {}{}\n", skill.skill.display_name, marker));
        }
    }

    let underqualified: Vec<_> = result
        .matched_skills
        .iter()
        .filter(|m| m.status == MatchStatus::Underqualified)
        .collect();
    if !underqualified.is_empty() {
        out.push_str("\n## Underqualified Required Skills\n\n");
        for skill in underqualified {
            out.push_str(&format!(
                "- {}: candidate {:.1} vs required {:.1} (gap {:.1})\n",
                skill.skill.display_name,
                skill.candidate_level.score(),
                skill.required_level.score(),
                skill.level_delta
            ));
        }
    }

    let meets: Vec<_> = result
        .matched_skills
        .iter()
        .filter(|m| m.status == MatchStatus::MeetsOrExceeds)
        .collect();
    if !meets.is_empty() {
        out.push_str("\n## Skills Meeting Requirements\n\n");
        for skill in meets {
            out.push_str(&format!(
                "- {}: candidate {:.1}, required {:.1}\n",
                skill.skill.display_name,
                skill.candidate_level.score(),
                skill.required_level.score()
            ));
        }
    }

    if !result.resume_skills.is_empty() {
        out.push_str("\n## Full Resume Skill List\n\n");
        for skill in &result.resume_skills {
            out.push_str(&format!(
                "- {}: {:.1}\n",
                skill.skill.display_name,
                skill.candidate_level.score()
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gap_result::{AnalysisContext, Metrics};
    use crate::level::{Level, LevelSnapshot};
    use crate::skill::{Skill, SkillFramework, SkillType};

    fn skill(name: &str, hot_tech: bool) -> Skill {
        Skill {
            id: name.to_lowercase(),
            display_name: name.to_string(),
            taxonomy_path: name.to_string(),
            framework: SkillFramework::ONet,
            external_id: None,
            hot_tech,
            in_demand: true,
            skill_type: SkillType::Skill,
            embedding_handle: name.to_lowercase(),
            aliases: vec![],
        }
    }

    fn base_result() -> GapAnalysisResult {
        GapAnalysisResult {
            version: "1.0.0".to_string(),
            context: AnalysisContext {
                resume_id: "r1".to_string(),
                job_id: "j1".to_string(),
                title: None,
                company: None,
                configuration: Config::default(),
                taxonomy_snapshot_tag: "test".to_string(),
            },
            metrics: Metrics { score: 6.67 },
            matched_skills: vec![],
            missing_skills: vec![],
            resume_skills: vec![],
            diagnostics: Default::default(),
            extras: serde_json::Value::Object(Default::default()),
            markdown: None,
        }
    }

    #[test]
    fn empty_sections_are_omitted() {
        let md = render(&base_result());
        assert!(md.contains("Overall match: **6.67 / 10**"));
        assert!(!md.contains("Missing Required Skills"));
        assert!(!md.contains("Underqualified"));
    }

    #[test]
    fn missing_hot_tech_gets_marker() {
        let mut result = base_result();
        result.missing_skills.push(crate::gap_result::MissingSkill {
            skill: skill("Kubernetes", true),
            token: "Kubernetes".to_string(),
            required_level: LevelSnapshot::known(Level::Working, 2.0, None, 0.8, vec![]),
            hot_tech: true,
            in_demand: true,
        });
        let md = render(&result);
        assert!(md.contains("Kubernetes"));
        assert!(md.contains(HOT_TECH_GLYPH));
    }
}
