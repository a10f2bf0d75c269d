//! Proficiency levels (spec.md §3 "LevelSnapshot"), modeled as a sum type
//! per the REDESIGN FLAGS in spec.md §9 rather than a record of nullables.

use serde::{Deserialize, Serialize};

/// The five-level proficiency vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    None_,
    Basic,
    Working,
    Proficient,
    Advanced,
}

impl Level {
    pub fn score(self) -> f64 {
        match self {
            Level::None_ => 0.0,
            Level::Basic => 1.0,
            Level::Working => 2.0,
            Level::Proficient => 3.0,
            Level::Advanced => 4.0,
        }
    }

    /// Nearest label for a numeric score, used when levels need a display
    /// label after arithmetic (e.g. fractional scores from the model).
    pub fn from_score(score: f64) -> Level {
        let clamped = score.clamp(0.0, 4.0);
        match clamped.round() as i64 {
            0 => Level::None_,
            1 => Level::Basic,
            2 => Level::Working,
            3 => Level::Proficient,
            _ => Level::Advanced,
        }
    }
}

/// A proficiency assessment: either nothing was said about the skill, or a
/// full snapshot was derived from evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LevelSnapshot {
    Unknown,
    Known {
        label: Level,
        score: f64,
        years: Option<f64>,
        confidence: f64,
        signals: Vec<String>,
    },
}

/// Tolerance for the "score must be consistent with label" invariant
/// (spec.md §3): the model may return fractional scores between bands.
const LABEL_SCORE_TOLERANCE: f64 = 1.0;

impl LevelSnapshot {
    /// Construct a `Known` snapshot, enforcing the data-model invariants:
    /// confidence is never negative, and the score stays within one band
    /// of its label.
    pub fn known(
        label: Level,
        score: f64,
        years: Option<f64>,
        confidence: f64,
        signals: Vec<String>,
    ) -> LevelSnapshot {
        let score = score.clamp(0.0, 4.0);
        debug_assert!(
            (score - label.score()).abs() <= LABEL_SCORE_TOLERANCE,
            "score {} inconsistent with label {:?}",
            score,
            label
        );
        LevelSnapshot::Known {
            label,
            score,
            years,
            confidence: confidence.max(0.0),
            signals,
        }
    }

    /// Default fill-in when the model omits a level entirely (spec.md
    /// §4.3): `working`/score 2.0/confidence 0.5, capped at 2.0 for
    /// nice-to-have job skills when `cap_nice_to_have` is enabled.
    pub fn default_for(nice_to_have_capped: bool) -> LevelSnapshot {
        let score = if nice_to_have_capped { 2.0f64.min(2.0) } else { 2.0 };
        LevelSnapshot::known(Level::Working, score, None, 0.5, vec![])
    }

    pub fn score(&self) -> f64 {
        match self {
            LevelSnapshot::Unknown => 0.0,
            LevelSnapshot::Known { score, .. } => *score,
        }
    }

    pub fn label(&self) -> Option<Level> {
        match self {
            LevelSnapshot::Unknown => None,
            LevelSnapshot::Known { label, .. } => Some(*label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_working_two() {
        let snap = LevelSnapshot::default_for(false);
        assert_eq!(snap.score(), 2.0);
        assert_eq!(snap.label(), Some(Level::Working));
    }

    #[test]
    fn confidence_never_negative() {
        let snap = LevelSnapshot::known(Level::Basic, 1.0, None, -0.3, vec![]);
        match snap {
            LevelSnapshot::Known { confidence, .. } => assert_eq!(confidence, 0.0),
            _ => panic!("expected Known"),
        }
    }

    #[test]
    fn from_score_rounds_to_nearest_label() {
        assert_eq!(Level::from_score(3.6), Level::Advanced);
        assert_eq!(Level::from_score(0.4), Level::None_);
    }
}
