//! Effective configuration and request-scoped overrides (spec.md §6, §9).
//!
//! `Config` is an immutable record. `with_overrides` returns a new record
//! rather than mutating a global — the donor's `AiSettings` is
//! load/save-from-sqlite; here the config lives purely in memory and the
//! caller decides whether/where to persist the effective snapshot.

use crate::errors::CareerEngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategyKind {
    Static,
    Quantile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStrategyConfig {
    pub strategy: MatchStrategyKind,
    pub topk: u32,
    pub jd_q: f64,
    pub jd_floor: f64,
    pub resume_q: f64,
    pub resume_floor: f64,
    pub task_q: f64,
    pub task_floor: f64,
    pub lexical_guard: bool,
}

impl Default for MatchStrategyConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategyKind::Quantile,
            topk: 10,
            jd_q: 0.85,
            jd_floor: 0.40,
            resume_q: 0.85,
            resume_floor: 0.30,
            task_q: 0.85,
            task_floor: 0.40,
            lexical_guard: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CragConfig {
    pub min_hits: u32,
    pub min_margin: f64,
    pub max_retries: u32,
    pub max_topk: u32,
    pub bump_topk_by: u32,
    pub allow_recipe_switch: bool,
}

impl Default for CragConfig {
    fn default() -> Self {
        Self {
            min_hits: 2,
            min_margin: 0.08,
            max_retries: 3,
            max_topk: 20,
            bump_topk_by: 4,
            allow_recipe_switch: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeightsConfig {
    pub level_grace: f64,
}

impl Default for ScoreWeightsConfig {
    fn default() -> Self {
        Self { level_grace: 0.25 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    AllInOne,
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
    pub extractor_model: String,
    pub cap_nice_to_have: bool,
    /// Open-Question extension (spec.md §9): opt-in years→level heuristic.
    pub years_to_level: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::AllInOne,
            extractor_model: "gpt-4o-mini".to_string(),
            cap_nice_to_have: false,
            years_to_level: false,
        }
    }
}

/// The full effective configuration for one analysis request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub match_strategy: MatchStrategyConfig,
    pub crag: CragConfig,
    pub score_weights: ScoreWeightsConfig,
    pub extraction: ExtractionConfig,
}

/// Recognized override keys (spec.md §6 configuration surface table).
/// Dotted path -> expected JSON kind, used to reject type-mismatched
/// overrides with `InvalidOverride` while silently ignoring unknown keys.
const RECOGNIZED_KEYS: &[(&str, JsonKind)] = &[
    ("matchStrategy.strategy", JsonKind::String),
    ("matchStrategy.topk", JsonKind::Number),
    ("matchStrategy.jdQ", JsonKind::Number),
    ("matchStrategy.resumeQ", JsonKind::Number),
    ("matchStrategy.taskQ", JsonKind::Number),
    ("matchStrategy.jdFloor", JsonKind::Number),
    ("matchStrategy.resumeFloor", JsonKind::Number),
    ("matchStrategy.taskFloor", JsonKind::Number),
    ("matchStrategy.lexicalGuard", JsonKind::Bool),
    ("crag.minHits", JsonKind::Number),
    ("crag.minMargin", JsonKind::Number),
    ("crag.maxRetries", JsonKind::Number),
    ("crag.maxTopk", JsonKind::Number),
    ("crag.bumpTopkBy", JsonKind::Number),
    ("crag.allowRecipeSwitch", JsonKind::Bool),
    ("scoreWeights.levelGrace", JsonKind::Number),
    ("extraction.mode", JsonKind::String),
    ("extraction.extractorModel", JsonKind::String),
    ("extraction.capNiceToHave", JsonKind::Bool),
    ("extraction.yearsToLevel", JsonKind::Bool),
];

#[derive(Clone, Copy)]
enum JsonKind {
    String,
    Number,
    Bool,
}

impl JsonKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            JsonKind::String => value.is_string(),
            JsonKind::Number => value.is_number(),
            JsonKind::Bool => value.is_boolean(),
        }
    }
}

impl Config {
    /// Deep-copy `self` and apply `overrides` (a JSON object using the
    /// dotted keys from the spec's configuration surface table, each
    /// mapped to a nested nested nested JSON object path).
    ///
    /// Unknown keys are ignored silently; type-mismatched recognized keys
    /// raise `InvalidOverride` (spec.md §6).
    pub fn with_overrides(&self, overrides: &Value) -> Result<Config, CareerEngineError> {
        let overrides = match overrides {
            Value::Null => return Ok(self.clone()),
            Value::Object(map) => map,
            _ => {
                return Err(CareerEngineError::InvalidOverride(
                    "policy_overrides must be a JSON object".to_string(),
                ))
            }
        };

        let mut base = serde_json::to_value(self).expect("Config always serializes");

        for (dotted_key, expected_kind) in RECOGNIZED_KEYS {
            if let Some(value) = lookup_dotted(overrides, dotted_key) {
                if !expected_kind.matches(value) {
                    return Err(CareerEngineError::InvalidOverride(format!(
                        "key '{}' has the wrong type",
                        dotted_key
                    )));
                }
                set_dotted(&mut base, dotted_key, value.clone());
            }
        }

        serde_json::from_value(base).map_err(|e| {
            CareerEngineError::InvalidOverride(format!("override produced invalid config: {}", e))
        })
    }
}

/// Look up a dotted camelCase path (`"a.b"`) in a flat or nested override
/// object. Overrides may be supplied either fully nested (matching the
/// `Config` JSON shape) or as a single flat key — both are checked.
fn lookup_dotted<'a>(map: &'a serde_json::Map<String, Value>, dotted: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(dotted) {
        return Some(v);
    }
    let mut parts = dotted.split('.');
    let first = parts.next()?;
    let mut current = map.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn set_dotted(root: &mut Value, dotted: &str, value: Value) {
    let parts: Vec<&str> = dotted.split('.').collect();
    let mut current = root;
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            if let Some(obj) = current.as_object_mut() {
                obj.insert(part.to_string(), value);
            }
            return;
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::default();
        let result = config
            .with_overrides(&json!({ "totallyUnknown": 42 }))
            .unwrap();
        assert_eq!(result, config);
    }

    #[test]
    fn recognized_override_applies() {
        let config = Config::default();
        let result = config
            .with_overrides(&json!({ "scoreWeights": { "levelGrace": 0.5 } }))
            .unwrap();
        assert_eq!(result.score_weights.level_grace, 0.5);
        // original untouched (override isolation, spec.md P5)
        assert_eq!(config.score_weights.level_grace, 0.25);
    }

    #[test]
    fn flat_dotted_override_applies() {
        let config = Config::default();
        let result = config
            .with_overrides(&json!({ "crag.minHits": 5 }))
            .unwrap();
        assert_eq!(result.crag.min_hits, 5);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let config = Config::default();
        let err = config
            .with_overrides(&json!({ "crag": { "minHits": "not a number" } }))
            .unwrap_err();
        assert!(matches!(err, CareerEngineError::InvalidOverride(_)));
    }

    #[test]
    fn override_isolation_across_requests() {
        let global = Config::default();
        let a = global.with_overrides(&json!({ "crag.minHits": 9 })).unwrap();
        let b = global.with_overrides(&json!({ "crag.minHits": 1 })).unwrap();
        assert_eq!(a.crag.min_hits, 9);
        assert_eq!(b.crag.min_hits, 1);
        assert_eq!(global.crag.min_hits, 2);
    }
}
