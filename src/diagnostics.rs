//! Per-request mapping diagnostics (spec.md §3, §4.5 step 8).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One CRAG gate adjustment, recorded at most once per kind per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum GateAction {
    #[serde(rename = "increase_topk")]
    IncreaseTopk { topk_increased: u32 },
    #[serde(rename = "switch_recipe")]
    SwitchRecipe { recipe: String },
    #[serde(rename = "nudge_floor")]
    NudgeFloor { delta: f64 },
}

/// Gate trace for a single input token/phrase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDiagnostics {
    pub accepted: bool,
    pub hits_considered: usize,
    pub final_topk: u32,
    pub final_cutoff: f64,
    pub margin: f64,
    pub literal_reject_rate: f64,
    pub actions: Vec<GateAction>,
}

/// Aggregate gate behavior across one `map_tokens`/`map_tasks` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateSummary {
    pub total_tokens: usize,
    pub unmapped_count: usize,
    pub increased_topk_count: usize,
    pub switched_recipe_count: usize,
    pub nudged_floor_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub cutoff_strategy: String,
    pub average_cutoff: f64,
    pub skill_diagnostics: HashMap<String, TokenDiagnostics>,
    pub gate_summary: GateSummary,
    pub timing_ms: HashMap<String, u64>,
}

impl Diagnostics {
    pub fn record_token(&mut self, token: String, diag: TokenDiagnostics) {
        self.gate_summary.total_tokens += 1;
        if !diag.accepted {
            self.gate_summary.unmapped_count += 1;
        }
        for action in &diag.actions {
            match action {
                GateAction::IncreaseTopk { .. } => self.gate_summary.increased_topk_count += 1,
                GateAction::SwitchRecipe { .. } => self.gate_summary.switched_recipe_count += 1,
                GateAction::NudgeFloor { .. } => self.gate_summary.nudged_floor_count += 1,
            }
        }
        self.skill_diagnostics.insert(token, diag);
    }

    pub fn finalize_average_cutoff(&mut self) {
        if self.skill_diagnostics.is_empty() {
            self.average_cutoff = 0.0;
            return;
        }
        let sum: f64 = self.skill_diagnostics.values().map(|d| d.final_cutoff).sum();
        self.average_cutoff = sum / self.skill_diagnostics.len() as f64;
    }

    /// Fold another call's diagnostics into this one. The engine calls the
    /// mapper once per side (resume skills, job skills, resume tasks, job
    /// tasks); each call overwrites `Mapper::last_diagnostics`, so the
    /// engine accumulates the per-request aggregate here instead.
    pub fn merge(&mut self, other: Diagnostics) {
        if self.cutoff_strategy.is_empty() {
            self.cutoff_strategy = other.cutoff_strategy;
        }
        self.gate_summary.total_tokens += other.gate_summary.total_tokens;
        self.gate_summary.unmapped_count += other.gate_summary.unmapped_count;
        self.gate_summary.increased_topk_count += other.gate_summary.increased_topk_count;
        self.gate_summary.switched_recipe_count += other.gate_summary.switched_recipe_count;
        self.gate_summary.nudged_floor_count += other.gate_summary.nudged_floor_count;
        self.skill_diagnostics.extend(other.skill_diagnostics);
        self.timing_ms.extend(other.timing_ms);
        self.finalize_average_cutoff();
    }
}
