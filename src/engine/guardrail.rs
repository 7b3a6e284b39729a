//! Hemodynamic guardrail
//!
//! Four independent risk predicates over the current snapshot. When any of
//! them fires, PEEP increases are put on hold: they stay in the suggestion
//! list, in place, flagged `suppressed`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use super::derived::DerivedIndices;
use super::suggestions::{Suggestion, SuggestionCategory};
use crate::clinical::{Drug, HemodynamicState};

pub const NOREPINEPHRINE_GAMMA_AT_OR_ABOVE: f64 = 0.2;
pub const MAP_BELOW_MMHG: f64 = 65.0;
pub const URINE_BELOW_ML_KG_H: f64 = 0.5;
pub const BLEEDING_AT_OR_ABOVE_ML_H: f64 = 200.0;

/// Shown while PEEP increases are on hold.
pub const HOLD_ADVICE: &str =
    "Prioritise analgesia/sedation, positioning, bleeding assessment and fluid-responsiveness assessment first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardrailReason {
    #[serde(rename = "NA ≥ 0.2γ")]
    HighNorepinephrine,
    #[serde(rename = "MAP < 65")]
    LowMeanArterialPressure,
    #[serde(rename = "urine output < 0.5 mL/kg/h")]
    LowUrineOutput,
    #[serde(rename = "bleeding ≥ 200 mL/h")]
    ActiveBleeding,
}

impl GuardrailReason {
    pub fn label(&self) -> &'static str {
        match self {
            GuardrailReason::HighNorepinephrine => "NA ≥ 0.2γ",
            GuardrailReason::LowMeanArterialPressure => "MAP < 65",
            GuardrailReason::LowUrineOutput => "urine output < 0.5 mL/kg/h",
            GuardrailReason::ActiveBleeding => "bleeding ≥ 200 mL/h",
        }
    }
}

impl fmt::Display for GuardrailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardrailDecision {
    pub hemodynamic_risk: bool,
    pub reasons: Vec<GuardrailReason>,
    pub suppressed_count: usize,
    /// Present only when at least one suggestion was put on hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_advice: Option<String>,
}

impl GuardrailDecision {
    /// Evaluate the predicates and mark guarded suggestions in place.
    pub fn apply(derived: &DerivedIndices, hemodynamics: &HemodynamicState, suggestions: &mut [Suggestion]) -> Self {
        let reasons = assess(derived, hemodynamics);
        let hemodynamic_risk = !reasons.is_empty();

        let mut suppressed_count = 0;
        if hemodynamic_risk {
            for suggestion in suggestions.iter_mut().filter(|s| s.category == SuggestionCategory::PeepIncrease) {
                suggestion.suppressed = true;
                suppressed_count += 1;
            }
            warn!(reasons = ?reasons, suppressed_count, "hemodynamic guardrail active");
        }

        let hold_advice = (suppressed_count > 0).then(|| {
            format!("{} PEEP increase suggestion(s) on hold. {}", suppressed_count, HOLD_ADVICE)
        });

        GuardrailDecision {
            hemodynamic_risk,
            reasons,
            suppressed_count,
            hold_advice,
        }
    }

    /// Confirmation text shown before a case is saved under risk.
    pub fn save_warning(&self) -> Option<String> {
        if !self.hemodynamic_risk {
            return None;
        }
        let reasons: Vec<&str> = self.reasons.iter().map(GuardrailReason::label).collect();
        let mut message = format!("Guardrail: hemodynamic risk ({}).\n", reasons.join(" / "));
        if self.suppressed_count > 0 {
            message.push_str("PEEP increase suggestions are on hold.\n");
        }
        message.push_str("Save this case anyway?");
        Some(message)
    }
}

/// Fired reasons in fixed predicate order.
pub fn assess(derived: &DerivedIndices, hemodynamics: &HemodynamicState) -> Vec<GuardrailReason> {
    let mut reasons = Vec::new();

    let high_norepinephrine = derived.vasopressor_doses.iter().any(|dose| {
        dose.drug == Drug::Norepinephrine && dose.gamma.map_or(false, |g| g >= NOREPINEPHRINE_GAMMA_AT_OR_ABOVE)
    });
    if high_norepinephrine {
        reasons.push(GuardrailReason::HighNorepinephrine);
    }
    if hemodynamics.mean_arterial_pressure_mmhg.map_or(false, |map| map < MAP_BELOW_MMHG) {
        reasons.push(GuardrailReason::LowMeanArterialPressure);
    }
    if derived.urine_output_ml_kg_h.map_or(false, |uo| uo < URINE_BELOW_ML_KG_H) {
        reasons.push(GuardrailReason::LowUrineOutput);
    }
    if hemodynamics.bleeding_ml_last_hour.map_or(false, |b| b >= BLEEDING_AT_OR_ABOVE_ML_H) {
        reasons.push(GuardrailReason::ActiveBleeding);
    }

    reasons
}
