//! Derivation and rule-evaluation engine
//!
//! Pure functions from a [`CaseInput`] snapshot to an [`Evaluation`]:
//! - unit conversions and derived indices
//! - problem detection
//! - mode-specific setting suggestions
//! - the hemodynamic guardrail
//! - a one-line summary
//!
//! Nothing is cached; each call recomputes everything from the snapshot.

pub mod derived;
pub mod guardrail;
pub mod problems;
pub mod suggestions;
pub mod summary;
pub mod units;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clinical::CaseInput;
pub use derived::{DerivedIndices, VasopressorDose};
pub use guardrail::{GuardrailDecision, GuardrailReason};
pub use problems::Problem;
pub use suggestions::{Suggestion, SuggestionCategory};

/// Re-assessment advice attached to every evaluation.
pub const FOLLOW_UP_ADVICE: &str =
    "Re-assess SpO2, RR, BP and ABG 15–30 min after a setting change; consider the next step if there is little improvement.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub derived: DerivedIndices,
    pub problems: Vec<String>,
    pub suggestions: Vec<Suggestion>,
    pub guardrail: GuardrailDecision,
    pub summary: String,
    pub follow_up: String,
}

pub fn evaluate(input: &CaseInput) -> Evaluation {
    let derived = DerivedIndices::compute(input);
    let problems = problems::detect(&input.blood_gas, &derived);
    let mut suggestions = suggestions::generate(&input.settings, &derived, &input.comorbidities);
    let guardrail = GuardrailDecision::apply(&derived, &input.hemodynamics, &mut suggestions);
    let summary = summary::compose(&input.background_tags, &problems);

    debug!(
        mode = %input.settings.mode(),
        problems = problems.len(),
        suggestions = suggestions.len(),
        hemodynamic_risk = guardrail.hemodynamic_risk,
        "evaluated case"
    );

    Evaluation {
        derived,
        problems: problems.iter().map(ToString::to_string).collect(),
        suggestions,
        guardrail,
        summary,
        follow_up: FOLLOW_UP_ADVICE.to_string(),
    }
}
