use super::problems::Problem;
use crate::clinical::BackgroundTags;

pub const FALLBACK_BACKGROUND: &str = "Cardiovascular surgery";
pub const NO_ACUTE_FINDINGS: &str = "no acute findings";

/// One-line synopsis built from the primary background tag and the detector's
/// problem list, in the detector's order.
pub fn compose(tags: &BackgroundTags, problems: &[Problem]) -> String {
    let background = tags.primary().unwrap_or(FALLBACK_BACKGROUND);
    let current = if problems.is_empty() {
        NO_ACUTE_FINDINGS.to_string()
    } else {
        problems.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    };
    format!("{} postoperative case. Currently: {}.", background, current)
}
