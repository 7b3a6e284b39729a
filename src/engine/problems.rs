use std::fmt;

use super::derived::DerivedIndices;
use crate::clinical::BloodGas;

pub const HYPOXEMIA_PF_BELOW: f64 = 200.0;
pub const HYPERCAPNIA_PACO2_ABOVE: f64 = 50.0;
pub const ACIDOSIS_PH_BELOW: f64 = 7.30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Problem {
    Hypoxemia { pf_ratio: f64 },
    Hypercapnia,
    Acidosis { ph: f64 },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Hypoxemia { pf_ratio } => write!(f, "hypoxemia (P/F = {})", pf_ratio),
            Problem::Hypercapnia => f.write_str("hypercapnia"),
            Problem::Acidosis { ph } => write!(f, "acidosis (pH = {})", ph),
        }
    }
}

/// Problem list in fixed order: hypoxemia, hypercapnia, acidosis.
///
/// Rules are independent; a rule whose input is absent does not fire.
pub fn detect(blood_gas: &BloodGas, derived: &DerivedIndices) -> Vec<Problem> {
    let mut problems = Vec::new();

    if let Some(pf_ratio) = derived.pf_ratio.filter(|pf| *pf < HYPOXEMIA_PF_BELOW) {
        problems.push(Problem::Hypoxemia { pf_ratio });
    }
    if blood_gas.paco2_mmhg.map_or(false, |paco2| paco2 > HYPERCAPNIA_PACO2_ABOVE) {
        problems.push(Problem::Hypercapnia);
    }
    if let Some(ph) = blood_gas.ph.filter(|ph| *ph < ACIDOSIS_PH_BELOW) {
        problems.push(Problem::Acidosis { ph });
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn labels(blood_gas: &BloodGas, pf_ratio: Option<f64>) -> Vec<String> {
        let derived = DerivedIndices { pf_ratio, ..Default::default() };
        detect(blood_gas, &derived).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn fixed_order_regardless_of_severity() {
        let blood_gas = BloodGas { ph: Some(7.2), paco2_mmhg: Some(60.0), ..Default::default() };
        assert_eq!(
            labels(&blood_gas, Some(150.0)),
            vec!["hypoxemia (P/F = 150)", "hypercapnia", "acidosis (pH = 7.2)"]
        );
    }

    #[test]
    fn absent_values_never_fire() {
        assert!(labels(&BloodGas::default(), None).is_empty());
    }

    #[test_case(Some(199.9), None, None => vec!["hypoxemia (P/F = 199.9)".to_string()]; "pf just below")]
    #[test_case(Some(200.0), None, None => Vec::<String>::new(); "pf at threshold")]
    #[test_case(None, Some(50.0), None => Vec::<String>::new(); "paco2 at threshold")]
    #[test_case(None, Some(50.1), None => vec!["hypercapnia".to_string()]; "paco2 above")]
    #[test_case(None, None, Some(7.30) => Vec::<String>::new(); "ph at threshold")]
    #[test_case(None, None, Some(7.28) => vec!["acidosis (pH = 7.28)".to_string()]; "ph below")]
    fn thresholds(pf_ratio: Option<f64>, paco2: Option<f64>, ph: Option<f64>) -> Vec<String> {
        let blood_gas = BloodGas { ph, paco2_mmhg: paco2, ..Default::default() };
        labels(&blood_gas, pf_ratio)
    }
}
