use serde::{Deserialize, Serialize};

use super::units::{gamma, normalized_urine_output, pf_ratio, predicted_body_weight, round_half_up};
use crate::clinical::{CaseInput, Drug};

/// γ for one vasopressor line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VasopressorDose {
    pub line_id: String,
    pub drug: Drug,
    pub gamma: Option<f64>,
}

/// Indices derived from the input snapshot. Each is `None` when any input it
/// needs is missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedIndices {
    pub pbw_kg: Option<f64>,
    pub vt_per_kg_pbw: Option<f64>,
    pub pf_ratio: Option<f64>,
    pub urine_output_ml_kg_h: Option<f64>,
    pub vasopressor_doses: Vec<VasopressorDose>,
}

impl DerivedIndices {
    pub fn compute(input: &CaseInput) -> Self {
        let profile = &input.profile;

        let pbw_kg = predicted_body_weight(profile.sex, profile.height_cm).map(|pbw| round_half_up(pbw, 1));

        let vt_per_kg_pbw = match (input.settings.tidal_volume_ml(), pbw_kg) {
            (Some(vt), Some(pbw)) if pbw != 0.0 => Some(round_half_up(vt / pbw, 1)),
            _ => None,
        };

        let vasopressor_doses = input
            .vasopressors
            .iter()
            .map(|line| VasopressorDose {
                line_id: line.id.clone(),
                drug: line.drug,
                gamma: gamma(profile.weight_kg, line.infusion_rate_ml_h, line.concentration_mg_ml),
            })
            .collect();

        DerivedIndices {
            pbw_kg,
            vt_per_kg_pbw,
            pf_ratio: pf_ratio(input.blood_gas.pao2_mmhg, input.settings.fio2()),
            urine_output_ml_kg_h: normalized_urine_output(
                input.hemodynamics.urine_output_ml_last_hour,
                profile.weight_kg,
            ),
            vasopressor_doses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::{
        HighFlow, PatientProfile, PressorPresets, Sex, VasopressorLine, VentilatorSettings, VolumeControl,
    };
    use pretty_assertions::assert_eq;

    fn ward_case() -> CaseInput {
        let presets = PressorPresets::default();
        let mut line = VasopressorLine::new(Drug::Norepinephrine, &presets);
        line.infusion_rate_ml_h = Some(10.0);

        let mut input = CaseInput {
            profile: PatientProfile {
                age: Some(75.0),
                sex: Sex::Male,
                height_cm: Some(170.0),
                weight_kg: Some(70.0),
            },
            settings: VentilatorSettings::Vcv(VolumeControl {
                tidal_volume_ml: Some(420.0),
                respiratory_rate: Some(18.0),
                fio2: Some(0.6),
                peep_cmh2o: Some(8.0),
                ie_ratio: Some("1:2".to_string()),
            }),
            vasopressors: vec![line],
            ..Default::default()
        };
        input.blood_gas.pao2_mmhg = Some(72.0);
        input.hemodynamics.urine_output_ml_last_hour = Some(42.0);
        input
    }

    #[test]
    fn computes_all_indices() {
        let input = ward_case();
        let derived = DerivedIndices::compute(&input);

        assert_eq!(derived.pbw_kg, Some(66.0));
        assert_eq!(derived.vt_per_kg_pbw, Some(6.4));
        assert_eq!(derived.pf_ratio, Some(120.0));
        assert_eq!(derived.urine_output_ml_kg_h, Some(0.6));
        assert_eq!(
            derived.vasopressor_doses,
            vec![VasopressorDose {
                line_id: input.vasopressors[0].id.clone(),
                drug: Drug::Norepinephrine,
                gamma: Some(0.14),
            }]
        );
    }

    #[test]
    fn missing_height_propagates() {
        let mut input = ward_case();
        input.profile.height_cm = None;
        let derived = DerivedIndices::compute(&input);

        assert_eq!(derived.pbw_kg, None);
        assert_eq!(derived.vt_per_kg_pbw, None);
        assert_eq!(derived.pf_ratio, Some(120.0));
    }

    #[test]
    fn missing_weight_leaves_gamma_and_urine_absent() {
        let mut input = ward_case();
        input.profile.weight_kg = None;
        let derived = DerivedIndices::compute(&input);

        assert_eq!(derived.urine_output_ml_kg_h, None);
        assert_eq!(derived.vasopressor_doses[0].gamma, None);
    }

    #[test]
    fn no_vt_index_outside_volume_modes() {
        let mut input = ward_case();
        input.settings = VentilatorSettings::Nhf(HighFlow { flow_l_min: Some(50.0), fio2: Some(0.5) });
        let derived = DerivedIndices::compute(&input);

        assert_eq!(derived.vt_per_kg_pbw, None);
        assert_eq!(derived.pf_ratio, Some(144.0));
    }

    #[test]
    fn recomputation_is_idempotent() {
        let input = ward_case();
        assert_eq!(DerivedIndices::compute(&input), DerivedIndices::compute(&input));
    }
}
