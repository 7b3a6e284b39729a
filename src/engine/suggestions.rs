use serde::{Deserialize, Serialize};

use super::derived::DerivedIndices;
use super::units::round_half_up;
use crate::clinical::{ComorbidityFlags, VentilatorSettings};

const PEEP_BELOW: f64 = 10.0;
const PEEP_STEP: f64 = 2.0;
const FIO2_BELOW: f64 = 0.8;
const FIO2_STEP: f64 = 0.1;
const FIO2_CEILING: f64 = 1.0;
const RR_STEP: f64 = 4.0;
const VT_PER_KG_AT_OR_BELOW: f64 = 6.0;
const VT_TARGET_ML_PER_KG: f64 = 6.5;
const PRESSURE_STEP: f64 = 2.0;
const EPAP_BELOW: f64 = 8.0;
const FLOW_CEILING: f64 = 60.0;
const FLOW_STEP: f64 = 10.0;

pub const COPD_CAUTION: &str = "Prolong the expiratory phase (I:E 1:3–1:4) and watch for auto-PEEP";
pub const ESRD_CAUTION: &str = "Review fluid balance and adjust diuresis / dialysis timing";

/// What a suggestion adjusts. The guardrail only acts on `PeepIncrease`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionCategory {
    #[serde(rename = "PEEP_increase")]
    PeepIncrease,
    #[serde(rename = "FiO2_increase")]
    Fio2Increase,
    #[serde(rename = "RR_increase")]
    RespiratoryRateIncrease,
    #[serde(rename = "VT_increase")]
    TidalVolumeIncrease,
    #[serde(rename = "inspiratory_pressure_increase")]
    InspiratoryPressureIncrease,
    #[serde(rename = "EPAP_increase")]
    EpapIncrease,
    #[serde(rename = "IPAP_increase")]
    IpapIncrease,
    #[serde(rename = "flow_increase")]
    FlowIncrease,
    #[serde(rename = "general")]
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub category: SuggestionCategory,
    #[serde(default)]
    pub suppressed: bool,
}

impl Suggestion {
    fn new(category: SuggestionCategory, text: String) -> Self {
        Suggestion { text, category, suppressed: false }
    }
}

/// Ordered suggestions: common rules, then the active mode's rules, then
/// comorbidity cautions.
pub fn generate(
    settings: &VentilatorSettings,
    derived: &DerivedIndices,
    comorbidities: &ComorbidityFlags,
) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if let Some(peep) = settings.peep().filter(|p| *p < PEEP_BELOW) {
        out.push(Suggestion::new(
            SuggestionCategory::PeepIncrease,
            format!("PEEP {} → {} cmH2O", peep, peep + PEEP_STEP),
        ));
    }
    if let Some(suggestion) = fio2_increase(settings.fio2()) {
        out.push(suggestion);
    }

    match settings {
        VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => {
            out.extend(rate_increase(s.respiratory_rate));
            if let (Some(vt), Some(pbw)) = (s.tidal_volume_ml, derived.pbw_kg) {
                let vt_per_kg = if pbw != 0.0 { Some(vt / pbw) } else { None };
                if let Some(vt_per_kg) = vt_per_kg.filter(|r| *r <= VT_PER_KG_AT_OR_BELOW) {
                    let target = round_half_up(pbw * VT_TARGET_ML_PER_KG, 0);
                    out.push(Suggestion::new(
                        SuggestionCategory::TidalVolumeIncrease,
                        format!(
                            "VT {} → {} mL ({:.1} → {} mL/kg PBW)",
                            vt,
                            target,
                            round_half_up(vt_per_kg, 1),
                            VT_TARGET_ML_PER_KG
                        ),
                    ));
                }
            }
        }
        VentilatorSettings::Pcv(s) => {
            out.extend(rate_increase(s.respiratory_rate));
            if let Some(pinsp) = s.inspiratory_pressure_cmh2o {
                out.push(Suggestion::new(
                    SuggestionCategory::InspiratoryPressureIncrease,
                    format!(
                        "Inspiratory pressure {} → {} cmH2O (target Pplat ≤ 30)",
                        pinsp,
                        pinsp + PRESSURE_STEP
                    ),
                ));
            }
        }
        VentilatorSettings::Nppv(s) => {
            if let Some(epap) = s.epap_cmh2o.filter(|e| *e < EPAP_BELOW) {
                out.push(Suggestion::new(
                    SuggestionCategory::EpapIncrease,
                    format!("EPAP {} → {} cmH2O", epap, epap + PRESSURE_STEP),
                ));
            }
            if let Some(ipap) = s.ipap_cmh2o {
                out.push(Suggestion::new(
                    SuggestionCategory::IpapIncrease,
                    format!("IPAP {} → {} cmH2O", ipap, ipap + PRESSURE_STEP),
                ));
            }
        }
        VentilatorSettings::Nhf(s) => {
            if let Some(flow) = s.flow_l_min.filter(|f| *f < FLOW_CEILING) {
                out.push(Suggestion::new(
                    SuggestionCategory::FlowIncrease,
                    format!("Flow {} → {} L/min", flow, FLOW_CEILING.min(flow + FLOW_STEP)),
                ));
            }
            // FiO2 step again after flow; may duplicate the common one.
            out.extend(fio2_increase(s.fio2));
        }
        VentilatorSettings::Cpap(_) => {}
    }

    if comorbidities.copd {
        out.push(Suggestion::new(SuggestionCategory::General, COPD_CAUTION.to_string()));
    }
    if comorbidities.esrd {
        out.push(Suggestion::new(SuggestionCategory::General, ESRD_CAUTION.to_string()));
    }

    out
}

fn fio2_increase(fio2: Option<f64>) -> Option<Suggestion> {
    let fio2 = fio2.filter(|f| *f < FIO2_BELOW)?;
    let target = round_half_up(FIO2_CEILING.min(fio2 + FIO2_STEP), 2);
    Some(Suggestion::new(
        SuggestionCategory::Fio2Increase,
        format!("FiO2 {} → {}", fio2, target),
    ))
}

fn rate_increase(rate: Option<f64>) -> Option<Suggestion> {
    rate.map(|rr| {
        Suggestion::new(
            SuggestionCategory::RespiratoryRateIncrease,
            format!("RR {} → {} /min", rr, rr + RR_STEP),
        )
    })
}
