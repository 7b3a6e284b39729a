//! Clinical input types
//!
//! The snapshot a single evaluation runs over: patient profile, ventilator
//! settings, blood gas, hemodynamics, vasopressor lines and comorbidities.
//! Every measured quantity is an `Option<f64>`; `None` means "not entered",
//! never zero.

pub mod input;
pub mod presets;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use self::input::lenient_number;
pub use self::input::InputError;
pub use self::presets::{DrugPreset, PressorPresets};

/// Maximum number of background tags kept per case.
pub const MAX_BACKGROUND_TAGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientProfile {
    #[serde(default, deserialize_with = "lenient_number")]
    pub age: Option<f64>,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height_cm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight_kg: Option<f64>,
}

/// Primary background / status tags, e.g. "mitral valve repair".
///
/// Holds at most [`MAX_BACKGROUND_TAGS`] distinct, trimmed, non-empty entries
/// in insertion order. The first one names the case in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct BackgroundTags(Vec<String>);

impl BackgroundTags {
    pub fn new() -> Self {
        BackgroundTags(Vec::new())
    }

    /// Returns `false` when the tag was empty, a duplicate, or the list is full.
    pub fn add(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.0.len() >= MAX_BACKGROUND_TAGS || self.0.iter().any(|t| t == tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for BackgroundTags {
    fn from(tags: Vec<String>) -> Self {
        let mut out = BackgroundTags::new();
        for tag in &tags {
            out.add(tag);
        }
        out
    }
}

impl From<BackgroundTags> for Vec<String> {
    fn from(tags: BackgroundTags) -> Self {
        tags.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VentilationMode {
    Vcv,
    Pcv,
    Simv,
    Nppv,
    Nhf,
    Cpap,
}

impl fmt::Display for VentilationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VentilationMode::Vcv => "VCV",
            VentilationMode::Pcv => "PCV",
            VentilationMode::Simv => "SIMV",
            VentilationMode::Nppv => "NPPV",
            VentilationMode::Nhf => "NHF",
            VentilationMode::Cpap => "CPAP",
        };
        f.write_str(name)
    }
}

/// Volume-targeted settings shared by VCV and SIMV.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeControl {
    #[serde(default, deserialize_with = "lenient_number")]
    pub tidal_volume_ml: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub respiratory_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fio2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub peep_cmh2o: Option<f64>,
    #[serde(default)]
    pub ie_ratio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PressureControl {
    #[serde(default, deserialize_with = "lenient_number")]
    pub inspiratory_pressure_cmh2o: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub respiratory_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fio2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub peep_cmh2o: Option<f64>,
    #[serde(default)]
    pub ie_ratio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NonInvasive {
    #[serde(default, deserialize_with = "lenient_number")]
    pub ipap_cmh2o: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub epap_cmh2o: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub backup_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fio2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighFlow {
    #[serde(default, deserialize_with = "lenient_number")]
    pub flow_l_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fio2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContinuousPressure {
    #[serde(default, deserialize_with = "lenient_number")]
    pub epap_cmh2o: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fio2: Option<f64>,
}

/// Ventilator settings, one variant per mode.
///
/// Serialized internally tagged: `{"mode": "PCV", "respiratory_rate": 18, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "UPPERCASE")]
pub enum VentilatorSettings {
    Vcv(VolumeControl),
    Pcv(PressureControl),
    Simv(VolumeControl),
    Nppv(NonInvasive),
    Nhf(HighFlow),
    Cpap(ContinuousPressure),
}

impl Default for VentilatorSettings {
    fn default() -> Self {
        VentilatorSettings::Vcv(VolumeControl::default())
    }
}

impl VentilatorSettings {
    pub fn mode(&self) -> VentilationMode {
        match self {
            VentilatorSettings::Vcv(_) => VentilationMode::Vcv,
            VentilatorSettings::Pcv(_) => VentilationMode::Pcv,
            VentilatorSettings::Simv(_) => VentilationMode::Simv,
            VentilatorSettings::Nppv(_) => VentilationMode::Nppv,
            VentilatorSettings::Nhf(_) => VentilationMode::Nhf,
            VentilatorSettings::Cpap(_) => VentilationMode::Cpap,
        }
    }

    pub fn fio2(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => s.fio2,
            VentilatorSettings::Pcv(s) => s.fio2,
            VentilatorSettings::Nppv(s) => s.fio2,
            VentilatorSettings::Nhf(s) => s.fio2,
            VentilatorSettings::Cpap(s) => s.fio2,
        }
    }

    fn fio2_mut(&mut self) -> &mut Option<f64> {
        match self {
            VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => &mut s.fio2,
            VentilatorSettings::Pcv(s) => &mut s.fio2,
            VentilatorSettings::Nppv(s) => &mut s.fio2,
            VentilatorSettings::Nhf(s) => &mut s.fio2,
            VentilatorSettings::Cpap(s) => &mut s.fio2,
        }
    }

    /// PEEP exists only on the invasive modes.
    pub fn peep(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => s.peep_cmh2o,
            VentilatorSettings::Pcv(s) => s.peep_cmh2o,
            _ => None,
        }
    }

    pub fn tidal_volume_ml(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => s.tidal_volume_ml,
            _ => None,
        }
    }

    /// Set rate for VCV/SIMV/PCV, backup rate for NPPV.
    pub fn respiratory_rate(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => s.respiratory_rate,
            VentilatorSettings::Pcv(s) => s.respiratory_rate,
            VentilatorSettings::Nppv(s) => s.backup_rate,
            _ => None,
        }
    }

    pub fn inspiratory_pressure(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Pcv(s) => s.inspiratory_pressure_cmh2o,
            _ => None,
        }
    }

    pub fn ipap(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Nppv(s) => s.ipap_cmh2o,
            _ => None,
        }
    }

    pub fn epap(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Nppv(s) => s.epap_cmh2o,
            VentilatorSettings::Cpap(s) => s.epap_cmh2o,
            _ => None,
        }
    }

    pub fn flow_l_min(&self) -> Option<f64> {
        match self {
            VentilatorSettings::Nhf(s) => s.flow_l_min,
            _ => None,
        }
    }

    pub fn ie_ratio(&self) -> Option<&str> {
        match self {
            VentilatorSettings::Vcv(s) | VentilatorSettings::Simv(s) => s.ie_ratio.as_deref(),
            VentilatorSettings::Pcv(s) => s.ie_ratio.as_deref(),
            _ => None,
        }
    }

    fn numeric_fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("tidal_volume_ml", self.tidal_volume_ml()),
            ("respiratory_rate", self.respiratory_rate()),
            ("fio2", self.fio2()),
            ("peep_cmh2o", self.peep()),
            ("inspiratory_pressure_cmh2o", self.inspiratory_pressure()),
            ("ipap_cmh2o", self.ipap()),
            ("epap_cmh2o", self.epap()),
            ("flow_l_min", self.flow_l_min()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BloodGas {
    #[serde(default, deserialize_with = "lenient_number")]
    pub ph: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pao2_mmhg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub paco2_mmhg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hco3_mmol_l: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lactate_mmol_l: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HemodynamicState {
    #[serde(default, deserialize_with = "lenient_number")]
    pub mean_arterial_pressure_mmhg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub spo2_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub urine_output_ml_last_hour: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bleeding_ml_last_hour: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drug {
    Norepinephrine,
    Dopamine,
    Dobutamine,
}

impl Drug {
    /// Bedside abbreviation used in exports.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Drug::Norepinephrine => "NA",
            Drug::Dopamine => "DOA",
            Drug::Dobutamine => "DOB",
        }
    }
}

/// One running vasopressor infusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VasopressorLine {
    pub id: String,
    pub drug: Drug,
    #[serde(default, deserialize_with = "lenient_number")]
    pub infusion_rate_ml_h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub concentration_mg_ml: Option<f64>,
}

impl VasopressorLine {
    /// A fresh line with the preset default concentration for `drug`.
    pub fn new(drug: Drug, presets: &PressorPresets) -> Self {
        VasopressorLine {
            id: Uuid::new_v4().to_string(),
            drug,
            infusion_rate_ml_h: None,
            concentration_mg_ml: presets.default_concentration(drug),
        }
    }

    /// Switch drug, re-applying the preset concentration when the preset has one.
    pub fn select_drug(&mut self, drug: Drug, presets: &PressorPresets) {
        self.drug = drug;
        if let Some(concentration) = presets.default_concentration(drug) {
            self.concentration_mg_ml = Some(concentration);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComorbidityFlags {
    #[serde(default)]
    pub copd: bool,
    /// End-stage renal disease on dialysis.
    #[serde(default)]
    pub esrd: bool,
    /// Do-not-intubate. Recorded only.
    #[serde(default)]
    pub dni: bool,
}

/// Complete input snapshot for one evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseInput {
    #[serde(default)]
    pub profile: PatientProfile,
    #[serde(default)]
    pub background_tags: BackgroundTags,
    #[serde(default)]
    pub settings: VentilatorSettings,
    #[serde(default)]
    pub blood_gas: BloodGas,
    #[serde(default)]
    pub hemodynamics: HemodynamicState,
    #[serde(default)]
    pub vasopressors: Vec<VasopressorLine>,
    #[serde(default)]
    pub comorbidities: ComorbidityFlags,
}

impl CaseInput {
    /// Apply the entry rules to a snapshot built in code.
    ///
    /// Rejects non-finite numbers and clamps FiO2 into its allowed range.
    pub fn normalized(mut self) -> Result<Self, InputError> {
        let mut fields = vec![
            ("age", self.profile.age),
            ("height_cm", self.profile.height_cm),
            ("weight_kg", self.profile.weight_kg),
            ("ph", self.blood_gas.ph),
            ("pao2_mmhg", self.blood_gas.pao2_mmhg),
            ("paco2_mmhg", self.blood_gas.paco2_mmhg),
            ("hco3_mmol_l", self.blood_gas.hco3_mmol_l),
            ("lactate_mmol_l", self.blood_gas.lactate_mmol_l),
            ("mean_arterial_pressure_mmhg", self.hemodynamics.mean_arterial_pressure_mmhg),
            ("spo2_percent", self.hemodynamics.spo2_percent),
            ("urine_output_ml_last_hour", self.hemodynamics.urine_output_ml_last_hour),
            ("bleeding_ml_last_hour", self.hemodynamics.bleeding_ml_last_hour),
        ];
        fields.extend(self.settings.numeric_fields());
        for line in &self.vasopressors {
            fields.push(("infusion_rate_ml_h", line.infusion_rate_ml_h));
            fields.push(("concentration_mg_ml", line.concentration_mg_ml));
        }

        for (field, value) in fields {
            input::ensure_finite(field, value)?;
        }

        let fio2 = self.settings.fio2_mut();
        *fio2 = fio2.map(input::clamp_fio2);
        Ok(self)
    }
}
