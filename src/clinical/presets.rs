use serde::{Deserialize, Serialize};

use super::Drug;

/// Ward preset for one drug: display label, default concentration and the
/// concentrations offered for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugPreset {
    pub label: String,
    pub default_concentration_mg_ml: Option<f64>,
    #[serde(default)]
    pub choices_mg_ml: Vec<f64>,
}

/// Concentration preset table, read-only to the engine.
///
/// Drugs left out of a configured table keep their built-in preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressorPresets {
    pub norepinephrine: DrugPreset,
    pub dopamine: DrugPreset,
    pub dobutamine: DrugPreset,
}

impl Default for PressorPresets {
    fn default() -> Self {
        PressorPresets {
            norepinephrine: DrugPreset {
                label: "NA".to_string(),
                default_concentration_mg_ml: Some(0.06),
                choices_mg_ml: vec![0.04, 0.06, 0.08, 0.10],
            },
            dopamine: DrugPreset {
                label: "DOA".to_string(),
                default_concentration_mg_ml: Some(4.0),
                choices_mg_ml: vec![2.0, 3.0, 4.0, 6.0],
            },
            dobutamine: DrugPreset {
                label: "DOB".to_string(),
                default_concentration_mg_ml: Some(2.0),
                choices_mg_ml: vec![1.0, 2.0, 4.0],
            },
        }
    }
}

impl PressorPresets {
    pub fn get(&self, drug: Drug) -> &DrugPreset {
        match drug {
            Drug::Norepinephrine => &self.norepinephrine,
            Drug::Dopamine => &self.dopamine,
            Drug::Dobutamine => &self.dobutamine,
        }
    }

    pub fn default_concentration(&self, drug: Drug) -> Option<f64> {
        self.get(drug).default_concentration_mg_ml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_ward_presets() {
        let presets = PressorPresets::default();
        assert_eq!(presets.default_concentration(Drug::Norepinephrine), Some(0.06));
        assert_eq!(presets.default_concentration(Drug::Dopamine), Some(4.0));
        assert_eq!(presets.default_concentration(Drug::Dobutamine), Some(2.0));
        assert_eq!(presets.get(Drug::Dopamine).choices_mg_ml, vec![2.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn presets_load_from_yaml() {
        let yaml = r#"
norepinephrine: { label: NA, default_concentration_mg_ml: 0.08, choices_mg_ml: [0.08] }
dopamine: { label: DOA, default_concentration_mg_ml: 3.0 }
dobutamine: { label: DOB, default_concentration_mg_ml: null }
"#;
        let presets: PressorPresets = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(presets.default_concentration(Drug::Norepinephrine), Some(0.08));
        assert!(presets.dopamine.choices_mg_ml.is_empty());
        assert_eq!(presets.default_concentration(Drug::Dobutamine), None);
    }
}
