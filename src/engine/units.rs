use crate::clinical::Sex;

const PBW_REFERENCE_HEIGHT_CM: f64 = 152.4;
const PBW_SLOPE_KG_PER_CM: f64 = 0.91;

/// Round half up at `places` decimals, ties toward positive infinity.
///
/// Differs from `f64::round` on negative halves: `-0.5` rounds to `0`.
/// The fraction is compared directly; adding `0.5` first can round up
/// values just below a half.
pub fn round_half_up(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded / factor
}

/// Predicted body weight (kg) from sex and height.
pub fn predicted_body_weight(sex: Sex, height_cm: Option<f64>) -> Option<f64> {
    let height = height_cm.filter(|h| h.is_finite())?;
    let base = match sex {
        Sex::Male => 50.0,
        Sex::Female => 45.5,
    };
    Some(base + PBW_SLOPE_KG_PER_CM * (height - PBW_REFERENCE_HEIGHT_CM))
}

/// PaO2 / FiO2 to one decimal. Absent when either side is missing or zero.
pub fn pf_ratio(pao2: Option<f64>, fio2: Option<f64>) -> Option<f64> {
    let pao2 = pao2.filter(|v| *v != 0.0)?;
    let fio2 = fio2.filter(|v| *v != 0.0)?;
    Some(round_half_up(pao2 / fio2, 1))
}

/// Weight-normalized infusion dose (µg/kg/min) to two decimals.
///
/// The formula is the same for every catecholamine in the preset table.
pub fn gamma(weight_kg: Option<f64>, rate_ml_h: Option<f64>, concentration_mg_ml: Option<f64>) -> Option<f64> {
    let weight = weight_kg.filter(|w| *w > 0.0)?;
    let rate = rate_ml_h?;
    let concentration = concentration_mg_ml?;

    let mg_per_hour = rate * concentration;
    let ug_per_min = mg_per_hour * 1000.0 / 60.0;
    let ug_per_kg_min = ug_per_min / weight;

    if !ug_per_kg_min.is_finite() {
        return None;
    }
    Some(round_half_up(ug_per_kg_min, 2))
}

/// Hourly urine output per kg of actual body weight, to one decimal.
pub fn normalized_urine_output(urine_ml_h: Option<f64>, weight_kg: Option<f64>) -> Option<f64> {
    let weight = weight_kg.filter(|w| *w > 0.0)?;
    let urine = urine_ml_h?;
    Some(round_half_up(urine / weight, 1))
}
