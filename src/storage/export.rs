//! CSV and JSON projections of the case history.

use chrono::FixedOffset;

use super::CaseRecord;

const LIST_SEPARATOR: &str = " / ";
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

const HEADER: [&str; 30] = [
    "timestamp",
    "patient_tag",
    "mode",
    "pbw_kg",
    "vt_ml",
    "rr",
    "fio2",
    "peep",
    "inspiratory_pressure",
    "ipap",
    "epap",
    "flow",
    "ie_ratio",
    "ph",
    "pao2",
    "paco2",
    "hco3",
    "lactate",
    "pf_ratio",
    "vt_per_kg_pbw",
    "map",
    "spo2",
    "urine_1h",
    "bleeding_1h",
    "urine_ml_kg_h",
    "pressors",
    "guardrails",
    "summary",
    "problems",
    "suggestions",
];

/// One header row plus one row per record, every cell quoted.
///
/// Timestamps are rendered in `offset`.
pub fn to_csv(records: &[CaseRecord], offset: FixedOffset) -> String {
    let mut out = csv_row(HEADER.iter().map(|h| h.to_string()));
    for record in records {
        out.push_str(&csv_row(record_cells(record, offset)));
    }
    out
}

/// Pretty-printed JSON array of the records.
pub fn to_json(records: &[CaseRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

fn record_cells(record: &CaseRecord, offset: FixedOffset) -> Vec<String> {
    let input = &record.input;
    let settings = &input.settings;
    let gas = &input.blood_gas;
    let hemo = &input.hemodynamics;
    let derived = &record.evaluation.derived;

    let pressors = derived
        .vasopressor_doses
        .iter()
        .map(|dose| {
            let gamma = dose.gamma.map_or_else(|| "-".to_string(), |g| g.to_string());
            format!("{}:{}", dose.drug.abbreviation(), gamma)
        })
        .collect::<Vec<_>>()
        .join(" ");

    let guardrails = record
        .evaluation
        .guardrail
        .reasons
        .iter()
        .map(|reason| reason.label())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR);

    let suggestions = record
        .evaluation
        .suggestions
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR);

    vec![
        record.recorded_at.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
        record.patient_tag().unwrap_or_default().to_string(),
        settings.mode().to_string(),
        number(derived.pbw_kg),
        number(settings.tidal_volume_ml()),
        number(settings.respiratory_rate()),
        number(settings.fio2()),
        number(settings.peep()),
        number(settings.inspiratory_pressure()),
        number(settings.ipap()),
        number(settings.epap()),
        number(settings.flow_l_min()),
        settings.ie_ratio().unwrap_or_default().to_string(),
        number(gas.ph),
        number(gas.pao2_mmhg),
        number(gas.paco2_mmhg),
        number(gas.hco3_mmol_l),
        number(gas.lactate_mmol_l),
        number(derived.pf_ratio),
        number(derived.vt_per_kg_pbw),
        number(hemo.mean_arterial_pressure_mmhg),
        number(hemo.spo2_percent),
        number(hemo.urine_output_ml_last_hour),
        number(hemo.bleeding_ml_last_hour),
        number(derived.urine_output_ml_kg_h),
        pressors,
        guardrails,
        record.evaluation.summary.clone(),
        record.evaluation.problems.join(LIST_SEPARATOR),
        suggestions,
    ]
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_row(cells: impl IntoIterator<Item = String>) -> String {
    let mut row = cells
        .into_iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}
