use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ventpad::clinical::{
    BloodGas, CaseInput, Drug, HemodynamicState, PatientProfile, PressorPresets, Sex, VasopressorLine,
    VentilatorSettings, VolumeControl,
};
use ventpad::evaluate;

fn ward_case() -> CaseInput {
    let presets = PressorPresets::default();
    let mut norepinephrine = VasopressorLine::new(Drug::Norepinephrine, &presets);
    norepinephrine.infusion_rate_ml_h = Some(12.0);
    let mut dobutamine = VasopressorLine::new(Drug::Dobutamine, &presets);
    dobutamine.infusion_rate_ml_h = Some(3.0);

    CaseInput {
        profile: PatientProfile {
            age: Some(72.0),
            sex: Sex::Female,
            height_cm: Some(155.0),
            weight_kg: Some(52.0),
        },
        settings: VentilatorSettings::Vcv(VolumeControl {
            tidal_volume_ml: Some(280.0),
            respiratory_rate: Some(16.0),
            fio2: Some(0.5),
            peep_cmh2o: Some(6.0),
            ie_ratio: Some("1:2".to_string()),
        }),
        blood_gas: BloodGas {
            ph: Some(7.26),
            pao2_mmhg: Some(68.0),
            paco2_mmhg: Some(58.0),
            hco3_mmol_l: Some(24.0),
            lactate_mmol_l: Some(3.1),
        },
        hemodynamics: HemodynamicState {
            mean_arterial_pressure_mmhg: Some(62.0),
            spo2_percent: Some(91.0),
            urine_output_ml_last_hour: Some(20.0),
            bleeding_ml_last_hour: Some(120.0),
        },
        vasopressors: vec![norepinephrine, dobutamine],
        ..Default::default()
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let input = ward_case();
    c.bench_function("evaluate_guarded_case", |b| b.iter(|| evaluate(black_box(&input))));
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
