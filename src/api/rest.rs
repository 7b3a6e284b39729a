use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Reply};

use crate::clinical::{CaseInput, Drug, PressorPresets, VasopressorLine};
use crate::engine::evaluate;
use crate::storage::export::{to_csv, to_json};
use crate::storage::{CaseRecord, CaseStore, Stamper};

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SaveCaseRequest {
    pub input: CaseInput,
    /// Save even when the guardrail reports hemodynamic risk.
    #[serde(default)]
    pub acknowledge_guardrail: bool,
}

#[derive(Debug, Deserialize)]
pub struct VasopressorRequest {
    pub drug: Drug,
    /// Existing line to switch to `drug`; a new line is created when absent.
    #[serde(default)]
    pub line: Option<VasopressorLine>,
}

pub struct RestApi {
    store: Arc<dyn CaseStore>,
    stamper: Arc<dyn Stamper>,
    presets: Arc<PressorPresets>,
    export_offset: FixedOffset,
}

impl RestApi {
    pub fn new(
        store: Arc<dyn CaseStore>,
        stamper: Arc<dyn Stamper>,
        presets: PressorPresets,
        export_offset: FixedOffset,
    ) -> Self {
        RestApi {
            store,
            stamper,
            presets: Arc::new(presets),
            export_offset,
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        self.post_evaluate()
            .or(self.post_record())
            .or(self.list_records())
            .or(self.export_csv())
            .or(self.export_json())
            .or(self.delete_record())
            .or(self.clear_records())
            .or(self.get_presets())
            .or(self.post_vasopressor())
    }

    fn post_evaluate(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path!("ventilation" / "evaluate")
            .and(warp::post())
            .and(json_body())
            .and_then(|body: Bytes| async move {
                let input = match parse_input::<CaseInput>(&body) {
                    Ok(input) => input,
                    Err(response) => return Ok::<Response, Infallible>(response),
                };
                let input = match input.normalized() {
                    Ok(input) => input,
                    Err(e) => return Ok(failure(StatusCode::BAD_REQUEST, e.to_string())),
                };

                let evaluation = evaluate(&input);
                Ok(respond(StatusCode::OK, "success", "Case evaluated", &evaluation))
            })
    }

    fn post_record(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);
        let stamper = Arc::clone(&self.stamper);

        warp::path!("ventilation" / "records")
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let store = Arc::clone(&store);
                let stamper = Arc::clone(&stamper);
                async move {
                    let request = match parse_input::<SaveCaseRequest>(&body) {
                        Ok(request) => request,
                        Err(response) => return Ok::<Response, Infallible>(response),
                    };
                    let input = match request.input.normalized() {
                        Ok(input) => input,
                        Err(e) => return Ok(failure(StatusCode::BAD_REQUEST, e.to_string())),
                    };

                    let evaluation = evaluate(&input);
                    if let Some(warning) = evaluation.guardrail.save_warning() {
                        if !request.acknowledge_guardrail {
                            info!("save held for guardrail acknowledgement");
                            return Ok(respond(StatusCode::CONFLICT, "confirm", warning, &evaluation));
                        }
                    }

                    let record = CaseRecord::build(&input, &evaluation, stamper.as_ref());
                    if let Err(e) = store.append(record.clone()) {
                        error!(error = %e, "failed to save case record");
                        return Ok(failure(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            format!("Failed to save case: {}", e),
                        ));
                    }

                    info!(id = %record.id, "case record saved");
                    Ok(respond(StatusCode::CREATED, "success", "Case saved", &record))
                }
            })
    }

    fn list_records(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);

        warp::path!("ventilation" / "records")
            .and(warp::get())
            .and_then(move || {
                let store = Arc::clone(&store);
                async move {
                    let response = match store.list() {
                        Ok(records) => respond(
                            StatusCode::OK,
                            "success",
                            format!("{} record(s)", records.len()),
                            &records,
                        ),
                        Err(e) => storage_failure(e),
                    };
                    Ok::<Response, Infallible>(response)
                }
            })
    }

    fn export_csv(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);
        let offset = self.export_offset;

        warp::path!("ventilation" / "records" / "export.csv")
            .and(warp::get())
            .and_then(move || {
                let store = Arc::clone(&store);
                async move {
                    let response = match store.list() {
                        Ok(records) => attachment(
                            to_csv(&records, offset),
                            "text/csv; charset=utf-8",
                            "ventilation_records.csv",
                        ),
                        Err(e) => storage_failure(e),
                    };
                    Ok::<Response, Infallible>(response)
                }
            })
    }

    fn export_json(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);

        warp::path!("ventilation" / "records" / "export.json")
            .and(warp::get())
            .and_then(move || {
                let store = Arc::clone(&store);
                async move {
                    let records = match store.list() {
                        Ok(records) => records,
                        Err(e) => return Ok::<Response, Infallible>(storage_failure(e)),
                    };
                    let response = match to_json(&records) {
                        Ok(json) => attachment(json, "application/json", "ventilation_records.json"),
                        Err(e) => {
                            error!(error = %e, "failed to export records");
                            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to export records")
                        }
                    };
                    Ok(response)
                }
            })
    }

    fn delete_record(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);

        warp::path!("ventilation" / "records" / String)
            .and(warp::delete())
            .and_then(move |id: String| {
                let store = Arc::clone(&store);
                async move {
                    let response = match store.delete(&id) {
                        Ok(true) => {
                            info!(id = %id, "case record deleted");
                            acknowledge(StatusCode::OK, "Record deleted")
                        }
                        Ok(false) => failure(StatusCode::NOT_FOUND, format!("No record with id {}", id)),
                        Err(e) => storage_failure(e),
                    };
                    Ok::<Response, Infallible>(response)
                }
            })
    }

    fn clear_records(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);

        warp::path!("ventilation" / "records")
            .and(warp::delete())
            .and_then(move || {
                let store = Arc::clone(&store);
                async move {
                    let response = match store.clear() {
                        Ok(()) => {
                            warn!("case history cleared");
                            acknowledge(StatusCode::OK, "History cleared")
                        }
                        Err(e) => storage_failure(e),
                    };
                    Ok::<Response, Infallible>(response)
                }
            })
    }

    fn get_presets(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let presets = Arc::clone(&self.presets);

        warp::path!("ventilation" / "presets")
            .and(warp::get())
            .map(move || respond(StatusCode::OK, "success", "Pressor presets", presets.as_ref()))
    }

    fn post_vasopressor(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let presets = Arc::clone(&self.presets);

        warp::path!("ventilation" / "vasopressors")
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let presets = Arc::clone(&presets);
                async move {
                    let request = match parse_input::<VasopressorRequest>(&body) {
                        Ok(request) => request,
                        Err(response) => return Ok::<Response, Infallible>(response),
                    };

                    let line = match request.line {
                        Some(mut line) => {
                            line.select_drug(request.drug, &presets);
                            line
                        }
                        None => VasopressorLine::new(request.drug, &presets),
                    };
                    Ok(respond(StatusCode::OK, "success", "Vasopressor line", &line))
                }
            })
    }
}

fn json_body() -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

fn parse_input<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "rejected request body");
        failure(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    })
}

fn respond<T: Serialize + ?Sized>(code: StatusCode, status: &str, message: impl Into<String>, data: &T) -> Response {
    match serde_json::to_value(data) {
        Ok(data) => envelope(code, status, message.into(), Some(data)),
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize response")
        }
    }
}

/// Success envelope with no payload.
fn acknowledge(code: StatusCode, message: &str) -> Response {
    envelope(code, "success", message.to_string(), None)
}

fn failure(code: StatusCode, message: impl Into<String>) -> Response {
    envelope(code, "error", message.into(), None)
}

fn storage_failure(e: crate::storage::StorageError) -> Response {
    error!(error = %e, "case store failure");
    failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Storage error: {}", e))
}

fn envelope(code: StatusCode, status: &str, message: String, data: Option<serde_json::Value>) -> Response {
    let response = ApiResponse {
        status: status.to_string(),
        message,
        data,
    };
    warp::reply::with_status(warp::reply::json(&response), code).into_response()
}

fn attachment(body: String, content_type: &'static str, filename: &str) -> Response {
    let reply = warp::reply::with_header(body, CONTENT_TYPE, content_type);
    warp::reply::with_header(reply, CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::tests::FixedStamper;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn api() -> (RestApi, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(200));
        let api = RestApi::new(
            store.clone(),
            Arc::new(FixedStamper::new("case-1")),
            PressorPresets::default(),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        );
        (api, store)
    }

    fn ventilated_case() -> serde_json::Value {
        json!({
            "profile": { "sex": "male", "height_cm": "170", "weight_kg": 70 },
            "settings": { "mode": "VCV", "tidal_volume_ml": 420, "respiratory_rate": 18, "fio2": "0,6", "peep_cmh2o": 8 },
            "blood_gas": { "ph": 7.28, "pao2_mmhg": 72, "paco2_mmhg": "" },
            "hemodynamics": { "mean_arterial_pressure_mmhg": 60 }
        })
    }

    fn body(res: &warp::http::Response<Bytes>) -> ApiResponse {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn evaluate_accepts_lenient_numbers() {
        let (api, _) = api();
        let res = warp::test::request()
            .method("POST")
            .path("/ventilation/evaluate")
            .json(&ventilated_case())
            .reply(&api.routes())
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let data = body(&res).data.unwrap();
        assert_eq!(data["derived"]["pf_ratio"], json!(120.0));
        assert_eq!(data["problems"], json!(["hypoxemia (P/F = 120)", "acidosis (pH = 7.28)"]));
        assert_eq!(data["guardrail"]["reasons"], json!(["MAP < 65"]));
    }

    #[tokio::test]
    async fn evaluate_rejects_bad_numbers() {
        let (api, _) = api();
        let res = warp::test::request()
            .method("POST")
            .path("/ventilation/evaluate")
            .json(&json!({ "blood_gas": { "ph": "seven" } }))
            .reply(&api.routes())
            .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res).status, "error");
    }

    #[tokio::test]
    async fn save_under_risk_needs_acknowledgement() {
        let (api, store) = api();
        let routes = api.routes();

        let held = warp::test::request()
            .method("POST")
            .path("/ventilation/records")
            .json(&json!({ "input": ventilated_case() }))
            .reply(&routes)
            .await;
        assert_eq!(held.status(), StatusCode::CONFLICT);
        let held = body(&held);
        assert_eq!(held.status, "confirm");
        assert!(held.message.contains("MAP < 65"));
        assert!(store.list().unwrap().is_empty());

        let saved = warp::test::request()
            .method("POST")
            .path("/ventilation/records")
            .json(&json!({ "input": ventilated_case(), "acknowledge_guardrail": true }))
            .reply(&routes)
            .await;
        assert_eq!(saved.status(), StatusCode::CREATED);
        assert_eq!(body(&saved).data.unwrap()["id"], json!("case-1"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_and_clear_records() {
        let (api, _) = api();
        let routes = api.routes();

        warp::test::request()
            .method("POST")
            .path("/ventilation/records")
            .json(&json!({ "input": {} }))
            .reply(&routes)
            .await;

        let missing = warp::test::request()
            .method("DELETE")
            .path("/ventilation/records/nope")
            .reply(&routes)
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let deleted = warp::test::request()
            .method("DELETE")
            .path("/ventilation/records/case-1")
            .reply(&routes)
            .await;
        assert_eq!(deleted.status(), StatusCode::OK);

        let cleared = warp::test::request()
            .method("DELETE")
            .path("/ventilation/records")
            .reply(&routes)
            .await;
        assert_eq!(cleared.status(), StatusCode::OK);

        let listed = warp::test::request().path("/ventilation/records").reply(&routes).await;
        assert_eq!(body(&listed).data.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn csv_export_is_an_attachment() {
        let (api, _) = api();
        let routes = api.routes();

        warp::test::request()
            .method("POST")
            .path("/ventilation/records")
            .json(&json!({ "input": { "background_tags": ["CABG"] } }))
            .reply(&routes)
            .await;

        let res = warp::test::request()
            .path("/ventilation/records/export.csv")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "text/csv; charset=utf-8");

        let csv = String::from_utf8(res.body().to_vec()).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"2025/03/01 15:30\",\"CABG\",\"VCV\""));
    }

    #[tokio::test]
    async fn vasopressor_line_uses_presets() {
        let (api, _) = api();
        let routes = api.routes();

        let created = warp::test::request()
            .method("POST")
            .path("/ventilation/vasopressors")
            .json(&json!({ "drug": "dopamine" }))
            .reply(&routes)
            .await;
        let line = body(&created).data.unwrap();
        assert_eq!(line["concentration_mg_ml"], json!(4.0));

        let switched = warp::test::request()
            .method("POST")
            .path("/ventilation/vasopressors")
            .json(&json!({ "drug": "norepinephrine", "line": line }))
            .reply(&routes)
            .await;
        let switched = body(&switched).data.unwrap();
        assert_eq!(switched["id"], line["id"]);
        assert_eq!(switched["concentration_mg_ml"], json!(0.06));
    }
}
