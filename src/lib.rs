//! ventpad: a ventilation-management decision-support engine
//!
//! Turns a snapshot of patient vitals, ventilator settings and arterial blood
//! gas into derived indices, a problem list, setting suggestions and a
//! hemodynamic guardrail decision. Saved cases go to a pluggable history
//! store with CSV/JSON export and a small REST surface.

pub mod api;
pub mod clinical;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod storage;

pub use clinical::CaseInput;
pub use engine::{evaluate, Evaluation};
pub use error::VentpadError;
pub use storage::{CaseRecord, CaseStore};
