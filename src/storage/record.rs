use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clinical::CaseInput;
use crate::engine::Evaluation;

/// Source of record ids and timestamps.
pub trait Stamper: Send + Sync {
    fn next_id(&self) -> String;
    fn now(&self) -> DateTime<Utc>;
}

/// Random v4 ids and the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemStamper;

impl Stamper for SystemStamper {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A saved case: the input snapshot plus everything evaluated from it.
///
/// Owns deep copies of both, so later edits to the live input never reach
/// a saved record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub input: CaseInput,
    pub evaluation: Evaluation,
}

impl CaseRecord {
    pub fn build(input: &CaseInput, evaluation: &Evaluation, stamper: &dyn Stamper) -> Self {
        CaseRecord {
            id: stamper.next_id(),
            recorded_at: stamper.now(),
            input: input.clone(),
            evaluation: evaluation.clone(),
        }
    }

    pub fn patient_tag(&self) -> Option<&str> {
        self.input.background_tags.primary()
    }
}
