//! Numeric entry rules
//!
//! Text typed at the bedside is normalized here before it reaches the
//! engine: a comma decimal separator is accepted, empty text means "not
//! entered", anything else that is not a finite number is rejected.

use serde::{Deserialize, Deserializer};

pub const FIO2_MIN: f64 = 0.21;
pub const FIO2_MAX: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("not a number: {0:?}")]
    NotNumeric(String),
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
}

/// Parse one entry box. `Ok(None)` is an empty box.
pub fn parse_entry(raw: &str) -> Result<Option<f64>, InputError> {
    let text = raw.trim().replacen(',', ".", 1);
    if text.is_empty() {
        return Ok(None);
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(InputError::NotNumeric(raw.to_string())),
    }
}

pub fn clamp_fio2(value: f64) -> f64 {
    value.clamp(FIO2_MIN, FIO2_MAX)
}

pub fn ensure_finite(field: &'static str, value: Option<f64>) -> Result<(), InputError> {
    match value {
        Some(v) if !v.is_finite() => Err(InputError::NonFinite { field }),
        _ => Ok(()),
    }
}

/// Serde adapter: accepts a JSON number, a numeric string, an empty string
/// or null.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(f64),
        Text(String),
    }

    match Option::<Entry>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Entry::Number(value)) if value.is_finite() => Ok(Some(value)),
        Some(Entry::Number(value)) => Err(serde::de::Error::custom(format!("non-finite number {}", value))),
        Some(Entry::Text(text)) => parse_entry(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use test_case::test_case;

    #[test_case("7.28" => Ok(Some(7.28)); "plain decimal")]
    #[test_case("7,28" => Ok(Some(7.28)); "comma decimal")]
    #[test_case(" 420 " => Ok(Some(420.0)); "surrounding spaces")]
    #[test_case("" => Ok(None); "empty box")]
    #[test_case("   " => Ok(None); "blank box")]
    #[test_case("7.2a" => Err(InputError::NotNumeric("7.2a".to_string())); "trailing garbage")]
    #[test_case("NaN" => Err(InputError::NotNumeric("NaN".to_string())); "nan text")]
    #[test_case("inf" => Err(InputError::NotNumeric("inf".to_string())); "infinity text")]
    fn parses_entry(raw: &str) -> Result<Option<f64>, InputError> {
        parse_entry(raw)
    }

    #[test]
    fn fio2_is_clamped_to_bounds() {
        assert_eq!(clamp_fio2(0.1), 0.21);
        assert_eq!(clamp_fio2(0.45), 0.45);
        assert_eq!(clamp_fio2(1.2), 1.0);
    }

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_number")]
        value: Option<f64>,
    }

    #[test]
    fn lenient_number_accepts_numbers_text_and_null() {
        let parse = |json: &str| serde_json::from_str::<Probe>(json).map(|p| p.value);

        assert_eq!(parse(r#"{"value": 12}"#).unwrap(), Some(12.0));
        assert_eq!(parse(r#"{"value": "0,5"}"#).unwrap(), Some(0.5));
        assert_eq!(parse(r#"{"value": ""}"#).unwrap(), None);
        assert_eq!(parse(r#"{"value": null}"#).unwrap(), None);
        assert_eq!(parse(r#"{}"#).unwrap(), None);
        assert!(parse(r#"{"value": "abc"}"#).is_err());
    }
}
