//! DHT22 reading validation and presentation helpers.

use serde_json::Value;

use super::FieldErrors;
use crate::config::SensorsConfig;

pub const DHT22: &str = "DHT22";

const REQUIRED: &str = "This field is required.";
const NOT_A_NUMBER: &str = "A valid number is required.";

/// Inclusive accepted ranges for a DHT22 sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingBounds {
    pub temperature: (f64, f64),
    pub humidity: (f64, f64),
}

impl ReadingBounds {
    /// `None` when range checking is disabled.
    #[must_use]
    pub fn from_config(config: &SensorsConfig) -> Option<Self> {
        config.validate_ranges.then_some(Self {
            temperature: (config.temperature_min, config.temperature_max),
            humidity: (config.humidity_min, config.humidity_max),
        })
    }
}

impl Default for ReadingBounds {
    fn default() -> Self {
        Self {
            temperature: (-20.0, 50.0),
            humidity: (0.0, 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dht22Reading {
    pub temperature: f64,
    pub humidity: f64,
}

/// Validates a submitted temperature/humidity pair.
///
/// Each value may be a JSON number or a numeric string (form-encoded
/// clients send strings). Null counts as missing. All field errors are
/// reported together.
pub fn parse_dht22(
    temperature: Option<&Value>,
    humidity: Option<&Value>,
    bounds: Option<&ReadingBounds>,
) -> Result<Dht22Reading, FieldErrors> {
    let mut errors = FieldErrors::new();

    let temperature = parse_field(
        "temperature",
        temperature,
        bounds.map(|b| b.temperature),
        &mut errors,
    );
    let humidity = parse_field("humidity", humidity, bounds.map(|b| b.humidity), &mut errors);

    match (temperature, humidity) {
        (Some(temperature), Some(humidity)) if errors.is_empty() => Ok(Dht22Reading {
            temperature,
            humidity,
        }),
        _ => Err(errors),
    }
}

fn parse_field(
    field: &str,
    raw: Option<&Value>,
    range: Option<(f64, f64)>,
    errors: &mut FieldErrors,
) -> Option<f64> {
    let raw = match raw {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(v) => v,
    };

    let Some(value) = parse_number(raw) else {
        errors.add(field, NOT_A_NUMBER);
        return None;
    };

    if let Some((min, max)) = range
        && !(min..=max).contains(&value)
    {
        errors.add(
            field,
            format!("Ensure this value is between {min} and {max}."),
        );
        return None;
    }

    Some(value)
}

fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    parsed.is_finite().then_some(parsed)
}

/// Rounds to `digits` decimal places.
#[must_use]
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(digits.min(12)).unwrap_or(12));
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let t = json!(21.5);
        let h = json!("60.2");
        let reading = parse_dht22(Some(&t), Some(&h), Some(&ReadingBounds::default())).unwrap();
        assert!((reading.temperature - 21.5).abs() < f64::EPSILON);
        assert!((reading.humidity - 60.2).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let errors = parse_dht22(None, Some(&Value::Null), None).unwrap_err();
        assert_eq!(errors.get("temperature").unwrap(), [REQUIRED]);
        assert_eq!(errors.get("humidity").unwrap(), [REQUIRED]);
    }

    #[test]
    fn rejects_non_numeric_values() {
        let t = json!("warm");
        let h = json!(true);
        let errors = parse_dht22(Some(&t), Some(&h), None).unwrap_err();
        assert_eq!(errors.get("temperature").unwrap(), [NOT_A_NUMBER]);
        assert_eq!(errors.get("humidity").unwrap(), [NOT_A_NUMBER]);

        let t = json!("NaN");
        let h = json!(50);
        let errors = parse_dht22(Some(&t), Some(&h), None).unwrap_err();
        assert!(errors.get("temperature").is_some());
        assert!(errors.get("humidity").is_none());
    }

    #[test]
    fn range_check_only_when_enabled() {
        let t = json!(65.0);
        let h = json!(101);

        let errors = parse_dht22(Some(&t), Some(&h), Some(&ReadingBounds::default())).unwrap_err();
        assert!(errors.get("temperature").is_some());
        assert!(errors.get("humidity").is_some());

        assert!(parse_dht22(Some(&t), Some(&h), None).is_ok());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let t = json!(-20);
        let h = json!(100);
        assert!(parse_dht22(Some(&t), Some(&h), Some(&ReadingBounds::default())).is_ok());
    }

    #[test]
    fn bounds_follow_config_toggle() {
        let mut config = SensorsConfig::default();
        assert!(ReadingBounds::from_config(&config).is_some());
        config.validate_ranges = false;
        assert!(ReadingBounds::from_config(&config).is_none());
    }

    #[test]
    fn rounding() {
        assert!((round_to(21.456, 2) - 21.46).abs() < 1e-9);
        assert!((round_to(60.2, 2) - 60.2).abs() < f64::EPSILON);
        assert!((round_to(60.25, 0) - 60.0).abs() < f64::EPSILON);
    }
}
