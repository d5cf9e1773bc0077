//! Human-friendly liveness thresholds ("24h", "15m", "2d") expressed in hours.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::types::{PulseError, PulseResult};

/// A threshold as supplied by a caller: either text with a unit or a bare
/// number of hours.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdInput {
    Text(String),
    Hours(f64),
}

impl From<&str> for ThresholdInput {
    fn from(s: &str) -> Self {
        ThresholdInput::Text(s.to_string())
    }
}

impl From<String> for ThresholdInput {
    fn from(s: String) -> Self {
        ThresholdInput::Text(s)
    }
}

impl From<f64> for ThresholdInput {
    fn from(hours: f64) -> Self {
        ThresholdInput::Hours(hours)
    }
}

impl From<f32> for ThresholdInput {
    fn from(hours: f32) -> Self {
        ThresholdInput::Hours(hours as f64)
    }
}

impl From<i32> for ThresholdInput {
    fn from(hours: i32) -> Self {
        ThresholdInput::Hours(hours as f64)
    }
}

impl From<i64> for ThresholdInput {
    fn from(hours: i64) -> Self {
        ThresholdInput::Hours(hours as f64)
    }
}

impl From<u32> for ThresholdInput {
    fn from(hours: u32) -> Self {
        ThresholdInput::Hours(hours as f64)
    }
}

impl From<u64> for ThresholdInput {
    fn from(hours: u64) -> Self {
        ThresholdInput::Hours(hours as f64)
    }
}

impl TryFrom<&Value> for ThresholdInput {
    type Error = PulseError;

    fn try_from(value: &Value) -> PulseResult<Self> {
        match value {
            Value::String(s) => Ok(ThresholdInput::Text(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .map(ThresholdInput::Hours)
                .ok_or_else(|| PulseError::invalid(format!("unrepresentable threshold: {n}"))),
            other => Err(PulseError::invalid(format!(
                "unsupported threshold type: {}",
                json_type_name(other)
            ))),
        }
    }
}

/// Parse a threshold into hours.
///
/// Accepts `"90s"`, `"15m"`, `"24h"`, `"2d"` (case-insensitive, surrounding
/// whitespace ignored) or a positive number of hours.
pub fn parse_threshold(input: impl Into<ThresholdInput>) -> PulseResult<f64> {
    match input.into() {
        ThresholdInput::Hours(hours) => ensure_positive(hours),
        ThresholdInput::Text(text) => parse_threshold_text(&text),
    }
}

/// Parse a threshold held in a JSON value (string or number).
pub fn parse_threshold_value(value: &Value) -> PulseResult<f64> {
    parse_threshold(ThresholdInput::try_from(value)?)
}

/// Convert an hour threshold to whole seconds, truncating toward zero.
pub fn threshold_seconds(hours: f64) -> PulseResult<i64> {
    let hours = ensure_positive(hours)?;
    Ok((hours * 3600.0) as i64)
}

fn parse_threshold_text(text: &str) -> PulseResult<f64> {
    let normalized = text.trim().to_lowercase();
    let caps = threshold_regex().captures(&normalized).ok_or_else(|| {
        PulseError::invalid(format!(
            "threshold must look like \"24h\", \"15m\", \"2d\", or a numeric hour value (got {text:?})"
        ))
    })?;

    let value: f64 = caps["value"]
        .parse()
        .map_err(|_| PulseError::invalid(format!("invalid threshold value: {text:?}")))?;
    if value <= 0.0 {
        return Err(PulseError::invalid("threshold must be > 0"));
    }

    let hours = match &caps["unit"] {
        "s" => value / 3600.0,
        "m" => value / 60.0,
        "h" => value,
        "d" => value * 24.0,
        unit => return Err(PulseError::invalid(format!("unsupported unit: {unit}"))),
    };
    ensure_positive(hours)
}

fn ensure_positive(hours: f64) -> PulseResult<f64> {
    if !hours.is_finite() {
        return Err(PulseError::invalid("threshold must be a finite number"));
    }
    if hours <= 0.0 {
        return Err(PulseError::invalid("threshold must be > 0"));
    }
    Ok(hours)
}

fn threshold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<value>\d+(?:\.\d+)?)\s*(?P<unit>[smhd])$")
            .expect("threshold regex is valid")
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A validated threshold in hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(input: impl Into<ThresholdInput>) -> PulseResult<Self> {
        parse_threshold(input).map(Threshold)
    }

    pub fn hours(self) -> f64 {
        self.0
    }

    pub fn seconds(self) -> i64 {
        (self.0 * 3600.0) as i64
    }
}

impl FromStr for Threshold {
    type Err = PulseError;

    fn from_str(s: &str) -> PulseResult<Self> {
        Threshold::new(s)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_units() {
        assert!(approx(parse_threshold("24h").unwrap(), 24.0));
        assert!(approx(parse_threshold("15m").unwrap(), 0.25));
        assert!(approx(parse_threshold("2d").unwrap(), 48.0));
        assert!(approx(parse_threshold("90s").unwrap(), 0.025));
        assert!(approx(parse_threshold("1.5h").unwrap(), 1.5));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert!(approx(parse_threshold("  24H ").unwrap(), 24.0));
        assert!(approx(parse_threshold("30 M").unwrap(), 0.5));
    }

    #[test]
    fn test_numeric_hours() {
        assert!(approx(parse_threshold(3).unwrap(), 3.0));
        assert!(approx(parse_threshold(0.5).unwrap(), 0.5));
        assert!(approx(parse_threshold(12u64).unwrap(), 12.0));
    }

    #[test]
    fn test_rejects_bad_input() {
        for bad in ["0h", "abc", "24x", "", "h", "-1h", "1.h", "24hh"] {
            let err = parse_threshold(bad).unwrap_err();
            assert!(err.is_invalid_argument(), "{bad:?} should be rejected");
        }
        assert!(parse_threshold(0).unwrap_err().is_invalid_argument());
        assert!(parse_threshold(-1).unwrap_err().is_invalid_argument());
        assert!(parse_threshold(f64::NAN).unwrap_err().is_invalid_argument());
        assert!(parse_threshold(f64::INFINITY).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_json_values() {
        assert!(approx(parse_threshold_value(&json!("2d")).unwrap(), 48.0));
        assert!(approx(parse_threshold_value(&json!(6)).unwrap(), 6.0));
        assert!(parse_threshold_value(&json!(true)).unwrap_err().is_invalid_argument());
        assert!(parse_threshold_value(&json!(null)).unwrap_err().is_invalid_argument());
        assert!(parse_threshold_value(&json!(["24h"])).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_threshold_seconds_truncates() {
        assert_eq!(threshold_seconds(24.0).unwrap(), 86_400);
        assert_eq!(threshold_seconds(0.5).unwrap(), 1800);
        assert_eq!(threshold_seconds(0.0001).unwrap(), 0);
        assert!(threshold_seconds(0.0).is_err());
        assert!(threshold_seconds(-2.0).is_err());
    }

    #[test]
    fn test_threshold_from_str() {
        let t: Threshold = "15m".parse().unwrap();
        assert!(approx(t.hours(), 0.25));
        assert_eq!(t.seconds(), 900);
        assert_eq!(t.to_string(), "0.25h");
        assert!("soon".parse::<Threshold>().is_err());
    }
}
