//! Normalization of the two Agent Pulse response shapes.
//!
//! The v2 contract documents `{"alive", "lastPulse", "streakCount"}` while
//! deployed servers answer `{"isAlive", "lastPulseTimestamp", "streak", ...}`.
//! Both map onto [`AgentPulseStatus`].

use serde_json::{Map, Value};

use crate::types::AgentPulseStatus;

/// Timestamps above this are taken to be milliseconds (year ~2286 in seconds).
pub const MILLISECONDS_CUTOFF: i64 = 10_000_000_000;

/// `{base}/api/v2/agent/{address}/alive`, with trailing slashes of the base removed.
pub fn status_url(api_base_url: &str, address: &str) -> String {
    format!(
        "{}/api/v2/agent/{}/alive",
        api_base_url.trim_end_matches('/'),
        address
    )
}

/// Build a status record from a decoded response object.
///
/// Fields that are missing, `null`, or not coercible come back as `None`;
/// this never fails.
pub fn normalize_status(address: impl Into<String>, payload: Map<String, Value>) -> AgentPulseStatus {
    let alive = first_present(&payload, &["alive", "isAlive"]).map(truthy);
    let last_pulse_timestamp = first_present(&payload, &["lastPulse", "lastPulseTimestamp"])
        .and_then(coerce_int)
        .map(normalize_timestamp);
    let streak_count = first_present(&payload, &["streakCount", "streak"]).and_then(coerce_int);

    AgentPulseStatus {
        address: address.into(),
        alive,
        last_pulse_timestamp,
        streak_count,
        raw: payload,
    }
}

/// Convert a millisecond timestamp to seconds; second timestamps pass through.
pub fn normalize_timestamp(raw: i64) -> i64 {
    if raw > MILLISECONDS_CUTOFF {
        raw.div_euclid(1000)
    } else {
        raw
    }
}

fn first_present<'a>(payload: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_int)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    let truncated = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_status_url() {
        assert_eq!(
            status_url("https://pulse.example///", "0xabc"),
            "https://pulse.example/api/v2/agent/0xabc/alive"
        );
        assert_eq!(
            status_url("http://localhost:3000", "abc"),
            "http://localhost:3000/api/v2/agent/abc/alive"
        );
    }

    #[test]
    fn test_documented_shape() {
        let status = normalize_status(
            "0xabc",
            object(json!({"alive": true, "lastPulse": 1_700_000_000, "streakCount": 5})),
        );
        assert_eq!(status.address, "0xabc");
        assert_eq!(status.alive, Some(true));
        assert_eq!(status.last_pulse_timestamp, Some(1_700_000_000));
        assert_eq!(status.streak_count, Some(5));
    }

    #[test]
    fn test_observed_shape_keeps_raw() {
        let payload = object(json!({
            "isAlive": false,
            "lastPulseTimestamp": 1_700_000_000_000i64,
            "streak": 2,
            "hazardScore": 12
        }));
        let status = normalize_status("0xabc", payload.clone());
        assert_eq!(status.alive, Some(false));
        assert_eq!(status.last_pulse_timestamp, Some(1_700_000_000));
        assert_eq!(status.streak_count, Some(2));
        assert_eq!(status.raw, payload);
    }

    #[test]
    fn test_primary_key_wins_and_null_falls_back() {
        let status = normalize_status(
            "a",
            object(json!({"alive": true, "isAlive": false, "lastPulse": null, "lastPulseTimestamp": 42})),
        );
        assert_eq!(status.alive, Some(true));
        assert_eq!(status.last_pulse_timestamp, Some(42));
    }

    #[test]
    fn test_missing_fields() {
        let status = normalize_status("a", Map::new());
        assert_eq!(status.alive, None);
        assert_eq!(status.last_pulse_timestamp, None);
        assert_eq!(status.streak_count, None);
    }

    #[test]
    fn test_coercion() {
        let status = normalize_status(
            "a",
            object(json!({"alive": 1, "lastPulse": "1700000000", "streakCount": 3.9})),
        );
        assert_eq!(status.alive, Some(true));
        assert_eq!(status.last_pulse_timestamp, Some(1_700_000_000));
        assert_eq!(status.streak_count, Some(3));

        let status = normalize_status(
            "a",
            object(json!({"alive": "", "lastPulse": "yesterday", "streak": {"n": 1}})),
        );
        assert_eq!(status.alive, Some(false));
        assert_eq!(status.last_pulse_timestamp, None);
        assert_eq!(status.streak_count, None);
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(normalize_timestamp(1_700_000_000), 1_700_000_000);
        assert_eq!(normalize_timestamp(1_700_000_000_000), 1_700_000_000);
        assert_eq!(normalize_timestamp(MILLISECONDS_CUTOFF), MILLISECONDS_CUTOFF);
        assert_eq!(normalize_timestamp(1_700_000_000_999), 1_700_000_000);
    }

    #[test]
    fn test_float_bounds() {
        assert_eq!(float_to_int(1.7e12), Some(1_700_000_000_000));
        assert_eq!(float_to_int(-2.5), Some(-2));
        assert_eq!(float_to_int(f64::INFINITY), None);
        assert_eq!(float_to_int(1e30), None);
    }
}
