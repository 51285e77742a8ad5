#[cfg(test)]
#[path = "timestamp_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const WRAPPER_KEYS: [&str; 4] = ["$date", "date", "timestamp", "value"];

pub fn now() -> DateTime<Utc> {
    return Utc::now();
}

/// Resolves any timestamp-like JSON value to a UTC date, falling back to now
/// when nothing usable is found.
pub fn coerce(value: &Value) -> DateTime<Utc> {
    if let Some(date) = resolve(value) {
        return date;
    }

    tracing::debug!(value = %value, "Unresolvable timestamp, using current time");
    return now();
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    return Ok(coerce(&value));
}

fn resolve(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => return parse_str(text),
        Value::Number(num) => {
            if let Some(millis) = num.as_i64() {
                return from_millis(millis);
            }
            if let Some(millis) = num.as_f64() {
                return from_millis(millis.trunc() as i64);
            }

            return None;
        }
        Value::Object(map) => {
            for key in WRAPPER_KEYS {
                if let Some(date) = map.get(key).and_then(resolve) {
                    return Some(date);
                }
            }

            // std::time::SystemTime as written by serde.
            let secs = map.get("secs_since_epoch").and_then(Value::as_i64)?;
            let nanos = map
                .get("nanos_since_epoch")
                .and_then(Value::as_u64)
                .unwrap_or(0);

            return Utc
                .timestamp_opt(secs, u32::try_from(nanos).ok()?)
                .single();
        }
        _ => return None,
    }
}

fn parse_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    if let Ok(millis) = text.parse::<i64>() {
        return from_millis(millis);
    }
    if let Ok(millis) = text.parse::<f64>() {
        if millis.is_finite() {
            return from_millis(millis.trunc() as i64);
        }
    }

    return None;
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    return Utc.timestamp_millis_opt(millis).single();
}
