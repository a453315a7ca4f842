//! Scalar coercion: raw JSON/string values into their declared types.
//!
//! Every transport hands us strings (path segments, query values, headers,
//! cookies, form fields) or JSON scalars (body fields). Both funnel through
//! [`coerce_scalar`], which returns the *normalized* JSON value the rest of
//! validation and the handler see.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde_json::Value;
use uuid::Uuid;

use super::FieldType;

/// Coerce one scalar JSON value to `ty`, returning the normalized value.
///
/// Rules:
/// - integers reject non-integral input (`"4"` ok, `"4.2"` and `4.2` not);
/// - floats accept integral input;
/// - booleans accept `true`/`false`/`1`/`0` case-insensitively;
/// - uuids and durations normalize to their canonical rendering;
/// - datetimes, times and urls keep their source text once parsed.
pub(crate) fn coerce_scalar(value: &Value, ty: &FieldType) -> Result<Value, String> {
    match ty {
        FieldType::Str => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err("expected a string".into()),
        },
        FieldType::Int => coerce_int(value).map(Value::from),
        FieldType::Float => coerce_float(value).map(Value::from),
        FieldType::Bool => coerce_bool(value).map(Value::from),
        FieldType::Uuid => {
            let s = as_str(value)?;
            let id: Uuid = s.parse().map_err(|_| format!("`{s}` is not a valid uuid"))?;
            Ok(Value::String(id.to_string()))
        }
        FieldType::DateTime => {
            let s = as_str(value)?;
            let _: NaiveDateTime =
                s.parse().map_err(|_| format!("`{s}` is not a valid datetime"))?;
            Ok(Value::String(s.to_owned()))
        }
        FieldType::Time => {
            let s = as_str(value)?;
            let _: NaiveTime = s.parse().map_err(|_| format!("`{s}` is not a valid time"))?;
            Ok(Value::String(s.to_owned()))
        }
        FieldType::Duration => {
            let s = as_str(value)?;
            let d = parse_duration(s)?;
            Ok(Value::String(format_duration(d)))
        }
        FieldType::Url => {
            let s = as_str(value)?;
            url::Url::parse(s).map_err(|_| format!("`{s}` is not a valid url"))?;
            Ok(Value::String(s.to_owned()))
        }
        FieldType::Any => Ok(value.clone()),
        // Containers, objects, bytes and files are handled by the walker and
        // the multipart layer; they never reach scalar coercion.
        other => Err(format!("expected a {}", other.name())),
    }
}

pub(crate) fn coerce_int(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(format!("`{n}` is not an integer")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("`{s}` is not an integer")),
        _ => Err("expected an integer".into()),
    }
}

pub(crate) fn coerce_float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("`{n}` is not a number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("`{s}` is not a number")),
        _ => Err("expected a number".into()),
    }
}

/// Fixed boolean vocabulary. Anything outside it is rejected, never guessed.
pub(crate) fn coerce_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("`{s}` is not a boolean")),
        },
        _ => Err("expected a boolean".into()),
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "expected a string".to_string())
}

// ── ISO-8601 durations ───────────────────────────────────────────────────────

/// Parse an ISO-8601 duration of the form `PnDTnHnMnS` (each component
/// optional, at least one required). Fractional seconds are accepted.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let err = || format!("`{s}` is not a valid ISO-8601 duration");
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P').ok_or_else(err)?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut secs = 0f64;
    let mut seen = false;

    let mut date = date_part;
    for (unit, mult) in [('W', 604_800f64), ('D', 86_400f64)] {
        if let Some(idx) = date.find(unit) {
            let n: f64 = date[..idx].parse().map_err(|_| err())?;
            secs += n * mult;
            seen = true;
            date = &date[idx + 1..];
        }
    }
    if !date.is_empty() {
        return Err(err());
    }

    if let Some(mut time) = time_part {
        if time.is_empty() {
            return Err(err());
        }
        for (unit, mult) in [('H', 3_600f64), ('M', 60f64), ('S', 1f64)] {
            if let Some(idx) = time.find(unit) {
                let n: f64 = time[..idx].parse().map_err(|_| err())?;
                secs += n * mult;
                seen = true;
                time = &time[idx + 1..];
            }
        }
        if !time.is_empty() {
            return Err(err());
        }
    }

    if !seen {
        return Err(err());
    }
    if negative {
        secs = -secs;
    }
    Duration::try_milliseconds((secs * 1000.0).round() as i64).ok_or_else(err)
}

/// Render a duration in canonical ISO-8601 form, zero components omitted.
/// The zero duration renders as `PT0S`.
pub fn format_duration(d: Duration) -> String {
    let mut out = String::new();
    let mut millis = d.num_milliseconds();
    if millis < 0 {
        out.push('-');
        millis = -millis;
    }
    out.push('P');

    let days = millis / 86_400_000;
    millis %= 86_400_000;
    let hours = millis / 3_600_000;
    millis %= 3_600_000;
    let mins = millis / 60_000;
    millis %= 60_000;
    let secs = millis / 1000;
    millis %= 1000;

    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || mins > 0 || secs > 0 || millis > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if mins > 0 {
            out.push_str(&format!("{mins}M"));
        }
        if millis > 0 {
            out.push_str(&format!("{}.{:03}S", secs, millis));
        } else if secs > 0 || (days == 0 && hours == 0 && mins == 0) {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_rejects_non_integral_strings() {
        assert_eq!(coerce_int(&json!("42")), Ok(42));
        assert_eq!(coerce_int(&json!(" 7 ")), Ok(7));
        assert!(coerce_int(&json!("4.2")).is_err());
        assert!(coerce_int(&json!("abc")).is_err());
        assert!(coerce_int(&json!(4.2)).is_err());
        assert_eq!(coerce_int(&json!(4.0)), Ok(4));
    }

    #[test]
    fn float_accepts_integral_input() {
        assert_eq!(coerce_float(&json!("3")), Ok(3.0));
        assert_eq!(coerce_float(&json!(3)), Ok(3.0));
        assert_eq!(coerce_float(&json!("3.5")), Ok(3.5));
        assert!(coerce_float(&json!("x")).is_err());
    }

    #[test]
    fn bool_vocabulary_is_fixed_and_case_insensitive() {
        for s in ["true", "TRUE", "1"] {
            assert_eq!(coerce_bool(&json!(s)), Ok(true), "{s}");
        }
        for s in ["false", "False", "0"] {
            assert_eq!(coerce_bool(&json!(s)), Ok(false), "{s}");
        }
        assert!(coerce_bool(&json!("yes")).is_err());
        assert!(coerce_bool(&json!("")).is_err());
    }

    #[test]
    fn duration_parse_and_format() {
        assert_eq!(parse_duration("PT30M").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("PT1H30M").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("P1DT2H").unwrap(), Duration::hours(26));
        assert_eq!(parse_duration("PT0.5S").unwrap(), Duration::milliseconds(500));
        assert_eq!(parse_duration("-PT15M").unwrap(), Duration::minutes(-15));
        assert!(parse_duration("P").is_err());
        assert!(parse_duration("30M").is_err());
        assert!(parse_duration("PTXM").is_err());

        assert_eq!(format_duration(Duration::minutes(90)), "PT1H30M");
        assert_eq!(format_duration(Duration::minutes(30)), "PT30M");
        assert_eq!(format_duration(Duration::zero()), "PT0S");
        assert_eq!(format_duration(Duration::hours(26)), "P1DT2H");
        assert_eq!(format_duration(Duration::minutes(-15)), "-PT15M");
    }

    #[test]
    fn duration_round_trips_through_canonical_form() {
        for s in ["PT30M", "PT1H30M", "P2DT3H4M5S", "PT0S"] {
            let d = parse_duration(s).unwrap();
            assert_eq!(format_duration(d), s);
        }
    }

    #[test]
    fn uuid_normalizes_to_canonical_form() {
        let v = coerce_scalar(
            &json!("67E55044-10B1-426F-9247-BB680E5FE0C8"),
            &FieldType::Uuid,
        )
        .unwrap();
        assert_eq!(v, json!("67e55044-10b1-426f-9247-bb680e5fe0c8"));
    }

    #[test]
    fn datetime_and_time_parse() {
        assert!(coerce_scalar(&json!("2023-01-01T00:00:00"), &FieldType::DateTime).is_ok());
        assert!(coerce_scalar(&json!("not-a-date"), &FieldType::DateTime).is_err());
        assert!(coerce_scalar(&json!("14:23:55"), &FieldType::Time).is_ok());
    }

    #[test]
    fn url_must_be_absolute() {
        assert!(coerce_scalar(&json!("https://example.com/x.jpg"), &FieldType::Url).is_ok());
        assert!(coerce_scalar(&json!("not a url"), &FieldType::Url).is_err());
    }
}
