//! Shared helpers for numeric display and lenient JSON field access.
//!
//! The backend is inconsistent about numeric encoding: the same measurement
//! may arrive as a JSON number, a numeric string, `null`, or not at all.
//!
//! - `lenient_f64`: reads any of those into `Option<f64>`, never `0` for junk
//! - `format_fixed`: renders a number with a fixed number of decimals, rounding
//!   half away from zero on the exact binary value (same as JS `toFixed`)
//!
//! Both treat non-finite values (NaN, ±Inf) as absent.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use serde_json::Value;

/// Placeholder rendered wherever a number is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Read a JSON value as a finite f64.
///
/// Numbers and numeric strings (surrounding whitespace allowed) parse;
/// everything else, including `"NaN"` and `"inf"`, yields `None`.
pub fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Format an f64 with exactly `dp` decimal places.
///
/// Returns `"N/A"` for non-finite input.
pub fn format_fixed(v: f64, dp: u32) -> String {
    if !v.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    match Decimal::from_f64_retain(v) {
        Some(d) => {
            let mut rounded = d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(dp);
            rounded.to_string()
        }
        // Out of Decimal range (|v| > ~7.9e28); std formatting is close enough there.
        None => format!("{:.*}", dp as usize, v),
    }
}

/// Format an optional f64, rendering `None` as `"N/A"`.
pub fn format_opt(v: Option<f64>, dp: u32) -> String {
    v.map(|n| format_fixed(n, dp))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Deserialize an identifier sent either as a JSON number or a string.
pub(crate) fn de_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(i) => Ok(i.to_string()),
        NumberOrString::Float(f) if f.fract() == 0.0 => Ok(format!("{}", f as i64)),
        NumberOrString::Float(f) => Err(de::Error::custom(format!("invalid id {}", f))),
        NumberOrString::Str(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        NumberOrString::Str(_) => Err(de::Error::custom("empty id")),
    }
}

/// Deserialize an integer that may arrive as a numeric string.
pub(crate) fn de_i64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(i) => Ok(i),
        NumberOrString::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        NumberOrString::Float(f) => Err(de::Error::custom(format!("not an integer: {}", f))),
        NumberOrString::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| de::Error::custom(format!("not an integer '{}': {}", s, e))),
    }
}

/// Deserialize an optional number that may arrive as a string; junk is `None`.
pub(crate) fn de_opt_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(lenient_f64(value.as_ref()))
}

/// Serialize a user id as a JSON number when it is numeric, else as a string.
pub(crate) fn ser_id<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match id.parse::<i64>() {
        Ok(n) => serializer.serialize_i64(n),
        Err(_) => serializer.serialize_str(id),
    }
}
