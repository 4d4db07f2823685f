//! Degree → compass point abbreviations.
//!
//! Chart labels and tooltips use the 8-point rose; recommendation cards use
//! the 16-point one. Both round to the nearest point and wrap negative and
//! >360 angles.

use crate::helpers::NOT_AVAILABLE;

const POINTS_8: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

const POINTS_16: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

fn nearest(points: &[&'static str], degrees: f64) -> &'static str {
    let sector = 360.0 / points.len() as f64;
    // ties round toward +inf, so -22.5 is N rather than NW
    let index = (degrees / sector + 0.5).floor() as i64;
    points[index.rem_euclid(points.len() as i64) as usize]
}

/// 8-point abbreviation for an angle in degrees.
pub fn compass8(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return NOT_AVAILABLE;
    }
    nearest(&POINTS_8, degrees)
}

/// 16-point abbreviation for an angle in degrees.
pub fn compass16(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return NOT_AVAILABLE;
    }
    nearest(&POINTS_16, degrees)
}

/// `compass8` for an optional reading; missing is `"N/A"`.
pub fn compass8_opt(degrees: Option<f64>) -> &'static str {
    degrees.map(compass8).unwrap_or(NOT_AVAILABLE)
}

pub fn compass16_opt(degrees: Option<f64>) -> &'static str {
    degrees.map(compass16).unwrap_or(NOT_AVAILABLE)
}
