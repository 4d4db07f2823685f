use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::helpers::{de_i64_lenient, lenient_f64};

// Measurement keys as the backend names them.
pub const WAVE_HEIGHT: &str = "wave_height_sg";
pub const WAVE_DIRECTION: &str = "wave_direction_sg";
pub const WAVE_PERIOD: &str = "wave_period_sg";
pub const SWELL_HEIGHT: &str = "swell_height_sg";
pub const SWELL_PERIOD: &str = "swell_period_sg";
pub const SWELL_DIRECTION: &str = "swell_direction_sg";
pub const SECONDARY_SWELL_HEIGHT: &str = "secondary_swell_height_sg";
pub const SECONDARY_SWELL_PERIOD: &str = "secondary_swell_period_sg";
pub const SECONDARY_SWELL_DIRECTION: &str = "secondary_swell_direction_sg";
pub const WIND_SPEED: &str = "wind_speed_sg";
pub const WIND_DIRECTION: &str = "wind_direction_sg";
pub const AIR_TEMPERATURE: &str = "air_temperature_sg";
pub const WATER_TEMPERATURE: &str = "water_temperature_sg";
pub const HUMIDITY: &str = "humidity_sg";
pub const SEA_LEVEL: &str = "sea_level_sg";
pub const RAIN: &str = "rain_sg";
pub const TIDE_PHASE: &str = "tide_phase";

fn default_timezone() -> String {
    "UTC".to_string()
}

/// One timestamped forecast row for one spot, as the backend sends it.
///
/// Measurements are kept as raw JSON because the backend mixes numbers,
/// numeric strings and nulls; read them through `measurement()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub spot_id: i64,
    #[serde(default)]
    pub spot_name: String,
    /// UTC instant, in whatever textual format the backend chose
    pub timestamp_utc: String,
    /// IANA timezone of the spot (e.g. "America/Sao_Paulo")
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(flatten)]
    pub measurements: Map<String, Value>,
}

impl ForecastRecord {
    /// Numeric measurement, or `None` when absent or not a finite number.
    pub fn measurement(&self, key: &str) -> Option<f64> {
        lenient_f64(self.measurements.get(key))
    }

    pub fn tide_phase(&self) -> Option<TidePhase> {
        match self.measurements.get(TIDE_PHASE)? {
            Value::String(s) => Some(TidePhase::from_label(s)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TidePhase {
    Rising,
    Falling,
}

impl TidePhase {
    /// `"rising"` (any case) is rising; every other value reads as falling.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("rising") {
            TidePhase::Rising
        } else {
            TidePhase::Falling
        }
    }

    pub fn display_label(self) -> &'static str {
        match self {
            TidePhase::Rising => "Subindo",
            TidePhase::Falling => "Descendo",
        }
    }
}

/// A forecast record plus its presentation strings in the spot's timezone.
///
/// The strings are derived once at ingestion and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedForecastRecord {
    #[serde(flatten)]
    pub record: ForecastRecord,
    pub instant: DateTime<Utc>,
    /// `HH:MM`
    pub local_time: String,
    /// `DD/MM/YYYY, HH:MM`
    pub local_date_time: String,
}

impl LocalizedForecastRecord {
    pub fn measurement(&self, key: &str) -> Option<f64> {
        self.record.measurement(key)
    }

    /// Calendar date part of `local_date_time` (everything before the first comma).
    pub fn local_date(&self) -> &str {
        date_part(&self.local_date_time)
    }
}

/// Everything before the first comma of a `DD/MM/YYYY, HH:MM` string.
pub fn date_part(local_date_time: &str) -> &str {
    local_date_time
        .split_once(',')
        .map(|(date, _)| date)
        .unwrap_or(local_date_time)
}

/// Time part after `", "`, or the whole string when there is none.
pub fn time_part(local_date_time: &str) -> &str {
    local_date_time
        .split_once(", ")
        .map(|(_, time)| time)
        .unwrap_or(local_date_time)
}
