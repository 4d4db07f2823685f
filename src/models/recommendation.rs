use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::helpers::{de_opt_f64_lenient, ser_id};

/// One hourly recommendation as returned inside a spot group.
///
/// `spot_id`, `spot_name` and `day_offset` are not part of the hourly entry on
/// the wire; they are stamped on while flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, deserialize_with = "de_opt_f64_lenient")]
    pub suitability_score: Option<f64>,
    #[serde(default)]
    pub forecast_conditions: Map<String, Value>,
    #[serde(default)]
    pub detailed_scores: Map<String, Value>,
    #[serde(default)]
    pub tide_info: TideInfo,
    #[serde(default)]
    pub local_time: String,
    #[serde(default)]
    pub spot_id: i64,
    #[serde(default)]
    pub spot_name: String,
    #[serde(default)]
    pub day_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TideInfo {
    #[serde(default)]
    pub tide_phase: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64_lenient")]
    pub sea_level_sg: Option<f64>,
}

/// `day_offset` goes out as a bare integer for single-day queries and as a
/// list for multi-day ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DayOffset {
    Single(u32),
    Multiple(Vec<u32>),
}

/// `POST /recommendations` body.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRequest<'a> {
    #[serde(serialize_with = "ser_id")]
    pub user_id: &'a str,
    pub spot_ids: &'a [i64],
    pub day_offset: DayOffset,
    pub start_time: &'a str,
    pub end_time: &'a str,
}

/// `POST /forecasts` body. Day offsets are always a list here.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRequest<'a> {
    pub spot_ids: &'a [i64],
    pub day_offset: &'a [u32],
}
