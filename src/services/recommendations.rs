//! Presentation helpers for backend recommendations.
//!
//! The backend groups hourly recommendations per spot and per day; the views
//! want them flat, then regrouped by day offset and spot with a summary per
//! group.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::Deserialize;
use serde_json::Value;

use crate::helpers::{de_i64_lenient, format_fixed, NOT_AVAILABLE};
use crate::models::recommendation::Recommendation;

pub const INVALID_TIME: &str = "Horário Inválido";

#[derive(Debug, Deserialize)]
struct SpotGroup {
    #[serde(default, deserialize_with = "de_i64_lenient")]
    spot_id: i64,
    #[serde(default)]
    spot_name: String,
    #[serde(default)]
    day_offset: Option<u32>,
    recommendations: Vec<Value>,
}

fn push_group(group: Value, out: &mut Vec<Recommendation>) {
    let group: SpotGroup = match serde_json::from_value(group) {
        Ok(group) => group,
        Err(e) => {
            tracing::warn!("Skipping malformed recommendation group: {}", e);
            return;
        }
    };

    for item in group.recommendations {
        match serde_json::from_value::<Recommendation>(item) {
            Ok(mut rec) => {
                rec.spot_id = group.spot_id;
                rec.spot_name = group.spot_name.clone();
                rec.day_offset = group.day_offset.unwrap_or(0);
                out.push(rec);
            }
            Err(e) => tracing::warn!(
                "Skipping malformed recommendation for spot {}: {}",
                group.spot_id,
                e
            ),
        }
    }
}

/// Flatten a `POST /recommendations` body into stamped recommendations.
///
/// Accepts `recommendations_by_spot` as an array of arrays of spot groups or
/// as a flat array of spot groups, and a bare `recommendations` array as a
/// last resort. Anything else yields an empty list.
pub fn flatten_recommendations(payload: &Value) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if let Some(by_spot) = payload.get("recommendations_by_spot").and_then(Value::as_array) {
        for entry in by_spot {
            match entry {
                Value::Array(groups) => {
                    for group in groups {
                        push_group(group.clone(), &mut out);
                    }
                }
                Value::Object(_) => push_group(entry.clone(), &mut out),
                other => tracing::warn!("Skipping unexpected recommendation entry: {}", other),
            }
        }
    } else if let Some(recs) = payload.get("recommendations").and_then(Value::as_array) {
        for item in recs {
            match serde_json::from_value::<Recommendation>(item.clone()) {
                Ok(rec) => out.push(rec),
                Err(e) => tracing::warn!("Skipping malformed recommendation: {}", e),
            }
        }
    } else {
        tracing::warn!("Recommendation payload has no recommendations");
    }

    out
}

/// Qualitative rating for a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Classic,
    VeryGood,
    Good,
    Surfable,
    Poor,
    VeryPoor,
    NoData,
}

impl Rating {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Rating::NoData,
            Some(s) if s.is_nan() => Rating::NoData,
            Some(s) if s >= 95.0 => Rating::Classic,
            Some(s) if s >= 75.0 => Rating::VeryGood,
            Some(s) if s >= 60.0 => Rating::Good,
            Some(s) if s >= 40.0 => Rating::Surfable,
            Some(s) if s >= 30.0 => Rating::Poor,
            Some(_) => Rating::VeryPoor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Classic => "Clássico",
            Rating::VeryGood => "Muito Bom",
            Rating::Good => "Bom",
            Rating::Surfable => "Surfável",
            Rating::Poor => "Ruim",
            Rating::VeryPoor => "Muito Ruim",
            Rating::NoData => "Sem dados",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Render a 0-1 sub-score as `NN/100`.
pub fn format_detailed_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() => format!("{}/100", format_fixed(s * 100.0, 0)),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn parse_local(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// `HH:MM` of a recommendation's local timestamp, as written (the offset in
/// the string is kept, not converted).
pub fn format_local_time(raw: &str) -> String {
    match parse_local(raw) {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => INVALID_TIME.to_string(),
    }
}

fn weekday_pt(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "segunda-feira",
        Weekday::Tue => "terça-feira",
        Weekday::Wed => "quarta-feira",
        Weekday::Thu => "quinta-feira",
        Weekday::Fri => "sexta-feira",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// Heading for a day offset relative to `today`.
///
/// An offset past the last representable date is shown as `Dia +N`.
pub fn display_day(day_offset: u32, today: NaiveDate) -> String {
    let Some(date) = today.checked_add_days(Days::new(u64::from(day_offset))) else {
        return format!("Dia +{}", day_offset);
    };
    let day_month = date.format("%d/%m");
    match day_offset {
        0 => format!("Hoje - {}", day_month),
        1 => format!("Amanhã - {}", day_month),
        _ => format!("{}, {}", weekday_pt(date.weekday()), day_month),
    }
}

/// All recommendations of one spot on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotSummary {
    pub spot_id: i64,
    pub spot_name: String,
    pub recommendations: Vec<Recommendation>,
}

impl SpotSummary {
    /// Mean suitability on a 0-100 scale; missing scores count as 0.
    pub fn average_score(&self) -> Option<f64> {
        if self.recommendations.is_empty() {
            return None;
        }
        let total: f64 = self
            .recommendations
            .iter()
            .map(|r| r.suitability_score.unwrap_or(0.0))
            .sum();
        Some(total / self.recommendations.len() as f64 * 100.0)
    }

    pub fn rating(&self) -> Rating {
        Rating::from_score(self.average_score())
    }

    /// Recommendations in chronological order.
    pub fn chronological(&self) -> Vec<&Recommendation> {
        let mut recs: Vec<&Recommendation> = self.recommendations.iter().collect();
        recs.sort_by_key(|r| parse_local(&r.local_time));
        recs
    }

    /// Best first; missing scores count as 0.
    pub fn ranked(&self) -> Vec<&Recommendation> {
        let mut recs = self.chronological();
        recs.sort_by(|a, b| {
            let a = a.suitability_score.unwrap_or(0.0);
            let b = b.suitability_score.unwrap_or(0.0);
            b.total_cmp(&a)
        });
        recs
    }

    /// `Previsões entre HH:MM e HH:MM` over the covered hours.
    pub fn time_window(&self) -> String {
        let recs = self.chronological();
        let first = recs
            .first()
            .map(|r| format_local_time(&r.local_time))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let last = recs
            .last()
            .map(|r| format_local_time(&r.local_time))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        format!("Previsões entre {} e {}", first, last)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub day_offset: u32,
    /// Sorted by spot name
    pub spots: Vec<SpotSummary>,
}

/// Regroup flat recommendations by day offset (ascending), then by spot.
pub fn group_by_day(recs: &[Recommendation]) -> Vec<DayGroup> {
    let mut days: Vec<DayGroup> = Vec::new();

    for rec in recs {
        let idx = match days.iter().position(|d| d.day_offset == rec.day_offset) {
            Some(idx) => idx,
            None => {
                days.push(DayGroup {
                    day_offset: rec.day_offset,
                    spots: Vec::new(),
                });
                days.len() - 1
            }
        };
        let day = &mut days[idx];

        match day
            .spots
            .iter_mut()
            .find(|s| s.spot_id == rec.spot_id && s.spot_name == rec.spot_name)
        {
            Some(spot) => spot.recommendations.push(rec.clone()),
            None => day.spots.push(SpotSummary {
                spot_id: rec.spot_id,
                spot_name: rec.spot_name.clone(),
                recommendations: vec![rec.clone()],
            }),
        }
    }

    days.sort_by_key(|d| d.day_offset);
    for day in &mut days {
        day.spots.sort_by(|a, b| a.spot_name.cmp(&b.spot_name));
    }
    days
}
