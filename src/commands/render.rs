//! Plain-text rendering of charts and recommendation cards.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::helpers::{format_fixed, format_opt, lenient_f64, NOT_AVAILABLE};
use crate::models::recommendation::Recommendation;
use crate::services::chart::{ChartModel, PreparedChart, Slot, INSUFFICIENT_DATA_MESSAGE};
use crate::services::compass::compass16_opt;
use crate::services::recommendations::{
    display_day, format_detailed_score, format_local_time, DayGroup, Rating, SpotSummary,
};

const BAR_WIDTH: usize = 30;

/// Sub-scores shown on a recommendation card, in display order.
const DETAILED_SCORES: [(&str, &str); 8] = [
    ("wave_height_score", "Altura Onda"),
    ("swell_period_score", "Período Onda"),
    ("swell_direction_score", "Direção Onda"),
    ("wind_score", "Vento"),
    ("tide_score", "Maré"),
    ("air_temperature_score", "Temp. Ar"),
    ("water_temperature_score", "Temp. Água"),
    ("secondary_swell_impact", "Impacto Ond. Sec."),
];

fn bar(value: f64, max: f64) -> String {
    if value <= 0.0 || max <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(cells.clamp(1, BAR_WIDTH))
}

fn marker(index: usize) -> char {
    char::from(b'a' + (index % 26) as u8)
}

fn render_prepared(out: &mut String, chart: &PreparedChart) {
    let max = chart
        .series
        .iter()
        .flat_map(|s| s.values.iter().flatten())
        .fold(0.0_f64, |acc, v| acc.max(*v));
    let multi = chart.series.len() > 1;

    if multi {
        for (i, s) in chart.series.iter().enumerate() {
            out.push_str(&format!("  {} = {} ({})\n", marker(i), s.metric.display_name, s.metric.unit));
        }
    }

    for (slot_index, slot) in chart.slots.iter().enumerate() {
        match slot {
            Slot::DayDivider => {
                out.push_str(&format!("  {}\n", "─".repeat(BAR_WIDTH + 16)));
                continue;
            }
            Slot::Record(record_index) => {
                if let Some(segment) = chart.segments.iter().find(|s| s.start == *record_index) {
                    out.push_str(&format!("  [{}]\n", segment.label));
                }
            }
        }

        let time = &chart.axis_labels[slot_index];
        for (i, series) in chart.series.iter().enumerate() {
            let value = series.values[slot_index];
            let prefix = if multi { format!("{} ", marker(i)) } else { String::new() };
            let shown = match value {
                Some(v) => format!("{} {}", format_fixed(v, series.metric.precision()), series.metric.unit),
                None => NOT_AVAILABLE.to_string(),
            };
            let label = series
                .bar_labels
                .as_ref()
                .and_then(|labels| labels[slot_index].as_deref())
                .map(|l| format!(" {}", l))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {:>5} {}│{:<width$} {}{}\n",
                time,
                prefix,
                bar(value.unwrap_or(0.0), max),
                shown,
                label,
                width = BAR_WIDTH
            ));
        }
    }
}

/// Horizontal bar chart, one row per slot and metric.
pub fn render_chart(title: &str, model: &ChartModel) -> String {
    let mut out = String::new();
    match model {
        ChartModel::InsufficientData => {
            out.push_str(&format!("{}\n", title));
            out.push_str(&format!("  {}\n", INSUFFICIENT_DATA_MESSAGE));
        }
        ChartModel::Ready(chart) => {
            if chart.y_axis_name.is_empty() {
                out.push_str(&format!("{}\n", title));
            } else {
                out.push_str(&format!("{} ({})\n", title, chart.y_axis_name));
            }
            render_prepared(&mut out, chart);
        }
    }
    out
}

/// Tooltip text for every record slot of a chart.
pub fn render_details(model: &ChartModel) -> String {
    let mut out = String::new();
    if let ChartModel::Ready(chart) = model {
        for slot in 0..chart.slot_count() {
            if chart.record_at(slot).is_some() {
                out.push_str(&chart.tooltip(slot).to_string());
            }
        }
    }
    out
}

fn condition(conditions: &Map<String, Value>, key: &str) -> String {
    match conditions.get(key) {
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn direction(conditions: &Map<String, Value>, key: &str) -> &'static str {
    compass16_opt(lenient_f64(conditions.get(key)))
}

/// One recommendation as a small text card.
pub fn render_recommendation(rec: &Recommendation) -> String {
    let mut out = String::new();
    let fc = &rec.forecast_conditions;
    let score = rec.suitability_score.map(|s| s * 100.0);

    out.push_str(&format!(
        "    {}  {}  {}\n",
        format_local_time(&rec.local_time),
        format_opt(score, 0),
        Rating::from_score(score.map(|s| s.round()))
    ));
    out.push_str(&format!(
        "      Ondulação: {}m ({}s) de {}\n",
        condition(fc, "swell_height_sg"),
        condition(fc, "swell_period_sg"),
        direction(fc, "swell_direction_sg")
    ));
    if lenient_f64(fc.get("secondary_swell_height_sg")).is_some_and(|h| h != 0.0) {
        out.push_str(&format!(
            "      Ond. Sec.: {}m ({}s) de {}\n",
            condition(fc, "secondary_swell_height_sg"),
            condition(fc, "secondary_swell_period_sg"),
            direction(fc, "secondary_swell_direction_sg")
        ));
    }
    out.push_str(&format!(
        "      Vento: {} m/s de {}\n",
        condition(fc, "wind_speed_sg"),
        direction(fc, "wind_direction_sg")
    ));
    out.push_str(&format!(
        "      Maré: {} ({}m)\n",
        rec.tide_info.tide_phase.as_deref().unwrap_or(NOT_AVAILABLE),
        format_opt(rec.tide_info.sea_level_sg, 2)
    ));
    out.push_str(&format!(
        "      Temp. Ar: {}°C  Temp. Água: {}°C\n",
        condition(fc, "air_temperature_sg"),
        condition(fc, "water_temperature_sg")
    ));

    if !rec.detailed_scores.is_empty() {
        let scores: Vec<String> = DETAILED_SCORES
            .iter()
            .filter(|(key, _)| {
                *key != "secondary_swell_impact" || rec.detailed_scores.contains_key(*key)
            })
            .map(|(key, label)| {
                format!(
                    "{}: {}",
                    label,
                    format_detailed_score(lenient_f64(rec.detailed_scores.get(*key)))
                )
            })
            .collect();
        out.push_str(&format!("      {}\n", scores.join(" | ")));
    }
    out
}

fn render_spot(out: &mut String, spot: &SpotSummary, expanded: bool) {
    out.push_str(&format!(
        "  {}: {} ({}) · {}\n",
        spot.spot_name,
        spot.rating(),
        format_opt(spot.average_score(), 0),
        spot.time_window()
    ));
    if spot.recommendations.is_empty() {
        out.push_str("    Nenhuma recomendação disponível para este spot.\n");
    } else if expanded {
        for rec in spot.ranked() {
            out.push_str(&render_recommendation(rec));
        }
    }
}

/// Day-by-day recommendation listing.
pub fn render_days(days: &[DayGroup], today: NaiveDate, expanded: bool) -> String {
    let mut out = String::new();
    for day in days {
        out.push_str(&format!("== {} ==\n", display_day(day.day_offset, today)));
        for spot in &day.spots {
            render_spot(&mut out, spot, expanded);
        }
        out.push('\n');
    }
    out
}
