//! Chart data preparation for forecast views.
//!
//! `prepare_chart` is a pure function from a spot's localized forecast series
//! and a list of metrics to everything a renderer needs: per-slot values, day
//! segments, axis labels and tooltip content. It never fails on bad data;
//! missing or non-numeric measurements become `None`.
//!
//! Day boundaries come from the printed local date (`DD/MM/YYYY` before the
//! first comma of `local_date_time`), compared as strings.

use std::ops::Range;

use serde::Serialize;

use crate::helpers::{format_fixed, NOT_AVAILABLE};
use crate::models::forecast::{self, date_part, time_part, LocalizedForecastRecord, TidePhase};
use crate::services::compass::compass8_opt;

/// Message shown in place of a chart with no data.
pub const INSUFFICIENT_DATA_MESSAGE: &str = "Dados insuficientes para o gráfico.";

/// One plotted quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSpec {
    /// Measurement key, e.g. `wave_height_sg`
    pub key: String,
    pub display_name: String,
    /// Hex colour for renderers that care
    pub color: String,
    pub unit: String,
}

impl MetricSpec {
    pub fn new(key: &str, display_name: &str, color: &str, unit: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            color: color.to_string(),
            unit: unit.to_string(),
        }
    }

    pub fn wave_height() -> Self {
        Self::new(forecast::WAVE_HEIGHT, "Altura da Onda Total", "#4169E1", "m")
    }

    pub fn wind_speed() -> Self {
        Self::new(forecast::WIND_SPEED, "Velocidade do Vento", "#228B22", "m/s")
    }

    pub fn air_temperature() -> Self {
        Self::new(forecast::AIR_TEMPERATURE, "Temperatura do Ar", "#FF4500", "°C")
    }

    pub fn water_temperature() -> Self {
        Self::new(forecast::WATER_TEMPERATURE, "Temperatura da Água", "#00BFFF", "°C")
    }

    pub fn sea_level() -> Self {
        Self::new(forecast::SEA_LEVEL, "Nível do Mar", "#8A2BE2", "m")
    }

    /// Decimal places used when displaying this metric.
    ///
    /// Lengths in meters that name a level or height get centimetre precision.
    pub fn precision(&self) -> u32 {
        let key = self.key.to_lowercase();
        if self.unit == "m" && (key.contains("level") || key.contains("height")) {
            2
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartOptions {
    /// Insert an empty separator slot between days.
    pub day_dividers: bool,
}

/// An x-axis position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Slot {
    /// Index into `PreparedChart::records`
    Record(usize),
    DayDivider,
}

/// A maximal run of records sharing one local date. `start` and `end` are
/// inclusive record indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySegment {
    pub start: usize,
    pub end: usize,
    /// The shared `DD/MM/YYYY` date
    pub label: String,
}

impl DaySegment {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end + 1
    }
}

/// Values of one metric, one per slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: MetricSpec,
    pub values: Vec<Option<f64>>,
    /// Per-bar annotation (wind speed bars carry the wind direction)
    pub bar_labels: Option<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipLine {
    pub label: String,
    pub value: String,
}

impl TooltipLine {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Tooltip {
    NoData,
    Content {
        /// The slot's `local_date_time`
        title: String,
        metrics: Vec<TooltipLine>,
        extras: Vec<TooltipLine>,
    },
}

impl std::fmt::Display for Tooltip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tooltip::NoData => write!(f, "Sem dados"),
            Tooltip::Content {
                title,
                metrics,
                extras,
            } => {
                writeln!(f, "{}", title)?;
                for line in metrics {
                    writeln!(f, "  {}: {}", line.label, line.value)?;
                }
                if !extras.is_empty() {
                    writeln!(f, "  ---")?;
                }
                for line in extras {
                    writeln!(f, "  {}: {}", line.label, line.value)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedChart {
    /// Input series, stably sorted by instant
    pub records: Vec<LocalizedForecastRecord>,
    pub slots: Vec<Slot>,
    pub segments: Vec<DaySegment>,
    /// Slot positions of day dividers (empty unless requested)
    pub dividers: Vec<usize>,
    pub series: Vec<MetricSeries>,
    pub y_axis_name: String,
    /// One per slot; the `HH:MM` part of `local_date_time`
    pub axis_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChartModel {
    InsufficientData,
    Ready(PreparedChart),
}

/// Split a series into runs of records with the same local date.
///
/// The segments partition `0..records.len()` in order.
pub fn segment_days(records: &[LocalizedForecastRecord]) -> Vec<DaySegment> {
    let mut segments = Vec::new();
    let mut current: Option<&str> = None;
    let mut segment_start = 0;

    for (i, record) in records.iter().enumerate() {
        let date = date_part(&record.local_date_time);
        if current != Some(date) {
            if let Some(label) = current {
                segments.push(DaySegment {
                    start: segment_start,
                    end: i - 1,
                    label: label.to_string(),
                });
            }
            segment_start = i;
            current = Some(date);
        }
    }

    if let Some(label) = current {
        segments.push(DaySegment {
            start: segment_start,
            end: records.len() - 1,
            label: label.to_string(),
        });
    }
    segments
}

fn y_axis_name(metrics: &[MetricSpec]) -> String {
    let mut units: Vec<&str> = Vec::new();
    for metric in metrics {
        if !units.contains(&metric.unit.as_str()) {
            units.push(&metric.unit);
        }
    }
    units.join(" / ")
}

/// Build the chart model for one spot's series.
pub fn prepare_chart(
    series: &[LocalizedForecastRecord],
    metrics: &[MetricSpec],
    options: ChartOptions,
) -> ChartModel {
    if series.is_empty() {
        return ChartModel::InsufficientData;
    }

    let mut records = series.to_vec();
    records.sort_by_key(|r| r.instant);

    let segments = segment_days(&records);

    let mut slots = Vec::with_capacity(records.len() + segments.len());
    let mut dividers = Vec::new();
    for (n, segment) in segments.iter().enumerate() {
        if options.day_dividers && n > 0 {
            dividers.push(slots.len());
            slots.push(Slot::DayDivider);
        }
        slots.extend(segment.range().map(Slot::Record));
    }

    let series = metrics
        .iter()
        .map(|metric| {
            let values = slots
                .iter()
                .map(|slot| match slot {
                    Slot::Record(i) => records[*i].measurement(&metric.key),
                    Slot::DayDivider => None,
                })
                .collect();

            let bar_labels = (metric.key == forecast::WIND_SPEED).then(|| {
                slots
                    .iter()
                    .map(|slot| match slot {
                        Slot::Record(i) => Some(
                            compass8_opt(records[*i].measurement(forecast::WIND_DIRECTION))
                                .to_string(),
                        ),
                        Slot::DayDivider => None,
                    })
                    .collect()
            });

            MetricSeries {
                metric: metric.clone(),
                values,
                bar_labels,
            }
        })
        .collect();

    let axis_labels = slots
        .iter()
        .map(|slot| match slot {
            Slot::Record(i) => time_part(&records[*i].local_date_time).to_string(),
            Slot::DayDivider => String::new(),
        })
        .collect();

    ChartModel::Ready(PreparedChart {
        records,
        slots,
        segments,
        dividers,
        series,
        y_axis_name: y_axis_name(metrics),
        axis_labels,
    })
}

fn with_unit(value: Option<f64>, dp: u32, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", format_fixed(v, dp), unit),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn swell_summary(record: &LocalizedForecastRecord, height: &str, period: &str, dir: &str) -> String {
    format!(
        "{} / {} ({})",
        with_unit(record.measurement(height), 1, " m"),
        with_unit(record.measurement(period), 1, " s"),
        compass8_opt(record.measurement(dir))
    )
}

/// Context lines keyed off the first requested metric.
fn supplementary(primary: &str, record: &LocalizedForecastRecord) -> Vec<TooltipLine> {
    let mut lines = Vec::new();
    match primary {
        forecast::WAVE_HEIGHT => {
            lines.push(TooltipLine::new(
                "Período Onda",
                with_unit(record.measurement(forecast::WAVE_PERIOD), 1, " s"),
            ));
            lines.push(TooltipLine::new(
                "Direção",
                compass8_opt(record.measurement(forecast::WAVE_DIRECTION)).to_string(),
            ));
            lines.push(TooltipLine::new(
                "Swell Principal",
                swell_summary(
                    record,
                    forecast::SWELL_HEIGHT,
                    forecast::SWELL_PERIOD,
                    forecast::SWELL_DIRECTION,
                ),
            ));
            if record
                .measurement(forecast::SECONDARY_SWELL_HEIGHT)
                .is_some_and(|h| h > 0.0)
            {
                lines.push(TooltipLine::new(
                    "Swell Secundário",
                    swell_summary(
                        record,
                        forecast::SECONDARY_SWELL_HEIGHT,
                        forecast::SECONDARY_SWELL_PERIOD,
                        forecast::SECONDARY_SWELL_DIRECTION,
                    ),
                ));
            }
        }
        forecast::WIND_SPEED => lines.push(TooltipLine::new(
            "Direção do Vento",
            compass8_opt(record.measurement(forecast::WIND_DIRECTION)).to_string(),
        )),
        forecast::AIR_TEMPERATURE => lines.push(TooltipLine::new(
            "Umidade",
            with_unit(record.measurement(forecast::HUMIDITY), 0, "%"),
        )),
        forecast::SEA_LEVEL => {
            let phase = record.record.tide_phase().unwrap_or(TidePhase::Falling);
            lines.push(TooltipLine::new("Fase da Maré", phase.display_label().to_string()));
        }
        _ => {}
    }
    lines
}

impl PreparedChart {
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The record shown at a slot, if the slot holds one.
    pub fn record_at(&self, slot: usize) -> Option<&LocalizedForecastRecord> {
        match self.slots.get(slot)? {
            Slot::Record(i) => self.records.get(*i),
            Slot::DayDivider => None,
        }
    }

    /// Tooltip content for a slot.
    pub fn tooltip(&self, slot: usize) -> Tooltip {
        let Some(record) = self.record_at(slot) else {
            return Tooltip::NoData;
        };

        let metrics = self
            .series
            .iter()
            .map(|s| {
                let value = s.values.get(slot).copied().flatten();
                TooltipLine::new(
                    &s.metric.display_name,
                    with_unit(value, s.metric.precision(), &s.metric.unit),
                )
            })
            .collect();

        let extras = self
            .series
            .first()
            .map(|s| supplementary(&s.metric.key, record))
            .unwrap_or_default();

        Tooltip::Content {
            title: record.local_date_time.clone(),
            metrics,
            extras,
        }
    }
}
