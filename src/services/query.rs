//! Local validation of forecast and recommendation queries.
//!
//! Everything here runs before a request is built, so a bad selection never
//! reaches the network.

use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::preset::Preset;
use crate::models::recommendation::{DayOffset, RecommendationRequest};

pub const NO_SPOTS_MESSAGE: &str = "Selecione pelo menos um spot.";

/// Wall-clock time with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// `HH:MM:SS` with zero seconds, as presets store it.
    pub fn with_seconds(&self) -> String {
        format!("{}:00", self)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

fn two_digits(part: &str) -> Option<u8> {
    if part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit()) {
        part.parse().ok()
    } else {
        None
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    /// Accepts `HH:MM`, and `HH:MM:SS` with the seconds dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Horário inválido '{}': use HH:MM.", s));

        let trimmed = s.trim();
        let mut parts = trimmed.split(':');
        let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
            return Err(invalid());
        };
        match parts.next() {
            None => {}
            Some(sec) if two_digits(sec).is_some_and(|v| v < 60) => {}
            Some(_) => return Err(invalid()),
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        let hour = two_digits(h).ok_or_else(invalid)?;
        let minute = two_digits(m).ok_or_else(invalid)?;
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

/// Reject an empty spot selection.
pub fn validate_spot_selection(spot_ids: &[i64]) -> Result<(), AppError> {
    if spot_ids.is_empty() {
        return Err(AppError::Validation(NO_SPOTS_MESSAGE.to_string()));
    }
    Ok(())
}

/// A validated recommendation query: spots plus a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub spot_ids: Vec<i64>,
    start_time: String,
    end_time: String,
}

impl RecommendationQuery {
    pub fn new(spot_ids: Vec<i64>, start: &str, end: &str) -> Result<Self, AppError> {
        validate_spot_selection(&spot_ids)?;
        let start: TimeOfDay = start.parse()?;
        let end: TimeOfDay = end.parse()?;
        Ok(Self {
            spot_ids,
            start_time: start.to_string(),
            end_time: end.to_string(),
        })
    }

    /// Query stored in a preset, with its times cut down to `HH:MM`.
    pub fn from_preset(preset: &Preset) -> Result<Self, AppError> {
        Self::new(preset.spot_ids.clone(), &preset.start_time, &preset.end_time)
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn end_time(&self) -> &str {
        &self.end_time
    }

    pub fn request<'a>(&'a self, user_id: &'a str, day_offset: DayOffset) -> RecommendationRequest<'a> {
        RecommendationRequest {
            user_id,
            spot_ids: &self.spot_ids,
            day_offset,
            start_time: &self.start_time,
            end_time: &self.end_time,
        }
    }
}
