pub mod forecast;
pub mod preset;
pub mod profile;
pub mod recommendation;
pub mod spot;

pub use forecast::{ForecastRecord, LocalizedForecastRecord, TidePhase};
pub use preset::{NewPreset, Preset, PresetCreated};
pub use profile::{LoginRequest, LoginResponse, ProfileUpdate, Registration, Stance, SurfLevel, UserProfile};
pub use recommendation::{DayOffset, ForecastRequest, Recommendation, RecommendationRequest, TideInfo};
pub use spot::Spot;
