use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::helpers::{de_i64_lenient, ser_id};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(u32),
    Many(Vec<u32>),
}

/// `day_offset_default` is stored either as one offset or as a list.
fn de_day_offsets<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(day)) => vec![day],
        Some(OneOrMany::Many(days)) => days,
        None => Vec::new(),
    })
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "de_i64_lenient")] i64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

/// A saved, named recommendation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub preset_id: Option<i64>,
    #[serde(default)]
    pub preset_name: String,
    #[serde(default)]
    pub spot_ids: Vec<i64>,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default, deserialize_with = "de_day_offsets")]
    pub day_offset_default: Vec<u32>,
    #[serde(default)]
    pub is_default: bool,
}

/// `POST /presets` body.
#[derive(Debug, Clone, Serialize)]
pub struct NewPreset<'a> {
    #[serde(serialize_with = "ser_id")]
    pub user_id: &'a str,
    pub preset_name: &'a str,
    pub spot_ids: &'a [i64],
    pub start_time: &'a str,
    pub end_time: &'a str,
    pub day_offset_default: &'a [u32],
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetCreated {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub preset_id: Option<i64>,
}
