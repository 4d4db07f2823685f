use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::helpers::de_i64_lenient;

/// A named surf location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub spot_id: i64,
    pub spot_name: String,
    /// Whatever else the backend sends (coordinates, timezone, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Spot {
    /// Extra attribute rendered as plain text, if present.
    pub fn attribute(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
