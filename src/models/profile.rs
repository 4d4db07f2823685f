use serde::{Deserialize, Serialize};

use crate::helpers::de_id_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfLevel {
    Beginner,
    Maroleiro,
    Intermediate,
    Expert,
}

impl SurfLevel {
    pub fn display_label(self) -> &'static str {
        match self {
            SurfLevel::Beginner => "Iniciante",
            SurfLevel::Maroleiro => "Maroleiro",
            SurfLevel::Intermediate => "Intermediário",
            SurfLevel::Expert => "Expert",
        }
    }
}

impl std::str::FromStr for SurfLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(SurfLevel::Beginner),
            "maroleiro" => Ok(SurfLevel::Maroleiro),
            "intermediate" => Ok(SurfLevel::Intermediate),
            "expert" => Ok(SurfLevel::Expert),
            other => Err(format!("unknown surf level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Goofy,
    Regular,
}

impl std::str::FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "goofy" => Ok(Stance::Goofy),
            "regular" => Ok(Stance::Regular),
            other => Err(format!("unknown stance '{}'", other)),
        }
    }
}

/// Full user profile, owned by the id it was requested under.
///
/// Attribute fields stay as free text: the backend is the authority on their
/// vocabulary and older accounts may carry values this client doesn't know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "de_id_string")]
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub surf_level: Option<String>,
    #[serde(default)]
    pub goofy_regular_stance: Option<String>,
    #[serde(default)]
    pub preferred_wave_direction: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    /// Backend timestamp, kept as sent
    #[serde(default)]
    pub registration_timestamp: Option<String>,
}

impl UserProfile {
    /// Name if set, else email, else the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(deserialize_with = "de_id_string")]
    pub user_id: String,
}

/// `POST /register` body.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub surf_level: SurfLevel,
    pub goofy_regular_stance: Stance,
    pub preferred_wave_direction: String,
    pub bio: String,
    pub profile_picture_url: String,
}

impl Registration {
    /// A registration with the same defaults the sign-up form starts from.
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            surf_level: SurfLevel::Beginner,
            goofy_regular_stance: Stance::Regular,
            preferred_wave_direction: "north".to_string(),
            bio: String::new(),
            profile_picture_url: String::new(),
        }
    }
}

/// `PUT /profile/:id` body. Only fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surf_level: Option<SurfLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goofy_regular_stance: Option<Stance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_wave_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.surf_level.is_none()
            && self.goofy_regular_stance.is_none()
            && self.preferred_wave_direction.is_none()
            && self.bio.is_none()
            && self.profile_picture_url.is_none()
    }
}
