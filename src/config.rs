use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_STATE_DIR: &str = "./.surfcast";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend base URL
    pub api_url: String,
    /// Directory holding the persisted and session stores.
    pub state_dir: PathBuf,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs = match lookup("SURFCAST_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "SURFCAST_HTTP_TIMEOUT_SECS '{}' is not a number, using {}",
                    raw,
                    DEFAULT_HTTP_TIMEOUT_SECS
                );
                DEFAULT_HTTP_TIMEOUT_SECS
            }),
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Self {
            api_url: lookup("SURFCAST_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            state_dir: PathBuf::from(
                lookup("SURFCAST_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()),
            ),
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Long-lived store: credential and profile.
    pub fn local_store_path(&self) -> PathBuf {
        self.state_dir.join("local.json")
    }

    /// Session store: cached queries and results, wiped on logout.
    pub fn session_store_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }
}
