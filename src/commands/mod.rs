//! Command implementations for the surfcast CLI.
//!
//! Each subcommand returns the text it wants printed; `run` prints it.

use std::sync::Arc;

use clap::{Subcommand, ValueEnum};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::profile::{ProfileUpdate, Registration, Stance, SurfLevel};
use crate::services::api::ApiClient;
use crate::services::auth::AuthHolder;
use crate::storage::{FileStore, KeyValueStore, SessionCache};

pub mod account;
pub mod forecast;
pub mod recommend;
pub mod render;

/// Which chart `forecast` draws per spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    Wave,
    Wind,
    Temperature,
    Tide,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,

        /// Asked for on the terminal when neither this nor the env var is set
        #[arg(long, env = "SURFCAST_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// beginner, maroleiro, intermediate or expert (default beginner)
        #[arg(long)]
        surf_level: Option<SurfLevel>,

        /// goofy or regular (default regular)
        #[arg(long)]
        stance: Option<Stance>,

        /// Preferred wave direction (default north)
        #[arg(long)]
        wave_direction: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        picture_url: Option<String>,
    },

    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,

        /// Asked for on the terminal when neither this nor the env var is set
        #[arg(long, env = "SURFCAST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Show or edit the surfer profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// List the available surf spots
    Spots,

    /// Forecast charts for one or more spots
    Forecast {
        /// Spot ids, comma separated
        #[arg(long, value_delimiter = ',')]
        spots: Vec<i64>,

        /// Day offsets, comma separated (0 = today)
        #[arg(long, value_delimiter = ',', default_value = "0")]
        days: Vec<u32>,

        #[arg(long, value_enum, default_value_t = ChartKind::Wave)]
        chart: ChartKind,

        /// Insert a blank slot between days
        #[arg(long)]
        dividers: bool,

        /// Print the full reading for every hour
        #[arg(long)]
        details: bool,

        /// Show the last forecast of this session without fetching
        #[arg(long, conflicts_with_all = ["spots", "days"])]
        last: bool,
    },

    /// Ranked surf recommendations for a time window
    Recommend {
        /// Spot ids, comma separated
        #[arg(long, value_delimiter = ',')]
        spots: Vec<i64>,

        /// A single day offset
        #[arg(long, conflicts_with = "days")]
        day: Option<u32>,

        /// Several day offsets, comma separated
        #[arg(long, value_delimiter = ',')]
        days: Vec<u32>,

        /// Window start, HH:MM
        #[arg(long, default_value = "06:00")]
        start: String,

        /// Window end, HH:MM
        #[arg(long, default_value = "18:00")]
        end: String,

        /// Only the per-spot summary, without the hourly cards
        #[arg(long)]
        brief: bool,
    },

    /// Manage saved recommendation presets
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Recommendations from the default preset
    Home {
        /// Ignore the session cache and fetch again
        #[arg(long)]
        reload: bool,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Fetch and print the profile
    Show,

    /// Change profile fields; unset flags are left as they are
    Update {
        #[arg(long)]
        name: Option<String>,

        /// beginner, maroleiro, intermediate or expert
        #[arg(long)]
        surf_level: Option<SurfLevel>,

        /// goofy or regular
        #[arg(long)]
        stance: Option<Stance>,

        #[arg(long)]
        wave_direction: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        picture_url: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List,

    /// Save a new preset
    Create {
        #[arg(long)]
        name: String,

        /// Spot ids, comma separated
        #[arg(long, value_delimiter = ',')]
        spots: Vec<i64>,

        #[arg(long, default_value = "08:00")]
        start: String,

        #[arg(long, default_value = "12:00")]
        end: String,

        /// Day offsets, comma separated
        #[arg(long, value_delimiter = ',', default_value = "0")]
        days: Vec<u32>,

        /// Make this the default preset used by `home`
        #[arg(long)]
        default: bool,
    },
}

/// Everything a command needs: the API client, the auth holder and the
/// session cache, all sharing the same stores.
pub struct App {
    pub api: ApiClient,
    pub auth: AuthHolder,
    pub session: SessionCache,
}

impl App {
    /// Open the on-disk stores named by `config`.
    pub fn open(config: &AppConfig) -> Result<Self, AppError> {
        let local = Arc::new(FileStore::open(config.local_store_path())?);
        let session = Arc::new(FileStore::open(config.session_store_path())?);
        Self::with_stores(config, local, session)
    }

    pub fn with_stores(
        config: &AppConfig,
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AppError> {
        let api = ApiClient::new(&config.api_url, config.http_timeout, local.clone())?;
        let session = SessionCache::new(session);
        let auth = AuthHolder::new(local).with_session_cache(session.clone());
        Ok(Self { api, auth, session })
    }

    /// Restore any persisted login.
    pub async fn start(&mut self) {
        self.auth.rehydrate(&self.api).await;
    }
}

/// Run one command and return its output.
pub async fn execute(app: &mut App, command: Command) -> Result<String, AppError> {
    match command {
        Command::Register {
            name,
            email,
            password,
            surf_level,
            stance,
            wave_direction,
            bio,
            picture_url,
        } => {
            let password = account::resolve_password(password).await?;
            let form = Registration::new(&name, &email, &password);
            let registration = Registration {
                surf_level: surf_level.unwrap_or(form.surf_level),
                goofy_regular_stance: stance.unwrap_or(form.goofy_regular_stance),
                preferred_wave_direction: wave_direction.unwrap_or(form.preferred_wave_direction),
                bio: bio.unwrap_or(form.bio),
                profile_picture_url: picture_url.unwrap_or(form.profile_picture_url),
                ..form
            };
            account::register(app, &registration).await
        }
        Command::Login { email, password } => {
            let password = account::resolve_password(password).await?;
            account::login(app, &email, &password).await
        }
        Command::Logout => Ok(account::logout(app)),
        Command::Whoami => Ok(account::whoami(app)),
        Command::Profile { action } => match action {
            ProfileAction::Show => account::show_profile(app).await,
            ProfileAction::Update {
                name,
                surf_level,
                stance,
                wave_direction,
                bio,
                picture_url,
            } => {
                let update = ProfileUpdate {
                    name,
                    surf_level,
                    goofy_regular_stance: stance,
                    preferred_wave_direction: wave_direction,
                    bio,
                    profile_picture_url: picture_url,
                };
                account::update_profile(app, &update).await
            }
        },
        Command::Spots => forecast::spots(app).await,
        Command::Forecast {
            spots,
            days,
            chart,
            dividers,
            details,
            last,
        } => {
            let view = forecast::ForecastView {
                chart,
                dividers,
                details,
            };
            if last {
                forecast::last_forecast(app, &view)
            } else {
                forecast::forecast(app, &spots, &days, &view).await
            }
        }
        Command::Recommend {
            spots,
            day,
            days,
            start,
            end,
            brief,
        } => recommend::recommend(app, spots, day, &days, &start, &end, !brief).await,
        Command::Presets { action } => match action {
            PresetAction::List => recommend::list_presets(app).await,
            PresetAction::Create {
                name,
                spots,
                start,
                end,
                days,
                default,
            } => recommend::create_preset(app, &name, &spots, &start, &end, &days, default).await,
        },
        Command::Home { reload } => recommend::home(app, reload).await,
    }
}

pub async fn run(app: &mut App, command: Command) -> Result<(), AppError> {
    let output = execute(app, command).await?;
    print!("{}", output);
    Ok(())
}
