//! View-level flows that combine the API client with the session cache.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::recommendation::Recommendation;
use crate::services::api::ApiClient;
use crate::services::localize::{group_by_spot, SpotSeries};
use crate::services::query::{validate_spot_selection, RecommendationQuery};
use crate::services::recommendations::{group_by_day, DayGroup};
use crate::services::request::{Latest, RequestGate};
use crate::storage::session_cache::{
    preset_name_key, recommendations_key, FORECAST_RESULTS_KEY, FORECAST_SELECTION_KEY,
};
use crate::storage::SessionCache;

/// Recommendations built from the user's default preset.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeFeed {
    pub preset_name: String,
    pub recommendations: Vec<Recommendation>,
    /// Served from the session cache without a network call
    pub from_cache: bool,
}

impl HomeFeed {
    pub fn days(&self) -> Vec<DayGroup> {
        group_by_day(&self.recommendations)
    }
}

fn forget_home_feed(cache: &SessionCache, user_id: &str) {
    for key in [recommendations_key(user_id), preset_name_key(user_id)] {
        if let Err(e) = cache.clear(&key) {
            tracing::warn!("Failed to clear '{}': {}", key, e);
        }
    }
}

/// Load the home feed, cache-first unless `reload` is set.
///
/// Any failure leaves no cached feed behind for this user.
pub async fn load_home_feed(
    api: &ApiClient,
    cache: &SessionCache,
    user_id: &str,
    reload: bool,
) -> Result<HomeFeed, AppError> {
    if reload {
        forget_home_feed(cache, user_id);
    } else {
        let recommendations = cache.load::<Vec<Recommendation>>(&recommendations_key(user_id));
        let preset_name = cache.load::<String>(&preset_name_key(user_id));
        if let (Some(recommendations), Some(preset_name)) = (recommendations, preset_name) {
            tracing::debug!("Home feed for user {} served from session cache", user_id);
            return Ok(HomeFeed {
                preset_name,
                recommendations,
                from_cache: true,
            });
        }
    }

    match fetch_home_feed(api, cache, user_id).await {
        Ok(feed) => Ok(feed),
        Err(e) => {
            forget_home_feed(cache, user_id);
            Err(e)
        }
    }
}

async fn fetch_home_feed(
    api: &ApiClient,
    cache: &SessionCache,
    user_id: &str,
) -> Result<HomeFeed, AppError> {
    let preset = api
        .default_preset(user_id)
        .await?
        .ok_or(AppError::NoDefaultPreset)?;

    let query = RecommendationQuery::from_preset(&preset)?;
    let days = if preset.day_offset_default.is_empty() {
        vec![0]
    } else {
        preset.day_offset_default.clone()
    };

    let recommendations = api.recommendations_for_days(user_id, &query, &days).await?;
    tracing::info!(
        "Loaded {} recommendations from preset '{}'",
        recommendations.len(),
        preset.preset_name
    );

    cache.save(&recommendations_key(user_id), &recommendations)?;
    cache.save(&preset_name_key(user_id), &preset.preset_name)?;

    Ok(HomeFeed {
        preset_name: preset.preset_name,
        recommendations,
        from_cache: false,
    })
}

/// The last forecast query, kept so the view can be restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSelection {
    pub spot_ids: Vec<i64>,
    pub day_offsets: Vec<u32>,
}

/// Forecast view state: the per-spot series currently on display.
///
/// Overlapping submits resolve to whichever was started last.
pub struct ForecastBoard {
    displayed: Latest<Vec<SpotSeries>>,
    cache: Option<SessionCache>,
}

impl Default for ForecastBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastBoard {
    pub fn new() -> Self {
        Self {
            displayed: Latest::new(Arc::new(RequestGate::new())),
            cache: None,
        }
    }

    /// Remember the selection and results in this session cache.
    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn displayed(&self) -> Option<Vec<SpotSeries>> {
        self.displayed.get()
    }

    /// Last selection and results saved in the session, if any.
    pub fn restore(&self) -> Option<(ForecastSelection, Vec<SpotSeries>)> {
        let cache = self.cache.as_ref()?;
        let selection = cache.load(FORECAST_SELECTION_KEY)?;
        let results = cache.load(FORECAST_RESULTS_KEY)?;
        Some((selection, results))
    }

    /// Fetch forecasts for a selection and display them.
    ///
    /// Returns `Ok(None)` when a newer submit started while this one was in
    /// flight; its results are dropped.
    pub async fn submit(
        &self,
        api: &ApiClient,
        spot_ids: &[i64],
        day_offsets: &[u32],
    ) -> Result<Option<Vec<SpotSeries>>, AppError> {
        validate_spot_selection(spot_ids)?;

        let ticket = self.displayed.begin();
        let records = api.forecasts(spot_ids, day_offsets).await?;
        let series = group_by_spot(records);

        if !self.displayed.commit(ticket, series.clone()) {
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            let selection = ForecastSelection {
                spot_ids: spot_ids.to_vec(),
                day_offsets: day_offsets.to_vec(),
            };
            cache.save(FORECAST_SELECTION_KEY, &selection)?;
            cache.save(FORECAST_RESULTS_KEY, &series)?;
        }
        Ok(Some(series))
    }
}
