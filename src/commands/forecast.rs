use crate::commands::render::{render_chart, render_details};
use crate::commands::{App, ChartKind};
use crate::errors::AppError;
use crate::services::chart::{prepare_chart, ChartOptions, MetricSpec};
use crate::services::dashboard::ForecastBoard;
use crate::services::localize::SpotSeries;

/// How the forecast command draws each spot.
#[derive(Debug, Clone, Copy)]
pub struct ForecastView {
    pub chart: ChartKind,
    pub dividers: bool,
    pub details: bool,
}

impl ChartKind {
    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Wave => "Ondas",
            ChartKind::Wind => "Vento",
            ChartKind::Temperature => "Temperatura",
            ChartKind::Tide => "Maré",
        }
    }

    pub fn metrics(self) -> Vec<MetricSpec> {
        match self {
            ChartKind::Wave => vec![MetricSpec::wave_height()],
            ChartKind::Wind => vec![MetricSpec::wind_speed()],
            ChartKind::Temperature => {
                vec![MetricSpec::air_temperature(), MetricSpec::water_temperature()]
            }
            ChartKind::Tide => vec![MetricSpec::sea_level()],
        }
    }
}

pub async fn spots(app: &mut App) -> Result<String, AppError> {
    app.auth.require()?;
    let spots = app.auth.guard(app.api.spots().await)?;

    let mut out = String::new();
    if spots.is_empty() {
        out.push_str("Nenhum spot disponível.\n");
    }
    for spot in &spots {
        out.push_str(&format!("{:>4}  {}\n", spot.spot_id, spot.spot_name));
    }
    Ok(out)
}

fn render_series(series: &[SpotSeries], view: &ForecastView) -> String {
    let metrics = view.chart.metrics();
    let options = ChartOptions {
        day_dividers: view.dividers,
    };

    let mut out = String::new();
    if series.is_empty() {
        out.push_str("Nenhuma previsão encontrada para os spots selecionados.\n");
    }
    for spot in series {
        let model = prepare_chart(&spot.records, &metrics, options);
        let title = format!("{} · {}", spot.spot_name, view.chart.title());
        out.push_str(&render_chart(&title, &model));
        if view.details {
            out.push_str(&render_details(&model));
        }
        out.push('\n');
    }
    out
}

pub async fn forecast(
    app: &mut App,
    spot_ids: &[i64],
    day_offsets: &[u32],
    view: &ForecastView,
) -> Result<String, AppError> {
    app.auth.require()?;
    let board = ForecastBoard::new().with_cache(app.session.clone());
    let result = board.submit(&app.api, spot_ids, day_offsets).await;
    let series = app.auth.guard(result)?;

    match series {
        Some(series) => Ok(render_series(&series, view)),
        // only one submit per process; nothing can supersede it
        None => Ok(String::new()),
    }
}

/// Re-render the last forecast of this session without fetching.
pub fn last_forecast(app: &App, view: &ForecastView) -> Result<String, AppError> {
    app.auth.require()?;
    let board = ForecastBoard::new().with_cache(app.session.clone());
    match board.restore() {
        Some((selection, series)) => {
            tracing::debug!("Restored forecast for spots {:?}", selection.spot_ids);
            Ok(render_series(&series, view))
        }
        None => Ok("Nenhuma previsão salva nesta sessão.\n".to_string()),
    }
}
