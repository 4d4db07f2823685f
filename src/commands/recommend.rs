use std::collections::HashMap;

use chrono::{Local, NaiveDate};

use crate::commands::render::render_days;
use crate::commands::App;
use crate::errors::AppError;
use crate::models::preset::{NewPreset, Preset};
use crate::services::dashboard::load_home_feed;
use crate::services::query::{RecommendationQuery, TimeOfDay};
use crate::services::recommendations::group_by_day;
use crate::storage::session_cache::{preset_name_key, recommendations_key};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn join_days(days: &[u32]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub async fn recommend(
    app: &mut App,
    spot_ids: Vec<i64>,
    day: Option<u32>,
    days: &[u32],
    start: &str,
    end: &str,
    expanded: bool,
) -> Result<String, AppError> {
    let user_id = app.auth.require()?.user_id().to_string();
    let query = RecommendationQuery::new(spot_ids, start, end)?;

    let result = match (day, days) {
        (Some(day), _) => app.api.recommendations_for_day(&user_id, &query, day).await,
        (None, []) => app.api.recommendations_for_day(&user_id, &query, 0).await,
        (None, days) => app.api.recommendations_for_days(&user_id, &query, days).await,
    };
    let recommendations = app.auth.guard(result)?;

    if recommendations.is_empty() {
        return Ok("Nenhuma recomendação encontrada para os critérios selecionados.\n".to_string());
    }
    Ok(render_days(&group_by_day(&recommendations), today(), expanded))
}

fn render_preset(preset: &Preset, spot_names: &HashMap<i64, String>) -> String {
    let spots: Vec<String> = preset
        .spot_ids
        .iter()
        .map(|id| spot_names.get(id).cloned().unwrap_or_else(|| format!("#{}", id)))
        .collect();
    let window = match (
        preset.start_time.parse::<TimeOfDay>(),
        preset.end_time.parse::<TimeOfDay>(),
    ) {
        (Ok(start), Ok(end)) => format!("{}-{}", start, end),
        _ => format!("{}-{}", preset.start_time, preset.end_time),
    };

    format!(
        "{}{}  {}  dias [{}]  {}\n",
        preset.preset_name,
        if preset.is_default { " (padrão)" } else { "" },
        window,
        join_days(&preset.day_offset_default),
        spots.join(", ")
    )
}

pub async fn list_presets(app: &mut App) -> Result<String, AppError> {
    let user_id = app.auth.require()?.user_id().to_string();

    let (spots, presets) = futures::join!(app.api.spots(), app.api.presets(&user_id));
    let presets = app.auth.guard(presets)?;
    let spot_names: HashMap<i64, String> = match spots {
        Ok(spots) => spots.into_iter().map(|s| (s.spot_id, s.spot_name)).collect(),
        Err(e) => {
            tracing::warn!("Spot names unavailable, showing ids: {}", e);
            HashMap::new()
        }
    };

    if presets.is_empty() {
        return Ok("Nenhum preset salvo. Crie um com `surfcast presets create`.\n".to_string());
    }
    Ok(presets
        .iter()
        .map(|p| render_preset(p, &spot_names))
        .collect())
}

pub async fn create_preset(
    app: &mut App,
    name: &str,
    spot_ids: &[i64],
    start: &str,
    end: &str,
    days: &[u32],
    is_default: bool,
) -> Result<String, AppError> {
    let user_id = app.auth.require()?.user_id().to_string();

    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Dê um nome ao preset.".to_string()));
    }
    let query = RecommendationQuery::new(spot_ids.to_vec(), start, end)?;
    let start: TimeOfDay = query.start_time().parse()?;
    let end: TimeOfDay = query.end_time().parse()?;
    let days: &[u32] = if days.is_empty() { &[0] } else { days };

    let (start_time, end_time) = (start.with_seconds(), end.with_seconds());
    let preset = NewPreset {
        user_id: &user_id,
        preset_name: name,
        spot_ids: &query.spot_ids,
        start_time: &start_time,
        end_time: &end_time,
        day_offset_default: days,
        is_default,
    };
    let created = app.auth.guard(app.api.create_preset(&preset).await)?;
    tracing::info!("Created preset '{}' ({:?})", name, created);

    if is_default {
        // the home feed was built from the previous default
        for key in [recommendations_key(&user_id), preset_name_key(&user_id)] {
            if let Err(e) = app.session.clear(&key) {
                tracing::warn!("Failed to clear '{}': {}", key, e);
            }
        }
    }

    Ok(match created {
        Some(id) => format!("Preset '{}' criado (id {}).\n", name, id),
        None => format!("Preset '{}' criado.\n", name),
    })
}

pub async fn home(app: &mut App, reload: bool) -> Result<String, AppError> {
    let session = app.auth.require()?;
    let user_id = session.user_id().to_string();
    let display_name = session.profile.display_name().to_string();

    let result = load_home_feed(&app.api, &app.session, &user_id, reload).await;
    let feed = app.auth.guard(result)?;

    let mut out = String::new();
    out.push_str(&format!("Boas-vindas, {}!\n", display_name));
    out.push_str(&format!(
        "Aqui estão suas recomendações baseadas no preset: {}\n",
        feed.preset_name
    ));
    if feed.from_cache {
        out.push_str("(salvas nesta sessão; use --reload para atualizar)\n");
    }
    out.push('\n');

    if feed.recommendations.is_empty() {
        out.push_str(
            "Nenhuma recomendação encontrada para o seu preset padrão. \
             Tente ajustar suas configurações de preset.\n",
        );
    } else {
        out.push_str(&render_days(&feed.days(), today(), true));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::storage::KeyValueStore;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn logged_in(server: &MockServer) -> (App, Arc<crate::storage::MemoryStore>) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok", "user_id": 3})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": 3, "name": "Rui"})))
            .mount(server)
            .await;
        let (mut app, _, session) = testing::app(&server.uri());
        app.auth.login(&app.api, "rui@example.com", "pw").await.unwrap();
        (app, session)
    }

    fn body() -> serde_json::Value {
        json!({"recommendations_by_spot": [[
            {"spot_id": 1, "spot_name": "Itamambuca", "day_offset": 0,
             "recommendations": [{"suitability_score": 0.61, "local_time": "2024-06-01T08:00:00-03:00"}]}
        ]]})
    }

    #[tokio::test]
    async fn test_recommend_single_day_sends_integer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommendations"))
            .and(body_json(json!({
                "user_id": 3, "spot_ids": [1], "day_offset": 2,
                "start_time": "05:30", "end_time": "09:00"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, _) = logged_in(&server).await;

        let out = assert_ok!(recommend(&mut app, vec![1], Some(2), &[], "05:30", "09:00:00", true).await);
        assert!(out.contains("Itamambuca: Bom (61)"));
        assert!(out.contains("08:00  61  Bom"));
    }

    #[tokio::test]
    async fn test_recommend_multi_day_sends_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommendations"))
            .and(body_json(json!({
                "user_id": 3, "spot_ids": [1, 2], "day_offset": [0, 1],
                "start_time": "06:00", "end_time": "18:00"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"recommendations_by_spot": []})))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, _) = logged_in(&server).await;

        let out = recommend(&mut app, vec![1, 2], None, &[0, 1], "06:00", "18:00", false)
            .await
            .unwrap();
        assert!(out.starts_with("Nenhuma recomendação encontrada"));
    }

    #[tokio::test]
    async fn test_recommend_validates_before_sending() {
        let server = MockServer::start().await;
        let (mut app, _) = logged_in(&server).await;
        let before = server.received_requests().await.unwrap().len();

        let err = assert_err!(recommend(&mut app, vec![], None, &[], "06:00", "18:00", true).await);
        assert_eq!(err.user_message(), "Selecione pelo menos um spot.");
        let err = assert_err!(recommend(&mut app, vec![1], None, &[], "6h", "18:00", true).await);
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn test_list_presets_with_spot_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"spot_id": 1, "spot_name": "Itamambuca"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presets"))
            .and(query_param("user_id", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"preset_id": 9, "preset_name": "Manhã", "spot_ids": [1, 5],
                 "start_time": "06:00:00", "end_time": "10:00:00",
                 "day_offset_default": [0, 1], "is_default": true}
            ])))
            .mount(&server)
            .await;
        let (mut app, _) = logged_in(&server).await;

        let out = list_presets(&mut app).await.unwrap();
        assert_eq!(out, "Manhã (padrão)  06:00-10:00  dias [0,1]  Itamambuca, #5\n");
    }

    #[tokio::test]
    async fn test_list_presets_survives_spot_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spots"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"preset_name": "Tarde", "spot_ids": [2], "start_time": "14:00", "end_time": "17:00"}
            ])))
            .mount(&server)
            .await;
        let (mut app, _) = logged_in(&server).await;

        let out = list_presets(&mut app).await.unwrap();
        assert_eq!(out, "Tarde  14:00-17:00  dias []  #2\n");
    }

    #[tokio::test]
    async fn test_create_default_preset_sends_seconds_and_drops_home_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/presets"))
            .and(body_json(json!({
                "user_id": 3, "preset_name": "Cedo", "spot_ids": [1],
                "start_time": "08:00:00", "end_time": "12:00:00",
                "day_offset_default": [0], "is_default": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"preset_id": 11})))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, session) = logged_in(&server).await;
        app.session.save(&recommendations_key("3"), &json!([])).unwrap();
        app.session.save(&preset_name_key("3"), "Antigo").unwrap();

        let out = create_preset(&mut app, " Cedo ", &[1], "08:00", "12:00", &[], true)
            .await
            .unwrap();
        assert_eq!(out, "Preset 'Cedo' criado (id 11).\n");
        assert_eq!(session.get(&preset_name_key("3")).unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_preset_requires_name() {
        let server = MockServer::start().await;
        let (mut app, _) = logged_in(&server).await;
        let err = assert_err!(create_preset(&mut app, "  ", &[1], "08:00", "12:00", &[0], false).await);
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_home_greets_and_lists_days() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presets/default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "preset_id": 4, "preset_name": "Manhã", "spot_ids": [1],
                "start_time": "06:00", "end_time": "10:00", "day_offset_default": [0]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/recommendations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, _) = logged_in(&server).await;

        let first = home(&mut app, false).await.unwrap();
        assert!(first.starts_with("Boas-vindas, Rui!\nAqui estão suas recomendações baseadas no preset: Manhã\n"));
        assert!(first.contains("Itamambuca"));
        assert!(!first.contains("salvas nesta sessão"));

        let second = home(&mut app, false).await.unwrap();
        assert!(second.contains("salvas nesta sessão"));
    }

    #[tokio::test]
    async fn test_home_without_default_preset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presets/default"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let (mut app, _) = logged_in(&server).await;

        let err = assert_err!(home(&mut app, false).await);
        assert!(matches!(err, AppError::NoDefaultPreset));
        assert!(app.auth.session().is_some());
    }
}
