use chrono::{Local, TimeZone};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::commands::App;
use crate::errors::AppError;
use crate::helpers::NOT_AVAILABLE;
use crate::models::profile::{ProfileUpdate, Registration, SurfLevel, UserProfile};
use crate::services::localize::parse_timestamp;

/// Use the password given on the command line or in the environment,
/// otherwise ask for it on the terminal.
pub async fn resolve_password(password: Option<String>) -> Result<String, AppError> {
    match password {
        Some(password) => Ok(password),
        None => {
            eprint!("Senha: ");
            read_password(BufReader::new(tokio::io::stdin())).await
        }
    }
}

async fn read_password<R: AsyncBufRead + Unpin>(mut reader: R) -> Result<String, AppError> {
    let mut line = String::new();
    if let Err(e) = reader.read_line(&mut line).await {
        tracing::warn!("Could not read password: {}", e);
        return Err(AppError::Validation("Não foi possível ler a senha.".to_string()));
    }
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(AppError::Validation("Informe a senha.".to_string()));
    }
    Ok(password.to_string())
}

pub async fn register(app: &App, registration: &Registration) -> Result<String, AppError> {
    let response = app.api.register(registration).await?;
    tracing::info!("Registered {}", registration.email);

    let message = response
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Cadastro realizado com sucesso!");
    Ok(format!("{}\nFaça login com `surfcast login`.\n", message))
}

pub async fn login(app: &mut App, email: &str, password: &str) -> Result<String, AppError> {
    let session = app.auth.login(&app.api, email, password).await?;
    Ok(format!("Boas-vindas, {}!\n", session.profile.display_name()))
}

pub fn logout(app: &mut App) -> String {
    app.auth.logout();
    "Sessão encerrada.\n".to_string()
}

pub fn whoami(app: &App) -> String {
    match app.auth.session() {
        Some(session) => format!(
            "{} (id {})\n",
            session.profile.display_name(),
            session.user_id()
        ),
        None => "Não autenticado.\n".to_string(),
    }
}

fn field(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(NOT_AVAILABLE)
}

fn format_registered<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    match parse_timestamp(raw) {
        Some(at) => at.with_timezone(tz).format("%d/%m/%Y, %H:%M:%S").to_string(),
        None => raw.to_string(),
    }
}

fn render_profile(profile: &UserProfile) -> String {
    let level = profile
        .surf_level
        .as_deref()
        .and_then(|l| l.parse::<SurfLevel>().ok())
        .map(|l| l.display_label());

    let mut out = String::new();
    out.push_str(&format!("Nome: {}\n", field(profile.name.as_deref())));
    out.push_str(&format!("Email: {}\n", field(profile.email.as_deref())));
    out.push_str(&format!(
        "Nível: {}\n",
        field(level.or(profile.surf_level.as_deref()))
    ));
    out.push_str(&format!("Base: {}\n", field(profile.goofy_regular_stance.as_deref())));
    out.push_str(&format!(
        "Direção de onda preferida: {}\n",
        field(profile.preferred_wave_direction.as_deref())
    ));
    out.push_str(&format!("Bio: {}\n", field(profile.bio.as_deref())));
    out.push_str(&format!(
        "Foto de Perfil: {}\n",
        field(profile.profile_picture_url.as_deref())
    ));
    out.push_str(&format!(
        "Registrado em: {}\n",
        format_registered(profile.registration_timestamp.as_deref(), &Local)
    ));
    out
}

pub async fn show_profile(app: &mut App) -> Result<String, AppError> {
    let profile = app.auth.refresh_profile(&app.api).await?;
    Ok(render_profile(profile))
}

pub async fn update_profile(app: &mut App, update: &ProfileUpdate) -> Result<String, AppError> {
    if update.is_empty() {
        return Err(AppError::Validation("Nenhum campo para atualizar.".to_string()));
    }
    let profile = app.auth.update_profile(&app.api, update).await?;
    Ok(format!("Perfil atualizado.\n{}", render_profile(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{execute, testing, Command};
    use crate::models::profile::Stance;
    use crate::storage::KeyValueStore;
    use chrono::Utc;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok", "user_id": "5"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5, "name": "Caio", "email": "caio@example.com",
                "surf_level": "maroleiro", "goofy_regular_stance": "goofy",
                "profile_picture_url": "https://img.example.com/caio.png",
                "registration_timestamp": "2024-03-10T15:04:05Z"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_register_sends_form_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(body_json(json!({
                "name": "Caio", "email": "caio@example.com", "password": "pw",
                "surf_level": "beginner", "goofy_regular_stance": "regular",
                "preferred_wave_direction": "north", "bio": "", "profile_picture_url": ""
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Usuário criado"})))
            .mount(&server)
            .await;
        let (app, _, _) = testing::app(&server.uri());

        let registration = Registration::new("Caio", "caio@example.com", "pw");
        let out = assert_ok!(register(&app, &registration).await);
        assert!(out.starts_with("Usuário criado"));
    }

    #[tokio::test]
    async fn test_register_flags_override_form_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(body_json(json!({
                "name": "Caio", "email": "caio@example.com", "password": "pw",
                "surf_level": "expert", "goofy_regular_stance": "goofy",
                "preferred_wave_direction": "south", "bio": "Longboard",
                "profile_picture_url": "https://img.example.com/caio.png"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, _, _) = testing::app(&server.uri());

        let command = Command::Register {
            name: "Caio".to_string(),
            email: "caio@example.com".to_string(),
            password: Some("pw".to_string()),
            surf_level: Some(SurfLevel::Expert),
            stance: Some(Stance::Goofy),
            wave_direction: Some("south".to_string()),
            bio: Some("Longboard".to_string()),
            picture_url: Some("https://img.example.com/caio.png".to_string()),
        };
        let out = assert_ok!(execute(&mut app, command).await);
        assert!(out.starts_with("Cadastro realizado com sucesso!"));
    }

    #[tokio::test]
    async fn test_read_password_from_input() {
        let password = assert_ok!(read_password(&b"segredo\r\n"[..]).await);
        assert_eq!(password, "segredo");

        let err = assert_err!(read_password(&b"\n"[..]).await);
        assert_eq!(err.user_message(), "Informe a senha.");
        let err = assert_err!(read_password(&b""[..]).await);
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_password_prefers_given_value() {
        let password = assert_ok!(resolve_password(Some("pw".to_string())).await);
        assert_eq!(password, "pw");
    }

    #[test]
    fn test_format_registered() {
        assert_eq!(
            format_registered(Some("2024-03-10T15:04:05Z"), &Utc),
            "10/03/2024, 15:04:05"
        );
        assert_eq!(
            format_registered(Some("Sun, 10 Mar 2024 15:04:05 GMT"), &Utc),
            "10/03/2024, 15:04:05"
        );
        assert_eq!(format_registered(Some("ontem"), &Utc), "ontem");
        assert_eq!(format_registered(None, &Utc), "N/A");
    }

    #[tokio::test]
    async fn test_register_conflict_shows_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "Email já cadastrado"})))
            .mount(&server)
            .await;
        let (app, _, _) = testing::app(&server.uri());

        let registration = Registration::new("Caio", "caio@example.com", "pw");
        let err = assert_err!(register(&app, &registration).await);
        assert_eq!(err.user_message(), "Email já cadastrado");
    }

    #[tokio::test]
    async fn test_login_whoami_logout() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (mut app, local, _) = testing::app(&server.uri());

        assert_eq!(whoami(&app), "Não autenticado.\n");
        let out = assert_ok!(login(&mut app, "caio@example.com", "pw").await);
        assert_eq!(out, "Boas-vindas, Caio!\n");
        assert_eq!(whoami(&app), "Caio (id 5)\n");

        logout(&mut app);
        assert_eq!(whoami(&app), "Não autenticado.\n");
        assert_eq!(local.get("jwt").unwrap(), None);
    }

    #[tokio::test]
    async fn test_show_profile_requires_login() {
        let server = MockServer::start().await;
        let (mut app, _, _) = testing::app(&server.uri());
        let err = assert_err!(show_profile(&mut app).await);
        assert!(matches!(err, AppError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_show_profile_labels() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (mut app, _, _) = testing::app(&server.uri());
        login(&mut app, "caio@example.com", "pw").await.unwrap();

        let out = show_profile(&mut app).await.unwrap();
        assert!(out.contains("Nome: Caio"));
        assert!(out.contains("Nível: Maroleiro"));
        assert!(out.contains("Base: goofy"));
        assert!(out.contains("Bio: N/A"));
        assert!(out.contains("Foto de Perfil: https://img.example.com/caio.png"));
        assert!(out.contains("Registrado em: "));
        assert!(!out.contains("Registrado em: N/A"));
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected_locally() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (mut app, _, _) = testing::app(&server.uri());
        login(&mut app, "caio@example.com", "pw").await.unwrap();
        let before = server.received_requests().await.unwrap().len();

        let err = assert_err!(update_profile(&mut app, &ProfileUpdate::default()).await);
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), before);
    }
}
