//! Authentication state.
//!
//! `AuthHolder` is the single owner of the signed-in identity. It persists the
//! bearer token (`jwt`) and the full profile (`user`) in the long-lived store
//! and rebuilds itself from them on start. Any inconsistency found while
//! rehydrating purges both keys rather than guessing.
//!
//! States: `Loading` → `Unauthenticated` | `Authenticated`. Only `login`,
//! `logout`, and full profile refreshes/updates change the session.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::profile::{ProfileUpdate, UserProfile};
use crate::services::api::{ApiClient, TOKEN_KEY};
use crate::storage::{KeyValueStore, SessionCache};

/// Store key holding the serialized profile.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub profile: UserProfile,
    pub token: String,
}

impl AuthSession {
    pub fn user_id(&self) -> &str {
        &self.profile.user_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Loading,
    Unauthenticated,
    Authenticated(AuthSession),
}

pub struct AuthHolder {
    store: Arc<dyn KeyValueStore>,
    session_cache: Option<SessionCache>,
    state: AuthState,
}

impl AuthHolder {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            session_cache: None,
            state: AuthState::Loading,
        }
    }

    /// Also wipe this session cache whenever the user is logged out.
    pub fn with_session_cache(mut self, cache: SessionCache) -> Self {
        self.session_cache = Some(cache);
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// The signed-in session, or `NotAuthenticated`.
    pub fn require(&self) -> Result<&AuthSession, AppError> {
        self.session().ok_or(AppError::NotAuthenticated)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("Could not read '{}' from store: {}", key, e);
                None
            }
        }
    }

    /// Drop persisted credentials and session data; always ends `Unauthenticated`.
    fn purge(&mut self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Failed to remove '{}' from store: {}", key, e);
            }
        }
        self.clear_session_cache();
        self.state = AuthState::Unauthenticated;
    }

    fn clear_session_cache(&self) {
        if let Some(cache) = &self.session_cache {
            if let Err(e) = cache.clear_all() {
                tracing::warn!("Failed to clear session cache: {}", e);
            }
        }
    }

    fn persist_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let json = serde_json::to_string(profile)
            .map_err(|e| AppError::DataShape(format!("profile could not be encoded: {}", e)))?;
        self.store.set(USER_KEY, &json)?;
        Ok(())
    }

    fn stored_user_id(&self) -> Option<String> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Some(profile.user_id),
            Err(e) => {
                tracing::warn!("Stored user record is unusable: {}", e);
                None
            }
        }
    }

    /// Rebuild the session from the persisted store.
    pub async fn rehydrate(&mut self, api: &ApiClient) -> &AuthState {
        let token = self.read(TOKEN_KEY);
        let has_user = self.read(USER_KEY).is_some();

        let (token, user_id) = match (token, has_user) {
            (None, false) => {
                self.state = AuthState::Unauthenticated;
                return &self.state;
            }
            (Some(token), true) => match self.stored_user_id() {
                Some(user_id) => (token, user_id),
                None => {
                    self.purge();
                    return &self.state;
                }
            },
            _ => {
                tracing::warn!("Partial credentials in store, clearing");
                self.purge();
                return &self.state;
            }
        };

        match api.profile(&user_id).await {
            Ok(profile) => {
                if let Err(e) = self.persist_profile(&profile) {
                    tracing::warn!("Could not re-persist profile: {}", e);
                }
                tracing::info!("Session restored for user {}", profile.user_id);
                self.state = AuthState::Authenticated(AuthSession { profile, token });
            }
            Err(e) => {
                tracing::warn!("Could not restore session for user {}: {}", user_id, e);
                self.purge();
            }
        }
        &self.state
    }

    /// Log in and load the full profile.
    ///
    /// On any failure the holder is left `Unauthenticated` with nothing
    /// persisted, and the error is returned.
    pub async fn login(
        &mut self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> Result<&AuthSession, AppError> {
        let previous = self.session().map(|s| s.user_id().to_string());
        match self.try_login(api, email, password).await {
            Ok(session) => {
                tracing::info!("Logged in as user {}", session.user_id());
                // cached forecasts are not keyed by user
                if previous.as_deref() != Some(session.user_id()) {
                    self.clear_session_cache();
                }
                self.state = AuthState::Authenticated(session);
                self.require()
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.purge();
                Err(e)
            }
        }
    }

    async fn try_login(
        &self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let login = api.login(email, password).await?;
        self.store.set(TOKEN_KEY, &login.token)?;
        let profile = api.profile(&login.user_id).await?;
        self.persist_profile(&profile)?;
        Ok(AuthSession {
            profile,
            token: login.token,
        })
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session() {
            tracing::info!("Logging out user {}", session.user_id());
        }
        self.purge();
    }

    fn replace_profile(&mut self, profile: UserProfile) -> Result<&UserProfile, AppError> {
        self.persist_profile(&profile)?;
        match &mut self.state {
            AuthState::Authenticated(session) => {
                session.profile = profile;
                Ok(&session.profile)
            }
            _ => Err(AppError::NotAuthenticated),
        }
    }

    /// Re-fetch the profile and replace the stored one wholesale.
    pub async fn refresh_profile(&mut self, api: &ApiClient) -> Result<&UserProfile, AppError> {
        let user_id = self.require()?.user_id().to_string();
        let profile = self.guard(api.profile(&user_id).await)?;
        tracing::info!("Profile refreshed for user {}", user_id);
        self.replace_profile(profile)
    }

    /// Send a profile update and adopt the server's version of the profile.
    pub async fn update_profile(
        &mut self,
        api: &ApiClient,
        update: &ProfileUpdate,
    ) -> Result<&UserProfile, AppError> {
        let user_id = self.require()?.user_id().to_string();
        let profile = self.guard(api.update_profile(&user_id, update).await)?;
        tracing::info!("Profile updated for user {}", user_id);
        self.replace_profile(profile)
    }

    /// Log out when `result` says the credential was rejected.
    pub fn guard<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                tracing::warn!("Credential rejected by backend, logging out");
                self.logout();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::session_cache::{FORECAST_RESULTS_KEY, FORECAST_SELECTION_KEY};
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn setup(server: &MockServer) -> (Arc<MemoryStore>, ApiClient) {
        let store = Arc::new(MemoryStore::new());
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5), store.clone()).unwrap();
        (store, api)
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"email": "ana@example.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-7", "user_id": 7})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/7"))
            .and(header("Authorization", "Bearer tok-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": 7, "name": "Ana", "email": "ana@example.com", "surf_level": "intermediate"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let holder = AuthHolder::new(Arc::new(MemoryStore::new()));
        assert_eq!(holder.state(), &AuthState::Loading);
        assert!(matches!(holder.require(), Err(AppError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_login_then_reload_restores_profile() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (store, api) = setup(&server);

        let mut holder = AuthHolder::new(store.clone());
        let session = holder.login(&api, "ana@example.com", "pw").await.unwrap().clone();
        assert_eq!(session.profile.name.as_deref(), Some("Ana"));
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-7"));

        // simulated restart: fresh holder, same store
        let mut reloaded = AuthHolder::new(store.clone());
        let state = reloaded.rehydrate(&api).await;
        assert_eq!(state, &AuthState::Authenticated(session));
    }

    #[tokio::test]
    async fn test_rehydrate_empty_store() {
        let server = MockServer::start().await;
        let (store, api) = setup(&server);
        let mut holder = AuthHolder::new(store);
        assert_eq!(holder.rehydrate(&api).await, &AuthState::Unauthenticated);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rehydrate_corrupt_user_purges() {
        let server = MockServer::start().await;
        let (store, api) = setup(&server);
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, "{not json").unwrap();

        let mut holder = AuthHolder::new(store.clone());
        assert_eq!(holder.rehydrate(&api).await, &AuthState::Unauthenticated);
        assert!(store.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rehydrate_user_without_id_purges() {
        let server = MockServer::start().await;
        let (store, api) = setup(&server);
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, r#"{"name":"Ana"}"#).unwrap();

        let mut holder = AuthHolder::new(store.clone());
        assert_eq!(holder.rehydrate(&api).await, &AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_rehydrate_partial_credentials_purges() {
        let server = MockServer::start().await;
        let (store, api) = setup(&server);
        store.set(TOKEN_KEY, "tok").unwrap();

        let mut holder = AuthHolder::new(store.clone());
        assert_eq!(holder.rehydrate(&api).await, &AuthState::Unauthenticated);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_rehydrate_rejected_token_purges() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile/7"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let (store, api) = setup(&server);
        store.set(TOKEN_KEY, "stale").unwrap();
        store.set(USER_KEY, r#"{"user_id":7}"#).unwrap();

        let mut holder = AuthHolder::new(store.clone());
        assert_eq!(holder.rehydrate(&api).await, &AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-9", "user_id": 9})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/9"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (store, api) = setup(&server);

        let mut holder = AuthHolder::new(store.clone());
        let err = holder.login(&api, "x@y.z", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::Server(_)));
        assert_eq!(holder.state(), &AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    async fn mount_second_user(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"email": "bia@example.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-9", "user_id": "9"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Bia"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_as_other_user_clears_session_cache() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_second_user(&server).await;
        let (store, api) = setup(&server);
        let session_store = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(session_store.clone());

        let mut holder = AuthHolder::new(store.clone()).with_session_cache(cache.clone());
        holder.login(&api, "ana@example.com", "pw").await.unwrap();
        cache.save(FORECAST_SELECTION_KEY, &json!({"spot_ids": [4]})).unwrap();
        cache.save(FORECAST_RESULTS_KEY, &json!([])).unwrap();

        let session = holder.login(&api, "bia@example.com", "pw").await.unwrap();
        assert_eq!(session.user_id(), "9");
        assert_eq!(session.profile.name.as_deref(), Some("Bia"));
        assert!(session_store.is_empty());
    }

    #[tokio::test]
    async fn test_login_as_same_user_keeps_session_cache() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (store, api) = setup(&server);
        let session_store = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(session_store.clone());

        let mut holder = AuthHolder::new(store.clone()).with_session_cache(cache.clone());
        holder.login(&api, "ana@example.com", "pw").await.unwrap();
        cache.save(FORECAST_SELECTION_KEY, &json!({"spot_ids": [4]})).unwrap();

        holder.login(&api, "ana@example.com", "pw").await.unwrap();
        assert!(session_store.get(FORECAST_SELECTION_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_profile_with_both_ids_uses_login_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-3", "user_id": 3})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "user_id": 3, "name": "Caio"
            })))
            .mount(&server)
            .await;
        let (store, api) = setup(&server);

        let mut holder = AuthHolder::new(store.clone());
        let session = holder.login(&api, "caio@example.com", "pw").await.unwrap().clone();
        assert_eq!(session.user_id(), "3");

        let mut reloaded = AuthHolder::new(store);
        assert_eq!(reloaded.rehydrate(&api).await, &AuthState::Authenticated(session));
    }

    #[tokio::test]
    async fn test_logout_clears_store_and_session_cache() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (store, api) = setup(&server);
        let session_store = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(session_store.clone());
        cache.save("recommendations_for_7", &json!([])).unwrap();

        let mut holder = AuthHolder::new(store.clone()).with_session_cache(cache);
        holder.login(&api, "ana@example.com", "pw").await.unwrap();
        holder.logout();

        assert_eq!(holder.state(), &AuthState::Unauthenticated);
        assert!(store.is_empty());
        assert!(session_store.is_empty());
    }

    #[tokio::test]
    async fn test_guard_logs_out_on_unauthorized() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (store, api) = setup(&server);
        let mut holder = AuthHolder::new(store.clone());
        holder.login(&api, "ana@example.com", "pw").await.unwrap();

        let ok: Result<u8, AppError> = holder.guard(Ok(1));
        assert_eq!(ok.unwrap(), 1);
        assert!(holder.session().is_some());

        let not_found = holder.guard::<()>(Err(AppError::NotFound("x".to_string())));
        assert!(not_found.is_err());
        assert!(holder.session().is_some());

        let rejected = holder.guard::<()>(Err(AppError::Unauthorized("expired".to_string())));
        assert!(rejected.unwrap_err().is_unauthorized());
        assert_eq!(holder.state(), &AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_profile_replaces_whole_profile() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("PUT"))
            .and(path("/profile/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"user_id": 7, "name": "Ana Maria", "bio": "Goofy longboarder"}
            })))
            .mount(&server)
            .await;
        let (store, api) = setup(&server);
        let mut holder = AuthHolder::new(store.clone());
        holder.login(&api, "ana@example.com", "pw").await.unwrap();

        let update = ProfileUpdate {
            name: Some("Ana Maria".to_string()),
            ..Default::default()
        };
        let profile = holder.update_profile(&api, &update).await.unwrap().clone();
        assert_eq!(profile.name.as_deref(), Some("Ana Maria"));
        // whole replacement: fields absent from the response are gone
        assert_eq!(profile.email, None);

        let stored: UserProfile =
            serde_json::from_str(&store.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, profile);
    }

    #[tokio::test]
    async fn test_refresh_profile_rejected_logs_out() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (store, api) = setup(&server);
        let mut holder = AuthHolder::new(store.clone());
        holder.login(&api, "ana@example.com", "pw").await.unwrap();

        // token rotated server-side
        store.set(TOKEN_KEY, "revoked").unwrap();
        Mock::given(method("GET"))
            .and(path("/profile/7"))
            .and(header("Authorization", "Bearer revoked"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = holder.refresh_profile(&api).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(holder.state(), &AuthState::Unauthenticated);
    }
}
