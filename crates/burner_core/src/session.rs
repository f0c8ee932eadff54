//! crates/burner_core/src/session.rs
//!
//! The client's authenticated session. A store is either hydrated (persisted
//! state has been read) or not; route guards refuse to decide until it is.
//! Persistence happens only at the login, logout and `set_user` checkpoints.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::SessionUser;
use crate::ports::{AuthApi, PortError, SessionPersistence};

/// Fixed key under which the session record is stored.
pub const STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad credentials and network failures collapse into this one variant.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("OAuth login failed: {0}")]
    OAuth(String),
    #[error("Failed to persist session: {0}")]
    Persistence(#[from] PortError),
}

/// The record written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub token: Option<String>,
    pub user: Option<SessionUser>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<SessionUser>,
    pub authenticated: bool,
    pub hydrated: bool,
}

impl SessionState {
    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            token: self.token.clone(),
            user: self.user.clone(),
            is_authenticated: self.authenticated,
        }
    }
}

pub struct SessionStore {
    state: SessionState,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    /// Creates an empty store that has not read persisted state yet.
    pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            state: SessionState::default(),
            persistence,
        }
    }

    /// Creates a store and restores whatever was persisted.
    ///
    /// A failed load is logged and treated as "nothing persisted"; the returned
    /// store is always hydrated.
    pub async fn hydrate(persistence: Arc<dyn SessionPersistence>) -> Self {
        let mut store = Self::new(persistence);
        match store.persistence.load().await {
            Ok(Some(record)) => match (record.is_authenticated, record.token) {
                (true, Some(token)) => {
                    info!("Restored persisted session.");
                    store.state.token = Some(token);
                    store.state.user = record.user;
                    store.state.authenticated = true;
                }
                (true, None) => {
                    warn!("Persisted session claims authentication without a token; ignoring it.")
                }
                (false, _) => {}
            },
            Ok(None) => {}
            Err(e) => error!("Failed to load persisted session: {:?}", e),
        }
        store.state.hydrated = true;
        store
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_hydrated(&self) -> bool {
        self.state.hydrated
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.state.user.as_ref()
    }

    /// Marks the session authenticated and saves it.
    pub async fn login(
        &mut self,
        token: String,
        user: Option<SessionUser>,
    ) -> Result<(), AuthError> {
        self.state.token = Some(token);
        self.state.user = user;
        self.state.authenticated = true;
        self.persistence.save(&self.state.to_persisted()).await?;
        Ok(())
    }

    /// Clears the session in memory and in storage.
    pub async fn logout(&mut self) -> Result<(), AuthError> {
        self.state.token = None;
        self.state.user = None;
        self.state.authenticated = false;
        self.persistence.clear().await?;
        Ok(())
    }

    pub async fn set_user(&mut self, user: SessionUser) -> Result<(), AuthError> {
        self.state.user = Some(user);
        self.persistence.save(&self.state.to_persisted()).await?;
        Ok(())
    }

    /// Password login against the auth backend.
    ///
    /// The user profile is fetched after the token; failing to fetch it still
    /// leaves the session logged in, without a user.
    pub async fn login_with_password(
        &mut self,
        api: &dyn AuthApi,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let token = api.login(username, password).await.map_err(|e| {
            warn!("Login failed for {}: {:?}", username, e);
            AuthError::InvalidCredentials
        })?;

        let user = match api.current_user(&token).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Logged in but could not fetch the user profile: {:?}", e);
                None
            }
        };

        self.login(token, user).await?;
        info!("Logged in as {}", username);
        Ok(())
    }

    /// Completes an OAuth redirect from its query string (`token=...` or `error=...`).
    ///
    /// A bare provider `code` is refused: only the backend can exchange it.
    pub async fn complete_oauth(&mut self, query: &str) -> Result<(), AuthError> {
        match parse_oauth_callback(query) {
            OAuthCallback::Token(token) => self.login(token, None).await,
            OAuthCallback::Error(message) => Err(AuthError::OAuth(message)),
            OAuthCallback::Code(_) => Err(AuthError::OAuth(
                "authorization code was not exchanged for a token".to_string(),
            )),
            OAuthCallback::Missing => Err(AuthError::OAuth("missing token".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthCallback {
    Token(String),
    Error(String),
    /// A provider authorization code that was never exchanged for a Burner token.
    Code(String),
    Missing,
}

/// Reads `token`, `error` or `code` from a callback query, in that order of precedence.
pub fn parse_oauth_callback(query: &str) -> OAuthCallback {
    let query = query.trim_start_matches('?');
    let mut error = None;
    let mut code = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "token" if !value.is_empty() => return OAuthCallback::Token(value.into_owned()),
            "error" if error.is_none() => error = Some(value.into_owned()),
            "code" if code.is_none() && !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }
    match (error, code) {
        (Some(message), _) => OAuthCallback::Error(message),
        (None, Some(code)) => OAuthCallback::Code(code),
        (None, None) => OAuthCallback::Missing,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryPersistence {
        pub record: Mutex<Option<PersistedSession>>,
        pub saves: Mutex<usize>,
        pub fail_load: bool,
    }

    #[async_trait]
    impl SessionPersistence for MemoryPersistence {
        async fn load(&self) -> PortResult<Option<PersistedSession>> {
            if self.fail_load {
                return Err(PortError::Unexpected("corrupt".into()));
            }
            Ok(self.record.lock().unwrap().clone())
        }

        async fn save(&self, session: &PersistedSession) -> PortResult<()> {
            *self.record.lock().unwrap() = Some(session.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        async fn clear(&self) -> PortResult<()> {
            *self.record.lock().unwrap() = None;
            Ok(())
        }
    }

    struct FakeAuth {
        accept: bool,
        profile: bool,
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, username: &str, password: &str) -> PortResult<String> {
            if self.accept && username == "ada@example.com" && password == "pw" {
                Ok("tok-1".into())
            } else {
                Err(PortError::Rejected {
                    status: 400,
                    message: "Incorrect username or password".into(),
                })
            }
        }

        async fn current_user(&self, _token: &str) -> PortResult<SessionUser> {
            if self.profile {
                Ok(user())
            } else {
                Err(PortError::Unexpected("connection reset".into()))
            }
        }

        fn oauth_url(&self, provider: &str) -> String {
            format!("http://api/auth/token/{}", provider)
        }
    }

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".into(),
            email: "ada@example.com".into(),
            username: "ada".into(),
        }
    }

    #[tokio::test]
    async fn new_store_is_not_hydrated() {
        let store = SessionStore::new(Arc::new(MemoryPersistence::default()));
        assert!(!store.is_hydrated());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn hydrate_restores_a_persisted_login() {
        let persistence = Arc::new(MemoryPersistence::default());
        *persistence.record.lock().unwrap() = Some(PersistedSession {
            token: Some("tok".into()),
            user: Some(user()),
            is_authenticated: true,
        });
        let store = SessionStore::hydrate(persistence).await;
        assert!(store.is_hydrated());
        assert!(store.is_authenticated());
        assert_eq!(store.token(), Some("tok"));
        assert_eq!(store.user().map(|u| u.username.as_str()), Some("ada"));
    }

    #[tokio::test]
    async fn hydrate_without_record_or_with_broken_storage_is_logged_out() {
        let store = SessionStore::hydrate(Arc::new(MemoryPersistence::default())).await;
        assert!(store.is_hydrated());
        assert!(!store.is_authenticated());

        let broken = MemoryPersistence {
            fail_load: true,
            ..Default::default()
        };
        let store = SessionStore::hydrate(Arc::new(broken)).await;
        assert!(store.is_hydrated());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn authenticated_record_without_token_is_ignored() {
        let persistence = Arc::new(MemoryPersistence::default());
        *persistence.record.lock().unwrap() = Some(PersistedSession {
            token: None,
            user: None,
            is_authenticated: true,
        });
        let store = SessionStore::hydrate(persistence).await;
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn login_and_logout_persist_at_checkpoints() {
        let persistence = Arc::new(MemoryPersistence::default());
        let mut store = SessionStore::hydrate(persistence.clone()).await;

        store.login("tok".into(), Some(user())).await.unwrap();
        let saved = persistence.record.lock().unwrap().clone().unwrap();
        assert!(saved.is_authenticated);
        assert_eq!(saved.token.as_deref(), Some("tok"));

        store.logout().await.unwrap();
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert!(persistence.record.lock().unwrap().is_none());
        assert_eq!(*persistence.saves.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn password_login_fetches_the_profile() {
        let mut store = SessionStore::hydrate(Arc::new(MemoryPersistence::default())).await;
        let api = FakeAuth { accept: true, profile: true };
        store
            .login_with_password(&api, "ada@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(store.token(), Some("tok-1"));
        assert_eq!(store.user(), Some(&user()));
    }

    #[tokio::test]
    async fn password_login_survives_a_missing_profile() {
        let mut store = SessionStore::hydrate(Arc::new(MemoryPersistence::default())).await;
        let api = FakeAuth { accept: true, profile: false };
        store
            .login_with_password(&api, "ada@example.com", "pw")
            .await
            .unwrap();
        assert!(store.is_authenticated());
        assert!(store.user().is_none());
    }

    #[tokio::test]
    async fn rejected_login_collapses_to_one_message() {
        let mut store = SessionStore::hydrate(Arc::new(MemoryPersistence::default())).await;
        let api = FakeAuth { accept: false, profile: true };
        let err = store
            .login_with_password(&api, "ada@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn oauth_callback_logs_in_or_reports_the_error() {
        let mut store = SessionStore::hydrate(Arc::new(MemoryPersistence::default())).await;
        let err = store.complete_oauth("?error=access%20denied").await.unwrap_err();
        assert_eq!(err.to_string(), "OAuth login failed: access denied");
        assert!(store.complete_oauth("").await.is_err());

        store.complete_oauth("?state=x&token=abc").await.unwrap();
        assert_eq!(store.token(), Some("abc"));
    }

    #[test]
    fn callback_parsing_decodes_components() {
        assert_eq!(
            parse_oauth_callback("token=a%2Bb"),
            OAuthCallback::Token("a+b".into())
        );
        assert_eq!(
            parse_oauth_callback("error=bad+thing&token="),
            OAuthCallback::Error("bad thing".into())
        );
        assert_eq!(parse_oauth_callback("state=1"), OAuthCallback::Missing);
        assert_eq!(
            parse_oauth_callback("?code=4%2F0Ab&scope=email"),
            OAuthCallback::Code("4/0Ab".into())
        );
        assert_eq!(
            parse_oauth_callback("code=x&error=denied"),
            OAuthCallback::Error("denied".into())
        );
    }

    #[tokio::test]
    async fn unexchanged_provider_code_does_not_log_in() {
        let mut store = SessionStore::hydrate(Arc::new(MemoryPersistence::default())).await;
        let err = store.complete_oauth("?code=abc&scope=openid").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "OAuth login failed: authorization code was not exchanged for a token"
        );
        assert!(!store.is_authenticated());
    }

    #[test]
    fn persisted_record_uses_the_stored_field_names() {
        let record = PersistedSession {
            token: Some("t".into()),
            user: None,
            is_authenticated: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["isAuthenticated"], true);
        assert_eq!(json["token"], "t");
        assert!(json["user"].is_null());
    }
}
