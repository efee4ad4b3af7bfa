//! Authentication context for managing Keycloak login state and the PKCE flow.
//!
//! `use_auth_provider` installs an [`AuthContext`] at the root of the app and
//! drives the flow on mount: it completes a login when the page is the
//! provider's redirect, otherwise restores (and if needed refreshes) the
//! stored session. Components read the outcome through `use_auth()`.

use dioxus::prelude::*;
use oauth2::url::Url;

use crate::claims::{TokenData, decode_token_data};
use crate::client::browser;
use crate::client::callback::{CallbackParams, strip_callback_params};
use crate::client::oauth::OAuthClient;
use crate::client::session::{KeyValueStore, SessionStore, StoredSession};
use crate::config::{AuthConfig, RefreshExpiredAction};
use crate::error::AuthError;

/// How often the refresh task checks the access token expiry.
#[cfg(target_arch = "wasm32")]
const REFRESH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// Authentication state behind the context.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    /// Whether the initial callback/restore step is still running
    pub is_loading: bool,
    /// Tokens of the current session
    pub session: Option<StoredSession>,
    /// Claims of the access token, if it is a JWT
    pub token_data: Option<TokenData>,
    /// Claims of the ID token
    pub id_token_data: Option<TokenData>,
    /// Last authentication error message
    pub error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            is_loading: true,
            session: None,
            token_data: None,
            id_token_data: None,
            error: None,
        }
    }
}

impl AuthState {
    /// State of a signed-in user, with both tokens decoded.
    pub fn from_session(session: StoredSession) -> Self {
        let token_data = decode_token_data(&session.access_token)
            .inspect_err(|e| tracing::warn!("Access token is not a readable JWT: {}", e))
            .ok();
        let id_token_data = session
            .id_token
            .as_deref()
            .and_then(|token| decode_token_data(token).ok());

        Self {
            is_loading: false,
            session: Some(session),
            token_data,
            id_token_data,
            error: None,
        }
    }

    /// State with no session and nothing pending.
    pub fn signed_out() -> Self {
        Self {
            is_loading: false,
            ..Self::default()
        }
    }
}

/// Installs the authentication context for the component tree.
///
/// Must be called once at the root of the app (e.g., in `App`).
///
/// # Example
///
/// ```ignore
/// #[component]
/// pub fn App() -> Element {
///     use_auth_provider(AuthConfig::from_env_or_default());
///     // ... rest of app
/// }
/// ```
pub fn use_auth_provider(config: AuthConfig) -> AuthContext {
    let state = use_signal(AuthState::default);
    let config = use_signal(move || config);
    let context = use_context_provider(|| AuthContext { state, config });

    use_effect(move || {
        spawn(async move {
            context.initialize().await;
        });
    });

    #[cfg(target_arch = "wasm32")]
    use_future(move || async move { context.keep_fresh().await });

    context
}

/// Returns the context installed by `use_auth_provider()`.
///
/// # Panics
///
/// Panics if no ancestor component called `use_auth_provider()`.
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>()
}

/// Handle to the authentication state and actions.
#[derive(Clone, Copy)]
pub struct AuthContext {
    state: Signal<AuthState>,
    config: Signal<AuthConfig>,
}

impl AuthContext {
    /// Access token of the current session.
    pub fn token(&self) -> Option<String> {
        self.state
            .read()
            .session
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Decoded claims of the access token.
    pub fn token_data(&self) -> Option<TokenData> {
        self.state.read().token_data.clone()
    }

    /// ID token of the current session.
    pub fn id_token(&self) -> Option<String> {
        self.state
            .read()
            .session
            .as_ref()
            .and_then(|s| s.id_token.clone())
    }

    /// Decoded claims of the ID token.
    pub fn id_token_data(&self) -> Option<TokenData> {
        self.state.read().id_token_data.clone()
    }

    /// Last authentication error, as a user-facing message.
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().session.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    pub fn config(&self) -> AuthConfig {
        self.config.read().clone()
    }

    /// Returns true if the configuration is good enough to start a login.
    pub fn login_available(&self) -> bool {
        OAuthClient::new(&self.config.read()).is_ok()
    }

    /// Builds the provider logout URL for the current session.
    pub fn logout_url(&self) -> Result<Url, AuthError> {
        let id_token = self.id_token();
        self.config.read().logout_url(id_token.as_deref())
    }

    /// Starts the login: persists a fresh PKCE verifier and state, then
    /// redirects the browser to the authorization endpoint.
    pub async fn log_in(self) -> Result<(), AuthError> {
        let config = self.config();
        self.start_login(&config, &SessionStore::from_config(&config))
    }

    /// Forgets the local session. Does not contact the provider.
    pub fn log_out(self) {
        tracing::info!("Clearing local session");
        SessionStore::from_config(&self.config.read()).clear();
        self.set_state(AuthState::signed_out());
    }

    fn set_state(self, new_state: AuthState) {
        let mut state = self.state;
        state.set(new_state);
    }

    fn fail(self, err: &AuthError) {
        let mut state = self.state;
        state.with_mut(|s| {
            s.error = Some(err.to_string());
            s.is_loading = false;
        });
    }

    fn start_login<S: KeyValueStore>(
        self,
        config: &AuthConfig,
        store: &SessionStore<S>,
    ) -> Result<(), AuthError> {
        let client =
            OAuthClient::new(config).map_err(|e| AuthError::LoginUnavailable(e.to_string()))?;

        let request = client.authorization_request();
        store.save_pending(&request.pending)?;

        tracing::info!("Redirecting to the authorization endpoint");
        browser::navigate(&request.url)
    }

    async fn initialize(self) {
        let config = self.config();
        let store = SessionStore::from_config(&config);
        let location = browser::current_url().and_then(|href| Url::parse(&href).ok());

        self.handle_page_load(&config, &store, location, browser::now_unix())
            .await;
    }

    /// Completes a callback found in `location`, or restores the stored
    /// session. Failures end up in `error`.
    async fn handle_page_load<S: KeyValueStore>(
        self,
        config: &AuthConfig,
        store: &SessionStore<S>,
        location: Option<Url>,
        now: i64,
    ) {
        tracing::trace!("Checking for callback or stored session");

        let callback = location
            .and_then(|url| CallbackParams::from_url(&url).map(|params| (url, params)));

        let result = match callback {
            Some((url, params)) => {
                browser::replace_url(strip_callback_params(&url).as_str());
                self.complete_login(config, store, params, now).await
            }
            None => self.restore(config, store, now).await,
        };

        if let Err(err) = result {
            tracing::error!("Authentication failed: {}", err);
            self.fail(&err);
        }
    }

    async fn complete_login<S: KeyValueStore>(
        self,
        config: &AuthConfig,
        store: &SessionStore<S>,
        params: CallbackParams,
        now: i64,
    ) -> Result<(), AuthError> {
        tracing::trace!("Handling authorization callback");

        let pending = store.take_pending();
        if let Some(err) = params.provider_error() {
            return Err(err);
        }

        let pending = pending.ok_or(AuthError::MissingPendingLogin)?;
        let code = params.authorization_code(&pending.state)?;

        let session = OAuthClient::new(config)?
            .exchange_code(code, pending, now)
            .await?;
        store.save(&session)?;

        tracing::info!("Login completed");
        self.set_state(AuthState::from_session(session));
        Ok(())
    }

    async fn restore<S: KeyValueStore>(
        self,
        config: &AuthConfig,
        store: &SessionStore<S>,
        now: i64,
    ) -> Result<(), AuthError> {
        let Some(session) = store.load() else {
            tracing::trace!("No stored session found");
            self.set_state(AuthState::signed_out());
            if config.auto_login {
                return self.start_login(config, store);
            }
            return Ok(());
        };

        if session.is_expired(now) {
            tracing::trace!("Stored access token expired");
            return self.renew(config, store, session, now).await;
        }

        tracing::trace!("Restored session from storage");
        self.set_state(AuthState::from_session(session));
        Ok(())
    }

    /// Refreshes the session.
    ///
    /// The session ends, and `on_refresh_token_expire` applies, only when no
    /// usable refresh token is left: none stored, known to be expired, or
    /// rejected by the provider. Any other failure leaves a still valid
    /// session in place and is returned.
    async fn renew<S: KeyValueStore>(
        self,
        config: &AuthConfig,
        store: &SessionStore<S>,
        session: StoredSession,
        now: i64,
    ) -> Result<(), AuthError> {
        if let Some(refresh_token) = session
            .refresh_token
            .clone()
            .filter(|_| session.can_refresh(now))
        {
            match OAuthClient::new(config)?.refresh(&refresh_token, now).await {
                Ok(refreshed) => {
                    let merged = session.merge_refreshed(refreshed);
                    store.save(&merged)?;
                    tracing::info!("Access token refreshed");
                    self.set_state(AuthState::from_session(merged));
                    return Ok(());
                }
                Err(err @ AuthError::Provider { .. }) => {
                    tracing::warn!("Refresh token rejected: {}", err);
                }
                Err(err) if !session.is_expired(now) => {
                    tracing::warn!("Token refresh failed, keeping current session: {}", err);
                    return Err(err);
                }
                Err(err) => tracing::warn!("Token refresh failed: {}", err),
            }
        }

        tracing::info!("Refresh token unusable, ending session");
        store.clear();
        self.set_state(AuthState::signed_out());

        match config.on_refresh_token_expire {
            RefreshExpiredAction::LogIn => self.start_login(config, store),
            RefreshExpiredAction::Nothing => Ok(()),
        }
    }

    /// Refreshes the access token shortly before it expires, for as long as
    /// the provider component is mounted.
    #[cfg(target_arch = "wasm32")]
    async fn keep_fresh(self) {
        loop {
            browser::sleep(REFRESH_POLL_INTERVAL).await;

            let Some(session) = self.state.read().session.clone() else {
                continue;
            };
            let config = self.config();
            let now = browser::now_unix();

            if !session.needs_refresh(now, config.refresh_leeway_secs) {
                continue;
            }
            // Without a refresh token, keep showing the session until it is really gone.
            if !session.can_refresh(now) && !session.is_expired(now) {
                continue;
            }

            let store = SessionStore::from_config(&config);
            if let Err(err) = self.renew(&config, &store, session, now).await {
                tracing::error!("Background refresh failed: {}", err);
                self.fail(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::tests::create_test_jwt;
    use crate::client::session::PendingLogin;
    use crate::client::session::tests::MemoryStorage;
    use dioxus::core::{ScopeId, VirtualDom};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const NOW: i64 = 1_700_000_000;

    fn session(access_token: String, id_token: Option<String>) -> StoredSession {
        StoredSession {
            access_token,
            id_token,
            refresh_token: None,
            expires_at: Some(1_700_000_300),
            refresh_expires_at: None,
        }
    }

    fn refreshable(expires_at: i64) -> StoredSession {
        StoredSession {
            access_token: create_test_jwt(r#"{"exp": 1700000010}"#),
            id_token: None,
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(expires_at),
            refresh_expires_at: Some(NOW + 1800),
        }
    }

    fn memory_store() -> SessionStore<MemoryStorage> {
        SessionStore::new(MemoryStorage::default(), "test_")
    }

    fn config_with(token_endpoint: &str, on_expire: RefreshExpiredAction) -> AuthConfig {
        AuthConfig {
            token_endpoint: token_endpoint.to_string(),
            on_refresh_token_expire: on_expire,
            ..AuthConfig::default()
        }
    }

    /// Runs `test` against a fresh context inside a Dioxus runtime.
    fn with_context<F, Fut>(config: AuthConfig, test: F)
    where
        F: FnOnce(AuthContext) -> Fut,
        Fut: Future<Output = ()>,
    {
        let dom = VirtualDom::new(|| rsx! {});
        dom.in_scope(ScopeId::ROOT, || {
            let context = AuthContext {
                state: Signal::new(AuthState::default()),
                config: Signal::new(config),
            };
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(test(context));
        });
    }

    /// Serves one canned HTTP response and returns the endpoint URL.
    async fn token_endpoint(status: &'static str, body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request_complete(&request) {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{addr}/token")
    }

    /// True once the headers and `Content-Length` bytes of body have arrived.
    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= length
    }

    /// An endpoint nothing listens on.
    async fn unreachable_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/token")
    }

    fn callback_url(query: &str) -> Option<Url> {
        Url::parse(&format!("http://localhost:5173/?{query}")).ok()
    }

    #[test]
    fn test_auth_state_default() {
        let state = AuthState::default();
        assert!(state.is_loading);
        assert!(state.session.is_none());
        assert!(state.token_data.is_none());
        assert!(state.id_token_data.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_signed_out() {
        let state = AuthState::signed_out();
        assert!(!state.is_loading);
        assert!(state.session.is_none());
    }

    #[test]
    fn test_from_session_decodes_both_tokens() {
        let access = create_test_jwt(r#"{"exp": 1700000300, "scope": "openid email"}"#);
        let id = create_test_jwt(r#"{"preferred_username": "alice"}"#);

        let state = AuthState::from_session(session(access, Some(id)));

        assert!(!state.is_loading);
        assert_eq!(
            state.token_data.as_ref().and_then(TokenData::exp),
            Some(1700000300)
        );
        assert_eq!(
            state
                .id_token_data
                .as_ref()
                .and_then(TokenData::preferred_username),
            Some("alice")
        );
        assert!(state.error.is_none());
    }

    #[test]
    fn test_from_session_with_opaque_access_token() {
        let state = AuthState::from_session(session("opaque".to_string(), None));

        assert!(state.session.is_some());
        assert!(state.token_data.is_none());
        assert!(state.id_token_data.is_none());
    }

    #[test]
    fn test_from_session_clears_error() {
        let state = AuthState::from_session(session(create_test_jwt("{}"), None));
        assert!(state.error.is_none());
        assert_eq!(state.token_data, Some(TokenData::default()));
    }

    #[test]
    fn test_restore_valid_session() {
        let config = AuthConfig::default();
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();
            let stored = session(create_test_jwt(r#"{"exp": 1700000300}"#), None);
            store.save(&stored).unwrap();

            ctx.handle_page_load(&config, &store, None, NOW).await;

            assert!(ctx.is_authenticated());
            assert!(!ctx.is_loading());
            assert_eq!(ctx.token(), Some(stored.access_token));
            assert!(ctx.error().is_none());
        });
    }

    #[test]
    fn test_no_session_without_auto_login() {
        let config = AuthConfig::default();
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();

            ctx.handle_page_load(&config, &store, None, NOW).await;

            assert!(!ctx.is_authenticated());
            assert!(!ctx.is_loading());
            assert!(ctx.error().is_none());
            assert!(store.take_pending().is_none());
        });
    }

    #[test]
    fn test_auto_login_starts_login() {
        let config = AuthConfig {
            auto_login: true,
            ..AuthConfig::default()
        };
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();

            ctx.handle_page_load(&config, &store, None, NOW).await;

            // The pending login is written before the (native: failing) redirect.
            assert!(store.take_pending().is_some());
            assert!(!ctx.is_authenticated());
            assert_eq!(
                ctx.error(),
                Some(AuthError::Browser("navigation requires a browser".to_string()).to_string())
            );
        });
    }

    #[test]
    fn test_expired_session_without_refresh_token_signs_out() {
        let config = config_with(
            &AuthConfig::default().token_endpoint,
            RefreshExpiredAction::Nothing,
        );
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();
            store
                .save(&session(create_test_jwt("{}"), None))
                .unwrap();

            ctx.handle_page_load(&config, &store, None, 1_700_000_300)
                .await;

            assert!(!ctx.is_authenticated());
            assert!(!ctx.is_loading());
            assert!(ctx.error().is_none());
            assert!(store.load().is_none());
            assert!(store.take_pending().is_none());
        });
    }

    #[test]
    fn test_expired_session_with_log_in_policy_restarts_login() {
        let config = config_with(
            &AuthConfig::default().token_endpoint,
            RefreshExpiredAction::LogIn,
        );
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();
            store
                .save(&session(create_test_jwt("{}"), None))
                .unwrap();

            ctx.handle_page_load(&config, &store, None, 1_700_000_300)
                .await;

            assert!(!ctx.is_authenticated());
            assert!(store.load().is_none());
            assert!(store.take_pending().is_some());
        });
    }

    #[test]
    fn test_failed_refresh_keeps_valid_session() {
        with_context(AuthConfig::default(), |ctx| async move {
            let config = config_with(&unreachable_endpoint().await, RefreshExpiredAction::Nothing);
            let store = memory_store();
            let current = refreshable(NOW + 10);
            store.save(&current).unwrap();
            ctx.set_state(AuthState::from_session(current.clone()));

            let result = ctx.renew(&config, &store, current.clone(), NOW).await;

            assert!(matches!(result, Err(AuthError::TokenRequest(_))));
            assert!(ctx.is_authenticated());
            assert_eq!(store.load(), Some(current));
        });
    }

    #[test]
    fn test_rejected_refresh_token_ends_session() {
        with_context(AuthConfig::default(), |ctx| async move {
            let endpoint = token_endpoint(
                "400 Bad Request",
                r#"{"error":"invalid_grant","error_description":"Token is not active"}"#,
            )
            .await;
            let config = config_with(&endpoint, RefreshExpiredAction::Nothing);
            let store = memory_store();
            let current = refreshable(NOW + 10);
            store.save(&current).unwrap();
            ctx.set_state(AuthState::from_session(current.clone()));

            let result = ctx.renew(&config, &store, current, NOW).await;

            assert_eq!(result, Ok(()));
            assert!(!ctx.is_authenticated());
            assert!(store.load().is_none());
        });
    }

    #[test]
    fn test_expired_session_is_refreshed_on_load() {
        with_context(AuthConfig::default(), |ctx| async move {
            let endpoint = token_endpoint(
                "200 OK",
                r#"{"access_token":"fresh","token_type":"Bearer","expires_in":300}"#,
            )
            .await;
            let config = config_with(&endpoint, RefreshExpiredAction::Nothing);
            let store = memory_store();
            store.save(&refreshable(NOW - 1)).unwrap();

            ctx.handle_page_load(&config, &store, None, NOW).await;

            assert!(ctx.error().is_none());
            assert_eq!(ctx.token().as_deref(), Some("fresh"));

            let stored = store.load().unwrap();
            assert_eq!(stored.access_token, "fresh");
            assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
            assert_eq!(stored.expires_at, Some(NOW + 300));
        });
    }

    #[test]
    fn test_callback_without_pending_login() {
        let config = AuthConfig::default();
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();

            ctx.handle_page_load(&config, &store, callback_url("code=abc&state=xyz"), NOW)
                .await;

            assert!(!ctx.is_authenticated());
            assert!(!ctx.is_loading());
            assert_eq!(
                ctx.error(),
                Some(AuthError::MissingPendingLogin.to_string())
            );
        });
    }

    #[test]
    fn test_callback_provider_error_wins_over_missing_pending_login() {
        let config = AuthConfig::default();
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();
            let location =
                callback_url("error=access_denied&error_description=User+denied+access&state=xyz");

            ctx.handle_page_load(&config, &store, location, NOW).await;

            assert_eq!(
                ctx.error().as_deref(),
                Some("access_denied: User denied access")
            );
        });
    }

    #[test]
    fn test_callback_state_mismatch_consumes_pending_login() {
        let config = AuthConfig::default();
        with_context(config.clone(), |ctx| async move {
            let store = memory_store();
            store
                .save_pending(&PendingLogin {
                    code_verifier: "verifier".to_string(),
                    state: "expected".to_string(),
                })
                .unwrap();

            ctx.handle_page_load(&config, &store, callback_url("code=abc&state=other"), NOW)
                .await;

            assert_eq!(ctx.error(), Some(AuthError::StateMismatch.to_string()));
            assert!(store.take_pending().is_none());
        });
    }
}
