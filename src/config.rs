//! OIDC client configuration.
//!
//! This module holds the static configuration handed to the authentication
//! flow: which client we are, where the identity provider's endpoints live,
//! where it should send the browser back to, and which scopes to request.
//! It also builds the logout redirect URL, the only URL the view constructs
//! itself.

use oauth2::url::Url;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Keycloak server used by the demo configuration.
const DEFAULT_KEYCLOAK_URL: &str = "http://localhost:8089";
/// Realm used by the demo configuration.
const DEFAULT_REALM: &str = "oauth2-client-flow";
/// Client registered in the demo realm.
const DEFAULT_CLIENT_ID: &str = "client-flow";
/// Origin the demo app is served from.
const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";
/// Scopes requested by the demo configuration.
const DEFAULT_SCOPE: &str = "openid profile email offline_access";

/// What to do when the access token expired and no usable refresh token is left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshExpiredAction {
    /// Start a new login right away.
    #[default]
    LogIn,
    /// Drop the session and wait for the user to click login.
    Nothing,
}

/// Browser storage the session is persisted in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    /// `window.localStorage`, survives closing the tab.
    #[default]
    Local,
    /// `window.sessionStorage`, scoped to the tab.
    Session,
}

/// Configuration for the Authorization Code + PKCE client.
///
/// # Fields
///
/// - `client_id`: public client identifier registered at the provider
/// - `authorization_endpoint`: where the browser is sent to log in
/// - `token_endpoint`: where the authorization code is exchanged for tokens
/// - `redirect_uri`: where the provider sends the browser back to
/// - `scope`: space separated scopes to request
/// - `logout_endpoint`: RP-initiated logout endpoint
/// - `logout_redirect`: where the provider sends the browser after logout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    pub client_id: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub redirect_uri: String,
    pub scope: String,
    pub logout_endpoint: String,
    pub logout_redirect: String,

    /// Start the login as soon as the app loads without a session.
    pub auto_login: bool,

    /// Behaviour once both access and refresh token are unusable.
    pub on_refresh_token_expire: RefreshExpiredAction,

    pub storage: StorageKind,

    /// Prefix for every storage key written by the client.
    pub storage_key_prefix: String,

    /// Refresh the access token this many seconds before it expires.
    pub refresh_leeway_secs: i64,
}

impl Default for AuthConfig {
    /// The local Keycloak setup the demo ships with.
    fn default() -> Self {
        Self::keycloak(
            DEFAULT_KEYCLOAK_URL,
            DEFAULT_REALM,
            DEFAULT_CLIENT_ID,
            DEFAULT_APP_ORIGIN,
        )
    }
}

impl AuthConfig {
    /// Creates a configuration for a Keycloak realm.
    ///
    /// The OpenID Connect endpoints are derived from the realm, and the app
    /// origin is used both as redirect URI and as post-logout redirect.
    ///
    /// # Example
    ///
    /// ```
    /// # use keycloak_pkce::AuthConfig;
    /// let config = AuthConfig::keycloak(
    ///     "https://sso.example.com/",
    ///     "demo",
    ///     "spa",
    ///     "https://app.example.com",
    /// );
    /// assert_eq!(
    ///     config.token_endpoint,
    ///     "https://sso.example.com/realms/demo/protocol/openid-connect/token"
    /// );
    /// assert_eq!(config.redirect_uri, "https://app.example.com");
    /// ```
    pub fn keycloak(base_url: &str, realm: &str, client_id: &str, app_origin: &str) -> Self {
        let realm_url = format!(
            "{}/realms/{}/protocol/openid-connect",
            base_url.trim_end_matches('/'),
            realm
        );

        Self {
            client_id: client_id.to_string(),
            authorization_endpoint: format!("{}/auth", realm_url),
            token_endpoint: format!("{}/token", realm_url),
            redirect_uri: app_origin.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            logout_endpoint: format!("{}/logout", realm_url),
            logout_redirect: app_origin.to_string(),
            auto_login: false,
            on_refresh_token_expire: RefreshExpiredAction::LogIn,
            storage: StorageKind::Local,
            storage_key_prefix: "kc_pkce_".to_string(),
            refresh_leeway_secs: 30,
        }
    }

    /// Loads the configuration from compile-time environment variables.
    ///
    /// Expected environment variables (see `.env.example`):
    /// - `OIDC_CLIENT_ID`
    /// - `OIDC_AUTHORIZATION_ENDPOINT`
    /// - `OIDC_TOKEN_ENDPOINT`
    /// - `OIDC_REDIRECT_URI`
    /// - `OIDC_SCOPE`
    /// - `OIDC_LOGOUT_ENDPOINT`
    /// - `OIDC_LOGOUT_REDIRECT`
    ///
    /// Returns `None` if any of them was not set at compile time.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            client_id: option_env!("OIDC_CLIENT_ID")?.to_string(),
            authorization_endpoint: option_env!("OIDC_AUTHORIZATION_ENDPOINT")?.to_string(),
            token_endpoint: option_env!("OIDC_TOKEN_ENDPOINT")?.to_string(),
            redirect_uri: option_env!("OIDC_REDIRECT_URI")?.to_string(),
            scope: option_env!("OIDC_SCOPE")?.to_string(),
            logout_endpoint: option_env!("OIDC_LOGOUT_ENDPOINT")?.to_string(),
            logout_redirect: option_env!("OIDC_LOGOUT_REDIRECT")?.to_string(),
            ..Self::default()
        })
    }

    /// Loads the configuration from the environment, falling back to the demo setup.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|| {
            tracing::warn!("OIDC_* variables not set at compile time, using local Keycloak config");
            Self::default()
        })
    }

    /// Returns the requested scopes one by one.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }

    /// Checks that the configuration can drive a login.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::InvalidConfig("client_id is empty".to_string()));
        }

        for (name, value) in [
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("redirect_uri", &self.redirect_uri),
            ("logout_endpoint", &self.logout_endpoint),
            ("logout_redirect", &self.logout_redirect),
        ] {
            parse_url(name, value)?;
        }

        Ok(())
    }

    /// Builds the RP-initiated logout URL.
    ///
    /// `post_logout_redirect_uri` is always set; `id_token_hint` only when an
    /// ID token is available.
    ///
    /// # Example
    ///
    /// ```
    /// # use keycloak_pkce::AuthConfig;
    /// let config = AuthConfig::default();
    /// let url = config.logout_url(None).unwrap();
    /// assert_eq!(
    ///     url.as_str(),
    ///     "http://localhost:8089/realms/oauth2-client-flow/protocol/openid-connect/logout?post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A5173"
    /// );
    /// ```
    pub fn logout_url(&self, id_token_hint: Option<&str>) -> Result<Url, AuthError> {
        let mut url = parse_url("logout_endpoint", &self.logout_endpoint)?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("post_logout_redirect_uri", &self.logout_redirect);
            if let Some(hint) = id_token_hint.filter(|hint| !hint.is_empty()) {
                query.append_pair("id_token_hint", hint);
            }
        }

        Ok(url)
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, AuthError> {
    Url::parse(value).map_err(|e| AuthError::InvalidConfig(format!("{name}: {e}")))
}
