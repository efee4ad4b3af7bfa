//! Authorization Code + PKCE flow mechanics, delegated to the `oauth2` crate.
//!
//! This module never generates verifiers or challenges itself: the PKCE pair
//! and the CSRF state come from `oauth2`, and so do the token requests. What
//! lives here is the wiring from [`AuthConfig`] to an `oauth2` client and the
//! mapping of Keycloak's token response onto a [`StoredSession`].

use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, CsrfToken, ExtraTokenFields, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use crate::client::session::{PendingLogin, StoredSession};
use crate::config::AuthConfig;
use crate::error::AuthError;

/// Fields Keycloak adds to the standard token response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeycloakTokenFields {
    /// ID token, present when the `openid` scope was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Lifetime of the refresh token in seconds. `0` means offline token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<u64>,
}

impl ExtraTokenFields for KeycloakTokenFields {}

/// Token response of a Keycloak token endpoint.
pub type KeycloakTokenResponse = StandardTokenResponse<KeycloakTokenFields, BasicTokenType>;

type KeycloakClient = Client<
    BasicErrorResponse,
    KeycloakTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Authorization request ready to be followed by the browser.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
    /// Authorization endpoint URL with all query parameters.
    pub url: String,
    /// Verifier and state to persist until the callback arrives.
    pub pending: PendingLogin,
}

/// Public OAuth client built from the app configuration.
#[derive(Clone, Debug)]
pub struct OAuthClient {
    client: KeycloakClient,
    scopes: Vec<Scope>,
}

impl OAuthClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] when the configuration does not
    /// validate.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;

        let invalid = |name: &str, e: oauth2::url::ParseError| {
            AuthError::InvalidConfig(format!("{}: {}", name, e))
        };

        let client = KeycloakClient::new(
            ClientId::new(config.client_id.clone()),
            None,
            AuthUrl::new(config.authorization_endpoint.clone())
                .map_err(|e| invalid("authorization_endpoint", e))?,
            Some(
                TokenUrl::new(config.token_endpoint.clone())
                    .map_err(|e| invalid("token_endpoint", e))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_uri.clone())
                .map_err(|e| invalid("redirect_uri", e))?,
        );

        let scopes = config
            .scopes()
            .map(|scope| Scope::new(scope.to_string()))
            .collect();

        Ok(Self { client, scopes })
    }

    /// Creates the authorization URL with a fresh PKCE pair and CSRF state.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::trace!("Built authorization URL: {}", auth_url);

        AuthorizationRequest {
            url: auth_url.to_string(),
            pending: PendingLogin {
                code_verifier: pkce_verifier.secret().to_string(),
                state: csrf_token.secret().to_string(),
            },
        }
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: String,
        pending: PendingLogin,
        now: i64,
    ) -> Result<StoredSession, AuthError> {
        tracing::trace!("Exchanging authorization code for tokens");

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.code_verifier))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(token_error)?;

        Ok(session_from_response(&response, now))
    }

    /// Uses a refresh token to obtain a new access token.
    pub async fn refresh(&self, refresh_token: &str, now: i64) -> Result<StoredSession, AuthError> {
        tracing::trace!("Refreshing access token");

        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let response = self
            .client
            .exchange_refresh_token(&refresh_token)
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(token_error)?;

        Ok(session_from_response(&response, now))
    }
}

/// Maps a token response onto a session anchored at `now`.
pub fn session_from_response(response: &KeycloakTokenResponse, now: i64) -> StoredSession {
    let extra = response.extra_fields();

    StoredSession {
        access_token: response.access_token().secret().to_string(),
        id_token: extra.id_token.clone(),
        refresh_token: response.refresh_token().map(|t| t.secret().to_string()),
        expires_at: response
            .expires_in()
            .map(|lifetime| now + lifetime.as_secs() as i64),
        refresh_expires_at: extra
            .refresh_expires_in
            .filter(|&secs| secs > 0)
            .map(|secs| now + secs as i64),
    }
}

fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => {
            tracing::error!("Token endpoint returned an error: {:?}", response);
            AuthError::provider(
                AsRef::<str>::as_ref(response.error()),
                response.error_description().cloned(),
            )
        }
        other => {
            tracing::error!("Token request failed: {}", other);
            AuthError::TokenRequest(other.to_string())
        }
    }
}
