//! Client-side authentication flow for Keycloak.
//!
//! This module provides the pieces the view relies on:
//! - OAuth client wiring over the `oauth2` crate (PKCE pair, token requests)
//! - Callback URL parsing and cleanup
//! - Session persistence in browser storage
//! - Browser glue (navigation, clipboard, timers), stubbed on native targets
//! - The Dioxus context exposing tokens, claims, errors and login/logout
//!
//! # Example
//!
//! ```rust,ignore
//! use keycloak_pkce::AuthConfig;
//! use keycloak_pkce::client::{use_auth, use_auth_provider};
//!
//! // At the root of the app
//! use_auth_provider(AuthConfig::from_env_or_default());
//!
//! // Anywhere below it
//! let auth = use_auth();
//! if let Some(claims) = auth.token_data() {
//!     tracing::info!("token expires at {:?}", claims.exp());
//! }
//! ```

pub mod browser;
pub mod callback;
pub mod oauth;
pub mod session;
pub mod use_auth;

pub use callback::CallbackParams;
pub use oauth::{AuthorizationRequest, KeycloakTokenResponse, OAuthClient};
pub use session::{PendingLogin, SessionStore, StoredSession};
pub use use_auth::{AuthContext, AuthState, use_auth, use_auth_provider};
