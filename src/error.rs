//! Error type shared by the authentication flow and the view.
//!
//! Every failure the user can run into is flattened into one message by the
//! view, so the variants carry display-ready text rather than source errors.

/// Errors raised while starting, completing or ending a login.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The OAuth client could not be built, so `log_in` cannot run.
    #[error("logIn function not available: {0}")]
    LoginUnavailable(String),

    /// A configuration value is missing or malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The identity provider answered with an OAuth error.
    #[error("{error}{}", .description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Provider {
        error: String,
        description: Option<String>,
    },

    /// The `state` returned on the callback does not match the one we sent.
    #[error("State parameter mismatch, the login response was rejected")]
    StateMismatch,

    /// A callback arrived but no login was started from this browser.
    #[error("No pending login found for this callback")]
    MissingPendingLogin,

    /// The token endpoint could not be reached or returned garbage.
    #[error("Token request failed: {0}")]
    TokenRequest(String),

    /// A token could not be decoded into claims.
    #[error("Failed to decode token: {0}")]
    TokenDecode(String),

    /// A browser API (window, location, clipboard) is not available.
    #[error("Browser API unavailable: {0}")]
    Browser(String),

    /// Reading or writing browser storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthError {
    pub(crate) fn provider(error: impl Into<String>, description: Option<String>) -> Self {
        Self::Provider {
            error: error.into(),
            description: description.filter(|d| !d.is_empty()),
        }
    }
}
