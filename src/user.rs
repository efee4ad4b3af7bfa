//! User profile shown in the header of the authenticated view.
//!
//! The profile is derived from the ID token claims when present and from the
//! access token claims otherwise, mirroring what Keycloak puts in each.

use serde::{Deserialize, Serialize};

use crate::claims::TokenData;

/// Name shown when neither `preferred_username` nor `name` is present.
pub const FALLBACK_USERNAME: &str = "User";

/// Display data for the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// `preferred_username`, then `name`, then [`FALLBACK_USERNAME`].
    pub username: String,

    /// User's email address, if the `email` scope was granted.
    pub email: Option<String>,
}

impl UserProfile {
    /// Builds the profile from the decoded tokens.
    ///
    /// The ID token wins when available; the access token is only used when
    /// no ID token claims were decoded.
    ///
    /// # Example
    ///
    /// ```
    /// # use keycloak_pkce::UserProfile;
    /// let profile = UserProfile::from_claims(None, None);
    /// assert_eq!(profile.username, "User");
    /// assert_eq!(profile.initial(), 'U');
    /// ```
    pub fn from_claims(id_token_data: Option<&TokenData>, token_data: Option<&TokenData>) -> Self {
        let Some(info) = id_token_data.or(token_data) else {
            return Self {
                username: FALLBACK_USERNAME.to_string(),
                email: None,
            };
        };

        let username = info
            .preferred_username()
            .or_else(|| info.name())
            .unwrap_or(FALLBACK_USERNAME)
            .to_string();

        Self {
            username,
            email: info.email().map(str::to_string),
        }
    }

    /// Returns the upper-cased first letter of the username, for the avatar.
    pub fn initial(&self) -> char {
        self.username
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('?')
    }
}
