//! Parsing of the redirect back from the identity provider.

use oauth2::url::Url;

use crate::error::AuthError;

/// Query parameters the provider may append to the redirect URI.
const CALLBACK_PARAMS: [&str; 6] = [
    "code",
    "state",
    "session_state",
    "iss",
    "error",
    "error_description",
];

/// Query parameters received on the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code, on success.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authentication failed.
    pub error: Option<String>,
    /// Error description if authentication failed.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Extracts callback parameters from a URL.
    ///
    /// Returns `None` when the URL carries neither `code` nor `error`, i.e.
    /// it is a normal page load rather than a callback.
    pub fn from_url(url: &Url) -> Option<Self> {
        let mut params = Self::default();

        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }

        (params.code.is_some() || params.error.is_some()).then_some(params)
    }

    /// Returns the error the provider reported instead of a code, if any.
    pub fn provider_error(&self) -> Option<AuthError> {
        self.error
            .as_ref()
            .map(|error| AuthError::provider(error.clone(), self.error_description.clone()))
    }

    /// Returns the authorization code after checking the provider's answer.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Provider`] if the provider reported an error
    /// - [`AuthError::StateMismatch`] if `state` differs from `expected_state`
    pub fn authorization_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(err) = self.provider_error() {
            return Err(err);
        }

        if self.state.as_deref() != Some(expected_state) {
            tracing::error!(
                "State mismatch - expected: {}, received: {:?}",
                expected_state,
                self.state
            );
            return Err(AuthError::StateMismatch);
        }

        self.code
            .ok_or_else(|| AuthError::provider("invalid_request", Some("missing code".to_string())))
    }
}

/// Removes OAuth callback parameters from a URL, keeping everything else.
pub fn strip_callback_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !CALLBACK_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut clean = url.clone();
    clean.set_fragment(None);
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_plain_page_load_is_not_a_callback() {
        assert!(CallbackParams::from_url(&url("http://localhost:5173/")).is_none());
        assert!(CallbackParams::from_url(&url("http://localhost:5173/?tab=1")).is_none());
    }

    #[test]
    fn test_successful_callback() {
        let params = CallbackParams::from_url(&url(
            "http://localhost:5173/?state=abc&session_state=s1&iss=http%3A%2F%2Fkc&code=xyz",
        ))
        .unwrap();

        assert_eq!(params.code.as_deref(), Some("xyz"));
        assert_eq!(params.state.as_deref(), Some("abc"));
        assert_eq!(params.authorization_code("abc").unwrap(), "xyz");
    }

    #[test]
    fn test_state_mismatch() {
        let params = CallbackParams::from_url(&url("http://localhost:5173/?state=abc&code=xyz"))
            .unwrap();
        assert_eq!(
            params.authorization_code("other"),
            Err(AuthError::StateMismatch)
        );
    }

    #[test]
    fn test_missing_state_is_a_mismatch() {
        let params = CallbackParams::from_url(&url("http://localhost:5173/?code=xyz")).unwrap();
        assert_eq!(
            params.authorization_code("abc"),
            Err(AuthError::StateMismatch)
        );
    }

    #[test]
    fn test_provider_error() {
        let params = CallbackParams::from_url(&url(
            "http://localhost:5173/?error=access_denied&error_description=User+denied+access&state=abc",
        ))
        .unwrap();

        let err = params.authorization_code("abc").unwrap_err();
        assert_eq!(err.to_string(), "access_denied: User denied access");
    }

    #[test]
    fn test_provider_error_without_description() {
        let params =
            CallbackParams::from_url(&url("http://localhost:5173/?error=login_required")).unwrap();
        assert_eq!(
            params.provider_error(),
            Some(AuthError::provider("login_required", None))
        );

        let success = CallbackParams::from_url(&url("http://localhost:5173/?code=xyz")).unwrap();
        assert!(success.provider_error().is_none());
    }

    #[test]
    fn test_strip_callback_params() {
        let clean = strip_callback_params(&url(
            "http://localhost:5173/app?state=abc&tab=2&code=xyz&session_state=s1",
        ));
        assert_eq!(clean.as_str(), "http://localhost:5173/app?tab=2");
    }

    #[test]
    fn test_strip_all_params() {
        let clean = strip_callback_params(&url("http://localhost:5173/?code=xyz&state=abc#frag"));
        assert_eq!(clean.as_str(), "http://localhost:5173/");
    }
}
