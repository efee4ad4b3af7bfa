//! Decoded token claims.
//!
//! Access and ID tokens issued by Keycloak are JWTs. The view only reads a
//! handful of claims from them, so the payload is kept as an open JSON object
//! with typed accessors for the claims that matter. Signatures are never
//! checked here; the tokens come straight from the token endpoint.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Claims of a decoded JWT payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenData(Map<String, Value>);

impl TokenData {
    /// Wraps an already parsed claims object.
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Returns a claim by name.
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    fn get_str(&self, claim: &str) -> Option<&str> {
        self.0
            .get(claim)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn get_timestamp(&self, claim: &str) -> Option<i64> {
        let value = self.0.get(claim)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.floor() as i64))
    }

    /// Expiration time (`exp`), in unix seconds.
    pub fn exp(&self) -> Option<i64> {
        self.get_timestamp("exp")
    }

    /// Issued-at time (`iat`), in unix seconds.
    pub fn iat(&self) -> Option<i64> {
        self.get_timestamp("iat")
    }

    /// Raw `scope` claim.
    pub fn scope(&self) -> Option<&str> {
        self.get_str("scope")
    }

    /// Granted scopes, in the order the provider listed them.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope()
            .map(|scope| scope.split(' ').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.get_str("preferred_username")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Subject (`sub`).
    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Renders the claims as indented JSON for the details panel.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Decodes the payload of a JWT into its claims.
///
/// This performs basic JWT parsing without signature verification.
///
/// # Errors
///
/// Returns [`AuthError::TokenDecode`] if the token does not have three parts,
/// the payload is not base64url, or the payload is not a JSON object.
///
/// # Example
///
/// ```
/// # use keycloak_pkce::claims::decode_token_data;
/// // {"sub":"42","scope":"openid email"}
/// let jwt = "e30.eyJzdWIiOiI0MiIsInNjb3BlIjoib3BlbmlkIGVtYWlsIn0.sig";
/// let data = decode_token_data(jwt).unwrap();
/// assert_eq!(data.sub(), Some("42"));
/// assert_eq!(data.scopes(), ["openid", "email"]);
/// ```
pub fn decode_token_data(token: &str) -> Result<TokenData, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        tracing::warn!("Invalid JWT format: expected 3 parts, got {}", parts.len());
        return Err(AuthError::TokenDecode(
            "JWT must have 3 parts separated by dots".to_string(),
        ));
    }

    // Some issuers pad the payload even though base64url in JWTs should not.
    let payload = parts[1].trim_end_matches('=');

    let decoded_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::TokenDecode(format!("payload is not base64url: {}", e)))?;

    let claims: Map<String, Value> = serde_json::from_slice(&decoded_bytes)
        .map_err(|e| AuthError::TokenDecode(format!("payload is not a JSON object: {}", e)))?;

    tracing::trace!("Decoded JWT with {} claims", claims.len());

    Ok(TokenData(claims))
}
