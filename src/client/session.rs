//! Session persistence in browser storage.
//!
//! Two records survive page loads:
//! 1. **Pending login**: PKCE verifier and CSRF state, written right before
//!    the redirect to the authorization endpoint and consumed on the callback.
//! 2. **Session**: the tokens returned by the token endpoint, restored on load.
//!
//! Both are stored as JSON under keys prefixed with
//! [`AuthConfig::storage_key_prefix`](crate::AuthConfig).
//!
//! ## Security Considerations
//!
//! - Web storage is readable by any script on the origin; keep tokens short-lived
//! - `StorageKind::Session` limits exposure to the current tab
//! - Always use HTTPS outside local development

use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, StorageKind};
use crate::error::AuthError;

const SESSION_KEY: &str = "session";
const PENDING_LOGIN_KEY: &str = "pending_login";

/// Tokens of an established session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Unix timestamp the access token expires at, if the provider said so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Unix timestamp the refresh token expires at, if the provider said so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<i64>,
}

impl StoredSession {
    /// Checks if the access token is expired at `now`.
    ///
    /// A session without a known expiry never expires on the client side.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Checks if the access token expires within `leeway` seconds.
    pub fn needs_refresh(&self, now: i64, leeway: i64) -> bool {
        self.expires_at.is_some_and(|exp| now + leeway >= exp)
    }

    /// Returns true if a refresh token is present and not known to be expired.
    pub fn can_refresh(&self, now: i64) -> bool {
        self.refresh_token.is_some() && self.refresh_expires_at.is_none_or(|exp| now < exp)
    }

    /// Merges a refreshed session into this one.
    ///
    /// Providers may omit the ID token or refresh token from a refresh
    /// response; the previous values stay in place then.
    pub fn merge_refreshed(self, refreshed: StoredSession) -> StoredSession {
        let keeps_refresh_token = refreshed.refresh_token.is_none();
        StoredSession {
            access_token: refreshed.access_token,
            id_token: refreshed.id_token.or(self.id_token),
            refresh_token: refreshed.refresh_token.or(self.refresh_token),
            expires_at: refreshed.expires_at,
            refresh_expires_at: if keeps_refresh_token {
                self.refresh_expires_at
            } else {
                refreshed.refresh_expires_at
            },
        }
    }
}

/// State kept between the redirect to the provider and the callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// PKCE code verifier secret.
    pub code_verifier: String,
    /// CSRF `state` sent with the authorization request.
    pub state: String,
}

/// Minimal key/value interface over browser storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;
    fn remove(&self, key: &str);
}

/// `localStorage` or `sessionStorage` of the current window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrowserStorage {
    kind: StorageKind,
}

impl BrowserStorage {
    pub fn new(kind: StorageKind) -> Self {
        Self { kind }
    }

    #[cfg(target_arch = "wasm32")]
    fn storage(&self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        match self.kind {
            StorageKind::Local => window.local_storage().ok()?,
            StorageKind::Session => window.session_storage().ok()?,
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let storage = self
            .storage()
            .ok_or_else(|| AuthError::Storage(format!("{:?} storage unavailable", self.kind)))?;
        storage
            .set_item(key, value)
            .map_err(|e| AuthError::Storage(format!("failed to write {}: {:?}", key, e)))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Non-WASM stub: nothing is ever persisted.
#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for BrowserStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), AuthError> {
        tracing::trace!(
            "Skipping write of {} to {:?} storage (non-WASM)",
            key,
            self.kind
        );
        Ok(())
    }

    fn remove(&self, _key: &str) {}
}

/// Reads and writes the client's records in a [`KeyValueStore`].
#[derive(Clone, Debug)]
pub struct SessionStore<S = BrowserStorage> {
    backend: S,
    prefix: String,
}

impl SessionStore<BrowserStorage> {
    /// Opens the browser storage selected by the configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            BrowserStorage::new(config.storage),
            &config.storage_key_prefix,
        )
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn load_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Option<T> {
        let key = self.key(name);
        let raw = self.backend.get(&key)?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding unreadable {}: {}", key, e);
                self.backend.remove(&key);
                None
            }
        }
    }

    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), AuthError> {
        let json = serde_json::to_string(value)
            .map_err(|e| AuthError::Storage(format!("failed to serialize {}: {}", name, e)))?;
        self.backend.set(&self.key(name), &json)
    }

    /// Loads the stored session, if any.
    pub fn load(&self) -> Option<StoredSession> {
        self.load_json(SESSION_KEY)
    }

    pub fn save(&self, session: &StoredSession) -> Result<(), AuthError> {
        tracing::trace!("Persisting session");
        self.save_json(SESSION_KEY, session)
    }

    /// Removes the session and any pending login.
    pub fn clear(&self) {
        tracing::trace!("Clearing stored session");
        self.backend.remove(&self.key(SESSION_KEY));
        self.backend.remove(&self.key(PENDING_LOGIN_KEY));
    }

    pub fn save_pending(&self, pending: &PendingLogin) -> Result<(), AuthError> {
        self.save_json(PENDING_LOGIN_KEY, pending)
    }

    /// Returns the pending login and removes it, so a callback is handled once.
    pub fn take_pending(&self) -> Option<PendingLogin> {
        let pending = self.load_json(PENDING_LOGIN_KEY);
        self.backend.remove(&self.key(PENDING_LOGIN_KEY));
        pending
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory backend standing in for web storage.
    #[derive(Default)]
    pub(crate) struct MemoryStorage {
        entries: RefCell<HashMap<String, String>>,
    }

    impl KeyValueStore for MemoryStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
            self.entries
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) {
            self.entries.borrow_mut().remove(key);
        }
    }

    fn session(expires_at: Option<i64>) -> StoredSession {
        StoredSession {
            access_token: "access".to_string(),
            id_token: Some("id".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at,
            refresh_expires_at: Some(2_000),
        }
    }

    #[test]
    fn test_is_expired() {
        let s = session(Some(1_000));
        assert!(!s.is_expired(999));
        assert!(s.is_expired(1_000));
        assert!(s.is_expired(1_001));
    }

    #[test]
    fn test_unknown_expiry_never_expires() {
        let s = session(None);
        assert!(!s.is_expired(i64::MAX));
        assert!(!s.needs_refresh(i64::MAX - 100, 30));
    }

    #[test]
    fn test_needs_refresh_within_leeway() {
        let s = session(Some(1_000));
        assert!(!s.needs_refresh(960, 30));
        assert!(s.needs_refresh(970, 30));
    }

    #[test]
    fn test_can_refresh() {
        let s = session(Some(1_000));
        assert!(s.can_refresh(1_500));
        assert!(!s.can_refresh(2_000));

        let without_expiry = StoredSession {
            refresh_expires_at: None,
            ..session(Some(1_000))
        };
        assert!(without_expiry.can_refresh(i64::MAX));

        let without_token = StoredSession {
            refresh_token: None,
            ..session(Some(1_000))
        };
        assert!(!without_token.can_refresh(0));
    }

    #[test]
    fn test_merge_refreshed_keeps_missing_tokens() {
        let refreshed = StoredSession {
            access_token: "access2".to_string(),
            id_token: None,
            refresh_token: None,
            expires_at: Some(3_000),
            refresh_expires_at: None,
        };

        let merged = session(Some(1_000)).merge_refreshed(refreshed);

        assert_eq!(merged.access_token, "access2");
        assert_eq!(merged.id_token.as_deref(), Some("id"));
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(merged.expires_at, Some(3_000));
        assert_eq!(merged.refresh_expires_at, Some(2_000));
    }

    #[test]
    fn test_merge_refreshed_takes_new_refresh_token() {
        let refreshed = StoredSession {
            access_token: "access2".to_string(),
            id_token: Some("id2".to_string()),
            refresh_token: Some("refresh2".to_string()),
            expires_at: Some(3_000),
            refresh_expires_at: Some(5_000),
        };

        let merged = session(Some(1_000)).merge_refreshed(refreshed.clone());
        assert_eq!(merged, refreshed);
    }

    #[test]
    fn test_store_session() {
        let store = SessionStore::new(MemoryStorage::default(), "test_");
        assert!(store.load().is_none());

        let s = session(Some(1_000));
        store.save(&s).unwrap();
        assert_eq!(store.load(), Some(s));
        assert!(store.backend.get("test_session").is_some());

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_pending_login_is_taken_once() {
        let store = SessionStore::new(MemoryStorage::default(), "test_");
        let pending = PendingLogin {
            code_verifier: "verifier".to_string(),
            state: "state".to_string(),
        };

        store.save_pending(&pending).unwrap();
        assert_eq!(store.take_pending(), Some(pending));
        assert!(store.take_pending().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_discarded() {
        let store = SessionStore::new(MemoryStorage::default(), "test_");
        store.backend.set("test_session", "{not json").unwrap();

        assert!(store.load().is_none());
        assert!(store.backend.get("test_session").is_none());
    }

    #[test]
    fn test_session_json_omits_missing_fields() {
        let s = StoredSession {
            access_token: "a".to_string(),
            id_token: None,
            refresh_token: None,
            expires_at: None,
            refresh_expires_at: None,
        };
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"access_token":"a"}"#);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_browser_storage_is_empty_on_native() {
        let store = SessionStore::from_config(&AuthConfig::default());
        assert!(store.save(&session(None)).is_ok());
        assert!(store.load().is_none());
    }
}
