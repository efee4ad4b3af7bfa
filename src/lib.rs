//! # keycloak-pkce
//!
//! A single-page Dioxus client that signs users in against Keycloak with the
//! OAuth2 Authorization Code flow and PKCE, then shows who they are and what
//! their access token contains.
//!
//! ## Overview
//!
//! - **Shared types** (`AuthConfig`, `AuthError`, `TokenData`, `UserProfile`)
//! - **Client** - the `oauth2`-driven login flow, session storage in the
//!   browser, and the `use_auth` context the view reads from
//! - **UI** - the login and profile cards rendered by [`ui::App`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keycloak_pkce::AuthConfig;
//! use keycloak_pkce::client::{use_auth, use_auth_provider};
//!
//! #[component]
//! fn App() -> Element {
//!     use_auth_provider(AuthConfig::from_env_or_default());
//!     rsx! { Profile {} }
//! }
//!
//! #[component]
//! fn Profile() -> Element {
//!     let auth = use_auth();
//!     rsx! { "Signed in: {auth.is_authenticated()}" }
//! }
//! ```
//!
//! ## Configuration
//!
//! `build.rs` reads the `OIDC_*` keys from the environment or from `.env`
//! (falling back to `.env.example`) at compile time. See `.env.example`.
//!
//! ## Platform Compatibility
//!
//! Browser access (`window.location`, `localStorage`, the clipboard, timers)
//! only exists on `wasm32`. Native builds get stubs so the pure logic can be
//! tested on the host.

pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod ui;
pub mod user;

pub use claims::TokenData;
pub use config::{AuthConfig, RefreshExpiredAction, StorageKind};
pub use error::AuthError;
pub use user::UserProfile;
