use dioxus::prelude::*;

use crate::client::use_auth_provider;
use crate::config::AuthConfig;
use crate::ui::alert::ErrorAlert;
use crate::ui::icons::{Icon, IconKind};
use crate::ui::login::LoginCard;
use crate::ui::profile::ProfileCard;

/// Root component: installs the auth context and picks the card to show.
#[component]
pub fn App() -> Element {
    let auth = use_auth_provider(AuthConfig::from_env_or_default());
    let mut login_error = use_signal(|| None::<String>);

    use_effect(move || {
        tracing::debug!(
            is_loading = auth.is_loading(),
            is_authenticated = auth.is_authenticated(),
            has_token = auth.token().is_some(),
            login_available = auth.login_available(),
            "Auth state changed"
        );
    });

    // Provider and exchange failures surface through the same alert as login errors.
    use_effect(move || {
        if let Some(err) = auth.error() {
            tracing::error!("Auth context error: {}", err);
            login_error.set(Some(err));
        }
    });

    if auth.is_loading() {
        return rsx! {
            div { class: "min-h-screen bg-gradient-to-br from-blue-50 to-indigo-100 flex items-center justify-center",
                div { class: "text-center",
                    div { class: "w-12 h-12 border-4 border-blue-600 border-t-transparent rounded-full animate-spin mx-auto mb-4" }
                    p { class: "text-gray-600", "Loading..." }
                }
            }
        };
    }

    let error_message = login_error();

    rsx! {
        div { class: "min-h-screen bg-gradient-to-br from-blue-50 to-indigo-100 p-8",
            div { class: "max-w-4xl mx-auto",
                div { class: "text-center mb-8",
                    div { class: "flex items-center justify-center gap-3 mb-4",
                        Icon { kind: IconKind::Shield, class: "w-12 h-12 text-blue-600" }
                        h1 { class: "text-4xl font-bold text-gray-800", "Keycloak Auth" }
                    }
                    p { class: "text-gray-600", "OAuth2 with PKCE Flow" }
                }

                if let Some(message) = error_message {
                    ErrorAlert { message }
                }

                div { class: "bg-white rounded-2xl shadow-xl overflow-hidden",
                    if auth.is_authenticated() {
                        ProfileCard { login_error }
                    } else {
                        LoginCard { login_error }
                    }
                }

                div { class: "mt-8 text-center text-sm text-gray-600",
                    p { "Powered by Keycloak & keycloak-pkce" }
                }
            }
        }
    }
}
