use dioxus::prelude::*;

use crate::client::use_auth;
use crate::ui::format::{check_mark, presence};
use crate::ui::icons::{Icon, IconKind};

/// Card shown while nobody is signed in.
#[component]
pub fn LoginCard(login_error: Signal<Option<String>>) -> Element {
    let auth = use_auth();
    let mut login_error = login_error;

    let handle_login = move |_: MouseEvent| async move {
        tracing::debug!("Login button clicked");
        login_error.set(None);

        if let Err(err) = auth.log_in().await {
            tracing::error!("Login error: {}", err);
            login_error.set(Some(err.to_string()));
        }
    };

    let login_available = check_mark(auth.login_available());
    let authenticated = check_mark(auth.is_authenticated());
    let token = presence(auth.token().is_some());

    rsx! {
        div { class: "p-12 text-center",
            div { class: "w-20 h-20 bg-blue-100 rounded-full flex items-center justify-center mx-auto mb-6",
                Icon { kind: IconKind::LogIn, class: "w-10 h-10 text-blue-600" }
            }
            h2 { class: "text-2xl font-semibold mb-2", "Welcome Back" }
            p { class: "text-gray-600 mb-8", "Sign in to continue" }
            button {
                class: "bg-blue-600 hover:bg-blue-700 text-white font-semibold px-8 py-3 rounded-lg transition-colors flex items-center gap-2 mx-auto",
                onclick: handle_login,
                Icon { kind: IconKind::LogIn, class: "w-5 h-5" }
                "Sign in with Keycloak"
            }

            div { class: "mt-8 text-left bg-gray-50 rounded-lg p-4",
                p { class: "text-xs font-mono text-gray-600", "Debug Info:" }
                p { class: "text-xs font-mono", "logIn available: {login_available}" }
                p { class: "text-xs font-mono", "isAuthenticated: {authenticated}" }
                p { class: "text-xs font-mono", "token: {token}" }
            }
        }
    }
}
