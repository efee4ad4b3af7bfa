use std::time::Duration;

use dioxus::prelude::*;

use crate::claims::TokenData;
use crate::client::{browser, use_auth};
use crate::ui::format::{issued_at, time_remaining, toggle_label, token_preview};
use crate::ui::icons::{Icon, IconKind};
use crate::user::UserProfile;

/// How long the copy button shows its check mark.
const COPIED_RESET: Duration = Duration::from_millis(2000);

/// Card shown to a signed-in user.
#[component]
pub fn ProfileCard(login_error: Signal<Option<String>>) -> Element {
    let auth = use_auth();
    let mut login_error = login_error;

    let profile = UserProfile::from_claims(
        auth.id_token_data().as_ref(),
        auth.token_data().as_ref(),
    );
    let initial = profile.initial();
    let username = profile.username.clone();

    let handle_logout = move |_: MouseEvent| {
        tracing::debug!("Logout button clicked");

        // Built before the session is cleared so the ID token can be sent as hint.
        let logout_url = auth.logout_url();
        auth.log_out();

        let result = logout_url.and_then(|url| {
            tracing::info!("Redirecting to: {}", url);
            browser::navigate(url.as_str())
        });
        if let Err(err) = result {
            tracing::error!("Logout error: {}", err);
            login_error.set(Some(err.to_string()));
        }
    };

    rsx! {
        div {
            div { class: "bg-gradient-to-r from-blue-600 to-indigo-600 p-8 text-white",
                div { class: "flex items-center justify-between",
                    div { class: "flex items-center gap-4",
                        div { class: "w-16 h-16 bg-white/20 rounded-full flex items-center justify-center text-2xl font-bold",
                            "{initial}"
                        }
                        div {
                            h2 { class: "text-2xl font-bold", "{username}" }
                            if let Some(email) = profile.email.as_deref() {
                                div { class: "flex items-center gap-2 mt-1 text-blue-100",
                                    Icon { kind: IconKind::Mail, class: "w-4 h-4" }
                                    "{email}"
                                }
                            }
                        }
                    }
                    button {
                        class: "bg-white/20 hover:bg-white/30 px-4 py-2 rounded-lg transition-colors flex items-center gap-2",
                        onclick: handle_logout,
                        Icon { kind: IconKind::LogOut, class: "w-4 h-4" }
                        "Logout"
                    }
                }
            }

            div { class: "p-8 space-y-6",
                TokenStatus {}
                TokenDetails {}
            }
        }
    }
}

/// Current unix time, ticking every second in the browser.
fn use_clock() -> Signal<i64> {
    let now = use_signal(browser::now_unix);

    #[cfg(target_arch = "wasm32")]
    {
        let mut now = now;
        use_future(move || async move {
            loop {
                browser::sleep(Duration::from_secs(1)).await;
                now.set(browser::now_unix());
            }
        });
    }

    now
}

#[component]
fn TokenStatus() -> Element {
    let auth = use_auth();
    let now = use_clock();
    let mut copied = use_signal(|| false);

    let token = auth.token().unwrap_or_default();
    let preview = token_preview(&token);
    let token_data = auth.token_data();
    let remaining = token_data
        .as_ref()
        .and_then(TokenData::exp)
        .map(|exp| time_remaining(exp, now()));
    let issued = token_data.as_ref().and_then(TokenData::iat).map(issued_at);
    let scopes: Vec<String> = token_data
        .as_ref()
        .map(|data| data.scopes().into_iter().map(str::to_string).collect())
        .unwrap_or_default();

    let copy_token = move |_: MouseEvent| {
        let token = token.clone();
        async move {
            match browser::copy_to_clipboard(&token).await {
                Ok(()) => {
                    copied.set(true);
                    browser::sleep(COPIED_RESET).await;
                    copied.set(false);
                }
                Err(err) => tracing::warn!("Failed to copy token: {}", err),
            }
        }
    };

    rsx! {
        div {
            div { class: "flex items-center gap-2 mb-3",
                Icon { kind: IconKind::Key, class: "w-5 h-5 text-gray-700" }
                h3 { class: "text-lg font-semibold", "Token Status" }
            }
            div { class: "bg-gray-50 rounded-lg p-4 space-y-3",
                div { class: "flex justify-between items-center",
                    span { class: "text-sm text-gray-600", "Access Token:" }
                    div { class: "flex items-center gap-2",
                        code { class: "text-xs bg-white px-2 py-1 rounded border", "{preview}" }
                        button { class: "p-1 hover:bg-gray-200 rounded", onclick: copy_token,
                            if copied() {
                                Icon { kind: IconKind::Check, class: "w-4 h-4 text-green-600" }
                            } else {
                                Icon { kind: IconKind::Copy, class: "w-4 h-4" }
                            }
                        }
                    }
                }

                if let Some(remaining) = remaining {
                    div { class: "flex justify-between items-center",
                        span { class: "text-sm text-gray-600", "Time Remaining:" }
                        span { class: "text-sm font-semibold text-blue-600", "{remaining}" }
                    }
                }

                if let Some(issued) = issued {
                    div { class: "flex justify-between items-center",
                        span { class: "text-sm text-gray-600", "Issued At:" }
                        span { class: "text-sm", "{issued}" }
                    }
                }

                if !scopes.is_empty() {
                    div {
                        span { class: "text-sm text-gray-600 block mb-2", "Scopes:" }
                        div { class: "flex flex-wrap gap-2",
                            for (i, scope) in scopes.iter().enumerate() {
                                span {
                                    key: "{i}",
                                    class: "text-xs bg-blue-100 text-blue-700 px-2 py-1 rounded-full",
                                    "{scope}"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn TokenDetails() -> Element {
    let auth = use_auth();
    let mut show_token = use_signal(|| false);

    let label = toggle_label(show_token());
    let details = auth
        .token_data()
        .filter(|_| show_token())
        .map(|data| data.to_pretty_json());

    rsx! {
        div {
            button {
                class: "text-blue-600 hover:text-blue-700 font-medium text-sm flex items-center gap-2",
                onclick: move |_| show_token.set(!show_token()),
                "{label} Token Details"
            }

            if let Some(details) = details {
                pre { class: "mt-3 bg-gray-900 text-green-400 p-4 rounded-lg overflow-auto text-xs max-h-80",
                    "{details}"
                }
            }
        }
    }
}
