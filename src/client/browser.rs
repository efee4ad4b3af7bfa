//! Thin wrappers over the browser APIs the login flow needs.
//!
//! On `wasm32` these call into `web-sys`. On native targets they are stubs so
//! the rest of the crate (and its tests) builds and runs on the host.

use std::time::Duration;

use crate::error::AuthError;

/// Returns the full URL currently shown in the address bar.
#[cfg(target_arch = "wasm32")]
pub fn current_url() -> Option<String> {
    web_sys::window()?.location().href().ok()
}

/// Non-WASM stub for current_url.
#[cfg(not(target_arch = "wasm32"))]
pub fn current_url() -> Option<String> {
    None
}

/// Sends the browser to another page.
#[cfg(target_arch = "wasm32")]
pub fn navigate(url: &str) -> Result<(), AuthError> {
    let window = web_sys::window().ok_or_else(|| AuthError::Browser("no window".to_string()))?;
    window
        .location()
        .set_href(url)
        .map_err(|e| AuthError::Browser(format!("failed to navigate: {:?}", e)))?;
    tracing::trace!("Navigating to {}", url);
    Ok(())
}

/// Non-WASM stub for navigate.
#[cfg(not(target_arch = "wasm32"))]
pub fn navigate(url: &str) -> Result<(), AuthError> {
    tracing::warn!("Navigation to {} not supported in non-WASM builds", url);
    Err(AuthError::Browser(
        "navigation requires a browser".to_string(),
    ))
}

/// Replaces the current history entry without reloading the page.
#[cfg(target_arch = "wasm32")]
pub fn replace_url(url: &str) {
    let replaced = web_sys::window()
        .and_then(|w| w.history().ok())
        .map(|history| history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(url)));

    if !matches!(replaced, Some(Ok(()))) {
        tracing::warn!("Failed to replace history entry with {}", url);
    }
}

/// Non-WASM stub for replace_url.
#[cfg(not(target_arch = "wasm32"))]
pub fn replace_url(_url: &str) {}

/// Writes text to the system clipboard.
#[cfg(target_arch = "wasm32")]
pub async fn copy_to_clipboard(text: &str) -> Result<(), AuthError> {
    let window = web_sys::window().ok_or_else(|| AuthError::Browser("no window".to_string()))?;
    let promise = window.navigator().clipboard().write_text(text);

    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| AuthError::Browser(format!("clipboard write rejected: {:?}", e)))?;

    Ok(())
}

/// Non-WASM stub for copy_to_clipboard.
#[cfg(not(target_arch = "wasm32"))]
pub async fn copy_to_clipboard(_text: &str) -> Result<(), AuthError> {
    Err(AuthError::Browser("clipboard requires a browser".to_string()))
}

/// Waits without blocking the event loop.
#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    gloo_timers::future::TimeoutFuture::new(millis).await;
}

/// Non-WASM stub for sleep: returns immediately.
#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(_duration: Duration) {}

/// Returns the current Unix timestamp in seconds.
pub fn now_unix() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Date::now() / 1000.0) as i64
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_unix() {
        // Should be a reasonable timestamp (after 2020)
        assert!(now_unix() > 1_600_000_000);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_current_url_is_none_outside_browser() {
        assert!(current_url().is_none());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_navigate_fails_outside_browser() {
        assert!(matches!(
            navigate("http://localhost:5173"),
            Err(AuthError::Browser(_))
        ));
    }
}
