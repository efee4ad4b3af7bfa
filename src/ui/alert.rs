use dioxus::prelude::*;

use crate::ui::icons::{Icon, IconKind};

/// Red banner showing the current login error.
#[component]
pub fn ErrorAlert(message: String) -> Element {
    rsx! {
        div { class: "mb-4 bg-red-50 border border-red-200 rounded-lg p-4 flex items-start gap-3",
            Icon { kind: IconKind::AlertCircle, class: "w-5 h-5 text-red-600 flex-shrink-0 mt-0.5" }
            div {
                h3 { class: "font-semibold text-red-900", "Error" }
                p { class: "text-sm text-red-700", "{message}" }
            }
        }
    }
}
