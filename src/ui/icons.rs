//! Inline SVG icons (Lucide outlines).

use dioxus::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IconKind {
    LogIn,
    LogOut,
    Shield,
    Mail,
    Key,
    Copy,
    Check,
    AlertCircle,
}

impl IconKind {
    /// Path data on a 24x24 grid.
    fn paths(self) -> &'static [&'static str] {
        match self {
            IconKind::LogIn => &[
                "M15 3h4a2 2 0 0 1 2 2v14a2 2 0 0 1-2 2h-4",
                "M10 17l5-5-5-5",
                "M15 12H3",
            ],
            IconKind::LogOut => &[
                "M9 21H5a2 2 0 0 1-2-2V5a2 2 0 0 1 2-2h4",
                "M16 17l5-5-5-5",
                "M21 12H9",
            ],
            IconKind::Shield => &["M12 22s8-4 8-10V5l-8-3-8 3v7c0 6 8 10 8 10z"],
            IconKind::Mail => &[
                "M4 4h16a2 2 0 0 1 2 2v12a2 2 0 0 1-2 2H4a2 2 0 0 1-2-2V6a2 2 0 0 1 2-2z",
                "M22 7l-8.97 5.7a1.94 1.94 0 0 1-2.06 0L2 7",
            ],
            IconKind::Key => &[
                "M2 15.5a5.5 5.5 0 1 0 11 0a5.5 5.5 0 1 0-11 0",
                "M21 2l-9.6 9.6",
                "M15.5 7.5l3 3L22 7l-3-3",
            ],
            IconKind::Copy => &[
                "M10 8h10a2 2 0 0 1 2 2v10a2 2 0 0 1-2 2H10a2 2 0 0 1-2-2V10a2 2 0 0 1 2-2z",
                "M4 16c-1.1 0-2-.9-2-2V4c0-1.1.9-2 2-2h10c1.1 0 2 .9 2 2",
            ],
            IconKind::Check => &["M20 6L9 17l-5-5"],
            IconKind::AlertCircle => &[
                "M2 12a10 10 0 1 0 20 0a10 10 0 1 0-20 0",
                "M12 8v4",
                "M12 16h.01",
            ],
        }
    }
}

#[component]
pub fn Icon(kind: IconKind, class: &'static str) -> Element {
    rsx! {
        svg {
            class: "{class}",
            view_box: "0 0 24 24",
            fill: "none",
            stroke: "currentColor",
            stroke_width: "2",
            stroke_linecap: "round",
            stroke_linejoin: "round",
            for d in kind.paths() {
                path { d: "{d}" }
            }
        }
    }
}
