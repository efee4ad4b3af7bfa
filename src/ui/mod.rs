//! Components of the single-page client.
//!
//! Styling uses Tailwind utility classes; `index.html` loads the stylesheet.

mod alert;
mod app;
pub mod format;
mod icons;
mod login;
mod profile;

pub use alert::ErrorAlert;
pub use app::App;
pub use icons::{Icon, IconKind};
pub use login::LoginCard;
pub use profile::ProfileCard;
