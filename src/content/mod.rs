//! Served content: templates, static assets, and localized strings.

pub mod assets;
pub mod strings;
pub mod templates;

pub use assets::{AssetProvider, EmbeddedAssets};
pub use strings::{EnglishStrings, LocalizedText, Localizer};
pub use templates::ServedContent;
