//! Localized strings substituted into the served pages.

/// Keys for the user-visible strings the pages need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizedText {
    /// Prompt shown above the PIN input field.
    EnterPin,
    /// Label of the PIN submit button.
    SubmitPin,
    /// Message shown after a wrong PIN was submitted.
    WrongPin,
}

/// Lookup of user-visible strings in the application's active locale.
pub trait Localizer: Send + Sync {
    /// Resolve one string.
    fn lookup(&self, text: LocalizedText) -> String;
}

/// Built-in English strings.
#[derive(Debug, Default)]
pub struct EnglishStrings;

impl Localizer for EnglishStrings {
    fn lookup(&self, text: LocalizedText) -> String {
        match text {
            LocalizedText::EnterPin => "Enter PIN".to_string(),
            LocalizedText::SubmitPin => "Connect".to_string(),
            LocalizedText::WrongPin => "Wrong PIN".to_string(),
        }
    }
}
