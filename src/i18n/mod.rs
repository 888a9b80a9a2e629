//! Localization: dictionary, node directives and the live localizer.

mod dictionary;
pub mod directive;
mod localizer;

pub use dictionary::Dictionary;
pub use localizer::{Localizer, LocalizerStats};
