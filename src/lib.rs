pub mod error;
pub mod locale;
pub mod orm;
pub mod settings;
pub mod translatable;
pub mod translation;
pub mod translator;

pub use error::{Result, TranslateError};
pub use locale::{Locale, LocaleProvider};
pub use settings::Settings;
pub use translatable::{Translatable, TranslationMap};
pub use translation::{Owner, Translation, TranslationFilter, TranslationStore};
pub use translator::Translator;
