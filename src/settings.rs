use crate::error::Result;
use crate::locale::{Locale, LocaleProvider};

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Locale used when the host has no request-scoped one to offer.
    pub default_locale: Locale,
    /// Directory of `*.sql` files applied on boot, if any.
    pub migrations_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "sqlite::memory:".to_string(),
            default_locale: Locale::default(),
            migrations_dir: None,
        }
    }
}

impl Settings {
    /// Read `TRANSLATE_DATABASE_URL`, `TRANSLATE_LOCALE` and
    /// `TRANSLATE_MIGRATIONS_DIR`, keeping defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();
        let default_locale = match std::env::var("TRANSLATE_LOCALE") {
            Ok(code) => Locale::parse(&code)?,
            Err(_) => defaults.default_locale,
        };
        Ok(Settings {
            database_url: std::env::var("TRANSLATE_DATABASE_URL")
                .unwrap_or(defaults.database_url),
            default_locale,
            migrations_dir: std::env::var("TRANSLATE_MIGRATIONS_DIR").ok(),
        })
    }
}

impl LocaleProvider for Settings {
    fn current_locale(&self) -> Locale {
        self.default_locale.clone()
    }
}
