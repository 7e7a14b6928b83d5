//! Locale codes and the provider seam the overlay reads them through.
//!
//! There is no process-wide "current locale": callers hand a provider to every
//! overlay operation, and the operation reads it once when it starts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TranslateError};

static LOCALE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}$").unwrap());

/// A two-letter, lowercase locale code such as `it` or `en`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Parse a locale code. Surrounding whitespace and case are ignored.
    pub fn parse(code: &str) -> Result<Self> {
        let normalized = code.trim().to_ascii_lowercase();
        if LOCALE_CODE.is_match(&normalized) {
            Ok(Locale(normalized))
        } else {
            Err(TranslateError::InvalidLocale(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale("en".to_string())
    }
}

impl FromStr for Locale {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        Locale::parse(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = TranslateError;

    fn try_from(value: String) -> Result<Self> {
        Locale::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the active locale to overlay operations.
pub trait LocaleProvider {
    fn current_locale(&self) -> Locale;
}

impl LocaleProvider for Locale {
    fn current_locale(&self) -> Locale {
        self.clone()
    }
}

impl<P: LocaleProvider + ?Sized> LocaleProvider for &P {
    fn current_locale(&self) -> Locale {
        (**self).current_locale()
    }
}
